//! Wire protocol constants.

// Handshake
pub const HANDSHAKE_MAGIC: [u8; 4] = [0xFE, 0xDC, 0xBA, 0x98];
pub const ENDIAN_FLAG_BIG: u8 = 1;
pub const CLIENT_KEY_LEN: usize = 32;
pub const DEFAULT_DIGEST_ITERATIONS: u32 = 1_000_000;

/// Server version from which the auth-init packet carries a tenant field.
pub const VERSION_MIN_TENANT: u32 = 18;

/// Protocol version from which error payloads are length-prefixed.
pub const VERSION_MIN_FRAMED_ERROR: u32 = 23;

// Packet layout
pub const PACKET_LEN_SIZE: usize = 4;
pub const PACKET_HEADER_SIZE: usize = 16;

/// Header flag: another frame of the same response follows.
pub const PACKET_FLAG_MORE_FRAMES: u16 = 0x0100;

// Request commands
pub const CMD_HANDSHAKE: u8 = 1;
pub const CMD_AUTH_INIT: u8 = 2;
pub const CMD_LOGIN: u8 = 3;
pub const CMD_LOGOUT: u8 = 4;
pub const CMD_PREPARE: u8 = 5;
pub const CMD_FETCH: u8 = 8;
pub const CMD_COMMIT: u8 = 9;
pub const CMD_ROLLBACK: u8 = 10;
pub const CMD_FREE_STMT: u8 = 13;
pub const CMD_CANCEL: u8 = 17;
pub const CMD_PREP_AND_EXEC: u8 = 20;

// Login fields
pub const LOGIN_USER_FLAG: &str = "user_flag";
pub const LOGIN_CLIENT_FLAG: &str = "jdbc_flag";
pub const LOGIN_CLIENT_KIND: u16 = 2;

// Session charsets
pub const CHARSET_FLAG_UTF8: u32 = 0;
pub const CHARSET_FLAG_GBK: u32 = 1;

// Digest labels
pub const DIGEST_CLIENT_KEY_LABEL: &[u8] = b"Client Key";
pub const DIGEST_SERVER_KEY_LABEL: &[u8] = b"Server Key";

// Statements
pub const STMT_ID_NEW: u32 = u32::MAX;
pub const DEFAULT_FETCH_SIZE: u32 = 100;

// Execute response kinds
pub const EXEC_KIND_UPDATE: u8 = 0;
pub const EXEC_KIND_QUERY: u8 = 1;
pub const EXEC_KIND_PROCEDURE: u8 = 2;

// Cursor fetch modes
pub const CURSOR_MODE_QUERY: u32 = 0;
pub const CURSOR_MODE_REF: u32 = 1;

// Parameter direction bits
pub const PARAM_DIR_IN: u8 = 64;
pub const PARAM_DIR_OUT: u8 = 128;

// Out-parameter metadata
pub const OUT_PARAM_NAME_LEN: usize = 68;
pub const OUT_PARAM_FIELD_SIZE: usize = OUT_PARAM_NAME_LEN + 4;

// Packed row length classes
pub const LEN_CLASS_NULL: u8 = 0;
pub const LEN_CLASS_4: u8 = 1;
pub const LEN_CLASS_8: u8 = 2;
pub const LEN_CLASS_VAR: u8 = 3;
pub const ROW_HEADER_SIZE: usize = 5;
pub const PACKED_CLASS_BASE_LEN: usize = 3;
pub const PACKED_CLASS_THRESHOLD: usize = 13;

// Value epochs
pub const DATETIME_EPOCH_YEAR: i32 = 2000;
