//! Scripted in-process server for integration tests.
//!
//! The server half of a `tokio::io::duplex` pipe reads request frames and
//! answers with hand-built response bodies, so the whole client stack runs
//! without a database.

#![allow(dead_code)]

use bytes::Bytes;
use ograc_thin_rs::protocol::constants::*;
use ograc_thin_rs::protocol::crypto::PasswordDigest;
use ograc_thin_rs::protocol::out_params::packed_class_len;
use ograc_thin_rs::protocol::{Endian, PacketHeader, ReadBuffer, WireType, WriteBuffer};
use ograc_thin_rs::{ConnectParams, Connection, DEFAULT_PORT};
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};

pub const USERNAME: &str = "scott";
pub const PASSWORD: &str = "tiger";
pub const ITERATIONS: u32 = 16;
pub const SERVER_SALT: [u8; 16] = [0x5A; 16];
pub const SESSION_ID: u32 = 41;
pub const SESSION_NUMBER: u32 = 7;

pub fn params() -> ConnectParams {
    ConnectParams::new("fake-host", DEFAULT_PORT, USERNAME, PASSWORD).with_fetch_size(2)
}

/// Client transport plus the scripted server on the other end.
pub fn pair(endian: Endian, version: u8) -> (DuplexStream, FakeServer) {
    let (client, server) = duplex(64 * 1024);
    (
        client,
        FakeServer {
            io: server,
            endian,
            version,
        },
    )
}

/// One received request frame.
pub struct Request {
    pub header: PacketHeader,
    pub body: ReadBuffer,
}

/// How the server should behave during login.
#[derive(Debug, Clone)]
pub struct LoginScript {
    pub password: String,
    pub server_version: u32,
    pub charset_flag: u32,
    /// Flip the low bit of this byte of the echoed client key.
    pub tamper_scramble: Option<usize>,
    /// Return a wrong signing key.
    pub tamper_signature: bool,
    /// Reject the auth-init request with this error.
    pub auth_init_error: Option<(u32, String)>,
}

impl Default for LoginScript {
    fn default() -> Self {
        Self {
            password: PASSWORD.to_string(),
            server_version: 25,
            charset_flag: CHARSET_FLAG_UTF8,
            tamper_scramble: None,
            tamper_signature: false,
            auth_init_error: None,
        }
    }
}

/// What the server observed during login.
#[derive(Debug, Default)]
pub struct LoginSeen {
    pub request_flag: u32,
    pub username: Vec<u8>,
    pub client_key: Vec<u8>,
    pub tenant: Option<Vec<u8>>,
    pub client_addr: Vec<u8>,
    pub login_tenant: Vec<u8>,
    pub proof_ok: bool,
    pub logged_in: bool,
}

/// Parsed execute request.
#[derive(Debug)]
pub struct ExecRequest {
    pub request_count: u32,
    pub stmt_id: u32,
    pub sql: Bytes,
    pub fetch_size: u32,
    /// `(type code, direction flags, is_null)` per parameter.
    pub descriptors: Vec<(u8, u8, bool)>,
    pub values: Bytes,
}

pub struct FakeServer {
    io: DuplexStream,
    pub endian: Endian,
    pub version: u8,
}

impl FakeServer {
    pub fn body(&self) -> WriteBuffer {
        WriteBuffer::new(self.endian)
    }

    pub async fn read_request(&mut self) -> Request {
        let mut len = [0u8; 4];
        self.io.read_exact(&mut len).await.unwrap();
        let size = self.endian.u32_from(len) as usize;
        let mut frame = vec![0u8; size];
        frame[..4].copy_from_slice(&len);
        self.io.read_exact(&mut frame[4..]).await.unwrap();

        let mut body = ReadBuffer::new(Bytes::from(frame), self.endian);
        let header = PacketHeader::parse(&mut body).unwrap();
        assert_eq!(header.size as usize, size);
        Request { header, body }
    }

    pub async fn send_frame(
        &mut self,
        exec_cmd: u8,
        exec_result: u8,
        flags: u16,
        request_count: u32,
        body: &[u8],
    ) {
        let mut buf = WriteBuffer::new(self.endian);
        PacketHeader {
            size: (PACKET_HEADER_SIZE + body.len()) as u32,
            exec_cmd,
            exec_result,
            flags,
            version: self.version,
            version1: 0,
            version2: 0,
            request_count,
        }
        .write(&mut buf);
        buf.write_bytes(body);
        self.io.write_all(buf.as_bytes()).await.unwrap();
    }

    pub async fn reply(&mut self, req: &Request, body: &[u8]) {
        self.send_frame(req.header.exec_cmd, 0, 0, req.header.request_count, body)
            .await;
    }

    /// Answer with an error payload in the legacy or the framed layout.
    pub async fn reply_error(&mut self, req: &Request, code: u32, message: &str, framed: bool) {
        let mut body = self.body();
        body.write_u32(code);
        body.write_zeros(8);
        if framed {
            body.write_padded_bytes(message.as_bytes());
        } else {
            body.write_bytes(message.as_bytes());
            body.write_u8(0);
        }
        self.send_frame(req.header.exec_cmd, 1, 0, req.header.request_count, body.as_bytes())
            .await;
    }

    /// Wait until the client hangs up and return whatever it still sent.
    pub async fn drain(&mut self) -> Vec<u8> {
        let mut rest = Vec::new();
        self.io.read_to_end(&mut rest).await.unwrap();
        rest
    }

    /// Play the server side of the prelude, handshake and login.
    pub async fn accept_login(&mut self, script: &LoginScript) -> LoginSeen {
        let mut seen = LoginSeen::default();

        let mut magic = [0u8; 4];
        self.io.read_exact(&mut magic).await.unwrap();
        assert_eq!(magic, HANDSHAKE_MAGIC);
        let endian_flag = match self.endian {
            Endian::Big => ENDIAN_FLAG_BIG,
            Endian::Little => 0,
        };
        let mut prelude = vec![endian_flag, self.version];
        prelude.extend_from_slice(&self.endian.u16_bytes(2));
        self.io.write_all(&prelude).await.unwrap();

        let mut req = self.read_request().await;
        assert_eq!(req.header.exec_cmd, CMD_HANDSHAKE);
        seen.request_flag = req.body.read_u32().unwrap();
        self.reply(&req, &[]).await;

        let mut req = self.read_request().await;
        assert_eq!(req.header.exec_cmd, CMD_AUTH_INIT);
        seen.username = req.body.read_padded_bytes().unwrap().to_vec();
        seen.client_key = req.body.read_padded_bytes().unwrap().to_vec();
        if self.version as u32 >= VERSION_MIN_TENANT {
            seen.tenant = Some(req.body.read_padded_bytes().unwrap().to_vec());
        }
        assert_eq!(req.body.remaining(), 0);

        if let Some((code, message)) = &script.auth_init_error {
            // no server version is known to the client yet
            self.reply_error(&req, *code, message, false).await;
            return seen;
        }

        let mut scramble = seen.client_key.clone();
        if let Some(index) = script.tamper_scramble {
            scramble[index] ^= 0x01;
        }
        scramble.extend_from_slice(&SERVER_SALT);
        let mut body = self.body();
        body.write_u32(64);
        body.write_u32(script.server_version);
        body.write_padded_bytes(&scramble);
        body.write_u32(ITERATIONS);
        self.reply(&req, body.as_bytes()).await;
        if script.tamper_scramble.is_some() {
            return seen;
        }

        let mut req = self.read_request().await;
        assert_eq!(req.header.exec_cmd, CMD_LOGIN);
        assert_eq!(req.body.read_padded_bytes().unwrap(), &seen.username[..]);
        let proof = req.body.read_padded_bytes().unwrap();
        seen.client_addr = req.body.read_padded_bytes().unwrap().to_vec();
        assert_eq!(req.body.read_padded_bytes().unwrap(), LOGIN_USER_FLAG.as_bytes());
        assert_eq!(req.body.read_padded_bytes().unwrap(), LOGIN_CLIENT_FLAG.as_bytes());
        let options: Vec<u16> = (0..8).map(|_| req.body.read_u16().unwrap()).collect();
        assert_eq!(options[4], LOGIN_CLIENT_KIND);
        seen.login_tenant = req.body.read_padded_bytes().unwrap().to_vec();
        assert_eq!(req.body.remaining(), 0);

        let digest = PasswordDigest::derive(script.password.as_bytes(), &scramble, ITERATIONS);
        seen.proof_ok = proof[..] == digest.proof[..];
        if !seen.proof_ok {
            let framed = self.version as u32 >= VERSION_MIN_FRAMED_ERROR;
            self.reply_error(&req, 1017, "invalid username/password; logon denied", framed)
                .await;
            return seen;
        }

        let mut signature = digest.server_signature;
        if script.tamper_signature {
            signature[31] ^= 0x01;
        }
        let mut body = self.body();
        body.write_u32(SESSION_ID);
        body.write_u32(SESSION_NUMBER);
        body.write_u32(0);
        body.write_u32(script.charset_flag);
        body.write_padded_bytes(&signature);
        self.reply(&req, body.as_bytes()).await;
        seen.logged_in = true;
        seen
    }

    pub async fn read_execute(&mut self) -> ExecRequest {
        let mut req = self.read_request().await;
        assert_eq!(req.header.exec_cmd, CMD_PREP_AND_EXEC);
        let body = &mut req.body;
        let stmt_id = body.read_u32().unwrap();
        let sql = body.read_padded_bytes().unwrap();
        let fetch_size = body.read_u32().unwrap();
        let count = body.read_u16().unwrap() as usize;
        body.skip(2).unwrap();
        let descriptors = (0..count)
            .map(|_| {
                let ty = body.read_u8().unwrap();
                let dir = body.read_u8().unwrap();
                let is_null = body.read_u8().unwrap() != 0;
                body.skip(1).unwrap();
                (ty, dir, is_null)
            })
            .collect();
        ExecRequest {
            request_count: req.header.request_count,
            stmt_id,
            sql,
            fetch_size,
            descriptors,
            values: body.read_remaining(),
        }
    }

    /// Reply to an execute request with a raw success body.
    pub async fn reply_execute(&mut self, exec: &ExecRequest, body: &[u8]) {
        self.send_frame(CMD_PREP_AND_EXEC, 0, 0, exec.request_count, body)
            .await;
    }

    /// Expect a FREE_STMT request for `stmt_id` and acknowledge it.
    pub async fn expect_free(&mut self, stmt_id: u32) {
        let mut req = self.read_request().await;
        assert_eq!(req.header.exec_cmd, CMD_FREE_STMT);
        assert_eq!(req.body.read_u32().unwrap(), stmt_id);
        self.reply(&req, &[]).await;
    }

    /// Expect a FETCH request and return `(stmt_id, cursor_id, mode, fetch_size)`.
    pub async fn read_fetch(&mut self) -> (Request, (u32, u64, u32, u32)) {
        let mut req = self.read_request().await;
        assert_eq!(req.header.exec_cmd, CMD_FETCH);
        let stmt_id = req.body.read_u32().unwrap();
        let cursor_id = req.body.read_u64().unwrap();
        let mode = req.body.read_u32().unwrap();
        let fetch_size = req.body.read_u32().unwrap();
        (req, (stmt_id, cursor_id, mode, fetch_size))
    }
}

/// Run the login script against a fresh pair and return both ends.
pub async fn connected(endian: Endian, version: u8) -> (Connection<DuplexStream>, FakeServer) {
    connected_with(endian, version, LoginScript::default()).await
}

pub async fn connected_with(
    endian: Endian,
    version: u8,
    script: LoginScript,
) -> (Connection<DuplexStream>, FakeServer) {
    let (client, mut server) = pair(endian, version);
    let login = tokio::spawn(async move {
        let seen = server.accept_login(&script).await;
        assert!(seen.logged_in);
        server
    });
    let conn = Connection::connect_stream(client, "127.0.0.1", params())
        .await
        .unwrap();
    (conn, login.await.unwrap())
}

/// Header of an execute response.
pub fn execute_header(body: &mut WriteBuffer, stmt_id: u32, kind: u8) {
    body.write_u32(stmt_id);
    body.write_u8(kind);
    body.write_zeros(3);
}

/// Write one packed row.
pub fn packed_row(body: &mut WriteBuffer, values: &[Option<Vec<u8>>]) {
    let class_len = packed_class_len(values.len());
    let mut classes = vec![0u8; class_len];
    for (col, value) in values.iter().enumerate() {
        let class = match value {
            None => LEN_CLASS_NULL,
            Some(v) if v.len() == 4 => LEN_CLASS_4,
            Some(v) if v.len() == 8 => LEN_CLASS_8,
            Some(_) => LEN_CLASS_VAR,
        };
        classes[col / 4] |= class << ((col % 4) * 2);
    }

    body.write_u16(0);
    body.write_u16(values.len() as u16);
    body.write_u8(0);
    body.write_bytes(&classes);
    for value in values.iter().flatten() {
        match value.len() {
            4 | 8 => body.write_bytes(value),
            len => {
                body.write_u16(len as u16);
                body.write_bytes(value);
                body.write_zeros((4 - (len + 2) % 4) % 4);
            }
        }
    }
}

/// Write a result-set block.
pub fn row_batch(
    body: &mut WriteBuffer,
    columns: &[(&str, WireType)],
    rows: &[Vec<Option<Vec<u8>>>],
    has_remain: bool,
) {
    body.write_u16(columns.len() as u16);
    body.write_u16(0);
    for (name, ty) in columns {
        body.write_padded_bytes(name.as_bytes());
        body.write_u8(ty.code());
        body.write_u8(1);
        body.write_u8(0);
        body.write_u8(0);
        body.write_u16(0);
        body.write_u16(0);
    }
    body.write_u32(rows.len() as u32);
    body.write_u32(has_remain as u32);
    for row in rows {
        packed_row(body, row);
    }
}

/// Write procedure out-parameter metadata.
pub fn out_metadata(body: &mut WriteBuffer, fields: &[(&str, WireType)]) {
    body.write_u32(fields.len() as u32);
    for (name, ty) in fields {
        let mut raw_name = [0u8; OUT_PARAM_NAME_LEN];
        raw_name[..name.len()].copy_from_slice(name.as_bytes());
        body.write_bytes(&raw_name);
        body.write_bytes(&[0, 0]);
        body.write_u8(PARAM_DIR_OUT);
        body.write_u8(ty.code());
    }
}

pub fn int_bytes(endian: Endian, v: i32) -> Option<Vec<u8>> {
    Some(endian.u32_bytes(v as u32).to_vec())
}

pub fn text_bytes(s: &str) -> Option<Vec<u8>> {
    Some(s.as_bytes().to_vec())
}
