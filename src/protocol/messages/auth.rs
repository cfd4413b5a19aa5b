//! Authentication messages.

use crate::error::Result;
use crate::protocol::buffer::{padded_field_size, WriteBuffer};
use crate::protocol::constants::*;
use crate::protocol::message::{tenant_wire_size, write_tenant, Message};

// ============================================================================
// AuthInitMessage - announce the user and the client key
// ============================================================================

/// First authentication step.
///
/// The server answers with a scramble that starts with the client key.
pub struct AuthInitMessage<'a> {
    pub username: &'a [u8],
    /// 32 random bytes chosen for this login.
    pub client_key: &'a [u8],
    pub tenant: Option<&'a [u8]>,
    /// Protocol versions before 18 have no tenant slot.
    pub with_tenant: bool,
}

impl Message for AuthInitMessage<'_> {
    fn exec_cmd(&self) -> u8 {
        CMD_AUTH_INIT
    }

    fn wire_size(&self) -> usize {
        let mut size = padded_field_size(self.username.len());
        size += padded_field_size(self.client_key.len());
        if self.with_tenant {
            size += tenant_wire_size(self.tenant);
        }
        size
    }

    fn write_to(&self, buf: &mut WriteBuffer) -> Result<()> {
        buf.write_padded_bytes(self.username);
        buf.write_padded_bytes(self.client_key);
        if self.with_tenant {
            write_tenant(buf, self.tenant);
        }
        Ok(())
    }
}

// ============================================================================
// LoginMessage - prove knowledge of the password
// ============================================================================

/// Final authentication step carrying the password digest.
pub struct LoginMessage<'a> {
    pub username: &'a [u8],
    /// Digest sent in place of the password.
    pub digest: &'a [u8],
    /// Local address of the client socket.
    pub client_addr: &'a [u8],
    /// Session time zone offset in minutes.
    pub tz_offset_minutes: i16,
    pub tenant: Option<&'a [u8]>,
}

impl LoginMessage<'_> {
    fn options(&self) -> [u16; 8] {
        [
            0,
            0,
            self.tz_offset_minutes as u16,
            0,
            LOGIN_CLIENT_KIND,
            0,
            0, // read/write split
            0,
        ]
    }
}

impl Message for LoginMessage<'_> {
    fn exec_cmd(&self) -> u8 {
        CMD_LOGIN
    }

    fn wire_size(&self) -> usize {
        let mut size = padded_field_size(self.username.len());
        size += padded_field_size(self.digest.len());
        size += padded_field_size(self.client_addr.len());
        size += padded_field_size(LOGIN_USER_FLAG.len());
        size += padded_field_size(LOGIN_CLIENT_FLAG.len());
        size += 8 * 2;
        size += tenant_wire_size(self.tenant);
        size
    }

    fn write_to(&self, buf: &mut WriteBuffer) -> Result<()> {
        buf.write_padded_bytes(self.username);
        buf.write_padded_bytes(self.digest);
        buf.write_padded_bytes(self.client_addr);
        buf.write_padded_bytes(LOGIN_USER_FLAG.as_bytes());
        buf.write_padded_bytes(LOGIN_CLIENT_FLAG.as_bytes());
        for opt in self.options() {
            buf.write_u16(opt);
        }
        write_tenant(buf, self.tenant);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::buffer::{Endian, ReadBuffer};

    #[test]
    fn test_auth_init_wire_size() {
        let key = [9u8; CLIENT_KEY_LEN];
        for with_tenant in [false, true] {
            let msg = AuthInitMessage {
                username: b"scott",
                client_key: &key,
                tenant: None,
                with_tenant,
            };
            let mut buf = WriteBuffer::new(Endian::Little);
            msg.write_to(&mut buf).unwrap();
            assert_eq!(buf.len(), msg.wire_size());
        }
    }

    #[test]
    fn test_auth_init_tenant_slot() {
        let key = [9u8; CLIENT_KEY_LEN];
        let msg = AuthInitMessage {
            username: b"abcd",
            client_key: &key,
            tenant: None,
            with_tenant: true,
        };
        let mut buf = WriteBuffer::new(Endian::Little);
        msg.write_to(&mut buf).unwrap();
        // user field (8) + key field (36) + empty tenant (4)
        assert_eq!(buf.len(), 48);
        assert_eq!(&buf.as_bytes()[44..], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_login_layout() {
        let digest = [1u8; 32];
        let msg = LoginMessage {
            username: b"sys",
            digest: &digest,
            client_addr: b"127.0.0.1",
            tz_offset_minutes: 480,
            tenant: Some(b"t1"),
        };
        let mut buf = WriteBuffer::new(Endian::Little);
        msg.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), msg.wire_size());

        let mut rbuf = ReadBuffer::new(buf.freeze(), Endian::Little);
        assert_eq!(&rbuf.read_padded_bytes().unwrap()[..], b"sys");
        assert_eq!(&rbuf.read_padded_bytes().unwrap()[..], &digest[..]);
        assert_eq!(&rbuf.read_padded_bytes().unwrap()[..], b"127.0.0.1");
        assert_eq!(&rbuf.read_padded_bytes().unwrap()[..], b"user_flag");
        assert_eq!(&rbuf.read_padded_bytes().unwrap()[..], b"jdbc_flag");
        let opts: Vec<u16> = (0..8).map(|_| rbuf.read_u16().unwrap()).collect();
        assert_eq!(opts, vec![0, 0, 480, 0, 2, 0, 0, 0]);
        assert_eq!(&rbuf.read_padded_bytes().unwrap()[..], b"t1");
        assert_eq!(rbuf.remaining(), 0);
    }
}
