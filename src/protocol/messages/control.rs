//! Session control messages.

use crate::error::Result;
use crate::protocol::buffer::WriteBuffer;
use crate::protocol::constants::*;
use crate::protocol::message::Message;

/// A command with an empty body (commit, rollback, logout).
pub struct CommandMessage {
    cmd: u8,
}

impl CommandMessage {
    pub fn commit() -> Self {
        Self { cmd: CMD_COMMIT }
    }

    pub fn rollback() -> Self {
        Self { cmd: CMD_ROLLBACK }
    }

    pub fn logout() -> Self {
        Self { cmd: CMD_LOGOUT }
    }
}

impl Message for CommandMessage {
    fn exec_cmd(&self) -> u8 {
        self.cmd
    }

    fn wire_size(&self) -> usize {
        0
    }

    fn write_to(&self, _buf: &mut WriteBuffer) -> Result<()> {
        Ok(())
    }
}

/// Release a server statement and its cursor.
pub struct FreeStatementMessage {
    pub stmt_id: u32,
}

impl Message for FreeStatementMessage {
    fn exec_cmd(&self) -> u8 {
        CMD_FREE_STMT
    }

    fn wire_size(&self) -> usize {
        4
    }

    fn write_to(&self, buf: &mut WriteBuffer) -> Result<()> {
        buf.write_u32(self.stmt_id);
        Ok(())
    }
}

/// Cancel the running request of another session.
pub struct CancelMessage {
    pub session_id: u32,
    pub session_number: u32,
}

impl Message for CancelMessage {
    fn exec_cmd(&self) -> u8 {
        CMD_CANCEL
    }

    fn wire_size(&self) -> usize {
        8
    }

    fn write_to(&self, buf: &mut WriteBuffer) -> Result<()> {
        buf.write_u32(self.session_id);
        buf.write_u32(self.session_number);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::buffer::Endian;
    use crate::protocol::packet::encode_packet;

    #[test]
    fn test_empty_commands() {
        assert_eq!(CommandMessage::commit().exec_cmd(), CMD_COMMIT);
        assert_eq!(CommandMessage::rollback().exec_cmd(), CMD_ROLLBACK);
        let bytes = encode_packet(&CommandMessage::logout(), Endian::Little, 1, 3).unwrap();
        assert_eq!(bytes.len(), PACKET_HEADER_SIZE);
        assert_eq!(bytes[4], CMD_LOGOUT);
    }

    #[test]
    fn test_cancel_layout() {
        let msg = CancelMessage {
            session_id: 7,
            session_number: 9,
        };
        let bytes = encode_packet(&msg, Endian::Big, 1, 1).unwrap();
        assert_eq!(&bytes[0..4], &24u32.to_be_bytes());
        assert_eq!(bytes[4], CMD_CANCEL);
        assert_eq!(&bytes[16..20], &7u32.to_be_bytes());
        assert_eq!(&bytes[20..24], &9u32.to_be_bytes());
    }
}
