//! Fetch message for retrieving more rows from a cursor.

use crate::error::Result;
use crate::protocol::buffer::WriteBuffer;
use crate::protocol::constants::*;
use crate::protocol::message::Message;

/// Fetch the next batch of rows from an open server cursor.
pub struct FetchMessage {
    pub stmt_id: u32,
    /// Cursor id assigned by the server.
    pub cursor_id: u64,
    /// Query cursor or REF CURSOR.
    pub mode: u32,
    /// Number of rows to fetch.
    pub fetch_size: u32,
}

impl Message for FetchMessage {
    fn exec_cmd(&self) -> u8 {
        CMD_FETCH
    }

    fn wire_size(&self) -> usize {
        4 + 8 + 4 + 4
    }

    fn write_to(&self, buf: &mut WriteBuffer) -> Result<()> {
        buf.write_u32(self.stmt_id);
        buf.write_u64(self.cursor_id);
        buf.write_u32(self.mode);
        buf.write_u32(self.fetch_size);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::buffer::Endian;

    #[test]
    fn test_fetch_message_content() {
        let msg = FetchMessage {
            stmt_id: 1,
            cursor_id: 42,
            mode: CURSOR_MODE_REF,
            fetch_size: 100,
        };
        let mut buf = WriteBuffer::new(Endian::Big);
        msg.write_to(&mut buf).unwrap();

        assert_eq!(buf.len(), msg.wire_size());
        assert_eq!(&buf.as_bytes()[4..12], &42u64.to_be_bytes());
        assert_eq!(&buf.as_bytes()[12..16], &CURSOR_MODE_REF.to_be_bytes());
        assert_eq!(&buf.as_bytes()[16..], &100u32.to_be_bytes());
    }
}
