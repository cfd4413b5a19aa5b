//! Handshake request sent right after the prelude.

use crate::error::Result;
use crate::protocol::buffer::WriteBuffer;
use crate::protocol::constants::CMD_HANDSHAKE;
use crate::protocol::message::Message;

/// Echoes the request flag the server announced in the prelude.
pub struct HandshakeMessage {
    pub request_flag: u32,
}

impl Message for HandshakeMessage {
    fn exec_cmd(&self) -> u8 {
        CMD_HANDSHAKE
    }

    fn wire_size(&self) -> usize {
        4
    }

    fn write_to(&self, buf: &mut WriteBuffer) -> Result<()> {
        buf.write_u32(self.request_flag);
        Ok(())
    }
}
