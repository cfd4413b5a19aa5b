//! Statement messages: describe and execute.

use crate::error::{Error, Result};
use crate::protocol::buffer::{padded_field_size, WriteBuffer};
use crate::protocol::constants::*;
use crate::protocol::message::Message;
use crate::protocol::params::ParamSlot;

/// Prepare a statement and describe its parameters.
pub struct PrepareMessage<'a> {
    /// Charset-encoded SQL text.
    pub sql: &'a [u8],
}

impl Message for PrepareMessage<'_> {
    fn exec_cmd(&self) -> u8 {
        CMD_PREPARE
    }

    fn wire_size(&self) -> usize {
        4 + padded_field_size(self.sql.len())
    }

    fn write_to(&self, buf: &mut WriteBuffer) -> Result<()> {
        buf.write_u32(STMT_ID_NEW);
        buf.write_padded_bytes(self.sql);
        Ok(())
    }
}

/// Prepare and execute a statement with bound parameters.
///
/// Body: statement id, SQL field, fetch size, parameter count, one 4-byte
/// descriptor per parameter, then the encoded values back to back.
pub struct ExecuteMessage<'a> {
    pub stmt_id: u32,
    pub sql: &'a [u8],
    /// Rows to return with the first batch of a query.
    pub fetch_size: u32,
    pub params: &'a [ParamSlot],
}

impl ExecuteMessage<'_> {
    fn values_size(&self) -> usize {
        self.params.iter().map(|p| p.encoded.len()).sum()
    }
}

impl Message for ExecuteMessage<'_> {
    fn exec_cmd(&self) -> u8 {
        CMD_PREP_AND_EXEC
    }

    fn wire_size(&self) -> usize {
        let mut size = 4; // stmt id
        size += padded_field_size(self.sql.len());
        size += 4; // fetch size
        size += 4; // param count + reserved
        size += 4 * self.params.len();
        size += self.values_size();
        size
    }

    fn write_to(&self, buf: &mut WriteBuffer) -> Result<()> {
        let count = u16::try_from(self.params.len()).map_err(|_| {
            Error::parameter(format!("too many parameters: {}", self.params.len()))
        })?;

        buf.write_u32(self.stmt_id);
        buf.write_padded_bytes(self.sql);
        buf.write_u32(self.fetch_size);
        buf.write_u16(count);
        buf.write_u16(0);

        for param in self.params {
            buf.write_u8(param.wire_type.code());
            buf.write_u8(param.direction.flags());
            buf.write_u8(param.value.is_null() as u8);
            buf.write_u8(0);
        }
        for param in self.params {
            buf.write_bytes(&param.encoded);
        }
        Ok(())
    }
}
