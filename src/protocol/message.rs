//! Message trait for request serialization.
//!
//! A request is a packet header followed by a command-specific body. Messages
//! implement [`Message`] so the body size is known before allocation and the
//! whole packet is assembled in a single buffer.

use crate::error::Result;
use crate::protocol::buffer::{padded_field_size, WriteBuffer};

/// A request body that can calculate its wire size and serialize itself.
pub trait Message {
    /// Command code placed in the packet header.
    fn exec_cmd(&self) -> u8;

    /// Serialized body size in bytes (excluding the packet header).
    fn wire_size(&self) -> usize;

    /// Write the body to the buffer.
    fn write_to(&self, buf: &mut WriteBuffer) -> Result<()>;
}

/// Wire size of an optional tenant field.
///
/// A missing tenant is sent as a single zero length word.
#[inline]
pub fn tenant_wire_size(tenant: Option<&[u8]>) -> usize {
    match tenant {
        Some(label) => padded_field_size(label.len()),
        None => 4,
    }
}

/// Write an optional tenant field.
pub fn write_tenant(buf: &mut WriteBuffer, tenant: Option<&[u8]>) {
    match tenant {
        Some(label) => buf.write_padded_bytes(label),
        None => buf.write_u32(0),
    }
}
