//! Buffer utilities for reading and writing protocol data.
//!
//! All multi-byte integers are encoded in the byte order negotiated during the
//! handshake, so both buffers carry an [`Endian`].

use crate::error::{Error, Result};
use bytes::{BufMut, Bytes, BytesMut};

/// Byte order fixed for a session by the server's endianness flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    Big,
    #[default]
    Little,
}

impl Endian {
    /// Interpret the 1-byte endianness flag sent by the server.
    pub fn from_flag(flag: u8) -> Self {
        if flag == crate::protocol::constants::ENDIAN_FLAG_BIG {
            Endian::Big
        } else {
            Endian::Little
        }
    }

    pub fn u16_bytes(self, val: u16) -> [u8; 2] {
        match self {
            Endian::Big => val.to_be_bytes(),
            Endian::Little => val.to_le_bytes(),
        }
    }

    pub fn u32_bytes(self, val: u32) -> [u8; 4] {
        match self {
            Endian::Big => val.to_be_bytes(),
            Endian::Little => val.to_le_bytes(),
        }
    }

    pub fn u64_bytes(self, val: u64) -> [u8; 8] {
        match self {
            Endian::Big => val.to_be_bytes(),
            Endian::Little => val.to_le_bytes(),
        }
    }

    pub fn u16_from(self, bytes: [u8; 2]) -> u16 {
        match self {
            Endian::Big => u16::from_be_bytes(bytes),
            Endian::Little => u16::from_le_bytes(bytes),
        }
    }

    pub fn u32_from(self, bytes: [u8; 4]) -> u32 {
        match self {
            Endian::Big => u32::from_be_bytes(bytes),
            Endian::Little => u32::from_le_bytes(bytes),
        }
    }

    pub fn u64_from(self, bytes: [u8; 8]) -> u64 {
        match self {
            Endian::Big => u64::from_be_bytes(bytes),
            Endian::Little => u64::from_le_bytes(bytes),
        }
    }
}

/// Number of zero bytes needed to pad `len` to a 4-byte boundary.
#[inline]
pub const fn pad4(len: usize) -> usize {
    (4 - len % 4) % 4
}

/// Wire size of a `[len:4][bytes][pad]` field.
#[inline]
pub const fn padded_field_size(len: usize) -> usize {
    4 + len + pad4(len)
}

/// A buffer for reading protocol data.
#[derive(Debug)]
pub struct ReadBuffer {
    data: Bytes,
    pos: usize,
    endian: Endian,
}

impl ReadBuffer {
    /// Create a new read buffer from bytes.
    pub fn new(data: Bytes, endian: Endian) -> Self {
        Self {
            data,
            pos: 0,
            endian,
        }
    }

    /// Byte order used for integer reads.
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Get the current position in the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Get the remaining bytes in the buffer.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Check if the buffer has at least `n` bytes remaining.
    pub fn has_remaining(&self, n: usize) -> bool {
        self.remaining() >= n
    }

    #[track_caller]
    fn ensure(&self, n: usize) -> Result<()> {
        if !self.has_remaining(n) {
            return Err(Error::BufferTooSmall {
                needed: n,
                available: self.remaining(),
                location: std::panic::Location::caller(),
            });
        }
        Ok(())
    }

    /// Skip `n` bytes.
    #[track_caller]
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        self.pos += n;
        Ok(())
    }

    /// Read a single byte.
    #[track_caller]
    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        let val = self.data[self.pos];
        self.pos += 1;
        Ok(val)
    }

    #[track_caller]
    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.ensure(N)?;
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(&self.data[self.pos..self.pos + N]);
        self.pos += N;
        Ok(bytes)
    }

    /// Read a u16 in session byte order.
    #[track_caller]
    pub fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.read_array::<2>()?;
        Ok(self.endian.u16_from(bytes))
    }

    /// Read a u32 in session byte order.
    #[track_caller]
    pub fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.read_array::<4>()?;
        Ok(self.endian.u32_from(bytes))
    }

    /// Read a u64 in session byte order.
    #[track_caller]
    pub fn read_u64(&mut self) -> Result<u64> {
        let bytes = self.read_array::<8>()?;
        Ok(self.endian.u64_from(bytes))
    }

    /// Read raw bytes.
    #[track_caller]
    pub fn read_bytes(&mut self, n: usize) -> Result<Bytes> {
        self.ensure(n)?;
        let bytes = self.data.slice(self.pos..self.pos + n);
        self.pos += n;
        Ok(bytes)
    }

    /// Read the rest of the buffer.
    pub fn read_remaining(&mut self) -> Bytes {
        let bytes = self.data.slice(self.pos..);
        self.pos = self.data.len();
        bytes
    }

    /// Read a `[len:4][bytes][pad to 4]` field.
    #[track_caller]
    pub fn read_padded_bytes(&mut self) -> Result<Bytes> {
        let len = self.read_u32()? as usize;
        let bytes = self.read_bytes(len)?;
        self.skip(pad4(len))?;
        Ok(bytes)
    }
}

/// A buffer for writing protocol data.
pub struct WriteBuffer {
    data: BytesMut,
    endian: Endian,
}

impl WriteBuffer {
    /// Create a new write buffer with default capacity.
    pub fn new(endian: Endian) -> Self {
        Self::with_capacity(256, endian)
    }

    /// Create a new write buffer with specified capacity.
    pub fn with_capacity(capacity: usize, endian: Endian) -> Self {
        Self {
            data: BytesMut::with_capacity(capacity),
            endian,
        }
    }

    /// Byte order used for integer writes.
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Get the current length of the buffer.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the buffer contents as bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Freeze the buffer into immutable bytes.
    pub fn freeze(self) -> Bytes {
        self.data.freeze()
    }

    /// Write a single byte.
    pub fn write_u8(&mut self, val: u8) {
        self.data.put_u8(val);
    }

    /// Write a u16 in session byte order.
    pub fn write_u16(&mut self, val: u16) {
        self.data.extend_from_slice(&self.endian.u16_bytes(val));
    }

    /// Write a u32 in session byte order.
    pub fn write_u32(&mut self, val: u32) {
        self.data.extend_from_slice(&self.endian.u32_bytes(val));
    }

    /// Write a u64 in session byte order.
    pub fn write_u64(&mut self, val: u64) {
        self.data.extend_from_slice(&self.endian.u64_bytes(val));
    }

    /// Write raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Write padding zeros.
    pub fn write_zeros(&mut self, count: usize) {
        self.data.put_bytes(0, count);
    }

    /// Write a `[len:4][bytes][pad to 4]` field.
    pub fn write_padded_bytes(&mut self, bytes: &[u8]) {
        self.write_u32(bytes.len() as u32);
        self.write_bytes(bytes);
        self.write_zeros(pad4(bytes.len()));
    }

    /// Overwrite a u32 at a specific position.
    pub fn set_u32(&mut self, pos: usize, val: u32) {
        let bytes = self.endian.u32_bytes(val);
        self.data[pos..pos + 4].copy_from_slice(&bytes);
    }
}
