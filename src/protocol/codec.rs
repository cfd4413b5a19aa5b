//! Session-bound value codec.
//!
//! Fixed-width values are written in the session byte order and strings in the
//! session charset. Both are fixed once login completes, so the codec is a
//! small `Copy` value handed to everything that encodes or decodes values.

use crate::protocol::buffer::{pad4, Endian};
use crate::protocol::charset::Charset;

/// Byte order and charset of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionCodec {
    pub endian: Endian,
    pub charset: Charset,
}

impl SessionCodec {
    pub fn new(endian: Endian, charset: Charset) -> Self {
        Self { endian, charset }
    }

    pub fn encode_i32(&self, val: i32) -> Vec<u8> {
        self.endian.u32_bytes(val as u32).to_vec()
    }

    pub fn encode_i64(&self, val: i64) -> Vec<u8> {
        self.endian.u64_bytes(val as u64).to_vec()
    }

    /// Doubles travel as their raw IEEE-754 bit pattern.
    pub fn encode_f64(&self, val: f64) -> Vec<u8> {
        self.endian.u64_bytes(val.to_bits()).to_vec()
    }

    /// `[len:4][bytes][pad to 4]` framing around raw bytes.
    pub fn encode_field(&self, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + data.len() + pad4(data.len()));
        out.extend_from_slice(&self.endian.u32_bytes(data.len() as u32));
        out.extend_from_slice(data);
        out.resize(out.len() + pad4(data.len()), 0);
        out
    }

    /// Charset-encoded string inside field framing.
    pub fn encode_text(&self, s: &str) -> Vec<u8> {
        self.encode_field(&self.charset.encode(s))
    }

    pub fn decode_i32(&self, bytes: [u8; 4]) -> i32 {
        self.endian.u32_from(bytes) as i32
    }

    pub fn decode_i64(&self, bytes: [u8; 8]) -> i64 {
        self.endian.u64_from(bytes) as i64
    }

    pub fn decode_f64(&self, bytes: [u8; 8]) -> f64 {
        f64::from_bits(self.endian.u64_from(bytes))
    }

    pub fn decode_text(&self, bytes: &[u8]) -> String {
        self.charset.decode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_width_roundtrip() {
        for endian in [Endian::Big, Endian::Little] {
            let codec = SessionCodec::new(endian, Charset::Utf8);
            for v in [0i32, 1, -1, i32::MAX, i32::MIN] {
                let bytes: [u8; 4] = codec.encode_i32(v).try_into().unwrap();
                assert_eq!(codec.decode_i32(bytes), v);
            }
            for v in [0i64, -42, i64::MAX, i64::MIN] {
                let bytes: [u8; 8] = codec.encode_i64(v).try_into().unwrap();
                assert_eq!(codec.decode_i64(bytes), v);
            }
            for v in [0.0f64, -1.5, f64::MAX, f64::MIN_POSITIVE] {
                let bytes: [u8; 8] = codec.encode_f64(v).try_into().unwrap();
                assert_eq!(codec.decode_f64(bytes), v);
            }
        }
    }

    #[test]
    fn test_double_uses_raw_bits() {
        let codec = SessionCodec::new(Endian::Big, Charset::Utf8);
        assert_eq!(codec.encode_f64(1.0), 0x3FF0_0000_0000_0000u64.to_be_bytes().to_vec());
    }

    #[test]
    fn test_text_field() {
        let codec = SessionCodec::new(Endian::Little, Charset::Utf8);
        let bytes = codec.encode_text("abcde");
        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[0..4], &[5, 0, 0, 0]);
        assert_eq!(&bytes[4..9], b"abcde");
        assert_eq!(&bytes[9..], &[0, 0, 0]);

        assert_eq!(codec.encode_text("abcd").len(), 8);
        assert_eq!(codec.encode_text("").len(), 4);
    }
}
