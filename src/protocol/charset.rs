//! Session character sets.
//!
//! The server fixes the session charset in the login response; every string
//! sent or received afterwards goes through it.

use crate::error::{Error, Result};
use crate::protocol::constants::{CHARSET_FLAG_GBK, CHARSET_FLAG_UTF8};
use encoding_rs::GBK;

/// Character set used for string fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Charset {
    #[default]
    Utf8,
    Gbk,
}

impl Charset {
    /// Map the login response charset flag.
    pub fn from_flag(flag: u32) -> Result<Self> {
        match flag {
            CHARSET_FLAG_UTF8 => Ok(Charset::Utf8),
            CHARSET_FLAG_GBK => Ok(Charset::Gbk),
            other => Err(Error::connection(format!(
                "server charset error, the charset can only be UTF-8 and GBK (flag {})",
                other
            ))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Charset::Utf8 => "UTF-8",
            Charset::Gbk => "GBK",
        }
    }

    /// Encode a string for the wire.
    pub fn encode(self, s: &str) -> Vec<u8> {
        match self {
            Charset::Utf8 => s.as_bytes().to_vec(),
            Charset::Gbk => GBK.encode(s).0.into_owned(),
        }
    }

    /// Decode wire bytes. Malformed sequences are replaced, never rejected.
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Charset::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Charset::Gbk => GBK.decode_without_bom_handling(bytes).0.into_owned(),
        }
    }
}
