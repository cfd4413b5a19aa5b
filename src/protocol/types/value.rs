//! Decoded column and parameter values.

use crate::error::{Error, Result};
use crate::protocol::codec::SessionCodec;
use crate::protocol::decode::{
    decode_datetime, decode_time, format_interval_ds, format_interval_ym,
};
use chrono::{NaiveDateTime, NaiveTime};
use std::fmt;

use super::wire_type::WireType;

/// A single decoded value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// NULL value.
    Null,
    /// 32-bit integer (INTEGER, BOOLEAN stored as int).
    Int(i32),
    /// 64-bit integer.
    BigInt(i64),
    /// Double precision float.
    Real(f64),
    /// NUMBER / DECIMAL as text (preserves precision).
    Number(String),
    /// Character data.
    Text(String),
    /// Binary data (BINARY, VARBINARY, RAW, BLOB).
    Bytes(Vec<u8>),
    Bool(bool),
    /// DATE and TIMESTAMP family.
    DateTime(NaiveDateTime),
    Time(NaiveTime),
    /// Year-to-month interval in months.
    IntervalYm(i32),
    /// Day-to-second interval in microseconds.
    IntervalDs(i64),
    /// Server-side cursor id of a REF CURSOR.
    Cursor(u64),
}

fn fixed<const N: usize>(ty: WireType, bytes: &[u8]) -> Result<[u8; N]> {
    bytes.try_into().map_err(|_| {
        Error::protocol(format!(
            "{} value must be {} bytes, got {}",
            ty,
            N,
            bytes.len()
        ))
    })
}

impl Value {
    /// Decode raw wire bytes of the given type.
    ///
    /// `None` is SQL NULL. Fixed-width integer types accept either a 4 or an
    /// 8 byte encoding since the out-parameter block widens some of them.
    pub fn decode(ty: WireType, bytes: Option<&[u8]>, codec: &SessionCodec) -> Result<Value> {
        let Some(bytes) = bytes else {
            return Ok(Value::Null);
        };

        let value = match ty {
            WireType::Int | WireType::BigInt | WireType::RefCursor | WireType::Bool => {
                let n = match bytes.len() {
                    4 => codec.decode_i32(fixed(ty, bytes)?) as i64,
                    _ => codec.decode_i64(fixed(ty, bytes)?),
                };
                match ty {
                    WireType::Int => match i32::try_from(n) {
                        Ok(v) => Value::Int(v),
                        Err(_) => Value::BigInt(n),
                    },
                    WireType::Bool => Value::Bool(n != 0),
                    WireType::RefCursor => Value::Cursor(n as u64),
                    _ => Value::BigInt(n),
                }
            }
            WireType::Real => Value::Real(codec.decode_f64(fixed(ty, bytes)?)),
            WireType::Numeric | WireType::Decimal => {
                Value::Number(codec.decode_text(bytes).trim().to_string())
            }
            WireType::Char | WireType::Varchar | WireType::Text | WireType::Clob => {
                Value::Text(codec.decode_text(bytes))
            }
            WireType::Binary
            | WireType::VarBinary
            | WireType::Raw
            | WireType::Blob
            | WireType::Unspecified => Value::Bytes(bytes.to_vec()),
            WireType::Date
            | WireType::Timestamp
            | WireType::TimestampTz
            | WireType::TimestampLtz => {
                Value::DateTime(decode_datetime(codec.decode_i64(fixed(ty, bytes)?))?)
            }
            WireType::Time => Value::Time(decode_time(codec.decode_i64(fixed(ty, bytes)?))?),
            WireType::IntervalYm => Value::IntervalYm(codec.decode_i32(fixed(ty, bytes)?)),
            WireType::IntervalDs => Value::IntervalDs(codec.decode_i64(fixed(ty, bytes)?)),
        };
        Ok(value)
    }

    /// Check if the value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get the value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::Number(s) => Some(s),
            _ => None,
        }
    }

    /// Try to convert to i64.
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v as i64),
            Value::BigInt(v) => Some(*v),
            Value::Bool(b) => Some(*b as i64),
            Value::Number(s) | Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Try to convert to f64.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Value::Real(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            Value::BigInt(v) => Some(*v as f64),
            Value::Number(s) | Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn to_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(_) | Value::BigInt(_) => self.to_i64().map(|v| v != 0),
            _ => None,
        }
    }

    /// Try to get the value as a NaiveDateTime.
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Try to get the value as raw bytes.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            Value::Text(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    pub fn as_cursor(&self) -> Option<u64> {
        match self {
            Value::Cursor(id) => Some(*id),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Int(v) => write!(f, "{}", v),
            Value::BigInt(v) => write!(f, "{}", v),
            Value::Real(v) => write!(f, "{}", v),
            Value::Number(s) | Value::Text(s) => write!(f, "{}", s),
            Value::Bytes(b) => {
                for byte in b {
                    write!(f, "{:02X}", byte)?;
                }
                Ok(())
            }
            Value::Bool(b) => write!(f, "{}", b),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.f")),
            Value::Time(t) => write!(f, "{}", t.format("%H:%M:%S%.f")),
            Value::IntervalYm(m) => f.write_str(&format_interval_ym(*m)),
            Value::IntervalDs(us) => f.write_str(&format_interval_ds(*us)),
            Value::Cursor(id) => write!(f, "<CURSOR {}>", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::buffer::Endian;
    use crate::protocol::charset::Charset;

    fn le() -> SessionCodec {
        SessionCodec::new(Endian::Little, Charset::Utf8)
    }

    #[test]
    fn test_null() {
        let val = Value::decode(WireType::Int, None, &le()).unwrap();
        assert!(val.is_null());
        assert_eq!(val.as_str(), None);
        assert_eq!(format!("{}", val), "NULL");
    }

    #[test]
    fn test_integers() {
        let codec = le();
        assert_eq!(
            Value::decode(WireType::Int, Some(&[7, 0, 0, 0]), &codec).unwrap(),
            Value::Int(7)
        );
        assert_eq!(
            Value::decode(WireType::Int, Some(&codec.encode_i64(-3)), &codec).unwrap(),
            Value::Int(-3)
        );
        assert_eq!(
            Value::decode(WireType::BigInt, Some(&codec.encode_i64(1 << 40)), &codec).unwrap(),
            Value::BigInt(1 << 40)
        );
        assert!(matches!(
            Value::decode(WireType::BigInt, Some(&[1, 2, 3]), &codec),
            Err(Error::Protocol { .. })
        ));
    }

    #[test]
    fn test_big_endian_session() {
        let codec = SessionCodec::new(Endian::Big, Charset::Utf8);
        assert_eq!(
            Value::decode(WireType::Int, Some(&[0, 0, 1, 0]), &codec).unwrap(),
            Value::Int(256)
        );
    }

    #[test]
    fn test_number_and_text() {
        let codec = le();
        let val = Value::decode(WireType::Numeric, Some(b"123.45"), &codec).unwrap();
        assert_eq!(val.as_str(), Some("123.45"));
        assert_eq!(val.to_i64(), None);
        assert_eq!(val.to_f64(), Some(123.45));

        let val = Value::decode(WireType::Varchar, Some("héllo".as_bytes()), &codec).unwrap();
        assert_eq!(val, Value::Text("héllo".to_string()));
    }

    #[test]
    fn test_cursor_and_real() {
        let codec = le();
        let val = Value::decode(WireType::RefCursor, Some(&codec.encode_i64(99)), &codec).unwrap();
        assert_eq!(val.as_cursor(), Some(99));

        let val = Value::decode(WireType::Real, Some(&codec.encode_f64(2.5)), &codec).unwrap();
        assert_eq!(val.to_f64(), Some(2.5));
    }

    #[test]
    fn test_display_temporal() {
        let codec = le();
        let val = Value::decode(WireType::Timestamp, Some(&codec.encode_i64(0)), &codec).unwrap();
        assert_eq!(val.to_string(), "2000-01-01 00:00:00");

        assert_eq!(Value::IntervalYm(13).to_string(), "1-01");
        assert_eq!(Value::Bytes(vec![0xAB, 0x01]).to_string(), "AB01");
    }
}
