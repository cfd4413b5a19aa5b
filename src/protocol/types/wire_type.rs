//! Wire type tags and the client-facing SQL type enumeration.

use crate::error::{Error, Result};

/// Internal type tag used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum WireType {
    #[default]
    Unspecified = 0,
    Int = 1,
    BigInt = 2,
    Real = 3,
    Numeric = 4,
    Decimal = 5,
    Date = 6,
    Timestamp = 7,
    Char = 8,
    Varchar = 9,
    Text = 10,
    Binary = 11,
    VarBinary = 12,
    Clob = 13,
    Blob = 14,
    RefCursor = 15,
    Bool = 17,
    TimestampLtz = 19,
    IntervalYm = 21,
    IntervalDs = 22,
    Raw = 23,
    Time = 26,
    TimestampTz = 32,
}

impl WireType {
    /// Parse a type code received from the server.
    pub fn from_code(code: u8) -> Result<Self> {
        let ty = match code {
            0 => WireType::Unspecified,
            1 => WireType::Int,
            2 => WireType::BigInt,
            3 => WireType::Real,
            4 => WireType::Numeric,
            5 => WireType::Decimal,
            6 => WireType::Date,
            7 => WireType::Timestamp,
            8 => WireType::Char,
            9 => WireType::Varchar,
            10 => WireType::Text,
            11 => WireType::Binary,
            12 => WireType::VarBinary,
            13 => WireType::Clob,
            14 => WireType::Blob,
            15 => WireType::RefCursor,
            17 => WireType::Bool,
            19 => WireType::TimestampLtz,
            21 => WireType::IntervalYm,
            22 => WireType::IntervalDs,
            23 => WireType::Raw,
            26 => WireType::Time,
            32 => WireType::TimestampTz,
            other => {
                return Err(Error::type_error(format!("unknown wire type code {}", other)))
            }
        };
        Ok(ty)
    }

    /// Type code sent on the wire.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Type name for messages.
    pub fn name(self) -> &'static str {
        match self {
            WireType::Unspecified => "UNSPECIFIED",
            WireType::Int => "INTEGER",
            WireType::BigInt => "BIGINT",
            WireType::Real => "REAL",
            WireType::Numeric => "NUMBER",
            WireType::Decimal => "DECIMAL",
            WireType::Date => "DATE",
            WireType::Timestamp => "TIMESTAMP",
            WireType::Char => "CHAR",
            WireType::Varchar => "VARCHAR",
            WireType::Text => "TEXT",
            WireType::Binary => "BINARY",
            WireType::VarBinary => "VARBINARY",
            WireType::Clob => "CLOB",
            WireType::Blob => "BLOB",
            WireType::RefCursor => "REF CURSOR",
            WireType::Bool => "BOOLEAN",
            WireType::TimestampLtz => "TIMESTAMP WITH LOCAL TIME ZONE",
            WireType::IntervalYm => "INTERVAL YEAR TO MONTH",
            WireType::IntervalDs => "INTERVAL DAY TO SECOND",
            WireType::Raw => "RAW",
            WireType::Time => "TIME",
            WireType::TimestampTz => "TIMESTAMP WITH TIME ZONE",
        }
    }

    /// Whether the metadata width pair holds (precision, scale).
    pub fn has_scale(self) -> bool {
        matches!(self, WireType::Numeric | WireType::Decimal)
    }

    /// Whether the metadata width pair holds a fractional-second precision.
    pub fn is_temporal(self) -> bool {
        matches!(
            self,
            WireType::Date | WireType::Timestamp | WireType::TimestampTz | WireType::TimestampLtz
        )
    }
}

impl std::fmt::Display for WireType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Client-facing SQL type used when declaring OUTPUT parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Bit,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Real,
    Float,
    Double,
    Numeric,
    Decimal,
    Char,
    Varchar,
    LongVarchar,
    Clob,
    Binary,
    VarBinary,
    LongVarBinary,
    Blob,
    Boolean,
    Date,
    Time,
    Timestamp,
    TimestampWithTimezone,
    Array,
    RefCursor,
    Null,
    Other,
}

impl SqlType {
    /// Wire type the server expects for an OUTPUT parameter of this type.
    pub fn wire_type(self) -> WireType {
        match self {
            SqlType::Real | SqlType::Float | SqlType::Double => WireType::Real,
            SqlType::Numeric => WireType::Numeric,
            SqlType::Decimal => WireType::Decimal,
            SqlType::Varchar => WireType::Text,
            SqlType::Clob | SqlType::LongVarchar => WireType::Clob,
            SqlType::Blob | SqlType::LongVarBinary => WireType::Blob,
            SqlType::Char => WireType::Char,
            SqlType::Boolean => WireType::Bool,
            SqlType::Binary => WireType::Binary,
            SqlType::VarBinary => WireType::VarBinary,
            SqlType::Bit | SqlType::Integer | SqlType::TinyInt | SqlType::SmallInt => WireType::Int,
            SqlType::BigInt => WireType::BigInt,
            SqlType::Date => WireType::Date,
            SqlType::Timestamp => WireType::Timestamp,
            SqlType::TimestampWithTimezone => WireType::TimestampTz,
            SqlType::RefCursor => WireType::RefCursor,
            SqlType::Other => WireType::Unspecified,
            SqlType::Array | SqlType::Null | SqlType::Time => WireType::Varchar,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_roundtrip() {
        for code in 0u8..=40 {
            if let Ok(ty) = WireType::from_code(code) {
                assert_eq!(ty.code(), code);
            }
        }
        assert!(matches!(WireType::from_code(99), Err(Error::Type { .. })));
    }

    #[test]
    fn test_sql_type_table() {
        assert_eq!(SqlType::Float.wire_type(), WireType::Real);
        assert_eq!(SqlType::Double.wire_type(), WireType::Real);
        assert_eq!(SqlType::Varchar.wire_type(), WireType::Text);
        assert_eq!(SqlType::RefCursor.wire_type(), WireType::RefCursor);
        assert_eq!(SqlType::SmallInt.wire_type(), WireType::Int);
        assert_eq!(SqlType::LongVarBinary.wire_type(), WireType::Blob);
        assert_eq!(SqlType::Other.wire_type(), WireType::Unspecified);
        assert_eq!(SqlType::Null.wire_type(), WireType::Varchar);
        // TIME outputs are requested as text; code 26 only arrives in results
        assert_eq!(SqlType::Time.wire_type(), WireType::Varchar);
        assert_eq!(WireType::from_code(26).unwrap(), WireType::Time);
    }
}
