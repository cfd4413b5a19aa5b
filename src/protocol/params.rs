//! Parameter binding and wire encoding.
//!
//! A [`ParameterList`] holds one slot per `?` placeholder. Slots are addressed
//! with 1-based ordinals. Each slot carries the bound value, the wire type it is
//! encoded as, its direction flags and the encoded bytes sent with the
//! execute request.

use chrono::NaiveDateTime;

use crate::error::{Error, Result};
use crate::protocol::codec::SessionCodec;
use crate::protocol::constants::{PARAM_DIR_IN, PARAM_DIR_OUT};
use crate::protocol::decode::encode_datetime;
use crate::protocol::types::{SqlType, WireType};

/// Direction flags of a parameter. Flags only accumulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParamDirection {
    pub input: bool,
    pub output: bool,
}

impl ParamDirection {
    /// Wire encoding: IN = 64, OUT = 128, INOUT = 192.
    pub fn flags(self) -> u8 {
        let mut flags = 0;
        if self.input {
            flags |= PARAM_DIR_IN;
        }
        if self.output {
            flags |= PARAM_DIR_OUT;
        }
        flags
    }
}

/// A value supplied by the caller for an input parameter.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ParamValue {
    #[default]
    Null,
    Int(i32),
    Long(i64),
    Double(f64),
    Bool(bool),
    Text(String),
    Bytes(Vec<u8>),
    DateTime(NaiveDateTime),
}

impl ParamValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ParamValue::Null)
    }

    fn as_i64(&self, ty: WireType) -> Result<i64> {
        match self {
            ParamValue::Int(v) => Ok(*v as i64),
            ParamValue::Long(v) => Ok(*v),
            ParamValue::Bool(b) => Ok(*b as i64),
            ParamValue::DateTime(dt) => Ok(encode_datetime(dt)),
            ParamValue::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| Error::type_error(format!("'{}' is not a valid {} value", s, ty))),
            other => Err(mismatch(other, ty)),
        }
    }

    fn as_f64(&self, ty: WireType) -> Result<f64> {
        match self {
            ParamValue::Int(v) => Ok(*v as f64),
            ParamValue::Long(v) => Ok(*v as f64),
            ParamValue::Double(v) => Ok(*v),
            ParamValue::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| Error::type_error(format!("'{}' is not a valid {} value", s, ty))),
            other => Err(mismatch(other, ty)),
        }
    }

    fn as_text(&self, ty: WireType) -> Result<String> {
        match self {
            ParamValue::Int(v) => Ok(v.to_string()),
            ParamValue::Long(v) => Ok(v.to_string()),
            ParamValue::Double(v) => Ok(v.to_string()),
            ParamValue::Bool(b) => Ok(b.to_string()),
            ParamValue::Text(s) => Ok(s.clone()),
            ParamValue::DateTime(dt) => Ok(dt.to_string()),
            other => Err(mismatch(other, ty)),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ParamValue::Null => "null",
            ParamValue::Int(_) => "int",
            ParamValue::Long(_) => "long",
            ParamValue::Double(_) => "double",
            ParamValue::Bool(_) => "bool",
            ParamValue::Text(_) => "text",
            ParamValue::Bytes(_) => "bytes",
            ParamValue::DateTime(_) => "datetime",
        }
    }
}

fn mismatch(value: &ParamValue, ty: WireType) -> Error {
    Error::type_error(format!("cannot bind a {} value as {}", value.kind(), ty))
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Long(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Double(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

impl From<Vec<u8>> for ParamValue {
    fn from(v: Vec<u8>) -> Self {
        ParamValue::Bytes(v)
    }
}

impl From<&[u8]> for ParamValue {
    fn from(v: &[u8]) -> Self {
        ParamValue::Bytes(v.to_vec())
    }
}

impl From<NaiveDateTime> for ParamValue {
    fn from(v: NaiveDateTime) -> Self {
        ParamValue::DateTime(v)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(ParamValue::Null, Into::into)
    }
}

/// Encode a value under a wire type.
pub fn encode_value(codec: &SessionCodec, ty: WireType, value: &ParamValue) -> Result<Vec<u8>> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    let bytes = match ty {
        WireType::Int => {
            let v = value.as_i64(ty)?;
            let v = i32::try_from(v)
                .map_err(|_| Error::type_error(format!("{} does not fit in {}", v, ty)))?;
            codec.encode_i32(v)
        }
        WireType::BigInt
        | WireType::Time
        | WireType::Date
        | WireType::Timestamp
        | WireType::TimestampLtz => codec.encode_i64(value.as_i64(ty)?),
        WireType::Real => codec.encode_f64(value.as_f64(ty)?),
        WireType::Numeric
        | WireType::Decimal
        | WireType::Char
        | WireType::Varchar
        | WireType::Text => codec.encode_text(&value.as_text(ty)?),
        WireType::VarBinary | WireType::Binary | WireType::Raw => match value {
            ParamValue::Bytes(b) => codec.encode_field(b),
            other => return Err(mismatch(other, ty)),
        },
        other => {
            return Err(Error::type_error(format!(
                "type {} is not supported for input parameters",
                other
            )))
        }
    };
    Ok(bytes)
}

/// One parameter slot.
#[derive(Debug, Clone, Default)]
pub struct ParamSlot {
    pub value: ParamValue,
    pub wire_type: WireType,
    pub direction: ParamDirection,
    /// Set by a value bind or an output declaration.
    pub bound: bool,
    /// Encoded value; empty for NULL and output-only slots.
    pub encoded: Vec<u8>,
}

/// Bound parameters of one statement execution.
#[derive(Debug, Clone)]
pub struct ParameterList {
    slots: Vec<ParamSlot>,
    /// Output ordinals in declaration order.
    out_order: Vec<usize>,
    codec: SessionCodec,
}

impl ParameterList {
    pub fn new(count: usize, codec: SessionCodec) -> Self {
        Self {
            slots: vec![ParamSlot::default(); count],
            out_order: Vec::new(),
            codec,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn codec(&self) -> &SessionCodec {
        &self.codec
    }

    pub fn slots(&self) -> &[ParamSlot] {
        &self.slots
    }

    /// Slot at a 1-based ordinal.
    pub fn slot(&self, index: usize) -> Result<&ParamSlot> {
        let pos = self.position(index)?;
        Ok(&self.slots[pos])
    }

    fn position(&self, index: usize) -> Result<usize> {
        if index < 1 || index > self.slots.len() {
            return Err(Error::parameter(format!(
                "parameter index {} is out of range (1..={})",
                index,
                self.slots.len()
            )));
        }
        Ok(index - 1)
    }

    /// Bind an input value at a 1-based ordinal.
    pub fn bind_value(
        &mut self,
        index: usize,
        wire_type: WireType,
        value: impl Into<ParamValue>,
    ) -> Result<()> {
        let pos = self.position(index)?;
        let value = value.into();
        let encoded = encode_value(&self.codec, wire_type, &value)?;

        let slot = &mut self.slots[pos];
        slot.wire_type = wire_type;
        slot.value = value;
        slot.encoded = encoded;
        slot.bound = true;
        slot.direction.input = true;
        Ok(())
    }

    /// Bind SQL NULL at a 1-based ordinal.
    pub fn bind_null(&mut self, index: usize, wire_type: WireType) -> Result<()> {
        self.bind_value(index, wire_type, ParamValue::Null)
    }

    /// Declare an output parameter.
    ///
    /// The slot keeps the type of an earlier input bind; otherwise it takes
    /// the wire type mapped from `sql_type`.
    pub fn bind_out_type(&mut self, index: usize, sql_type: SqlType) -> Result<()> {
        let pos = self.position(index)?;
        let slot = &mut self.slots[pos];
        if !slot.direction.input {
            slot.wire_type = sql_type.wire_type();
        }
        slot.bound = true;
        slot.direction.output = true;
        if !self.out_order.contains(&index) {
            self.out_order.push(index);
        }
        Ok(())
    }

    /// Re-encode the stored value of a slot under another wire type.
    pub fn retype(&mut self, index: usize, wire_type: WireType) -> Result<()> {
        let pos = self.position(index)?;
        let encoded = encode_value(&self.codec, wire_type, &self.slots[pos].value)?;
        let slot = &mut self.slots[pos];
        slot.wire_type = wire_type;
        slot.encoded = encoded;
        Ok(())
    }

    /// Retype bound input slots to the types the server described.
    pub fn apply_server_types(&mut self, types: &[WireType]) -> Result<()> {
        for (pos, ty) in types.iter().enumerate().take(self.slots.len()) {
            let slot = &self.slots[pos];
            if slot.direction.input && slot.wire_type != *ty {
                self.retype(pos + 1, *ty)?;
            }
        }
        Ok(())
    }

    /// Fail on the first ordinal with neither a value nor an output declaration.
    pub fn check_all_bound(&self) -> Result<()> {
        match self.slots.iter().position(|s| !s.bound) {
            Some(pos) => Err(Error::parameter(format!(
                "no value specified for parameter {}",
                pos + 1
            ))),
            None => Ok(()),
        }
    }

    /// Reset values, types and bound flags for reuse. Direction flags and
    /// output declarations persist.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.value = ParamValue::Null;
            slot.wire_type = WireType::Unspecified;
            slot.bound = false;
            slot.encoded.clear();
        }
    }

    /// Output ordinals in ascending order.
    pub fn out_ordinals(&self) -> Vec<usize> {
        let mut ordinals = self.out_order.clone();
        ordinals.sort_unstable();
        ordinals
    }

    /// Output ordinals in declaration order.
    pub fn declared_outputs(&self) -> &[usize] {
        &self.out_order
    }

    /// Whether any output was declared.
    pub fn is_procedure(&self) -> bool {
        !self.out_order.is_empty()
    }
}
