//! Stored-procedure output decoding.
//!
//! A procedure response carries one metadata block describing every output
//! column, followed by a single packed row. The packed row format is shared
//! with query result rows and lives here as [`decode_packed_row`].

use bytes::Bytes;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::protocol::buffer::ReadBuffer;
use crate::protocol::codec::SessionCodec;
use crate::protocol::constants::{
    LEN_CLASS_4, LEN_CLASS_8, LEN_CLASS_NULL, OUT_PARAM_NAME_LEN, PACKED_CLASS_BASE_LEN,
    PACKED_CLASS_THRESHOLD, ROW_HEADER_SIZE,
};
use crate::protocol::types::{RawRow, Value, WireType};

/// Length of the packed class region for `columns` columns.
pub fn packed_class_len(columns: usize) -> usize {
    if columns < PACKED_CLASS_THRESHOLD {
        PACKED_CLASS_BASE_LEN
    } else {
        PACKED_CLASS_BASE_LEN + ((columns + 3) & !15) / 4
    }
}

/// Decode one packed row: row header, class region, then the values.
///
/// Every column has a 2-bit class, four per byte, lowest bits first:
/// 0 is NULL, 1 a 4-byte value, 2 an 8-byte value and 3 a
/// `[len:2][bytes]` value padded so the whole entry is 4-byte aligned.
pub fn decode_packed_row(buf: &mut ReadBuffer, columns: usize) -> Result<RawRow> {
    buf.skip(ROW_HEADER_SIZE)?;
    let classes = buf.read_bytes(packed_class_len(columns))?;
    if columns > classes.len() * 4 {
        return Err(Error::protocol(format!(
            "class region of {} bytes cannot describe {} columns",
            classes.len(),
            columns
        )));
    }

    let mut row = Vec::with_capacity(columns);
    for col in 0..columns {
        let class = (classes[col / 4] >> ((col % 4) * 2)) & 0b11;
        let value = match class {
            LEN_CLASS_NULL => None,
            LEN_CLASS_4 => Some(buf.read_bytes(4)?),
            LEN_CLASS_8 => Some(buf.read_bytes(8)?),
            _ => {
                let len = buf.read_u16()? as usize;
                let value = buf.read_bytes(len)?;
                buf.skip((4 - (len + 2) % 4) % 4)?;
                Some(value)
            }
        };
        row.push(value);
    }
    Ok(row)
}

/// Metadata of one output column.
#[derive(Debug, Clone, PartialEq)]
pub struct OutParamField {
    pub name: String,
    pub wire_type: WireType,
    pub precision: u8,
    pub scale: u8,
    /// Raw direction flags reported by the server.
    pub direction: u8,
}

impl OutParamField {
    fn parse(buf: &mut ReadBuffer, codec: &SessionCodec) -> Result<Self> {
        let raw_name = buf.read_bytes(OUT_PARAM_NAME_LEN)?;
        let end = raw_name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(raw_name.len());
        let name = codec.decode_text(&raw_name[..end]);

        let width = buf.read_bytes(2)?;
        let direction = buf.read_u8()?;
        let wire_type = WireType::from_code(buf.read_u8()?)?;

        let (precision, scale) = if wire_type.has_scale() {
            (width[0], width[1])
        } else if wire_type.is_temporal() {
            (width[0], 0)
        } else {
            (0, 0)
        };

        Ok(Self {
            name,
            wire_type,
            precision,
            scale,
            direction,
        })
    }
}

/// Decoded outputs of one procedure execution.
#[derive(Debug, Clone)]
pub struct OutParams {
    fields: Vec<OutParamField>,
    values: RawRow,
    /// Parameter ordinal to out-column index.
    by_ordinal: HashMap<usize, usize>,
    /// Upper-cased column name to parameter ordinal.
    by_name: HashMap<String, usize>,
    codec: SessionCodec,
    last_null: bool,
}

impl OutParams {
    /// Decode the metadata block and its value row.
    ///
    /// `out_ordinals` are the declared OUTPUT ordinals in ascending order; the
    /// k-th ordinal maps to the k-th column the server describes.
    pub fn decode(
        buf: &mut ReadBuffer,
        out_ordinals: &[usize],
        codec: SessionCodec,
    ) -> Result<Self> {
        let count = buf.read_u32()? as usize;
        if count != out_ordinals.len() {
            return Err(Error::protocol(format!(
                "expected {} out parameters but the server described {}",
                out_ordinals.len(),
                count
            )));
        }

        let fields = (0..count)
            .map(|_| OutParamField::parse(buf, &codec))
            .collect::<Result<Vec<_>>>()?;

        let mut by_ordinal = HashMap::with_capacity(count);
        let mut by_name = HashMap::with_capacity(count);
        for (column, (&ordinal, field)) in out_ordinals.iter().zip(&fields).enumerate() {
            by_ordinal.insert(ordinal, column);
            by_name.insert(field.name.to_uppercase(), ordinal);
        }

        let values = decode_packed_row(buf, count)?;

        Ok(Self {
            fields,
            values,
            by_ordinal,
            by_name,
            codec,
            last_null: false,
        })
    }

    pub fn fields(&self) -> &[OutParamField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Out-column index of a parameter ordinal.
    pub fn column_of(&self, ordinal: usize) -> Result<usize> {
        self.by_ordinal
            .get(&ordinal)
            .copied()
            .ok_or_else(|| Error::parameter(format!("parameter {} is not an output", ordinal)))
    }

    /// Parameter ordinal of an output name (case-insensitive).
    pub fn ordinal_of(&self, name: &str) -> Result<usize> {
        self.by_name
            .get(&name.to_uppercase())
            .copied()
            .ok_or_else(|| Error::parameter(format!("no output parameter named {}", name)))
    }

    /// Raw bytes of an output, `None` for NULL.
    pub fn raw(&self, ordinal: usize) -> Result<Option<&Bytes>> {
        let column = self.column_of(ordinal)?;
        Ok(self.values.get(column).and_then(Option::as_ref))
    }

    /// Decode the output at a parameter ordinal.
    pub fn get(&mut self, ordinal: usize) -> Result<Value> {
        let column = self.column_of(ordinal)?;
        let raw = self.values.get(column).and_then(|v| v.as_deref());
        self.last_null = raw.is_none();
        Value::decode(self.fields[column].wire_type, raw, &self.codec)
    }

    /// Decode the output with the given name.
    pub fn get_by_name(&mut self, name: &str) -> Result<Value> {
        let ordinal = self.ordinal_of(name)?;
        self.get(ordinal)
    }

    /// Whether the last value read was NULL.
    pub fn was_null(&self) -> bool {
        self.last_null
    }

    pub fn get_i32(&mut self, ordinal: usize) -> Result<Option<i32>> {
        let value = self.get(ordinal)?;
        match value.to_i64() {
            Some(v) => i32::try_from(v)
                .map(Some)
                .map_err(|_| Error::type_error(format!("{} does not fit in i32", v))),
            None => convert_none(value, "i32"),
        }
    }

    pub fn get_i64(&mut self, ordinal: usize) -> Result<Option<i64>> {
        let value = self.get(ordinal)?;
        match value.to_i64() {
            Some(v) => Ok(Some(v)),
            None => convert_none(value, "i64"),
        }
    }

    pub fn get_f64(&mut self, ordinal: usize) -> Result<Option<f64>> {
        let value = self.get(ordinal)?;
        match value.to_f64() {
            Some(v) => Ok(Some(v)),
            None => convert_none(value, "f64"),
        }
    }

    pub fn get_string(&mut self, ordinal: usize) -> Result<Option<String>> {
        let value = self.get(ordinal)?;
        if value.is_null() {
            return Ok(None);
        }
        Ok(Some(value.to_string()))
    }

    pub fn get_bytes(&mut self, ordinal: usize) -> Result<Option<Vec<u8>>> {
        let value = self.get(ordinal)?;
        match value.as_bytes() {
            Some(b) => Ok(Some(b.to_vec())),
            None => convert_none(value, "bytes"),
        }
    }

    /// Server cursor id of a REF CURSOR output.
    pub fn get_cursor(&mut self, ordinal: usize) -> Result<Option<u64>> {
        let value = self.get(ordinal)?;
        match value.as_cursor() {
            Some(id) => Ok(Some(id)),
            None => convert_none(value, "cursor"),
        }
    }
}

fn convert_none<T>(value: Value, target: &str) -> Result<Option<T>> {
    if value.is_null() {
        Ok(None)
    } else {
        Err(Error::type_error(format!(
            "cannot convert {:?} to {}",
            value, target
        )))
    }
}
