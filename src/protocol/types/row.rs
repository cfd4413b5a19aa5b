//! Row type for query results.
//!
//! Rows keep the raw length-tagged byte values the server sent and decode a
//! column only when it is read.

use bytes::Bytes;
use std::sync::Arc;

use super::column::{Column, ColumnInfo};
use super::value::Value;
use crate::error::{Error, Result};
use crate::protocol::codec::SessionCodec;

/// Raw column values of one row; `None` is SQL NULL.
pub type RawRow = Vec<Option<Bytes>>;

/// A row of query results.
#[derive(Debug, Clone)]
pub struct Row {
    values: RawRow,
    column_info: Arc<ColumnInfo>,
    codec: SessionCodec,
}

impl Row {
    /// Create a new row with raw values and shared column info.
    pub fn new(values: RawRow, column_info: Arc<ColumnInfo>, codec: SessionCodec) -> Self {
        Self {
            values,
            column_info,
            codec,
        }
    }

    /// Decode the value at a column index (0-based).
    pub fn get(&self, index: usize) -> Result<Value> {
        let column = self.column_info.get(index).ok_or_else(|| {
            Error::parameter(format!(
                "column index {} out of range (row has {} columns)",
                index,
                self.column_info.len()
            ))
        })?;
        let raw = self.values.get(index).and_then(|v| v.as_deref());
        Value::decode(column.data_type, raw, &self.codec)
    }

    /// Decode the value of a column by name (case-insensitive).
    pub fn get_by_name(&self, name: &str) -> Result<Value> {
        let index = self
            .column_info
            .find_by_name(name)
            .ok_or_else(|| Error::parameter(format!("no column named {}", name)))?;
        self.get(index)
    }

    /// Raw bytes of a column, `None` for NULL.
    pub fn raw(&self, index: usize) -> Option<&[u8]> {
        self.values.get(index).and_then(|v| v.as_deref())
    }

    pub fn is_null(&self, index: usize) -> bool {
        self.raw(index).is_none()
    }

    /// Get the number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the row is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get column information.
    pub fn columns(&self) -> &[Column] {
        &self.column_info.columns
    }

    /// Decode every column.
    pub fn values(&self) -> Result<Vec<Value>> {
        (0..self.column_info.len()).map(|i| self.get(i)).collect()
    }
}
