//! Column and ColumnInfo types for result sets.

use super::wire_type::WireType;

/// A column in a result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name as reported by the server.
    pub name: String,
    /// Wire type of the column values.
    pub data_type: WireType,
    /// Declared size in bytes.
    pub size: u16,
    pub precision: u8,
    pub scale: u8,
    /// Whether NULL values are allowed.
    pub nullable: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: WireType) -> Self {
        Self {
            name: name.into(),
            data_type,
            size: 0,
            precision: 0,
            scale: 0,
            nullable: true,
        }
    }
}

/// Shared column information for all rows in a result set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnInfo {
    /// Column definitions.
    pub columns: Vec<Column>,
}

impl ColumnInfo {
    /// Create new column info from columns.
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    /// Get column names.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Get the number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if there are no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Get column by index.
    pub fn get(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Find column index by name (case-insensitive).
    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }
}
