//! Data types for query results and parameters.

mod column;
mod row;
mod value;
mod wire_type;

pub use column::{Column, ColumnInfo};
pub use row::{RawRow, Row};
pub use value::Value;
pub use wire_type::{SqlType, WireType};
