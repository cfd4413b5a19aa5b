//! oGRAC Thin Client for Rust
//!
//! A pure Rust async client for oGRAC database servers speaking the native
//! binary wire protocol. No vendor client library is required.
//!
//! # Example
//!
//! ```no_run
//! use ograc_thin_rs::{ConnectParams, Connection, Cursor, Execution, Result, SqlType, WireType};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let conn = Connection::connect(ConnectParams::parse("scott/tiger@localhost:1611")?).await?;
//!
//!     // Plain query
//!     let mut cursor = conn.query("SELECT id, name FROM users").await?;
//!     while let Some(row) = cursor.next().await? {
//!         println!("{} {}", row.get(0)?, row.get_by_name("NAME")?);
//!     }
//!     cursor.close().await?;
//!     drop(cursor);
//!
//!     // Procedure call with an output parameter
//!     let mut params = conn.parameters(2);
//!     params.bind_value(1, WireType::Int, 42)?;
//!     params.bind_out_type(2, SqlType::Varchar)?;
//!     if let Execution::Procedure { stmt_id, mut out } =
//!         conn.execute("CALL lookup_name(?, ?)", &params).await?
//!     {
//!         println!("{:?}", out.get_string(2)?);
//!         conn.free_statement(stmt_id).await?;
//!     }
//!
//!     conn.close().await?;
//!     Ok(())
//! }
//! ```

pub mod connection;
pub mod cursor;
pub mod error;
pub mod protocol;

// Re-export main types
pub use connection::{Connection, Execution};
pub use cursor::{Cursor, CursorState, CursorStreamExt, FetchRequest, FetchSource, RowCursor};
pub use error::{Error, Result};
pub use protocol::auth::Session;
pub use protocol::connect::{ConnectParams, DEFAULT_PORT};
pub use protocol::out_params::{OutParamField, OutParams};
pub use protocol::params::{ParamDirection, ParamValue, ParameterList};
pub use protocol::types::{Column, ColumnInfo, Row, SqlType, Value, WireType};
