//! Response parsing.
//!
//! Every response body is either an error payload (non-zero `exec_result`) or
//! the command-specific success body parsed by the functions below.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::protocol::buffer::{pad4, ReadBuffer};
use crate::protocol::codec::SessionCodec;
use crate::protocol::constants::*;
use crate::protocol::out_params::{decode_packed_row, OutParams};
use crate::protocol::packet::Packet;
use crate::protocol::types::{Column, ColumnInfo, RawRow, WireType};

/// Error reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerError {
    pub code: u32,
    pub message: String,
}

impl From<ServerError> for Error {
    fn from(e: ServerError) -> Self {
        Error::server(e.code, e.message)
    }
}

/// Parse an error payload.
///
/// Protocol versions before 23 carry the message as NUL-terminated raw bytes;
/// later versions carry a `[len:4][bytes][pad]` field.
pub fn parse_error_payload(
    buf: &mut ReadBuffer,
    version: u32,
    codec: &SessionCodec,
) -> Result<ServerError> {
    let code = buf.read_u32()?;
    // line, column, and two reserved words
    buf.skip(8)?;

    let message = if version < VERSION_MIN_FRAMED_ERROR {
        let rest = buf.read_remaining();
        let end = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
        codec.decode_text(&rest[..end])
    } else {
        let len = buf.read_u32()? as usize;
        let padded = len + pad4(len);
        if padded > buf.remaining() {
            return Err(Error::protocol(format!(
                "error message length {} exceeds the {} bytes remaining",
                padded,
                buf.remaining()
            )));
        }
        let bytes = buf.read_bytes(len)?;
        buf.skip(pad4(len))?;
        codec.decode_text(&bytes)
    };

    Ok(ServerError { code, message })
}

/// Open a reader over a response body, turning error payloads into
/// [`Error::Server`].
pub fn check_response(packet: &Packet, version: u32, codec: &SessionCodec) -> Result<ReadBuffer> {
    let mut buf = packet.reader(codec.endian);
    if packet.header.is_error() {
        return Err(parse_error_payload(&mut buf, version, codec)?.into());
    }
    Ok(buf)
}

/// Columns and rows of one result-set block.
#[derive(Debug, Clone)]
pub struct RowBatch {
    pub columns: Arc<ColumnInfo>,
    pub rows: Vec<RawRow>,
    /// Whether the server holds more rows for this cursor.
    pub has_remain: bool,
}

fn parse_column(buf: &mut ReadBuffer, codec: &SessionCodec) -> Result<Column> {
    let name = codec.decode_text(&buf.read_padded_bytes()?);
    let data_type = WireType::from_code(buf.read_u8()?)?;
    let nullable = buf.read_u8()? != 0;
    let precision = buf.read_u8()?;
    let scale = buf.read_u8()?;
    let size = buf.read_u16()?;
    buf.skip(2)?;
    Ok(Column {
        name,
        data_type,
        size,
        precision,
        scale,
        nullable,
    })
}

/// Parse a result-set block: column descriptions, then a batch of rows.
pub fn parse_row_batch(buf: &mut ReadBuffer, codec: &SessionCodec) -> Result<RowBatch> {
    let column_count = buf.read_u16()? as usize;
    buf.skip(2)?;
    let columns = (0..column_count)
        .map(|_| parse_column(buf, codec))
        .collect::<Result<Vec<_>>>()?;

    let row_count = buf.read_u32()? as usize;
    let has_remain = buf.read_u32()? != 0;
    let rows = (0..row_count)
        .map(|_| decode_packed_row(buf, column_count))
        .collect::<Result<Vec<_>>>()?;

    Ok(RowBatch {
        columns: Arc::new(ColumnInfo::new(columns)),
        rows,
        has_remain,
    })
}

/// Outcome of an execute request.
#[derive(Debug)]
pub enum ExecuteOutcome {
    Update {
        affected: u32,
    },
    Query {
        cursor_id: u64,
        mode: u32,
        batch: RowBatch,
    },
    Procedure(OutParams),
}

/// Parsed execute response.
#[derive(Debug)]
pub struct ExecuteResponse {
    /// Server statement id.
    pub stmt_id: u32,
    pub outcome: ExecuteOutcome,
}

/// Parse an execute response.
///
/// `out_ordinals` are the declared OUTPUT ordinals in ascending order, used
/// to reconcile a procedure's out-parameter block.
pub fn parse_execute_response(
    buf: &mut ReadBuffer,
    codec: &SessionCodec,
    out_ordinals: &[usize],
) -> Result<ExecuteResponse> {
    let stmt_id = buf.read_u32()?;
    let outcome = parse_execute_outcome(buf, codec, out_ordinals)?;
    Ok(ExecuteResponse { stmt_id, outcome })
}

/// Parse the part of an execute response that follows the statement id.
pub fn parse_execute_outcome(
    buf: &mut ReadBuffer,
    codec: &SessionCodec,
    out_ordinals: &[usize],
) -> Result<ExecuteOutcome> {
    let kind = buf.read_u8()?;
    buf.skip(3)?;

    let outcome = match kind {
        EXEC_KIND_UPDATE => ExecuteOutcome::Update {
            affected: buf.read_u32()?,
        },
        EXEC_KIND_QUERY => {
            let cursor_id = buf.read_u64()?;
            let mode = buf.read_u32()?;
            let batch = parse_row_batch(buf, codec)?;
            ExecuteOutcome::Query {
                cursor_id,
                mode,
                batch,
            }
        }
        EXEC_KIND_PROCEDURE => {
            ExecuteOutcome::Procedure(OutParams::decode(buf, out_ordinals, *codec)?)
        }
        other => {
            return Err(Error::protocol(format!(
                "unknown execute result kind {}",
                other
            )))
        }
    };
    Ok(outcome)
}

/// Parsed PREPARE response.
#[derive(Debug, Clone, PartialEq)]
pub struct DescribeResponse {
    pub stmt_id: u32,
    pub param_types: Vec<WireType>,
}

/// Parse a PREPARE response describing the statement's parameters.
pub fn parse_describe_response(buf: &mut ReadBuffer) -> Result<DescribeResponse> {
    let stmt_id = buf.read_u32()?;
    let count = buf.read_u16()? as usize;
    buf.skip(2)?;
    let param_types = (0..count)
        .map(|_| WireType::from_code(buf.read_u8()?))
        .collect::<Result<Vec<_>>>()?;
    buf.skip(pad4(count))?;
    Ok(DescribeResponse {
        stmt_id,
        param_types,
    })
}
