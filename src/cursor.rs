//! Buffered, lazily fetched result cursors.
//!
//! A query answers with its first batch of rows; the server keeps the rest
//! behind a cursor id. [`RowCursor`] hands buffered rows out one at a time and
//! asks its [`FetchSource`] for the next batch only once the buffer is empty
//! and the server said more rows remain.

use crate::error::{Error, Result};
use crate::protocol::codec::SessionCodec;
use crate::protocol::response::RowBatch;
use crate::protocol::types::{Column, ColumnInfo, RawRow, Row};
use futures::Stream;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// Common interface of result cursors.
///
/// # Example
///
/// ```no_run
/// use ograc_thin_rs::{ConnectParams, Connection, Cursor, Row};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let conn = Connection::connect(ConnectParams::parse("scott/tiger@localhost:1611")?).await?;
///
///     async fn total_rows<C: Cursor<Item = Row>>(cursor: &mut C) -> ograc_thin_rs::Result<u64> {
///         let mut total = 0;
///         while cursor.next().await?.is_some() {
///             total += 1;
///         }
///         Ok(total)
///     }
///
///     let mut cursor = conn.query("SELECT * FROM orders").await?;
///     println!("{} rows", total_rows(&mut cursor).await?);
///
///     Ok(())
/// }
/// ```
pub trait Cursor {
    /// What one step of the cursor produces.
    type Item;

    /// Column descriptions for this cursor.
    fn columns(&self) -> &[Column];

    /// Number of rows received so far.
    fn rowcount(&self) -> u64;

    /// Whether `close` has run.
    fn is_closed(&self) -> bool;

    /// Whether rows are buffered or still held by the server.
    fn has_more(&self) -> bool;

    /// Rows requested per fetch.
    fn fetch_size(&self) -> u32;

    /// Change the batch size of later fetches. Zero is treated as one.
    fn set_fetch_size(&mut self, size: u32);

    /// Drop buffered rows and release the server statement if owned.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Next row, fetching one more batch when the buffer is empty.
    ///
    /// `Ok(None)` once both the buffer and the server side are drained.
    fn next(&mut self) -> impl Future<Output = Result<Option<Self::Item>>> + Send;

    /// Drain the cursor into a vector and close it.
    fn fetch_all(&mut self) -> impl Future<Output = Result<Vec<Self::Item>>> + Send;
}

/// Position of a server cursor to fetch from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
    pub stmt_id: u32,
    pub cursor_id: u64,
    pub mode: u32,
    pub fetch_size: u32,
}

/// Something that can fetch row batches for a cursor.
///
/// Implemented by [`crate::Connection`]; tests substitute scripted sources.
pub trait FetchSource: Send + Sync {
    /// Fetch the next batch for a cursor.
    fn fetch(&self, req: FetchRequest) -> impl Future<Output = Result<RowBatch>> + Send;

    /// Release a server statement.
    fn release(&self, stmt_id: u32) -> impl Future<Output = Result<()>> + Send;

    /// Queue a statement for release without waiting.
    ///
    /// Called when a cursor that owns its statement is dropped unclosed.
    fn release_later(&self, stmt_id: u32);
}

/// Buffer state of a [`RowCursor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Buffer empty, the server holds more rows.
    Unfetched,
    /// Rows are buffered locally.
    HasBufferedRows,
    /// No buffered rows and nothing left on the server.
    Exhausted,
}

/// Cursor over the rows of one server cursor.
///
/// Borrows its fetch source (normally the connection), so a cursor cannot
/// outlive the connection that opened it.
///
/// # Lifecycle
///
/// 1. Created by `Connection::query()`, `Connection::execute()` or
///    `Connection::open_ref_cursor()`
/// 2. Iterated via `next()`, `fetch_all()` or `into_stream()`
/// 3. Closed explicitly via `close()`, or by `fetch_all()`
///
/// Dropping an unclosed query cursor queues its statement for release; the
/// connection frees it before its next request.
pub struct RowCursor<'c, F: FetchSource> {
    source: &'c F,
    stmt_id: u32,
    cursor_id: u64,
    mode: u32,
    columns: Arc<ColumnInfo>,
    buffer: VecDeque<RawRow>,
    /// Whether the server signaled more rows.
    has_remain: bool,
    state: CursorState,
    fetch_size: u32,
    rows_fetched: u64,
    codec: SessionCodec,
    /// Whether closing releases the statement on the server.
    owns_statement: bool,
    closed: bool,
}

impl<F: FetchSource> std::fmt::Debug for RowCursor<'_, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowCursor")
            .field("stmt_id", &self.stmt_id)
            .field("cursor_id", &self.cursor_id)
            .field("state", &self.state)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl<'c, F: FetchSource> RowCursor<'c, F> {
    /// Cursor over a query result whose first batch already arrived.
    pub(crate) fn from_batch(
        source: &'c F,
        stmt_id: u32,
        cursor_id: u64,
        mode: u32,
        batch: RowBatch,
        fetch_size: u32,
        codec: SessionCodec,
    ) -> Self {
        let mut cursor = Self {
            source,
            stmt_id,
            cursor_id,
            mode,
            columns: batch.columns,
            buffer: VecDeque::new(),
            has_remain: batch.has_remain,
            state: CursorState::Unfetched,
            fetch_size,
            rows_fetched: batch.rows.len() as u64,
            codec,
            owns_statement: true,
            closed: false,
        };
        cursor.buffer.extend(batch.rows);
        cursor.update_state();
        cursor
    }

    /// Cursor that has not received anything yet.
    ///
    /// Columns are learned from the first fetched batch.
    pub(crate) fn unfetched(
        source: &'c F,
        stmt_id: u32,
        cursor_id: u64,
        mode: u32,
        fetch_size: u32,
        codec: SessionCodec,
    ) -> Self {
        Self {
            source,
            stmt_id,
            cursor_id,
            mode,
            columns: Arc::new(ColumnInfo::default()),
            buffer: VecDeque::new(),
            has_remain: true,
            state: CursorState::Unfetched,
            fetch_size,
            rows_fetched: 0,
            codec,
            owns_statement: false,
            closed: false,
        }
    }

    fn update_state(&mut self) {
        self.state = if !self.buffer.is_empty() {
            CursorState::HasBufferedRows
        } else if self.has_remain && !self.closed {
            CursorState::Unfetched
        } else {
            CursorState::Exhausted
        };
    }

    /// Issue exactly one fetch and append its batch.
    ///
    /// On failure nothing about the cursor changes.
    async fn fetch_batch(&mut self) -> Result<()> {
        let req = FetchRequest {
            stmt_id: self.stmt_id,
            cursor_id: self.cursor_id,
            mode: self.mode,
            fetch_size: self.fetch_size,
        };
        let batch = self
            .source
            .fetch(req)
            .await
            .map_err(|e| Error::retrieval("failed to fetch the next batch of rows", e))?;

        debug!(
            cursor_id = self.cursor_id,
            rows = batch.rows.len(),
            has_remain = batch.has_remain,
            "fetched batch"
        );
        if !batch.columns.is_empty() {
            self.columns = batch.columns;
        }
        self.rows_fetched += batch.rows.len() as u64;
        self.buffer.extend(batch.rows);
        self.has_remain = batch.has_remain;
        self.update_state();
        Ok(())
    }

    /// Current buffer state.
    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Names of the result columns.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.column_names()
    }

    /// Server cursor id.
    pub fn cursor_id(&self) -> u64 {
        self.cursor_id
    }

    /// Rows received but not yet handed out.
    pub fn buffered_count(&self) -> usize {
        self.buffer.len()
    }
}

impl<'c, F: FetchSource> Cursor for RowCursor<'c, F> {
    type Item = Row;

    fn columns(&self) -> &[Column] {
        &self.columns.columns
    }

    fn rowcount(&self) -> u64 {
        self.rows_fetched
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn has_more(&self) -> bool {
        !self.buffer.is_empty() || (self.has_remain && !self.closed)
    }

    fn fetch_size(&self) -> u32 {
        self.fetch_size
    }

    fn set_fetch_size(&mut self, size: u32) {
        self.fetch_size = size.max(1);
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.buffer.clear();
        self.has_remain = false;
        self.update_state();
        if self.owns_statement {
            self.source.release(self.stmt_id).await?;
        }
        Ok(())
    }

    async fn next(&mut self) -> Result<Option<Self::Item>> {
        loop {
            if let Some(raw) = self.buffer.pop_front() {
                self.update_state();
                return Ok(Some(Row::new(raw, self.columns.clone(), self.codec)));
            }
            if !self.has_remain || self.closed {
                self.state = CursorState::Exhausted;
                return Ok(None);
            }
            self.fetch_batch().await?;
        }
    }

    async fn fetch_all(&mut self) -> Result<Vec<Self::Item>> {
        let mut rows = Vec::with_capacity(self.buffer.len());
        while let Some(row) = self.next().await? {
            rows.push(row);
        }
        self.close().await?;
        Ok(rows)
    }
}

impl<F: FetchSource> Drop for RowCursor<'_, F> {
    fn drop(&mut self) {
        if self.owns_statement && !self.closed {
            debug!(stmt_id = self.stmt_id, "cursor dropped without close");
            self.source.release_later(self.stmt_id);
        }
    }
}

/// Adapter turning any [`Cursor`] into a `futures::Stream`.
///
/// # Example
///
/// ```no_run
/// use ograc_thin_rs::{ConnectParams, Connection, CursorStreamExt};
/// use futures::stream::TryStreamExt;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let conn = Connection::connect(ConnectParams::parse("scott/tiger@localhost")?).await?;
///
///     let cursor = conn.query("SELECT name FROM customers").await?;
///     let names: Vec<String> = cursor
///         .into_stream()
///         .map_ok(|row| row.get(0).map(|v| v.to_string()).unwrap_or_default())
///         .try_collect()
///         .await?;
///
///     Ok(())
/// }
/// ```
pub trait CursorStreamExt: Cursor + Sized {
    /// Consume the cursor as a stream of `Result<Item>`.
    ///
    /// The stream ends after the first error.
    fn into_stream(self) -> impl Stream<Item = Result<Self::Item>>;
}

impl<C: Cursor + Unpin> CursorStreamExt for C {
    fn into_stream(self) -> impl Stream<Item = Result<Self::Item>> {
        use futures::stream;

        stream::unfold(Some(self), |opt_cursor| async move {
            let mut cursor = opt_cursor?;
            match cursor.next().await {
                Ok(Some(item)) => Some((Ok(item), Some(cursor))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }
}
