//! High-level Connection API for the oGRAC thin client.

use crate::cursor::{FetchRequest, FetchSource, RowCursor};
use crate::error::{Error, Result};
use crate::protocol::auth::{Handshake, Session};
use crate::protocol::buffer::ReadBuffer;
use crate::protocol::codec::SessionCodec;
use crate::protocol::connect::ConnectParams;
use crate::protocol::constants::*;
use crate::protocol::message::Message;
use crate::protocol::messages::{
    CancelMessage, CommandMessage, ExecuteMessage, FetchMessage, FreeStatementMessage,
    PrepareMessage,
};
use crate::protocol::out_params::OutParams;
use crate::protocol::packet::{PacketStream, Transport};
use crate::protocol::params::ParameterList;
use crate::protocol::response::{
    check_response, parse_describe_response, parse_execute_outcome, parse_row_batch,
    ExecuteOutcome, RowBatch,
};
use crate::protocol::types::WireType;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

/// Result of [`Connection::execute`].
pub enum Execution<'c, S: Transport> {
    /// DML or DDL. The server statement is already released.
    Update { affected: u32 },
    /// A row-returning statement. Closing the cursor releases the statement.
    Query(RowCursor<'c, Connection<S>>),
    /// A call with output parameters.
    ///
    /// The statement stays open so REF CURSOR outputs can be fetched through
    /// [`Connection::open_ref_cursor`]; release it with
    /// [`Connection::free_statement`].
    Procedure { stmt_id: u32, out: OutParams },
}

impl<S: Transport> std::fmt::Debug for Execution<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Execution::Update { affected } => {
                f.debug_struct("Update").field("affected", affected).finish()
            }
            Execution::Query(cursor) => f
                .debug_struct("Query")
                .field("cursor_id", &cursor.cursor_id())
                .finish_non_exhaustive(),
            Execution::Procedure { stmt_id, out } => f
                .debug_struct("Procedure")
                .field("stmt_id", stmt_id)
                .field("out", out)
                .finish(),
        }
    }
}

/// A database connection.
///
/// Requests are serialized: the packet stream sits behind an async mutex and
/// every request holds it until its response has been read.
///
/// Request futures are not cancellation safe. Dropping one before it
/// completes (for example through `tokio::time::timeout`) leaves the
/// connection unusable, and later requests fail with [`Error::Connection`].
pub struct Connection<S = TcpStream> {
    stream: Mutex<PacketStream<S>>,
    session: Session,
    params: ConnectParams,
    /// Statements of cursors dropped without `close`, freed before the next request.
    orphaned: std::sync::Mutex<Vec<u32>>,
}

impl<S> std::fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("session", &self.session)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl Connection<TcpStream> {
    /// Connect over TCP and log in.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use ograc_thin_rs::{ConnectParams, Connection};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let params = ConnectParams::parse("scott/tiger@localhost:1611")?;
    ///     let conn = Connection::connect(params).await?;
    ///     conn.close().await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn connect(params: ConnectParams) -> Result<Self> {
        use tokio::net::lookup_host;
        use tokio::time::timeout;

        let timed_out = || Error::ConnectionTimeout {
            host: params.host.clone(),
            port: params.port,
            timeout: params.connect_timeout,
        };

        let addr_str = format!("{}:{}", params.host, params.port);
        let addrs = timeout(params.connect_timeout, lookup_host(&addr_str))
            .await
            .map_err(|_| timed_out())??;

        let mut last_error = None;
        for addr in addrs {
            match timeout(params.connect_timeout, TcpStream::connect(addr)).await {
                Ok(Ok(tcp_stream)) => {
                    tcp_stream.set_nodelay(true)?;
                    let local_addr = tcp_stream.local_addr()?.ip().to_string();
                    return Self::connect_stream(tcp_stream, local_addr, params.clone()).await;
                }
                Ok(Err(e)) => {
                    debug!(%addr, error = %e, "connect attempt failed");
                    last_error = Some(Error::Io(e));
                }
                Err(_) => return Err(timed_out()),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::connection(format!("no addresses resolved for {}", params.host))
        }))
    }
}

impl<S: Transport> Connection<S> {
    /// Log in over an already established transport.
    pub async fn connect_stream(
        stream: S,
        local_addr: impl Into<String>,
        params: ConnectParams,
    ) -> Result<Self> {
        let handshake = Handshake::new(&params);
        Self::establish(stream, local_addr.into(), &params, handshake)
            .await
            .map(|(stream, session)| Self {
                stream,
                session,
                params,
                orphaned: Default::default(),
            })
    }

    /// Log in with a caller-chosen client key instead of a random one.
    pub async fn connect_stream_with_key(
        stream: S,
        local_addr: impl Into<String>,
        params: ConnectParams,
        client_key: [u8; CLIENT_KEY_LEN],
    ) -> Result<Self> {
        let handshake = Handshake::new(&params).with_client_key(client_key);
        Self::establish(stream, local_addr.into(), &params, handshake)
            .await
            .map(|(stream, session)| Self {
                stream,
                session,
                params,
                orphaned: Default::default(),
            })
    }

    async fn establish(
        stream: S,
        local_addr: String,
        params: &ConnectParams,
        handshake: Handshake<'_>,
    ) -> Result<(Mutex<PacketStream<S>>, Session)> {
        let stream = Mutex::new(PacketStream::new(stream, local_addr));
        let session = {
            let mut guard = stream.lock().await;
            handshake.run(&mut guard).await?
        };
        debug!(
            host = %params.host,
            session_id = session.session_id,
            protocol_version = session.protocol_version,
            "connected"
        );
        Ok((stream, session))
    }

    /// Session state fixed at login.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Parameters this connection was opened with.
    pub fn params(&self) -> &ConnectParams {
        &self.params
    }

    /// Server version announced during authentication.
    pub fn server_version(&self) -> u32 {
        self.session.server_version
    }

    /// Value codec for this session.
    pub fn codec(&self) -> SessionCodec {
        self.session.codec()
    }

    /// Empty parameter list for a statement with `count` placeholders.
    pub fn parameters(&self, count: usize) -> ParameterList {
        ParameterList::new(count, self.codec())
    }

    fn protocol_version(&self) -> u32 {
        self.session.protocol_version as u32
    }

    /// Send one request and return a reader over its successful response.
    async fn request<M: Message>(&self, msg: &M) -> Result<ReadBuffer> {
        let mut stream = self.stream.lock().await;
        self.free_orphaned(&mut stream).await?;
        let packet = stream.round_trip(msg).await?;
        check_response(&packet, self.protocol_version(), &self.codec())
    }

    async fn free_orphaned(&self, stream: &mut PacketStream<S>) -> Result<()> {
        let pending = std::mem::take(
            &mut *self
                .orphaned
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner),
        );
        for stmt_id in pending {
            let packet = stream.round_trip(&FreeStatementMessage { stmt_id }).await?;
            if let Err(e) = check_response(&packet, self.protocol_version(), &self.codec()) {
                warn!(stmt_id, error = %e, "failed to free statement of dropped cursor");
            }
        }
        Ok(())
    }

    /// Ask the server for the parameter types of a statement.
    ///
    /// The statement is prepared and released again; feed the result to
    /// [`ParameterList::apply_server_types`].
    #[instrument(skip_all)]
    pub async fn describe_params(&self, sql: &str) -> Result<Vec<WireType>> {
        let sql = self.session.charset.encode(sql);
        let mut buf = self.request(&PrepareMessage { sql: &sql }).await?;
        let described = parse_describe_response(&mut buf)?;
        debug!(
            stmt_id = described.stmt_id,
            params = described.param_types.len(),
            "statement described"
        );
        self.free_statement(described.stmt_id).await?;
        Ok(described.param_types)
    }

    /// Execute a statement with bound parameters.
    ///
    /// Every placeholder must be bound or declared as an output first.
    #[instrument(skip_all, fields(params = params.len()))]
    pub async fn execute(&self, sql: &str, params: &ParameterList) -> Result<Execution<'_, S>> {
        params.check_all_bound()?;

        let codec = self.codec();
        let sql = codec.charset.encode(sql);
        let msg = ExecuteMessage {
            stmt_id: STMT_ID_NEW,
            sql: &sql,
            fetch_size: self.params.fetch_size,
            params: params.slots(),
        };
        let mut buf = self.request(&msg).await?;
        let stmt_id = buf.read_u32()?;
        let outcome = match parse_execute_outcome(&mut buf, &codec, &params.out_ordinals()) {
            Ok(outcome) => outcome,
            Err(e) => {
                // the server already holds the statement
                if let Err(free_err) = self.free_statement(stmt_id).await {
                    warn!(stmt_id, error = %free_err, "failed to free statement");
                }
                return Err(e);
            }
        };

        match outcome {
            ExecuteOutcome::Update { affected } => {
                debug!(stmt_id, affected, "update executed");
                self.free_statement(stmt_id).await?;
                Ok(Execution::Update { affected })
            }
            ExecuteOutcome::Query {
                cursor_id,
                mode,
                batch,
            } => {
                debug!(
                    stmt_id,
                    cursor_id,
                    rows = batch.rows.len(),
                    has_remain = batch.has_remain,
                    "query executed"
                );
                Ok(Execution::Query(RowCursor::from_batch(
                    self,
                    stmt_id,
                    cursor_id,
                    mode,
                    batch,
                    self.params.fetch_size,
                    codec,
                )))
            }
            ExecuteOutcome::Procedure(out) => {
                debug!(stmt_id, outputs = out.len(), "call executed");
                Ok(Execution::Procedure {
                    stmt_id,
                    out,
                })
            }
        }
    }

    /// Execute a statement without parameters that returns rows.
    pub async fn query(&self, sql: &str) -> Result<RowCursor<'_, Self>> {
        let params = self.parameters(0);
        match self.execute(sql, &params).await? {
            Execution::Query(cursor) => Ok(cursor),
            Execution::Update { .. } => Err(Error::protocol("statement did not return rows")),
            Execution::Procedure { stmt_id, .. } => {
                self.free_statement(stmt_id).await?;
                Err(Error::protocol("statement did not return rows"))
            }
        }
    }

    /// Open a REF CURSOR returned as an output parameter.
    ///
    /// Nothing is fetched until the first `next()`. The owning statement is
    /// not released when the cursor closes.
    pub fn open_ref_cursor(&self, stmt_id: u32, cursor_id: u64) -> RowCursor<'_, Self> {
        RowCursor::unfetched(
            self,
            stmt_id,
            cursor_id,
            CURSOR_MODE_REF,
            self.params.fetch_size,
            self.codec(),
        )
    }

    /// Release a server statement and its cursors.
    pub async fn free_statement(&self, stmt_id: u32) -> Result<()> {
        self.request(&FreeStatementMessage { stmt_id }).await?;
        Ok(())
    }

    pub async fn commit(&self) -> Result<()> {
        self.request(&CommandMessage::commit()).await?;
        Ok(())
    }

    pub async fn rollback(&self) -> Result<()> {
        self.request(&CommandMessage::rollback()).await?;
        Ok(())
    }

    /// Cancel the request currently running on this connection.
    ///
    /// Opens a second TCP connection with the same parameters, sends the
    /// cancel command for this session and logs the helper out again.
    pub async fn cancel(&self) -> Result<()> {
        let helper = Connection::<TcpStream>::connect(self.params.clone()).await?;
        let result = self.cancel_via(&helper).await;
        helper.close().await?;
        result
    }

    /// Send the cancel command for this session over another connection.
    #[instrument(skip_all, fields(session_id = self.session.session_id))]
    pub async fn cancel_via<T: Transport>(&self, helper: &Connection<T>) -> Result<()> {
        let msg = CancelMessage {
            session_id: self.session.session_id,
            session_number: self.session.session_number,
        };
        helper.request(&msg).await?;
        debug!("cancel acknowledged");
        Ok(())
    }

    /// Log out and shut the transport down.
    pub async fn close(self) -> Result<()> {
        let version = self.protocol_version();
        let codec = self.codec();
        let mut stream = self.stream.into_inner();
        let packet = stream.round_trip(&CommandMessage::logout()).await?;
        check_response(&packet, version, &codec)?;
        stream.shutdown().await
    }
}

impl<S: Transport> FetchSource for Connection<S> {
    async fn fetch(&self, req: FetchRequest) -> Result<RowBatch> {
        let msg = FetchMessage {
            stmt_id: req.stmt_id,
            cursor_id: req.cursor_id,
            mode: req.mode,
            fetch_size: req.fetch_size,
        };
        let mut buf = self.request(&msg).await?;
        parse_row_batch(&mut buf, &self.codec())
    }

    async fn release(&self, stmt_id: u32) -> Result<()> {
        self.free_statement(stmt_id).await
    }

    fn release_later(&self, stmt_id: u32) {
        self.orphaned
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(stmt_id);
    }
}
