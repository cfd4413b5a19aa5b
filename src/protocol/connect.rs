//! Connection parameters and the protocol prelude.
//!
//! The prelude is the raw exchange before any framed packet: the client sends
//! the magic bytes, the server answers with its byte order, protocol version
//! and request flag. The handshake packet that follows echoes the flag.

use crate::error::{Error, Result};
use crate::protocol::buffer::Endian;
use crate::protocol::constants::*;
use crate::protocol::messages::HandshakeMessage;
use crate::protocol::packet::{PacketStream, Transport};
use std::time::Duration;
use tracing::debug;

/// Default listener port.
pub const DEFAULT_PORT: u16 = 1611;

/// Connection parameters.
#[derive(Clone)]
pub struct ConnectParams {
    /// Host address.
    pub host: String,
    /// Port number.
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Tenant the user belongs to, if the server is multi-tenant.
    pub tenant: Option<String>,
    /// Rows requested per query batch and per cursor fetch.
    pub fetch_size: u32,
    /// TCP connection timeout (default: 20 seconds).
    pub connect_timeout: Duration,
}

impl std::fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("tenant", &self.tenant)
            .field("fetch_size", &self.fetch_size)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl ConnectParams {
    /// Create new connection parameters.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            tenant: None,
            fetch_size: DEFAULT_FETCH_SIZE,
            connect_timeout: Duration::from_secs(20),
        }
    }

    /// Set the connection timeout.
    ///
    /// # Example
    ///
    /// ```
    /// use ograc_thin_rs::ConnectParams;
    /// use std::time::Duration;
    ///
    /// let params = ConnectParams::new("localhost", 1611, "scott", "tiger")
    ///     .with_connect_timeout(Duration::from_secs(5));
    /// ```
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    /// Set the fetch size. Zero falls back to the default.
    pub fn with_fetch_size(mut self, fetch_size: u32) -> Self {
        self.fetch_size = if fetch_size == 0 {
            DEFAULT_FETCH_SIZE
        } else {
            fetch_size
        };
        self
    }

    /// Parse a connection string like "user/password@host:port".
    ///
    /// The port defaults to 1611 when omitted.
    pub fn parse(conn_str: &str) -> Result<Self> {
        let (creds, addr_part) =
            conn_str
                .rsplit_once('@')
                .ok_or_else(|| Error::InvalidConnectString {
                    message: "Expected format: user/password@host:port".to_string(),
                })?;

        let (username, password) =
            creds
                .split_once('/')
                .ok_or_else(|| Error::InvalidConnectString {
                    message: "Missing password: expected user/password".to_string(),
                })?;
        if username.is_empty() {
            return Err(Error::InvalidConnectString {
                message: "Empty user name".to_string(),
            });
        }

        let (host, port) = if let Some((h, p)) = addr_part.rsplit_once(':') {
            let port = p.parse::<u16>().map_err(|_| Error::InvalidConnectString {
                message: format!("Invalid port: {}", p),
            })?;
            (h.to_string(), port)
        } else {
            (addr_part.to_string(), DEFAULT_PORT)
        };
        if host.is_empty() {
            return Err(Error::InvalidConnectString {
                message: "Empty host".to_string(),
            });
        }

        Ok(Self::new(host, port, username, password))
    }
}

/// What the server announced in the prelude.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prelude {
    pub endian: Endian,
    pub version: u8,
    /// Request flag with the low bit forced on.
    pub request_flag: u16,
}

/// Send the magic bytes and read the server's prelude answer.
///
/// Switches the stream to the announced byte order and protocol version.
pub async fn exchange_prelude<S: Transport>(stream: &mut PacketStream<S>) -> Result<Prelude> {
    stream.send_raw(&HANDSHAKE_MAGIC).await?;

    let endian = Endian::from_flag(stream.read_raw(1).await?[0]);
    stream.set_endian(endian);

    let version = stream.read_raw(1).await?[0];
    let flag = stream.read_raw(2).await?;
    let request_flag = endian.u16_from([flag[0], flag[1]]) | 1;
    stream.set_version(version);

    debug!(?endian, version, request_flag, "prelude received");
    Ok(Prelude {
        endian,
        version,
        request_flag,
    })
}

/// Send the handshake packet echoing the request flag.
pub async fn send_handshake<S: Transport>(
    stream: &mut PacketStream<S>,
    prelude: &Prelude,
) -> Result<()> {
    let msg = HandshakeMessage {
        request_flag: prelude.request_flag as u32,
    };
    stream.send_message(&msg).await?;
    Ok(())
}
