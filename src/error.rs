//! Error types for the oGRAC thin client.

use std::io;
use std::panic::Location;
use thiserror::Error;

/// Result type alias for driver operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for oGRAC thin client operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error during network communication.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Handshake, authentication or login failure.
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// Malformed frame, length or count mismatch.
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// Unsupported or invalid wire type.
    #[error("Type error: {message}")]
    Type { message: String },

    /// Unbound parameter, invalid ordinal or invalid name.
    #[error("Parameter error: {message}")]
    ParameterState { message: String },

    /// Fetching more rows from a server cursor failed.
    #[error("Retrieval error: {message}")]
    Retrieval {
        message: String,
        #[source]
        source: Box<Error>,
    },

    /// Error reported by the server while executing a request.
    #[error("Server error {code}: {message}")]
    Server { code: u32, message: String },

    /// Connection closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Buffer too small.
    #[error("Buffer too small: need {needed} bytes, have {available}, failed at {location}")]
    BufferTooSmall {
        needed: usize,
        available: usize,
        location: &'static Location<'static>,
    },

    /// Connection timed out during TCP connect.
    #[error("Connection to {host}:{port} timed out after {timeout:?}")]
    ConnectionTimeout {
        host: String,
        port: u16,
        timeout: std::time::Duration,
    },

    /// Invalid connect string.
    #[error("Invalid connect string: {message}")]
    InvalidConnectString { message: String },
}

impl Error {
    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Create a type error.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::Type {
            message: message.into(),
        }
    }

    /// Create a parameter state error.
    pub fn parameter(message: impl Into<String>) -> Self {
        Self::ParameterState {
            message: message.into(),
        }
    }

    /// Wrap a fetch failure.
    pub fn retrieval(message: impl Into<String>, source: Error) -> Self {
        Self::Retrieval {
            message: message.into(),
            source: Box::new(source),
        }
    }

    /// Create a server error.
    pub fn server(code: u32, message: impl Into<String>) -> Self {
        Self::Server {
            code,
            message: message.into(),
        }
    }

    /// Convert any error raised during connection setup into a connection error.
    ///
    /// I/O failures and errors that are already connection errors pass through.
    pub(crate) fn into_connection(self, context: &str) -> Self {
        match self {
            Self::Connection { .. } | Self::Io(_) | Self::ConnectionTimeout { .. } => self,
            other => Self::connection(format!("{}: {}", context, other)),
        }
    }

    /// Whether this is a connection-level failure.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retrieval_keeps_source() {
        let err = Error::retrieval("fetch more rows failed", Error::ConnectionClosed);
        assert_eq!(err.to_string(), "Retrieval error: fetch more rows failed");
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "Connection closed");
    }

    #[test]
    fn test_into_connection() {
        let err = Error::protocol("bad frame").into_connection("login database failed");
        assert!(err.is_connection());
        assert!(err.to_string().contains("bad frame"));

        let err = Error::connection("client key error").into_connection("ignored");
        assert_eq!(err.to_string(), "Connection error: client key error");
    }
}
