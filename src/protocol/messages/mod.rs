//! Request message definitions.
//!
//! Each message implements the `Message` trait and is framed by
//! [`crate::protocol::packet::encode_packet`].

pub mod auth;
pub mod control;
pub mod execute;
pub mod fetch;
pub mod handshake;

pub use auth::{AuthInitMessage, LoginMessage};
pub use control::{CancelMessage, CommandMessage, FreeStatementMessage};
pub use execute::{ExecuteMessage, PrepareMessage};
pub use fetch::FetchMessage;
pub use handshake::HandshakeMessage;
