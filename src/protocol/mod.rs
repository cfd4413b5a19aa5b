//! Wire protocol implementation.

pub mod auth;
pub mod buffer;
pub mod charset;
pub mod codec;
pub mod connect;
pub mod constants;
pub mod crypto;
pub mod decode;
pub mod message;
pub mod messages;
pub mod out_params;
pub mod packet;
pub mod params;
pub mod response;
pub mod types;

pub use buffer::{Endian, ReadBuffer, WriteBuffer};
pub use charset::Charset;
pub use codec::SessionCodec;
pub use message::Message;
pub use packet::{Packet, PacketHeader, PacketStream, Transport};
pub use types::{Column, ColumnInfo, RawRow, Row, SqlType, Value, WireType};
