//! Packet structure and stream I/O.

use crate::error::{Error, Result};
use crate::protocol::buffer::{Endian, ReadBuffer, WriteBuffer};
use crate::protocol::constants::*;
use crate::protocol::message::Message;
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

/// Byte stream a connection runs over.
///
/// Implemented for anything that is an async, `Send` byte stream: TCP sockets
/// in production, in-memory duplex pipes in tests.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Transport for T {}

/// Fixed 16-byte packet header (including the 4-byte length prefix).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacketHeader {
    /// Total packet length including this header.
    pub size: u32,
    /// Command code.
    pub exec_cmd: u8,
    /// Zero on success, non-zero when the body is an error payload.
    pub exec_result: u8,
    /// Header flags.
    pub flags: u16,
    pub version: u8,
    pub version1: u8,
    pub version2: u8,
    /// Correlation id of the request this frame belongs to.
    pub request_count: u32,
}

impl PacketHeader {
    /// Header for an outgoing request.
    pub fn request(exec_cmd: u8, version: u8, request_count: u32) -> Self {
        Self {
            size: 0,
            exec_cmd,
            exec_result: 0,
            flags: 0,
            version,
            version1: 0,
            version2: 0,
            request_count,
        }
    }

    /// Whether another frame of the same response follows.
    pub fn has_more_frames(&self) -> bool {
        self.flags & PACKET_FLAG_MORE_FRAMES != 0
    }

    /// Whether the body carries an error payload.
    pub fn is_error(&self) -> bool {
        self.exec_result != 0
    }

    /// Write the header. The size is written as given and usually patched later.
    pub fn write(&self, buf: &mut WriteBuffer) {
        buf.write_u32(self.size);
        buf.write_u8(self.exec_cmd);
        buf.write_u8(self.exec_result);
        buf.write_u16(self.flags);
        buf.write_u8(self.version);
        buf.write_u8(self.version1);
        buf.write_u8(self.version2);
        buf.write_u8(0);
        buf.write_u32(self.request_count);
    }

    /// Parse a header from the first 16 bytes of a frame.
    pub fn parse(buf: &mut ReadBuffer) -> Result<Self> {
        let size = buf.read_u32()?;
        let exec_cmd = buf.read_u8()?;
        let exec_result = buf.read_u8()?;
        let flags = buf.read_u16()?;
        let version = buf.read_u8()?;
        let version1 = buf.read_u8()?;
        let version2 = buf.read_u8()?;
        buf.skip(1)?;
        let request_count = buf.read_u32()?;
        Ok(Self {
            size,
            exec_cmd,
            exec_result,
            flags,
            version,
            version1,
            version2,
            request_count,
        })
    }
}

/// A received packet.
#[derive(Debug, Clone)]
pub struct Packet {
    /// Packet header.
    pub header: PacketHeader,
    /// Packet body (excluding header).
    pub payload: Bytes,
}

impl Packet {
    /// Reader over the body in the given byte order.
    pub fn reader(&self, endian: Endian) -> ReadBuffer {
        ReadBuffer::new(self.payload.clone(), endian)
    }
}

/// Assemble a full request packet into one buffer.
///
/// The length prefix is measured from the assembled buffer.
pub fn encode_packet<M: Message>(
    msg: &M,
    endian: Endian,
    version: u8,
    request_count: u32,
) -> Result<Bytes> {
    let mut buf = WriteBuffer::with_capacity(PACKET_HEADER_SIZE + msg.wire_size(), endian);
    PacketHeader::request(msg.exec_cmd(), version, request_count).write(&mut buf);
    msg.write_to(&mut buf)?;
    let total = buf.len();
    buf.set_u32(0, total as u32);
    Ok(buf.freeze())
}

/// Packet reader/writer over a transport.
pub struct PacketStream<S> {
    stream: S,
    /// Session byte order (little endian until the server says otherwise).
    endian: Endian,
    /// Version byte stamped into request headers.
    version: u8,
    /// Correlation id of the last request sent.
    request_count: u32,
    /// Local address reported in the login packet.
    local_addr: String,
    /// Set between sending a request and reading its whole response.
    in_flight: bool,
}

impl<S: Transport> PacketStream<S> {
    /// Create a new packet stream.
    pub fn new(stream: S, local_addr: impl Into<String>) -> Self {
        Self {
            stream,
            endian: Endian::default(),
            version: 0,
            request_count: 0,
            local_addr: local_addr.into(),
            in_flight: false,
        }
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn set_version(&mut self, version: u8) {
        self.version = version;
    }

    pub fn request_count(&self) -> u32 {
        self.request_count
    }

    pub fn local_addr(&self) -> &str {
        &self.local_addr
    }

    /// Whether an earlier round trip stopped before its response was read.
    ///
    /// Round trips are not cancellation safe: dropping one mid-flight leaves
    /// part of a frame on the transport, and every later round trip fails.
    pub fn is_broken(&self) -> bool {
        self.in_flight
    }

    /// Get a mutable reference to the underlying transport.
    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Write raw bytes and flush.
    pub async fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Read exactly `n` raw bytes.
    pub async fn read_raw(&mut self, n: usize) -> Result<Bytes> {
        let mut buf = BytesMut::zeroed(n);
        self.read_exact_into(&mut buf).await?;
        Ok(buf.freeze())
    }

    async fn read_exact_into(&mut self, buf: &mut [u8]) -> Result<()> {
        match self.stream.read_exact(buf).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(Error::ConnectionClosed),
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Send a request, assigning it the next correlation id.
    pub async fn send_message<M: Message>(&mut self, msg: &M) -> Result<u32> {
        self.request_count = self.request_count.wrapping_add(1);
        let bytes = encode_packet(msg, self.endian, self.version, self.request_count)?;
        trace!(
            cmd = msg.exec_cmd(),
            request_count = self.request_count,
            len = bytes.len(),
            "sending packet"
        );
        self.send_raw(&bytes).await?;
        Ok(self.request_count)
    }

    /// Read one whole frame.
    pub async fn read_packet(&mut self) -> Result<Packet> {
        let mut len_bytes = [0u8; PACKET_LEN_SIZE];
        self.read_exact_into(&mut len_bytes).await?;
        let size = self.endian.u32_from(len_bytes) as usize;
        if size < PACKET_HEADER_SIZE {
            return Err(Error::protocol(format!(
                "packet length {} is shorter than the header",
                size
            )));
        }

        let mut frame = BytesMut::zeroed(size);
        frame[..PACKET_LEN_SIZE].copy_from_slice(&len_bytes);
        self.read_exact_into(&mut frame[PACKET_LEN_SIZE..]).await?;
        let frame = frame.freeze();

        let mut rbuf = ReadBuffer::new(frame.clone(), self.endian);
        let header = PacketHeader::parse(&mut rbuf)?;
        trace!(
            cmd = header.exec_cmd,
            result = header.exec_result,
            request_count = header.request_count,
            len = size,
            "received packet"
        );
        Ok(Packet {
            header,
            payload: frame.slice(PACKET_HEADER_SIZE..),
        })
    }

    /// Read the response to the last request.
    ///
    /// Frames carrying another request's correlation id are discarded.
    /// Continuation frames are joined into one payload.
    pub async fn read_response(&mut self) -> Result<Packet> {
        let mut first: Option<PacketHeader> = None;
        let mut payload = BytesMut::new();
        loop {
            let packet = self.read_packet().await?;
            if packet.header.request_count != self.request_count {
                debug!(
                    expected = self.request_count,
                    actual = packet.header.request_count,
                    "discarding stale frame"
                );
                continue;
            }
            payload.extend_from_slice(&packet.payload);
            let more = packet.header.has_more_frames();
            first.get_or_insert(packet.header);
            if !more {
                break;
            }
        }
        // the loop only exits after storing a header
        let header = first.unwrap_or_default();
        Ok(Packet {
            header,
            payload: payload.freeze(),
        })
    }

    /// Send a request and read its response.
    ///
    /// Fails without touching the transport once [`is_broken`](Self::is_broken).
    pub async fn round_trip<M: Message>(&mut self, msg: &M) -> Result<Packet> {
        if self.in_flight {
            return Err(Error::connection(
                "connection is unusable: an earlier request did not complete",
            ));
        }
        self.in_flight = true;
        self.send_message(msg).await?;
        let packet = self.read_response().await?;
        self.in_flight = false;
        Ok(packet)
    }

    /// Shut down the write half of the transport.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }
}
