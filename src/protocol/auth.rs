//! Handshake and password-digest authentication.
//!
//! The exchange runs in a fixed order on a fresh transport:
//!
//! 1. prelude (magic bytes, byte order, version, request flag)
//! 2. handshake packet
//! 3. auth-init: the client key goes out, the server scramble comes back
//! 4. login: the password digest goes out, the session and signing key come back
//!
//! Any failure aborts the connect with [`Error::Connection`].

use bytes::Bytes;
use chrono::{Datelike, Local, TimeZone};
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::protocol::buffer::{Endian, ReadBuffer};
use crate::protocol::charset::Charset;
use crate::protocol::codec::SessionCodec;
use crate::protocol::connect::{exchange_prelude, send_handshake, ConnectParams, Prelude};
use crate::protocol::constants::*;
use crate::protocol::crypto::{random_bytes, PasswordDigest};
use crate::protocol::messages::{AuthInitMessage, LoginMessage};
use crate::protocol::packet::{Packet, PacketStream, Transport};
use crate::protocol::response::parse_error_payload;

/// State fixed by a successful login.
#[derive(Clone)]
pub struct Session {
    pub protocol_version: u8,
    pub server_version: u32,
    pub endian: Endian,
    pub charset: Charset,
    pub capacity: u32,
    pub session_id: u32,
    pub session_number: u32,
    pub scramble: Bytes,
    pub iterations: u32,
    pub client_key: [u8; CLIENT_KEY_LEN],
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("protocol_version", &self.protocol_version)
            .field("server_version", &self.server_version)
            .field("endian", &self.endian)
            .field("charset", &self.charset)
            .field("capacity", &self.capacity)
            .field("session_id", &self.session_id)
            .field("session_number", &self.session_number)
            .field("iterations", &self.iterations)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Value codec for this session.
    pub fn codec(&self) -> SessionCodec {
        SessionCodec::new(self.endian, self.charset)
    }
}

/// Parsed auth-init response.
#[derive(Debug)]
struct AuthChallenge {
    capacity: u32,
    server_version: u32,
    scramble: Bytes,
    iterations: u32,
}

/// Parsed login response.
#[derive(Debug)]
struct LoginReply {
    session_id: u32,
    session_number: u32,
    charset: Charset,
    signing_key: Bytes,
}

/// Handshake and authentication engine for one connect attempt.
pub struct Handshake<'a> {
    params: &'a ConnectParams,
    client_key: [u8; CLIENT_KEY_LEN],
}

impl<'a> Handshake<'a> {
    /// Engine with a fresh random client key.
    pub fn new(params: &'a ConnectParams) -> Self {
        Self {
            params,
            client_key: random_bytes::<CLIENT_KEY_LEN>(),
        }
    }

    /// Use a fixed client key instead of a random one.
    pub fn with_client_key(mut self, key: [u8; CLIENT_KEY_LEN]) -> Self {
        self.client_key = key;
        self
    }

    /// Run the whole exchange and return the session.
    #[instrument(skip_all, fields(host = %self.params.host, user = %self.params.username))]
    pub async fn run<S: Transport>(self, stream: &mut PacketStream<S>) -> Result<Session> {
        self.perform(stream)
            .await
            .map_err(|e| e.into_connection("handshake and authentication failed"))
    }

    async fn perform<S: Transport>(&self, stream: &mut PacketStream<S>) -> Result<Session> {
        let prelude = exchange_prelude(stream).await?;

        send_handshake(stream, &prelude).await?;
        // the server version is unknown until auth-init succeeds, so early
        // errors use the legacy payload layout
        let packet = stream.read_response().await?;
        check(&packet, 0, prelude.endian)?;
        debug!("handshake accepted");

        let challenge = self.auth_init(stream, &prelude).await?;
        debug!(
            server_version = challenge.server_version,
            iterations = challenge.iterations,
            "auth challenge received"
        );

        let digest = PasswordDigest::derive(
            self.params.password.as_bytes(),
            &challenge.scramble,
            challenge.iterations,
        );
        let reply = self.login(stream, &prelude, &digest).await?;
        debug!(
            session_id = reply.session_id,
            charset = reply.charset.name(),
            "login complete"
        );

        Ok(Session {
            protocol_version: prelude.version,
            server_version: challenge.server_version,
            endian: prelude.endian,
            charset: reply.charset,
            capacity: challenge.capacity,
            session_id: reply.session_id,
            session_number: reply.session_number,
            scramble: challenge.scramble,
            iterations: challenge.iterations,
            client_key: self.client_key,
        })
    }

    async fn auth_init<S: Transport>(
        &self,
        stream: &mut PacketStream<S>,
        prelude: &Prelude,
    ) -> Result<AuthChallenge> {
        let msg = AuthInitMessage {
            username: self.params.username.as_bytes(),
            client_key: &self.client_key,
            tenant: self.params.tenant.as_deref().map(str::as_bytes),
            with_tenant: prelude.version as u32 >= VERSION_MIN_TENANT,
        };
        let packet = stream.round_trip(&msg).await?;
        let mut buf = check(&packet, 0, prelude.endian)?;

        let challenge = parse_auth_challenge(&mut buf)?;
        let echoed = challenge.scramble.get(..CLIENT_KEY_LEN);
        if echoed != Some(&self.client_key[..]) {
            return Err(Error::connection("client key mismatch in server scramble"));
        }
        Ok(challenge)
    }

    async fn login<S: Transport>(
        &self,
        stream: &mut PacketStream<S>,
        prelude: &Prelude,
        digest: &PasswordDigest,
    ) -> Result<LoginReply> {
        let client_addr = stream.local_addr().to_string();
        let msg = LoginMessage {
            username: self.params.username.as_bytes(),
            digest: &digest.proof,
            client_addr: client_addr.as_bytes(),
            tz_offset_minutes: local_tz_offset_minutes(),
            tenant: self.params.tenant.as_deref().map(str::as_bytes),
        };
        let packet = stream.round_trip(&msg).await?;
        let mut buf = check(&packet, prelude.version as u32, prelude.endian)?;

        let reply = parse_login_reply(&mut buf)?;
        if !digest.verify_server(&reply.signing_key) {
            return Err(Error::connection("server signing key verification failed"));
        }
        Ok(reply)
    }
}

/// Reader over a handshake-phase response body.
///
/// Error payloads are decoded in UTF-8 since the session charset is not
/// known yet.
fn check(packet: &Packet, version: u32, endian: Endian) -> Result<ReadBuffer> {
    let mut buf = packet.reader(endian);
    if packet.header.is_error() {
        let codec = SessionCodec::new(endian, Charset::Utf8);
        let err = parse_error_payload(&mut buf, version, &codec)?;
        return Err(Error::connection(format!(
            "server error {}: {}",
            err.code, err.message
        )));
    }
    Ok(buf)
}

fn parse_auth_challenge(buf: &mut ReadBuffer) -> Result<AuthChallenge> {
    let capacity = buf.read_u32()?;
    let server_version = buf.read_u32()?;
    let scramble = buf.read_padded_bytes()?;
    let iterations = if buf.has_remaining(4) {
        buf.read_u32()?
    } else {
        DEFAULT_DIGEST_ITERATIONS
    };
    Ok(AuthChallenge {
        capacity,
        server_version,
        scramble,
        iterations,
    })
}

fn parse_login_reply(buf: &mut ReadBuffer) -> Result<LoginReply> {
    let session_id = buf.read_u32()?;
    let session_number = buf.read_u32()?;
    buf.skip(4)?;
    let charset = Charset::from_flag(buf.read_u32()?)?;
    let signing_key = buf.read_padded_bytes()?;
    // two trailing reserved words on newer servers
    if buf.has_remaining(8) {
        buf.skip(8)?;
    }
    Ok(LoginReply {
        session_id,
        session_number,
        charset,
        signing_key,
    })
}

/// Standard offset of the local zone in minutes, daylight saving excluded.
fn local_tz_offset_minutes() -> i16 {
    let year = Local::now().year();
    let samples = [1, 7].into_iter().filter_map(|month| {
        Local
            .with_ymd_and_hms(year, month, 1, 12, 0, 0)
            .earliest()
            .map(|dt| dt.offset().local_minus_utc())
    });
    standard_offset_minutes(samples)
        .unwrap_or_else(|| (Local::now().offset().local_minus_utc() / 60) as i16)
}

/// The smaller of the sampled UTC offsets (seconds) is the one without
/// daylight saving.
fn standard_offset_minutes(offsets: impl IntoIterator<Item = i32>) -> Option<i16> {
    offsets.into_iter().min().map(|secs| (secs / 60) as i16)
}
