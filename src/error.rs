//! Error types for bgpx.
//!
//! Local input problems never reach the wire (`ValidationError`), malformed
//! backend messages are dropped (`ProtocolError`), route-table integrity
//! problems are reported per record (`CollisionError`) and channel failures
//! propagate to whoever tried to send (`TransportError`).

use std::io;

use ipnetwork::IpNetwork;
use thiserror::Error;

use crate::message::RouteId;
use crate::session::SessionId;

/// Top-level error type for bgpx operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("route table error: {0}")]
    Collision(#[from] CollisionError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Malformed local input, caught before anything is sent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// ASN must be a positive integer. [field name]
    #[error("{0} must be a positive AS number")]
    ZeroAsn(&'static str),

    #[error("invalid IP address: '{0}'")]
    InvalidAddress(String),

    /// Expected `ws://host:port/path` or `tcp://host:port`
    #[error("invalid endpoint: '{0}'")]
    InvalidEndpoint(String),

    #[error("invalid prefix: '{0}'")]
    InvalidPrefix(String),

    #[error("invalid community: '{0}'")]
    InvalidCommunity(String),

    #[error("invalid origin: '{0}'")]
    InvalidOrigin(String),

    #[error("unknown session {0}")]
    UnknownSession(SessionId),

    /// A newer session has replaced this one on the channel
    #[error("session {0} is no longer active")]
    InactiveSession(SessionId),
}

/// A malformed inbound message. The message is dropped, the feed continues.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("undecodable message: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("message frame is not valid UTF-8")]
    Utf8,

    #[error("message frame exceeds {0} bytes")]
    FrameTooLong(usize),

    #[error("RouteData carries neither prefixes nor withdraws")]
    EmptyUpdate,

    #[error("RouteData is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("RouteData carries invalid prefix '{0}'")]
    InvalidPrefix(String),

    #[error("RouteData carries invalid next hop '{0}'")]
    InvalidNextHop(String),

    #[error("I/O error while reading frame: {0}")]
    Io(#[from] io::Error),
}

/// Upstream handed out the same identifier for two different prefixes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("identifier collision on {id}: holds {existing}, received {received}")]
pub struct CollisionError {
    pub id: RouteId,
    pub existing: IpNetwork,
    pub received: IpNetwork,
}

#[derive(Error, Debug)]
pub enum TransportError {
    /// The channel is not open (never connected, or the writer has stopped).
    #[error("channel closed")]
    Closed,

    #[error("unsupported endpoint: '{0}'")]
    Endpoint(String),

    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(#[from] ValidationError),
}
