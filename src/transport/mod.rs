//! The message channel to the backend.
//!
//! Components only ever see the [`Transport`] trait for sending and an
//! [`Inbound`] receiver for the feed, so the channel itself is injected at
//! construction and can be swapped for [`memory::MemoryTransport`] in tests.
//!
//! Two channels are supported, selected by endpoint scheme:
//! - `ws://host:port/path`: one JSON envelope per WebSocket text message
//! - `tcp://host:port`: newline-delimited JSON envelopes over raw TCP

mod framed;
pub mod memory;
mod websocket;

pub use framed::spawn;

use async_trait::async_trait;
use log::trace;
use tokio::sync::mpsc;

use crate::error::{ProtocolError, TransportError, ValidationError};
use crate::message::{Event, Request};

const SEND_QUEUE_DEPTH: usize = 512;
const RECV_QUEUE_DEPTH: usize = 512;

/// Inbound feed, in backend send order. Malformed frames arrive as `Err`.
pub type Inbound = mpsc::Receiver<Result<Event, ProtocolError>>;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Queue a request for the backend.
    /// Fails with [`TransportError::Closed`] if the channel is not open.
    async fn send(&self, request: Request) -> Result<(), TransportError>;
}

/// Sending half of an open channel.
///
/// All clones feed one writer task, so requests from different call sites
/// are written whole and in queue order.
#[derive(Clone, Debug)]
pub struct ChannelSender {
    queue: mpsc::Sender<Request>,
}

#[async_trait]
impl Transport for ChannelSender {
    async fn send(&self, request: Request) -> Result<(), TransportError> {
        trace!("Queueing {}", request.kind());
        self.queue
            .send(request)
            .await
            .map_err(|_| TransportError::Closed)
    }
}

/// Which channel an endpoint string asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    WebSocket,
    Tcp,
}

/// Check an endpoint string and return its scheme
pub fn scheme(endpoint: &str) -> Result<Scheme, ValidationError> {
    let invalid = || ValidationError::InvalidEndpoint(endpoint.to_string());
    let (scheme, rest) = endpoint.split_once("://").ok_or_else(invalid)?;
    if rest.is_empty() {
        return Err(invalid());
    }
    match scheme {
        "ws" => Ok(Scheme::WebSocket),
        "tcp" => Ok(Scheme::Tcp),
        _ => Err(invalid()),
    }
}

/// Open a channel to the backend and start its reader and writer tasks
pub async fn connect(endpoint: &str) -> Result<(ChannelSender, Inbound), TransportError> {
    match scheme(endpoint).map_err(|_| TransportError::Endpoint(endpoint.to_string()))? {
        Scheme::WebSocket => websocket::connect(endpoint).await,
        Scheme::Tcp => framed::connect(&endpoint["tcp://".len()..]).await,
    }
}
