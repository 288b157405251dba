//! In-memory transport: records requests instead of writing them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::Transport;
use crate::error::TransportError;
use crate::message::Request;

#[derive(Debug, Default)]
pub struct MemoryTransport {
    sent: Mutex<Vec<Request>>,
    closed: AtomicBool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every later send fails with [`TransportError::Closed`]
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Requests sent so far, oldest first
    pub fn sent(&self) -> Vec<Request> {
        self.requests().clone()
    }

    /// Drain the recorded requests
    pub fn take(&self) -> Vec<Request> {
        std::mem::take(&mut *self.requests())
    }

    fn requests(&self) -> MutexGuard<'_, Vec<Request>> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&self, request: Request) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.requests().push(request);
        Ok(())
    }
}
