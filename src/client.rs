use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, error, info, trace, warn};

use crate::announce::{Announcement, AnnouncementEmitter};
use crate::error::{ProtocolError, Result, ValidationError};
use crate::feed::{self, FeedReport};
use crate::message::{Event, FsmLog, FsmState, FsmUpdate, InitData, Origin, RouteId};
use crate::rib::{RouteRecord, RouteTable, RpkiStatus};
use crate::session::{SessionController, SessionId, SessionState};
use crate::transport::{Inbound, Transport};
use crate::utils::{maybe_string, nanos_to_datetime};

/// Something worth telling the user about, produced by one inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Init(InitData),
    State {
        previous: SessionState,
        current: SessionState,
        /// Received routes dropped because the session went down
        cleared: usize,
    },
    Log(FsmLog),
    BackendError(String),
    Routes(FeedReport),
}

/// What the backend has told us about itself and the session
#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub backend: Option<InitData>,
    pub state: SessionState,
    pub hold_timer: Option<u32>,
    pub keepalive_timer: Option<u32>,
    /// When `state` was entered
    pub since: DateTime<Utc>,
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self {
            backend: None,
            state: SessionState::Idle,
            hold_timer: None,
            keepalive_timer: None,
            since: Utc::now(),
        }
    }
}

/// One channel to the backend: session lifecycle, the received route feed
/// and locally originated routes, all sharing the injected transport.
pub struct Client<T: Transport> {
    sessions: SessionController<T>,
    emitter: AnnouncementEmitter<T>,
    received: RouteTable,
    active: Option<SessionId>,
    status: SessionStatus,
}

impl<T: Transport> Client<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            sessions: SessionController::new(Arc::clone(&transport)),
            emitter: AnnouncementEmitter::new(transport),
            received: RouteTable::new(),
            active: None,
            status: SessionStatus::default(),
        }
    }

    pub fn sessions(&self) -> &SessionController<T> {
        &self.sessions
    }

    /// Session the inbound feed is attributed to
    pub fn active_session(&self) -> Option<SessionId> {
        self.active
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    /// Routes the peer currently announces
    pub fn received(&self) -> &RouteTable {
        &self.received
    }

    /// Routes we currently announce
    pub fn announced(&self) -> &RouteTable {
        self.emitter.announced()
    }

    /// Create a session and make it the active one. A previously active
    /// session is replaced, along with everything received for it.
    pub async fn create_session(
        &mut self,
        peer_asn: u32,
        peer_ip: &str,
        local_asn: u32,
    ) -> Result<SessionId> {
        let id = self
            .sessions
            .create_session(peer_asn, peer_ip, local_asn)
            .await?;
        if let Some(previous) = self.active.replace(id) {
            // The backend only serves one session per channel
            warn!("Session {} replaced by {}", previous, id);
            let cleared = self.received.clear();
            if cleared > 0 {
                info!("Cleared {} routes received on {}", cleared, previous);
            }
            self.status = SessionStatus {
                backend: self.status.backend.take(),
                ..SessionStatus::default()
            };
        }
        Ok(id)
    }

    pub async fn update_session(
        &mut self,
        id: SessionId,
        md5_password: Option<&str>,
        add_path: bool,
        full_table: bool,
    ) -> Result<()> {
        if self.sessions.session(id).is_none() {
            return Err(ValidationError::UnknownSession(id).into());
        }
        // UpdateRequests carry no session id, the backend applies them to
        // the newest session
        if self.active != Some(id) {
            return Err(ValidationError::InactiveSession(id).into());
        }
        self.sessions
            .update_session(id, md5_password, add_path, full_table)
            .await
    }

    pub async fn add_announcement(
        &mut self,
        prefix: &str,
        path: Vec<u32>,
        nexthop: &str,
        origin: Origin,
    ) -> Result<Arc<RouteRecord>> {
        self.emitter.add_announcement(prefix, path, nexthop, origin).await
    }

    pub async fn announce(&mut self, announcement: Announcement) -> Result<Arc<RouteRecord>> {
        self.emitter.announce(announcement).await
    }

    pub async fn delete_announcement(&mut self, route: &RouteRecord) -> Result<bool> {
        self.emitter.delete_announcement(route).await
    }

    /// Record validation verdicts for a received route
    pub fn annotate(&mut self, id: RouteId, rpki_status: RpkiStatus, irr_valid: bool) -> bool {
        self.received.annotate(id, rpki_status, irr_valid)
    }

    /// Process one inbound item to completion
    pub fn handle(&mut self, message: std::result::Result<Event, ProtocolError>) -> Result<Notice> {
        let event = message?;
        trace!("Received {}", event.kind());
        match event {
            Event::InitData(init) => {
                info!(
                    "Backend router-id {} listening on {}",
                    init.router_id, init.listen_ip
                );
                self.status.backend = Some(init.clone());
                Ok(Notice::Init(init))
            }
            Event::FsmUpdate(FsmUpdate::State(update)) => Ok(self.apply_state(update)),
            Event::FsmUpdate(FsmUpdate::Log(log)) => {
                let time = nanos_to_datetime(log.time);
                debug!("[{}] {}", maybe_string(time.as_ref()), log.message);
                Ok(Notice::Log(log))
            }
            Event::Error(err) => {
                error!("Backend refused request: {}", err.message);
                Ok(Notice::BackendError(err.message))
            }
            Event::RouteData(data) => {
                let report = feed::process(data, &mut self.received)?;
                debug!(
                    "Feed: {} inserted, {} updated, {} withdrawn, {} rejected",
                    report.inserted.len(),
                    report.updated.len(),
                    report.withdrawn.len(),
                    report.collisions.len(),
                );
                Ok(Notice::Routes(report))
            }
        }
    }

    fn apply_state(&mut self, update: FsmState) -> Notice {
        let previous = self.status.state;
        let current = update.state;
        if previous != current {
            self.status.since = Utc::now();
            info!("Session state {} -> {}", previous, current);
        }
        self.status.state = current;
        if update.hold_timer.is_some() {
            self.status.hold_timer = update.hold_timer;
        }
        if update.keepalive_timer.is_some() {
            self.status.keepalive_timer = update.keepalive_timer;
        }

        let mut cleared = 0;
        if current == SessionState::Idle && previous != SessionState::Idle {
            cleared = self.received.clear();
            if cleared > 0 {
                info!("Cleared {} received routes", cleared);
            }
        }
        Notice::State {
            previous,
            current,
            cleared,
        }
    }

    /// Consume the inbound feed until the channel closes, one message at a
    /// time. Malformed messages are logged and skipped.
    pub async fn run<F>(&mut self, mut inbound: Inbound, mut on_notice: F)
    where
        F: FnMut(&Self, &Notice),
    {
        while let Some(message) = inbound.recv().await {
            match self.handle(message) {
                Ok(notice) => on_notice(self, &notice),
                Err(err) => warn!("Dropped message: {}", err),
            }
        }
        info!("Backend channel closed");
    }
}
