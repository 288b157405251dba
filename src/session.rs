//! Session lifecycle requests and the configuration cached for each session.

use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};
use crate::message::{CreateRequest, Request, UpdateRequest};
use crate::transport::Transport;

/// Handle for a session created through a [`SessionController`]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// BGP FSM state as reported by the backend
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connect,
    Active,
    OpenSent,
    OpenConfirm,
    Established,
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Idle
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let word = match self {
            SessionState::Idle => "Idle",
            SessionState::Connect => "Connect",
            SessionState::Active => "Active",
            SessionState::OpenSent => "OpenSent",
            SessionState::OpenConfirm => "OpenConfirm",
            SessionState::Established => "Established",
        };
        write!(f, "{}", word)
    }
}

/// Last submitted configuration of a session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    pub peer_asn: u32,
    pub peer_ip: IpAddr,
    pub local_asn: u32,
    pub md5_password: Option<String>,
    pub add_path: bool,
    pub full_table: bool,
    // Whether an UpdateRequest has been sent for this session
    updated: bool,
}

impl SessionConfig {
    fn create_request(&self) -> CreateRequest {
        CreateRequest {
            peer_asn: self.peer_asn,
            peer_ip: self.peer_ip.to_string(),
            local_asn: self.local_asn,
        }
    }

    fn update_request(&self) -> UpdateRequest {
        UpdateRequest {
            md5_password: self.md5_password.clone(),
            add_path: self.add_path,
            full_table: self.full_table,
        }
    }

    /// Is this an eBGP session
    pub fn is_ebgp(&self) -> bool {
        self.peer_asn != self.local_asn
    }
}

impl fmt::Display for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "<Session peer={} AS{} local=AS{}>",
            self.peer_ip, self.peer_asn, self.local_asn
        )
    }
}

/// Check the peer identity fields of a session
pub fn validate_peer(
    peer_asn: u32,
    peer_ip: &str,
    local_asn: u32,
) -> std::result::Result<IpAddr, ValidationError> {
    if peer_asn == 0 {
        return Err(ValidationError::ZeroAsn("peer_asn"));
    }
    if local_asn == 0 {
        return Err(ValidationError::ZeroAsn("local_asn"));
    }
    peer_ip
        .trim()
        .parse::<IpAddr>()
        .map_err(|_| ValidationError::InvalidAddress(peer_ip.to_string()))
}

/// Issues session lifecycle requests over the injected transport.
///
/// Every session gets its own [`SessionId`]; a second create for the same peer
/// is a distinct session.
pub struct SessionController<T: Transport> {
    transport: Arc<T>,
    sessions: HashMap<SessionId, SessionConfig>,
    next_id: u64,
}

impl<T: Transport> SessionController<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            sessions: HashMap::new(),
            next_id: 1,
        }
    }

    /// Validate the peer identity and send a `CreateRequest`.
    /// Nothing is sent if validation fails.
    pub async fn create_session(
        &mut self,
        peer_asn: u32,
        peer_ip: &str,
        local_asn: u32,
    ) -> Result<SessionId> {
        let peer_ip = validate_peer(peer_asn, peer_ip, local_asn)?;
        let config = SessionConfig {
            peer_asn,
            peer_ip,
            local_asn,
            md5_password: None,
            add_path: false,
            full_table: false,
            updated: false,
        };
        debug!("Sending CreateRequest for {}", config);
        self.transport
            .send(Request::CreateRequest(config.create_request()))
            .await?;

        let id = SessionId(self.next_id);
        self.next_id += 1;
        info!("Created session {} {}", id, config);
        self.sessions.insert(id, config);
        Ok(id)
    }

    /// Send an `UpdateRequest` with the auth/capability settings of a session.
    /// An empty password means no authentication.
    pub async fn update_session(
        &mut self,
        id: SessionId,
        md5_password: Option<&str>,
        add_path: bool,
        full_table: bool,
    ) -> Result<()> {
        let current = self
            .sessions
            .get(&id)
            .ok_or(ValidationError::UnknownSession(id))?;
        let mut config = current.clone();
        config.md5_password = md5_password.filter(|p| !p.is_empty()).map(String::from);
        config.add_path = add_path;
        config.full_table = full_table;
        config.updated = true;

        debug!(
            "Sending UpdateRequest for {} [add_path={}, full_table={}, md5={}]",
            id,
            add_path,
            full_table,
            config.md5_password.is_some()
        );
        self.transport
            .send(Request::UpdateRequest(config.update_request()))
            .await?;
        self.sessions.insert(id, config);
        Ok(())
    }

    /// Re-send the cached requests for a session (e.g. on a fresh channel)
    pub async fn replay(&self, id: SessionId) -> Result<()> {
        let config = self
            .sessions
            .get(&id)
            .ok_or(ValidationError::UnknownSession(id))?;
        debug!("Replaying {} {}", id, config);
        self.transport
            .send(Request::CreateRequest(config.create_request()))
            .await?;
        if config.updated {
            self.transport
                .send(Request::UpdateRequest(config.update_request()))
                .await?;
        }
        Ok(())
    }

    pub fn session(&self, id: SessionId) -> Option<&SessionConfig> {
        self.sessions.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, TransportError};
    use crate::transport::memory::MemoryTransport;

    fn controller() -> (Arc<MemoryTransport>, SessionController<MemoryTransport>) {
        let transport = Arc::new(MemoryTransport::new());
        (Arc::clone(&transport), SessionController::new(transport))
    }

    #[tokio::test]
    async fn test_create_session_sends_one_request() {
        let (transport, mut controller) = controller();
        let id = controller
            .create_session(65001, "2001:db8::1", 65000)
            .await
            .unwrap();
        assert_eq!(
            transport.sent(),
            vec![Request::CreateRequest(CreateRequest {
                peer_asn: 65001,
                peer_ip: "2001:db8::1".to_string(),
                local_asn: 65000,
            })]
        );
        let config = controller.session(id).unwrap();
        assert!(config.is_ebgp());
        assert_eq!(config.md5_password, None);
    }

    #[tokio::test]
    async fn test_create_session_validation() {
        let (transport, mut controller) = controller();
        let cases = [
            (0, "192.0.2.1", 65000),
            (65001, "192.0.2.1", 0),
            (65001, "192.0.2.300", 65000),
            (65001, "10.0.0.0/8", 65000),
        ];
        for (peer_asn, peer_ip, local_asn) in &cases {
            let err = controller
                .create_session(*peer_asn, peer_ip, *local_asn)
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "{:?}", err);
        }
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_second_create_is_distinct_session() {
        let (_, mut controller) = controller();
        let first = controller.create_session(65001, "192.0.2.1", 65000).await.unwrap();
        let second = controller.create_session(65001, "192.0.2.1", 65000).await.unwrap();
        assert_ne!(first, second);
        assert!(controller.session(first).is_some());
        assert!(controller.session(second).is_some());
    }

    #[tokio::test]
    async fn test_update_session() {
        let (transport, mut controller) = controller();
        let id = controller.create_session(65001, "192.0.2.1", 65000).await.unwrap();
        transport.take();

        controller.update_session(id, Some(""), true, false).await.unwrap();
        controller.update_session(id, Some("hunter2"), false, true).await.unwrap();
        assert_eq!(
            transport.sent(),
            vec![
                Request::UpdateRequest(UpdateRequest {
                    md5_password: None,
                    add_path: true,
                    full_table: false,
                }),
                Request::UpdateRequest(UpdateRequest {
                    md5_password: Some("hunter2".to_string()),
                    add_path: false,
                    full_table: true,
                }),
            ]
        );
        assert_eq!(controller.session(id).unwrap().md5_password.as_deref(), Some("hunter2"));
    }

    #[tokio::test]
    async fn test_update_unknown_session() {
        let (transport, mut controller) = controller();
        let err = controller
            .update_session(SessionId(7), None, false, false)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::UnknownSession(SessionId(7)))
        ));
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_closed_transport_propagates() {
        let (transport, mut controller) = controller();
        transport.close();
        let err = controller
            .create_session(65001, "192.0.2.1", 65000)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(TransportError::Closed)));
    }

    #[tokio::test]
    async fn test_replay() {
        let (transport, mut controller) = controller();
        let id = controller.create_session(65001, "192.0.2.1", 65000).await.unwrap();
        controller.replay(id).await.unwrap();
        assert_eq!(transport.take().len(), 2);

        controller.update_session(id, None, true, true).await.unwrap();
        transport.take();
        controller.replay(id).await.unwrap();
        let kinds: Vec<_> = transport.sent().iter().map(Request::kind).collect();
        assert_eq!(kinds, vec!["CreateRequest", "UpdateRequest"]);
    }
}
