//! Messages exchanged with the backend.
//!
//! Every frame is a JSON envelope `{"type": ..., "data": ...}`. Outbound
//! frames are [`Request`]s, inbound frames are [`Event`]s; each variant
//! carries its own typed payload.

mod codec;
mod route_data;

pub use codec::{decode_event, MessageCodec, MessageProtocol};
pub use route_data::{Nlri, Origin, RouteData, RouteId};

use serde::{Deserialize, Serialize};

use crate::session::SessionState;

/// Frames sent to the backend
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Request {
    CreateRequest(CreateRequest),
    UpdateRequest(UpdateRequest),
    RouteData(RouteData),
}

impl Request {
    pub fn kind(&self) -> &'static str {
        match self {
            Request::CreateRequest(_) => "CreateRequest",
            Request::UpdateRequest(_) => "UpdateRequest",
            Request::RouteData(data) if data.is_withdrawal() => "RouteData(withdraw)",
            Request::RouteData(_) => "RouteData",
        }
    }
}

/// Frames received from the backend
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    InitData(InitData),
    #[serde(rename = "FSMUpdate")]
    FsmUpdate(FsmUpdate),
    Error(BackendError),
    RouteData(RouteData),
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::InitData(_) => "InitData",
            Event::FsmUpdate(_) => "FSMUpdate",
            Event::Error(_) => "Error",
            Event::RouteData(_) => "RouteData",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    #[serde(rename = "peerASN")]
    pub peer_asn: u32,
    #[serde(rename = "peerIP")]
    pub peer_ip: String,
    #[serde(rename = "localASN")]
    pub local_asn: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    // `null` means no TCP-MD5 authentication
    pub md5_password: Option<String>,
    pub add_path: bool,
    pub full_table: bool,
}

/// Backend identity, sent once when the channel opens
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitData {
    pub router_id: String,
    pub listen_ip: String,
}

/// `FSMUpdate` frames carry either a state transition or a log line
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FsmUpdate {
    State(FsmState),
    Log(FsmLog),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FsmState {
    pub state: SessionState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hold_timer: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keepalive_timer: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsmLog {
    /// Unix time in nanoseconds
    pub time: u64,
    pub message: String,
}

/// A request the backend refused
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendError {
    pub message: String,
}
