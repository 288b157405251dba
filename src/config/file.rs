use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::message::Origin;

struct Defaults {}

impl Defaults {
    fn endpoint() -> String {
        String::from("ws://127.0.0.1:8080/ws/")
    }

    fn origin() -> Origin {
        Origin::Incomplete
    }
}

/// Config (toml) representation of the session section
#[derive(Clone, Debug, Deserialize)]
pub(super) struct SessionSpec {
    // Peer identity, sent with the CreateRequest
    pub(super) peer_asn: u32,
    pub(super) peer_ip: String,
    pub(super) local_asn: u32,

    // Auth/capabilities, sent with the UpdateRequest
    pub(super) md5_password: Option<String>,
    #[serde(default)]
    pub(super) add_path: bool,
    #[serde(default)]
    pub(super) full_table: bool,
}

/// Config (toml) representation of a static announcement
#[derive(Clone, Debug, Deserialize)]
pub(super) struct AnnouncementSpec {
    pub(super) prefix: String,
    pub(super) next_hop: String,
    #[serde(default = "Vec::new")]
    pub(super) as_path: Vec<u32>,
    #[serde(default = "Defaults::origin")]
    pub(super) origin: Origin,
    // "asn:value" or "asn:data1:data2"
    #[serde(default = "Vec::new")]
    pub(super) communities: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ClientConfigSpec {
    // Backend channel URL, ws:// or tcp://
    #[serde(default = "Defaults::endpoint")]
    pub(super) endpoint: String,
    pub(super) session: SessionSpec,
    #[serde(default = "Vec::new")]
    pub(super) announcements: Vec<AnnouncementSpec>,
}

impl ClientConfigSpec {
    pub(super) fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_str(&contents)
    }

    pub(super) fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let config: ClientConfigSpec = toml::from_str(contents)?;
        Ok(config)
    }
}
