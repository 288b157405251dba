mod file;

use std::net::IpAddr;
use std::path::Path;

use crate::announce::Announcement;
use crate::error::ConfigError;
use crate::session::validate_peer;
use crate::transport;

/// Parse a TOML config file and return a validated ClientConfig
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<ClientConfig, ConfigError> {
    let spec = file::ClientConfigSpec::from_file(path)?;
    ClientConfig::from_spec(spec)
}

/// Parse TOML config contents and return a validated ClientConfig
pub fn from_str(contents: &str) -> Result<ClientConfig, ConfigError> {
    let spec = file::ClientConfigSpec::from_str(contents)?;
    ClientConfig::from_spec(spec)
}

#[derive(Debug)]
pub struct ClientConfig {
    pub endpoint: String,
    pub session: SessionSettings,
    pub announcements: Vec<Announcement>,
}

/// In-Memory representation of the session section
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSettings {
    pub peer_asn: u32,
    pub peer_ip: IpAddr,
    pub local_asn: u32,
    pub md5_password: Option<String>,
    pub add_path: bool,
    pub full_table: bool,
}

impl SessionSettings {
    // Is this an eBGP session
    pub fn is_ebgp(&self) -> bool {
        self.peer_asn != self.local_asn
    }
}

impl ClientConfig {
    fn from_spec(spec: file::ClientConfigSpec) -> Result<Self, ConfigError> {
        transport::scheme(&spec.endpoint)?;
        let session = spec.session;
        let peer_ip = validate_peer(session.peer_asn, &session.peer_ip, session.local_asn)?;
        let announcements = spec
            .announcements
            .iter()
            .map(|a| {
                Announcement::parse(
                    &a.prefix,
                    a.as_path.clone(),
                    &a.next_hop,
                    a.origin,
                    &a.communities,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            endpoint: spec.endpoint,
            session: SessionSettings {
                peer_asn: session.peer_asn,
                peer_ip,
                local_asn: session.local_asn,
                md5_password: session.md5_password.filter(|p| !p.is_empty()),
                add_path: session.add_path,
                full_table: session.full_table,
            },
            announcements,
        })
    }
}
