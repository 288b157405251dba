//! Locally originated routes: announcing them and taking them back.

use std::convert::TryFrom;
use std::net::IpAddr;
use std::sync::Arc;

use ipnetwork::IpNetwork;
use log::{debug, info};

use crate::error::{Result, ValidationError};
use crate::message::{Origin, Request, RouteId};
use crate::rib::{Community, CommunityList, RouteRecord, RouteTable};
use crate::transport::Transport;

/// A validated route to originate
#[derive(Clone, Debug, PartialEq)]
pub struct Announcement {
    pub prefix: IpNetwork,
    pub as_path: Vec<u32>,
    pub next_hop: IpAddr,
    pub origin: Origin,
    pub communities: CommunityList,
}

impl Announcement {
    pub fn new(prefix: IpNetwork, as_path: Vec<u32>, next_hop: IpAddr, origin: Origin) -> Self {
        Self {
            prefix,
            as_path,
            next_hop,
            origin,
            communities: CommunityList::new(),
        }
    }

    /// Build from user input (prefix, next hop and community strings)
    pub fn parse<S: AsRef<str>>(
        prefix: &str,
        as_path: Vec<u32>,
        next_hop: &str,
        origin: Origin,
        communities: &[S],
    ) -> std::result::Result<Self, ValidationError> {
        let prefix = prefix
            .trim()
            .parse::<IpNetwork>()
            .map_err(|_| ValidationError::InvalidPrefix(prefix.to_string()))?;
        let next_hop = next_hop
            .trim()
            .parse::<IpAddr>()
            .map_err(|_| ValidationError::InvalidAddress(next_hop.to_string()))?;
        let communities = communities
            .iter()
            .map(|c| Community::try_from(c.as_ref()))
            .collect::<std::result::Result<CommunityList, _>>()?;
        Ok(Self {
            communities,
            ..Self::new(prefix, as_path, next_hop, origin)
        })
    }
}

/// Hands out path ids for locally originated routes.
///
/// Monotonic per session, wraps past `u32::MAX` and never yields 0.
#[derive(Debug)]
pub struct RouteIdGenerator {
    next: u32,
}

impl Default for RouteIdGenerator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl RouteIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(next: u32) -> Self {
        Self { next: next.max(1) }
    }

    /// Next id not currently held by `table`
    pub fn next_free(&mut self, table: &RouteTable) -> RouteId {
        loop {
            let id = RouteId(self.next);
            self.next = self.next.checked_add(1).unwrap_or(1);
            if !table.contains(id) {
                return id;
            }
        }
    }
}

/// Sends announcements and withdrawals for locally originated routes, and
/// keeps the table of what is currently announced.
pub struct AnnouncementEmitter<T: Transport> {
    transport: Arc<T>,
    ids: RouteIdGenerator,
    announced: RouteTable,
}

impl<T: Transport> AnnouncementEmitter<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self::with_generator(transport, RouteIdGenerator::new())
    }

    pub fn with_generator(transport: Arc<T>, ids: RouteIdGenerator) -> Self {
        Self {
            transport,
            ids,
            announced: RouteTable::new(),
        }
    }

    /// Routes announced and not yet withdrawn
    pub fn announced(&self) -> &RouteTable {
        &self.announced
    }

    /// Announce one prefix under a fresh id
    pub async fn add_announcement(
        &mut self,
        prefix: &str,
        path: Vec<u32>,
        nexthop: &str,
        origin: Origin,
    ) -> Result<Arc<RouteRecord>> {
        let announcement = Announcement::parse::<&str>(prefix, path, nexthop, origin, &[])?;
        self.announce(announcement).await
    }

    /// Announce a validated route under a fresh id. The route is only
    /// recorded once the transport accepted it.
    pub async fn announce(&mut self, announcement: Announcement) -> Result<Arc<RouteRecord>> {
        let id = self.ids.next_free(&self.announced);
        let record = RouteRecord::new(
            id,
            announcement.prefix,
            announcement.as_path,
            announcement.next_hop,
            announcement.origin,
        )
        .with_communities(announcement.communities);

        debug!("Announcing {} via {}", record.prefix, record.nexthop);
        self.transport
            .send(Request::RouteData(record.to_announcement()))
            .await?;

        let announced = Arc::new(record.clone());
        self.announced.upsert(record)?;
        info!("Announced route {}", id);
        Ok(announced)
    }

    /// Withdraw a previously announced route and drop it from the announced
    /// table. Returns whether the route was still recorded as announced.
    pub async fn delete_announcement(&mut self, route: &RouteRecord) -> Result<bool> {
        debug!("Withdrawing {}", route);
        self.transport
            .send(Request::RouteData(route.to_withdrawal()))
            .await?;
        let removed = self.announced.withdraw(route.id);
        info!("Withdrew route {} ({})", route.id, route.prefix);
        Ok(removed)
    }
}
