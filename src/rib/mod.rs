//! Route tables: the canonical, deduplicated set of routes for one session.

mod community;

pub use community::{Community, CommunityList};

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ipnetwork::IpNetwork;
use log::trace;
use serde::Serialize;

use crate::error::CollisionError;
use crate::message::{Nlri, Origin, RouteData, RouteId};
use crate::utils::format_time_as_elapsed;

/// Route-origin validation verdict, supplied from outside
#[derive(Serialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RpkiStatus {
    Valid,
    Invalid,
    Unknown,
}

impl Default for RpkiStatus {
    fn default() -> Self {
        RpkiStatus::Unknown
    }
}

impl fmt::Display for RpkiStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let word = match self {
            RpkiStatus::Valid => "valid",
            RpkiStatus::Invalid => "invalid",
            RpkiStatus::Unknown => "unknown",
        };
        write!(f, "{}", word)
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteRecord {
    pub id: RouteId,
    pub prefix: IpNetwork,
    /// AS path, outbound order, prepends kept
    pub path: Vec<u32>,
    pub nexthop: IpAddr,
    pub communities: CommunityList,
    pub origin: Origin,
    pub rpki_status: RpkiStatus,
    pub irr_valid: bool,
    // Display only, never used to identify a route
    #[serde(skip)]
    pub received_at: DateTime<Utc>,
}

impl RouteRecord {
    pub fn new(
        id: RouteId,
        prefix: IpNetwork,
        path: Vec<u32>,
        nexthop: IpAddr,
        origin: Origin,
    ) -> Self {
        Self {
            id,
            prefix,
            path,
            nexthop,
            communities: CommunityList::new(),
            origin,
            rpki_status: RpkiStatus::default(),
            irr_valid: false,
            received_at: Utc::now(),
        }
    }

    pub fn with_communities(mut self, communities: CommunityList) -> Self {
        self.communities = communities;
        self
    }

    /// Single-entry announcement carrying this route
    pub fn to_announcement(&self) -> RouteData {
        let mut data = RouteData::announce(
            vec![Nlri::new(self.prefix, self.id)],
            self.path.clone(),
            self.origin,
            self.nexthop,
        );
        data.communities = self.communities.standard();
        data.large_communities = self.communities.large();
        data
    }

    /// Withdrawal referencing this route
    pub fn to_withdrawal(&self) -> RouteData {
        RouteData::withdraw(vec![Nlri::new(self.prefix, self.id)])
    }
}

impl fmt::Display for RouteRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "<Route id={} prefix={} age={}>",
            self.id,
            self.prefix,
            format_time_as_elapsed(self.received_at),
        )
    }
}

/// Result of a successful [`RouteTable::upsert`]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Updated,
}

/// Authoritative mapping from route id to route, for one session.
///
/// Iteration follows the order in which each id was first seen; replacing a
/// route keeps its position, withdrawing it forgets it.
///
/// Mutation takes `&mut self`: the table is meant to be driven by a single
/// feed loop and is not safe to share between concurrent writers without
/// external locking.
#[derive(Debug, Default)]
pub struct RouteTable {
    // id -> (first-seen sequence, route)
    entries: HashMap<RouteId, (u64, Arc<RouteRecord>)>,
    order: BTreeMap<u64, RouteId>,
    next_seq: u64,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: RouteId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn get(&self, id: RouteId) -> Option<Arc<RouteRecord>> {
        self.entries.get(&id).map(|(_, record)| Arc::clone(record))
    }

    /// Insert a new route, or replace the route with the same id.
    ///
    /// An existing id announced for a different prefix is an upstream
    /// identifier collision: the stored route is left untouched.
    pub fn upsert(&mut self, record: RouteRecord) -> Result<Upsert, CollisionError> {
        if let Some((_, existing)) = self.entries.get_mut(&record.id) {
            if existing.prefix != record.prefix {
                return Err(CollisionError {
                    id: record.id,
                    existing: existing.prefix,
                    received: record.prefix,
                });
            }
            trace!("Replacing {}", existing);
            *existing = Arc::new(record);
            return Ok(Upsert::Updated);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, record.id);
        self.entries.insert(record.id, (seq, Arc::new(record)));
        Ok(Upsert::Inserted)
    }

    /// Remove a route, returning whether it was present
    pub fn withdraw(&mut self, id: RouteId) -> bool {
        match self.entries.remove(&id) {
            Some((seq, record)) => {
                self.order.remove(&seq);
                trace!("Withdrew {}", record);
                true
            }
            None => false,
        }
    }

    /// Set the externally computed validation verdicts on a route
    pub fn annotate(&mut self, id: RouteId, rpki_status: RpkiStatus, irr_valid: bool) -> bool {
        match self.entries.get_mut(&id) {
            Some((_, record)) => {
                let record = Arc::make_mut(record);
                record.rpki_status = rpki_status;
                record.irr_valid = irr_valid;
                true
            }
            None => false,
        }
    }

    /// Drop every route, returning how many were removed
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.order.clear();
        count
    }

    /// Routes in first-seen order. Cheap to restart; borrows the table.
    pub fn iter(&self) -> impl Iterator<Item = &RouteRecord> + '_ {
        self.order
            .values()
            .filter_map(move |id| self.entries.get(id))
            .map(|(_, record)| record.as_ref())
    }

    /// Owned snapshot of the routes in first-seen order
    pub fn routes(&self) -> Vec<Arc<RouteRecord>> {
        self.order
            .values()
            .filter_map(|id| self.entries.get(id))
            .map(|(_, record)| Arc::clone(record))
            .collect()
    }
}
