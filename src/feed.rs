//! Turns inbound `RouteData` messages into route records and applies them.

use std::convert::TryFrom;
use std::net::IpAddr;

use ipnetwork::IpNetwork;
use log::{debug, warn};

use crate::error::{CollisionError, ProtocolError};
use crate::message::{Nlri, RouteData, RouteId};
use crate::rib::{Community, CommunityList, RouteRecord, RouteTable, Upsert};

/// A `RouteData` message that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct RouteUpdate {
    /// Withdrawn routes, message order
    pub withdrawn: Vec<(RouteId, IpNetwork)>,
    /// Announced routes, message order
    pub announced: Vec<RouteRecord>,
}

fn parse_prefix(nlri: &Nlri) -> Result<IpNetwork, ProtocolError> {
    nlri.prefix
        .trim()
        .parse()
        .map_err(|_| ProtocolError::InvalidPrefix(nlri.prefix.clone()))
}

impl TryFrom<RouteData> for RouteUpdate {
    type Error = ProtocolError;

    /// All or nothing: one bad entry rejects the whole message
    fn try_from(data: RouteData) -> Result<Self, Self::Error> {
        if data.prefixes.is_empty() && data.withdraws.is_empty() {
            return Err(ProtocolError::EmptyUpdate);
        }

        let withdrawn = data
            .withdraws
            .iter()
            .map(|nlri| parse_prefix(nlri).map(|prefix| (nlri.id, prefix)))
            .collect::<Result<Vec<_>, _>>()?;

        if data.prefixes.is_empty() {
            return Ok(Self {
                withdrawn,
                announced: vec![],
            });
        }

        let path = data.as_path.ok_or(ProtocolError::MissingField("asPath"))?;
        let origin = data.origin.ok_or(ProtocolError::MissingField("origin"))?;
        let next_hop = data.next_hop.ok_or(ProtocolError::MissingField("nextHop"))?;
        let nexthop: IpAddr = next_hop
            .trim()
            .parse()
            .map_err(|_| ProtocolError::InvalidNextHop(next_hop.clone()))?;
        let communities: CommunityList = data
            .communities
            .into_iter()
            .map(Community::from)
            .chain(data.large_communities.into_iter().map(Community::from))
            .collect();

        let announced = data
            .prefixes
            .iter()
            .map(|nlri| -> Result<RouteRecord, ProtocolError> {
                let prefix = parse_prefix(nlri)?;
                // The backend's id is authoritative, never regenerate it here
                Ok(RouteRecord::new(nlri.id, prefix, path.clone(), nexthop, origin)
                    .with_communities(communities.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            withdrawn,
            announced,
        })
    }
}

/// What applying one message did to the route table
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FeedReport {
    pub inserted: Vec<RouteId>,
    pub updated: Vec<RouteId>,
    pub withdrawn: Vec<RouteId>,
    pub collisions: Vec<CollisionError>,
}

impl FeedReport {
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty()
            && self.updated.is_empty()
            && self.withdrawn.is_empty()
            && self.collisions.is_empty()
    }
}

/// Applies validated updates to a table.
///
/// Each message is applied to completion before the next: withdrawals first,
/// then announcements, each in message order. A withdrawal or announcement
/// whose prefix disagrees with the stored route for its id is a collision
/// and rejects only the record involved.
pub fn apply(update: RouteUpdate, table: &mut RouteTable) -> FeedReport {
    let mut report = FeedReport::default();
    for (id, prefix) in update.withdrawn {
        let existing = match table.get(id) {
            Some(existing) => existing.prefix,
            None => {
                debug!("Withdrawal for unknown route {}", id);
                continue;
            }
        };
        if existing != prefix {
            let collision = CollisionError {
                id,
                existing,
                received: prefix,
            };
            warn!("Rejected withdrawal: {}", collision);
            report.collisions.push(collision);
            continue;
        }
        table.withdraw(id);
        report.withdrawn.push(id);
    }
    for record in update.announced {
        let id = record.id;
        match table.upsert(record) {
            Ok(Upsert::Inserted) => report.inserted.push(id),
            Ok(Upsert::Updated) => report.updated.push(id),
            Err(collision) => {
                warn!("Rejected route: {}", collision);
                report.collisions.push(collision);
            }
        }
    }
    report
}

/// Validate one inbound `RouteData` and apply it to a table.
/// A malformed message leaves the table untouched.
pub fn process(data: RouteData, table: &mut RouteTable) -> Result<FeedReport, ProtocolError> {
    let update = RouteUpdate::try_from(data)?;
    Ok(apply(update, table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Event, Origin};
    use crate::rib::RpkiStatus;
    use serde_json::json;

    fn route_data(value: serde_json::Value) -> RouteData {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_single_prefix_announcement() {
        let event: Event = serde_json::from_value(json!({
            "type": "RouteData",
            "data": {
                "prefixes": [{"prefix": "10.0.0.0/8", "id": 1}],
                "asPath": [65001, 65002],
                "nextHop": "192.0.2.1",
                "origin": "IGP",
            },
        }))
        .unwrap();
        let data = match event {
            Event::RouteData(data) => data,
            other => panic!("Unexpected event: {:?}", other),
        };
        let mut table = RouteTable::new();
        let report = process(data, &mut table).unwrap();
        assert_eq!(report.inserted, vec![RouteId(1)]);

        let routes: Vec<_> = table.iter().collect();
        assert_eq!(routes.len(), 1);
        let route = routes[0];
        assert_eq!(route.id, RouteId(1));
        assert_eq!(route.prefix.to_string(), "10.0.0.0/8");
        assert_eq!(route.path, vec![65001, 65002]);
        assert_eq!(route.nexthop.to_string(), "192.0.2.1");
        assert_eq!(route.origin, Origin::Igp);
        assert!(route.communities.is_empty());
        assert_eq!(route.rpki_status, RpkiStatus::Unknown);
        assert!(!route.irr_valid);
    }

    #[test]
    fn test_prefixes_applied_in_order() {
        let mut table = RouteTable::new();
        let report = process(
            route_data(json!({
                "prefixes": [
                    {"prefix": "10.3.0.0/16", "id": 30},
                    {"prefix": "10.1.0.0/16", "id": 10},
                    {"prefix": "2001:db8:2::/48", "id": 20},
                ],
                "asPath": [65001],
                "nextHop": "2001:db8::1",
                "origin": "EGP",
            })),
            &mut table,
        )
        .unwrap();
        assert_eq!(report.inserted, vec![RouteId(30), RouteId(10), RouteId(20)]);
        let ids: Vec<_> = table.iter().map(|r| r.id).collect();
        assert_eq!(ids, report.inserted);
    }

    #[test]
    fn test_same_message_twice_updates() {
        let mut table = RouteTable::new();
        let data = route_data(json!({
            "prefixes": [{"prefix": "10.0.0.0/8", "id": 1}],
            "asPath": [65001, 65001],
            "nextHop": "192.0.2.1",
            "origin": 0,
        }));
        process(data.clone(), &mut table).unwrap();
        let report = process(data, &mut table).unwrap();
        assert_eq!(report.updated, vec![RouteId(1)]);
        assert!(report.inserted.is_empty());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_malformed_messages_change_nothing() {
        let mut table = RouteTable::new();
        let one = json!([{"prefix": "10.0.0.0/8", "id": 1}]);
        let two = json!([{"prefix": "10.0.0.0/8", "id": 1}, {"prefix": "10.0.0.0/33", "id": 2}]);
        let cases = vec![
            (json!({"prefixes": []}), "EmptyUpdate"),
            (
                json!({"prefixes": one, "nextHop": "192.0.2.1", "origin": "IGP"}),
                "asPath",
            ),
            (json!({"prefixes": one, "asPath": [], "origin": "IGP"}), "nextHop"),
            (
                json!({"prefixes": one, "asPath": [], "nextHop": "192.0.2.1"}),
                "origin",
            ),
            (
                json!({"prefixes": one, "asPath": [], "nextHop": "nowhere", "origin": "IGP"}),
                "InvalidNextHop",
            ),
            (
                json!({"prefixes": two, "asPath": [], "nextHop": "192.0.2.1", "origin": "IGP"}),
                "InvalidPrefix",
            ),
            (json!({"withdraws": [{"prefix": "bogus", "id": 1}]}), "InvalidPrefix"),
        ];
        for (value, expected) in cases {
            let err = process(route_data(value), &mut table).unwrap_err();
            let matched = match &err {
                ProtocolError::EmptyUpdate => expected == "EmptyUpdate",
                ProtocolError::MissingField(field) => *field == expected,
                ProtocolError::InvalidNextHop(_) => expected == "InvalidNextHop",
                ProtocolError::InvalidPrefix(_) => expected == "InvalidPrefix",
                _ => false,
            };
            assert!(matched, "expected {}, got {:?}", expected, err);
        }
        assert!(table.is_empty());
    }

    #[test]
    fn test_withdrawals_before_announcements() {
        let mut table = RouteTable::new();
        process(
            route_data(json!({
                "prefixes": [{"prefix": "10.0.0.0/8", "id": 1}, {"prefix": "10.2.0.0/16", "id": 2}],
                "asPath": [65001],
                "nextHop": "192.0.2.1",
                "origin": "IGP",
            })),
            &mut table,
        )
        .unwrap();

        // Id 1 is withdrawn and re-used for a new prefix in the same message
        let report = process(
            route_data(json!({
                "prefixes": [{"prefix": "172.16.0.0/12", "id": 1}],
                "withdraws": [
                    {"prefix": "10.0.0.0/8", "id": 1},
                    {"prefix": "10.9.0.0/16", "id": 9},
                ],
                "asPath": [65001],
                "nextHop": "192.0.2.1",
                "origin": "IGP",
            })),
            &mut table,
        )
        .unwrap();
        assert_eq!(report.withdrawn, vec![RouteId(1)]);
        assert_eq!(report.inserted, vec![RouteId(1)]);
        assert!(report.collisions.is_empty());
        let prefixes: Vec<_> = table.iter().map(|r| r.prefix.to_string()).collect();
        assert_eq!(prefixes, vec!["10.2.0.0/16", "172.16.0.0/12"]);
    }

    #[test]
    fn test_collision_spares_other_records() {
        let mut table = RouteTable::new();
        process(
            route_data(json!({
                "prefixes": [{"prefix": "10.0.0.0/8", "id": 1}],
                "asPath": [65001],
                "nextHop": "192.0.2.1",
                "origin": "IGP",
            })),
            &mut table,
        )
        .unwrap();
        let report = process(
            route_data(json!({
                "prefixes": [
                    {"prefix": "192.168.0.0/16", "id": 1},
                    {"prefix": "10.2.0.0/16", "id": 2},
                ],
                "asPath": [65001],
                "nextHop": "192.0.2.1",
                "origin": "IGP",
            })),
            &mut table,
        )
        .unwrap();
        assert_eq!(report.collisions.len(), 1);
        assert_eq!(report.collisions[0].id, RouteId(1));
        assert_eq!(report.inserted, vec![RouteId(2)]);
        assert_eq!(table.get(RouteId(1)).unwrap().prefix.to_string(), "10.0.0.0/8");
    }

    #[test]
    fn test_communities_carried() {
        let mut table = RouteTable::new();
        process(
            route_data(json!({
                "prefixes": [{"prefix": "10.0.0.0/8", "id": 1}],
                "asPath": [65001],
                "nextHop": "192.0.2.1",
                "origin": "IGP",
                "communities": [[65001, 100], [65001, 100]],
                "largeCommunities": [[65001, 7, 8]],
            })),
            &mut table,
        )
        .unwrap();
        let route = table.get(RouteId(1)).unwrap();
        assert_eq!(route.communities.to_string(), "65001:100 65001:7:8");
    }

    #[test]
    fn test_round_trip_shape() {
        let inbound = route_data(json!({
            "prefixes": [{"prefix": "10.0.0.0/8", "id": 1}],
            "asPath": [65001, 65002],
            "nextHop": "192.0.2.1",
            "origin": "IGP",
        }));
        let update = RouteUpdate::try_from(inbound.clone()).unwrap();
        assert_eq!(update.announced[0].to_announcement(), inbound);
    }

    #[test]
    fn test_withdrawal_for_other_prefix_is_collision() {
        let mut table = RouteTable::new();
        process(
            route_data(json!({
                "prefixes": [{"prefix": "10.0.0.0/8", "id": 1}],
                "asPath": [65001],
                "nextHop": "192.0.2.1",
                "origin": "IGP",
            })),
            &mut table,
        )
        .unwrap();

        let report = process(
            route_data(json!({"withdraws": [{"prefix": "172.16.0.0/12", "id": 1}]})),
            &mut table,
        )
        .unwrap();
        assert!(report.withdrawn.is_empty());
        assert_eq!(report.collisions.len(), 1);
        assert_eq!(report.collisions[0].id, RouteId(1));
        assert_eq!(report.collisions[0].existing.to_string(), "10.0.0.0/8");
        assert_eq!(report.collisions[0].received.to_string(), "172.16.0.0/12");
        assert_eq!(table.get(RouteId(1)).unwrap().prefix.to_string(), "10.0.0.0/8");

        let report = process(
            route_data(json!({"withdraws": [{"prefix": "10.0.0.0/8", "id": 1}]})),
            &mut table,
        )
        .unwrap();
        assert_eq!(report.withdrawn, vec![RouteId(1)]);
        assert!(table.is_empty());
    }
}
