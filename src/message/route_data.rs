use std::convert::TryFrom;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use ipnetwork::IpNetwork;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// Path identifier for one announced prefix, assigned by whoever originates it
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct RouteId(pub u32);

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// BGP ORIGIN attribute
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Origin {
    Igp,
    Egp,
    Incomplete,
}

impl Origin {
    /// Numeric attribute value (RFC 4271 5.1.1)
    pub fn code(self) -> u8 {
        match self {
            Origin::Igp => 0,
            Origin::Egp => 1,
            Origin::Incomplete => 2,
        }
    }
}

impl Default for Origin {
    fn default() -> Self {
        Origin::Incomplete
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let word = match self {
            Origin::Igp => "IGP",
            Origin::Egp => "EGP",
            Origin::Incomplete => "INCOMPLETE",
        };
        write!(f, "{}", word)
    }
}

impl FromStr for Origin {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "igp" => Ok(Origin::Igp),
            "egp" => Ok(Origin::Egp),
            "incomplete" | "?" => Ok(Origin::Incomplete),
            _ => Err(ValidationError::InvalidOrigin(s.to_string())),
        }
    }
}

impl TryFrom<u64> for Origin {
    type Error = ValidationError;

    fn try_from(code: u64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Origin::Igp),
            1 => Ok(Origin::Egp),
            2 => Ok(Origin::Incomplete),
            _ => Err(ValidationError::InvalidOrigin(code.to_string())),
        }
    }
}

impl Serialize for Origin {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

struct OriginVisitor;

impl<'de> Visitor<'de> for OriginVisitor {
    type Value = Origin;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an origin name (IGP, EGP, INCOMPLETE) or code (0-2)")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Origin, E> {
        value.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Origin, E> {
        Origin::try_from(value).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Origin, E> {
        let code = u64::try_from(value)
            .map_err(|_| E::custom(format!("invalid origin: '{}'", value)))?;
        self.visit_u64(code)
    }
}

// The backend reports origin as the attribute code, the UI speaks names
impl<'de> Deserialize<'de> for Origin {
    fn deserialize<D>(deserializer: D) -> Result<Origin, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(OriginVisitor)
    }
}

/// One prefix entry of a RouteData message
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nlri {
    pub prefix: String,
    pub id: RouteId,
}

impl Nlri {
    pub fn new(prefix: IpNetwork, id: RouteId) -> Self {
        Self {
            prefix: prefix.to_string(),
            id,
        }
    }
}

// The backend sends empty lists as `null`
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Payload of a `RouteData` message, in either direction.
///
/// Announcements carry `prefixes` plus the shared path attributes,
/// withdrawals carry only `withdraws`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub prefixes: Vec<Nlri>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub withdraws: Vec<Nlri>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_path: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_hop: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub communities: Vec<[u16; 2]>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub large_communities: Vec<[u32; 3]>,
}

impl RouteData {
    pub fn announce(
        prefixes: Vec<Nlri>,
        as_path: Vec<u32>,
        origin: Origin,
        next_hop: IpAddr,
    ) -> Self {
        Self {
            prefixes,
            as_path: Some(as_path),
            origin: Some(origin),
            next_hop: Some(next_hop.to_string()),
            ..Default::default()
        }
    }

    pub fn withdraw(withdraws: Vec<Nlri>) -> Self {
        Self {
            withdraws,
            ..Default::default()
        }
    }

    pub fn is_withdrawal(&self) -> bool {
        self.prefixes.is_empty() && !self.withdraws.is_empty()
    }
}
