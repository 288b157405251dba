use std::collections::BTreeSet;
use std::convert::TryFrom;
use std::fmt;
use std::iter::FromIterator;

use itertools::Itertools;
use serde::{Serialize, Serializer};

use crate::error::ValidationError;

/// Community tag attached to a route
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Community {
    /// RFC 1997 community, high 16 bits are the ASN
    Standard(u32),
    /// RFC 8092 large community (global admin, local 1, local 2)
    Large(u32, u32, u32),
}

impl Community {
    pub fn standard(asn: u16, value: u16) -> Self {
        Community::Standard((u32::from(asn) << 16) | u32::from(value))
    }
}

impl fmt::Display for Community {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Community::Standard(value) => write!(f, "{}:{}", value >> 16, value & 0xffff),
            Community::Large(admin, one, two) => write!(f, "{}:{}:{}", admin, one, two),
        }
    }
}

impl From<[u16; 2]> for Community {
    fn from(pair: [u16; 2]) -> Self {
        Community::standard(pair[0], pair[1])
    }
}

impl From<[u32; 3]> for Community {
    fn from(triple: [u32; 3]) -> Self {
        Community::Large(triple[0], triple[1], triple[2])
    }
}

impl TryFrom<&str> for Community {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let invalid = || ValidationError::InvalidCommunity(value.to_string());
        let chunks: Vec<_> = value.trim().split(':').collect();
        match chunks.len() {
            // Single integer form, e.g. "4259840100"
            1 => chunks[0]
                .parse::<u32>()
                .map(Community::Standard)
                .map_err(|_| invalid()),
            2 => {
                let asn = chunks[0].parse::<u16>().map_err(|_| invalid())?;
                let value = chunks[1].parse::<u16>().map_err(|_| invalid())?;
                Ok(Community::standard(asn, value))
            }
            3 => {
                let mut parts = [0u32; 3];
                for (part, chunk) in parts.iter_mut().zip(chunks) {
                    *part = chunk.parse().map_err(|_| invalid())?;
                }
                Ok(Community::from(parts))
            }
            _ => Err(invalid()),
        }
    }
}

impl Serialize for Community {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Set of communities on a route, kept sorted
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct CommunityList(BTreeSet<Community>);

impl CommunityList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Standard communities as wire pairs
    pub fn standard(&self) -> Vec<[u16; 2]> {
        self.0
            .iter()
            .filter_map(|c| {
                if let Community::Standard(value) = c {
                    Some([(value >> 16) as u16, (value & 0xffff) as u16])
                } else {
                    None
                }
            })
            .collect()
    }

    /// Large communities as wire triples
    pub fn large(&self) -> Vec<[u32; 3]> {
        self.0
            .iter()
            .filter_map(|c| {
                if let Community::Large(admin, one, two) = c {
                    Some([*admin, *one, *two])
                } else {
                    None
                }
            })
            .collect()
    }
}

impl FromIterator<Community> for CommunityList {
    fn from_iter<I: IntoIterator<Item = Community>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for CommunityList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().join(" "))
    }
}
