//! Movement targets

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where the actor should move to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Destination {
    /// Anywhere on a named map
    Map { map: String },

    /// A coordinate on a map
    Point { map: String, x: f64, y: f64 },

    /// Wherever a peer currently is
    Peer { name: String },
}

impl Destination {
    pub fn map(name: impl Into<String>) -> Self {
        Self::Map { map: name.into() }
    }

    pub fn peer(name: impl Into<String>) -> Self {
        Self::Peer { name: name.into() }
    }

    /// Map name when statically known
    pub fn map_name(&self) -> Option<&str> {
        match self {
            Self::Map { map } | Self::Point { map, .. } => Some(map),
            Self::Peer { .. } => None,
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Map { map } => write!(f, "{}", map),
            Self::Point { map, x, y } => write!(f, "{}@({}, {})", map, x, y),
            Self::Peer { name } => write!(f, "peer:{}", name),
        }
    }
}
