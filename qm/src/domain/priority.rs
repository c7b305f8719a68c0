//! Priority values for task scheduling

use serde::{Deserialize, Serialize};

/// Numeric task priority; higher runs first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(pub i64);

impl Priority {
    /// Priority given to background tasks; they are never selected by the tick
    pub const BACKGROUND: Priority = Priority(1);

    /// `base + min(weight * backlog, cap)`, saturating
    pub fn with_backlog(self, weight: i64, backlog: usize, cap: i64) -> Self {
        let backlog = i64::try_from(backlog).unwrap_or(i64::MAX);
        let boost = weight.saturating_mul(backlog).min(cap);
        Self(self.0.saturating_add(boost))
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|_| format!("Unknown priority: {}", s))
    }
}

impl From<i64> for Priority {
    fn from(n: i64) -> Self {
        Self(n)
    }
}
