use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Full mapping of activity name to details, as served by `GET /activities`.
///
/// Activity names are unique keys on the server; a BTreeMap keeps rendering
/// order deterministic.
pub type Directory = BTreeMap<String, ActivityDetails>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityDetails {
    pub description: String,
    pub schedule: String,
    pub max_participants: u32,
    pub participants: Vec<String>,
}

impl ActivityDetails {
    /// Capacity minus current roster size. Signed on purpose: the server owns
    /// the arithmetic, and an oversubscribed roster renders as a negative
    /// count rather than panicking.
    pub fn spots_left(&self) -> i64 {
        i64::from(self.max_participants) - self.participants.len() as i64
    }
}
