//! Actor definitions for the game world.

mod actor;
mod components;

pub use actor::*;
pub use components::*;

use serde::{Deserialize, Serialize};

/// Unique identifier for actors (NPCs).
///
/// Actor ids come from game content (e.g. `marcus_blacksmith`), so they are
/// strings rather than generated UUIDs. Ordering is lexicographic and is the
/// tie-break order used wherever several actors must be listed deterministically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(pub String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ActorId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ActorId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
