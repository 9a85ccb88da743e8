//! Game events - immutable records of something that happened.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::LocationId;
use crate::entities::ActorId;

/// Initiator label for events caused by the player.
pub const PLAYER_INITIATOR: &str = "player";

/// Initiator label for events raised by the engine itself.
pub const SYSTEM_INITIATOR: &str = "system";

/// Location label for events that happen everywhere at once.
pub const GLOBAL_LOCATION: &str = "global";

/// Unique identifier for events.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub String);

impl EventId {
    /// Create a new random event ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for EventId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EventId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who or what caused an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PlayerAction,
    ActorAction,
    EnvironmentChange,
    SystemEvent,
    Interaction,
}

/// Something that happened in the world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameEvent {
    pub id: EventId,
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    /// `player`, `system`, or an actor id.
    pub initiator: String,
    pub target: Option<String>,
    pub location: LocationId,
    pub action: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
    /// Environment keys this event changes.
    #[serde(default)]
    pub environment_changes: Map<String, Value>,
    /// 1 = low, 10 = high.
    #[serde(default = "default_priority")]
    pub priority: u8,
}

fn default_priority() -> u8 {
    5
}

impl GameEvent {
    pub fn new(
        kind: EventKind,
        initiator: impl Into<String>,
        action: impl Into<String>,
        location: impl Into<LocationId>,
    ) -> Self {
        let initiator = initiator.into();
        let action = action.into();
        Self {
            id: EventId::new(),
            kind,
            timestamp: Utc::now(),
            description: format!("{} {}", initiator, action),
            initiator,
            target: None,
            location: location.into(),
            action,
            properties: Map::new(),
            environment_changes: Map::new(),
            priority: default_priority(),
        }
    }

    /// An engine-raised event that applies to the whole world.
    pub fn system(
        kind: EventKind,
        action: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self::new(kind, SYSTEM_INITIATOR, action, GLOBAL_LOCATION).with_description(description)
    }

    pub fn with_id(mut self, id: EventId) -> Self {
        self.id = id;
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn with_properties(mut self, properties: Map<String, Value>) -> Self {
        self.properties.extend(properties);
        self
    }

    pub fn with_environment_changes(mut self, changes: Map<String, Value>) -> Self {
        self.environment_changes = changes;
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority.clamp(1, 10);
        self
    }

    /// True if the actor initiated or was targeted by this event.
    pub fn involves(&self, actor: &ActorId) -> bool {
        self.initiator == actor.as_str() || self.target.as_deref() == Some(actor.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_involves_initiator_and_target() {
        let marcus = ActorId::new("marcus");
        let elena = ActorId::new("elena");
        let bob = ActorId::new("bob");

        let event = GameEvent::new(EventKind::ActorAction, "marcus", "speak", "forge")
            .with_target("elena");

        assert!(event.involves(&marcus));
        assert!(event.involves(&elena));
        assert!(!event.involves(&bob));
    }

    #[test]
    fn test_system_event_is_global() {
        let event = GameEvent::system(EventKind::EnvironmentChange, "weather_change", "It rains")
            .with_property("to", json!("rainy"));

        assert_eq!(event.initiator, SYSTEM_INITIATOR);
        assert_eq!(event.location.as_str(), GLOBAL_LOCATION);
        assert_eq!(event.properties["to"], json!("rainy"));
    }
}
