//! Component definitions for actors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::world_state::LocationId;

/// Upper bound for the energy and health scalars.
pub const MAX_SCALAR: f32 = 100.0;

/// Who the actor is. Read by decision backends, never touched by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PersonalityComponent {
    pub role: String,
    #[serde(default)]
    pub traits: Vec<String>,
    #[serde(default)]
    pub background: String,
    #[serde(default)]
    pub goals: Vec<String>,
    /// Character id -> relationship label.
    #[serde(default)]
    pub relationships: HashMap<String, String>,
    #[serde(default = "default_dialogue_style")]
    pub dialogue_style: String,
}

fn default_dialogue_style() -> String {
    "casual".to_string()
}

/// Mutable per-actor state. Changed only through [`StateDelta`]s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorState {
    pub current_location: LocationId,
    pub activity: String,
    pub mood: String,
    /// 0.0 - 100.0
    pub energy: f32,
    /// 0.0 - 100.0
    pub health: f32,
    #[serde(default)]
    pub custom_attributes: HashMap<String, serde_json::Value>,
    pub last_updated: DateTime<Utc>,
}

impl ActorState {
    /// Fresh state at the given location: idle, neutral, fully rested.
    pub fn at(location: LocationId) -> Self {
        Self {
            current_location: location,
            activity: "idle".to_string(),
            mood: "neutral".to_string(),
            energy: MAX_SCALAR,
            health: MAX_SCALAR,
            custom_attributes: HashMap::new(),
            last_updated: Utc::now(),
        }
    }

    /// Apply a declared state change. Scalars are clamped to `0..=100`.
    ///
    /// The location is copied verbatim; keeping it consistent with the
    /// environment's occupant sets is the caller's job.
    pub fn apply(&mut self, delta: &StateDelta) {
        if let Some(location) = &delta.location {
            self.current_location = location.clone();
        }
        if let Some(activity) = &delta.activity {
            self.activity = activity.clone();
        }
        if let Some(mood) = &delta.mood {
            self.mood = mood.clone();
        }
        if let Some(change) = delta.energy_change {
            self.energy = (self.energy + change).clamp(0.0, MAX_SCALAR);
        }
        if let Some(change) = delta.health_change {
            self.health = (self.health + change).clamp(0.0, MAX_SCALAR);
        }
        for (key, value) in &delta.custom_attributes {
            self.custom_attributes.insert(key.clone(), value.clone());
        }
        self.last_updated = Utc::now();
    }
}

/// A declared change to an actor's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StateDelta {
    pub location: Option<LocationId>,
    pub activity: Option<String>,
    pub mood: Option<String>,
    /// Relative change, may be negative.
    pub energy_change: Option<f32>,
    /// Relative change, may be negative.
    pub health_change: Option<f32>,
    #[serde(default)]
    pub custom_attributes: HashMap<String, serde_json::Value>,
}

impl StateDelta {
    pub fn is_empty(&self) -> bool {
        self.location.is_none()
            && self.activity.is_none()
            && self.mood.is_none()
            && self.energy_change.is_none()
            && self.health_change.is_none()
            && self.custom_attributes.is_empty()
    }

    /// Fold `other` into `self`. Labels are overwritten, scalar changes add up.
    pub fn merge(&mut self, other: StateDelta) {
        if other.location.is_some() {
            self.location = other.location;
        }
        if other.activity.is_some() {
            self.activity = other.activity;
        }
        if other.mood.is_some() {
            self.mood = other.mood;
        }
        self.energy_change = add_optional(self.energy_change, other.energy_change);
        self.health_change = add_optional(self.health_change, other.health_change);
        self.custom_attributes.extend(other.custom_attributes);
    }
}

fn add_optional(a: Option<f32>, b: Option<f32>) -> Option<f32> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a + b),
        (a, None) => a,
        (None, b) => b,
    }
}
