//! Actor (NPC) records.

use serde::{Deserialize, Serialize};

use super::{ActorId, ActorState, PersonalityComponent, StateDelta};
use crate::world_state::LocationId;

/// A full actor definition: identity, personality and live state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorRecord {
    pub id: ActorId,
    pub name: String,
    pub personality: PersonalityComponent,
    pub state: ActorState,
}

impl ActorRecord {
    /// Create a new actor standing at `location`.
    pub fn new(id: impl Into<ActorId>, name: impl Into<String>, location: LocationId) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            personality: PersonalityComponent::default(),
            state: ActorState::at(location),
        }
    }

    pub fn with_personality(mut self, personality: PersonalityComponent) -> Self {
        self.personality = personality;
        self
    }

    /// Check if the actor is alive.
    pub fn is_alive(&self) -> bool {
        self.state.health > 0.0
    }

    pub fn apply(&mut self, delta: &StateDelta) {
        self.state.apply(delta);
    }

    /// Read-only view handed to callers and decision backends.
    pub fn snapshot(&self) -> ActorSnapshot {
        ActorSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            role: self.personality.role.clone(),
            traits: self.personality.traits.clone(),
            goals: self.personality.goals.clone(),
            dialogue_style: self.personality.dialogue_style.clone(),
            location: self.state.current_location.clone(),
            activity: self.state.activity.clone(),
            mood: self.state.mood.clone(),
            energy: self.state.energy,
            health: self.state.health,
        }
    }
}

/// Point-in-time copy of an actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorSnapshot {
    pub id: ActorId,
    pub name: String,
    pub role: String,
    pub traits: Vec<String>,
    pub goals: Vec<String>,
    pub dialogue_style: String,
    pub location: LocationId,
    pub activity: String,
    pub mood: String,
    pub energy: f32,
    pub health: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_actor() {
        let actor = ActorRecord::new("marcus", "Marcus the Blacksmith", LocationId::new("forge"));
        assert_eq!(actor.name, "Marcus the Blacksmith");
        assert!(actor.is_alive());
        assert_eq!(actor.state.activity, "idle");
        assert_eq!(actor.snapshot().location, LocationId::new("forge"));
    }

    #[test]
    fn test_actor_death() {
        let mut actor = ActorRecord::new("doomed", "Doomed", LocationId::new("pit"));
        actor.apply(&StateDelta {
            health_change: Some(-200.0),
            ..Default::default()
        });
        assert!(!actor.is_alive());
    }
}
