//! Locations and the connections between them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

use super::LocationId;
use crate::entities::ActorId;

/// Location types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    Town,
    #[default]
    Building,
    Room,
    Outdoor,
    Dungeon,
    Special,
}

/// A location in the game world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    #[serde(default)]
    pub location_type: LocationType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub connected_locations: BTreeSet<LocationId>,
    #[serde(default)]
    pub properties: Map<String, Value>,
    /// Maintained by the environment store; never set directly.
    #[serde(default, skip_deserializing)]
    pub(crate) occupants: BTreeSet<ActorId>,
}

impl Location {
    pub fn new(
        id: impl Into<LocationId>,
        name: impl Into<String>,
        location_type: LocationType,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location_type,
            description: String::new(),
            connected_locations: BTreeSet::new(),
            properties: Map::new(),
            occupants: BTreeSet::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a one-way connection to another location.
    pub fn connected_to(mut self, other: impl Into<LocationId>) -> Self {
        self.connected_locations.insert(other.into());
        self
    }

    pub fn is_connected_to(&self, other: &LocationId) -> bool {
        self.connected_locations.contains(other)
    }

    /// Actors currently here, in id order.
    pub fn occupants(&self) -> &BTreeSet<ActorId> {
        &self.occupants
    }
}
