//! Read-only views of the environment handed to decision backends and callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::{LocationId, LocationType, TimeOfDay, Weather};
use crate::entities::ActorId;

/// What an actor can perceive about the world when deciding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentContext {
    pub time_of_day: TimeOfDay,
    pub weather: Weather,
    pub game_time: u64,
    pub active_events: Vec<String>,
    pub world_properties: Map<String, Value>,
    pub location: Option<LocationView>,
}

/// A location as seen from inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationView {
    pub id: LocationId,
    pub name: String,
    pub location_type: LocationType,
    pub description: String,
    pub properties: Map<String, Value>,
    pub actors_present: Vec<ActorId>,
    pub connected_locations: Vec<LocationId>,
}

/// Summary of the whole environment for status reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentSnapshot {
    pub time_of_day: TimeOfDay,
    pub weather: Weather,
    pub game_time: u64,
    pub active_events: Vec<String>,
    pub world_properties: Map<String, Value>,
    pub location_count: usize,
    pub recent_events_count: usize,
    pub global_flags: BTreeMap<String, bool>,
    pub global_variables: Map<String, Value>,
    pub last_updated: DateTime<Utc>,
}
