//! Environment state management - the location graph, actor placement, the
//! event log, game time and weather.

mod context;
mod event;
mod event_log;
mod location;
mod time;
mod weather;

pub use context::*;
pub use event::*;
pub use event_log::*;
pub use location::*;
pub use time::*;
pub use weather::*;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;

use crate::entities::ActorId;
use crate::error::WorldError;

/// Unique identifier for locations.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationId(pub String);

impl LocationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for LocationId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for LocationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for LocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rules for the ambient weather pass.
#[derive(Debug, Clone, Copy)]
pub struct AmbientWeatherRule {
    /// Skip if a weather change appears in this many most recent log entries.
    pub quiet_window: usize,
    /// Only fire when the lifetime event count is a multiple of this.
    pub modulus: u64,
}

impl Default for AmbientWeatherRule {
    fn default() -> Self {
        Self {
            quiet_window: 10,
            modulus: 20,
        }
    }
}

/// The complete state of one session's world.
///
/// Every actor that has been placed appears in the occupant set of exactly
/// one location; `placements` is the reverse index of those sets.
#[derive(Debug, Clone)]
pub struct EnvironmentStateStore {
    locations: BTreeMap<LocationId, Location>,
    placements: HashMap<ActorId, LocationId>,
    log: EventLog,
    clock: GameClock,
    weather: Weather,
    world_properties: Map<String, Value>,
    active_events: Vec<String>,
    global_flags: BTreeMap<String, bool>,
    global_variables: Map<String, Value>,
    last_updated: DateTime<Utc>,
}

impl EnvironmentStateStore {
    /// Create an empty store whose log keeps `log_capacity` events.
    pub fn new(log_capacity: usize) -> Self {
        Self {
            locations: BTreeMap::new(),
            placements: HashMap::new(),
            log: EventLog::new(log_capacity),
            clock: GameClock::default(),
            weather: Weather::default(),
            world_properties: Map::new(),
            active_events: Vec::new(),
            global_flags: BTreeMap::new(),
            global_variables: Map::new(),
            last_updated: Utc::now(),
        }
    }

    pub fn with_weather(mut self, weather: Weather) -> Self {
        self.weather = weather;
        self
    }

    pub fn with_clock(mut self, clock: GameClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_world_properties(mut self, properties: Map<String, Value>) -> Self {
        self.world_properties = properties;
        self
    }

    // ---- Locations -------------------------------------------------------

    /// Add a location. Any occupants on the value passed in are discarded.
    pub fn add_location(&mut self, mut location: Location) -> Result<(), WorldError> {
        if self.locations.contains_key(&location.id) {
            return Err(WorldError::DuplicateLocation(location.id));
        }
        location.occupants.clear();
        self.locations.insert(location.id.clone(), location);
        Ok(())
    }

    pub fn location(&self, id: &LocationId) -> Option<&Location> {
        self.locations.get(id)
    }

    pub fn has_location(&self, id: &LocationId) -> bool {
        self.locations.contains_key(id)
    }

    /// All locations in id order.
    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.locations.values()
    }

    /// Known locations that `id` lists as its own exits, in id order.
    pub fn neighbours(&self, id: &LocationId) -> Vec<LocationId> {
        let Some(location) = self.locations.get(id) else {
            return Vec::new();
        };
        let found: BTreeSet<&LocationId> = location
            .connected_locations
            .iter()
            .filter(|l| *l != id && self.locations.contains_key(*l))
            .collect();
        found.into_iter().cloned().collect()
    }

    /// Locations that list `id` among their exits, in id order.
    ///
    /// Connections are one-way; this is the reverse of [`Self::neighbours`].
    pub fn locations_connecting_to(&self, id: &LocationId) -> Vec<LocationId> {
        self.locations
            .values()
            .filter(|other| other.id != *id && other.is_connected_to(id))
            .map(|other| other.id.clone())
            .collect()
    }

    // ---- Placement -------------------------------------------------------

    /// Put an actor at a location without recording a movement event,
    /// removing it from wherever it was before.
    pub fn place_actor(&mut self, actor: ActorId, location: &LocationId) -> Result<(), WorldError> {
        if !self.locations.contains_key(location) {
            return Err(WorldError::UnknownLocation(location.clone()));
        }
        self.remove_actor(&actor);
        if let Some(target) = self.locations.get_mut(location) {
            target.occupants.insert(actor.clone());
        }
        self.placements.insert(actor, location.clone());
        Ok(())
    }

    /// Take an actor out of the world entirely.
    pub fn remove_actor(&mut self, actor: &ActorId) -> Option<LocationId> {
        let previous = self.placements.remove(actor)?;
        if let Some(location) = self.locations.get_mut(&previous) {
            location.occupants.remove(actor);
        }
        Some(previous)
    }

    pub fn actor_location(&self, actor: &ActorId) -> Option<&LocationId> {
        self.placements.get(actor)
    }

    /// Actors at a location, in id order.
    pub fn actors_at(&self, location: &LocationId) -> Vec<ActorId> {
        self.locations
            .get(location)
            .map(|l| l.occupants.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Actors sharing `actor`'s location or at one of its exits, excluding
    /// `actor`.
    pub fn nearby_actors(&self, actor: &ActorId) -> Vec<ActorId> {
        let Some(here) = self.placements.get(actor) else {
            return Vec::new();
        };
        let mut found: BTreeSet<ActorId> = self.actors_at(here).into_iter().collect();
        for neighbour in self.neighbours(here) {
            found.extend(self.actors_at(&neighbour));
        }
        found.remove(actor);
        found.into_iter().collect()
    }

    /// Move an actor between two locations and record a movement event.
    pub fn move_actor(
        &mut self,
        actor: &ActorId,
        from: &LocationId,
        to: &LocationId,
    ) -> Result<EventId, WorldError> {
        for id in [from, to] {
            if !self.locations.contains_key(id) {
                return Err(WorldError::UnknownLocation(id.clone()));
            }
        }
        match self.placements.get(actor) {
            None => return Err(WorldError::UnknownActor(actor.clone())),
            Some(current) if current != from => {
                return Err(WorldError::ActorNotAtLocation {
                    actor: actor.clone(),
                    location: from.clone(),
                })
            }
            Some(_) => {}
        }

        self.place_actor(actor.clone(), to)?;

        let event = GameEvent::new(EventKind::ActorAction, actor.as_str(), "move", to.clone())
            .with_description(format!("{} moved from {} to {}", actor, from, to))
            .with_property("from", json!(from.as_str()))
            .with_property("to", json!(to.as_str()));
        Ok(self.record(event))
    }

    // ---- Event log -------------------------------------------------------

    /// Push an event onto the capped log, evicting the oldest when full.
    pub fn append_event(&mut self, event: GameEvent) -> Option<GameEvent> {
        self.last_updated = Utc::now();
        self.log.push(event)
    }

    fn record(&mut self, event: GameEvent) -> EventId {
        let id = event.id.clone();
        tracing::debug!(event_id = %id, action = %event.action, "recording world event");
        self.append_event(event);
        id
    }

    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    /// The most recent `limit` events, oldest first.
    pub fn recent_events(&self, limit: usize) -> Vec<&GameEvent> {
        self.log.last_n(limit).collect()
    }

    pub fn events_at_location(&self, location: &LocationId, limit: usize) -> Vec<&GameEvent> {
        self.log.matching(limit, |e| &e.location == location)
    }

    pub fn events_involving(&self, actor: &ActorId, limit: usize) -> Vec<&GameEvent> {
        self.log.matching(limit, |e| e.involves(actor))
    }

    // ---- Time & weather --------------------------------------------------

    pub fn game_minutes(&self) -> u64 {
        self.clock.game_minutes()
    }

    pub fn time_of_day(&self) -> TimeOfDay {
        self.clock.time_of_day()
    }

    pub fn clock(&self) -> &GameClock {
        &self.clock
    }

    pub fn weather(&self) -> Weather {
        self.weather
    }

    /// Advance game time and record a `time_change` event if the period changed.
    pub fn advance_time(&mut self, elapsed: Duration, rate: f64) -> Option<EventId> {
        let (old, new) = self.clock.advance(elapsed, rate)?;
        Some(self.record_time_change(old, new))
    }

    fn record_time_change(&mut self, old: TimeOfDay, new: TimeOfDay) -> EventId {
        let event = GameEvent::system(
            EventKind::EnvironmentChange,
            "time_change",
            format!("Time changed from {} to {}", old, new),
        )
        .with_property("from", json!(old.label()))
        .with_property("to", json!(new.label()))
        .with_property("game_time", json!(self.clock.game_minutes()));
        self.record(event)
    }

    /// Change the weather, recording a `weather_change` event. No-op if unchanged.
    pub fn change_weather(&mut self, new: Weather, reason: &str) -> Option<EventId> {
        let old = self.weather;
        if old == new {
            return None;
        }
        self.weather = new;
        let event = GameEvent::system(
            EventKind::EnvironmentChange,
            "weather_change",
            format!("Weather changed from {} to {}. {}", old, new, reason)
                .trim_end()
                .to_string(),
        )
        .with_property("from", json!(old.label()))
        .with_property("to", json!(new.label()))
        .with_property("reason", json!(reason));
        Some(self.record(event))
    }

    /// Periodic housekeeping. Refreshes the update timestamp and, when the
    /// ambient rule allows, picks a new random weather for variety.
    pub fn perform_maintenance<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        rule: AmbientWeatherRule,
    ) -> Option<EventId> {
        self.last_updated = Utc::now();

        if self.log.is_empty() || rule.modulus == 0 {
            return None;
        }
        let recently_changed = self
            .log
            .last_n(rule.quiet_window)
            .any(|e| e.action == "weather_change");
        if recently_changed || self.log.total_appended() % rule.modulus != 0 {
            return None;
        }

        let current = self.weather;
        let options: Vec<Weather> = AMBIENT_WEATHER.into_iter().filter(|w| *w != current).collect();
        let new = *options.choose(rng)?;
        self.change_weather(new, "Natural weather change")
    }

    // ---- Environment effects ----------------------------------------------

    /// Apply an event's declared environment changes.
    pub fn apply_event_effects(&mut self, event: &GameEvent) -> Result<(), WorldError> {
        self.apply_environment_changes(&event.environment_changes)
    }

    /// Set known environment fields (`weather`, `time_of_day`, `game_time`)
    /// and store every other key as a world property.
    ///
    /// All entries are attempted; the first rejected one is returned.
    pub fn apply_environment_changes(
        &mut self,
        changes: &Map<String, Value>,
    ) -> Result<(), WorldError> {
        let mut first_error = None;
        for (key, value) in changes {
            if let Err(err) = self.apply_environment_change(key, value) {
                tracing::warn!(field = %key, error = %err, "rejected environment change");
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn apply_environment_change(&mut self, key: &str, value: &Value) -> Result<(), WorldError> {
        match key {
            "weather" => {
                let weather = expect_str(key, value)?.parse()?;
                self.change_weather(weather, "");
            }
            "time_of_day" => {
                let period = expect_str(key, value)?.parse()?;
                self.clock.set_time_of_day(period);
            }
            "game_time" => {
                let minutes = value.as_u64().ok_or_else(|| WorldError::InvalidEnvironmentValue {
                    field: key.to_string(),
                    reason: "expected a non-negative integer".to_string(),
                })?;
                if let Some((old, new)) = self.clock.set_game_minutes(minutes)? {
                    self.record_time_change(old, new);
                }
            }
            _ => {
                self.world_properties.insert(key.to_string(), value.clone());
            }
        }
        self.last_updated = Utc::now();
        Ok(())
    }

    pub fn world_property(&self, key: &str) -> Option<&Value> {
        self.world_properties.get(key)
    }

    // ---- Global state ----------------------------------------------------

    pub fn set_global_flag(&mut self, name: impl Into<String>, value: bool) {
        self.global_flags.insert(name.into(), value);
    }

    pub fn global_flag(&self, name: &str) -> bool {
        self.global_flags.get(name).copied().unwrap_or(false)
    }

    pub fn set_global_variable(&mut self, name: impl Into<String>, value: Value) {
        self.global_variables.insert(name.into(), value);
    }

    pub fn global_variable(&self, name: &str) -> Option<&Value> {
        self.global_variables.get(name)
    }

    /// Start a world-wide event such as a festival or an invasion.
    pub fn trigger_global_event(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        properties: Map<String, Value>,
    ) -> EventId {
        let name = name.into();
        self.active_events.push(name.clone());
        let event = GameEvent::system(EventKind::SystemEvent, "global_event", description)
            .with_properties(properties)
            .with_property("event_name", json!(name));
        self.record(event)
    }

    /// End a world-wide event. Returns `None` if it was not active.
    pub fn end_global_event(&mut self, name: &str) -> Option<EventId> {
        let index = self.active_events.iter().position(|e| e == name)?;
        self.active_events.remove(index);
        let event = GameEvent::system(
            EventKind::SystemEvent,
            "global_event_end",
            format!("Global event '{}' has ended", name),
        )
        .with_property("event_name", json!(name));
        Some(self.record(event))
    }

    pub fn active_events(&self) -> &[String] {
        &self.active_events
    }

    // ---- Views -----------------------------------------------------------

    /// What an actor standing at `location` can perceive.
    pub fn environment_context(&self, location: Option<&LocationId>) -> EnvironmentContext {
        EnvironmentContext {
            time_of_day: self.clock.time_of_day(),
            weather: self.weather,
            game_time: self.clock.game_minutes(),
            active_events: self.active_events.clone(),
            world_properties: self.world_properties.clone(),
            location: location.and_then(|id| self.locations.get(id)).map(|l| LocationView {
                id: l.id.clone(),
                name: l.name.clone(),
                location_type: l.location_type,
                description: l.description.clone(),
                properties: l.properties.clone(),
                actors_present: l.occupants.iter().cloned().collect(),
                connected_locations: self.neighbours(&l.id),
            }),
        }
    }

    pub fn snapshot(&self) -> EnvironmentSnapshot {
        EnvironmentSnapshot {
            time_of_day: self.clock.time_of_day(),
            weather: self.weather,
            game_time: self.clock.game_minutes(),
            active_events: self.active_events.clone(),
            world_properties: self.world_properties.clone(),
            location_count: self.locations.len(),
            recent_events_count: self.log.len(),
            global_flags: self.global_flags.clone(),
            global_variables: self.global_variables.clone(),
            last_updated: self.last_updated,
        }
    }
}

impl Default for EnvironmentStateStore {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

fn expect_str<'a>(key: &str, value: &'a Value) -> Result<&'a str, WorldError> {
    value.as_str().ok_or_else(|| WorldError::InvalidEnvironmentValue {
        field: key.to_string(),
        reason: "expected a string".to_string(),
    })
}
