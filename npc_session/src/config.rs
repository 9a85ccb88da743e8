//! Session configuration: the starting world, the actor roster and engine settings.
//!
//! Read once at construction time. A session never reloads its config.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use game_rules::{
    ActorId, ActorRecord, AmbientWeatherRule, Location, LocationId, PersonalityComponent, Weather,
    DEFAULT_LOG_CAPACITY, MINUTES_PER_HOUR,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;

/// Engine tuning knobs.
///
/// Durations are stored as plain integers so the TOML stays readable;
/// use the accessor methods to get [`Duration`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Events kept in the session log before the oldest is evicted.
    pub event_log_capacity: usize,
    /// Upper bound on a single decision call.
    pub decision_timeout_ms: u64,
    /// How long the background worker waits on an empty queue before
    /// re-checking for shutdown.
    pub worker_poll_ms: u64,
    /// Time background tasks get to finish after `stop()`.
    pub shutdown_grace_ms: u64,

    pub autonomy_enabled: bool,
    pub autonomy_interval_secs: u64,
    /// Actors need strictly more energy than this to act on their own.
    pub autonomy_energy_threshold: f32,
    /// Recent log entries checked for an actor's involvement.
    pub autonomy_lookback: usize,

    /// Game minutes per wall-clock minute.
    pub time_rate: f64,
    pub clock_tick_secs: u64,
    pub maintenance_interval_secs: u64,
    pub weather_quiet_window: usize,
    pub weather_change_modulus: u64,
    /// Fixed seed for the maintenance RNG; random when unset.
    pub maintenance_seed: Option<u64>,

    /// Completed responses kept for lookup.
    pub response_retention: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            event_log_capacity: DEFAULT_LOG_CAPACITY,
            decision_timeout_ms: 10_000,
            worker_poll_ms: 1_000,
            shutdown_grace_ms: 5_000,
            autonomy_enabled: true,
            autonomy_interval_secs: 30,
            autonomy_energy_threshold: 80.0,
            autonomy_lookback: 10,
            time_rate: 60.0,
            clock_tick_secs: 60,
            maintenance_interval_secs: 300,
            weather_quiet_window: 10,
            weather_change_modulus: 20,
            maintenance_seed: None,
            response_retention: 256,
        }
    }
}

impl SessionSettings {
    pub fn decision_timeout(&self) -> Duration {
        Duration::from_millis(self.decision_timeout_ms)
    }

    pub fn worker_poll(&self) -> Duration {
        Duration::from_millis(self.worker_poll_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    pub fn autonomy_interval(&self) -> Duration {
        Duration::from_secs(self.autonomy_interval_secs)
    }

    pub fn clock_tick(&self) -> Duration {
        Duration::from_secs(self.clock_tick_secs)
    }

    pub fn maintenance_interval(&self) -> Duration {
        Duration::from_secs(self.maintenance_interval_secs)
    }

    pub fn weather_rule(&self) -> AmbientWeatherRule {
        AmbientWeatherRule {
            quiet_window: self.weather_quiet_window,
            modulus: self.weather_change_modulus,
        }
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_zero = [
            ("event_log_capacity", self.event_log_capacity as u64),
            ("decision_timeout_ms", self.decision_timeout_ms),
            ("worker_poll_ms", self.worker_poll_ms),
            ("autonomy_interval_secs", self.autonomy_interval_secs),
            ("clock_tick_secs", self.clock_tick_secs),
            ("maintenance_interval_secs", self.maintenance_interval_secs),
        ];
        for (name, value) in non_zero {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{} must be greater than zero", name)));
            }
        }
        if !self.time_rate.is_finite() || self.time_rate < 0.0 {
            return Err(ConfigError::Invalid("time_rate must be a non-negative number".into()));
        }
        Ok(())
    }
}

/// Starting state of the world.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub weather: Weather,
    /// Game minutes since day 0 midnight.
    pub start_game_minutes: u64,
    pub world_properties: Map<String, Value>,
    pub locations: Vec<Location>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            weather: Weather::default(),
            start_game_minutes: 8 * MINUTES_PER_HOUR,
            world_properties: Map::new(),
            locations: Vec::new(),
        }
    }
}

/// One actor in the starting roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorConfig {
    pub id: ActorId,
    pub name: String,
    pub location: LocationId,
    #[serde(default)]
    pub personality: PersonalityComponent,
    #[serde(default)]
    pub energy: Option<f32>,
    #[serde(default)]
    pub mood: Option<String>,
}

impl ActorConfig {
    pub fn new(
        id: impl Into<ActorId>,
        name: impl Into<String>,
        location: impl Into<LocationId>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            location: location.into(),
            personality: PersonalityComponent::default(),
            energy: None,
            mood: None,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.personality.role = role.into();
        self
    }

    pub fn with_energy(mut self, energy: f32) -> Self {
        self.energy = Some(energy);
        self
    }

    /// Build the live record.
    pub fn to_record(&self) -> ActorRecord {
        let mut record = ActorRecord::new(self.id.clone(), self.name.clone(), self.location.clone())
            .with_personality(self.personality.clone());
        if let Some(energy) = self.energy {
            record.state.energy = energy.clamp(0.0, game_rules::MAX_SCALAR);
        }
        if let Some(mood) = &self.mood {
            record.state.mood = mood.clone();
        }
        record
    }
}

/// Everything needed to construct a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Generated when absent.
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub settings: SessionSettings,
    #[serde(default)]
    pub environment: EnvironmentConfig,
    #[serde(default)]
    pub actors: Vec<ActorConfig>,
}

fn default_title() -> String {
    "Untitled session".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: None,
            title: default_title(),
            settings: SessionSettings::default(),
            environment: EnvironmentConfig::default(),
            actors: Vec::new(),
        }
    }
}

impl SessionConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: SessionConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn with_session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.environment.locations.push(location);
        self
    }

    pub fn with_actor(mut self, actor: ActorConfig) -> Self {
        self.actors.push(actor);
        self
    }

    /// Check the settings and that the world graph and roster are consistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.settings.validate()?;

        let mut location_ids = HashSet::new();
        for location in &self.environment.locations {
            if !location_ids.insert(&location.id) {
                return Err(ConfigError::Invalid(format!("duplicate location '{}'", location.id)));
            }
        }
        for location in &self.environment.locations {
            if let Some(missing) = location
                .connected_locations
                .iter()
                .find(|id| !location_ids.contains(id))
            {
                return Err(ConfigError::Invalid(format!(
                    "location '{}' connects to unknown location '{}'",
                    location.id, missing
                )));
            }
        }

        let mut actor_ids = HashSet::new();
        for actor in &self.actors {
            if !actor_ids.insert(&actor.id) {
                return Err(ConfigError::Invalid(format!("duplicate actor '{}'", actor.id)));
            }
            if !location_ids.contains(&actor.location) {
                return Err(ConfigError::Invalid(format!(
                    "actor '{}' starts in unknown location '{}'",
                    actor.id, actor.location
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_rules::LocationType;

    const VILLAGE: &str = r#"
session_id = "village"
title = "Village square"

[settings]
decision_timeout_ms = 2500
autonomy_enabled = false

[environment]
weather = "rainy"
start_game_minutes = 720

[[environment.locations]]
id = "square"
name = "Town Square"
location_type = "outdoor"
connected_locations = ["forge"]

[[environment.locations]]
id = "forge"
name = "Blacksmith Forge"

[[actors]]
id = "marcus"
name = "Marcus"
location = "forge"
energy = 90.0

[actors.personality]
role = "blacksmith"
traits = ["gruff", "honest"]
"#;

    #[test]
    fn test_parse_toml() {
        let config = SessionConfig::from_toml_str(VILLAGE).unwrap();

        assert_eq!(config.session_id.as_deref(), Some("village"));
        assert_eq!(config.settings.decision_timeout(), Duration::from_millis(2500));
        assert!(!config.settings.autonomy_enabled);
        // Untouched settings keep their defaults.
        assert_eq!(config.settings.event_log_capacity, 50);
        assert_eq!(config.settings.autonomy_interval(), Duration::from_secs(30));

        assert_eq!(config.environment.weather, Weather::Rainy);
        assert_eq!(config.environment.locations.len(), 2);
        assert_eq!(config.environment.locations[0].location_type, LocationType::Outdoor);
        assert_eq!(config.environment.locations[1].location_type, LocationType::Building);

        let marcus = config.actors[0].to_record();
        assert_eq!(marcus.personality.role, "blacksmith");
        assert_eq!(marcus.personality.dialogue_style, "casual");
        assert_eq!(marcus.state.energy, 90.0);
    }

    #[test]
    fn test_validate_rejects_unknown_actor_location() {
        let config = SessionConfig::default()
            .with_location(Location::new("square", "Square", LocationType::Outdoor))
            .with_actor(ActorConfig::new("marcus", "Marcus", "forge"));

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("unknown location 'forge'"));
    }

    #[test]
    fn test_validate_rejects_dangling_connection() {
        let square = Location::new("square", "Square", LocationType::Outdoor).connected_to("docks");
        let config = SessionConfig::default().with_location(square);

        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let config = SessionConfig::default()
            .with_location(Location::new("square", "Square", LocationType::Outdoor))
            .with_location(Location::new("square", "Other Square", LocationType::Outdoor));
        assert!(config.validate().is_err());

        let config = SessionConfig::default()
            .with_location(Location::new("square", "Square", LocationType::Outdoor))
            .with_actor(ActorConfig::new("tom", "Tom", "square"))
            .with_actor(ActorConfig::new("tom", "Tom again", "square"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let settings = SessionSettings {
            clock_tick_secs: 0,
            ..SessionSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_parse_error_surfaces() {
        assert!(matches!(
            SessionConfig::from_toml_str("settings = 3"),
            Err(ConfigError::Parse(_))
        ));
    }
}
