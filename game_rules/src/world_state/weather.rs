//! Weather conditions.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::WorldError;

/// Weather conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Weather {
    #[default]
    Sunny,
    Cloudy,
    Rainy,
    Stormy,
    Foggy,
    Snowy,
}

/// Weather values the ambient maintenance pass picks from.
pub const AMBIENT_WEATHER: [Weather; 3] = [Weather::Sunny, Weather::Cloudy, Weather::Rainy];

impl Weather {
    pub fn label(&self) -> &'static str {
        match self {
            Weather::Sunny => "sunny",
            Weather::Cloudy => "cloudy",
            Weather::Rainy => "rainy",
            Weather::Stormy => "stormy",
            Weather::Foggy => "foggy",
            Weather::Snowy => "snowy",
        }
    }
}

impl std::fmt::Display for Weather {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Weather {
    type Err = WorldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sunny" => Ok(Weather::Sunny),
            "cloudy" => Ok(Weather::Cloudy),
            "rainy" => Ok(Weather::Rainy),
            "stormy" => Ok(Weather::Stormy),
            "foggy" => Ok(Weather::Foggy),
            "snowy" => Ok(Weather::Snowy),
            other => Err(WorldError::InvalidEnvironmentValue {
                field: "weather".to_string(),
                reason: format!("unknown weather '{}'", other),
            }),
        }
    }
}
