//! Game time progression and time-of-day periods.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::error::WorldError;

pub const MINUTES_PER_HOUR: u64 = 60;
pub const MINUTES_PER_DAY: u64 = 24 * MINUTES_PER_HOUR;

/// Named periods of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    Dawn,
    #[default]
    Morning,
    Noon,
    Afternoon,
    Evening,
    Night,
    Midnight,
}

impl TimeOfDay {
    /// Map an hour of the day (0-23) to its period.
    pub fn from_hour(hour: u64) -> Self {
        match hour % 24 {
            5..=6 => TimeOfDay::Dawn,
            7..=11 => TimeOfDay::Morning,
            12 => TimeOfDay::Noon,
            13..=17 => TimeOfDay::Afternoon,
            18..=20 => TimeOfDay::Evening,
            21..=23 => TimeOfDay::Night,
            _ => TimeOfDay::Midnight,
        }
    }

    pub fn from_game_minutes(minutes: u64) -> Self {
        Self::from_hour((minutes % MINUTES_PER_DAY) / MINUTES_PER_HOUR)
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeOfDay::Dawn => "dawn",
            TimeOfDay::Morning => "morning",
            TimeOfDay::Noon => "noon",
            TimeOfDay::Afternoon => "afternoon",
            TimeOfDay::Evening => "evening",
            TimeOfDay::Night => "night",
            TimeOfDay::Midnight => "midnight",
        }
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TimeOfDay {
    type Err = WorldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dawn" => Ok(TimeOfDay::Dawn),
            "morning" => Ok(TimeOfDay::Morning),
            "noon" => Ok(TimeOfDay::Noon),
            "afternoon" => Ok(TimeOfDay::Afternoon),
            "evening" => Ok(TimeOfDay::Evening),
            "night" => Ok(TimeOfDay::Night),
            "midnight" => Ok(TimeOfDay::Midnight),
            other => Err(WorldError::InvalidEnvironmentValue {
                field: "time_of_day".to_string(),
                reason: format!("unknown period '{}'", other),
            }),
        }
    }
}

/// Monotonic game clock counted in whole game minutes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameClock {
    game_minutes: u64,
    /// Fraction of a game minute not yet credited.
    carry: f64,
    time_of_day: TimeOfDay,
}

impl GameClock {
    pub fn starting_at(game_minutes: u64) -> Self {
        Self {
            game_minutes,
            carry: 0.0,
            time_of_day: TimeOfDay::from_game_minutes(game_minutes),
        }
    }

    pub fn game_minutes(&self) -> u64 {
        self.game_minutes
    }

    pub fn time_of_day(&self) -> TimeOfDay {
        self.time_of_day
    }

    pub fn day(&self) -> u64 {
        self.game_minutes / MINUTES_PER_DAY
    }

    pub fn hour(&self) -> u64 {
        (self.game_minutes % MINUTES_PER_DAY) / MINUTES_PER_HOUR
    }

    /// Advance by `elapsed` wall-clock time at `rate` game minutes per
    /// wall-clock minute. Returns `(old, new)` if the period changed.
    pub fn advance(&mut self, elapsed: Duration, rate: f64) -> Option<(TimeOfDay, TimeOfDay)> {
        let rate = if rate.is_finite() { rate.max(0.0) } else { 0.0 };
        let total = self.carry + elapsed.as_secs_f64() / 60.0 * rate;
        let whole = total.floor();
        self.carry = total - whole;
        self.game_minutes = self.game_minutes.saturating_add(whole as u64);
        self.recompute_period()
    }

    /// Jump forward to an absolute game time. Earlier times are rejected.
    pub fn set_game_minutes(
        &mut self,
        minutes: u64,
    ) -> Result<Option<(TimeOfDay, TimeOfDay)>, WorldError> {
        if minutes < self.game_minutes {
            return Err(WorldError::InvalidEnvironmentValue {
                field: "game_time".to_string(),
                reason: format!(
                    "game time cannot go back from {} to {}",
                    self.game_minutes, minutes
                ),
            });
        }
        self.game_minutes = minutes;
        Ok(self.recompute_period())
    }

    /// Override the period label until the next recomputation.
    pub fn set_time_of_day(&mut self, period: TimeOfDay) {
        self.time_of_day = period;
    }

    fn recompute_period(&mut self) -> Option<(TimeOfDay, TimeOfDay)> {
        let new = TimeOfDay::from_game_minutes(self.game_minutes);
        let old = self.time_of_day;
        if new != old {
            self.time_of_day = new;
            Some((old, new))
        } else {
            None
        }
    }
}

impl Default for GameClock {
    fn default() -> Self {
        Self::starting_at(8 * MINUTES_PER_HOUR)
    }
}
