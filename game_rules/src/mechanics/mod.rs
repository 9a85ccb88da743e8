//! Game mechanics: the actions an actor can take and what they cost.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::entities::StateDelta;
use crate::error::WorldError;
use crate::world_state::LocationId;

/// Longest line an actor may speak in one action.
pub const MAX_SPEECH_LEN: usize = 500;

/// Tone of voice for speech.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    #[default]
    Neutral,
    Friendly,
    Angry,
    Excited,
    Sad,
    Mysterious,
    Formal,
    Casual,
}

/// How an actor travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    #[default]
    Walk,
    Run,
    Sneak,
    Rush,
}

/// Every kind of action, each with its own payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    Speak {
        message: String,
        #[serde(default)]
        tone: Tone,
    },
    Move {
        destination: LocationId,
        #[serde(default)]
        movement: MovementType,
        #[serde(default)]
        reason: String,
    },
    Emote {
        emotion: String,
        /// 1 = subtle, 10 = very intense.
        #[serde(default = "default_intensity")]
        intensity: u8,
    },
    Interact {
        interaction: String,
        #[serde(default)]
        item: Option<String>,
    },
    Wait {
        #[serde(default = "default_wait_secs")]
        duration_secs: f32,
        #[serde(default)]
        reason: String,
    },
    /// Game-specific action outside the built-in set.
    Custom {
        name: String,
        #[serde(default)]
        properties: Map<String, Value>,
    },
}

fn default_intensity() -> u8 {
    5
}

fn default_wait_secs() -> f32 {
    1.0
}

impl ActionKind {
    /// Short label used as the action name on events.
    pub fn label(&self) -> &str {
        match self {
            ActionKind::Speak { .. } => "speak",
            ActionKind::Move { .. } => "move",
            ActionKind::Emote { .. } => "emote",
            ActionKind::Interact { .. } => "interact",
            ActionKind::Wait { .. } => "wait",
            ActionKind::Custom { name, .. } => name,
        }
    }

    /// Waiting is what an actor does when it has nothing to do.
    pub fn is_idle(&self) -> bool {
        matches!(self, ActionKind::Wait { .. })
    }

    /// Energy spent performing the action.
    pub fn energy_cost(&self) -> f32 {
        match self {
            ActionKind::Speak { .. } => 1.0,
            ActionKind::Move { .. } => 5.0,
            ActionKind::Emote { .. } => 2.0,
            ActionKind::Interact { .. } => 3.0,
            ActionKind::Wait { .. } => 0.5,
            ActionKind::Custom { .. } => 1.0,
        }
    }
}

/// An action chosen by an actor in response to something.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    #[serde(default)]
    pub reasoning: String,
    /// Who or what the action is aimed at.
    #[serde(default)]
    pub target: Option<String>,
    /// Environment keys this action changes (e.g. `weather`, or any world property).
    #[serde(default)]
    pub environment_changes: Map<String, Value>,
}

impl Action {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            reasoning: String::new(),
            target: None,
            environment_changes: Map::new(),
        }
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_environment_change(mut self, key: impl Into<String>, value: Value) -> Self {
        self.environment_changes.insert(key.into(), value);
        self
    }

    pub fn speak(message: impl Into<String>) -> Self {
        Self::new(ActionKind::Speak {
            message: message.into(),
            tone: Tone::default(),
        })
    }

    pub fn emote(emotion: impl Into<String>) -> Self {
        Self::new(ActionKind::Emote {
            emotion: emotion.into(),
            intensity: default_intensity(),
        })
    }

    pub fn move_to(destination: LocationId) -> Self {
        Self::new(ActionKind::Move {
            destination,
            movement: MovementType::default(),
            reason: String::new(),
        })
    }

    pub fn wait() -> Self {
        Self::new(ActionKind::Wait {
            duration_secs: default_wait_secs(),
            reason: String::new(),
        })
    }

    /// Check the payload against the action's rules.
    pub fn validate(&self) -> Result<(), WorldError> {
        let invalid = |reason: &str| {
            Err(WorldError::InvalidAction {
                action: self.kind.label().to_string(),
                reason: reason.to_string(),
            })
        };

        match &self.kind {
            ActionKind::Speak { message, .. } => {
                if message.trim().is_empty() {
                    return invalid("message is empty");
                }
                if message.chars().count() > MAX_SPEECH_LEN {
                    return invalid("message is too long");
                }
            }
            ActionKind::Emote {
                emotion,
                intensity,
            } => {
                if emotion.trim().is_empty() {
                    return invalid("emotion is empty");
                }
                if !(1..=10).contains(intensity) {
                    return invalid("intensity must be between 1 and 10");
                }
            }
            ActionKind::Wait { duration_secs, .. } => {
                if !(0.1..=10.0).contains(duration_secs) {
                    return invalid("duration must be between 0.1 and 10 seconds");
                }
            }
            ActionKind::Custom { name, .. } => {
                if name.trim().is_empty() {
                    return invalid("custom action has no name");
                }
            }
            ActionKind::Move { .. } | ActionKind::Interact { .. } => {}
        }
        Ok(())
    }

    /// The change this action makes to the acting actor.
    pub fn state_delta(&self) -> StateDelta {
        let mut delta = StateDelta {
            energy_change: Some(-self.kind.energy_cost()),
            ..Default::default()
        };

        match &self.kind {
            ActionKind::Move { destination, .. } => {
                delta.activity = Some("moving".to_string());
                delta.location = Some(destination.clone());
            }
            ActionKind::Speak { .. } => {
                delta.activity = Some("talking".to_string());
            }
            ActionKind::Emote { emotion, .. } => {
                delta.mood = Some(emotion.clone());
            }
            ActionKind::Interact { .. } | ActionKind::Wait { .. } | ActionKind::Custom { .. } => {
                delta.activity = Some(self.kind.label().to_string());
            }
        }

        delta
    }

    /// Human-readable line describing the action.
    pub fn describe(&self, actor_name: &str) -> String {
        match &self.kind {
            ActionKind::Speak { message, tone } => match tone {
                Tone::Neutral => format!("{} says: \"{}\"", actor_name, message),
                other => format!(
                    "{} says ({}): \"{}\"",
                    actor_name,
                    tone_label(*other),
                    message
                ),
            },
            ActionKind::Move {
                destination,
                reason,
                ..
            } => {
                if reason.is_empty() {
                    format!("{} heads to {}", actor_name, destination)
                } else {
                    format!("{} heads to {} {}", actor_name, destination, reason)
                }
            }
            ActionKind::Emote { emotion, .. } => format!("{} looks {}", actor_name, emotion),
            ActionKind::Interact { interaction, item } => match item {
                Some(item) => format!("{} {}s the {}", actor_name, interaction, item),
                None => format!("{} {}s", actor_name, interaction),
            },
            ActionKind::Wait { .. } => format!("{} pauses", actor_name),
            ActionKind::Custom { name, .. } => format!("{} performs {}", actor_name, name),
        }
    }

    /// Payload fields as a flat property map, for recording on events.
    pub fn properties(&self) -> Map<String, Value> {
        match serde_json::to_value(&self.kind) {
            Ok(Value::Object(mut map)) => {
                map.remove("type");
                map
            }
            _ => Map::new(),
        }
    }
}

fn tone_label(tone: Tone) -> &'static str {
    match tone {
        Tone::Neutral => "neutral",
        Tone::Friendly => "friendly",
        Tone::Angry => "angry",
        Tone::Excited => "excited",
        Tone::Sad => "sad",
        Tone::Mysterious => "mysterious",
        Tone::Formal => "formal",
        Tone::Casual => "casual",
    }
}
