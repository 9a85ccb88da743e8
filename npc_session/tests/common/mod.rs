#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use game_rules::{
    Action, ActorId, ActorSnapshot, EnvironmentContext, GameEvent, Location, LocationType,
};
use npc_session::{
    ActorConfig, Decision, DecisionClient, DecisionError, SessionConfig, SessionSettings,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("npc_session=debug,game_rules=info")
        .with_test_writer()
        .try_init();
}

#[derive(Clone)]
enum Reply {
    Decide(Decision),
    Fail(String),
}

#[derive(Clone)]
struct Script {
    reply: Reply,
    delay: Duration,
}

/// Decision backend with per-actor canned answers.
///
/// Unscripted actors nod in reaction and wait when asked for initiative.
#[derive(Default)]
pub struct ScriptedClient {
    reactions: HashMap<ActorId, Script>,
    initiatives: HashMap<ActorId, Script>,
    calls: Mutex<Vec<(ActorId, String)>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn react(mut self, actor: &str, action: Action) -> Self {
        self.reactions.insert(
            ActorId::new(actor),
            Script {
                reply: Reply::Decide(action.into()),
                delay: Duration::ZERO,
            },
        );
        self
    }

    pub fn react_after(mut self, actor: &str, delay: Duration, action: Action) -> Self {
        self.reactions.insert(
            ActorId::new(actor),
            Script {
                reply: Reply::Decide(action.into()),
                delay,
            },
        );
        self
    }

    pub fn fail(mut self, actor: &str, message: &str) -> Self {
        self.reactions.insert(
            ActorId::new(actor),
            Script {
                reply: Reply::Fail(message.to_string()),
                delay: Duration::ZERO,
            },
        );
        self
    }

    pub fn initiative(mut self, actor: &str, action: Action) -> Self {
        self.initiatives.insert(
            ActorId::new(actor),
            Script {
                reply: Reply::Decide(action.into()),
                delay: Duration::ZERO,
            },
        );
        self
    }

    /// Every call so far as `(actor, "decide" | "deliberate")`.
    pub fn calls(&self) -> Vec<(ActorId, String)> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn record(&self, actor: &ActorId, kind: &str) {
        self.calls
            .lock()
            .expect("calls lock")
            .push((actor.clone(), kind.to_string()));
    }

    async fn play(script: Option<Script>, fallback: Decision) -> Result<Decision, DecisionError> {
        let Some(script) = script else {
            return Ok(fallback);
        };
        if !script.delay.is_zero() {
            tokio::time::sleep(script.delay).await;
        }
        match script.reply {
            Reply::Decide(decision) => Ok(decision),
            Reply::Fail(message) => Err(DecisionError::Backend(message)),
        }
    }
}

#[async_trait]
impl DecisionClient for ScriptedClient {
    async fn decide(
        &self,
        actor: &ActorSnapshot,
        _event: &GameEvent,
        _context: &EnvironmentContext,
    ) -> Result<Decision, DecisionError> {
        self.record(&actor.id, "decide");
        let fallback = Action::emote("attentive").with_reasoning("nothing scripted").into();
        Self::play(self.reactions.get(&actor.id).cloned(), fallback).await
    }

    async fn deliberate(
        &self,
        actor: &ActorSnapshot,
        _context: &EnvironmentContext,
    ) -> Result<Decision, DecisionError> {
        self.record(&actor.id, "deliberate");
        Self::play(self.initiatives.get(&actor.id).cloned(), Action::wait().into()).await
    }
}

/// Square in the middle, forge and tavern on either side of it.
///
/// The forge lists no connections of its own; the square points at it.
pub fn village(actors: &[(&str, &str)]) -> SessionConfig {
    let settings = SessionSettings {
        autonomy_enabled: false,
        ..SessionSettings::default()
    };
    let mut config = SessionConfig {
        settings,
        ..SessionConfig::default()
    }
    .with_session_id("village")
    .with_location(
        Location::new("square", "Town Square", LocationType::Outdoor).connected_to("forge"),
    )
    .with_location(Location::new("forge", "Blacksmith Forge", LocationType::Building))
    .with_location(
        Location::new("tavern", "The Prancing Pony", LocationType::Building)
            .connected_to("square"),
    );

    for (id, location) in actors {
        config = config.with_actor(ActorConfig::new(*id, id.to_uppercase(), *location));
    }
    config
}
