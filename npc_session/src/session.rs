//! The session orchestrator.
//!
//! A [`Session`] owns one world: its environment store, its actor roster and
//! the background tasks that keep it moving. All mutation goes through a
//! single lock on [`SessionState`], which is never held while waiting on the
//! decision backend.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use game_rules::{
    Action, ActorId, ActorRecord, ActorSnapshot, EnvironmentContext, EnvironmentSnapshot,
    EnvironmentStateStore, EventId, EventKind, GameClock, GameEvent, LocationId, WorldError,
    PLAYER_INITIATOR, SYSTEM_INITIATOR,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::{ActorConfig, SessionConfig, SessionSettings};
use crate::decision::{self, DecisionClient};
use crate::error::SessionError;
use crate::resolver::resolve;
use crate::response::{ActorResponse, EventRequest, EventResponse, ResponseTracker};
use crate::scheduler;
use crate::supervisor::TaskSupervisor;
use crate::worker::{self, BackgroundJob};

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Initializing,
    Starting,
    Active,
    Stopping,
    Stopped,
}

impl SessionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SessionStatus::Initializing => "initializing",
            SessionStatus::Starting => "starting",
            SessionStatus::Active => "active",
            SessionStatus::Stopping => "stopping",
            SessionStatus::Stopped => "stopped",
        }
    }

    pub fn accepts_events(&self) -> bool {
        !matches!(self, SessionStatus::Stopping | SessionStatus::Stopped)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: String,
    pub title: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    /// Events accepted through `submit_event`.
    pub total_events_processed: u64,
}

impl SessionInfo {
    fn touch(&mut self) {
        self.last_activity_at = Utc::now();
    }
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub info: SessionInfo,
    pub actor_count: usize,
    /// Responses still waiting on background reactions.
    pub pending_responses: usize,
    pub environment: EnvironmentSnapshot,
}

/// Everything guarded by the session lock.
pub(crate) struct SessionState {
    pub info: SessionInfo,
    pub env: EnvironmentStateStore,
    pub actors: BTreeMap<ActorId, ActorRecord>,
}

impl SessionState {
    fn event_kind_for(&self, initiator: &str) -> EventKind {
        match initiator {
            PLAYER_INITIATOR => EventKind::PlayerAction,
            SYSTEM_INITIATOR => EventKind::SystemEvent,
            other if self.actors.contains_key(&ActorId::new(other)) => EventKind::ActorAction,
            _ => EventKind::Interaction,
        }
    }

    /// What `actor` knows about itself and its surroundings.
    pub fn perception(&self, actor: &ActorId) -> Option<(ActorSnapshot, EnvironmentContext)> {
        let record = self.actors.get(actor)?;
        let context = self
            .env
            .environment_context(Some(&record.state.current_location));
        Some((record.snapshot(), context))
    }

    /// Apply an actor's chosen actions to the actor and the world.
    ///
    /// Moves go through the environment store so placement stays consistent;
    /// a rejected move leaves the actor where it was and marks the reaction
    /// unsuccessful. Returns `None` if the actor is no longer in the session.
    pub fn apply_reaction(
        &mut self,
        actor_id: &ActorId,
        actions: Vec<Action>,
    ) -> Option<ActorResponse> {
        let SessionState { info, env, actors } = self;
        let actor = actors.get_mut(actor_id)?;
        let mut success = true;
        let mut lines = Vec::with_capacity(actions.len());

        for action in &actions {
            let mut delta = action.state_delta();
            if let Some(destination) = delta.location.take() {
                let from = actor.state.current_location.clone();
                if from != destination {
                    match env.move_actor(actor_id, &from, &destination) {
                        Ok(_) => delta.location = Some(destination),
                        Err(err) => {
                            tracing::warn!(actor_id = %actor_id, error = %err, "move rejected");
                            delta.activity = None;
                            success = false;
                        }
                    }
                }
            }
            actor.apply(&delta);

            if !action.environment_changes.is_empty() {
                if let Err(err) = env.apply_environment_changes(&action.environment_changes) {
                    tracing::warn!(
                        actor_id = %actor_id,
                        error = %err,
                        "environment change rejected"
                    );
                    success = false;
                }
            }
            lines.push(action.describe(&actor.name));
        }
        info.touch();

        let mut actions = actions.into_iter();
        let action = actions.next()?;
        Some(ActorResponse {
            actor_id: actor_id.clone(),
            reasoning: action.reasoning.clone(),
            action,
            follow_up: actions.collect(),
            message: lines.join(" "),
            success,
            mood: actor.state.mood.clone(),
        })
    }
}

/// State shared between the session handle and its background tasks.
pub(crate) struct SessionShared {
    pub id: String,
    pub settings: SessionSettings,
    pub state: Mutex<SessionState>,
    pub decisions: Arc<dyn DecisionClient>,
    pub responses: ResponseTracker,
}

struct Lifecycle {
    jobs: Option<mpsc::UnboundedReceiver<BackgroundJob>>,
    supervisor: Option<TaskSupervisor>,
}

/// One running game session.
pub struct Session {
    shared: Arc<SessionShared>,
    jobs: mpsc::UnboundedSender<BackgroundJob>,
    lifecycle: Mutex<Lifecycle>,
}

impl Session {
    /// Build a session from its config. Nothing runs until [`Session::start`].
    pub fn new(
        config: SessionConfig,
        decisions: Arc<dyn DecisionClient>,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        let SessionConfig {
            session_id,
            title,
            settings,
            environment,
            actors,
        } = config;
        let id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut env = EnvironmentStateStore::new(settings.event_log_capacity)
            .with_weather(environment.weather)
            .with_clock(GameClock::starting_at(environment.start_game_minutes))
            .with_world_properties(environment.world_properties);
        for location in environment.locations {
            env.add_location(location)?;
        }

        let mut roster = BTreeMap::new();
        for actor in &actors {
            env.place_actor(actor.id.clone(), &actor.location)?;
            roster.insert(actor.id.clone(), actor.to_record());
        }

        let now = Utc::now();
        let info = SessionInfo {
            id: id.clone(),
            title,
            status: SessionStatus::Initializing,
            created_at: now,
            last_activity_at: now,
            total_events_processed: 0,
        };

        tracing::info!(session_id = %id, actors = roster.len(), "session created");

        let (jobs, jobs_rx) = mpsc::unbounded_channel();
        let shared = SessionShared {
            id,
            responses: ResponseTracker::new(settings.response_retention),
            settings,
            state: Mutex::new(SessionState {
                info,
                env,
                actors: roster,
            }),
            decisions,
        };

        Ok(Self {
            shared: Arc::new(shared),
            jobs,
            lifecycle: Mutex::new(Lifecycle {
                jobs: Some(jobs_rx),
                supervisor: None,
            }),
        })
    }

    pub fn id(&self) -> &str {
        &self.shared.id
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.shared.settings
    }

    async fn transition(&self, from: SessionStatus, to: SessionStatus) -> Result<(), SessionError> {
        let mut state = self.shared.state.lock().await;
        let current = state.info.status;
        if current != from {
            return Err(SessionError::InvalidLifecycleTransition { from: current, to });
        }
        state.info.status = to;
        state.info.touch();
        tracing::info!(
            session_id = %self.shared.id,
            from = %from,
            to = %to,
            "session status changed"
        );
        Ok(())
    }

    /// Start the background worker and the periodic loops.
    pub async fn start(&self) -> Result<(), SessionError> {
        let mut lifecycle = self.lifecycle.lock().await;
        self.transition(SessionStatus::Initializing, SessionStatus::Starting).await?;

        let Some(jobs) = lifecycle.jobs.take() else {
            return Err(SessionError::InvalidLifecycleTransition {
                from: SessionStatus::Starting,
                to: SessionStatus::Active,
            });
        };

        let mut supervisor = TaskSupervisor::new();
        let shared = &self.shared;
        let token = supervisor.token();
        supervisor.spawn("background_worker", worker::run(shared.clone(), jobs, token.clone()));
        if shared.settings.autonomy_enabled {
            supervisor.spawn("autonomy", scheduler::run_autonomy(shared.clone(), token.clone()));
        }
        supervisor.spawn("environment_clock", scheduler::run_clock(shared.clone(), token.clone()));
        supervisor.spawn("maintenance", scheduler::run_maintenance(shared.clone(), token));
        lifecycle.supervisor = Some(supervisor);

        self.transition(SessionStatus::Starting, SessionStatus::Active).await
    }

    /// Stop background work. Queued jobs are dropped and their responses
    /// completed with an error note.
    pub async fn stop(&self) -> Result<(), SessionError> {
        let mut lifecycle = self.lifecycle.lock().await;
        self.transition(SessionStatus::Active, SessionStatus::Stopping).await?;

        if let Some(supervisor) = lifecycle.supervisor.take() {
            let aborted = supervisor.shutdown(self.shared.settings.shutdown_grace()).await;
            if aborted > 0 {
                tracing::warn!(
                    session_id = %self.shared.id,
                    aborted,
                    "background tasks aborted on shutdown"
                );
            }
        }

        let dropped = self
            .shared
            .responses
            .abandon_pending("session stopped before background reactions finished");
        if dropped > 0 {
            tracing::info!(session_id = %self.shared.id, dropped, "dropped queued background work");
        }

        self.transition(SessionStatus::Stopping, SessionStatus::Stopped).await
    }

    /// Log an event, get the primary actor's reaction, and queue the rest.
    pub async fn submit_event(&self, request: EventRequest) -> Result<EventResponse, SessionError> {
        let (event, affected, perception) = {
            let mut state = self.shared.state.lock().await;
            let status = state.info.status;
            if !status.accepts_events() {
                return Err(SessionError::SessionNotAccepting(status));
            }
            if !state.env.has_location(&request.location) {
                return Err(WorldError::UnknownLocation(request.location).into());
            }

            let kind = state.event_kind_for(&request.initiator);
            let event = request.into_event(kind);
            state.env.append_event(event.clone());
            if let Err(err) = state.env.apply_event_effects(&event) {
                tracing::warn!(
                    event_id = %event.id,
                    error = %err,
                    "event environment change rejected"
                );
            }
            state.info.total_events_processed += 1;
            state.info.touch();

            let affected = resolve(&event, &state.env, &state.actors);
            let perception = affected.first().and_then(|primary| state.perception(primary));
            (event, affected, perception)
        };

        tracing::debug!(
            session_id = %self.shared.id,
            event_id = %event.id,
            action = %event.action,
            affected = affected.len(),
            "event routed"
        );

        let mut response = EventResponse::pending(event.id.clone(), self.shared.id.clone());
        let Some((actor, context)) = perception else {
            response.completed = true;
            return Ok(self.track(response));
        };

        let reaction = match decision::request_reaction(
            self.shared.decisions.as_ref(),
            &actor,
            &event,
            &context,
            self.shared.settings.decision_timeout(),
        )
        .await
        {
            Ok(actions) => self.shared.state.lock().await.apply_reaction(&actor.id, actions),
            Err(err) => {
                tracing::warn!(
                    event_id = %event.id,
                    actor_id = %actor.id,
                    error = %err,
                    "primary reaction failed"
                );
                response.error = Some(format!("{} could not react: {}", actor.id, err));
                response.completed = true;
                return Ok(self.track(response));
            }
        };

        let Some(reaction) = reaction else {
            response.error = Some(format!("{} left the session before reacting", actor.id));
            response.completed = true;
            return Ok(self.track(response));
        };

        response.immediate_message = Some(reaction.message.clone());
        response.primary_response = Some(reaction.clone());
        if affected.len() == 1 {
            response.all_responses = vec![reaction];
            response.completed = true;
            return Ok(self.track(response));
        }

        let response = self.track(response);
        let job = BackgroundJob {
            event,
            affected,
            primary: actor.id,
            primary_response: reaction,
            enqueued_at: Instant::now(),
        };
        // Enqueue under the state lock so a job is never sent once `stop`
        // has moved the session to Stopping.
        let queued = {
            let state = self.shared.state.lock().await;
            state.info.status.accepts_events() && self.jobs.send(job).is_ok()
        };
        if !queued {
            let note = "session stopped before background reactions ran";
            self.shared
                .responses
                .finalize(&response.event_id, |r| r.error = Some(note.to_string()));
            return Ok(self.shared.responses.get(&response.event_id).unwrap_or(response));
        }
        Ok(response)
    }

    fn track(&self, response: EventResponse) -> EventResponse {
        self.shared.responses.track(response.clone());
        response
    }

    /// Latest state of a recent response.
    pub fn response(&self, event_id: &EventId) -> Option<EventResponse> {
        self.shared.responses.get(event_id)
    }

    /// Wait until the response completes or `limit` passes, whichever is
    /// first, and return its latest state.
    pub async fn wait_for_completion(
        &self,
        event_id: &EventId,
        limit: Duration,
    ) -> Option<EventResponse> {
        let mut rx = self.shared.responses.subscribe(event_id)?;
        let finished = tokio::time::timeout(limit, async {
            rx.wait_for(|r| r.completed).await.map(|r| (*r).clone())
        })
        .await;
        match finished {
            Ok(Ok(response)) => Some(response),
            _ => Some(rx.borrow().clone()),
        }
    }

    pub async fn status(&self) -> SessionSnapshot {
        let state = self.shared.state.lock().await;
        SessionSnapshot {
            info: state.info.clone(),
            actor_count: state.actors.len(),
            pending_responses: self.shared.responses.pending_count(),
            environment: state.env.snapshot(),
        }
    }

    pub async fn get_actor(&self, id: &ActorId) -> Option<ActorSnapshot> {
        self.shared.state.lock().await.actors.get(id).map(ActorRecord::snapshot)
    }

    /// All actors in id order.
    pub async fn actors(&self) -> Vec<ActorSnapshot> {
        self.shared
            .state
            .lock()
            .await
            .actors
            .values()
            .map(ActorRecord::snapshot)
            .collect()
    }

    /// Bring a new actor into a live session.
    pub async fn add_actor(&self, actor: ActorConfig) -> Result<ActorSnapshot, SessionError> {
        let mut state = self.shared.state.lock().await;
        if state.actors.contains_key(&actor.id) {
            return Err(SessionError::DuplicateActor(actor.id));
        }
        state.env.place_actor(actor.id.clone(), &actor.location)?;
        let record = actor.to_record();
        let snapshot = record.snapshot();
        state.actors.insert(actor.id, record);
        state.info.touch();
        Ok(snapshot)
    }

    pub async fn remove_actor(&self, id: &ActorId) -> Result<ActorSnapshot, SessionError> {
        let mut state = self.shared.state.lock().await;
        let record = state
            .actors
            .remove(id)
            .ok_or_else(|| WorldError::UnknownActor(id.clone()))?;
        state.env.remove_actor(id);
        state.info.touch();
        Ok(record.snapshot())
    }

    /// The most recent `limit` events, oldest first.
    pub async fn recent_events(&self, limit: usize) -> Vec<GameEvent> {
        let state = self.shared.state.lock().await;
        state.env.recent_events(limit).into_iter().cloned().collect()
    }

    pub async fn events_involving(&self, actor: &ActorId, limit: usize) -> Vec<GameEvent> {
        let state = self.shared.state.lock().await;
        state.env.events_involving(actor, limit).into_iter().cloned().collect()
    }

    pub async fn events_at_location(&self, location: &LocationId, limit: usize) -> Vec<GameEvent> {
        let state = self.shared.state.lock().await;
        state.env.events_at_location(location, limit).into_iter().cloned().collect()
    }

    pub async fn nearby_actors(&self, actor: &ActorId) -> Vec<ActorId> {
        self.shared.state.lock().await.env.nearby_actors(actor)
    }

    pub async fn environment_context(&self, location: Option<&LocationId>) -> EnvironmentContext {
        self.shared.state.lock().await.env.environment_context(location)
    }

    pub async fn trigger_global_event(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        properties: Map<String, Value>,
    ) -> EventId {
        let mut state = self.shared.state.lock().await;
        state.info.touch();
        state.env.trigger_global_event(name, description, properties)
    }

    pub async fn end_global_event(&self, name: &str) -> Option<EventId> {
        self.shared.state.lock().await.env.end_global_event(name)
    }

    pub async fn set_global_flag(&self, name: impl Into<String>, value: bool) {
        self.shared.state.lock().await.env.set_global_flag(name, value);
    }

    pub async fn global_flag(&self, name: &str) -> bool {
        self.shared.state.lock().await.env.global_flag(name)
    }

    pub async fn set_global_variable(&self, name: impl Into<String>, value: Value) {
        self.shared.state.lock().await.env.set_global_variable(name, value);
    }

    pub async fn global_variable(&self, name: &str) -> Option<Value> {
        self.shared.state.lock().await.env.global_variable(name).cloned()
    }

    /// Run one autonomous-behaviour pass now, outside the timer.
    /// Returns how many actors acted.
    pub async fn run_autonomy_tick(&self) -> usize {
        scheduler::autonomy_tick(&self.shared).await
    }
}
