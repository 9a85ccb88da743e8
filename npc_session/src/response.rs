//! Inbound event requests, outbound responses and completion tracking.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use game_rules::{Action, ActorId, EventId, EventKind, GameEvent, LocationId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::watch;

/// Something a caller wants to happen in the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRequest {
    /// Generated when absent.
    #[serde(default)]
    pub event_id: Option<EventId>,
    pub initiator: String,
    pub action: String,
    #[serde(default)]
    pub target: Option<String>,
    pub location: LocationId,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub environment_changes: Map<String, Value>,
    #[serde(default = "default_priority")]
    pub priority: u8,
}

fn default_priority() -> u8 {
    5
}

impl EventRequest {
    pub fn new(
        initiator: impl Into<String>,
        action: impl Into<String>,
        location: impl Into<LocationId>,
    ) -> Self {
        Self {
            event_id: None,
            initiator: initiator.into(),
            action: action.into(),
            target: None,
            location: location.into(),
            description: None,
            properties: Map::new(),
            environment_changes: Map::new(),
            priority: default_priority(),
        }
    }

    pub fn with_event_id(mut self, id: impl Into<EventId>) -> Self {
        self.event_id = Some(id.into());
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn with_environment_change(mut self, key: impl Into<String>, value: Value) -> Self {
        self.environment_changes.insert(key.into(), value);
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub(crate) fn into_event(self, kind: EventKind) -> GameEvent {
        let mut event = GameEvent::new(kind, self.initiator, self.action, self.location)
            .with_id(self.event_id.unwrap_or_default())
            .with_properties(self.properties)
            .with_environment_changes(self.environment_changes)
            .with_priority(self.priority);
        if let Some(target) = self.target {
            event = event.with_target(target);
        }
        if let Some(description) = self.description {
            event = event.with_description(description);
        }
        event
    }
}

/// One actor's reaction to an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorResponse {
    pub actor_id: ActorId,
    /// The first action; any follow-ups are in `follow_up`.
    pub action: Action,
    #[serde(default)]
    pub follow_up: Vec<Action>,
    /// Human-readable line describing what the actor did.
    pub message: String,
    /// False when some part of the reaction could not be applied to the world.
    pub success: bool,
    pub reasoning: String,
    /// Mood after the reaction was applied.
    pub mood: String,
}

/// The outcome of a submitted event.
///
/// `completed` and `error` are independent: a completed response may carry an
/// error note, and an incomplete one never does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventResponse {
    pub event_id: EventId,
    pub session_id: String,
    pub primary_response: Option<ActorResponse>,
    pub immediate_message: Option<String>,
    pub all_responses: Vec<ActorResponse>,
    pub completed: bool,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl EventResponse {
    pub(crate) fn pending(event_id: EventId, session_id: impl Into<String>) -> Self {
        Self {
            event_id,
            session_id: session_id.into(),
            primary_response: None,
            immediate_message: None,
            all_responses: Vec::new(),
            completed: false,
            error: None,
            timestamp: Utc::now(),
        }
    }
}

struct Tracked {
    seq: u64,
    tx: watch::Sender<EventResponse>,
}

/// Latest state of every recent response, with change notification.
///
/// Completed responses beyond the retention limit are forgotten oldest first.
/// Pending responses are never evicted.
pub(crate) struct ResponseTracker {
    entries: DashMap<EventId, Tracked>,
    next_seq: AtomicU64,
    retention: usize,
}

impl ResponseTracker {
    pub fn new(retention: usize) -> Self {
        Self {
            entries: DashMap::new(),
            next_seq: AtomicU64::new(0),
            retention: retention.max(1),
        }
    }

    pub fn track(&self, response: EventResponse) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let (tx, _) = watch::channel(response.clone());
        self.entries.insert(response.event_id, Tracked { seq, tx });
        self.evict();
    }

    fn evict(&self) {
        while self.entries.len() > self.retention {
            let oldest = self
                .entries
                .iter()
                .filter(|entry| entry.tx.borrow().completed)
                .min_by_key(|entry| entry.seq)
                .map(|entry| entry.key().clone());
            match oldest {
                Some(id) => {
                    self.entries.remove(&id);
                }
                None => break,
            }
        }
    }

    pub fn get(&self, id: &EventId) -> Option<EventResponse> {
        self.entries.get(id).map(|entry| entry.tx.borrow().clone())
    }

    pub fn subscribe(&self, id: &EventId) -> Option<watch::Receiver<EventResponse>> {
        self.entries.get(id).map(|entry| entry.tx.subscribe())
    }

    /// Apply `finish` and mark the response completed. A response is
    /// finalised at most once; later calls return false and change nothing.
    pub fn finalize<F>(&self, id: &EventId, finish: F) -> bool
    where
        F: FnOnce(&mut EventResponse),
    {
        let Some(entry) = self.entries.get(id) else {
            return false;
        };
        entry.tx.send_if_modified(|response| {
            if response.completed {
                return false;
            }
            finish(response);
            response.completed = true;
            response.timestamp = Utc::now();
            true
        })
    }

    /// Complete every pending response with `reason` as the error.
    pub fn abandon_pending(&self, reason: &str) -> usize {
        let pending: Vec<EventId> = self
            .entries
            .iter()
            .filter(|entry| !entry.tx.borrow().completed)
            .map(|entry| entry.key().clone())
            .collect();

        pending
            .iter()
            .filter(|id| {
                self.finalize(id, |response| {
                    response.error = Some(reason.to_string());
                })
            })
            .count()
    }

    pub fn pending_count(&self) -> usize {
        self.entries.iter().filter(|entry| !entry.tx.borrow().completed).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(id: &str) -> EventResponse {
        EventResponse::pending(EventId::from(id), "s1")
    }

    #[test]
    fn test_request_builds_event() {
        let event = EventRequest::new("player", "greet", "square")
            .with_event_id("e-1")
            .with_target("marcus")
            .with_priority(42)
            .into_event(EventKind::PlayerAction);

        assert_eq!(event.id.as_str(), "e-1");
        assert_eq!(event.target.as_deref(), Some("marcus"));
        assert_eq!(event.description, "player greet");
        assert_eq!(event.priority, 10);
    }

    #[test]
    fn test_finalize_only_once() {
        let tracker = ResponseTracker::new(8);
        tracker.track(pending("a"));

        assert!(tracker.finalize(&EventId::from("a"), |r| r.error = Some("first".into())));
        assert!(!tracker.finalize(&EventId::from("a"), |r| r.error = Some("second".into())));

        let response = tracker.get(&EventId::from("a")).unwrap();
        assert!(response.completed);
        assert_eq!(response.error.as_deref(), Some("first"));
    }

    #[test]
    fn test_retention_evicts_oldest_completed_only() {
        let tracker = ResponseTracker::new(2);
        tracker.track(pending("a"));
        let mut done = pending("b");
        done.completed = true;
        tracker.track(done);
        let mut done = pending("c");
        done.completed = true;
        tracker.track(done);

        // "a" is pending so it survives; "b" is the oldest completed.
        assert!(tracker.get(&EventId::from("a")).is_some());
        assert!(tracker.get(&EventId::from("b")).is_none());
        assert!(tracker.get(&EventId::from("c")).is_some());
    }

    #[test]
    fn test_abandon_pending() {
        let tracker = ResponseTracker::new(8);
        tracker.track(pending("a"));
        tracker.track(pending("b"));
        tracker.finalize(&EventId::from("b"), |_| {});

        assert_eq!(tracker.abandon_pending("stopped"), 1);
        assert_eq!(tracker.pending_count(), 0);
        let a = tracker.get(&EventId::from("a")).unwrap();
        assert_eq!(a.error.as_deref(), Some("stopped"));
    }

    #[tokio::test]
    async fn test_subscribers_see_completion() {
        let tracker = ResponseTracker::new(8);
        tracker.track(pending("a"));
        let mut rx = tracker.subscribe(&EventId::from("a")).unwrap();

        tracker.finalize(&EventId::from("a"), |_| {});
        let seen = rx.wait_for(|r| r.completed).await.map(|r| (*r).clone()).unwrap();
        assert!(seen.completed);
    }
}
