//! Explicit ownership of live sessions.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::config::SessionConfig;
use crate::decision::DecisionClient;
use crate::error::SessionError;
use crate::session::{Session, SessionSnapshot, SessionStatus};

/// All sessions served by one process, sharing a decision backend.
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<Session>>,
    decisions: Arc<dyn DecisionClient>,
}

impl SessionRegistry {
    pub fn new(decisions: Arc<dyn DecisionClient>) -> Self {
        Self {
            sessions: DashMap::new(),
            decisions,
        }
    }

    /// Build, register and start a session.
    pub async fn create(&self, config: SessionConfig) -> Result<Arc<Session>, SessionError> {
        let session = Arc::new(Session::new(config, self.decisions.clone())?);
        let id = session.id().to_string();

        match self.sessions.entry(id.clone()) {
            Entry::Occupied(_) => return Err(SessionError::DuplicateSession(id)),
            Entry::Vacant(slot) => {
                slot.insert(session.clone());
            }
        }

        if let Err(err) = session.start().await {
            self.sessions.remove(&id);
            return Err(err);
        }
        tracing::info!(session_id = %id, "session registered");
        Ok(session)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    /// Remove a session, stopping it first if it is running.
    /// Returns false if no such session existed.
    pub async fn delete(&self, id: &str) -> Result<bool, SessionError> {
        let Some((_, session)) = self.sessions.remove(id) else {
            return Ok(false);
        };
        if session.status().await.info.status == SessionStatus::Active {
            session.stop().await?;
        }
        tracing::info!(session_id = %id, "session removed");
        Ok(true)
    }

    /// Snapshots of every session, ordered by id.
    pub async fn list(&self) -> Vec<SessionSnapshot> {
        let sessions: Vec<Arc<Session>> = self
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        let mut snapshots = Vec::with_capacity(sessions.len());
        for session in sessions {
            snapshots.push(session.status().await);
        }
        snapshots.sort_by(|a, b| a.info.id.cmp(&b.info.id));
        snapshots
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
