//! Errors raised by session operations.

use std::path::PathBuf;
use std::time::Duration;

use game_rules::{ActorId, WorldError};
use thiserror::Error;

use crate::session::SessionStatus;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot move session from {from} to {to}")]
    InvalidLifecycleTransition { from: SessionStatus, to: SessionStatus },

    #[error("session is {0} and no longer accepts events")]
    SessionNotAccepting(SessionStatus),

    #[error("actor already in session: {0}")]
    DuplicateActor(ActorId),

    #[error("session already exists: {0}")]
    DuplicateSession(String),

    #[error(transparent)]
    World(#[from] WorldError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Why a decision backend produced no usable reaction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecisionError {
    #[error("decision backend failed: {0}")]
    Backend(String),

    #[error("decision timed out after {0:?}")]
    Timeout(Duration),

    #[error("decision contained no actions")]
    Empty,

    #[error(transparent)]
    InvalidAction(#[from] WorldError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse session config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid session config: {0}")]
    Invalid(String),
}
