//! Errors raised by world-state operations.

use thiserror::Error;

use crate::entities::ActorId;
use crate::world_state::LocationId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorldError {
    #[error("unknown location: {0}")]
    UnknownLocation(LocationId),

    #[error("unknown actor: {0}")]
    UnknownActor(ActorId),

    #[error("actor {actor} is not at location {location}")]
    ActorNotAtLocation { actor: ActorId, location: LocationId },

    #[error("duplicate location: {0}")]
    DuplicateLocation(LocationId),

    #[error("invalid {action} action: {reason}")]
    InvalidAction { action: String, reason: String },

    #[error("invalid value for environment field {field}: {reason}")]
    InvalidEnvironmentValue { field: String, reason: String },
}
