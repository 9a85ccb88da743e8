//! Decision backend interface.
//!
//! How a reaction is computed (prompting, model choice, memory) is entirely
//! the backend's business. The session only asks and applies the answer.

use std::time::Duration;

use async_trait::async_trait;
use game_rules::{Action, ActorSnapshot, EnvironmentContext, GameEvent};
use serde::{Deserialize, Serialize};

use crate::error::DecisionError;

/// What an actor decided to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Decision {
    Act(Action),
    Sequence(Vec<Action>),
}

impl Decision {
    pub fn into_actions(self) -> Vec<Action> {
        match self {
            Decision::Act(action) => vec![action],
            Decision::Sequence(actions) => actions,
        }
    }

    /// True when every action is a wait (or there are none).
    pub fn is_idle(&self) -> bool {
        match self {
            Decision::Act(action) => action.kind.is_idle(),
            Decision::Sequence(actions) => actions.iter().all(|a| a.kind.is_idle()),
        }
    }
}

impl From<Action> for Decision {
    fn from(action: Action) -> Self {
        Decision::Act(action)
    }
}

/// Produces reactions for actors. Failures are treated as "no action".
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DecisionClient: Send + Sync {
    /// React to an event the actor was affected by.
    async fn decide(
        &self,
        actor: &ActorSnapshot,
        event: &GameEvent,
        context: &EnvironmentContext,
    ) -> Result<Decision, DecisionError>;

    /// Decide on a proactive action with no triggering event.
    async fn deliberate(
        &self,
        actor: &ActorSnapshot,
        context: &EnvironmentContext,
    ) -> Result<Decision, DecisionError>;
}

/// Ask for a reaction within `limit`, rejecting empty or invalid answers.
pub(crate) async fn request_reaction(
    client: &dyn DecisionClient,
    actor: &ActorSnapshot,
    event: &GameEvent,
    context: &EnvironmentContext,
    limit: Duration,
) -> Result<Vec<Action>, DecisionError> {
    let decision = tokio::time::timeout(limit, client.decide(actor, event, context))
        .await
        .map_err(|_| DecisionError::Timeout(limit))??;
    checked(decision)
}

/// Ask for a proactive action within `limit`.
pub(crate) async fn request_initiative(
    client: &dyn DecisionClient,
    actor: &ActorSnapshot,
    context: &EnvironmentContext,
    limit: Duration,
) -> Result<Vec<Action>, DecisionError> {
    let decision = tokio::time::timeout(limit, client.deliberate(actor, context))
        .await
        .map_err(|_| DecisionError::Timeout(limit))??;
    checked(decision)
}

fn checked(decision: Decision) -> Result<Vec<Action>, DecisionError> {
    let actions = decision.into_actions();
    if actions.is_empty() {
        return Err(DecisionError::Empty);
    }
    for action in &actions {
        action.validate()?;
    }
    Ok(actions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_rules::{ActorRecord, EnvironmentStateStore, EventKind, LocationId};

    fn fixtures() -> (ActorSnapshot, GameEvent, EnvironmentContext) {
        let actor = ActorRecord::new("marcus", "Marcus", LocationId::new("forge")).snapshot();
        let event = GameEvent::new(EventKind::PlayerAction, "player", "greet", "forge");
        let context = EnvironmentStateStore::default().environment_context(None);
        (actor, event, context)
    }

    #[tokio::test]
    async fn test_request_reaction_rejects_empty_sequence() {
        let mut client = MockDecisionClient::new();
        client
            .expect_decide()
            .returning(|_, _, _| Ok(Decision::Sequence(Vec::new())));

        let (actor, event, context) = fixtures();
        let result =
            request_reaction(&client, &actor, &event, &context, Duration::from_secs(1)).await;
        assert_eq!(result, Err(DecisionError::Empty));
    }

    #[tokio::test]
    async fn test_request_reaction_rejects_invalid_action() {
        let mut client = MockDecisionClient::new();
        client
            .expect_decide()
            .returning(|_, _, _| Ok(Decision::Act(Action::speak(""))));

        let (actor, event, context) = fixtures();
        let result =
            request_reaction(&client, &actor, &event, &context, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(DecisionError::InvalidAction(_))));
    }

    #[tokio::test]
    async fn test_request_initiative_passes_backend_error_through() {
        let mut client = MockDecisionClient::new();
        client
            .expect_deliberate()
            .times(1)
            .returning(|_, _| Err(DecisionError::Backend("model offline".into())));

        let (actor, _, context) = fixtures();
        let result = request_initiative(&client, &actor, &context, Duration::from_secs(1)).await;
        assert_eq!(result, Err(DecisionError::Backend("model offline".into())));
    }

    #[test]
    fn test_idle_decisions() {
        assert!(Decision::Act(Action::wait()).is_idle());
        assert!(!Decision::Sequence(vec![Action::wait(), Action::speak("hm")]).is_idle());
        assert_eq!(Decision::from(Action::wait()).into_actions().len(), 1);
    }
}
