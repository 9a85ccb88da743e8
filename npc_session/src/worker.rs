//! Background fan-out of reactions for events with more than one affected actor.

use std::sync::Arc;

use futures::future::join_all;
use game_rules::{ActorId, GameEvent};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::decision::request_reaction;
use crate::response::ActorResponse;
use crate::session::SessionShared;

/// Remaining work for one event after the primary actor has reacted.
pub(crate) struct BackgroundJob {
    pub event: GameEvent,
    /// Every affected actor in resolver order, primary included.
    pub affected: Vec<ActorId>,
    pub primary: ActorId,
    pub primary_response: ActorResponse,
    pub enqueued_at: Instant,
}

/// Drain jobs one at a time until cancelled.
///
/// A job that is already running when cancellation fires is allowed to
/// finish; anything still queued is dropped with the receiver.
pub(crate) async fn run(
    shared: Arc<SessionShared>,
    mut jobs: mpsc::UnboundedReceiver<BackgroundJob>,
    cancel: CancellationToken,
) {
    tracing::info!(session_id = %shared.id, "background worker started");
    let poll = shared.settings.worker_poll();

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let job = tokio::select! {
            _ = cancel.cancelled() => break,
            next = tokio::time::timeout(poll, jobs.recv()) => match next {
                Ok(Some(job)) => job,
                Ok(None) => break,
                // Queue timeout: go round again and re-check cancellation.
                Err(_) => continue,
            },
        };

        process_job(&shared, job).await;
    }

    tracing::info!(session_id = %shared.id, "background worker stopped");
}

pub(crate) async fn process_job(shared: &SessionShared, job: BackgroundJob) {
    let BackgroundJob {
        event,
        affected,
        primary,
        primary_response,
        enqueued_at,
    } = job;
    tracing::debug!(
        session_id = %shared.id,
        event_id = %event.id,
        queued_ms = enqueued_at.elapsed().as_millis() as u64,
        "processing background job"
    );

    let requests = {
        let state = shared.state.lock().await;
        affected
            .iter()
            .filter(|id| **id != primary)
            .filter_map(|id| state.perception(id))
            .collect::<Vec<_>>()
    };

    let timeout = shared.settings.decision_timeout();
    let decisions = shared.decisions.as_ref();
    let results = join_all(
        requests
            .iter()
            .map(|(actor, context)| request_reaction(decisions, actor, &event, context, timeout)),
    )
    .await;

    let mut responses = Vec::with_capacity(requests.len() + 1);
    {
        let mut state = shared.state.lock().await;
        for ((actor, _), result) in requests.iter().zip(results) {
            match result {
                Ok(actions) => responses.extend(state.apply_reaction(&actor.id, actions)),
                Err(err) => tracing::warn!(
                    event_id = %event.id,
                    actor_id = %actor.id,
                    error = %err,
                    "background reaction failed"
                ),
            }
        }
    }

    let succeeded = responses.len();
    let error = if succeeded == 0 && !requests.is_empty() {
        tracing::error!(
            event_id = %event.id,
            attempted = requests.len(),
            "no background reactions succeeded"
        );
        Some(format!("none of the {} background reactions succeeded", requests.len()))
    } else {
        None
    };
    responses.push(primary_response);

    shared.responses.finalize(&event.id, |response| {
        response.all_responses = responses;
        response.error = error;
    });
}
