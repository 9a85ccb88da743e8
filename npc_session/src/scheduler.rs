//! Periodic loops: autonomous behaviour, the environment clock and maintenance.

use std::sync::Arc;

use futures::future::join_all;
use game_rules::{ActorSnapshot, EnvironmentContext, EventKind, GameEvent};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::decision::request_initiative;
use crate::session::SessionShared;

pub(crate) async fn run_autonomy(shared: Arc<SessionShared>, cancel: CancellationToken) {
    let mut ticker = interval(shared.settings.autonomy_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick fires immediately.
    ticker.tick().await;
    tracing::info!(session_id = %shared.id, "autonomous behaviour loop started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let acted = autonomy_tick(&shared).await;
                if acted > 0 {
                    tracing::debug!(session_id = %shared.id, acted, "autonomous actions taken");
                }
            }
        }
    }

    tracing::info!(session_id = %shared.id, "autonomous behaviour loop stopped");
}

/// Give every eligible actor one chance to act on its own.
///
/// Eligible: alive, energy above the threshold, and not named as initiator or
/// target in the most recent log entries. Per-actor failures are logged and
/// skipped.
pub(crate) async fn autonomy_tick(shared: &SessionShared) -> usize {
    let settings = &shared.settings;
    let candidates: Vec<(ActorSnapshot, EnvironmentContext)> = {
        let state = shared.state.lock().await;
        let recent = state.env.recent_events(settings.autonomy_lookback);
        state
            .actors
            .values()
            .filter(|actor| {
                actor.is_alive() && actor.state.energy > settings.autonomy_energy_threshold
            })
            .filter(|actor| !recent.iter().any(|event| event.involves(&actor.id)))
            .filter_map(|actor| state.perception(&actor.id))
            .collect()
    };
    if candidates.is_empty() {
        return 0;
    }

    let timeout = settings.decision_timeout();
    let decisions = shared.decisions.as_ref();
    let results = join_all(
        candidates
            .iter()
            .map(|(actor, context)| request_initiative(decisions, actor, context, timeout)),
    )
    .await;

    let mut acted = 0;
    let mut state = shared.state.lock().await;
    for ((actor, _), result) in candidates.iter().zip(results) {
        let actions = match result {
            Ok(actions) => actions,
            Err(err) => {
                tracing::warn!(actor_id = %actor.id, error = %err, "autonomous decision failed");
                continue;
            }
        };
        let Some(lead) = actions.iter().find(|action| !action.kind.is_idle()) else {
            continue;
        };
        if !state.actors.contains_key(&actor.id) {
            continue;
        }

        let mut event = GameEvent::new(
            EventKind::ActorAction,
            actor.id.as_str(),
            lead.kind.label(),
            actor.location.clone(),
        )
        .with_description(lead.describe(&actor.name))
        .with_properties(lead.properties())
        .with_property("autonomous", json!(true));
        if let Some(target) = &lead.target {
            event = event.with_target(target.clone());
        }

        state.env.append_event(event);
        state.apply_reaction(&actor.id, actions);
        acted += 1;
    }
    acted
}

pub(crate) async fn run_clock(shared: Arc<SessionShared>, cancel: CancellationToken) {
    let tick = shared.settings.clock_tick();
    let rate = shared.settings.time_rate;
    let mut ticker = interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let mut state = shared.state.lock().await;
                if state.env.advance_time(tick, rate).is_some() {
                    tracing::debug!(
                        session_id = %shared.id,
                        time_of_day = %state.env.time_of_day(),
                        "time of day changed"
                    );
                }
            }
        }
    }

    tracing::debug!(session_id = %shared.id, "environment clock stopped");
}

pub(crate) async fn run_maintenance(shared: Arc<SessionShared>, cancel: CancellationToken) {
    let mut rng = match shared.settings.maintenance_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let rule = shared.settings.weather_rule();
    let mut ticker = interval(shared.settings.maintenance_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let mut state = shared.state.lock().await;
                if state.env.perform_maintenance(&mut rng, rule).is_some() {
                    tracing::debug!(
                        session_id = %shared.id,
                        weather = %state.env.weather(),
                        "ambient weather changed"
                    );
                }
            }
        }
    }

    tracing::debug!(session_id = %shared.id, "maintenance loop stopped");
}
