use crate::state::{EventTx, OverlayEntry, SharedSim, SimSession};
use bot_session::SlotOverlay;
use std::time::{Duration, Instant};

/// Advances the session one command per tick while a run is in flight.
///
/// The tokio interval IS the per-command visualization delay — the core
/// never sleeps. Stop/reset requests land between ticks because they
/// take the same session lock; a step already in flight is never
/// preempted.
pub async fn run_tick_loop(sim: SharedSim, event_tx: EventTx, max_steps: Option<u64>) {
    let delay_ms = sim.lock().content.constants.tick_delay_ms.max(1);
    let mut interval = tokio::time::interval(Duration::from_millis(delay_ms));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Burst);

    let mut steps = 0u64;
    loop {
        interval.tick().await;

        let outcome = {
            let mut guard = sim.lock();
            let SimSession {
                ref mut session,
                ref content,
                ref mut rng,
                ref mut overlay,
            } = *guard;
            let outcome = bot_core::step(session, content, rng);
            if let Some(ref outcome) = outcome {
                let ttl = Duration::from_millis(content.constants.overlay_clear_ms);
                *overlay = SlotOverlay::from_outcome(outcome, ttl).map(|overlay| OverlayEntry {
                    overlay,
                    since: Instant::now(),
                });
            }
            outcome
        };

        if let Some(outcome) = outcome {
            steps += 1;
            let _ = event_tx.send(outcome);
        }

        if max_steps.is_some_and(|max| steps >= max) {
            break;
        }
    }
}
