use bot_core::{SessionState, SimContent, StepOutcome};
use bot_session::SlotOverlay;
use parking_lot::Mutex;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;

/// An overlay plus the wall-clock moment it was produced; expired
/// overlays are filtered out on read, not eagerly cleared.
pub struct OverlayEntry {
    pub overlay: SlotOverlay,
    pub since: Instant,
}

impl OverlayEntry {
    pub fn expired(&self) -> bool {
        self.overlay.expired(self.since.elapsed())
    }
}

pub struct SimSession {
    pub session: SessionState,
    pub content: SimContent,
    pub rng: ChaCha8Rng,
    pub overlay: Option<OverlayEntry>,
}

impl SimSession {
    pub fn current_overlay(&self) -> Option<&SlotOverlay> {
        self.overlay
            .as_ref()
            .filter(|entry| !entry.expired())
            .map(|entry| &entry.overlay)
    }
}

pub type SharedSim = Arc<Mutex<SimSession>>;
pub type EventTx = broadcast::Sender<StepOutcome>;

#[derive(Clone)]
pub struct AppState {
    pub sim: SharedSim,
    pub event_tx: EventTx,
}
