//! `bot_core` — deterministic robot simulation step.
//!
//! No IO, no wall clock. All randomness via the passed-in Rng.

mod actions;
mod chassis;
mod engine;
mod id;
mod log;
mod program;
pub mod resources;
mod types;
mod world;

pub use actions::{
    apply_config, cancel_run, clear_grid, clear_log, log_message, place_component,
    remove_component, reset, set_program, toggle_cell, ConfigError,
};
pub use chassis::PlacementError;
pub use engine::{start_run, step, RunError};
pub use id::generate_run_uuid;
pub use log::EventLog;
pub use program::{parse_program, strip_line_comments, ProgramError, DEFAULT_PROGRAM_SOURCE};
pub use types::*;
pub use world::apply_resize;

pub(crate) fn emit(
    counters: &mut Counters,
    step: u64,
    level: LogLevel,
    message: impl Into<String>,
) -> LogEntry {
    let id = EntryId(format!("log_{:06}", counters.next_entry_id));
    counters.next_entry_id += 1;
    LogEntry {
        id,
        step,
        level,
        message: message.into(),
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod test_fixtures;
