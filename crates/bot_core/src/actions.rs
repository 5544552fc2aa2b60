//! User-initiated session actions.
//!
//! Each handler validates, applies the mutation, and records the outcome
//! in the session log. Chassis and grid edits stay legal during a run —
//! the engine reads both fresh each step — but reconfiguring the world
//! resets the robot and is therefore rejected mid-run.

use crate::chassis::PlacementError;
use crate::world::apply_resize;
use crate::{
    ComponentId, LogLevel, RobotState, RunPhase, SessionState, SimContent, SlotId, WorldConfig,
    WorldGrid,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    RunInProgress,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RunInProgress => f.write_str("cannot reconfigure the world during a run"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Appends a session log entry outside the engine — used by the action
/// handlers here and by drivers logging boundary events (translation
/// failures, external notices).
pub fn log_message(state: &mut SessionState, level: LogLevel, message: impl Into<String>) {
    let step = state.meta.step;
    let entry = crate::emit(&mut state.counters, step, level, message);
    state.log.append(entry);
}

/// Installs a catalog component into a slot. Rejections (unknown id,
/// disallowed type) leave the chassis untouched and are logged.
pub fn place_component(
    state: &mut SessionState,
    content: &SimContent,
    slot_id: SlotId,
    component_id: &ComponentId,
) -> Result<(), PlacementError> {
    let Some(spec) = content.component(component_id).cloned() else {
        let err = PlacementError::UnknownComponent {
            id: component_id.clone(),
        };
        log_message(state, LogLevel::Error, err.to_string());
        return Err(err);
    };
    match state.chassis.place(slot_id, spec.clone()) {
        Ok(next) => {
            state.chassis = next;
            log_message(
                state,
                LogLevel::Success,
                format!("installed {} in the {slot_id} slot", spec.name),
            );
            Ok(())
        }
        Err(err) => {
            log_message(state, LogLevel::Error, err.to_string());
            Err(err)
        }
    }
}

/// Empties a slot. Locked slots (the CPU's center mount in the default
/// layout) are refused here, not in the chassis model.
pub fn remove_component(state: &mut SessionState, slot_id: SlotId) -> Result<(), PlacementError> {
    let Some(slot) = state.chassis.slot(slot_id) else {
        let err = PlacementError::UnknownSlot { slot: slot_id };
        log_message(state, LogLevel::Error, err.to_string());
        return Err(err);
    };
    if slot.locked {
        let err = PlacementError::SlotLocked { slot: slot_id };
        log_message(state, LogLevel::Error, err.to_string());
        return Err(err);
    }
    state.chassis = state.chassis.remove(slot_id);
    log_message(
        state,
        LogLevel::Info,
        format!("component removed from the {slot_id} slot"),
    );
    Ok(())
}

/// Flips one grid cell. Out-of-bounds is a no-op returning false.
pub fn toggle_cell(state: &mut SessionState, x: i32, y: i32) -> bool {
    state.grid.toggle_obstacle(x, y)
}

pub fn clear_grid(state: &mut SessionState) {
    state.grid = WorldGrid::empty(state.grid.width, state.grid.height);
    log_message(state, LogLevel::Info, "map cleared");
}

pub fn set_program(state: &mut SessionState, source: impl Into<String>) {
    state.source = source.into();
}

/// Reconciles the world into `new_config` (clamp start, copy the obstacle
/// overlap, clear the start cell) and re-initializes the robot from it.
pub fn apply_config(
    state: &mut SessionState,
    content: &SimContent,
    new_config: &WorldConfig,
) -> Result<(), ConfigError> {
    if state.phase == RunPhase::Running {
        log_message(state, LogLevel::Error, ConfigError::RunInProgress.to_string());
        return Err(ConfigError::RunInProgress);
    }
    let (config, grid) = apply_resize(&state.config, &state.grid, new_config);
    state.config = config;
    state.grid = grid;
    state.phase = RunPhase::Idle;
    state.run_id = None;
    state.program.clear();
    state.cursor = 0;
    state.robot = RobotState::from_config(&state.config, &content.constants);
    state.visited = vec![state.config.start_pos()];
    log_message(state, LogLevel::Success, "world configuration updated");
    Ok(())
}

/// Forces the session to Idle with the robot re-initialized from the
/// current configuration. Discards an in-flight run's remaining commands;
/// the log is kept (clearing it is its own action).
pub fn reset(state: &mut SessionState, content: &SimContent) {
    state.phase = RunPhase::Idle;
    state.run_id = None;
    state.program.clear();
    state.cursor = 0;
    state.robot = RobotState::from_config(&state.config, &content.constants);
    state.visited = vec![state.config.start_pos()];
    log_message(state, LogLevel::Info, "session reset");
}

/// Cooperative stop: the driver honors it only at the step boundary.
/// A no-op unless a run is in flight.
pub fn cancel_run(state: &mut SessionState) {
    if state.phase != RunPhase::Running {
        return;
    }
    state.phase = RunPhase::Halted;
    state.robot.running = false;
    log_message(state, LogLevel::Info, "run cancelled");
}

pub fn clear_log(state: &mut SessionState) {
    state.log.clear();
}
