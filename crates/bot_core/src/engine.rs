//! The command interpreter's run state machine.
//!
//! `start_run` validates preconditions and arms the session; `step`
//! executes exactly one command (or the terminal bookkeeping) per call.
//! Scheduling — the fixed visualization delay between steps — lives in
//! the driver, never here.

use rand::Rng;
use smallvec::SmallVec;

use crate::program::{parse_program, ProgramError};
use crate::{
    resources, Command, ComponentType, Constants, GridPos, LogEntry, LogLevel, RunId, RunPhase,
    SessionState, SimContent, SlotId, StepOutcome,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    /// A second run request while Running is rejected, never queued.
    AlreadyRunning,
    MissingCpu,
    Parse(ProgramError),
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyRunning => f.write_str("a run is already in progress"),
            Self::MissingCpu => f.write_str("no CPU installed"),
            Self::Parse(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

/// Validates preconditions and transitions Idle → Running.
///
/// Failure modes, in order: already running (no log, no state change);
/// missing CPU (fatal entry, stays Idle); malformed program (error entry,
/// stays Idle, no other state change). A missing motor is only a warning.
pub fn start_run(state: &mut SessionState, rng: &mut impl Rng) -> Result<(), RunError> {
    if state.phase == RunPhase::Running {
        return Err(RunError::AlreadyRunning);
    }
    let step = state.meta.step;

    if !state.chassis.has_component_of_type(ComponentType::Cpu) {
        let entry = crate::emit(
            &mut state.counters,
            step,
            LogLevel::Error,
            "fatal: no CPU installed, run aborted",
        );
        state.log.append(entry);
        return Err(RunError::MissingCpu);
    }

    let program = match parse_program(&state.source) {
        Ok(program) => program,
        Err(err) => {
            let entry = crate::emit(&mut state.counters, step, LogLevel::Error, err.to_string());
            state.log.append(entry);
            return Err(RunError::Parse(err));
        }
    };

    if !state.chassis.has_component_of_type(ComponentType::Motor) {
        let entry = crate::emit(
            &mut state.counters,
            step,
            LogLevel::Error,
            "no motor installed, the robot will not move",
        );
        state.log.append(entry);
    }

    let run_id = RunId(crate::generate_run_uuid(rng).to_string());
    let entry = crate::emit(
        &mut state.counters,
        step,
        LogLevel::Success,
        format!("run {run_id} started: {} command(s)", program.len()),
    );
    state.log.append(entry);
    state.run_id = Some(run_id);
    state.program = program;
    state.cursor = 0;
    state.phase = RunPhase::Running;
    state.robot.running = true;
    Ok(())
}

/// Advances the session by one step while Running; `None` otherwise.
///
/// Order of operations:
/// 1. Halt if the battery is exhausted; complete if the program is done.
/// 2. Resource accounting: power drain and bounded temperature drift.
/// 3. Command dispatch (movement, turns, wait).
///
/// Emitted entries land in the session log and in the returned outcome.
pub fn step(
    state: &mut SessionState,
    content: &SimContent,
    rng: &mut impl Rng,
) -> Option<StepOutcome> {
    if state.phase != RunPhase::Running {
        return None;
    }
    state.meta.step += 1;
    let step = state.meta.step;

    let mut entries: Vec<LogEntry> = Vec::new();
    let mut active_slots: SmallVec<[SlotId; 5]> = SmallVec::new();
    let mut errored_slots: SmallVec<[SlotId; 5]> = SmallVec::new();
    let mut command = None;

    if state.robot.battery <= 0.0 {
        entries.push(crate::emit(
            &mut state.counters,
            step,
            LogLevel::Error,
            "battery depleted, halting run",
        ));
        state.phase = RunPhase::Halted;
        state.robot.running = false;
    } else if state.cursor >= state.program.len() {
        entries.push(crate::emit(
            &mut state.counters,
            step,
            LogLevel::Success,
            format!("program complete: {} command(s) executed", state.cursor),
        ));
        state.phase = RunPhase::Completed;
        state.robot.running = false;
    } else {
        let cmd = state.program[state.cursor];
        state.cursor += 1;
        command = Some(cmd);

        let drain = state.chassis.total_power_draw();
        resources::apply_drain(&mut state.robot, drain);
        state.robot.temperature += resources::temperature_increment(rng, &content.constants);

        match cmd {
            Command::Forward | Command::Backward => exec_move(
                state,
                cmd,
                step,
                &content.constants,
                &mut entries,
                &mut active_slots,
                &mut errored_slots,
            ),
            Command::TurnLeft | Command::TurnRight => {
                exec_turn(state, cmd, step, &mut entries, &mut active_slots);
            }
            Command::Wait => {
                entries.push(crate::emit(
                    &mut state.counters,
                    step,
                    LogLevel::Info,
                    "waiting",
                ));
            }
        }
    }

    for entry in &entries {
        state.log.append(entry.clone());
    }

    Some(StepOutcome {
        step,
        command,
        robot: state.robot.clone(),
        active_slots,
        errored_slots,
        entries,
    })
}

fn exec_move(
    state: &mut SessionState,
    cmd: Command,
    step: u64,
    constants: &Constants,
    entries: &mut Vec<LogEntry>,
    active_slots: &mut SmallVec<[SlotId; 5]>,
    errored_slots: &mut SmallVec<[SlotId; 5]>,
) {
    if !state.chassis.has_component_of_type(ComponentType::Motor) {
        entries.push(crate::emit(
            &mut state.counters,
            step,
            LogLevel::Error,
            "movement failed: no motor installed",
        ));
        return;
    }
    active_slots.extend(state.chassis.slots_of_type(ComponentType::Motor));

    let (mut dx, mut dy) = state.robot.direction.delta();
    if cmd == Command::Backward {
        dx = -dx;
        dy = -dy;
    }
    let next_x = state.robot.x + dx;
    let next_y = state.robot.y + dy;

    if !state.grid.in_bounds(next_x, next_y) {
        entries.push(crate::emit(
            &mut state.counters,
            step,
            LogLevel::Error,
            "grid boundary reached, holding position",
        ));
    } else if state.grid.is_obstacle(next_x, next_y) {
        if state
            .chassis
            .has_component_of_type(ComponentType::SensorDistance)
        {
            errored_slots.extend(state.chassis.slots_of_type(ComponentType::SensorDistance));
            entries.push(crate::emit(
                &mut state.counters,
                step,
                LogLevel::Error,
                format!("distance sensor: obstacle at ({next_x},{next_y}), emergency stop"),
            ));
        } else {
            resources::apply_collision_penalty(&mut state.robot, constants);
            entries.push(crate::emit(
                &mut state.counters,
                step,
                LogLevel::Error,
                format!("collision at ({next_x},{next_y})"),
            ));
        }
    } else {
        state.robot.x = next_x;
        state.robot.y = next_y;
        let label = if cmd == Command::Forward {
            "forward"
        } else {
            "backward"
        };
        entries.push(crate::emit(
            &mut state.counters,
            step,
            LogLevel::Info,
            format!("moved {label} to ({next_x},{next_y})"),
        ));
        let pos = GridPos {
            x: next_x,
            y: next_y,
        };
        if !state.visited.contains(&pos) {
            state.visited.push(pos);
        }
    }
}

fn exec_turn(
    state: &mut SessionState,
    cmd: Command,
    step: u64,
    entries: &mut Vec<LogEntry>,
    active_slots: &mut SmallVec<[SlotId; 5]>,
) {
    // Turning needs a motor too: with none installed, neither position
    // nor direction may ever change.
    if !state.chassis.has_component_of_type(ComponentType::Motor) {
        entries.push(crate::emit(
            &mut state.counters,
            step,
            LogLevel::Error,
            "turn failed: no motor installed",
        ));
        return;
    }
    active_slots.extend(state.chassis.slots_of_type(ComponentType::Motor));

    let label = if cmd == Command::TurnRight {
        state.robot.direction = state.robot.direction.turned_right();
        "right"
    } else {
        state.robot.direction = state.robot.direction.turned_left();
        "left"
    };
    entries.push(crate::emit(
        &mut state.counters,
        step,
        LogLevel::Info,
        format!("turned {label}, now facing {}°", state.robot.direction.degrees()),
    ));
}
