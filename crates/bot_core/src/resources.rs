//! Resource accounting — battery drain and temperature drift.
//!
//! Pure functions so the rules can be tested apart from movement logic.
//! Battery is monotonically non-increasing absent a reset and clamped to
//! `[0, 100]`; temperature is monotonically non-decreasing during a run.

use rand::Rng;

use crate::{Constants, RobotState};

/// Deducts one step's combined power draw. Negative draws are ignored so
/// the battery can never climb.
pub fn apply_drain(robot: &mut RobotState, drain: f32) {
    robot.battery = (robot.battery - drain.max(0.0)).clamp(0.0, 100.0);
}

/// Extra deduction for a sensor-less obstacle collision.
pub fn apply_collision_penalty(robot: &mut RobotState, constants: &Constants) {
    apply_drain(robot, constants.collision_battery_penalty);
}

/// Small bounded heat perturbation per step, in `[0, temperature_step_max)`.
/// Not reproducible across runs, only bounded.
pub fn temperature_increment(rng: &mut impl Rng, constants: &Constants) -> f32 {
    if constants.temperature_step_max <= 0.0 {
        return 0.0;
    }
    rng.gen_range(0.0..constants.temperature_step_max)
}
