//! Threshold alerts over the live robot state, surfaced by
//! `/api/v1/alerts` for HUD-style warnings.

use bot_core::{Constants, RobotState};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Alert {
    LowBattery { level: f32 },
    Overheat { temperature: f32 },
}

pub fn evaluate(robot: &RobotState, constants: &Constants) -> Vec<Alert> {
    let mut alerts = Vec::new();
    if robot.battery < constants.low_battery_threshold {
        alerts.push(Alert::LowBattery {
            level: robot.battery,
        });
    }
    if robot.temperature > constants.high_temperature_threshold {
        alerts.push(Alert::Overheat {
            temperature: robot.temperature,
        });
    }
    alerts
}
