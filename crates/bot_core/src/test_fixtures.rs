//! Shared test fixtures for bot_core and downstream crates.
//!
//! `base_content()` provides a trimmed catalog plus the reference slot
//! layout; `base_session()` the matching Idle session. Constants use the
//! production values so resource math in tests matches the shipped
//! content files.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::{
    Chassis, ComponentId, ComponentSpec, ComponentType, Constants, Counters, Direction, EventLog,
    MetaState, RobotState, RunPhase, SessionState, SimContent, SlotId, SlotSpec, WorldConfig,
    WorldGrid, DEFAULT_PROGRAM_SOURCE,
};

fn spec(id: &str, kind: ComponentType, name: &str, power_per_step: f32) -> ComponentSpec {
    ComponentSpec {
        id: ComponentId(id.to_string()),
        kind,
        name: name.to_string(),
        power_per_step,
    }
}

/// Catalog subset with the reference power figures, the five-slot layout
/// (locked center pre-populated with the CPU), and a 10×10 world starting
/// at (0,0) facing right.
pub fn base_content() -> SimContent {
    SimContent {
        content_version: "test".to_string(),
        catalog: vec![
            spec("cpu_core", ComponentType::Cpu, "Core Processing Unit", 0.1),
            spec("drive_motor", ComponentType::Motor, "Drive Motor", 2.5),
            spec(
                "distance_sensor",
                ComponentType::SensorDistance,
                "Distance Sensor",
                0.5,
            ),
            spec("heat_sensor", ComponentType::SensorHeat, "Heat Sensor", 0.2),
            spec("reserve_battery", ComponentType::Battery, "Reserve Battery", 0.0),
            spec("wifi_link", ComponentType::Wifi, "WiFi Link", 1.2),
        ],
        slots: vec![
            SlotSpec {
                id: SlotId::Center,
                allowed_types: vec![ComponentType::Cpu],
                locked: true,
                preinstalled: Some(ComponentId("cpu_core".to_string())),
            },
            SlotSpec {
                id: SlotId::Front,
                allowed_types: vec![
                    ComponentType::SensorDistance,
                    ComponentType::Camera,
                    ComponentType::Gripper,
                    ComponentType::SensorLight,
                    ComponentType::Display,
                ],
                locked: false,
                preinstalled: None,
            },
            SlotSpec {
                id: SlotId::Left,
                allowed_types: vec![
                    ComponentType::Motor,
                    ComponentType::SensorHeat,
                    ComponentType::Speaker,
                    ComponentType::SensorLight,
                    ComponentType::Battery,
                ],
                locked: false,
                preinstalled: None,
            },
            SlotSpec {
                id: SlotId::Right,
                allowed_types: vec![
                    ComponentType::Motor,
                    ComponentType::SensorHeat,
                    ComponentType::Speaker,
                    ComponentType::SensorLight,
                    ComponentType::Battery,
                ],
                locked: false,
                preinstalled: None,
            },
            SlotSpec {
                id: SlotId::Back,
                allowed_types: vec![
                    ComponentType::SensorDistance,
                    ComponentType::Wifi,
                    ComponentType::Battery,
                    ComponentType::Gps,
                ],
                locked: false,
                preinstalled: None,
            },
        ],
        world: WorldConfig {
            width: 10,
            height: 10,
            start_x: 0,
            start_y: 0,
            start_direction: Direction::Right,
        },
        constants: Constants {
            start_battery: 100.0,
            start_temperature: 35.0,
            collision_battery_penalty: 10.0,
            temperature_step_max: 0.5,
            tick_delay_ms: 800,
            overlay_clear_ms: 600,
            log_view_entries: 10,
            low_battery_threshold: 20.0,
            high_temperature_threshold: 80.0,
        },
    }
}

/// Looks up a catalog entry by id, panicking on a typo in the test.
pub fn catalog_spec(content: &SimContent, id: &str) -> ComponentSpec {
    content
        .component(&ComponentId(id.to_string()))
        .unwrap_or_else(|| panic!("fixture catalog has no component '{id}'"))
        .clone()
}

/// Idle session over `base_content`: default chassis, empty grid, robot
/// at the start pose, default program source.
pub fn base_session(content: &SimContent) -> SessionState {
    SessionState {
        meta: MetaState {
            step: 0,
            seed: 42,
            schema_version: 1,
            content_version: content.content_version.clone(),
        },
        phase: RunPhase::Idle,
        run_id: None,
        chassis: Chassis::from_slot_specs(&content.slots, &content.catalog),
        config: content.world,
        grid: WorldGrid::empty(content.world.width, content.world.height),
        robot: RobotState::from_config(&content.world, &content.constants),
        source: DEFAULT_PROGRAM_SOURCE.to_string(),
        program: vec![],
        cursor: 0,
        visited: vec![content.world.start_pos()],
        log: EventLog::default(),
        counters: Counters::default(),
    }
}

/// Deterministic RNG seeded with 42.
pub fn make_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(42)
}
