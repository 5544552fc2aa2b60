//! Content loading and initial-session construction shared between
//! bot_cli and bot_daemon.

use anyhow::{Context, Result};
use bot_core::{
    Chassis, ComponentSpec, Constants, Counters, EventLog, MetaState, RobotState, RunPhase,
    SessionState, SimContent, SlotId, SlotSpec, WorldConfig, WorldGrid, DEFAULT_PROGRAM_SOURCE,
};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

#[derive(Deserialize)]
struct CatalogFile {
    content_version: String,
    components: Vec<ComponentSpec>,
}

#[derive(Deserialize)]
struct ChassisFile {
    slots: Vec<SlotSpec>,
}

/// Validates cross-references in loaded content, panicking on any
/// authoring error.
///
/// Catches mistakes like: a slot pre-installed with an unknown component
/// id, a component the slot's own allow-list rejects, or a start pose
/// outside the world.
pub fn validate_content(content: &SimContent) {
    assert!(!content.catalog.is_empty(), "component catalog is empty");
    let mut component_ids: HashSet<&str> = HashSet::new();
    for component in &content.catalog {
        assert!(
            component_ids.insert(component.id.0.as_str()),
            "duplicate component id '{}'",
            component.id.0,
        );
        assert!(
            component.power_per_step >= 0.0,
            "component '{}' has negative power draw",
            component.id.0,
        );
    }

    assert!(
        content.slots.len() == 5,
        "chassis layout must declare exactly five slots, got {}",
        content.slots.len(),
    );
    let mut slot_ids: HashSet<SlotId> = HashSet::new();
    for slot in &content.slots {
        assert!(
            slot_ids.insert(slot.id),
            "slot '{}' declared more than once",
            slot.id,
        );
        assert!(
            !slot.allowed_types.is_empty(),
            "slot '{}' has an empty allow-list",
            slot.id,
        );
        if let Some(preinstalled) = &slot.preinstalled {
            let spec = content
                .component(preinstalled)
                .unwrap_or_else(|| {
                    panic!(
                        "slot '{}' pre-installs unknown component '{}'",
                        slot.id, preinstalled.0,
                    )
                });
            assert!(
                slot.allowed_types.contains(&spec.kind),
                "slot '{}' pre-installs '{}' but its allow-list rejects {}",
                slot.id,
                preinstalled.0,
                spec.kind,
            );
        }
    }

    let world = &content.world;
    assert!(
        world.width >= 1 && world.height >= 1,
        "world dimensions must be at least 1×1",
    );
    assert!(
        world.in_bounds(world.start_x, world.start_y),
        "start pose ({}, {}) is outside the {}×{} world",
        world.start_x,
        world.start_y,
        world.width,
        world.height,
    );

    let constants = &content.constants;
    assert!(
        constants.start_battery > 0.0 && constants.start_battery <= 100.0,
        "start battery must be in (0, 100]",
    );
    assert!(
        constants.start_temperature >= 0.0,
        "start temperature must be non-negative",
    );
    assert!(
        constants.collision_battery_penalty >= 0.0,
        "collision penalty must be non-negative",
    );
    assert!(
        constants.temperature_step_max >= 0.0,
        "temperature step bound must be non-negative",
    );
}

pub fn load_content(content_dir: &str) -> Result<SimContent> {
    let dir = Path::new(content_dir);
    let catalog_file: CatalogFile = serde_json::from_str(
        &std::fs::read_to_string(dir.join("catalog.json")).context("reading catalog.json")?,
    )
    .context("parsing catalog.json")?;
    let chassis_file: ChassisFile = serde_json::from_str(
        &std::fs::read_to_string(dir.join("chassis.json")).context("reading chassis.json")?,
    )
    .context("parsing chassis.json")?;
    let world: WorldConfig = serde_json::from_str(
        &std::fs::read_to_string(dir.join("world.json")).context("reading world.json")?,
    )
    .context("parsing world.json")?;
    let constants: Constants = serde_json::from_str(
        &std::fs::read_to_string(dir.join("constants.json")).context("reading constants.json")?,
    )
    .context("parsing constants.json")?;
    let content = SimContent {
        content_version: catalog_file.content_version,
        catalog: catalog_file.components,
        slots: chassis_file.slots,
        world,
        constants,
    };
    validate_content(&content);
    Ok(content)
}

/// Assembles the Idle starting session: chassis from the layout (CPU
/// pre-installed in the locked center slot), an empty grid, the robot at
/// the start pose, the default program in the editor.
pub fn build_initial_session(content: &SimContent, seed: u64) -> SessionState {
    SessionState {
        meta: MetaState {
            step: 0,
            seed,
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
