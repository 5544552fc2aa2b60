//! Type definitions for `bot_core`.
//!
//! All public types, structs, enums, and ID newtypes used by the simulation.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

// ---------------------------------------------------------------------------
// ID newtypes
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(ComponentId);
string_id!(EntryId);
string_id!(RunId);

// ---------------------------------------------------------------------------
// Core enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentType {
    Cpu,
    Motor,
    SensorDistance,
    SensorHeat,
    SensorLight,
    Camera,
    Gripper,
    Speaker,
    Wifi,
    Battery,
    Gps,
    Display,
}

impl std::fmt::Display for ComponentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Cpu => "cpu",
            Self::Motor => "motor",
            Self::SensorDistance => "sensor-distance",
            Self::SensorHeat => "sensor-heat",
            Self::SensorLight => "sensor-light",
            Self::Camera => "camera",
            Self::Gripper => "gripper",
            Self::Speaker => "speaker",
            Self::Wifi => "wifi",
            Self::Battery => "battery",
            Self::Gps => "gps",
            Self::Display => "display",
        };
        f.write_str(name)
    }
}

/// The five fixed mounting points of the chassis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotId {
    Center,
    Front,
    Back,
    Left,
    Right,
}

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Center => "center",
            Self::Front => "front",
            Self::Back => "back",
            Self::Left => "left",
            Self::Right => "right",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for SlotId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "center" => Ok(Self::Center),
            "front" => Ok(Self::Front),
            "back" => Ok(Self::Back),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            other => Err(format!("unknown slot id '{other}'")),
        }
    }
}

/// Heading in degrees clockwise from "up": 0=up/−y, 90=right/+x,
/// 180=down/+y, 270=left/−x.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    pub fn degrees(self) -> u16 {
        match self {
            Self::Up => 0,
            Self::Right => 90,
            Self::Down => 180,
            Self::Left => 270,
        }
    }

    /// Unit cell delta for one step of forward motion.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Right => (1, 0),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
        }
    }

    pub fn turned_right(self) -> Self {
        match self {
            Self::Up => Self::Right,
            Self::Right => Self::Down,
            Self::Down => Self::Left,
            Self::Left => Self::Up,
        }
    }

    pub fn turned_left(self) -> Self {
        match self {
            Self::Up => Self::Left,
            Self::Left => Self::Down,
            Self::Down => Self::Right,
            Self::Right => Self::Up,
        }
    }
}

impl TryFrom<u16> for Direction {
    type Error = String;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        match degrees {
            0 => Ok(Self::Up),
            90 => Ok(Self::Right),
            180 => Ok(Self::Down),
            270 => Ok(Self::Left),
            other => Err(format!("direction must be 0, 90, 180 or 270, got {other}")),
        }
    }
}

impl From<Direction> for u16 {
    fn from(direction: Direction) -> Self {
        direction.degrees()
    }
}

/// One atomic instruction in the robot's program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    Forward,
    Backward,
    TurnLeft,
    TurnRight,
    Wait,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellState {
    Empty,
    Obstacle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Error,
}

/// Run lifecycle: Idle → Running → Completed | Halted → Idle (reset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
    Idle,
    Running,
    Completed,
    Halted,
}

// ---------------------------------------------------------------------------
// State types
// ---------------------------------------------------------------------------

/// An installable component specification. Immutable catalog data,
/// loaded once at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub id: ComponentId,
    #[serde(rename = "type")]
    pub kind: ComponentType,
    pub name: String,
    pub power_per_step: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub id: SlotId,
    pub allowed_types: Vec<ComponentType>,
    /// Locked slots reject removal at the action layer (the reference
    /// locks `center`, which carries the pre-installed CPU).
    pub locked: bool,
    pub installed: Option<ComponentSpec>,
}

/// The five mounting slots and whatever is installed in them.
/// Owned exclusively; all operations are snapshot transformations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chassis {
    pub slots: Vec<Slot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

/// Rectangular cell grid, row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldGrid {
    pub width: u32,
    pub height: u32,
    pub cells: Vec<CellState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldConfig {
    pub width: u32,
    pub height: u32,
    pub start_x: i32,
    pub start_y: i32,
    pub start_direction: Direction,
}

/// The robot's pose and resource levels. Mutated only by the execution
/// loop while a run is in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotState {
    pub x: i32,
    pub y: i32,
    pub direction: Direction,
    pub battery: f32,
    pub temperature: f32,
    pub running: bool,
}

impl RobotState {
    pub fn from_config(config: &WorldConfig, constants: &Constants) -> Self {
        Self {
            x: config.start_x,
            y: config.start_y,
            direction: config.start_direction,
            battery: constants.start_battery,
            temperature: constants.start_temperature,
            running: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: EntryId,
    pub step: u64,
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Counters {
    pub next_entry_id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaState {
    /// Total steps executed across all runs of this session.
    pub step: u64,
    pub seed: u64,
    pub schema_version: u32,
    pub content_version: String,
}

/// Full simulation session: chassis, world, robot, program, and log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub meta: MetaState,
    pub phase: RunPhase,
    pub run_id: Option<RunId>,
    pub chassis: Chassis,
    pub config: WorldConfig,
    pub grid: WorldGrid,
    pub robot: RobotState,
    /// Program source text as authored (comments + JSON command array).
    pub source: String,
    /// Parsed program of the current/last run.
    pub program: Vec<Command>,
    pub cursor: usize,
    /// Cells the robot has occupied, in first-visit order.
    pub visited: Vec<GridPos>,
    pub log: crate::log::EventLog,
    pub counters: Counters,
}

/// Transient per-step record: feeds observers and the highlight overlay,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub step: u64,
    /// `None` for terminal bookkeeping steps (completion, battery halt).
    pub command: Option<Command>,
    pub robot: RobotState,
    pub active_slots: SmallVec<[SlotId; 5]>,
    pub errored_slots: SmallVec<[SlotId; 5]>,
    pub entries: Vec<LogEntry>,
}

// ---------------------------------------------------------------------------
// Content types
// ---------------------------------------------------------------------------

/// Slot layout entry as authored in `chassis.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotSpec {
    pub id: SlotId,
    pub allowed_types: Vec<ComponentType>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub preinstalled: Option<ComponentId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constants {
    pub start_battery: f32,
    pub start_temperature: f32,
    /// Extra battery cost of a sensor-less obstacle collision.
    pub collision_battery_penalty: f32,
    /// Upper bound (exclusive) of the per-step temperature perturbation.
    pub temperature_step_max: f32,
    /// Visualization delay between commands, milliseconds.
    pub tick_delay_ms: u64,
    /// How long transient slot highlighting stays visible, milliseconds.
    pub overlay_clear_ms: u64,
    /// Entries shown by the live log projection.
    pub log_view_entries: usize,
    pub low_battery_threshold: f32,
    pub high_temperature_threshold: f32,
}

/// Process-wide, read-only configuration loaded once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimContent {
    pub content_version: String,
    pub catalog: Vec<ComponentSpec>,
    pub slots: Vec<SlotSpec>,
    pub world: WorldConfig,
    pub constants: Constants,
}

impl SimContent {
    /// Catalog lookup by id. The catalog is small (a dozen entries).
    pub fn component(&self, id: &ComponentId) -> Option<&ComponentSpec> {
        self.catalog.iter().find(|spec| spec.id == *id)
    }
}
