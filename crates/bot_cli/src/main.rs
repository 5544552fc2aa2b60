use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;

use bot_core::{
    Command as RobotCommand, ComponentId, SessionState, SimContent, SlotId, StepOutcome,
};
use bot_session::{deployment_script, drive_run, stamp_entries, CancelToken, FixedDelayClock};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "bot_cli", about = "Robot Simulation CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a command program against the simulated world.
    Run {
        /// Program file (comments + JSON command array). Defaults to the
        /// built-in sample program.
        #[arg(long)]
        program: Option<String>,
        #[arg(long, default_value = "./content")]
        content_dir: String,
        /// Seed for the session RNG; random when omitted.
        #[arg(long)]
        seed: Option<u64>,
        /// Install a component before the run, e.g. `left=drive_motor`.
        #[arg(long = "install", value_name = "SLOT=COMPONENT")]
        installs: Vec<String>,
        /// Place an obstacle before the run, e.g. `3,4`.
        #[arg(long = "obstacle", value_name = "X,Y")]
        obstacles: Vec<String>,
        /// Skip the per-command visualization delay.
        #[arg(long)]
        no_delay: bool,
        /// Override the per-command delay in milliseconds.
        #[arg(long, conflicts_with = "no_delay")]
        delay_ms: Option<u64>,
    },
    /// Print the deployment script for a program without running it.
    Export {
        #[arg(long)]
        program: String,
        #[arg(long, default_value = "./content")]
        content_dir: String,
        #[arg(long = "install", value_name = "SLOT=COMPONENT")]
        installs: Vec<String>,
    },
}

// ---------------------------------------------------------------------------
// Session assembly
// ---------------------------------------------------------------------------

fn apply_installs(
    session: &mut SessionState,
    content: &SimContent,
    installs: &[String],
) -> Result<()> {
    for install in installs {
        let Some((slot, component)) = install.split_once('=') else {
            bail!("--install expects SLOT=COMPONENT, got '{install}'");
        };
        let slot_id: SlotId = slot
            .parse()
            .map_err(|err: String| anyhow::anyhow!("{err}"))?;
        bot_core::place_component(
            session,
            content,
            slot_id,
            &ComponentId(component.to_string()),
        )
        .with_context(|| format!("installing '{component}' in the {slot_id} slot"))?;
    }
    Ok(())
}

fn apply_obstacles(session: &mut SessionState, obstacles: &[String]) -> Result<()> {
    for obstacle in obstacles {
        let Some((x, y)) = obstacle.split_once(',') else {
            bail!("--obstacle expects X,Y, got '{obstacle}'");
        };
        let x: i32 = x.trim().parse().context("parsing obstacle X")?;
        let y: i32 = y.trim().parse().context("parsing obstacle Y")?;
        if !bot_core::toggle_cell(session, x, y) {
            bail!("obstacle ({x},{y}) is outside the grid");
        }
    }
    Ok(())
}

fn load_program(session: &mut SessionState, program: Option<&str>) -> Result<()> {
    if let Some(path) = program {
        let source =
            std::fs::read_to_string(path).with_context(|| format!("reading program: {path}"))?;
        bot_core::set_program(session, source);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Run loop
// ---------------------------------------------------------------------------

fn command_label(command: RobotCommand) -> &'static str {
    match command {
        RobotCommand::Forward => "FORWARD",
        RobotCommand::Backward => "BACKWARD",
        RobotCommand::TurnLeft => "TURN_LEFT",
        RobotCommand::TurnRight => "TURN_RIGHT",
        RobotCommand::Wait => "WAIT",
    }
}

fn print_outcome(outcome: &StepOutcome) {
    let label = outcome.command.map_or("—", command_label);
    println!(
        "[step {:04}] {label:<10} pos=({},{}) dir={:>3}° battery={:5.1}% temp={:5.1}°C",
        outcome.step,
        outcome.robot.x,
        outcome.robot.y,
        outcome.robot.direction.degrees(),
        outcome.robot.battery,
        outcome.robot.temperature,
    );
    for stamped in stamp_entries(&outcome.entries) {
        println!("    [{}] {}", stamped.time, stamped.entry.message);
    }
}

fn run(
    program: Option<String>,
    content_dir: &str,
    seed: Option<u64>,
    installs: &[String],
    obstacles: &[String],
    no_delay: bool,
    delay_ms: Option<u64>,
) -> Result<()> {
    let content = bot_world::load_content(content_dir)?;
    let resolved_seed = seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(resolved_seed);
    let mut session = bot_world::build_initial_session(&content, resolved_seed);

    apply_installs(&mut session, &content, installs)?;
    apply_obstacles(&mut session, obstacles)?;
    load_program(&mut session, program.as_deref())?;

    let delay = if no_delay {
        Duration::ZERO
    } else {
        Duration::from_millis(delay_ms.unwrap_or(content.constants.tick_delay_ms))
    };
    let mut clock = FixedDelayClock { delay };

    println!(
        "Starting run: seed={resolved_seed} world={}x{} power_draw={:.1}/step",
        content.world.width,
        content.world.height,
        session.chassis.total_power_draw(),
    );
    println!("{}", "-".repeat(80));

    let report = drive_run(
        &mut session,
        &content,
        &mut rng,
        &mut clock,
        &CancelToken::default(),
        print_outcome,
    )
    .map_err(|err| anyhow::anyhow!("run rejected: {err}"))?;

    println!("{}", "-".repeat(80));
    println!(
        "Done: phase={:?} steps={} battery={:.1}% temp={:.1}°C visited={} cell(s)",
        report.phase,
        report.steps,
        session.robot.battery,
        session.robot.temperature,
        session.visited.len(),
    );
    Ok(())
}

fn export(program: &str, content_dir: &str, installs: &[String]) -> Result<()> {
    let content = bot_world::load_content(content_dir)?;
    let mut session = bot_world::build_initial_session(&content, 0);
    apply_installs(&mut session, &content, installs)?;

    let source =
        std::fs::read_to_string(program).with_context(|| format!("reading program: {program}"))?;
    let commands = bot_core::parse_program(&source)?;
    print!("{}", deployment_script(&session.chassis, &commands));
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            program,
            content_dir,
            seed,
            installs,
            obstacles,
            no_delay,
            delay_ms,
        } => run(
            program,
            &content_dir,
            seed,
            &installs,
            &obstacles,
            no_delay,
            delay_ms,
        )?,
        Commands::Export {
            program,
            content_dir,
            installs,
        } => export(&program, &content_dir, &installs)?,
    }
    Ok(())
}
