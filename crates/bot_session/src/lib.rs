//! Thin driver over the `bot_core` state machine.
//!
//! Sequences ticks, honors cooperative cancellation at the step boundary,
//! and keeps presentation-only concerns (transient slot highlighting,
//! wall-clock log stamps, script export, the translation boundary) out of
//! the core session state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bot_core::{
    cancel_run, log_message, start_run, step, Chassis, Command, LogEntry, LogLevel, RunError,
    RunPhase, SessionState, SimContent, SlotId, StepOutcome,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

// ---------------------------------------------------------------------------
// Scheduling
// ---------------------------------------------------------------------------

/// The single suspension point of a run: one wait per command.
pub trait StepClock {
    fn wait(&mut self);
}

/// Production clock — the fixed visualization delay between commands.
pub struct FixedDelayClock {
    pub delay: Duration,
}

impl FixedDelayClock {
    pub fn from_content(content: &SimContent) -> Self {
        Self {
            delay: Duration::from_millis(content.constants.tick_delay_ms),
        }
    }
}

impl StepClock for FixedDelayClock {
    fn wait(&mut self) {
        std::thread::sleep(self.delay);
    }
}

/// Zero-delay clock for tests and batch runs.
pub struct InstantClock;

impl StepClock for InstantClock {
    fn wait(&mut self) {}
}

/// Cooperative stop request, honored only between steps — never
/// preempting a step already in flight.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub phase: RunPhase,
    pub steps: u64,
    pub cancelled: bool,
}

/// Runs the session's program to a terminal phase: start, then
/// wait-one-tick / step / publish until Completed or Halted.
pub fn drive_run(
    session: &mut SessionState,
    content: &SimContent,
    rng: &mut impl Rng,
    clock: &mut impl StepClock,
    cancel: &CancelToken,
    mut on_step: impl FnMut(&StepOutcome),
) -> Result<RunReport, RunError> {
    start_run(session, rng)?;
    let mut steps = 0u64;
    let mut cancelled = false;
    while session.phase == RunPhase::Running {
        if cancel.is_cancelled() {
            cancel_run(session);
            cancelled = true;
            break;
        }
        clock.wait();
        if let Some(outcome) = step(session, content, rng) {
            steps += 1;
            on_step(&outcome);
        }
    }
    Ok(RunReport {
        phase: session.phase,
        steps,
        cancelled,
    })
}

// ---------------------------------------------------------------------------
// Transient slot highlighting
// ---------------------------------------------------------------------------

/// Time-boxed highlight overlay computed from the latest step outcome.
/// Lives outside `RobotState`; observers drop it once expired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotOverlay {
    pub active: SmallVec<[SlotId; 5]>,
    pub errored: SmallVec<[SlotId; 5]>,
    pub ttl: Duration,
}

impl SlotOverlay {
    /// `None` when the step highlighted nothing.
    pub fn from_outcome(outcome: &StepOutcome, ttl: Duration) -> Option<Self> {
        if outcome.active_slots.is_empty() && outcome.errored_slots.is_empty() {
            return None;
        }
        Some(Self {
            active: outcome.active_slots.clone(),
            errored: outcome.errored_slots.clone(),
            ttl,
        })
    }

    pub fn expired(&self, elapsed: Duration) -> bool {
        elapsed >= self.ttl
    }
}

// ---------------------------------------------------------------------------
// Log display stamping
// ---------------------------------------------------------------------------

/// A log entry paired with its wall-clock display time. Timestamps are
/// for display only; ordering is the append order of the entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StampedEntry {
    pub time: String,
    #[serde(flatten)]
    pub entry: LogEntry,
}

pub fn stamp_entries(entries: &[LogEntry]) -> Vec<StampedEntry> {
    let time = chrono::Utc::now().format("%H:%M:%S").to_string();
    entries
        .iter()
        .map(|entry| StampedEntry {
            time: time.clone(),
            entry: entry.clone(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Natural-language translation boundary
// ---------------------------------------------------------------------------

/// External instruction-to-program translation service. An empty result
/// signals "could not translate".
pub trait CommandTranslator {
    fn translate(&mut self, instruction: &str) -> Vec<Command>;
}

/// Feeds an instruction through the translator. On success the session's
/// program source is rewritten as a pretty-printed command array; an
/// empty or failed result is a logged no-op that leaves the program
/// unchanged.
pub fn apply_translation(
    session: &mut SessionState,
    translator: &mut dyn CommandTranslator,
    instruction: &str,
) -> bool {
    let commands = translator.translate(instruction);
    if commands.is_empty() {
        log_message(
            session,
            LogLevel::Error,
            "translation failed, program unchanged",
        );
        return false;
    }
    let source = serde_json::to_string_pretty(&commands).unwrap_or_default();
    bot_core::set_program(session, source);
    log_message(
        session,
        LogLevel::Success,
        format!("translated {} command(s) into the program", commands.len()),
    );
    true
}

// ---------------------------------------------------------------------------
// Deployment script export
// ---------------------------------------------------------------------------

/// Expands the validated chassis + command list into the deployment
/// script: one attach statement per installed component, one call per
/// command.
pub fn deployment_script(chassis: &Chassis, program: &[Command]) -> String {
    let mut script = String::from("import robot_hal\nimport time\n\n# Robot Configuration\n");
    for slot in &chassis.slots {
        if let Some(component) = &slot.installed {
            script.push_str(&format!(
                "robot_hal.attach('{}', position='{}')\n",
                component.kind, slot.id
            ));
        }
    }
    script.push_str("\ndef run():\n    bot = robot_hal.System()\n    bot.connect()\n    print(\"System Ready\")\n\n");
    for command in program {
        script.push_str(match command {
            Command::Forward => "    bot.motor.move(1)\n",
            Command::Backward => "    bot.motor.move(-1)\n",
            Command::TurnRight => "    bot.motor.rotate(90)\n",
            Command::TurnLeft => "    bot.motor.rotate(-90)\n",
            Command::Wait => "    time.sleep(1)\n",
        });
    }
    script.push_str("\n    bot.disconnect()\n\nif __name__ == \"__main__\":\n    run()\n");
    script
}

#[cfg(test)]
mod tests {
    use super::*;
    use bot_core::test_fixtures::{base_content, base_session, catalog_spec, make_rng};
    use bot_core::ComponentType;

    fn runnable_session(content: &SimContent) -> SessionState {
        let mut session = base_session(content);
        session.chassis = session
            .chassis
            .place(SlotId::Left, catalog_spec(content, "drive_motor"))
            .unwrap();
        session.source = r#"["FORWARD", "TURN_RIGHT", "WAIT"]"#.to_string();
        session
    }

    #[test]
    fn drive_run_reaches_completed_and_publishes_each_step() {
        let content = base_content();
        let mut session = runnable_session(&content);
        let mut outcomes = Vec::new();
        let report = drive_run(
            &mut session,
            &content,
            &mut make_rng(),
            &mut InstantClock,
            &CancelToken::default(),
            |outcome| outcomes.push(outcome.clone()),
        )
        .unwrap();

        assert_eq!(report.phase, RunPhase::Completed);
        assert!(!report.cancelled);
        // 3 commands + the terminal completion outcome
        assert_eq!(report.steps, 4);
        assert_eq!(outcomes.len(), 4);
    }

    #[test]
    fn pre_cancelled_token_halts_before_the_first_step() {
        let content = base_content();
        let mut session = runnable_session(&content);
        let cancel = CancelToken::default();
        cancel.cancel();

        let report = drive_run(
            &mut session,
            &content,
            &mut make_rng(),
            &mut InstantClock,
            &cancel,
            |_| {},
        )
        .unwrap();

        assert!(report.cancelled);
        assert_eq!(report.steps, 0);
        assert_eq!(session.phase, RunPhase::Halted);
        assert_eq!(session.cursor, 0, "no command may have executed");
    }

    #[test]
    fn second_driver_on_a_running_session_is_rejected() {
        let content = base_content();
        let mut session = runnable_session(&content);
        let mut rng = make_rng();
        bot_core::start_run(&mut session, &mut rng).unwrap();

        let err = drive_run(
            &mut session,
            &content,
            &mut rng,
            &mut InstantClock,
            &CancelToken::default(),
            |_| {},
        )
        .unwrap_err();
        assert_eq!(err, RunError::AlreadyRunning);
    }

    #[test]
    fn overlay_appears_for_movement_and_expires_after_its_window() {
        let content = base_content();
        let mut session = runnable_session(&content);
        let mut rng = make_rng();
        bot_core::start_run(&mut session, &mut rng).unwrap();
        let outcome = bot_core::step(&mut session, &content, &mut rng).unwrap();

        let ttl = Duration::from_millis(content.constants.overlay_clear_ms);
        let overlay = SlotOverlay::from_outcome(&outcome, ttl).expect("motors were active");
        assert_eq!(overlay.active.as_slice(), [SlotId::Left]);
        assert!(!overlay.expired(Duration::from_millis(599)));
        assert!(overlay.expired(Duration::from_millis(600)));
    }

    #[test]
    fn overlay_is_absent_when_nothing_highlighted() {
        let content = base_content();
        let mut session = base_session(&content); // no motors
        session.source = r#"["WAIT"]"#.to_string();
        let mut rng = make_rng();
        bot_core::start_run(&mut session, &mut rng).unwrap();
        let outcome = bot_core::step(&mut session, &content, &mut rng).unwrap();
        assert!(SlotOverlay::from_outcome(&outcome, Duration::from_millis(600)).is_none());
    }

    struct FixedTranslator(Vec<Command>);

    impl CommandTranslator for FixedTranslator {
        fn translate(&mut self, _instruction: &str) -> Vec<Command> {
            self.0.clone()
        }
    }

    #[test]
    fn failed_translation_leaves_the_program_unchanged() {
        let content = base_content();
        let mut session = base_session(&content);
        let source_before = session.source.clone();
        let mut translator = FixedTranslator(vec![]);

        assert!(!apply_translation(
            &mut session,
            &mut translator,
            "do a barrel roll"
        ));
        assert_eq!(session.source, source_before);
        assert_eq!(session.log.entries().last().unwrap().level, LogLevel::Error);
    }

    #[test]
    fn successful_translation_rewrites_the_program_source() {
        let content = base_content();
        let mut session = base_session(&content);
        let mut translator = FixedTranslator(vec![Command::Forward, Command::TurnLeft]);

        assert!(apply_translation(
            &mut session,
            &mut translator,
            "go forward then turn left"
        ));
        let parsed = bot_core::parse_program(&session.source).unwrap();
        assert_eq!(parsed, vec![Command::Forward, Command::TurnLeft]);
    }

    #[test]
    fn stamped_entries_use_clock_time_display_format() {
        let entries = vec![];
        assert!(stamp_entries(&entries).is_empty());

        let content = base_content();
        let mut session = base_session(&content);
        log_message(&mut session, LogLevel::Info, "hello");
        let stamped = stamp_entries(session.log.entries());
        assert_eq!(stamped.len(), 1);
        assert_eq!(stamped[0].time.len(), 8, "HH:MM:SS");
        assert_eq!(stamped[0].entry.message, "hello");
    }

    #[test]
    fn deployment_script_lists_components_and_commands() {
        let content = base_content();
        let chassis = base_session(&content)
            .chassis
            .place(SlotId::Left, catalog_spec(&content, "drive_motor"))
            .unwrap();
        assert!(chassis.has_component_of_type(ComponentType::Motor));

        let script = deployment_script(
            &chassis,
            &[Command::Forward, Command::Backward, Command::TurnLeft, Command::Wait],
        );
        assert!(script.contains("robot_hal.attach('cpu', position='center')"));
        assert!(script.contains("robot_hal.attach('motor', position='left')"));
        assert!(script.contains("bot.motor.move(1)"));
        assert!(script.contains("bot.motor.move(-1)"));
        assert!(script.contains("bot.motor.rotate(-90)"));
        assert!(script.contains("time.sleep(1)"));
        assert!(script.ends_with("run()\n"));
    }
}
