//! Simulation context
//!
//! Owns the one `StarState`, the clock and the jitter RNG, and runs the
//! systems in a fixed order each tick:
//!
//! impact decay -> motion -> effects -> rotation -> heartbeat -> eyes
//!
//! Decay runs first so a collision's fresh impulse is what the eyes and
//! the status snapshot see on the tick it happens.
//!
//! Nothing here knows about sockets, rendering or wall-clock time.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::sim::clock::Clock;
use crate::sim::constants::{effects as tuning, star};
use crate::sim::state::{Display, EffectKind, StarState};
use crate::sim::systems::effects::{self, Command, CommandOutcome};
use crate::sim::systems::{eyes, heartbeat, motion};
use crate::util::vec2::Vec2;

/// What happened during one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub collided: bool,
    pub expired: Option<EffectKind>,
}

pub struct Simulation {
    display: Display,
    state: StarState,
    clock: Clock,
    rng: StdRng,
}

impl Simulation {
    pub fn new(display: Display, seed: u64) -> Self {
        Self {
            display,
            state: StarState::new(display),
            clock: Clock::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn display(&self) -> Display {
        self.display
    }

    pub fn state(&self) -> &StarState {
        &self.state
    }

    /// Direct mutable access for tests and tooling; commands go through `apply`
    pub fn state_mut(&mut self) -> &mut StarState {
        &mut self.state
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Advance the simulation by one fixed tick
    pub fn tick(&mut self) -> TickReport {
        sanitize(&mut self.state, self.display);

        let time = self.clock.advance();
        let state = &mut self.state;

        motion::decay_impact(state);
        let outcome = if state.motion_locked() {
            motion::MotionOutcome::default()
        } else {
            motion::update(state, self.display)
        };

        let expired = effects::update(state, self.display, &mut self.rng);
        if let Some(kind) = expired {
            debug!("Effect {} expired at tick {}", kind, time.tick);
        }

        motion::advance_rotation(state);

        let beat = heartbeat::sample(time);
        state.heartbeat_pulse = beat.pulse;

        eyes::update(state, beat);

        sanitize(&mut self.state, self.display);

        TickReport {
            tick: time.tick,
            collided: outcome.collided(),
            expired,
        }
    }

    /// Apply a validated command. Runs to completion before returning, so a
    /// tick never observes a half-applied command.
    pub fn apply(&mut self, command: Command) -> CommandOutcome {
        let outcome = effects::apply(&mut self.state, command, self.display);
        match outcome {
            CommandOutcome::Applied => info!("{}", describe(command)),
            CommandOutcome::NoOp => debug!("{}: already in requested state", command.action()),
        }
        outcome
    }

    pub fn reset(&mut self) -> CommandOutcome {
        self.apply(Command::Reset)
    }
}

fn describe(command: Command) -> String {
    let secs = |ticks: u32| ticks / crate::sim::constants::timing::TICK_RATE;
    match command {
        Command::Shrink => format!("Shrinking star for {} seconds", secs(tuning::SHRINK_TICKS)),
        Command::SpinOut => "Starting spin out (ramp phase)".to_string(),
        Command::Drill => format!("Starting drill for {} seconds", secs(tuning::DRILL_TICKS)),
        Command::CornerTrap => format!(
            "Trapped in corner for {} seconds",
            secs(tuning::CORNER_TRAP_TICKS)
        ),
        Command::Color(color) => format!(
            "Changed color to {} for {} seconds",
            color,
            secs(tuning::OVERLAY_TICKS)
        ),
        Command::Opacity(opacity) => format!(
            "Changed opacity to {} for {} seconds",
            opacity,
            secs(tuning::OVERLAY_TICKS)
        ),
        Command::GooglyEyes(enabled) => format!(
            "Googly eyes: {}",
            if enabled { "enabled" } else { "disabled" }
        ),
        Command::Reset => "Reset to default state".to_string(),
    }
}

/// Repair non-finite values so one bad number cannot poison every later tick
fn sanitize(state: &mut StarState, display: Display) {
    if !state.position.is_finite() {
        warn!("Fixed non-finite star position");
        state.position = display.center();
    }
    if !state.velocity.is_finite() {
        warn!("Fixed non-finite star velocity");
        state.velocity = Vec2::new(star::DEFAULT_SPEED, star::DEFAULT_SPEED);
    }
    if !state.scale.is_finite() || state.scale <= 0.0 {
        warn!("Fixed invalid star scale {}", state.scale);
        state.scale = 1.0;
    }
    if !state.rotation.is_finite() || !state.rotation_speed.is_finite() {
        warn!("Fixed non-finite star rotation");
        state.rotation = 0.0;
        state.rotation_speed = star::DEFAULT_ROTATION_SPEED;
    }
    if !state.opacity.is_finite() {
        state.opacity = 1.0;
    }
    state.opacity = state.opacity.clamp(0.0, 1.0);
}
