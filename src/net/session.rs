//! Shared simulation handle and the fixed-rate tick loop
//!
//! The simulation sits behind one `parking_lot::RwLock`. The lock is never
//! held across an `.await`, so ticks and commands serialize cleanly: a
//! command is applied in full between two ticks, and the status returned
//! to the caller is read under the same write guard.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::metrics::Metrics;
use crate::net::command::CommandError;
use crate::net::protocol::StarStatus;
use crate::sim::constants::timing::{TICK_DURATION_US, TICK_RATE};
use crate::sim::state::EffectKind;
use crate::sim::systems::effects::{Command, CommandOutcome};
use crate::sim::{Simulation, TickReport};

/// Log a summary line this often
const STATS_INTERVAL_SECS: u64 = 30;

#[derive(Clone)]
pub struct StarSession {
    sim: Arc<RwLock<Simulation>>,
    metrics: Arc<Metrics>,
}

impl StarSession {
    pub fn new(sim: Simulation, metrics: Arc<Metrics>) -> Self {
        let session = Self {
            sim: Arc::new(RwLock::new(sim)),
            metrics,
        };
        session.publish_gauges(&session.sim.read());
        session
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn status(&self) -> StarStatus {
        StarStatus::from_simulation(&self.sim.read())
    }

    /// Apply a validated command and return the resulting status
    pub fn manipulate(&self, command: Command) -> (CommandOutcome, StarStatus) {
        let mut sim = self.sim.write();
        let outcome = sim.apply(command);
        match outcome {
            CommandOutcome::Applied => self.metrics.commands_accepted.fetch_add(1, Ordering::Relaxed),
            CommandOutcome::NoOp => self.metrics.commands_noop.fetch_add(1, Ordering::Relaxed),
        };
        self.publish_gauges(&sim);
        (outcome, StarStatus::from_simulation(&sim))
    }

    pub fn reject(&self, err: &CommandError) {
        self.metrics.commands_rejected.fetch_add(1, Ordering::Relaxed);
        debug!("Rejected command: {}", err);
    }

    /// Run one tick. Called by the loop; exposed for tests and benches.
    pub fn tick(&self) -> TickReport {
        let started = Instant::now();
        let report = {
            let mut sim = self.sim.write();
            let report = sim.tick();
            self.publish_gauges(&sim);
            report
        };

        self.metrics.record_tick_time(started.elapsed());
        if report.collided {
            self.metrics.wall_collisions.fetch_add(1, Ordering::Relaxed);
        }
        if report.expired.is_some() {
            self.metrics.effects_expired.fetch_add(1, Ordering::Relaxed);
        }
        report
    }

    fn publish_gauges(&self, sim: &Simulation) {
        let state = sim.state();
        let flag = |on: bool| u64::from(on);
        self.metrics
            .active_effect
            .store(EffectKind::gauge(state.active_effect()), Ordering::Relaxed);
        self.metrics
            .color_override
            .store(flag(state.color_timer.is_some()), Ordering::Relaxed);
        self.metrics
            .opacity_override
            .store(flag(state.opacity_timer.is_some()), Ordering::Relaxed);
        self.metrics
            .eyes_enabled
            .store(flag(state.eyes_enabled), Ordering::Relaxed);
    }
}

/// Spawn the fixed-rate tick loop
pub fn start_sim_loop(session: StarSession) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_micros(TICK_DURATION_US));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Simulation loop started at {} Hz", TICK_RATE);
        let start = Instant::now();
        let mut tick_count: u64 = 0;

        loop {
            ticker.tick().await;
            tick_count += 1;

            session.tick();

            if tick_count % (TICK_RATE as u64 * STATS_INTERVAL_SECS) == 0 {
                let status = session.status();
                let metrics = session.metrics();
                info!(
                    "Star: {}s, tick {}, pos ({:.0}, {:.0}), effect {}, color override {}, opacity override {} | {} collisions, {} commands | p99 {}us",
                    start.elapsed().as_secs(),
                    tick_count,
                    status.position.x,
                    status.position.y,
                    status.effect_active.as_deref().unwrap_or("none"),
                    metrics.color_override.load(Ordering::Relaxed) == 1,
                    metrics.opacity_override.load(Ordering::Relaxed) == 1,
                    metrics.wall_collisions.load(Ordering::Relaxed),
                    metrics.commands_accepted.load(Ordering::Relaxed),
                    metrics.tick_time_p99_us.load(Ordering::Relaxed),
                );
            }
        }
    })
}
