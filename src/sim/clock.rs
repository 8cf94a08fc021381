//! Fixed-step simulation clock

use crate::sim::constants::timing::TICK_RATE;

/// Time window covered by one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickTime {
    /// Tick number after advancing (first tick is 1)
    pub tick: u64,
    /// Simulation time at the start of the tick, seconds
    pub prev_secs: f64,
    /// Simulation time at the end of the tick, seconds
    pub now_secs: f64,
}

/// Counts fixed ticks. Simulation time is derived from the count, never
/// accumulated, so whole seconds land exactly on tick boundaries.
#[derive(Debug, Clone, Default)]
pub struct Clock {
    tick: u64,
}

impl Clock {
    pub fn new() -> Self {
        Self { tick: 0 }
    }

    pub fn advance(&mut self) -> TickTime {
        let prev_secs = self.elapsed_secs();
        self.tick += 1;
        TickTime {
            tick: self.tick,
            prev_secs,
            now_secs: self.elapsed_secs(),
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.tick as f64 / TICK_RATE as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance() {
        let mut clock = Clock::new();
        let t = clock.advance();
        assert_eq!(t.tick, 1);
        assert_eq!(t.prev_secs, 0.0);
        assert!((t.now_secs - 1.0 / 60.0).abs() < 1e-15);
    }

    #[test]
    fn test_no_drift() {
        let mut clock = Clock::new();
        for _ in 0..(TICK_RATE * 3600) {
            clock.advance();
        }
        assert_eq!(clock.tick(), 216_000);
        assert_eq!(clock.elapsed_secs(), 3600.0);
    }
}
