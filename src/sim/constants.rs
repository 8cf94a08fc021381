/// Timing constants - everything in the simulation is counted in fixed ticks
pub mod timing {
    /// Simulation tick rate in Hz
    pub const TICK_RATE: u32 = 60;
    /// Delta time per tick in seconds
    pub const DT: f64 = 1.0 / TICK_RATE as f64;
    /// Tick duration in microseconds (for the driving interval)
    pub const TICK_DURATION_US: u64 = 1_000_000 / TICK_RATE as u64;

    /// Convert a duration in seconds to a whole number of ticks
    pub const fn secs_to_ticks(secs: u32) -> u32 {
        secs * TICK_RATE
    }
}

/// Star appearance and default motion
pub mod star {
    /// Base rendered size in pixels (scale 1.0)
    pub const BASE_SIZE: f64 = 240.0;
    /// Default speed on each axis, px/tick
    pub const DEFAULT_SPEED: f64 = 0.5;
    /// Default rotation speed, deg/tick
    pub const DEFAULT_ROTATION_SPEED: f64 = 0.5;
    /// Gap kept between the star's bounding box and the display edge
    pub const WALL_PADDING: f64 = 4.0;
    /// Smallest scale the simulation will ever hold
    pub const MIN_SCALE: f64 = 0.01;
}

/// Heartbeat waveform (QRS beat followed by a T-wave echo)
pub mod heartbeat {
    /// Full cycle length in seconds
    pub const PERIOD: f64 = 4.0;
    /// End of the main beat, as a fraction of the period
    pub const QRS_END: f64 = 0.125;
    /// End of the echo, as a fraction of the period
    pub const T_WAVE_END: f64 = 0.20;
    /// Peak pulse (scale reaches 1.08 at the top of the main beat)
    pub const PEAK: f64 = 0.08;
    /// Echo amplitude relative to the main beat
    pub const T_WAVE_RATIO: f64 = 0.25;
}

/// Googly eye physics. Offsets are in socket units: 1.0 is the rim.
pub mod eyes {
    /// Downward pull in the star's local frame, per tick
    pub const GRAVITY: f64 = 0.008;
    /// Velocity retained per tick
    pub const FRICTION: f64 = 0.96;
    /// Rotation speed (deg/tick) above which centrifugal force kicks in
    pub const SPIN_THRESHOLD: f64 = 2.0;
    /// Outward force per deg/tick above the threshold
    pub const CENTRIFUGAL_GAIN: f64 = 0.05;
    /// Upward impulse at the start of each main beat
    pub const HEARTBEAT_KICK: f64 = 0.0069;
    /// Maximum pupil travel from the socket center
    pub const SOCKET_RADIUS: f64 = 1.0;
}

/// Wall impact impulse
pub mod impact {
    /// Impulse set on every wall collision
    pub const INITIAL: f64 = 0.02;
    /// Decay applied every tick
    pub const DECAY: f64 = 0.85;
    /// Below this the impulse snaps to zero
    pub const EPSILON: f64 = 1e-6;
}

/// Manipulation effect tuning
pub mod effects {
    use super::timing::secs_to_ticks;

    /// shrink: total duration
    pub const SHRINK_TICKS: u32 = secs_to_ticks(15);
    /// shrink: ease down (and back up before expiry)
    pub const SHRINK_RAMP_TICKS: u32 = secs_to_ticks(1);
    /// shrink: held scale
    pub const SHRINK_SCALE: f64 = 0.2;

    /// spin_out: ramp-up phase
    pub const SPIN_OUT_RAMP_TICKS: u32 = secs_to_ticks(2);
    /// spin_out: ramp + decay
    pub const SPIN_OUT_TICKS: u32 = secs_to_ticks(5);
    /// spin_out: rotation speed at the start of the ramp, deg/tick
    pub const SPIN_OUT_START_SPEED: f64 = 1.0;
    /// spin_out: ramp rate, deg/tick gained per second
    pub const SPIN_OUT_RAMP_RATE: f64 = 5.0;

    /// drill: duration
    pub const DRILL_TICKS: u32 = secs_to_ticks(3);
    /// drill: rotation speed, deg/tick
    pub const DRILL_ROTATION_SPEED: f64 = 10.0;

    /// corner_trap: duration
    pub const CORNER_TRAP_TICKS: u32 = secs_to_ticks(10);
    /// corner_trap: inset of the trap point from each display edge
    pub const CORNER_INSET: f64 = 50.0;
    /// corner_trap: max jitter on each axis, px
    pub const CORNER_JITTER: f64 = 20.0;

    /// color / opacity overlays
    pub const OVERLAY_TICKS: u32 = secs_to_ticks(15);
}

/// Peak spin_out rotation speed (end of the ramp)
pub fn spin_out_peak_speed() -> f64 {
    effects::SPIN_OUT_START_SPEED
        + effects::SPIN_OUT_RAMP_RATE * (effects::SPIN_OUT_RAMP_TICKS as f64 * timing::DT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_conversion() {
        assert_eq!(timing::secs_to_ticks(15), 900);
        assert_eq!(effects::SHRINK_TICKS, 900);
        assert_eq!(effects::DRILL_TICKS, 180);
        assert_eq!(effects::CORNER_TRAP_TICKS, 600);
    }

    #[test]
    fn test_spin_out_peak() {
        assert!((spin_out_peak_speed() - 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_heartbeat_phase_split() {
        // 12.5% beat, 7.5% echo, 80% rest
        assert!((heartbeat::QRS_END - 0.125).abs() < 1e-12);
        assert!((heartbeat::T_WAVE_END - heartbeat::QRS_END - 0.075).abs() < 1e-12);
    }
}
