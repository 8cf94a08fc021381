//! Heartbeat pulse - a cardiac-style waveform over a 4 second cycle
//!
//! | phase          | signal                                   |
//! |----------------|------------------------------------------|
//! | [0, 0.125)     | main QRS beat, half sine up to `PEAK`    |
//! | [0.125, 0.20)  | T-wave echo at a quarter of the amplitude |
//! | [0.20, 1.0)    | rest                                     |

use std::f64::consts::PI;

use crate::sim::clock::TickTime;
use crate::sim::constants::heartbeat::{PEAK, PERIOD, QRS_END, T_WAVE_END, T_WAVE_RATIO};

/// Heartbeat sample for one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Beat {
    /// Additive scale contribution, in [0, PEAK]
    pub pulse: f64,
    /// True on the tick a new main beat starts
    pub kick: bool,
}

/// Position in the cycle, in [0, 1)
pub fn phase(t: f64) -> f64 {
    t.rem_euclid(PERIOD) / PERIOD
}

fn cycle(t: f64) -> i64 {
    (t / PERIOD).floor() as i64
}

/// Pulse at simulation time `t` (seconds). Pure and periodic.
pub fn pulse_at(t: f64) -> f64 {
    let phase = phase(t);
    let pulse = if phase < QRS_END {
        PEAK * (phase / QRS_END * PI).sin()
    } else if phase < T_WAVE_END {
        T_WAVE_RATIO * PEAK * ((phase - QRS_END) / (T_WAVE_END - QRS_END) * PI).sin()
    } else {
        0.0
    };
    pulse.max(0.0)
}

/// Sample the heartbeat for a tick. The kick fires when the tick crosses
/// into a new cycle, i.e. the pulse leaves rest and enters the main beat.
pub fn sample(time: TickTime) -> Beat {
    Beat {
        pulse: pulse_at(time.now_secs),
        kick: cycle(time.now_secs) > cycle(time.prev_secs),
    }
}
