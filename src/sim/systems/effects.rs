//! Effect controller
//!
//! Owns the exclusive effect slot (`StarState::effect`) and the two overlay
//! timers. All starts, cancels and expiries go through this module so that
//! the slot and the fields an effect drives always change together.
//!
//! Conflict rule: starting any exclusive effect first cancels whatever
//! occupies the slot, restoring the fields that effect was driving. This is
//! what makes spin_out and drill cancel each other.

use rand::Rng;

use crate::sim::constants::{effects, spin_out_peak_speed, star, timing::DT};
use crate::sim::state::{
    ActiveEffect, Corner, Display, EffectKind, OverlayTimer, Rgb, StarState,
};
use crate::sim::systems::motion;
use crate::util::vec2::Vec2;

/// A validated manipulation request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Shrink,
    SpinOut,
    Drill,
    CornerTrap,
    Color(Rgb),
    Opacity(f64),
    GooglyEyes(bool),
    Reset,
}

impl Command {
    /// API action name
    pub fn action(&self) -> &'static str {
        match self {
            Command::Shrink => "shrink",
            Command::SpinOut => "spin_out",
            Command::Drill => "drill",
            Command::CornerTrap => "corner_trap",
            Command::Color(_) => "color",
            Command::Opacity(_) => "opacity",
            Command::GooglyEyes(_) => "googly_eyes",
            Command::Reset => "reset",
        }
    }
}

/// Result of applying a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Applied,
    /// Valid, but the star was already in the requested state
    NoOp,
}

/// Apply a command to the star. Total over every `Command`; never fails.
pub fn apply(state: &mut StarState, command: Command, display: Display) -> CommandOutcome {
    match command {
        Command::Shrink => start_shrink(state, display),
        Command::SpinOut => start_spin_out(state, display),
        Command::Drill => start_drill(state, display),
        Command::CornerTrap => start_corner_trap(state, display),
        Command::Color(color) => {
            state.color = color;
            state.color_timer = Some(OverlayTimer::new(effects::OVERLAY_TICKS));
        }
        Command::Opacity(opacity) => {
            state.opacity = clamp_opacity(opacity);
            state.opacity_timer = Some(OverlayTimer::new(effects::OVERLAY_TICKS));
        }
        Command::GooglyEyes(enabled) => {
            if state.eyes_enabled == enabled {
                return CommandOutcome::NoOp;
            }
            state.eyes_enabled = enabled;
        }
        Command::Reset => *state = StarState::new(display),
    }
    CommandOutcome::Applied
}

/// Advance effect timers by one tick. Returns the effect that expired, if any.
pub fn update<R: Rng>(state: &mut StarState, display: Display, rng: &mut R) -> Option<EffectKind> {
    update_overlays(state);

    let effect = state.effect?;
    match effect {
        ActiveEffect::Shrink { elapsed, from_scale } => {
            let elapsed = elapsed + 1;
            if elapsed >= effects::SHRINK_TICKS {
                state.scale = 1.0;
                return expire(state, EffectKind::Shrink);
            }
            state.scale = shrink_scale(elapsed, from_scale);
            state.effect = Some(ActiveEffect::Shrink { elapsed, from_scale });
        }
        ActiveEffect::SpinOut { elapsed } => {
            let elapsed = elapsed + 1;
            if elapsed >= effects::SPIN_OUT_TICKS {
                state.rotation_speed = star::DEFAULT_ROTATION_SPEED;
                return expire(state, EffectKind::SpinOut);
            }
            state.rotation_speed = spin_out_speed(elapsed);
            state.effect = Some(ActiveEffect::SpinOut { elapsed });
        }
        ActiveEffect::Drill {
            elapsed,
            saved_velocity,
        } => {
            let elapsed = elapsed + 1;
            if elapsed >= effects::DRILL_TICKS {
                state.velocity = restore_velocity(saved_velocity);
                state.rotation_speed = star::DEFAULT_ROTATION_SPEED;
                return expire(state, EffectKind::Drill);
            }
            state.velocity = Vec2::ZERO;
            state.rotation_speed = effects::DRILL_ROTATION_SPEED;
            state.effect = Some(ActiveEffect::Drill {
                elapsed,
                saved_velocity,
            });
        }
        ActiveEffect::CornerTrap {
            elapsed,
            corner,
            saved_velocity,
        } => {
            let elapsed = elapsed + 1;
            if elapsed >= effects::CORNER_TRAP_TICKS {
                release_corner(state, corner, saved_velocity, display);
                return expire(state, EffectKind::CornerTrap);
            }
            let jitter = Vec2::new(
                rng.gen_range(-effects::CORNER_JITTER..=effects::CORNER_JITTER),
                rng.gen_range(-effects::CORNER_JITTER..=effects::CORNER_JITTER),
            );
            state.position = corner.point(display, effects::CORNER_INSET) + jitter;
            state.effect = Some(ActiveEffect::CornerTrap {
                elapsed,
                corner,
                saved_velocity,
            });
        }
    }
    None
}

fn expire(state: &mut StarState, kind: EffectKind) -> Option<EffectKind> {
    state.effect = None;
    Some(kind)
}

fn update_overlays(state: &mut StarState) {
    if let Some(timer) = state.color_timer.as_mut() {
        if timer.tick() {
            state.color = Rgb::DEFAULT;
            state.color_timer = None;
        }
    }
    if let Some(timer) = state.opacity_timer.as_mut() {
        if timer.tick() {
            state.opacity = 1.0;
            state.opacity_timer = None;
        }
    }
}

/// Empty the exclusive slot, putting back whatever the old effect drove
pub fn cancel_active(state: &mut StarState, display: Display) -> Option<EffectKind> {
    let effect = state.effect.take()?;
    match effect {
        ActiveEffect::Shrink { .. } => state.scale = 1.0,
        ActiveEffect::SpinOut { .. } => state.rotation_speed = star::DEFAULT_ROTATION_SPEED,
        ActiveEffect::Drill { saved_velocity, .. } => {
            state.velocity = restore_velocity(saved_velocity);
            state.rotation_speed = star::DEFAULT_ROTATION_SPEED;
        }
        ActiveEffect::CornerTrap {
            corner,
            saved_velocity,
            ..
        } => release_corner(state, corner, saved_velocity, display),
    }
    Some(effect.kind())
}

fn start_shrink(state: &mut StarState, display: Display) {
    // Restarting mid-shrink continues from the current size
    let from_scale = state.scale;
    cancel_active(state, display);
    state.scale = from_scale;
    state.effect = Some(ActiveEffect::Shrink {
        elapsed: 0,
        from_scale,
    });
}

fn start_spin_out(state: &mut StarState, display: Display) {
    cancel_active(state, display);
    state.rotation_speed = effects::SPIN_OUT_START_SPEED;
    state.effect = Some(ActiveEffect::SpinOut { elapsed: 0 });
}

fn start_drill(state: &mut StarState, display: Display) {
    cancel_active(state, display);
    let saved_velocity = restore_velocity(state.velocity);
    state.velocity = Vec2::ZERO;
    state.rotation_speed = effects::DRILL_ROTATION_SPEED;
    state.effect = Some(ActiveEffect::Drill {
        elapsed: 0,
        saved_velocity,
    });
}

fn start_corner_trap(state: &mut StarState, display: Display) {
    cancel_active(state, display);
    let corner = nearest_corner(state.position, display);
    let saved_velocity = restore_velocity(state.velocity);
    state.velocity = Vec2::ZERO;
    state.position = corner.point(display, effects::CORNER_INSET);
    state.corner_trapped = true;
    state.trapped_corner = Some(corner);
    state.effect = Some(ActiveEffect::CornerTrap {
        elapsed: 0,
        corner,
        saved_velocity,
    });
}

/// The jittered trap point sits outside the bounce envelope, so the star is
/// settled back inside before it starts moving again
fn release_corner(state: &mut StarState, corner: Corner, saved_velocity: Vec2, display: Display) {
    let speed = restore_velocity(saved_velocity).abs();
    let away = corner.away();
    state.velocity = Vec2::new(speed.x * away.x, speed.y * away.y);
    motion::settle_inside(state, display);
    state.corner_trapped = false;
    state.trapped_corner = None;
}

/// Nearest trap corner; ties go to the first in `Corner::ALL`
pub fn nearest_corner(position: Vec2, display: Display) -> Corner {
    let mut best = Corner::TopLeft;
    let mut best_dist = f64::INFINITY;
    for corner in Corner::ALL {
        let dist = position.distance_sq_to(corner.point(display, effects::CORNER_INSET));
        if dist < best_dist {
            best = corner;
            best_dist = dist;
        }
    }
    best
}

/// A stopped star would never bounce again, so zero falls back to the default
fn restore_velocity(saved: Vec2) -> Vec2 {
    if saved.is_zero(1e-9) {
        Vec2::new(star::DEFAULT_SPEED, star::DEFAULT_SPEED)
    } else {
        saved
    }
}

fn clamp_opacity(opacity: f64) -> f64 {
    if opacity.is_finite() {
        opacity.clamp(0.0, 1.0)
    } else {
        1.0
    }
}

/// Scale `elapsed` ticks into a shrink: ease down, hold, ease back to 1.0
/// so the slot can expire on exactly 1.0.
pub fn shrink_scale(elapsed: u32, from_scale: f64) -> f64 {
    let ramp = effects::SHRINK_RAMP_TICKS;
    let release_at = effects::SHRINK_TICKS - ramp;
    let scale = if elapsed <= ramp {
        let t = elapsed as f64 / ramp as f64;
        from_scale + (effects::SHRINK_SCALE - from_scale) * t
    } else if elapsed < release_at {
        effects::SHRINK_SCALE
    } else {
        let t = (elapsed - release_at) as f64 / ramp as f64;
        effects::SHRINK_SCALE + (1.0 - effects::SHRINK_SCALE) * t.min(1.0)
    };
    scale.max(star::MIN_SCALE)
}

/// Rotation speed `elapsed` ticks into a spin_out: linear ramp to the peak,
/// then a quadratic ease back to the default speed.
pub fn spin_out_speed(elapsed: u32) -> f64 {
    let ramp = effects::SPIN_OUT_RAMP_TICKS;
    if elapsed <= ramp {
        return effects::SPIN_OUT_START_SPEED + effects::SPIN_OUT_RAMP_RATE * elapsed as f64 * DT;
    }
    let decay_ticks = (effects::SPIN_OUT_TICKS - ramp) as f64;
    let p = ((elapsed - ramp) as f64 / decay_ticks).min(1.0);
    let remaining = (1.0 - p) * (1.0 - p);
    star::DEFAULT_ROTATION_SPEED + (spin_out_peak_speed() - star::DEFAULT_ROTATION_SPEED) * remaining
}
