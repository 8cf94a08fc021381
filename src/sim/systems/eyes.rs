//! Googly eye physics
//!
//! Each pupil is a point mass inside a circular socket, simulated in the
//! star's local (rotated) frame. Forces per tick:
//! - gravity, world-down rotated into the local frame
//! - centrifugal push toward the eye's outer side when spinning fast
//! - an upward kick at the start of every heartbeat
//! - a jolt toward the wall after a collision, scaled by `wall_impact`
//!
//! The two eyes are simulated independently; they only differ in which
//! side is "outward". Disabling eyes freezes both pupils where they are.

use crate::sim::constants::eyes::{
    CENTRIFUGAL_GAIN, FRICTION, GRAVITY, HEARTBEAT_KICK, SOCKET_RADIUS, SPIN_THRESHOLD,
};
use crate::sim::state::{Eye, StarState};
use crate::sim::systems::heartbeat::Beat;
use crate::util::vec2::Vec2;

/// Forces shared by both eyes this tick, already in the local frame
struct Forces {
    gravity: Vec2,
    centrifugal: f64,
    kick: Vec2,
    jolt: Vec2,
}

impl Forces {
    fn for_tick(state: &StarState, beat: Beat) -> Self {
        // World -> local is a rotation by -rotation
        let to_local = -state.rotation.to_radians();

        let spin = state.rotation_speed.abs();
        let centrifugal = if spin > SPIN_THRESHOLD {
            (spin - SPIN_THRESHOLD) * CENTRIFUGAL_GAIN
        } else {
            0.0
        };

        let kick = if beat.kick {
            Vec2::UP.rotate(to_local) * HEARTBEAT_KICK
        } else {
            Vec2::ZERO
        };

        Self {
            gravity: Vec2::DOWN.rotate(to_local) * GRAVITY,
            centrifugal,
            kick,
            jolt: state.impact_direction.rotate(to_local) * state.wall_impact,
        }
    }
}

/// Advance both pupils by one tick. No-op while eyes are disabled.
pub fn update(state: &mut StarState, beat: Beat) {
    if !state.eyes_enabled {
        return;
    }

    let forces = Forces::for_tick(state, beat);
    step_eye(&mut state.left_eye, &forces, Vec2::LEFT);
    step_eye(&mut state.right_eye, &forces, Vec2::RIGHT);
}

fn step_eye(eye: &mut Eye, forces: &Forces, outward: Vec2) {
    eye.velocity += forces.gravity;
    eye.velocity += outward * forces.centrifugal;
    eye.velocity += forces.kick;
    eye.velocity += forces.jolt;

    eye.offset += eye.velocity;
    eye.velocity *= FRICTION;

    clamp_to_socket(eye);
}

/// Keep the pupil inside the socket. The clamp is inelastic: outward
/// velocity is dropped so bouncing against the rim cannot add energy.
fn clamp_to_socket(eye: &mut Eye) {
    let len = eye.offset.length();
    if len <= SOCKET_RADIUS {
        return;
    }

    let normal = eye.offset * (1.0 / len);
    eye.offset = normal * SOCKET_RADIUS;

    let radial = eye.velocity.dot(normal);
    if radial > 0.0 {
        eye.velocity -= normal * radial;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::Display;

    const REST: Beat = Beat {
        pulse: 0.0,
        kick: false,
    };

    fn eyes_on() -> StarState {
        let mut state = StarState::new(Display::default());
        state.eyes_enabled = true;
        state.rotation_speed = 0.0;
        state
    }

    #[test]
    fn test_gravity_pulls_pupils_down() {
        let mut state = eyes_on();
        for _ in 0..600 {
            update(&mut state, REST);
        }
        for eye in [state.left_eye, state.right_eye] {
            assert!(eye.offset.y > 0.99, "offset {:?}", eye.offset);
            assert!(eye.offset.x.abs() < 1e-9);
        }
    }

    #[test]
    fn test_gravity_is_relative_to_rotation() {
        // Star turned 90 degrees clockwise: its local +x now points world-down
        let mut state = eyes_on();
        state.rotation = 90.0;
        for _ in 0..600 {
            update(&mut state, REST);
        }
        assert!(state.right_eye.offset.x > 0.99);
        assert!(state.right_eye.offset.y.abs() < 1e-6);
    }

    #[test]
    fn test_centrifugal_pushes_outward() {
        let mut state = eyes_on();
        state.rotation_speed = 12.0;
        update(&mut state, REST);
        assert!(state.left_eye.offset.x < 0.0);
        assert!(state.right_eye.offset.x > 0.0);
    }

    #[test]
    fn test_no_centrifugal_below_threshold() {
        let mut state = eyes_on();
        state.rotation_speed = 2.0;
        update(&mut state, REST);
        assert_eq!(state.left_eye.offset.x, 0.0);
        assert_eq!(state.right_eye.offset.x, 0.0);
    }

    #[test]
    fn test_heartbeat_kick_is_upward() {
        let mut kicked = eyes_on();
        let mut plain = eyes_on();
        update(&mut kicked, Beat { pulse: 0.0, kick: true });
        update(&mut plain, REST);
        let diff = kicked.right_eye.velocity.y - plain.right_eye.velocity.y;
        assert!((diff + HEARTBEAT_KICK * FRICTION).abs() < 1e-12);
    }

    #[test]
    fn test_wall_jolt_toward_wall() {
        let mut state = eyes_on();
        state.wall_impact = 0.02;
        state.impact_direction = Vec2::RIGHT;
        update(&mut state, REST);
        assert!(state.left_eye.offset.x > 0.0);
        assert!(state.right_eye.offset.x > 0.0);
    }

    #[test]
    fn test_disabled_eyes_freeze() {
        let mut state = eyes_on();
        for _ in 0..30 {
            update(&mut state, REST);
        }
        let frozen = (state.left_eye, state.right_eye);

        state.eyes_enabled = false;
        state.rotation_speed = 15.0;
        for _ in 0..30 {
            update(&mut state, REST);
        }
        assert_eq!((state.left_eye, state.right_eye), frozen);

        state.eyes_enabled = true;
        update(&mut state, REST);
        assert_ne!(state.left_eye, frozen.0);
    }

    #[test]
    fn test_clamp_drops_outward_velocity() {
        let mut eye = Eye {
            offset: Vec2::new(2.0, 0.0),
            velocity: Vec2::new(0.5, 0.25),
        };
        clamp_to_socket(&mut eye);
        assert_eq!(eye.offset, Vec2::new(1.0, 0.0));
        assert_eq!(eye.velocity, Vec2::new(0.0, 0.25));
    }

    #[test]
    fn test_clamp_keeps_inward_velocity() {
        let mut eye = Eye {
            offset: Vec2::new(0.0, -3.0),
            velocity: Vec2::new(0.0, 0.1),
        };
        clamp_to_socket(&mut eye);
        assert_eq!(eye.velocity, Vec2::new(0.0, 0.1));
    }

    #[test]
    fn test_stays_in_socket_under_stress() {
        let mut state = eyes_on();
        let walls = [Vec2::LEFT, Vec2::UP, Vec2::RIGHT, Vec2::DOWN];
        for i in 0..10_000u32 {
            state.rotation_speed = if i % 500 < 250 { 20.0 } else { -35.0 };
            state.rotation += state.rotation_speed;
            if i % 7 == 0 {
                state.wall_impact = 0.02;
                state.impact_direction = walls[(i / 7) as usize % 4];
            } else {
                state.wall_impact *= 0.85;
            }
            let beat = Beat {
                pulse: 0.0,
                kick: i % 240 == 0,
            };
            update(&mut state, beat);
            for eye in [state.left_eye, state.right_eye] {
                assert!(eye.offset.length() <= SOCKET_RADIUS + 1e-12);
                assert!(eye.offset.is_finite() && eye.velocity.is_finite());
            }
        }
    }
}
