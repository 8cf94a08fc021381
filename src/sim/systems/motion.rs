//! DVD-logo motion: linear integration with axis-aligned wall reflection

use crate::sim::constants::{heartbeat, impact, star};
use crate::sim::state::{Display, StarState};
use crate::util::vec2::Vec2;

/// Display edge the star ran into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wall {
    Left,
    Right,
    Top,
    Bottom,
}

impl Wall {
    /// Unit vector pointing from the display into this wall
    pub fn direction(&self) -> Vec2 {
        match self {
            Wall::Left => Vec2::LEFT,
            Wall::Right => Vec2::RIGHT,
            Wall::Top => Vec2::UP,
            Wall::Bottom => Vec2::DOWN,
        }
    }
}

/// Walls hit this tick, at most one per axis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotionOutcome {
    pub x_wall: Option<Wall>,
    pub y_wall: Option<Wall>,
}

impl MotionOutcome {
    pub fn collided(&self) -> bool {
        self.x_wall.is_some() || self.y_wall.is_some()
    }

    /// Unit direction toward the wall(s) hit; zero when nothing was hit
    pub fn impact_direction(&self) -> Vec2 {
        let sum = self.x_wall.map(|w| w.direction()).unwrap_or(Vec2::ZERO)
            + self.y_wall.map(|w| w.direction()).unwrap_or(Vec2::ZERO);
        sum.normalize()
    }
}

/// Advance position by velocity and bounce off the display edges.
///
/// The collision box uses the pulsed size so the star never visibly
/// overlaps an edge at the top of a heartbeat.
pub fn update(state: &mut StarState, display: Display) -> MotionOutcome {
    let radius = state.half_extent();
    let pad = star::WALL_PADDING;
    let mut next = state.position + state.velocity;
    let mut outcome = MotionOutcome::default();

    let (min_x, max_x) = (radius + pad, display.width - radius - pad);
    if min_x > max_x {
        // Display narrower than the star: pin to center, nothing to bounce off
        next.x = display.width / 2.0;
    } else if next.x < min_x {
        state.velocity.x = state.velocity.x.abs();
        next.x = min_x;
        outcome.x_wall = Some(Wall::Left);
    } else if next.x > max_x {
        state.velocity.x = -state.velocity.x.abs();
        next.x = max_x;
        outcome.x_wall = Some(Wall::Right);
    }

    let (min_y, max_y) = (radius + pad, display.height - radius - pad);
    if min_y > max_y {
        next.y = display.height / 2.0;
    } else if next.y < min_y {
        state.velocity.y = state.velocity.y.abs();
        next.y = min_y;
        outcome.y_wall = Some(Wall::Top);
    } else if next.y > max_y {
        state.velocity.y = -state.velocity.y.abs();
        next.y = max_y;
        outcome.y_wall = Some(Wall::Bottom);
    }

    state.position = next;

    if outcome.collided() {
        state.wall_impact = impact::INITIAL;
        state.impact_direction = outcome.impact_direction();
    }

    outcome
}

/// Move the star inside the bounce envelope without touching its velocity.
///
/// Sized for the heartbeat peak so pulse growth over the next ticks cannot
/// put the box back against a wall.
pub fn settle_inside(state: &mut StarState, display: Display) {
    let reach = star::BASE_SIZE * state.scale * (1.0 + heartbeat::PEAK) / 2.0 + star::WALL_PADDING;
    state.position = Vec2::new(
        settle_axis(state.position.x, reach, display.width),
        settle_axis(state.position.y, reach, display.height),
    );
}

fn settle_axis(value: f64, reach: f64, extent: f64) -> f64 {
    if 2.0 * reach > extent {
        extent / 2.0
    } else {
        value.clamp(reach, extent - reach)
    }
}

/// Spin the star by its rotation speed
pub fn advance_rotation(state: &mut StarState) {
    state.rotation += state.rotation_speed;
}

/// Decay the wall impulse; runs every tick whether or not eyes are on
pub fn decay_impact(state: &mut StarState) {
    state.wall_impact *= impact::DECAY;
    if state.wall_impact < impact::EPSILON {
        state.wall_impact = 0.0;
    }
}
