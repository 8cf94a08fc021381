//! Star state definitions
//!
//! `StarState` is the single aggregate the simulation owns: physical state,
//! the exclusive effect slot, the two overlay timers and the eye physics.
//! Rendering and status queries read it; only the simulation systems write it.

use std::fmt;
use std::str::FromStr;

use crate::sim::constants::star;
use crate::util::vec2::Vec2;

/// Simulated display size in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Display {
    pub width: f64,
    pub height: f64,
}

impl Display {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }
}

impl Default for Display {
    fn default() -> Self {
        Self::new(1280.0, 720.0)
    }
}

/// 24-bit render color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Default star color, `#c04015`
    pub const DEFAULT: Rgb = Rgb::new(0xc0, 0x40, 0x15);
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Error parsing a `#rrggbb` color
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected a color like \"#rrggbb\", got \"{0}\"")]
pub struct ParseColorError(pub String);

impl FromStr for Rgb {
    type Err = ParseColorError;

    /// Accepts `#rrggbb` or bare `rrggbb`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ParseColorError(s.to_string()));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ParseColorError(s.to_string()))
        };
        Ok(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

/// One of the four display corners
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    /// Trap point for this corner, `inset` px in from both edges
    pub fn point(&self, display: Display, inset: f64) -> Vec2 {
        let (left, right) = (inset, display.width - inset);
        let (top, bottom) = (inset, display.height - inset);
        match self {
            Corner::TopLeft => Vec2::new(left, top),
            Corner::TopRight => Vec2::new(right, top),
            Corner::BottomLeft => Vec2::new(left, bottom),
            Corner::BottomRight => Vec2::new(right, bottom),
        }
    }

    /// Unit-sign direction pointing from this corner into the display
    pub fn away(&self) -> Vec2 {
        match self {
            Corner::TopLeft => Vec2::new(1.0, 1.0),
            Corner::TopRight => Vec2::new(-1.0, 1.0),
            Corner::BottomLeft => Vec2::new(1.0, -1.0),
            Corner::BottomRight => Vec2::new(-1.0, -1.0),
        }
    }
}

/// Name of an exclusive manipulation effect, as exposed by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    Shrink,
    SpinOut,
    Drill,
    CornerTrap,
}

impl EffectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EffectKind::Shrink => "shrink",
            EffectKind::SpinOut => "spin_out",
            EffectKind::Drill => "drill",
            EffectKind::CornerTrap => "corner_trap",
        }
    }

    /// Gauge value used by the metrics endpoint (0 is idle)
    pub fn gauge(kind: Option<EffectKind>) -> u64 {
        match kind {
            None => 0,
            Some(EffectKind::Shrink) => 1,
            Some(EffectKind::SpinOut) => 2,
            Some(EffectKind::Drill) => 3,
            Some(EffectKind::CornerTrap) => 4,
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Occupant of the exclusive effect slot, with its own progress.
///
/// `elapsed` counts ticks since the effect began. Each variant also carries
/// whatever it needs to put the star back when it ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActiveEffect {
    Shrink {
        elapsed: u32,
        /// Scale at the moment the shrink began
        from_scale: f64,
    },
    SpinOut {
        elapsed: u32,
    },
    Drill {
        elapsed: u32,
        saved_velocity: Vec2,
    },
    CornerTrap {
        elapsed: u32,
        corner: Corner,
        saved_velocity: Vec2,
    },
}

impl ActiveEffect {
    pub fn kind(&self) -> EffectKind {
        match self {
            ActiveEffect::Shrink { .. } => EffectKind::Shrink,
            ActiveEffect::SpinOut { .. } => EffectKind::SpinOut,
            ActiveEffect::Drill { .. } => EffectKind::Drill,
            ActiveEffect::CornerTrap { .. } => EffectKind::CornerTrap,
        }
    }

    pub fn elapsed(&self) -> u32 {
        match *self {
            ActiveEffect::Shrink { elapsed, .. }
            | ActiveEffect::SpinOut { elapsed }
            | ActiveEffect::Drill { elapsed, .. }
            | ActiveEffect::CornerTrap { elapsed, .. } => elapsed,
        }
    }
}

/// Countdown for a timed overlay (color / opacity)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayTimer {
    pub remaining: u32,
}

impl OverlayTimer {
    pub fn new(ticks: u32) -> Self {
        Self { remaining: ticks }
    }

    /// Count down one tick. Returns true when the overlay just expired.
    pub fn tick(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining == 0
    }
}

/// Pupil state for one googly eye, in socket units
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Eye {
    pub offset: Vec2,
    pub velocity: Vec2,
}

/// The aggregate star snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct StarState {
    // === Motion ===
    /// Logo center, display pixels
    pub position: Vec2,
    /// px/tick
    pub velocity: Vec2,
    /// Multiplier on BASE_SIZE, excluding the heartbeat pulse
    pub scale: f64,
    /// Degrees, unbounded
    pub rotation: f64,
    /// Degrees per tick, signed
    pub rotation_speed: f64,

    // === Appearance ===
    pub color: Rgb,
    /// Always within [0, 1]
    pub opacity: f64,

    // === Effects ===
    pub effect: Option<ActiveEffect>,
    pub color_timer: Option<OverlayTimer>,
    pub opacity_timer: Option<OverlayTimer>,
    pub corner_trapped: bool,
    pub trapped_corner: Option<Corner>,

    // === Eyes ===
    pub eyes_enabled: bool,
    pub left_eye: Eye,
    pub right_eye: Eye,

    // === Signals ===
    /// Current heartbeat contribution, in [0, 0.08]
    pub heartbeat_pulse: f64,
    /// Decaying collision impulse, in [0, 0.02]
    pub wall_impact: f64,
    /// Unit direction of the last wall hit, toward the wall
    pub impact_direction: Vec2,
}

impl StarState {
    /// Documented defaults: centered, drifting down-right, no effects
    pub fn new(display: Display) -> Self {
        Self {
            position: display.center(),
            velocity: Vec2::new(star::DEFAULT_SPEED, star::DEFAULT_SPEED),
            scale: 1.0,
            rotation: 0.0,
            rotation_speed: star::DEFAULT_ROTATION_SPEED,
            color: Rgb::DEFAULT,
            opacity: 1.0,
            effect: None,
            color_timer: None,
            opacity_timer: None,
            corner_trapped: false,
            trapped_corner: None,
            eyes_enabled: false,
            left_eye: Eye::default(),
            right_eye: Eye::default(),
            heartbeat_pulse: 0.0,
            wall_impact: 0.0,
            impact_direction: Vec2::ZERO,
        }
    }

    pub fn active_effect(&self) -> Option<EffectKind> {
        self.effect.map(|e| e.kind())
    }

    /// Ticks since the active effect began (0 when idle)
    pub fn effect_elapsed(&self) -> u32 {
        self.effect.map(|e| e.elapsed()).unwrap_or(0)
    }

    /// Scale including the heartbeat pulse
    pub fn effective_scale(&self) -> f64 {
        self.scale * (1.0 + self.heartbeat_pulse)
    }

    /// Half the rendered size, in pixels
    pub fn half_extent(&self) -> f64 {
        star::BASE_SIZE * self.effective_scale() / 2.0
    }

    /// True while an effect holds the star in place
    pub fn motion_locked(&self) -> bool {
        matches!(
            self.effect,
            Some(ActiveEffect::Drill { .. }) | Some(ActiveEffect::CornerTrap { .. })
        )
    }
}
