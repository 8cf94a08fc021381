use serde::{Deserialize, Serialize};

use crate::sim::Simulation;

/// Body of `POST /api/manipulate_star`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManipulateRequest {
    pub action: Option<String>,
    /// Free-form; each action validates the keys it needs
    #[serde(default)]
    pub parameters: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub vx: f64,
    pub vy: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySize {
    pub width: u32,
    pub height: u32,
}

/// JSON snapshot served by `/api/status` and returned after every command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarStatus {
    pub position: Position,
    pub velocity: Velocity,
    pub scale: f64,
    pub rotation: f64,
    pub rotation_speed: f64,
    /// `#rrggbb`
    pub color: String,
    pub opacity: f64,
    /// Exclusive effect name, `null` when idle
    pub effect_active: Option<String>,
    pub corner_trapped: bool,
    pub eyes_enabled: bool,
    pub heartbeat_pulse: f64,
    pub wall_impact: f64,
    pub display_size: DisplaySize,
}

impl StarStatus {
    pub fn from_simulation(sim: &Simulation) -> Self {
        let state = sim.state();
        let display = sim.display();
        Self {
            position: Position {
                x: state.position.x,
                y: state.position.y,
            },
            velocity: Velocity {
                vx: state.velocity.x,
                vy: state.velocity.y,
            },
            scale: state.scale,
            rotation: state.rotation,
            rotation_speed: state.rotation_speed,
            color: state.color.to_string(),
            opacity: state.opacity,
            effect_active: state.active_effect().map(|kind| kind.as_str().to_string()),
            corner_trapped: state.corner_trapped,
            eyes_enabled: state.eyes_enabled,
            heartbeat_pulse: state.heartbeat_pulse,
            wall_impact: state.wall_impact,
            display_size: DisplaySize {
                width: display.width.round() as u32,
                height: display.height.round() as u32,
            },
        }
    }
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub service: &'static str,
    pub running: bool,
}

impl Health {
    pub fn healthy() -> Self {
        Self {
            status: "healthy",
            service: "Star Theater",
            running: true,
        }
    }
}

/// Body of every 4xx/5xx JSON response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::Display;
    use crate::sim::systems::effects::Command;

    #[test]
    fn test_status_field_names() {
        let sim = Simulation::new(Display::new(1280.0, 720.0), 0);
        let value = serde_json::to_value(StarStatus::from_simulation(&sim)).unwrap();

        for key in [
            "position",
            "velocity",
            "scale",
            "rotation",
            "rotation_speed",
            "color",
            "opacity",
            "effect_active",
            "corner_trapped",
            "eyes_enabled",
            "heartbeat_pulse",
            "wall_impact",
            "display_size",
        ] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(value["position"]["x"], 640.0);
        assert_eq!(value["velocity"]["vy"], 0.5);
        assert_eq!(value["color"], "#c04015");
        assert!(value["effect_active"].is_null());
        assert_eq!(value["display_size"]["width"], 1280);
        assert_eq!(value["display_size"]["height"], 720);
    }

    #[test]
    fn test_status_reports_active_effect() {
        let mut sim = Simulation::new(Display::default(), 0);
        sim.apply(Command::SpinOut);
        let status = StarStatus::from_simulation(&sim);
        assert_eq!(status.effect_active.as_deref(), Some("spin_out"));
    }

    #[test]
    fn test_manipulate_request_parameters_optional() {
        let req: ManipulateRequest = serde_json::from_str(r#"{"action":"shrink"}"#).unwrap();
        assert_eq!(req.action.as_deref(), Some("shrink"));
        assert!(req.parameters.is_none());

        let req: ManipulateRequest = serde_json::from_str("{}").unwrap();
        assert!(req.action.is_none());
    }
}
