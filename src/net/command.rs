//! Command gateway: turns an external `{action, parameters}` request into a
//! validated `Command`. Nothing in here touches the simulation, so a
//! rejected request can never leave partial state behind.

use serde_json::{Map, Value};

use crate::net::protocol::ManipulateRequest;
use crate::sim::state::Rgb;
use crate::sim::systems::effects::Command;

/// Every action the API accepts
pub const ACTIONS: [&str; 8] = [
    "shrink",
    "spin_out",
    "drill",
    "corner_trap",
    "color",
    "opacity",
    "googly_eyes",
    "reset",
];

/// Reasons a manipulation request is rejected
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown action '{0}'. Valid: {actions}", actions = ACTIONS.join(", "))]
    UnknownAction(String),
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("Malformed request body: {0}")]
    MalformedBody(String),
}

impl CommandError {
    fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        CommandError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Parse a raw JSON request body
pub fn parse_body(body: &[u8]) -> Result<Command, CommandError> {
    let request: ManipulateRequest = if body.iter().all(u8::is_ascii_whitespace) {
        ManipulateRequest::default()
    } else {
        serde_json::from_slice(body).map_err(|e| CommandError::MalformedBody(e.to_string()))?
    };
    parse_request(&request)
}

pub fn parse_request(request: &ManipulateRequest) -> Result<Command, CommandError> {
    let action = request
        .action
        .as_deref()
        .ok_or_else(|| CommandError::invalid("action", "missing"))?;

    let empty = Map::new();
    let params = match &request.parameters {
        None | Some(Value::Null) => &empty,
        Some(Value::Object(map)) => map,
        Some(_) => return Err(CommandError::invalid("parameters", "expected an object")),
    };

    parse_action(action, params)
}

pub fn parse_action(action: &str, params: &Map<String, Value>) -> Result<Command, CommandError> {
    match action {
        "shrink" => Ok(Command::Shrink),
        "spin_out" => Ok(Command::SpinOut),
        "drill" => Ok(Command::Drill),
        "corner_trap" => Ok(Command::CornerTrap),
        "reset" => Ok(Command::Reset),
        "color" => parse_color(params).map(Command::Color),
        "opacity" => parse_opacity(params).map(Command::Opacity),
        "googly_eyes" => parse_enabled(params).map(Command::GooglyEyes),
        other => Err(CommandError::UnknownAction(other.to_string())),
    }
}

fn parse_color(params: &Map<String, Value>) -> Result<Rgb, CommandError> {
    match params.get("color") {
        Some(Value::String(s)) => s
            .parse::<Rgb>()
            .map_err(|e| CommandError::invalid("color", e.to_string())),
        Some(other) => Err(CommandError::invalid(
            "color",
            format!("expected a string, got {}", other),
        )),
        None => Err(CommandError::invalid("color", "missing")),
    }
}

fn parse_opacity(params: &Map<String, Value>) -> Result<f64, CommandError> {
    let value = params
        .get("opacity")
        .ok_or_else(|| CommandError::invalid("opacity", "missing"))?;
    let opacity = value
        .as_f64()
        .ok_or_else(|| CommandError::invalid("opacity", format!("expected a number, got {}", value)))?;
    if !(0.0..=1.0).contains(&opacity) {
        return Err(CommandError::invalid(
            "opacity",
            format!("{} is outside [0, 1]", opacity),
        ));
    }
    Ok(opacity)
}

fn parse_enabled(params: &Map<String, Value>) -> Result<bool, CommandError> {
    match params.get("enabled") {
        Some(Value::Bool(enabled)) => Ok(*enabled),
        Some(other) => Err(CommandError::invalid(
            "enabled",
            format!("expected true or false, got {}", other),
        )),
        None => Err(CommandError::invalid("enabled", "missing")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Command, CommandError> {
        parse_body(json.as_bytes())
    }

    #[test]
    fn test_parameterless_actions() {
        assert_eq!(parse(r#"{"action":"shrink"}"#), Ok(Command::Shrink));
        assert_eq!(parse(r#"{"action":"spin_out","parameters":{}}"#), Ok(Command::SpinOut));
        assert_eq!(parse(r#"{"action":"drill","parameters":null}"#), Ok(Command::Drill));
        assert_eq!(parse(r#"{"action":"corner_trap"}"#), Ok(Command::CornerTrap));
        assert_eq!(parse(r#"{"action":"reset"}"#), Ok(Command::Reset));
    }

    #[test]
    fn test_every_listed_action_parses_with_valid_parameters() {
        let params: Map<String, Value> = serde_json::from_str(
            r##"{"color":"#ffffff","opacity":0.5,"enabled":true}"##,
        )
        .unwrap();
        for action in ACTIONS {
            let command = parse_action(action, &params).unwrap();
            assert_eq!(command.action(), action);
        }
    }

    #[test]
    fn test_color() {
        assert_eq!(
            parse(r##"{"action":"color","parameters":{"color":"#ff0000"}}"##),
            Ok(Command::Color(Rgb::new(255, 0, 0)))
        );
        assert!(matches!(
            parse(r##"{"action":"color","parameters":{"color":"#ff00"}}"##),
            Err(CommandError::InvalidParameter { name: "color", .. })
        ));
        assert!(matches!(
            parse(r#"{"action":"color","parameters":{"color":16711680}}"#),
            Err(CommandError::InvalidParameter { name: "color", .. })
        ));
        assert!(matches!(
            parse(r#"{"action":"color"}"#),
            Err(CommandError::InvalidParameter { name: "color", .. })
        ));
    }

    #[test]
    fn test_opacity_range() {
        assert_eq!(
            parse(r#"{"action":"opacity","parameters":{"opacity":0}}"#),
            Ok(Command::Opacity(0.0))
        );
        assert_eq!(
            parse(r#"{"action":"opacity","parameters":{"opacity":1}}"#),
            Ok(Command::Opacity(1.0))
        );
        let err = parse(r#"{"action":"opacity","parameters":{"opacity":1.5}}"#).unwrap_err();
        assert!(matches!(err, CommandError::InvalidParameter { name: "opacity", .. }));
        assert!(parse(r#"{"action":"opacity","parameters":{"opacity":-0.1}}"#).is_err());
        assert!(parse(r#"{"action":"opacity","parameters":{"opacity":"0.5"}}"#).is_err());
    }

    #[test]
    fn test_googly_eyes() {
        assert_eq!(
            parse(r#"{"action":"googly_eyes","parameters":{"enabled":false}}"#),
            Ok(Command::GooglyEyes(false))
        );
        assert!(parse(r#"{"action":"googly_eyes","parameters":{"enabled":"yes"}}"#).is_err());
        assert!(parse(r#"{"action":"googly_eyes"}"#).is_err());
    }

    #[test]
    fn test_unknown_action() {
        let err = parse(r#"{"action":"teleport"}"#).unwrap_err();
        assert_eq!(err, CommandError::UnknownAction("teleport".to_string()));
        assert!(err.to_string().contains("teleport"));
        assert!(err.to_string().contains("corner_trap"));
    }

    #[test]
    fn test_missing_action() {
        assert!(matches!(
            parse("{}"),
            Err(CommandError::InvalidParameter { name: "action", .. })
        ));
        assert!(matches!(
            parse(""),
            Err(CommandError::InvalidParameter { name: "action", .. })
        ));
    }

    #[test]
    fn test_malformed_body() {
        assert!(matches!(parse("{not json"), Err(CommandError::MalformedBody(_))));
        assert!(matches!(
            parse(r#"{"action":"shrink","parameters":[1,2]}"#),
            Err(CommandError::InvalidParameter { name: "parameters", .. })
        ));
    }
}
