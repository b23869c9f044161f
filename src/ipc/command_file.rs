use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `motor_command.json`: last command wins, idempotent on `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotorCommand {
    pub id: Uuid,
    #[serde(flatten)]
    pub kind: CommandKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum CommandKind {
    Goto {
        angle: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        speed: Option<f64>,
    },
    Jog {
        delta: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        speed: Option<f64>,
    },
    Stop,
    Continuous {
        direction: Direction,
    },
    TrackingStart {
        object: String,
        #[serde(default)]
        skip_goto: bool,
    },
    TrackingStop,
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Cw,
    Ccw,
}

impl Direction {
    pub fn forward(self) -> bool {
        matches!(self, Direction::Cw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goto_command_round_trips() {
        let cmd = MotorCommand {
            id: Uuid::new_v4(),
            kind: CommandKind::Goto {
                angle: 180.0,
                speed: Some(0.002),
            },
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains("\"command\":\"goto\""));
        let back: MotorCommand = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, cmd.id);
    }

    #[test]
    fn continuous_command_parses_direction() {
        let json = r#"{"id":"00000000-0000-0000-0000-000000000000","command":"continuous","direction":"cw"}"#;
        let cmd: MotorCommand = serde_json::from_str(json).unwrap();
        assert!(matches!(
            cmd.kind,
            CommandKind::Continuous {
                direction: Direction::Cw
            }
        ));
    }
}
