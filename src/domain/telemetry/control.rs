//! Outbound control frames (client → server).
//!
//! Two shapes exist on the wire:
//! - `{"type": "config", "value": {"paused": bool}}`
//! - `{"action": string, "game"?: string}`

use serde::Serialize;

use crate::domain::foundation::Game;

/// Any frame the control channel can push to the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ControlMessage {
    Typed(TypedControl),
    Action(ActionCommand),
}

/// Control frames tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TypedControl {
    /// Runtime configuration change.
    Config { value: ConfigValue },
}

/// Payload of a `config` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConfigValue {
    pub paused: bool,
}

/// Fire-and-forget action command. Carries no sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionCommand {
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game: Option<Game>,
}

/// Inference lifecycle actions understood by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InferenceAction {
    Start,
    Pause,
    Stop,
}

impl InferenceAction {
    /// Wire name of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            InferenceAction::Start => "start_inference",
            InferenceAction::Pause => "pause_inference",
            InferenceAction::Stop => "stop_inference",
        }
    }
}

impl ControlMessage {
    /// Builds a pause/resume frame.
    pub fn paused(paused: bool) -> Self {
        ControlMessage::Typed(TypedControl::Config {
            value: ConfigValue { paused },
        })
    }

    /// Builds an action frame.
    pub fn action(action: impl Into<String>, game: Option<Game>) -> Self {
        ControlMessage::Action(ActionCommand {
            action: action.into(),
            game,
        })
    }

    /// Builds an inference lifecycle frame.
    pub fn inference(action: InferenceAction, game: Game) -> Self {
        Self::action(action.as_str(), Some(game))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pause_frame_matches_wire_shape() {
        let value = serde_json::to_value(ControlMessage::paused(true)).unwrap();
        assert_eq!(value, json!({"type": "config", "value": {"paused": true}}));
    }

    #[test]
    fn resume_frame_matches_wire_shape() {
        let value = serde_json::to_value(ControlMessage::paused(false)).unwrap();
        assert_eq!(value, json!({"type": "config", "value": {"paused": false}}));
    }

    #[test]
    fn action_frame_includes_game_when_present() {
        let value =
            serde_json::to_value(ControlMessage::inference(InferenceAction::Start, Game::Snake))
                .unwrap();
        assert_eq!(value, json!({"action": "start_inference", "game": "snake"}));
    }

    #[test]
    fn action_frame_omits_missing_game() {
        let value = serde_json::to_value(ControlMessage::action("reset", None)).unwrap();
        assert_eq!(value, json!({"action": "reset"}));
    }

    #[test]
    fn action_frames_carry_no_seq() {
        let value = serde_json::to_value(ControlMessage::action("reset", None)).unwrap();
        assert!(value.get("seq").is_none());
    }
}
