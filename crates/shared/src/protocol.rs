use serde::{Deserialize, Serialize};

pub const START_COMMAND_PATH: &str = "/start-command";
pub const GET_COUNT_PATH: &str = "/get-count";

/// Status text shown while a START request is outstanding.
pub const START_IN_PROGRESS_TEXT: &str = "Sending START command to PicoW...";
/// Status text shown when a START request fails for any reason.
pub const START_FAILED_TEXT: &str = "Error sending command.";

pub mod element_ids {
    pub const START_BUTTON: &str = "startButton";
    pub const STATUS: &str = "status";
    pub const BLINK_COUNT: &str = "blinkCount";
}

/// Body of a successful `GET /start-command`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub message: String,
}

/// Body of a successful `GET /get-count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: i64,
}
