//! Text rendering of the panel's display regions.

use client_core::{ControllerEvent, DisplayState};
use shared::domain::DisplayRegion;

pub fn region_line(region: DisplayRegion, text: &str) -> String {
    format!("{:>10} | {text}", region.element_id())
}

pub fn render_event(event: &ControllerEvent) -> String {
    match event {
        ControllerEvent::StatusChanged(text) => region_line(DisplayRegion::Status, text),
        ControllerEvent::CountChanged(count) => {
            region_line(DisplayRegion::BlinkCount, &count.to_string())
        }
    }
}

pub fn render_state(state: &DisplayState) -> String {
    format!(
        "{}\n{}",
        region_line(DisplayRegion::Status, &state.status_text),
        region_line(DisplayRegion::BlinkCount, &state.count_text())
    )
}

pub fn start_hint() -> String {
    region_line(DisplayRegion::StartButton, "type 's' + Enter to send START")
}

/// Whether a line typed on stdin presses the start button.
pub fn is_start_input(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "s" | "start")
}
