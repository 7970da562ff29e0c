use std::{fmt, str::FromStr, time::Duration};

use thiserror::Error;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);
const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Last-known values shown on the panel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayState {
    pub status_text: String,
    pub blink_count: Option<i64>,
}

impl DisplayState {
    /// Text of the count region; empty until the first successful poll.
    pub fn count_text(&self) -> String {
        self.blink_count
            .map(|count| count.to_string())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    StatusChanged(String),
    CountChanged(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Delivered(String),
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Applied(i64),
    /// A newer poll had already been applied; the value was dropped.
    Stale(i64),
    /// An earlier poll was still outstanding; no request was made.
    Skipped,
    Failed,
}

/// What to do when a poll tick fires while earlier polls are outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollOverlapPolicy {
    /// Every tick polls and whichever response arrives last is displayed.
    #[default]
    LastArrivalWins,
    SkipWhileInFlight,
    /// Responses older than the latest applied one are dropped.
    DiscardStale,
}

impl PollOverlapPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            PollOverlapPolicy::LastArrivalWins => "last-arrival-wins",
            PollOverlapPolicy::SkipWhileInFlight => "skip-while-in-flight",
            PollOverlapPolicy::DiscardStale => "discard-stale",
        }
    }
}

impl fmt::Display for PollOverlapPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "unknown overlap policy '{0}' (expected last-arrival-wins, skip-while-in-flight or discard-stale)"
)]
pub struct UnknownOverlapPolicy(pub String);

impl FromStr for PollOverlapPolicy {
    type Err = UnknownOverlapPolicy;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "last-arrival-wins" | "last-arrival" => Ok(PollOverlapPolicy::LastArrivalWins),
            "skip-while-in-flight" | "skip" => Ok(PollOverlapPolicy::SkipWhileInFlight),
            "discard-stale" | "sequence" => Ok(PollOverlapPolicy::DiscardStale),
            _ => Err(UnknownOverlapPolicy(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub poll_interval: Duration,
    pub overlap_policy: PollOverlapPolicy,
    pub event_capacity: usize,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            overlap_policy: PollOverlapPolicy::default(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}
