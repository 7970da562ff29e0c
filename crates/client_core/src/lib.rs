use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc, Mutex as StdMutex, Weak,
};

use shared::protocol::{START_FAILED_TEXT, START_IN_PROGRESS_TEXT};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

pub mod error;
pub mod transport;
pub mod types;

pub use error::TransportError;
pub use transport::{DeviceApi, HttpDeviceApi};
pub use types::{
    CommandOutcome, ControllerEvent, ControllerOptions, DisplayState, PollOutcome,
    PollOverlapPolicy,
};

const MIN_POLL_INTERVAL: time::Duration = time::Duration::from_millis(1);

struct ControllerState {
    display: DisplayState,
    last_applied_seq: u64,
}

/// Drives the START command and the blink-count poll for one panel.
///
/// The controller owns the display state. `start` begins the recurring poll;
/// `stop`, or dropping the controller, tears the timer down.
pub struct UiController {
    api: Arc<dyn DeviceApi>,
    options: ControllerOptions,
    state: Mutex<ControllerState>,
    events: broadcast::Sender<ControllerEvent>,
    next_poll_seq: AtomicU64,
    poll_in_flight: AtomicBool,
    timer: StdMutex<Option<JoinHandle<()>>>,
}

impl UiController {
    pub fn new(api: Arc<dyn DeviceApi>, options: ControllerOptions) -> Arc<Self> {
        let (events, _) = broadcast::channel(options.event_capacity.max(1));
        Arc::new(Self {
            api,
            options,
            state: Mutex::new(ControllerState {
                display: DisplayState::default(),
                last_applied_seq: 0,
            }),
            events,
            next_poll_seq: AtomicU64::new(1),
            poll_in_flight: AtomicBool::new(false),
            timer: StdMutex::new(None),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> DisplayState {
        self.state.lock().await.display.clone()
    }

    /// Starts the recurring poll. The first poll runs one full interval from
    /// now. Restarting replaces a running timer.
    pub fn start(self: &Arc<Self>) {
        let period = self.options.poll_interval.max(MIN_POLL_INTERVAL);
        let controller = Arc::downgrade(self);
        let first_tick = Instant::now() + period;
        let handle = tokio::spawn(run_poll_timer(controller, first_tick, period));

        let previous = self
            .timer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
        info!(
            interval_ms = period.as_millis() as u64,
            policy = %self.options.overlap_policy,
            "blink count polling started"
        );
    }

    /// Stops the recurring poll. Polls already in flight may still land.
    pub fn stop(&self) {
        let handle = self
            .timer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = handle {
            handle.abort();
            info!("blink count polling stopped");
        }
    }

    pub fn is_polling(&self) -> bool {
        self.timer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub async fn send_start_command(&self) -> CommandOutcome {
        self.set_status(START_IN_PROGRESS_TEXT).await;

        match self.api.start_command().await {
            Ok(response) => {
                info!(message = %response.message, "start command answered");
                self.set_status(&response.message).await;
                CommandOutcome::Delivered(response.message)
            }
            Err(error) => {
                warn!(%error, endpoint = error.endpoint(), "failed to send start command");
                self.set_status(START_FAILED_TEXT).await;
                CommandOutcome::Failed
            }
        }
    }

    pub async fn update_blink_count(&self) -> PollOutcome {
        let _in_flight = if self.options.overlap_policy == PollOverlapPolicy::SkipWhileInFlight {
            let Some(guard) = InFlightGuard::acquire(&self.poll_in_flight) else {
                debug!("previous count poll still outstanding; skipping tick");
                return PollOutcome::Skipped;
            };
            Some(guard)
        } else {
            None
        };

        let seq = self.next_poll_seq.fetch_add(1, Ordering::Relaxed);
        let count = match self.api.get_count().await {
            Ok(response) => response.count,
            Err(error) => {
                error!(%error, endpoint = error.endpoint(), seq, "could not fetch count");
                return PollOutcome::Failed;
            }
        };

        let mut state = self.state.lock().await;
        if self.options.overlap_policy == PollOverlapPolicy::DiscardStale
            && seq <= state.last_applied_seq
        {
            debug!(
                seq,
                last_applied = state.last_applied_seq,
                count,
                "discarding stale count"
            );
            return PollOutcome::Stale(count);
        }

        state.last_applied_seq = state.last_applied_seq.max(seq);
        if state.display.blink_count != Some(count) {
            debug!(count, seq, "blink count updated");
        }
        state.display.blink_count = Some(count);
        // Sent under the lock so event order matches the order of state writes.
        let _ = self.events.send(ControllerEvent::CountChanged(count));
        PollOutcome::Applied(count)
    }

    async fn set_status(&self, text: &str) {
        let mut state = self.state.lock().await;
        state.display.status_text = text.to_string();
        let _ = self
            .events
            .send(ControllerEvent::StatusChanged(text.to_string()));
    }
}

impl Drop for UiController {
    fn drop(&mut self) {
        let handle = self
            .timer
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

async fn run_poll_timer(
    controller: Weak<UiController>,
    first_tick: Instant,
    period: time::Duration,
) {
    let mut ticker = time::interval_at(first_tick, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let Some(controller) = controller.upgrade() else {
            break;
        };
        tokio::spawn(async move {
            controller.update_blink_count().await;
        });
    }
}

/// Clears the in-flight flag when the poll finishes or is cancelled.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
