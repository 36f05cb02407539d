//! Interval-driven refresh with a single owned timer.
use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use flipper_logging::{flipper_debug, flipper_trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PollId(pub u64);

impl fmt::Display for PollId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "poll-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PollError {
    #[error("{0} is still running; stop it before starting another")]
    AlreadyRunning(PollId),
}

/// Passed to every refresh so the refresh itself can end the poll.
#[derive(Debug, Clone)]
pub struct PollControl {
    id: PollId,
    token: CancellationToken,
}

impl PollControl {
    pub fn id(&self) -> PollId {
        self.id
    }

    /// Stops the poll; the refresh in progress finishes, no further tick starts.
    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[derive(Debug)]
struct PollHandle {
    id: PollId,
    token: CancellationToken,
    task: JoinHandle<()>,
}

/// Owner of at most one running poll.
///
/// Refreshes never overlap: the next tick is only awaited once the previous refresh
/// has completed. Missed ticks are skipped rather than bunched up.
#[derive(Debug, Default)]
pub struct PollingSync {
    last_id: u64,
    handle: Option<PollHandle>,
}

impl PollingSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts calling `refresh` every `interval`, the first call immediately.
    ///
    /// Fails with `AlreadyRunning` while a previous poll is live. A poll that was
    /// stopped, by `stop` or from inside a refresh, is released here.
    pub fn start<F, Fut>(&mut self, interval: Duration, refresh: F) -> Result<PollId, PollError>
    where
        F: FnMut(PollControl) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if let Some(handle) = &self.handle {
            if !handle.token.is_cancelled() {
                return Err(PollError::AlreadyRunning(handle.id));
            }
        }
        self.handle = None;

        self.last_id += 1;
        let id = PollId(self.last_id);
        let token = CancellationToken::new();
        let control = PollControl {
            id,
            token: token.clone(),
        };
        // `interval` panics on a zero period.
        let interval = interval.max(Duration::from_millis(1));
        let task = tokio::spawn(run_poll(interval, control, refresh));
        flipper_debug!("{} started every {:?}", id, interval);
        self.handle = Some(PollHandle {
            id,
            token,
            task,
        });
        Ok(id)
    }

    /// Cancels the timer. Stopping twice, or stopping nothing, is fine.
    pub fn stop(&mut self) {
        if let Some(handle) = &self.handle {
            if !handle.token.is_cancelled() {
                flipper_debug!("{} stopped", handle.id);
                handle.token.cancel();
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.token.is_cancelled())
    }

    /// A control for the live poll, if there is one.
    pub fn control(&self) -> Option<PollControl> {
        self.handle
            .as_ref()
            .filter(|handle| !handle.token.is_cancelled())
            .map(|handle| PollControl {
                id: handle.id,
                token: handle.token.clone(),
            })
    }

    /// Waits until the current poll task has ended and releases it.
    ///
    /// The poll is cancelled if this future is dropped before it resolves.
    pub async fn stopped(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _guard = handle.token.clone().drop_guard();
            let _ = handle.task.await;
        }
    }
}

impl Drop for PollingSync {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_poll<F, Fut>(interval: Duration, control: PollControl, mut refresh: F)
where
    F: FnMut(PollControl) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            biased;
            _ = control.token.cancelled() => break,
            _ = ticker.tick() => {}
        }
        flipper_trace!("{} tick", control.id);
        tokio::select! {
            biased;
            _ = control.token.cancelled() => break,
            _ = refresh(control.clone()) => {}
        }
    }
    flipper_debug!("{} ended", control.id);
}
