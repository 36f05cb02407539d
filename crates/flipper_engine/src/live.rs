//! Poll-driven controller shared by the job and counters trackers.
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::sync::mpsc::UnboundedSender;

use flipper_core::{update_live, LiveEffect, LiveMsg, LiveResource, LiveState, LiveView};
use flipper_logging::{flipper_debug, flipper_info, flipper_warn};

use crate::api::ServiceApi;
use crate::poll::{PollControl, PollError, PollingSync};
use crate::shared::{apply, lock};
use crate::types::ClientError;

/// Fetches the current value of a tracked resource.
pub type Fetch<K, T> = fn(Arc<dyn ServiceApi>, K) -> BoxFuture<'static, Result<T, ClientError>>;

/// Pushed to an observer after each accepted refresh.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent<T> {
    Refreshed(T),
    /// Polling ended because a fetch failed.
    Failed(String),
}

/// Keeps one resource fresh by polling `fetch` until the value is final.
pub struct LiveController<K, T> {
    api: Arc<dyn ServiceApi>,
    fetch: Fetch<K, T>,
    label: &'static str,
    state: Arc<Mutex<LiveState<K, T>>>,
    poller: PollingSync,
    events: Option<UnboundedSender<LiveEvent<T>>>,
}

impl<K, T> LiveController<K, T>
where
    K: Clone + fmt::Display + Send + Sync + 'static,
    T: LiveResource + Send + 'static,
{
    pub fn with_fetch(api: Arc<dyn ServiceApi>, label: &'static str, fetch: Fetch<K, T>) -> Self {
        Self {
            api,
            fetch,
            label,
            state: Arc::new(Mutex::new(LiveState::default())),
            poller: PollingSync::new(),
            events: None,
        }
    }

    /// Forwards every accepted refresh and fetch failure to `events`.
    pub fn with_events(mut self, events: UnboundedSender<LiveEvent<T>>) -> Self {
        self.events = Some(events);
        self
    }

    /// Starts polling `key`, replacing whatever was tracked before.
    pub fn track(&mut self, key: K, interval: Duration) -> Result<(), PollError> {
        flipper_info!("tracking {} {} every {:?}", self.label, key, interval);
        let effects = apply(&self.state, LiveMsg::TrackRequested { key }, update_live);
        for effect in effects {
            match effect {
                LiveEffect::StopPolling => self.poller.stop(),
                LiveEffect::StartPolling { generation, key } => {
                    self.start_polling(generation, key, interval)?;
                }
                LiveEffect::Publish(_) | LiveEffect::ReportFailure(_) => {}
            }
        }
        Ok(())
    }

    fn start_polling(
        &mut self,
        generation: u64,
        key: K,
        interval: Duration,
    ) -> Result<(), PollError> {
        let api = Arc::clone(&self.api);
        let state = Arc::clone(&self.state);
        let events = self.events.clone();
        let fetch = self.fetch;
        let label = self.label;
        self.poller.start(interval, move |control: PollControl| {
            let api = Arc::clone(&api);
            let state = Arc::clone(&state);
            let events = events.clone();
            let key = key.clone();
            async move {
                let msg = match fetch(api, key.clone()).await {
                    Ok(value) => LiveMsg::Refreshed { generation, value },
                    Err(err) => {
                        flipper_warn!("{} {}: refresh failed: {}", label, key, err);
                        LiveMsg::RefreshFailed {
                            generation,
                            message: err.user_message(),
                        }
                    }
                };
                for effect in apply(&state, msg, update_live) {
                    match effect {
                        LiveEffect::StopPolling => {
                            flipper_debug!("{} {}: polling finished", label, key);
                            control.stop();
                        }
                        LiveEffect::Publish(value) => notify(&events, LiveEvent::Refreshed(value)),
                        LiveEffect::ReportFailure(message) => {
                            notify(&events, LiveEvent::Failed(message));
                        }
                        LiveEffect::StartPolling { .. } => {}
                    }
                }
            }
        })?;
        Ok(())
    }

    /// Stops polling; refreshes still in flight are discarded.
    pub fn stop(&mut self) {
        for effect in apply(&self.state, LiveMsg::StopRequested, update_live) {
            if let LiveEffect::StopPolling = effect {
                self.poller.stop();
            }
        }
    }

    /// A handle that stops this tracker from another task.
    pub fn stopper(&self) -> LiveStopper<K, T> {
        LiveStopper {
            state: Arc::clone(&self.state),
            control: self.poller.control(),
        }
    }

    pub fn view(&self) -> LiveView<K, T> {
        lock(&self.state).view()
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_running()
    }

    pub fn control(&self) -> Option<PollControl> {
        self.poller.control()
    }

    /// Resolves once the poll has ended, by itself or through `stop`.
    pub async fn stopped(&mut self) {
        self.poller.stopped().await;
    }

    /// Releases the timer. Dropping the controller does the same.
    pub fn teardown(&mut self) {
        self.stop();
    }
}

/// Stops a tracker from a task that does not own it.
pub struct LiveStopper<K, T> {
    state: Arc<Mutex<LiveState<K, T>>>,
    control: Option<PollControl>,
}

impl<K: Clone, T: LiveResource> LiveStopper<K, T> {
    pub fn stop(&self) {
        for effect in apply(&self.state, LiveMsg::StopRequested, update_live) {
            if let (LiveEffect::StopPolling, Some(control)) = (effect, &self.control) {
                control.stop();
            }
        }
    }
}

fn notify<T>(events: &Option<UnboundedSender<LiveEvent<T>>>, event: LiveEvent<T>) {
    if let Some(events) = events {
        if events.send(event).is_err() {
            flipper_debug!("live event dropped; observer is gone");
        }
    }
}
