//! Generic tracker for a resource kept fresh by periodic polling.
//!
//! A job's status and a batch's counters are both "live": the engine re-fetches them
//! on an interval until they reach a final state, a fetch fails, or the tracker is
//! pointed at something else. Queue sizes and job status totals never reach a final
//! state and poll until stopped.
use crate::model::{
    BatchId, BatchSummary, JobId, JobSnapshot, JobStatus, JobStatusSummary, QueueStats,
};
use crate::state::Generation;

pub trait LiveResource: Clone {
    /// No further change is expected once this returns true.
    fn is_final(&self) -> bool;

    /// Error reported by the resource itself rather than by the transport.
    fn failure(&self) -> Option<String> {
        None
    }
}

impl LiveResource for JobSnapshot {
    fn is_final(&self) -> bool {
        self.status.is_terminal()
    }

    fn failure(&self) -> Option<String> {
        match self.status {
            JobStatus::Failed | JobStatus::Aborted | JobStatus::Lost => self.failure_message(),
            _ => None,
        }
    }
}

impl LiveResource for BatchSummary {
    fn is_final(&self) -> bool {
        self.is_settled()
    }
}

// Service-wide figures keep moving; only `stop` or a failed fetch ends their poll.
impl LiveResource for QueueStats {
    fn is_final(&self) -> bool {
        false
    }
}

impl LiveResource for JobStatusSummary {
    fn is_final(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveMsg<K, T> {
    TrackRequested { key: K },
    Refreshed { generation: Generation, value: T },
    RefreshFailed { generation: Generation, message: String },
    StopRequested,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveEffect<K, T> {
    StartPolling { generation: Generation, key: K },
    StopPolling,
    /// A fresh value was accepted.
    Publish(T),
    /// Polling ended on a fetch failure.
    ReportFailure(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveState<K, T> {
    key: Option<K>,
    generation: Generation,
    polling: bool,
    latest: Option<T>,
    last_error: Option<String>,
    refreshes: u64,
}

impl<K, T> Default for LiveState<K, T> {
    fn default() -> Self {
        Self {
            key: None,
            generation: 0,
            polling: false,
            latest: None,
            last_error: None,
            refreshes: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveView<K, T> {
    pub key: Option<K>,
    pub polling: bool,
    pub latest: Option<T>,
    pub last_error: Option<String>,
    pub refreshes: u64,
}

impl<K: Clone, T: LiveResource> LiveState<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> LiveView<K, T> {
        LiveView {
            key: self.key.clone(),
            polling: self.polling,
            latest: self.latest.clone(),
            last_error: self.last_error.clone(),
            refreshes: self.refreshes,
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn is_polling(&self) -> bool {
        self.polling
    }

    fn accepts(&self, generation: Generation) -> bool {
        self.polling && generation == self.generation
    }
}

pub type JobTrackerState = LiveState<JobId, JobSnapshot>;
pub type JobMsg = LiveMsg<JobId, JobSnapshot>;
pub type JobEffect = LiveEffect<JobId, JobSnapshot>;
pub type JobView = LiveView<JobId, JobSnapshot>;

pub type CountersState = LiveState<BatchId, BatchSummary>;
pub type CountersMsg = LiveMsg<BatchId, BatchSummary>;
pub type CountersEffect = LiveEffect<BatchId, BatchSummary>;
pub type CountersView = LiveView<BatchId, BatchSummary>;

/// Pure update function for a live resource tracker.
///
/// A final value or a failed fetch always yields `StopPolling`; nothing else does.
pub fn update_live<K: Clone, T: LiveResource>(
    mut state: LiveState<K, T>,
    msg: LiveMsg<K, T>,
) -> (LiveState<K, T>, Vec<LiveEffect<K, T>>) {
    let effects = match msg {
        LiveMsg::TrackRequested { key } => {
            let mut effects = Vec::with_capacity(2);
            if state.polling {
                effects.push(LiveEffect::StopPolling);
            }
            state.generation += 1;
            state.key = Some(key.clone());
            state.polling = true;
            state.latest = None;
            state.last_error = None;
            state.refreshes = 0;
            effects.push(LiveEffect::StartPolling {
                generation: state.generation,
                key,
            });
            effects
        }
        LiveMsg::Refreshed { generation, value } => {
            if !state.accepts(generation) {
                return (state, Vec::new());
            }
            state.refreshes += 1;
            state.last_error = value.failure();
            let mut effects = vec![LiveEffect::Publish(value.clone())];
            if value.is_final() {
                state.polling = false;
                effects.push(LiveEffect::StopPolling);
            }
            state.latest = Some(value);
            effects
        }
        LiveMsg::RefreshFailed {
            generation,
            message,
        } => {
            if !state.accepts(generation) {
                return (state, Vec::new());
            }
            state.polling = false;
            state.last_error = Some(message.clone());
            vec![
                LiveEffect::StopPolling,
                LiveEffect::ReportFailure(message),
            ]
        }
        LiveMsg::StopRequested => {
            // Bumping the generation turns any refresh still in flight stale.
            state.generation += 1;
            state.polling = false;
            vec![LiveEffect::StopPolling]
        }
    };

    (state, effects)
}
