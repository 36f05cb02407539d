//! Single-file quick transcode: create a job, upload the file, follow the job until the
//! analysis of the upload is available.
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use flipper_core::{
    update_quick, AnalysisId, JobId, JobSnapshot, JobView, QuickEffect, QuickMsg,
    QuickTranscodeState, QuickTranscodeView, TemplateId,
};
use flipper_logging::{flipper_debug, flipper_info, flipper_warn};

use crate::api::ServiceApi;
use crate::job::{JobEvent, JobLifecycleController};
use crate::live::{LiveEvent, LiveStopper};
use crate::settings::PollSettings;
use crate::shared::{apply, lock};

type SharedState = Arc<Mutex<QuickTranscodeState>>;

pub struct QuickTranscodeController {
    api: Arc<dyn ServiceApi>,
    poll: PollSettings,
    state: SharedState,
    tracker: JobLifecycleController,
    observer: Option<JoinHandle<()>>,
}

impl QuickTranscodeController {
    pub fn new(api: Arc<dyn ServiceApi>, poll: PollSettings) -> Self {
        let tracker = JobLifecycleController::new(Arc::clone(&api));
        Self {
            api,
            poll,
            state: Arc::new(Mutex::new(QuickTranscodeState::new())),
            tracker,
            observer: None,
        }
    }

    pub fn view(&self) -> QuickTranscodeView {
        lock(&self.state).view()
    }

    /// Status of the job created for the current upload.
    pub fn job_view(&self) -> JobView {
        self.tracker.view()
    }

    pub fn consume_dirty(&self) -> bool {
        lock(&self.state).consume_dirty()
    }

    /// Starts a transcode of `data` with `template_id`.
    ///
    /// Returns after the job was created and the upload finished or failed; the job is
    /// then followed in the background. Ignored unless the machine is idle.
    pub async fn submit(&mut self, template_id: TemplateId, data: Bytes) {
        let msg = QuickMsg::BufferReceived {
            template_id,
            byte_len: data.len(),
        };
        let effects = step(&self.state, msg);
        self.run(effects, &data).await;
    }

    /// Progress reported by whatever feeds the upload, as a fraction of the file.
    pub fn upload_progress(&self, fraction: f32) {
        step(&self.state, QuickMsg::UploadProgress(fraction));
    }

    /// Back to `Idle`, dropping the job and analysis of the previous run.
    pub fn reset(&mut self) {
        self.stop_observer();
        for effect in step(&self.state, QuickMsg::Reset) {
            if let QuickEffect::StopTracking = effect {
                self.tracker.stop();
            }
        }
    }

    /// Waits until job tracking has stopped, either on a terminal status or a failure.
    pub async fn tracking_stopped(&mut self) {
        self.tracker.stopped().await;
    }

    /// Stops job tracking and the observer task.
    pub fn teardown(&mut self) {
        self.tracker.teardown();
        self.stop_observer();
    }

    async fn run(&mut self, effects: Vec<QuickEffect>, data: &Bytes) {
        let mut queue = VecDeque::from(effects);
        while let Some(effect) = queue.pop_front() {
            let next = match effect {
                QuickEffect::CreateJob { template_id } => {
                    match self.api.create_job(template_id).await {
                        Ok(job_id) => {
                            flipper_info!("created job {} from template {}", job_id, template_id);
                            step(&self.state, QuickMsg::JobCreated { job_id })
                        }
                        Err(err) => {
                            flipper_warn!("job creation failed: {}", err);
                            step(
                                &self.state,
                                QuickMsg::Failed {
                                    message: err.user_message(),
                                },
                            )
                        }
                    }
                }
                QuickEffect::StartTracking { job_id } => self.start_tracking(job_id),
                QuickEffect::Upload { job_id } => {
                    flipper_info!("uploading {} bytes for job {}", data.len(), job_id);
                    match self.api.upload(job_id, data.clone()).await {
                        Ok(()) => step(&self.state, QuickMsg::UploadCompleted),
                        Err(err) => {
                            flipper_warn!("upload for job {} failed: {}", job_id, err);
                            step(
                                &self.state,
                                QuickMsg::Failed {
                                    message: err.user_message(),
                                },
                            )
                        }
                    }
                }
                QuickEffect::FetchAnalysis { result_id } => {
                    fetch_analysis(self.api.as_ref(), &self.state, result_id).await
                }
                QuickEffect::StopTracking => {
                    self.tracker.stop();
                    Vec::new()
                }
            };
            queue.extend(next);
        }
    }

    fn start_tracking(&mut self, job_id: JobId) -> Vec<QuickEffect> {
        self.teardown();
        let (tx, rx) = mpsc::unbounded_channel();
        self.tracker = JobLifecycleController::new(Arc::clone(&self.api)).with_events(tx);
        if let Err(err) = self.tracker.track(job_id, self.poll.job_interval) {
            return step(
                &self.state,
                QuickMsg::Failed {
                    message: err.to_string(),
                },
            );
        }
        let observer = observe_job(
            rx,
            Arc::clone(&self.api),
            Arc::clone(&self.state),
            self.tracker.stopper(),
        );
        self.observer = Some(tokio::spawn(observer));
        Vec::new()
    }

    fn stop_observer(&mut self) {
        if let Some(observer) = self.observer.take() {
            observer.abort();
        }
    }
}

impl Drop for QuickTranscodeController {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Applies a message and logs phase transitions.
fn step(state: &Mutex<QuickTranscodeState>, msg: QuickMsg) -> Vec<QuickEffect> {
    let before = lock(state).phase();
    let effects = apply(state, msg, update_quick);
    let after = lock(state).phase();
    if before != after {
        flipper_info!("quick transcode {:?} -> {:?}", before, after);
    }
    effects
}

async fn observe_job(
    mut events: mpsc::UnboundedReceiver<JobEvent>,
    api: Arc<dyn ServiceApi>,
    state: SharedState,
    stopper: LiveStopper<JobId, JobSnapshot>,
) {
    while let Some(event) = events.recv().await {
        let msg = match event {
            LiveEvent::Refreshed(snapshot) => QuickMsg::JobObserved {
                status: snapshot.status,
                analysis_id: snapshot.analysis_result_id(),
            },
            LiveEvent::Failed(message) => QuickMsg::Failed { message },
        };
        let mut queue = VecDeque::from(step(&state, msg));
        while let Some(effect) = queue.pop_front() {
            match effect {
                QuickEffect::FetchAnalysis { result_id } => {
                    queue.extend(fetch_analysis(api.as_ref(), &state, result_id).await);
                }
                QuickEffect::StopTracking => stopper.stop(),
                other => flipper_debug!("observer ignores {:?}", other),
            }
        }
    }
    flipper_debug!("job observer finished");
}

async fn fetch_analysis(
    api: &dyn ServiceApi,
    state: &Mutex<QuickTranscodeState>,
    result_id: AnalysisId,
) -> Vec<QuickEffect> {
    let msg = match api.analysis(result_id).await {
        Ok(Some(info)) => QuickMsg::AnalysisLoaded { result_id, info },
        Ok(None) => {
            flipper_debug!("analysis {} not available yet", result_id);
            QuickMsg::AnalysisUnavailable { result_id }
        }
        Err(err) => {
            flipper_warn!("analysis {} could not be fetched: {}", result_id, err);
            QuickMsg::Failed {
                message: err.user_message(),
            }
        }
    };
    step(state, msg)
}
