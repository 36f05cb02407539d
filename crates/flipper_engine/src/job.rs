use std::sync::Arc;

use futures_util::future::BoxFuture;

use flipper_core::{JobId, JobSnapshot};

use crate::api::ServiceApi;
use crate::live::{LiveController, LiveEvent};
use crate::types::ClientError;

/// Polls one job's status until it reaches a terminal state.
pub type JobLifecycleController = LiveController<JobId, JobSnapshot>;

pub type JobEvent = LiveEvent<JobSnapshot>;

impl LiveController<JobId, JobSnapshot> {
    pub fn new(api: Arc<dyn ServiceApi>) -> Self {
        Self::with_fetch(api, "job", fetch_job)
    }
}

fn fetch_job(
    api: Arc<dyn ServiceApi>,
    job_id: JobId,
) -> BoxFuture<'static, Result<JobSnapshot, ClientError>> {
    Box::pin(async move { api.job_status(job_id).await })
}
