//! Service-wide figures shown on the operator dashboard.
use std::sync::Arc;

use futures_util::future::BoxFuture;

use flipper_core::{JobStatusSummary, QueueStats, ServiceScope};

use crate::api::ServiceApi;
use crate::live::{LiveController, LiveEvent};
use crate::types::ClientError;

/// Refreshes the job runner's queue sizes until stopped or a fetch fails.
pub type QueueStatsController = LiveController<ServiceScope, QueueStats>;

pub type QueueStatsEvent = LiveEvent<QueueStats>;

/// Refreshes the per-status job totals until stopped or a fetch fails.
pub type JobSummaryController = LiveController<ServiceScope, JobStatusSummary>;

pub type JobSummaryEvent = LiveEvent<JobStatusSummary>;

impl LiveController<ServiceScope, QueueStats> {
    pub fn for_queues(api: Arc<dyn ServiceApi>) -> Self {
        Self::with_fetch(api, "queue stats", fetch_queue_stats)
    }
}

impl LiveController<ServiceScope, JobStatusSummary> {
    pub fn for_job_totals(api: Arc<dyn ServiceApi>) -> Self {
        Self::with_fetch(api, "job summary", fetch_job_summary)
    }
}

fn fetch_queue_stats(
    api: Arc<dyn ServiceApi>,
    _scope: ServiceScope,
) -> BoxFuture<'static, Result<QueueStats, ClientError>> {
    Box::pin(async move { api.queue_stats().await })
}

fn fetch_job_summary(
    api: Arc<dyn ServiceApi>,
    _scope: ServiceScope,
) -> BoxFuture<'static, Result<JobStatusSummary, ClientError>> {
    Box::pin(async move { api.job_summary().await })
}
