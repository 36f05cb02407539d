use std::sync::Arc;

use futures_util::future::BoxFuture;

use flipper_core::{BatchId, BatchSummary};

use crate::api::ServiceApi;
use crate::live::{LiveController, LiveEvent};
use crate::types::ClientError;

/// Refreshes a batch's item counters until no item is pending or active.
pub type BatchCountersController = LiveController<BatchId, BatchSummary>;

pub type CountersEvent = LiveEvent<BatchSummary>;

impl LiveController<BatchId, BatchSummary> {
    pub fn for_batch(api: Arc<dyn ServiceApi>) -> Self {
        Self::with_fetch(api, "batch", fetch_summary)
    }
}

fn fetch_summary(
    api: Arc<dyn ServiceApi>,
    batch_id: BatchId,
) -> BoxFuture<'static, Result<BatchSummary, ClientError>> {
    Box::pin(async move { api.batch_summary(batch_id).await })
}
