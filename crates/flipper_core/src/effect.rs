use crate::model::{AnalysisId, BatchFilter, BatchId, JobId, TemplateId};
use crate::state::Generation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEffect {
    /// Abort whatever stream session is open.
    CancelStream,
    OpenStream {
        generation: Generation,
        batch_id: BatchId,
        filter: BatchFilter,
    },
    /// Pull another page from the parked session.
    ResumeStream { generation: Generation },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuickEffect {
    CreateJob { template_id: TemplateId },
    StartTracking { job_id: JobId },
    Upload { job_id: JobId },
    FetchAnalysis { result_id: AnalysisId },
    StopTracking,
}
