use crate::model::{
    AnalysisId, BatchEntry, BatchFilter, BatchId, FileFormatInfo, JobId, JobStatus, TemplateId,
};
use crate::state::Generation;

/// Inputs of the batch content state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchMsg {
    /// Load the first page of a batch, superseding any running session.
    LoadRequested {
        batch_id: BatchId,
        filter: BatchFilter,
    },
    /// User picked another status filter for the batch already shown.
    FilterChanged { filter: BatchFilter },
    /// Continue a session parked at the page limit.
    MoreRequested,
    /// Stop the current session and leave the accumulated page as it is.
    CancelRequested,
    RecordReceived {
        generation: Generation,
        entry: BatchEntry,
    },
    /// A line of the feed was dropped because it did not parse.
    MalformedRecord {
        generation: Generation,
        message: String,
    },
    /// The page limit was reached; the session stays open.
    PageFilled { generation: Generation },
    /// The server closed the feed.
    StreamExhausted { generation: Generation },
    StreamFailed {
        generation: Generation,
        message: String,
    },
}

/// Inputs of the quick transcode phase machine.
#[derive(Debug, Clone, PartialEq)]
pub enum QuickMsg {
    /// The upload widget delivered a complete buffer.
    BufferReceived {
        template_id: TemplateId,
        byte_len: usize,
    },
    /// Fraction in [0, 1] reported by the upload widget.
    UploadProgress(f32),
    JobCreated { job_id: JobId },
    UploadCompleted,
    /// One poll of the job: its status and the analysis result id, if any.
    JobObserved {
        status: JobStatus,
        analysis_id: Option<AnalysisId>,
    },
    AnalysisLoaded {
        result_id: AnalysisId,
        info: FileFormatInfo,
    },
    /// `analysis/get` answered 404: the result is not there yet.
    AnalysisUnavailable { result_id: AnalysisId },
    Failed { message: String },
    Reset,
}
