use crate::model::{BatchEntry, BatchFilter, BatchId, FileFormatInfo, JobId, JobStatus, TemplateId};
use crate::state::Phase;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchContentView {
    pub batch_id: Option<BatchId>,
    pub filter: BatchFilter,
    pub loading: bool,
    /// Records in server emission order.
    pub entries: Vec<BatchEntry>,
    pub pages_loaded: usize,
    pub more_available: bool,
    pub last_error: Option<String>,
    pub malformed_records: usize,
    pub last_diagnostic: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuickTranscodeView {
    pub phase: Phase,
    pub template_id: Option<TemplateId>,
    pub job_id: Option<JobId>,
    pub byte_len: usize,
    pub upload_progress: Option<f32>,
    pub job_status: Option<JobStatus>,
    pub analysis: Option<FileFormatInfo>,
    pub last_error: Option<String>,
    pub halted: bool,
}
