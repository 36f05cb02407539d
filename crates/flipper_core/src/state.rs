use crate::model::{
    AnalysisId, BatchEntry, BatchFilter, BatchId, FileFormatInfo, JobId, JobStatus, TemplateId,
};
use crate::view_model::{BatchContentView, QuickTranscodeView};

/// Monotonic session counter; anything tagged with an older value is stale.
pub type Generation = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadStatus {
    #[default]
    Idle,
    Loading,
}

/// Accumulated listing of one batch, fed by at most one stream session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchContentState {
    batch_id: Option<BatchId>,
    filter: BatchFilter,
    generation: Generation,
    status: LoadStatus,
    page: Vec<BatchEntry>,
    pages_loaded: usize,
    more_available: bool,
    last_error: Option<String>,
    malformed_records: usize,
    last_diagnostic: Option<String>,
    dirty: bool,
}

impl BatchContentState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> BatchContentView {
        BatchContentView {
            batch_id: self.batch_id,
            filter: self.filter,
            loading: self.status == LoadStatus::Loading,
            entries: self.page.clone(),
            pages_loaded: self.pages_loaded,
            more_available: self.more_available,
            last_error: self.last_error.clone(),
            malformed_records: self.malformed_records,
            last_diagnostic: self.last_diagnostic.clone(),
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Whether updates tagged with `generation` may still be applied.
    pub fn is_current(&self, generation: Generation) -> bool {
        generation == self.generation
    }

    pub fn status(&self) -> LoadStatus {
        self.status
    }

    pub fn batch_id(&self) -> Option<BatchId> {
        self.batch_id
    }

    pub fn filter(&self) -> BatchFilter {
        self.filter
    }

    /// Returns whether the state changed since the last call.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn begin_load(&mut self, batch_id: BatchId, filter: BatchFilter) -> Generation {
        self.generation += 1;
        self.batch_id = Some(batch_id);
        self.filter = filter;
        self.status = LoadStatus::Loading;
        self.page.clear();
        self.pages_loaded = 0;
        self.more_available = false;
        self.malformed_records = 0;
        self.last_diagnostic = None;
        self.dirty = true;
        self.generation
    }

    pub(crate) fn resume(&mut self) -> bool {
        if self.status != LoadStatus::Idle || !self.more_available {
            return false;
        }
        self.status = LoadStatus::Loading;
        self.more_available = false;
        self.dirty = true;
        true
    }

    pub(crate) fn push_record(&mut self, entry: BatchEntry) {
        self.page.push(entry);
        self.dirty = true;
    }

    pub(crate) fn record_malformed(&mut self, message: String) {
        self.malformed_records += 1;
        self.last_diagnostic = Some(message);
        self.dirty = true;
    }

    pub(crate) fn finish_page(&mut self, more_available: bool) {
        self.status = LoadStatus::Idle;
        self.pages_loaded += 1;
        self.more_available = more_available;
        self.last_error = None;
        self.dirty = true;
    }

    pub(crate) fn fail(&mut self, message: String) {
        self.status = LoadStatus::Idle;
        self.more_available = false;
        self.last_error = Some(message);
        self.dirty = true;
    }

    pub(crate) fn cancel(&mut self) {
        self.generation += 1;
        self.status = LoadStatus::Idle;
        self.more_available = false;
        self.dirty = true;
    }
}

/// Ordinal progression of a quick transcode; never moves backwards on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Phase {
    #[default]
    Idle = 0,
    Uploading = 1,
    Polling = 2,
    AnalysisReady = 3,
}

impl Phase {
    pub fn ordinal(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuickTranscodeState {
    phase: Phase,
    template_id: Option<TemplateId>,
    job_id: Option<JobId>,
    byte_len: usize,
    upload_progress: Option<f32>,
    job_status: Option<JobStatus>,
    observed_analysis: Option<AnalysisId>,
    analysis: Option<FileFormatInfo>,
    last_error: Option<String>,
    halted: bool,
    dirty: bool,
}

impl QuickTranscodeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> QuickTranscodeView {
        QuickTranscodeView {
            phase: self.phase,
            template_id: self.template_id,
            job_id: self.job_id,
            byte_len: self.byte_len,
            upload_progress: self.upload_progress,
            job_status: self.job_status,
            analysis: self.analysis.clone(),
            last_error: self.last_error.clone(),
            halted: self.halted,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn job_id(&self) -> Option<JobId> {
        self.job_id
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn start_upload(&mut self, template_id: TemplateId, byte_len: usize) {
        self.phase = Phase::Uploading;
        self.template_id = Some(template_id);
        self.byte_len = byte_len;
        self.upload_progress = Some(0.0);
        self.dirty = true;
    }

    pub(crate) fn set_upload_progress(&mut self, fraction: f32) {
        self.upload_progress = Some(fraction);
        self.dirty = true;
    }

    pub(crate) fn set_job(&mut self, job_id: JobId) {
        self.job_id = Some(job_id);
        self.dirty = true;
    }

    /// Moves forward to `phase`; a lower or equal target leaves the phase alone.
    pub(crate) fn advance(&mut self, phase: Phase) {
        if phase > self.phase {
            self.phase = phase;
            self.dirty = true;
        }
    }

    pub(crate) fn set_job_status(&mut self, status: JobStatus) {
        if self.job_status != Some(status) {
            self.job_status = Some(status);
            self.dirty = true;
        }
    }

    pub(crate) fn observed_analysis(&self) -> Option<AnalysisId> {
        self.observed_analysis
    }

    pub(crate) fn set_observed_analysis(&mut self, analysis: Option<AnalysisId>) {
        self.observed_analysis = analysis;
    }

    pub(crate) fn set_analysis(&mut self, info: FileFormatInfo) {
        self.analysis = Some(info);
        self.last_error = None;
        self.dirty = true;
    }

    pub(crate) fn halt(&mut self, message: String) {
        self.last_error = Some(message);
        self.halted = true;
        self.dirty = true;
    }

    pub(crate) fn set_error(&mut self, message: String) {
        self.last_error = Some(message);
        self.dirty = true;
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}
