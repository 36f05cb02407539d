//! Flipper core: pure state machines and view-model helpers for the console.
mod effect;
mod live;
mod model;
mod msg;
mod state;
pub mod templates;
mod update;
mod view_model;

pub use effect::{BatchEffect, QuickEffect};
pub use live::{
    update_live, CountersEffect, CountersMsg, CountersState, CountersView, JobEffect, JobMsg,
    JobTrackerState, JobView, LiveEffect, LiveMsg, LiveResource, LiveState, LiveView,
};
pub use model::{
    AnalysisId, BatchEntry, BatchFilter, BatchId, BatchSummary, FileFormatInfo, FormatAnalysis,
    ItemState, JobId, JobSnapshot, JobStatus, JobStatusSummary, JobStep, JobTemplate, QueueStats,
    ServiceScope, TemplateId, TemplateStep, UnknownItemState, ANALYSIS_STEP,
};
pub use msg::{BatchMsg, QuickMsg};
pub use state::{BatchContentState, Generation, LoadStatus, Phase, QuickTranscodeState};
pub use update::{update_batch, update_quick};
pub use view_model::{BatchContentView, QuickTranscodeView};
