//! Flipper engine: service client, stream and poll plumbing, and the async controllers
//! that drive the pure state machines of `flipper_core`.
mod api;
mod batch;
mod counters;
mod dashboard;
mod job;
mod live;
mod poll;
mod quick;
mod settings;
mod shared;
mod stream;
mod types;

pub use api::{
    error_detail, ByteStream, ReqwestApi, ServiceApi, ANALYSIS_GET, BATCH_CONTENT, BATCH_GET,
    JOB_NEW, JOB_STATUS, JOB_SUMMARY, JOB_TEMPLATES, QUEUE_STATS, UPLOAD,
};
pub use batch::BatchContentController;
pub use counters::{BatchCountersController, CountersEvent};
pub use dashboard::{JobSummaryController, JobSummaryEvent, QueueStatsController, QueueStatsEvent};
pub use job::{JobEvent, JobLifecycleController};
pub use live::{Fetch, LiveController, LiveEvent, LiveStopper};
pub use poll::{PollControl, PollError, PollId, PollingSync};
pub use quick::QuickTranscodeController;
pub use settings::{ClientSettings, PagingSettings, PollSettings};
pub use stream::{
    ChannelDiagnostics, DiagnosticSink, LogDiagnostics, PageEnd, ReadNext, StreamCursor,
    StreamOptions, StreamSession,
};
pub use types::{ClientError, Diagnostic, SessionId};
