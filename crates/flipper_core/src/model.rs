//! Wire-level records exchanged with the transcoding service.
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type JobId = Uuid;
pub type BatchId = Uuid;
pub type TemplateId = Uuid;
pub type AnalysisId = Uuid;

/// Aggregate status of a job (and of each of its steps).
///
/// The service sends the numeric code; values it may add later are kept as
/// `Unknown` instead of failing the whole snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum JobStatus {
    Pending,
    Started,
    Completed,
    Failed,
    Aborted,
    NotQueued,
    Lost,
    Unknown(i64),
}

impl JobStatus {
    /// Completed, Failed, Aborted and Lost never progress any further.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Aborted | JobStatus::Lost
        )
    }
}

impl From<i64> for JobStatus {
    fn from(code: i64) -> Self {
        match code {
            0 => JobStatus::Pending,
            1 => JobStatus::Started,
            2 => JobStatus::Completed,
            3 => JobStatus::Failed,
            4 => JobStatus::Aborted,
            5 => JobStatus::NotQueued,
            6 => JobStatus::Lost,
            other => JobStatus::Unknown(other),
        }
    }
}

impl From<JobStatus> for i64 {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Pending => 0,
            JobStatus::Started => 1,
            JobStatus::Completed => 2,
            JobStatus::Failed => 3,
            JobStatus::Aborted => 4,
            JobStatus::NotQueued => 5,
            JobStatus::Lost => 6,
            JobStatus::Unknown(code) => code,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "Pending"),
            JobStatus::Started => write!(f, "Started"),
            JobStatus::Completed => write!(f, "Completed successfully"),
            JobStatus::Failed => write!(f, "Failed"),
            JobStatus::Aborted => write!(f, "Aborted"),
            JobStatus::NotQueued => write!(f, "Not queued"),
            JobStatus::Lost => write!(f, "Lost"),
            JobStatus::Unknown(code) => write!(f, "Unknown value {code}"),
        }
    }
}

pub const ANALYSIS_STEP: &str = "analysis";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStep {
    pub id: Uuid,
    #[serde(rename = "stepType")]
    pub step_type: String,
    #[serde(rename = "jobStepStatus")]
    pub status: JobStatus,
    #[serde(rename = "analysisResult", default, skip_serializing_if = "Option::is_none")]
    pub analysis_result: Option<AnalysisId>,
    #[serde(rename = "errorMessage", default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl JobStep {
    pub fn is_analysis(&self) -> bool {
        self.step_type == ANALYSIS_STEP
    }
}

/// One poll's view of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub status: JobStatus,
    #[serde(default)]
    pub completed_steps: u32,
    #[serde(default)]
    pub steps: Vec<JobStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl JobSnapshot {
    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    /// Result id of the first analysis step, ignoring the nil sentinel.
    pub fn analysis_result_id(&self) -> Option<AnalysisId> {
        self.steps
            .iter()
            .find(|step| step.is_analysis())
            .and_then(|step| step.analysis_result)
            .filter(|id| !id.is_nil())
    }

    /// The job-level error message, falling back to the first failed step's.
    ///
    /// The service sends empty strings for "no error".
    pub fn failure_message(&self) -> Option<String> {
        non_empty(self.error_message.as_deref()).or_else(|| {
            self.steps
                .iter()
                .filter(|step| step.status == JobStatus::Failed)
                .find_map(|step| non_empty(step.error_message.as_deref()))
        })
    }
}

fn non_empty(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|text| !text.is_empty())
        .map(ToOwned::to_owned)
}

/// State of one entry of a batch; doubles as the batch content filter tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum ItemState {
    Pending,
    Active,
    Completed,
    Failed,
    Aborted,
    NotQueued,
    Unknown(i64),
}

impl ItemState {
    /// Value of the `state` query parameter understood by the service.
    pub fn query_value(self) -> String {
        match self {
            ItemState::Pending => "pending".to_string(),
            ItemState::Active => "active".to_string(),
            ItemState::Completed => "completed".to_string(),
            ItemState::Failed => "failed".to_string(),
            ItemState::Aborted => "aborted".to_string(),
            ItemState::NotQueued => "notqueued".to_string(),
            ItemState::Unknown(code) => code.to_string(),
        }
    }
}

impl From<i64> for ItemState {
    fn from(code: i64) -> Self {
        match code {
            0 => ItemState::Pending,
            1 => ItemState::Active,
            2 => ItemState::Completed,
            3 => ItemState::Failed,
            4 => ItemState::Aborted,
            5 => ItemState::NotQueued,
            other => ItemState::Unknown(other),
        }
    }
}

impl From<ItemState> for i64 {
    fn from(state: ItemState) -> Self {
        match state {
            ItemState::Pending => 0,
            ItemState::Active => 1,
            ItemState::Completed => 2,
            ItemState::Failed => 3,
            ItemState::Aborted => 4,
            ItemState::NotQueued => 5,
            ItemState::Unknown(code) => code,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownItemState(pub String);

impl fmt::Display for UnknownItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown item state {:?}", self.0)
    }
}

impl std::error::Error for UnknownItemState {}

impl FromStr for ItemState {
    type Err = UnknownItemState;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ItemState::Pending),
            "active" => Ok(ItemState::Active),
            "completed" => Ok(ItemState::Completed),
            "failed" | "error" => Ok(ItemState::Failed),
            "aborted" => Ok(ItemState::Aborted),
            "notqueued" | "not-queued" => Ok(ItemState::NotQueued),
            _ => Err(UnknownItemState(raw.to_string())),
        }
    }
}

/// Optional status filter re-scoping a batch content listing.
pub type BatchFilter = Option<ItemState>;

/// One record of the `batch-content` feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub id: Uuid,
    #[serde(rename = "sourcePath")]
    pub source_path: String,
    #[serde(rename = "type", default)]
    pub item_type: Option<String>,
    pub state: ItemState,
}

/// Counters of a batch as returned by `batch/get`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchSummary {
    pub bulk_list_id: Uuid,
    pub nick_name: String,
    pub pending_count: u64,
    pub active_count: u64,
    pub completed_count: u64,
    pub error_count: u64,
    pub aborted_count: u64,
    pub non_queued_count: u64,
    pub running_actions: Vec<String>,
}

impl BatchSummary {
    /// Share of finished (completed or failed) items, rounded up.
    pub fn progress_percent(&self) -> u8 {
        let finished = self.completed_count + self.error_count;
        let total = finished + self.pending_count + self.active_count;
        if total == 0 {
            return 0;
        }
        let percent = (finished * 100).div_ceil(total);
        percent.min(100) as u8
    }

    /// Nothing left pending or active; the counters will not move on their own.
    pub fn is_settled(&self) -> bool {
        self.pending_count == 0 && self.active_count == 0
    }
}

/// Key for a resource the service holds once, not per job or batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ServiceScope;

impl fmt::Display for ServiceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("service")
    }
}

/// Length of every job runner queue, by queue name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueueStats {
    #[serde(default)]
    pub queues: BTreeMap<String, u64>,
}

impl QueueStats {
    pub fn total(&self) -> u64 {
        self.queues.values().sum()
    }
}

/// Number of jobs in each status across the whole service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JobStatusSummary {
    #[serde(rename = "notqueued")]
    pub not_queued: u64,
    pub pending: u64,
    pub started: u64,
    pub completed: u64,
    pub failed: u64,
    pub aborted: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatAnalysis {
    #[serde(rename = "nb_streams", default)]
    pub stream_count: i16,
    #[serde(rename = "nb_programs", default)]
    pub program_count: i16,
    #[serde(default)]
    pub format_name: String,
    #[serde(default)]
    pub format_long_name: String,
    #[serde(rename = "start_time", default)]
    pub start_time: f64,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub bit_rate: f64,
    #[serde(default)]
    pub probe_score: i32,
}

/// Payload of `analysis/get`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileFormatInfo {
    pub id: Uuid,
    #[serde(rename = "formatAnalysis")]
    pub format_analysis: FormatAnalysis,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateStep {
    #[serde(default)]
    pub id: Uuid,
    #[serde(default)]
    pub predetermined_type: String,
    #[serde(default)]
    pub in_progress_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobTemplate {
    #[serde(rename = "Id")]
    pub id: TemplateId,
    #[serde(rename = "JobTypeName")]
    pub name: String,
    #[serde(rename = "Steps", default)]
    pub steps: Vec<TemplateStep>,
}
