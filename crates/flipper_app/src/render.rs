//! Plain-text rendering of controller snapshots.
use std::fmt::Write;

use flipper_core::templates::{step_progress, StepProgress, TemplateOption};
use flipper_core::{
    BatchContentView, BatchSummary, FileFormatInfo, ItemState, JobSnapshot, JobStatusSummary,
    Phase, QueueStats, QuickTranscodeView, TemplateStep,
};

pub fn item_state_label(state: ItemState) -> String {
    match state {
        ItemState::Pending => "pending".to_string(),
        ItemState::Active => "active".to_string(),
        ItemState::Completed => "completed".to_string(),
        ItemState::Failed => "failed".to_string(),
        ItemState::Aborted => "aborted".to_string(),
        ItemState::NotQueued => "not queued".to_string(),
        ItemState::Unknown(code) => format!("state {code}"),
    }
}

pub fn batch_page(view: &BatchContentView) -> String {
    let mut out = String::new();
    let filter = view
        .filter
        .map(item_state_label)
        .unwrap_or_else(|| "all".to_string());
    if let Some(batch_id) = view.batch_id {
        let _ = writeln!(
            out,
            "batch {batch_id} [{filter}]: {} items, {} page(s)",
            view.entries.len(),
            view.pages_loaded
        );
    }
    for entry in &view.entries {
        let _ = writeln!(
            out,
            "  {:<11} {}",
            item_state_label(entry.state),
            entry.source_path
        );
    }
    if view.malformed_records > 0 {
        let _ = writeln!(out, "  ({} unreadable record(s) skipped)", view.malformed_records);
    }
    if let Some(error) = &view.last_error {
        let _ = writeln!(out, "error: {error}");
    }
    if view.more_available {
        let _ = writeln!(out, "more items available");
    }
    out
}

pub fn counters_line(summary: &BatchSummary) -> String {
    format!(
        "{} {:>3}%  pending {}  active {}  completed {}  failed {}  aborted {}",
        summary.nick_name,
        summary.progress_percent(),
        summary.pending_count,
        summary.active_count,
        summary.completed_count,
        summary.error_count,
        summary.aborted_count
    )
}

pub fn queue_line(stats: &QueueStats) -> String {
    let mut line = format!("queues {:>4}", stats.total());
    for (name, size) in &stats.queues {
        let _ = write!(line, "  {name} {size}");
    }
    line
}

pub fn job_totals_line(summary: &JobStatusSummary) -> String {
    format!(
        "jobs  not queued {}  pending {}  active {}  completed {}  failed {}  purged {}",
        summary.not_queued,
        summary.pending,
        summary.started,
        summary.completed,
        summary.failed,
        summary.aborted
    )
}

pub fn job_line(snapshot: &JobSnapshot) -> String {
    let mut line = format!(
        "{} ({}/{} steps)",
        snapshot.status,
        snapshot.completed_steps,
        snapshot.total_steps()
    );
    if let Some(message) = snapshot.failure_message() {
        let _ = write!(line, ": {message}");
    }
    line
}

pub fn job_steps(steps: &[TemplateStep], completed_steps: u32) -> String {
    let mut out = String::new();
    for step in step_progress(steps, completed_steps) {
        let mark = match step.progress {
            StepProgress::Done => "x",
            StepProgress::InProgress => ">",
            StepProgress::NotStarted => " ",
        };
        let _ = writeln!(out, "  [{mark}] {}", step.label);
    }
    out
}

pub fn quick_line(view: &QuickTranscodeView) -> String {
    let mut line = match view.phase {
        Phase::Idle => "idle".to_string(),
        Phase::Uploading => {
            let percent = view.upload_progress.unwrap_or(0.0) * 100.0;
            format!("uploading {} bytes ({percent:.0}%)", view.byte_len)
        }
        Phase::Polling => "waiting for analysis".to_string(),
        Phase::AnalysisReady => "analysis ready".to_string(),
    };
    if let Some(status) = view.job_status {
        let _ = write!(line, ", job {status}");
    }
    if let Some(error) = &view.last_error {
        let _ = write!(line, ", error: {error}");
    }
    line
}

pub fn analysis_block(info: &FileFormatInfo) -> String {
    let format = &info.format_analysis;
    let mut out = String::new();
    let _ = writeln!(out, "format   {} ({})", format.format_long_name, format.format_name);
    let _ = writeln!(out, "streams  {}", format.stream_count);
    let _ = writeln!(out, "duration {:.2}s", format.duration);
    let _ = writeln!(out, "size     {} bytes", format.size);
    let _ = writeln!(out, "bitrate  {:.0} bit/s", format.bit_rate);
    out
}

pub fn template_list(options: &[TemplateOption]) -> String {
    let mut out = String::new();
    for option in options {
        let _ = writeln!(out, "{}  {}", option.id, option.label);
    }
    out
}
