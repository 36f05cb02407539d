use flipper_core::{
    BatchEntry, BatchSummary, ItemState, JobSnapshot, JobStatus, JobStatusSummary, JobTemplate,
    QueueStats, ServiceScope,
};

#[test]
fn job_status_snapshot_decodes_from_service_json() {
    let raw = r#"{
        "status": 3,
        "completed_steps": 1,
        "steps": [
            {"id": "5b1e8c2a-3c1f-4d8e-9a51-0f6a2d8b7c11", "stepType": "analysis",
             "jobStepStatus": 2, "analysisResult": "9d2f6c3e-1a4b-4c5d-8e7f-a0b1c2d3e4f5"},
            {"id": "7c3d9e4b-2b5a-4f6c-8d7e-1e2f3a4b5c6d", "stepType": "transcode",
             "jobStepStatus": 3, "errorMessage": "disk full"}
        ],
        "error_message": "disk full"
    }"#;
    let snapshot: JobSnapshot = serde_json::from_str(raw).unwrap();
    assert_eq!(snapshot.status, JobStatus::Failed);
    assert_eq!(snapshot.total_steps(), 2);
    assert_eq!(
        snapshot.analysis_result_id().map(|id| id.to_string()),
        Some("9d2f6c3e-1a4b-4c5d-8e7f-a0b1c2d3e4f5".to_string())
    );
    assert_eq!(snapshot.failure_message().as_deref(), Some("disk full"));
}

#[test]
fn unknown_status_codes_are_kept() {
    let snapshot: JobSnapshot = serde_json::from_str(r#"{"status": 42}"#).unwrap();
    assert_eq!(snapshot.status, JobStatus::Unknown(42));
    assert!(!snapshot.status.is_terminal());
    assert_eq!(i64::from(JobStatus::Lost), 6);
}

#[test]
fn batch_entry_decodes_feed_record() {
    let raw = r#"{"id":"0e6b1d7a-5f55-4a38-9d2e-3c1f0b9a8e77","sourcePath":"/media/a.mxf","type":"video","state":3}"#;
    let entry: BatchEntry = serde_json::from_str(raw).unwrap();
    assert_eq!(entry.source_path, "/media/a.mxf");
    assert_eq!(entry.state, ItemState::Failed);
    assert_eq!(entry.item_type.as_deref(), Some("video"));
}

#[test]
fn item_state_round_trips_through_query_names() {
    for state in [
        ItemState::Pending,
        ItemState::Active,
        ItemState::Completed,
        ItemState::Failed,
        ItemState::Aborted,
        ItemState::NotQueued,
    ] {
        assert_eq!(state.query_value().parse::<ItemState>(), Ok(state));
    }
    assert!("bogus".parse::<ItemState>().is_err());
}

#[test]
fn batch_progress_rounds_up() {
    let summary = BatchSummary {
        pending_count: 2,
        completed_count: 1,
        ..BatchSummary::default()
    };
    assert_eq!(summary.progress_percent(), 34);
    assert!(!summary.is_settled());
    assert_eq!(BatchSummary::default().progress_percent(), 0);
}

#[test]
fn job_templates_decode_pascal_case() {
    let raw = r#"{"Id":"1f0e2d3c-4b5a-4978-8695-a4b3c2d1e0f9","JobTypeName":"Proxy",
        "Steps":[{"Id":"2a1b3c4d-5e6f-4a7b-8c9d-0e1f2a3b4c5d","PredeterminedType":"analysis","InProgressLabel":"Analysing"}]}"#;
    let template: JobTemplate = serde_json::from_str(raw).unwrap();
    assert_eq!(template.name, "Proxy");
    assert_eq!(template.steps[0].in_progress_label, "Analysing");
}

#[test]
fn queue_stats_decode_alongside_the_status_field() {
    let stats: QueueStats =
        serde_json::from_str(r#"{"status":"ok","queues":{"jobrequest":4,"running":2}}"#).unwrap();
    assert_eq!(stats.queues.get("jobrequest"), Some(&4));
    assert_eq!(stats.total(), 6);
    assert_eq!(ServiceScope.to_string(), "service");
}

#[test]
fn job_status_summary_fills_missing_counts_with_zero() {
    let summary: JobStatusSummary =
        serde_json::from_str(r#"{"notqueued":3,"started":1,"failed":2}"#).unwrap();
    assert_eq!(summary.not_queued, 3);
    assert_eq!(summary.started, 1);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.pending, 0);
}
