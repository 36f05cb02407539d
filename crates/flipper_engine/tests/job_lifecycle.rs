use std::sync::{Arc, Once};
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use flipper_core::{BatchSummary, JobStatus};
use flipper_engine::{
    BatchCountersController, ClientSettings, JobEvent, JobLifecycleController, LiveEvent,
    ReqwestApi, ServiceApi,
};

static INIT: Once = Once::new();

const INTERVAL: Duration = Duration::from_millis(10);

fn api_for(server: &MockServer) -> Arc<dyn ServiceApi> {
    INIT.call_once(flipper_logging::initialize_for_tests);
    Arc::new(
        ReqwestApi::new(ClientSettings {
            base_url: format!("{}/api/", server.uri()),
            ..ClientSettings::default()
        })
        .expect("valid base url"),
    )
}

fn snapshot(status: i64, error_message: &str) -> Value {
    json!({
        "status": status,
        "completed_steps": 0,
        "steps": [],
        "error_message": error_message,
    })
}

async fn requests_to(server: &MockServer, endpoint: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == endpoint)
        .count()
}

async fn stopped_in_time(controller: &mut JobLifecycleController) {
    tokio::time::timeout(Duration::from_secs(2), controller.stopped())
        .await
        .expect("polling stops on its own");
}

#[tokio::test]
async fn polls_until_job_completes() {
    let server = MockServer::start().await;
    let job_id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path("/api/job-status"))
        .and(query_param("jobId", job_id.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot(1, "")))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/job-status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot(2, "")))
        .mount(&server)
        .await;
    let mut controller = JobLifecycleController::new(api_for(&server));

    controller.track(job_id, INTERVAL).expect("first track");
    stopped_in_time(&mut controller).await;

    let view = controller.view();
    assert_eq!(view.key, Some(job_id));
    assert_eq!(view.latest.map(|job| job.status), Some(JobStatus::Completed));
    assert_eq!(view.refreshes, 3);
    assert!(!view.polling);
    assert_eq!(view.last_error, None);
}

#[tokio::test]
async fn failed_job_stops_after_a_single_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/job-status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot(3, "disk full")))
        .mount(&server)
        .await;
    let mut controller = JobLifecycleController::new(api_for(&server));

    controller.track(Uuid::new_v4(), INTERVAL).unwrap();
    stopped_in_time(&mut controller).await;
    tokio::time::sleep(INTERVAL * 5).await;

    assert_eq!(requests_to(&server, "/api/job-status").await, 1);
    let view = controller.view();
    assert_eq!(view.last_error.as_deref(), Some("disk full"));
    assert_eq!(view.latest.map(|job| job.status), Some(JobStatus::Failed));
}

#[tokio::test]
async fn fetch_error_ends_polling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/job-status"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "database offline"})))
        .mount(&server)
        .await;
    let (tx, mut rx) = mpsc::unbounded_channel::<JobEvent>();
    let mut controller = JobLifecycleController::new(api_for(&server)).with_events(tx);

    controller.track(Uuid::new_v4(), INTERVAL).unwrap();
    stopped_in_time(&mut controller).await;
    tokio::time::sleep(INTERVAL * 5).await;

    assert_eq!(requests_to(&server, "/api/job-status").await, 1);
    assert_eq!(
        controller.view().last_error.as_deref(),
        Some("database offline")
    );
    assert_eq!(
        rx.recv().await,
        Some(LiveEvent::Failed("database offline".to_string()))
    );
}

#[tokio::test]
async fn observers_see_every_accepted_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/job-status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot(1, "")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/job-status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot(2, "")))
        .mount(&server)
        .await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut controller = JobLifecycleController::new(api_for(&server)).with_events(tx);

    controller.track(Uuid::new_v4(), INTERVAL).unwrap();
    stopped_in_time(&mut controller).await;

    let mut statuses = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let LiveEvent::Refreshed(job) = event {
            statuses.push(job.status);
        }
    }
    assert_eq!(statuses, vec![JobStatus::Started, JobStatus::Completed]);
}

#[tokio::test]
async fn teardown_releases_the_poll() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/job-status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot(1, "")))
        .mount(&server)
        .await;
    let mut controller = JobLifecycleController::new(api_for(&server));

    controller.track(Uuid::new_v4(), INTERVAL).unwrap();
    tokio::time::sleep(INTERVAL * 4).await;
    controller.teardown();
    controller.stopped().await;
    tokio::time::sleep(INTERVAL).await;
    let seen = requests_to(&server, "/api/job-status").await;
    tokio::time::sleep(INTERVAL * 5).await;

    assert!(seen >= 1);
    assert_eq!(requests_to(&server, "/api/job-status").await, seen);
    assert!(!controller.is_polling());
    assert!(!controller.view().polling);
}

#[tokio::test]
async fn tracking_another_job_replaces_the_first() {
    let server = MockServer::start().await;
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path("/api/job-status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(snapshot(1, "")))
        .mount(&server)
        .await;
    let mut controller = JobLifecycleController::new(api_for(&server));

    controller.track(first, INTERVAL).unwrap();
    tokio::time::sleep(INTERVAL * 2).await;
    controller.track(second, INTERVAL).unwrap();
    tokio::time::sleep(INTERVAL * 3).await;
    controller.teardown();
    controller.stopped().await;

    let view = controller.view();
    assert_eq!(view.key, Some(second));
    let requests = server.received_requests().await.unwrap_or_default();
    let last = requests.last().expect("polled at least once");
    assert_eq!(
        last.url.query(),
        Some(format!("jobId={second}").as_str())
    );
}

#[tokio::test]
async fn counters_refresh_until_the_batch_settles() {
    let server = MockServer::start().await;
    let batch_id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path("/api/batch/get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bulkListId": batch_id, "nickName": "nightly", "pendingCount": 1,
            "activeCount": 1, "completedCount": 1, "errorCount": 0,
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/batch/get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bulkListId": batch_id, "nickName": "nightly", "completedCount": 2,
            "errorCount": 1,
        })))
        .mount(&server)
        .await;
    let mut counters = BatchCountersController::for_batch(api_for(&server));

    counters.track(batch_id, INTERVAL).unwrap();
    tokio::time::timeout(Duration::from_secs(2), counters.stopped())
        .await
        .expect("settled batch stops polling");

    let latest: BatchSummary = counters.view().latest.expect("counters");
    assert!(latest.is_settled());
    assert_eq!(latest.progress_percent(), 100);
    assert_eq!(requests_to(&server, "/api/batch/get").await, 2);
}
