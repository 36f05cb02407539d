use std::ops::ControlFlow;
use std::sync::{Arc, Once};

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use flipper_engine::{
    ChannelDiagnostics, ClientError, ClientSettings, PageEnd, ReadNext, ReqwestApi, ServiceApi,
    StreamCursor, StreamOptions, StreamSession,
};

static INIT: Once = Once::new();

async fn feed_server(body: &str) -> MockServer {
    INIT.call_once(flipper_logging::initialize_for_tests);
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;
    server
}

fn api_for(server: &MockServer) -> ReqwestApi {
    ReqwestApi::new(ClientSettings {
        base_url: format!("{}/api", server.uri()),
        ..ClientSettings::default()
    })
    .expect("valid base url")
}

#[tokio::test]
async fn reopening_cancels_the_previous_session() {
    let server = feed_server("{\"id\":1}\n{\"id\":2}\n").await;
    let api = api_for(&server);
    let url = api.resolve("feed", &[]).expect("url");
    let mut cursor = StreamCursor::new();
    assert_eq!(cursor.active_session(), None);

    let mut first: StreamSession<Value> = cursor
        .open(&api, url.clone(), StreamOptions::default())
        .await
        .expect("first open");
    assert_eq!(cursor.active_session(), Some(first.id()));
    assert!(first.is_active());

    let second: StreamSession<Value> = cursor
        .open(&api, url, StreamOptions::default())
        .await
        .expect("second open");
    assert_ne!(first.id(), second.id());
    assert_eq!(cursor.active_session(), Some(second.id()));
    assert!(!first.is_active());
    assert_eq!(first.read_next().await, Ok(ReadNext::Done));
    assert!(second.is_active());

    cursor.cancel();
    cursor.cancel();
    assert_eq!(cursor.active_session(), None);
    assert!(!second.is_active());
}

#[tokio::test]
async fn failed_open_leaves_no_active_session() {
    INIT.call_once(flipper_logging::initialize_for_tests);
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/feed"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"detail": "down"})))
        .mount(&server)
        .await;
    let api = api_for(&server);
    let url = api.resolve("feed", &[]).expect("url");
    let mut cursor = StreamCursor::new();

    let err = cursor
        .open::<Value>(&api, url, StreamOptions::default())
        .await
        .err()
        .expect("open fails");
    assert_eq!(
        err,
        ClientError::Server {
            status: 503,
            detail: "down".to_string()
        }
    );
    assert_eq!(cursor.active_session(), None);
}

#[tokio::test]
async fn dropped_lines_arrive_on_the_diagnostics_channel() {
    let server = feed_server("{\"id\":1}\nnot json\n{\"id\":2}\n").await;
    let api = api_for(&server);
    let url = api.resolve("feed", &[]).expect("url");
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let options =
        StreamOptions::default().with_diagnostics(Arc::new(ChannelDiagnostics::new(tx)));
    let mut cursor = StreamCursor::new();

    let mut session: StreamSession<Value> = cursor
        .open(&api, url.clone(), options)
        .await
        .expect("open");
    let mut page = Vec::new();
    let end = session
        .read_page(|record| {
            page.push(record);
            ControlFlow::Continue(())
        })
        .await
        .expect("page");
    assert_eq!(page, vec![json!({"id": 1}), json!({"id": 2})]);
    assert_eq!(end, PageEnd::Exhausted);

    let diagnostic = rx.try_recv().expect("one dropped line");
    assert_eq!(diagnostic.session, session.id());
    assert_eq!(diagnostic.source_url, url.to_string());
    assert!(matches!(diagnostic.error, ClientError::MalformedRecord(_)));
    assert!(rx.try_recv().is_err());
}
