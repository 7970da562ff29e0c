use super::*;
use crate::{CommandOutcome, ControllerOptions, UiController};
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};
use tokio::net::TcpListener;

#[derive(Clone)]
struct PcServerState {
    count: Arc<AtomicI64>,
    pico_connected: bool,
}

async fn handle_start_command(State(state): State<PcServerState>) -> Json<CommandResponse> {
    let message = if state.pico_connected {
        "Command sent to PicoW."
    } else {
        "PicoW is not connected."
    };
    Json(CommandResponse {
        message: message.to_string(),
    })
}

async fn handle_get_count(State(state): State<PcServerState>) -> Json<CountResponse> {
    Json(CountResponse {
        count: state.count.load(Ordering::SeqCst),
    })
}

async fn serve(app: Router) -> Result<String, std::io::Error> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}"))
}

async fn spawn_pc_server(pico_connected: bool, count: i64) -> (String, Arc<AtomicI64>) {
    let count = Arc::new(AtomicI64::new(count));
    let state = PcServerState {
        count: Arc::clone(&count),
        pico_connected,
    };
    let app = Router::new()
        .route(START_COMMAND_PATH, get(handle_start_command))
        .route(GET_COUNT_PATH, get(handle_get_count))
        .with_state(state);
    (serve(app).await.expect("spawn server"), count)
}

async fn spawn_broken_server() -> String {
    let app = Router::new()
        .route(
            START_COMMAND_PATH,
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        )
        .route(GET_COUNT_PATH, get(|| async { "count=3" }));
    serve(app).await.expect("spawn server")
}

#[tokio::test]
async fn fetches_start_command_message() {
    let (server_url, _count) = spawn_pc_server(true, 0).await;
    let api = HttpDeviceApi::new(&server_url).expect("api");

    let response = api.start_command().await.expect("start command");
    assert_eq!(response.message, "Command sent to PicoW.");
}

#[tokio::test]
async fn fetches_current_count() {
    let (server_url, count) = spawn_pc_server(true, 12).await;
    let api = HttpDeviceApi::new(&server_url).expect("api");

    assert_eq!(api.get_count().await.expect("count").count, 12);
    count.store(13, Ordering::SeqCst);
    assert_eq!(api.get_count().await.expect("count").count, 13);
}

#[tokio::test]
async fn endpoints_resolve_against_server_origin() {
    let (server_url, _count) = spawn_pc_server(true, 2).await;
    let api = HttpDeviceApi::new(&format!("{server_url}/panel/index.html")).expect("api");

    assert_eq!(api.get_count().await.expect("count").count, 2);
}

#[tokio::test]
async fn non_success_status_is_reported() {
    let server_url = spawn_broken_server().await;
    let api = HttpDeviceApi::new(&server_url).expect("api");

    let err = api.start_command().await.expect_err("must fail");
    match err {
        TransportError::Status { endpoint, status } => {
            assert_eq!(endpoint, START_COMMAND_PATH);
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn non_json_body_is_malformed() {
    let server_url = spawn_broken_server().await;
    let api = HttpDeviceApi::new(&server_url).expect("api");

    let err = api.get_count().await.expect_err("must fail");
    assert!(
        matches!(&err, TransportError::Malformed { endpoint, .. } if *endpoint == GET_COUNT_PATH),
        "unexpected error: {err}"
    );
}

#[tokio::test]
async fn unreachable_server_is_a_request_error() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let api = HttpDeviceApi::new(&format!("http://{addr}")).expect("api");
    let err = api.get_count().await.expect_err("must fail");
    assert!(matches!(err, TransportError::Request { .. }), "unexpected error: {err}");
    assert_eq!(err.endpoint(), Some(GET_COUNT_PATH));
}

#[test]
fn rejects_invalid_base_url() {
    let err = HttpDeviceApi::new("not a url").expect_err("must fail");
    assert!(matches!(err, TransportError::InvalidUrl(_)));
    assert_eq!(err.endpoint(), None);
}

#[tokio::test]
async fn controller_reports_server_message_over_http() {
    let (server_url, _count) = spawn_pc_server(false, 0).await;
    let api = Arc::new(HttpDeviceApi::new(&server_url).expect("api"));
    let controller = UiController::new(api, ControllerOptions::default());

    let outcome = controller.send_start_command().await;
    assert_eq!(
        outcome,
        CommandOutcome::Delivered("PicoW is not connected.".to_string())
    );
    assert_eq!(controller.snapshot().await.status_text, "PicoW is not connected.");

    assert_eq!(
        controller.update_blink_count().await,
        crate::PollOutcome::Applied(0)
    );
}

#[tokio::test]
async fn controller_collapses_http_failures() {
    let server_url = spawn_broken_server().await;
    let api = Arc::new(HttpDeviceApi::new(&server_url).expect("api"));
    let controller = UiController::new(api, ControllerOptions::default());

    assert_eq!(controller.send_start_command().await, CommandOutcome::Failed);
    assert_eq!(controller.snapshot().await.status_text, "Error sending command.");

    assert_eq!(
        controller.update_blink_count().await,
        crate::PollOutcome::Failed
    );
    assert_eq!(controller.snapshot().await.blink_count, None);
}
