//! In-process mock backend for end-to-end tests

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use invoke_client::{
    ActivityBroadcast, CountingUiBlocker, RecordingNavigator, RecordingRenderer,
    RequestAccounting, ServiceClient, ServiceClientBuilder,
};
use invoke_core::ClientConfig;
use serde_json::{json, Value};
use tokio::net::TcpListener;

pub const TOKEN: &str = "tok-123";

pub fn router() -> Router {
    Router::new()
        .route("/Services/Northwind/Order/List", post(order_list))
        .route("/Services/Echo/Headers", post(echo_headers))
        .route("/Services/Fail/Code", post(|| async { Json(json!({"Error": {"Code": "X"}})) }))
        .route("/Services/Fail/Empty", post(|| async { StatusCode::OK }))
        .route("/Services/Fail/Redirect", post(redirect))
        .route("/Services/Fail/NotFound", post(|| async { (StatusCode::NOT_FOUND, "missing") }))
        .route("/Services/Fail/Server", post(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
        .route("/Services/Fail/NotLoggedIn", post(not_logged_in))
        .route("/Services/Created", post(created))
        .route("/Services/Slow", post(slow))
}

async fn order_list(Json(request): Json<Value>) -> Json<Value> {
    let take = request.get("Take").and_then(Value::as_u64).unwrap_or(0);
    Json(json!({
        "Error": null,
        "Entities": [{"OrderID": 10248}, {"OrderID": 10249}],
        "TotalCount": 2,
        "Take": take,
    }))
}

async fn echo_headers(headers: HeaderMap) -> Json<Value> {
    let text = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    Json(json!({
        "Token": text("x-csrf-token"),
        "CacheControl": text("cache-control"),
        "Accept": text("accept"),
        "ContentType": text("content-type"),
    }))
}

async fn redirect() -> Response {
    (StatusCode::FORBIDDEN, [(header::LOCATION, "/account/login")]).into_response()
}

async fn not_logged_in() -> Json<Value> {
    Json(json!({"Error": {"Code": "NotLoggedIn", "Message": "Please log in"}}))
}

async fn created() -> Response {
    (StatusCode::CREATED, Json(json!({"EntityId": 5}))).into_response()
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({}))
}

/// Serve the mock backend on the current runtime
pub async fn spawn_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router()).await.unwrap();
    });
    addr
}

/// Serve the mock backend from a background thread with its own runtime
pub fn spawn_backend_thread() -> SocketAddr {
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async move {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            tx.send(listener.local_addr().unwrap()).unwrap();
            axum::serve(listener, router()).await.unwrap();
        });
    });
    rx.recv().unwrap()
}

/// A client pointed at `addr` with recording collaborators
pub struct Harness {
    pub client: ServiceClient,
    pub renderer: Arc<RecordingRenderer>,
    pub navigator: Arc<RecordingNavigator>,
    pub ui: Arc<CountingUiBlocker>,
    pub accounting: Arc<RequestAccounting>,
    pub activity: ActivityBroadcast,
}

pub fn config(addr: SocketAddr) -> ClientConfig {
    ClientConfig::new(&format!("http://{addr}/page"))
        .unwrap()
        .with_cookies(format!("session=abc; CSRF-TOKEN={TOKEN}"))
}

pub fn harness(addr: SocketAddr) -> Harness {
    harness_with(addr, |builder| builder)
}

pub fn harness_with(
    addr: SocketAddr,
    customize: impl FnOnce(ServiceClientBuilder) -> ServiceClientBuilder,
) -> Harness {
    let renderer = Arc::new(RecordingRenderer::new());
    let navigator = Arc::new(RecordingNavigator::new());
    let ui = Arc::new(CountingUiBlocker::new());
    let activity = ActivityBroadcast::new();
    let accounting = Arc::new(RequestAccounting::with_activity(activity.clone()));

    let builder = ServiceClient::builder(config(addr))
        .renderer(renderer.clone())
        .navigator(navigator.clone())
        .ui_blocker(ui.clone())
        .accounting(accounting.clone());
    let client = customize(builder).build().unwrap();

    Harness {
        client,
        renderer,
        navigator,
        ui,
        accounting,
        activity,
    }
}
