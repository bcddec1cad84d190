//! Shared fixtures: an in-process mock platform and request helpers.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    routing::post,
    Json, Router,
};
use relay_platform::{RECEIVE_PATH, VERIFY_PATH};
use relay_server::{app, config::Config, AppState};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceExt;

pub const PUBLIC_URL: &str = "http://relay.test:5000";

/// How the mock platform answers.
#[derive(Clone)]
pub struct MockBehavior {
    pub verify_status: StatusCode,
    /// Verification body; `None` answers with a fresh `tok-<n>` token.
    pub verify_body: Option<Value>,
    pub verify_delay: Duration,
    pub receive_status: StatusCode,
    pub receive_body: Value,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            verify_status: StatusCode::CREATED,
            verify_body: None,
            verify_delay: Duration::ZERO,
            receive_status: StatusCode::CREATED,
            receive_body: json!({ "message": "received", "notificationId": "platform-1" }),
        }
    }
}

/// Handle to a running mock platform.
#[derive(Clone)]
pub struct MockPlatform {
    pub base_url: String,
    pub exchange_calls: Arc<AtomicUsize>,
    pub submit_calls: Arc<AtomicUsize>,
    pub verify_requests: Arc<Mutex<Vec<Value>>>,
    pub submit_requests: Arc<Mutex<Vec<Value>>>,
}

impl MockPlatform {
    pub fn exchanges(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    pub fn submits(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn last_submit(&self) -> Value {
        self.submit_requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no submit request recorded")
    }
}

pub async fn spawn_mock_platform(behavior: MockBehavior) -> MockPlatform {
    let exchange_calls = Arc::new(AtomicUsize::new(0));
    let submit_calls = Arc::new(AtomicUsize::new(0));
    let verify_requests = Arc::new(Mutex::new(Vec::new()));
    let submit_requests = Arc::new(Mutex::new(Vec::new()));

    let verify = {
        let calls = exchange_calls.clone();
        let seen = verify_requests.clone();
        let behavior = behavior.clone();
        move |Json(body): Json<Value>| {
            let calls = calls.clone();
            let seen = seen.clone();
            let behavior = behavior.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                seen.lock().unwrap().push(body);
                tokio::time::sleep(behavior.verify_delay).await;
                let body = behavior.verify_body.unwrap_or_else(|| {
                    json!({
                        "message": "verified",
                        "token": format!("tok-{n}"),
                        "subscription": { "id": format!("sub-{n}"), "mode": "active" }
                    })
                });
                (behavior.verify_status, Json(body))
            }
        }
    };

    let receive = {
        let calls = submit_calls.clone();
        let seen = submit_requests.clone();
        let behavior = behavior.clone();
        move |Json(body): Json<Value>| {
            let calls = calls.clone();
            let seen = seen.clone();
            let behavior = behavior.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                seen.lock().unwrap().push(body);
                (behavior.receive_status, Json(behavior.receive_body))
            }
        }
    };

    let router = Router::new()
        .route(VERIFY_PATH, post(verify))
        .route(RECEIVE_PATH, post(receive));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    MockPlatform {
        base_url: format!("http://{}", addr),
        exchange_calls,
        submit_calls,
        verify_requests,
        submit_requests,
    }
}

/// A base URL on which nothing listens.
pub async fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

pub fn state_for(platform_url: &str) -> AppState {
    let mut config = Config::default();
    config.platform.base_url = platform_url.to_string();
    config.server.public_url = PUBLIC_URL.to_string();
    config.relay.source_name = "Relay Tests".to_string();
    AppState::from_config(&config).unwrap()
}

pub fn router_for(state: &AppState) -> Router {
    app(state.clone())
}

/// Sends a request through the router and returns status and JSON body.
pub async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, json)
}

pub async fn send(app: &Router, body: Value) -> (StatusCode, Value) {
    call(app, Method::POST, "/api/send-notification", Some(body)).await
}
