//! Passive-mode bulletin board: create, poll, fetch and clear.

mod common;

use axum::http::{Method, StatusCode};
use axum::Router;
use common::{call, router_for, state_for, unreachable_url};
use serde_json::{json, Value};
use std::time::Duration;

async fn board() -> Router {
    router_for(&state_for(&unreachable_url().await))
}

async fn create(app: &Router, body: Value) -> (StatusCode, Value) {
    call(app, Method::POST, "/admin/create-notification", Some(body)).await
}

fn ids(list: &Value) -> Vec<String> {
    list["notifications"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_create_fills_defaults() {
    let app = board().await;

    let (status, body) = create(&app, json!({ "title": "Maintenance", "content": "tonight" })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);

    let n = &body["notification"];
    assert!(!n["id"].as_str().unwrap().is_empty());
    assert_eq!(n["type"], "info");
    assert_eq!(n["priority"], "normal");
    assert_eq!(n["source"], "admin");
    assert_eq!(n["metadata"], json!({}));
    assert!(n.get("callback_url").map_or(true, Value::is_null));
}

#[tokio::test]
async fn test_poll_returns_insertion_order_with_limit() {
    let app = board().await;
    for id in ["A", "B", "C", "D", "E"] {
        let (status, _) = create(&app, json!({ "id": id, "title": id, "content": "x" })).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = call(&app, Method::GET, "/api/notifications", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec!["A", "B", "C", "D", "E"]);

    let (_, body) = call(&app, Method::GET, "/api/notifications?limit=2", None).await;
    assert_eq!(ids(&body), vec!["A", "B"]);
}

#[tokio::test]
async fn test_poll_default_limit_is_ten() {
    let app = board().await;
    for i in 0..12 {
        create(&app, json!({ "id": format!("n{i}"), "title": "t", "content": "c" })).await;
    }

    let (_, body) = call(&app, Method::GET, "/api/notifications", None).await;
    assert_eq!(ids(&body).len(), 10);
    assert_eq!(ids(&body)[0], "n0");
}

#[tokio::test]
async fn test_poll_since_is_strict() {
    let app = board().await;
    let (_, first) = create(&app, json!({ "id": "old", "title": "t", "content": "c" })).await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    create(&app, json!({ "id": "new", "title": "t", "content": "c" })).await;

    let since = first["notification"]["timestamp"].as_str().unwrap().to_string();
    let (status, body) = call(
        &app,
        Method::GET,
        &format!("/api/notifications?since={since}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec!["new"]);
}

#[tokio::test]
async fn test_poll_ignores_unparsable_since() {
    let app = board().await;
    create(&app, json!({ "id": "A", "title": "t", "content": "c" })).await;
    create(&app, json!({ "id": "B", "title": "t", "content": "c" })).await;

    let (status, body) = call(&app, Method::GET, "/api/notifications?since=not-a-date", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec!["A", "B"]);
}

#[tokio::test]
async fn test_poll_since_in_the_future_is_empty() {
    let app = board().await;
    create(&app, json!({ "id": "A", "title": "t", "content": "c" })).await;

    let (_, body) = call(&app, Method::GET, "/api/notifications?since=2999-01-01", None).await;
    assert!(ids(&body).is_empty());
}

#[tokio::test]
async fn test_get_by_id() {
    let app = board().await;
    create(
        &app,
        json!({
            "id": "order-7",
            "title": "Order shipped",
            "content": "on its way",
            "priority": "high",
            "callback_url": "https://shop.example.com/orders/7"
        }),
    )
    .await;

    let (status, body) = call(&app, Method::GET, "/api/notifications/order-7", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notification"]["title"], "Order shipped");
    assert_eq!(body["notification"]["priority"], "high");
    assert_eq!(
        body["notification"]["callback_url"],
        "https://shop.example.com/orders/7"
    );

    let (status, body) = call(&app, Method::GET, "/api/notifications/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_duplicate_id_conflicts() {
    let app = board().await;
    let (status, _) = create(&app, json!({ "id": "same", "title": "t", "content": "c" })).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = create(&app, json!({ "id": "same", "title": "t2", "content": "c" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let (_, body) = call(&app, Method::GET, "/api/notifications/same", None).await;
    assert_eq!(body["notification"]["title"], "t");
}

#[tokio::test]
async fn test_blank_id_is_rejected() {
    let app = board().await;
    let (status, _) = create(&app, json!({ "id": "  ", "title": "t", "content": "c" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_wrongly_typed_create_body_is_json_bad_request() {
    let app = board().await;
    let (status, body) = create(&app, json!({ "title": "t", "content": "c", "metadata": [1, 2] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());

    let (_, list) = call(&app, Method::GET, "/api/notifications", None).await;
    assert!(ids(&list).is_empty());
}

#[tokio::test]
async fn test_clear_reports_count_and_health_follows() {
    let app = board().await;
    for id in ["A", "B", "C"] {
        create(&app, json!({ "id": id, "title": "t", "content": "c" })).await;
    }

    let (_, health) = call(&app, Method::GET, "/health", None).await;
    assert_eq!(health["notifications_count"], 3);

    let (status, body) = call(&app, Method::POST, "/admin/clear-notifications", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cleared"], 3);

    let (_, body) = call(&app, Method::GET, "/api/notifications", None).await;
    assert!(ids(&body).is_empty());
    let (_, health) = call(&app, Method::GET, "/health", None).await;
    assert_eq!(health["notifications_count"], 0);
}
