//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{TimeZone, Utc};
use escapade_conversation::domain::settings::EngineSettings;
use escapade_core::repository::{ProgressRepository, StoryGraphRepository};
use escapade_reply::{ReplyPart, ReplyRenderer, parse_reply};
use escapade_test_support::{
    FixedClock, InMemoryProgressRepository, StoryBuilder, StoryGraph, item_id, puzzle, scene_id,
};
use escapade_core::model::Puzzle;
use http_body_util::BodyExt;
use tower::ServiceExt;
use url::Url;

use escapade_api::state::AppState;

/// Sender used by the tests.
pub const PHONE: &str = "whatsapp:+393331234567";

/// Gate (intro) -> hall (investigation) -> study (puzzle, grants the brass
/// key, back to the hall) or exit (final).
pub fn manor() -> StoryGraph {
    StoryBuilder::new("manor")
        .item("brass-key", "Brass key")
        .intro("gate", "<p>The gate creaks open.</p>", Some("hall"))
        .media("gate", Some("scenes/gate.gif"), None)
        .investigation("hall", "<p>Two doors.</p>", &[("Study", "study"), ("Exit", "exit")])
        .puzzle(
            "study",
            "<p>A locked drawer.</p>",
            Puzzle {
                item_id: Some(item_id("brass-key")),
                next_scene_id: Some(scene_id("hall")),
                ..puzzle("Which year?", "1887")
            },
        )
        .final_scene("exit", "<p>You are free.</p>")
        .build()
}

/// Build the full app router over the given stores with a fixed clock.
/// Uses the same route structure as `main.rs`.
pub fn build_app_with(
    graph: Arc<dyn StoryGraphRepository>,
    progress: Arc<dyn ProgressRepository>,
) -> Router {
    let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()));
    let renderer = ReplyRenderer::new(Url::parse("https://play.example.com").unwrap());
    let settings = EngineSettings {
        default_project_slug: Some("manor".to_owned()),
        ..EngineSettings::default()
    };
    escapade_api::router(AppState::new(graph, progress, clock, renderer, settings))
}

/// Build the app over the manor story and `progress`.
pub fn build_test_app(progress: Arc<InMemoryProgressRepository>) -> Router {
    build_app_with(Arc::new(manor()), progress)
}

/// Post a webhook form and return the status, content type and reply parts.
pub async fn post_webhook(app: Router, form: &str) -> (StatusCode, String, Vec<ReplyPart>) {
    let request = Request::builder()
        .method("POST")
        .uri("/webhooks/whatsapp")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(form.to_owned()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    read_reply(response).await
}

/// Send a message from [`PHONE`] and return the reply parts.
pub async fn say(app: Router, body: &str) -> Vec<ReplyPart> {
    let form = format!("From={}&Body={}&MessageSid=SM0001", encode(PHONE), encode(body));
    let (status, _, parts) = post_webhook(app, &form).await;
    assert_eq!(status, StatusCode::OK);
    parts
}

/// Send a POST request with a JSON body and return the reply parts.
pub async fn post_json_for_reply(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, String, Vec<ReplyPart>) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    read_reply(response).await
}

/// Post `body` with an arbitrary content type and return the reply parts.
pub async fn post_raw_for_reply(
    app: Router,
    uri: &str,
    content_type: &str,
    body: &str,
) -> (StatusCode, String, Vec<ReplyPart>) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", content_type)
        .body(Body::from(body.to_owned()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    read_reply(response).await
}

/// Send a GET request and return the reply parts.
pub async fn get_reply(app: Router, uri: &str) -> (StatusCode, String, Vec<ReplyPart>) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    read_reply(response).await
}

/// Send a GET request and return the JSON response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Text bodies of a reply, in order.
pub fn texts(parts: &[ReplyPart]) -> Vec<&str> {
    parts.iter().filter_map(ReplyPart::body).collect()
}

async fn read_reply(response: axum::response::Response) -> (StatusCode, String, Vec<ReplyPart>) {
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|value| value.to_str().unwrap().to_owned())
        .unwrap_or_default();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let document = String::from_utf8(body_bytes.to_vec()).unwrap();
    let parts = parse_reply(&document).unwrap();

    (status, content_type, parts)
}

/// Minimal form encoding for the characters the tests send.
fn encode(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('+', "%2B")
        .replace(':', "%3A")
        .replace('&', "%26")
        .replace(' ', "+")
}
