//! Common test utilities for integration tests.
//!
//! The router runs against the in-memory store with a manual clock, so these
//! tests need no database.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request},
    response::Response,
    Router,
};
use domain::services::{InMemoryStore, ManualClock, PollService};
use quickpoll_api::{
    app::{build_service, create_app_with_service},
    config::Config,
};
use serde_json::{json, Value};
use tower::ServiceExt;

pub use quickpoll_api::extractors::VOTER_TOKEN_HEADER;

/// A router plus handles for steering its backend.
pub struct TestApp {
    pub router: Router,
    pub service: PollService,
    pub store: Arc<InMemoryStore>,
    pub clock: Arc<ManualClock>,
    pub config: Config,
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

pub fn test_config() -> Config {
    Config::load_for_test(&[]).expect("test config")
}

pub fn create_test_app() -> TestApp {
    create_test_app_with(test_config())
}

pub fn create_test_app_with(config: Config) -> TestApp {
    let (stores, store) = InMemoryStore::stores();
    let clock = Arc::new(ManualClock::default());
    let service = build_service(&config, stores, clock.clone());
    let router = create_app_with_service(config.clone(), service.clone(), None);

    TestApp {
        router,
        service,
        store,
        clock,
        config,
    }
}

/// Build a JSON request, optionally carrying a voter token header.
pub fn json_request(method: Method, uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(VOTER_TOKEN_HEADER, token);
    }
    builder
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

/// Build a bodyless request, optionally carrying a voter token header.
pub fn empty_request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(VOTER_TOKEN_HEADER, token);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    empty_request(Method::GET, uri, token)
}

/// Parse response body as JSON.
pub async fn parse_response_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(Value::Null)
}

/// Issues a fresh voter identity and returns its token.
pub async fn issue_token(app: &TestApp) -> String {
    let response = app
        .send(json_request(Method::POST, "/api/v1/identity", json!({}), None))
        .await;
    let body = parse_response_body(response).await;
    body["session_token"].as_str().unwrap().to_string()
}

/// Creates a poll as `token` and returns the response body.
pub async fn create_test_poll(app: &TestApp, token: &str, title: &str, options: &[&str]) -> Value {
    let response = app
        .send(json_request(
            Method::POST,
            "/api/v1/polls",
            json!({ "title": title, "options": options, "ttl_hours": 1 }),
            Some(token),
        ))
        .await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    parse_response_body(response).await
}

pub fn poll_id(poll: &Value) -> &str {
    poll["poll"]["id"].as_str().unwrap()
}

pub fn option_id(poll: &Value, index: usize) -> &str {
    poll["options"][index]["id"].as_str().unwrap()
}

pub async fn cast_vote(app: &TestApp, token: &str, poll_id: &str, option_id: &str) -> Response {
    app.send(json_request(
        Method::POST,
        &format!("/api/v1/polls/{}/votes", poll_id),
        json!({ "option_id": option_id }),
        Some(token),
    ))
    .await
}
