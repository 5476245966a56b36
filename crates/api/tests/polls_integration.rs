//! Integration tests for poll endpoints.

mod common;

use axum::http::{header, Method, StatusCode};
use chrono::Duration;
use common::{
    cast_vote, create_test_app, create_test_app_with, create_test_poll, empty_request,
    get_request, issue_token, json_request, option_id, parse_response_body, poll_id,
};
use fake::faker::lorem::en::Sentence;
use fake::Fake;
use quickpoll_api::config::Config;
use serde_json::json;

#[tokio::test]
async fn test_create_poll_keeps_option_order() {
    let app = create_test_app();
    let token = issue_token(&app).await;

    let title: String = Sentence(2..5).fake();
    let body = create_test_poll(&app, &token, &title, &["Pizza", "Tacos", "Sushi"]).await;

    assert_eq!(body["poll"]["title"], title.trim());
    assert_eq!(body["poll"]["status"], "active");
    assert_eq!(body["poll"]["total_votes"], 0);
    assert_eq!(body["poll"]["choice_mode"], "single_choice");
    assert_eq!(body["poll"]["visibility"], "public_by_code");
    assert_eq!(body["poll"]["short_code"].as_str().unwrap().len(), 8);

    let texts: Vec<_> = body["options"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["text"].as_str().unwrap())
        .collect();
    assert_eq!(texts, vec!["Pizza", "Tacos", "Sushi"]);
    assert_eq!(body["options"][2]["display_order"], 2);

    // Known creator: no new identity in the body.
    assert!(body.get("identity").is_none());
}

#[tokio::test]
async fn test_create_poll_without_token_issues_identity_and_cookie() {
    let app = create_test_app();

    let response = app
        .send(json_request(
            Method::POST,
            "/api/v1/polls",
            json!({ "title": "Lunch?", "options": ["Pizza", "Tacos"] }),
            None,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("voter cookie")
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("qp_voter=qv_"));
    assert!(cookie.contains("HttpOnly"));

    let body = parse_response_body(response).await;
    assert_eq!(body["identity"]["created"], true);
    let token = body["identity"]["session_token"].as_str().unwrap();
    assert!(cookie.contains(token));
}

#[tokio::test]
async fn test_create_poll_validation_errors() {
    let app = create_test_app();
    let token = issue_token(&app).await;

    let cases = vec![
        json!({ "title": "   ", "options": ["a", "b"] }),
        json!({ "title": "One option", "options": ["a", "  "] }),
        json!({ "title": "Bad ttl", "options": ["a", "b"], "ttl_hours": 3 }),
        json!({ "title": "x".repeat(201), "options": ["a", "b"] }),
        json!({ "title": "Too many", "options": (0..11).map(|i| format!("o{}", i)).collect::<Vec<_>>() }),
    ];

    for payload in cases {
        let response = app
            .send(json_request(Method::POST, "/api/v1/polls", payload.clone(), Some(&token)))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "payload: {}", payload);
        let body = parse_response_body(response).await;
        assert_eq!(body["error"], "validation_error");
    }
}

#[tokio::test]
async fn test_invalid_create_without_token_issues_no_identity() {
    let app = create_test_app();

    let response = app
        .send(json_request(
            Method::POST,
            "/api/v1/polls",
            json!({ "title": "Lonely", "options": ["only"] }),
            None,
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    assert_eq!(app.store.identity_count(), 0);
}

#[tokio::test]
async fn test_option_limit_counts_non_blank_entries() {
    let app = create_test_app();
    let token = issue_token(&app).await;

    let mut options: Vec<String> = (0..10).map(|i| format!("Choice {}", i)).collect();
    options.push("  ".to_string());
    let response = app
        .send(json_request(
            Method::POST,
            "/api/v1/polls",
            json!({ "title": "Ten and a blank", "options": options }),
            Some(&token),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = parse_response_body(response).await;
    assert_eq!(body["options"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn test_get_poll_and_options() {
    let app = create_test_app();
    let token = issue_token(&app).await;
    let poll = create_test_poll(&app, &token, "Pizza or Tacos?", &["Pizza", "Tacos"]).await;
    let id = poll_id(&poll);

    let response = app.send(get_request(&format!("/api/v1/polls/{}", id), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["id"], id);
    assert_eq!(body["share_path"], format!("/poll/{}", id));
    assert!(body.get("share_url").is_none());

    let response = app
        .send(get_request(&format!("/api/v1/polls/{}/options", id), None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(body[0]["text"], "Pizza");
    assert_eq!(body[0]["vote_count"], 0);
}

#[tokio::test]
async fn test_share_url_uses_public_base_url() {
    let config = Config::load_for_test(&[("server.public_base_url", "https://polls.example.com/")])
        .unwrap();
    let app = create_test_app_with(config);
    let token = issue_token(&app).await;
    let poll = create_test_poll(&app, &token, "Shared", &["a", "b"]).await;

    assert_eq!(
        poll["poll"]["share_url"],
        format!("https://polls.example.com/poll/{}", poll_id(&poll))
    );
}

#[tokio::test]
async fn test_get_unknown_poll_returns_404() {
    let app = create_test_app();

    let response = app
        .send(get_request(
            &format!("/api/v1/polls/{}", uuid::Uuid::new_v4()),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "not_found");

    let response = app.send(get_request("/api/v1/polls/not-a-uuid", None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_results_percentages() {
    let app = create_test_app();
    let creator = issue_token(&app).await;
    let poll = create_test_poll(&app, &creator, "Best editor?", &["vim", "emacs", "nano"]).await;
    let id = poll_id(&poll);

    for index in [0, 0, 1] {
        let voter = issue_token(&app).await;
        let response = cast_vote(&app, &voter, id, option_id(&poll, index)).await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .send(get_request(&format!("/api/v1/polls/{}/results", id), None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;

    assert_eq!(body["total_votes"], 3);
    assert_eq!(body["poll"]["total_votes"], 3);
    assert_eq!(body["options"][0]["vote_count"], 2);
    assert_eq!(body["options"][0]["percentage"], 66.7);
    assert_eq!(body["options"][1]["percentage"], 33.3);
    assert_eq!(body["options"][2]["percentage"], 0.0);
}

#[tokio::test]
async fn test_close_poll_by_creator_blocks_votes() {
    let app = create_test_app();
    let creator = issue_token(&app).await;
    let poll = create_test_poll(&app, &creator, "Closing soon", &["yes", "no"]).await;
    let id = poll_id(&poll);
    let close_uri = format!("/api/v1/polls/{}/close", id);

    let response = app
        .send(empty_request(Method::POST, &close_uri, Some(&creator)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["status"], "closed");

    // Closing again is harmless.
    let response = app
        .send(empty_request(Method::POST, &close_uri, Some(&creator)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let voter = issue_token(&app).await;
    let response = cast_vote(&app, &voter, id, option_id(&poll, 0)).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "poll_closed");
}

#[tokio::test]
async fn test_close_poll_requires_creator() {
    let app = create_test_app();
    let creator = issue_token(&app).await;
    let poll = create_test_poll(&app, &creator, "Mine", &["a", "b"]).await;
    let close_uri = format!("/api/v1/polls/{}/close", poll_id(&poll));

    let response = app.send(empty_request(Method::POST, &close_uri, None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .send(empty_request(Method::POST, &close_uri, Some("qv_not-a-real-token")))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let stranger = issue_token(&app).await;
    let response = app
        .send(empty_request(Method::POST, &close_uri, Some(&stranger)))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn test_poll_expires_after_ttl() {
    let app = create_test_app();
    let creator = issue_token(&app).await;
    let poll = create_test_poll(&app, &creator, "Quick one", &["a", "b"]).await;
    let id = poll_id(&poll);

    app.clock.advance(Duration::minutes(59));
    let response = app.send(get_request(&format!("/api/v1/polls/{}", id), None)).await;
    assert_eq!(parse_response_body(response).await["status"], "active");

    app.clock.advance(Duration::hours(1));
    let response = app.send(get_request(&format!("/api/v1/polls/{}", id), None)).await;
    assert_eq!(parse_response_body(response).await["status"], "expired");

    let voter = issue_token(&app).await;
    let response = cast_vote(&app, &voter, id, option_id(&poll, 1)).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(parse_response_body(response).await["error"], "poll_closed");
}
