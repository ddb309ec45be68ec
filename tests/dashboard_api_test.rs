mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    routing::post,
    Json, Router,
};
use common::*;
use resume_screener::models::candidate::NewCandidate;
use resume_screener::models::screening::{CanonicalScreeningResult, NormalizedVerdict};
use resume_screener::services::candidate_service::{CandidateStore, MemoryCandidateStore};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;

fn result(score: u8, verdict: &str) -> CanonicalScreeningResult {
    CanonicalScreeningResult {
        overall_score: score,
        verdict: verdict.into(),
        normalized_verdict: NormalizedVerdict::from_verdict(verdict),
        confidence: 80.0,
        summary: "Summary".into(),
        matched_skills: vec!["Rust".into()],
        years_relevant_experience: 3.0,
        short_reason: "Reason".into(),
        recommended_next_steps: vec!["Next".into()],
        calendar_link: None,
        email_draft: None,
    }
}

async fn seed(store: &Arc<MemoryCandidateStore>, score: u8, verdict: &str, role: &str) -> uuid::Uuid {
    store
        .insert(NewCandidate::new("Ada Lovelace", "ada@lovelace.dev", role, result(score, verdict)))
        .await
        .unwrap()
        .id
}

fn authed(method: &str, uri: &str, body: Option<JsonValue>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", bearer_token());
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn dispatch_body(score: i32, verdict: &str) -> JsonValue {
    json!({
        "candidateName": "Bob \"Evil\" <script>",
        "candidateEmail": "bob@example.net",
        "result": {
            "overall_score": score,
            "verdict": verdict,
            "normalizedVerdict": "Unknown",
            "short_reason": "<b>bold</b> claim",
            "recommended_next_steps": ["Apply again"]
        }
    })
}

async fn spawn_resend() -> (String, Recorder) {
    let sent = Recorder::default();
    let seen = sent.clone();
    let router = Router::new().route(
        "/emails",
        post(move |Json(request): Json<JsonValue>| {
            let seen = seen.clone();
            async move {
                seen.push(request);
                Json(json!({"id": "email_xyz"}))
            }
        }),
    );
    let base = spawn_upstream(router).await;
    (format!("{}/emails", base), sent)
}

#[tokio::test]
async fn dashboard_routes_require_bearer_token() {
    let (app, _) = build_app(&test_config());

    for (method, uri) in [
        ("GET", "/api/candidates"),
        ("POST", "/api/notifications"),
        ("GET", "/api/candidates/00000000-0000-0000-0000-000000000000"),
    ] {
        let req = Request::builder().method(method).uri(uri).body(Body::empty()).unwrap();
        let (status, json) = read_json(app.clone().oneshot(req).await.unwrap()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);
        assert_eq!(json["error"], "missing_authorization");
    }

    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, json) = read_json(app.oneshot(req).await.unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn candidates_are_listed_newest_first_with_filters() {
    let (app, store) = build_app(&test_config());
    seed(&store, 90, "Interview", "Backend").await;
    seed(&store, 45, "Hold", "Backend").await;
    let design = seed(&store, 95, "Interview", "Design").await;

    let (status, json) = read_json(app.clone().oneshot(authed("GET", "/api/candidates", None)).await.unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    let rows = json.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["id"], design.to_string());

    let (_, json) = read_json(
        app.clone()
            .oneshot(authed("GET", "/api/candidates?role=Backend&min_score=60", None))
            .await
            .unwrap(),
    )
    .await;
    let rows = json.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["score"], 90);
    assert_eq!(rows[0]["normalized_verdict"], "Interview");

    let (status, json) = read_json(
        app.clone()
            .oneshot(authed("GET", &format!("/api/candidates/{}", design), None))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["role"], "Design");

    let missing = uuid::Uuid::new_v4();
    let (status, _) = read_json(
        app.oneshot(authed("GET", &format!("/api/candidates/{}", missing), None))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dispatch_without_email_provider_is_skipped() {
    let (app, _) = build_app(&test_config());
    let (status, json) = read_json(
        app.oneshot(authed("POST", "/api/notifications", Some(dispatch_body(20, "Reject"))))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["skipped"], true);
    assert_eq!(json["emailType"], "rejection");
}

#[tokio::test]
async fn dispatch_rejects_malformed_requests() {
    let (app, _) = build_app(&test_config());

    let (status, _) = read_json(
        app.clone()
            .oneshot(authed("POST", "/api/notifications", Some(json!({"candidateName": "Ada"}))))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut body = dispatch_body(20, "Reject");
    body["candidateEmail"] = json!("not-an-email");
    let (status, _) = read_json(
        app.oneshot(authed("POST", "/api/notifications", Some(body)))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn dispatch_escapes_user_content_and_classifies_server_side() {
    let (email_url, sent) = spawn_resend().await;
    let mut config = test_config();
    config.resend_api_key = Some("re_test".into());
    config.email_api_url = email_url;
    let (app, _) = build_app(&config);

    // Client claims Unknown, but a "Reject" verdict with score 75 earns an interview.
    let (status, json) = read_json(
        app.clone()
            .oneshot(authed("POST", "/api/notifications", Some(dispatch_body(75, "Reject"))))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["emailType"], "interview");
    assert_eq!(json["emailId"], "email_xyz");

    let emails = sent.all();
    assert_eq!(emails.len(), 1);
    let html = emails[0]["html"].as_str().unwrap();
    assert!(html.contains("Bob &quot;Evil&quot; &lt;script&gt;"));
    assert!(html.contains("&lt;b&gt;bold&lt;/b&gt; claim"));
    assert!(!html.contains("<script>"));

    let (status, json) = read_json(
        app.oneshot(authed("POST", "/api/notifications", Some(dispatch_body(55, "Hold"))))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert!(json["emailType"].is_null());
    assert_eq!(sent.len(), 1);
}

#[tokio::test]
async fn dispatch_with_candidate_id_honors_stored_flags() {
    let (email_url, sent) = spawn_resend().await;
    let mut config = test_config();
    config.resend_api_key = Some("re_test".into());
    config.email_api_url = email_url;
    let (app, store) = build_app(&config);
    let id = seed(&store, 15, "Reject", "Backend").await;

    let mut body = dispatch_body(15, "Reject");
    body["candidateId"] = json!(id);
    for _ in 0..2 {
        let (status, _) = read_json(
            app.clone()
                .oneshot(authed("POST", "/api/notifications", Some(body.clone())))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(sent.len(), 1);
    assert_eq!(sent.all()[0]["subject"], "Application Status Update");
    assert!(store.get(id).await.unwrap().unwrap().rejection_email_sent);
}

#[tokio::test]
async fn provider_failure_is_a_bad_gateway() {
    let router = Router::new().route(
        "/emails",
        post(|| async {
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({"message": "invalid `to` field"})),
            )
        }),
    );
    let base = spawn_upstream(router).await;
    let mut config = test_config();
    config.resend_api_key = Some("re_test".into());
    config.email_api_url = format!("{}/emails", base);
    let (app, store) = build_app(&config);
    let id = seed(&store, 90, "Interview", "Backend").await;

    let (status, json) = read_json(
        app.oneshot(authed("POST", &format!("/api/candidates/{}/notify", id), None))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["error"], "Failed to send email");
    assert!(!store.get(id).await.unwrap().unwrap().interview_email_sent);
}
