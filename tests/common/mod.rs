#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use resume_screener::config::{
    Config, DEFAULT_AI_MODEL, DEFAULT_CALENDAR_BASE_URL, DEFAULT_EMAIL_FROM,
};
use resume_screener::services::candidate_service::{CandidateStore, MemoryCandidateStore};
use resume_screener::services::normalizer::ConfidenceScale;
use resume_screener::AppState;
use serde_json::Value as JsonValue;
use tokio::net::TcpListener;

pub const JWT_SECRET: &str = "test_secret_key";
pub const BOUNDARY: &str = "screeningtestboundary";

pub fn test_config() -> Config {
    Config {
        server_address: "127.0.0.1:0".into(),
        database_url: None,
        jwt_secret: JWT_SECRET.into(),
        scoring_webhook_url: None,
        webhook_confidence_scale: ConfidenceScale::Percent,
        ai_gateway_url: "http://127.0.0.1:9/v1/chat/completions".into(),
        ai_api_key: Some("sk-test".into()),
        ai_model: DEFAULT_AI_MODEL.into(),
        resend_api_key: None,
        email_api_url: "http://127.0.0.1:9/emails".into(),
        email_from: DEFAULT_EMAIL_FROM.into(),
        calendar_base_url: DEFAULT_CALENDAR_BASE_URL.into(),
        rate_limit_max_requests: 100,
        rate_limit_window_secs: 3600,
        max_resume_bytes: 10 * 1024 * 1024,
        http_timeout_secs: 5,
    }
}

pub fn build_app(config: &Config) -> (Router, Arc<MemoryCandidateStore>) {
    let store = Arc::new(MemoryCandidateStore::new());
    let dyn_store: Arc<dyn CandidateStore> = store.clone();
    let state = AppState::new(config, dyn_store, reqwest::Client::new());
    (resume_screener::routes::router(state), store)
}

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn spawn_upstream(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind upstream");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("upstream server");
    });
    format!("http://{}", addr)
}

/// Requests seen by a fake upstream, newest last.
#[derive(Clone, Default)]
pub struct Recorder(pub Arc<Mutex<Vec<JsonValue>>>);

impl Recorder {
    pub fn push(&self, value: JsonValue) {
        self.0.lock().unwrap().push(value);
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn all(&self) -> Vec<JsonValue> {
        self.0.lock().unwrap().clone()
    }
}

pub struct FilePart<'a> {
    pub file_name: &'a str,
    pub content_type: &'a str,
    pub bytes: &'a [u8],
}

pub fn multipart_body(text_fields: &[(&str, &str)], file: Option<FilePart<'_>>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in text_fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some(file) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"Resume_PDF_only_\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, file.file_name, file.content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(file.bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_request(body: Vec<u8>, client_ip: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/screenings")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .header("x-forwarded-for", client_ip)
        .body(Body::from(body))
        .unwrap()
}

pub fn applicant_fields<'a>(email: &'a str) -> Vec<(&'a str, &'a str)> {
    vec![
        ("Full Name", "Ada Lovelace"),
        ("Email Address", email),
        ("job_description", "Senior Rust Engineer\nAsync services, Postgres"),
    ]
}

pub fn pdf_part(bytes: &[u8]) -> FilePart<'_> {
    FilePart {
        file_name: "resume.pdf",
        content_type: "application/pdf",
        bytes,
    }
}

pub async fn read_json(res: Response) -> (StatusCode, JsonValue) {
    let status = res.status();
    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(JsonValue::Null);
    (status, json)
}

/// Chat-completions body carrying one screening tool call.
pub fn ai_tool_response(arguments: JsonValue) -> JsonValue {
    serde_json::json!({
        "id": "chatcmpl-test",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {
                        "name": "suggest_screening_result",
                        "arguments": arguments.to_string()
                    }
                }]
            }
        }]
    })
}

pub fn bearer_token() -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};
    let claims = resume_screener::middleware::auth::Claims {
        sub: "hr-user".into(),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        role: Some("hr".into()),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap();
    format!("Bearer {}", token)
}
