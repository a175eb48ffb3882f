//! Gemini client against a local stand-in for the API.

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, Request, StatusCode},
    routing::post,
};
use journal_gateway::{
    build_router,
    gemini::{GeminiClient, GenerateError, TextGenerator},
    quota::{QuotaGuard, QuotaPolicy},
    relay::{ModelPolicy, Relay},
    state::AppState,
};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::util::ServiceExt;

#[derive(Debug, Clone)]
struct SeenCall {
    call: String,
    api_key: Option<String>,
    body: Value,
}

#[derive(Clone)]
struct FakeGemini {
    status: StatusCode,
    response: Value,
    seen: Arc<Mutex<Vec<SeenCall>>>,
}

async fn generate_content(
    State(fake): State<FakeGemini>,
    Path(call): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    fake.seen.lock().unwrap().push(SeenCall {
        call,
        api_key: headers
            .get("x-goog-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });
    (fake.status, Json(fake.response.clone()))
}

/// Serves the fake API on a random port, returns its base URL and the recorded calls.
async fn spawn_fake_gemini(status: StatusCode, response: Value) -> (String, Arc<Mutex<Vec<SeenCall>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let fake = FakeGemini {
        status,
        response,
        seen: Arc::clone(&seen),
    };

    let app = Router::new()
        .route("/v1beta/models/{call}", post(generate_content))
        .with_state(fake);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/v1beta"), seen)
}

fn client(base_url: &str) -> GeminiClient {
    GeminiClient::new("test-key", Duration::from_secs(5))
        .unwrap()
        .with_base_url(base_url)
}

fn text_response(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    })
}

#[tokio::test]
async fn sends_prompt_to_model_with_api_key() {
    let (base, seen) = spawn_fake_gemini(StatusCode::OK, text_response("Hello!")).await;

    let text = client(&base)
        .generate("gemini-1.5-flash", "How are you?")
        .await
        .unwrap();

    assert_eq!(text, "Hello!");

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].call, "gemini-1.5-flash:generateContent");
    assert_eq!(seen[0].api_key.as_deref(), Some("test-key"));
    assert_eq!(seen[0].body["contents"][0]["role"], "user");
    assert_eq!(seen[0].body["contents"][0]["parts"][0]["text"], "How are you?");
}

#[tokio::test]
async fn upstream_429_is_rate_limited() {
    let (base, _) = spawn_fake_gemini(StatusCode::TOO_MANY_REQUESTS, json!({})).await;

    let err = client(&base).generate("m", "p").await.unwrap_err();
    assert!(matches!(err, GenerateError::RateLimited));
}

#[tokio::test]
async fn upstream_error_status_is_reported() {
    let (base, _) = spawn_fake_gemini(
        StatusCode::NOT_FOUND,
        json!({ "error": { "message": "model not found" } }),
    )
    .await;

    let err = client(&base).generate("m", "p").await.unwrap_err();
    match err {
        GenerateError::Api { status, body } => {
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert!(body.contains("model not found"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn unreachable_api_is_a_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{addr}/v1beta"))
        .generate("m", "p")
        .await
        .unwrap_err();
    assert!(matches!(err, GenerateError::Network(_)));
}

#[tokio::test]
async fn journal_endpoint_relays_through_gemini_client() {
    let (base, seen) =
        spawn_fake_gemini(StatusCode::OK, text_response("```\nYou matter.\n```\n")).await;

    let state = Arc::new(AppState {
        quota: Arc::new(QuotaGuard::new(QuotaPolicy::default())),
        relay: Relay::new(Arc::new(client(&base)), ModelPolicy::default()),
        trusted_proxies: 1,
    });
    let app = build_router(Arc::clone(&state));

    let request = Request::builder()
        .method("POST")
        .uri("/gemini")
        .header("Content-Type", "application/json")
        .header("X-Forwarded-For", "198.51.100.4")
        .body(Body::from(r#"{"journalEntry":"I feel lonely."}"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, json!({ "reply": "You matter." }));

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen[0].call, "gemini-1.5-flash-latest:generateContent");
    let prompt = seen[0].body["contents"][0]["parts"][0]["text"].as_str().unwrap();
    assert!(prompt.contains("\"I feel lonely.\""));
    assert_eq!(state.quota.record("198.51.100.4").unwrap().count, 1);
}
