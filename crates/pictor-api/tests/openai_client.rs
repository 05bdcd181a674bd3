/// Integration tests for the generation client against a local mock of the
/// images endpoint.

use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
};
use serde_json::{Value, json};

use pictor_api::openai::{GenerateError, ImageGenerator, OpenAiImages};

/// Mock endpoint; the prompt selects the behaviour.
async fn generations(headers: HeaderMap, Json(req): Json<Value>) -> impl IntoResponse {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        == Some("Bearer sk-test");
    if !authorized {
        return (StatusCode::UNAUTHORIZED, r#"{"error":{"message":"bad key"}}"#.to_string());
    }
    assert_eq!(req["model"], "dall-e-3");
    assert_eq!(req["n"], 1);
    assert_eq!(req["size"], "1024x1024");

    let body = match req["prompt"].as_str().unwrap_or_default() {
        "empty" => json!({ "data": [] }).to_string(),
        "garbage" => "<html>oops</html>".to_string(),
        prompt => json!({ "created": 1, "data": [{ "url": format!("https://img.test/{prompt}.png") }] })
            .to_string(),
    };
    (StatusCode::OK, body)
}

async fn start_mock() -> String {
    let app = Router::new().route("/v1/images/generations", post(generations));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/", addr)
}

fn client(base_url: String, key: &str) -> OpenAiImages {
    OpenAiImages::new(reqwest::Client::new(), key.to_string(), base_url)
}

#[tokio::test]
async fn returns_first_image_url() {
    let base = start_mock().await;
    let url = client(base, "sk-test").generate("cat").await.unwrap();
    assert_eq!(url, "https://img.test/cat.png");
}

#[tokio::test]
async fn empty_result_set_is_an_error() {
    let base = start_mock().await;
    let err = client(base, "sk-test").generate("empty").await.unwrap_err();
    assert!(matches!(err, GenerateError::Empty));
}

#[tokio::test]
async fn non_json_response_is_malformed() {
    let base = start_mock().await;
    let err = client(base, "sk-test").generate("garbage").await.unwrap_err();
    assert!(matches!(err, GenerateError::Malformed(_)));
}

#[tokio::test]
async fn rejected_key_surfaces_status() {
    let base = start_mock().await;
    match client(base, "sk-wrong").generate("cat").await {
        Err(GenerateError::Status { status, body }) => {
            assert_eq!(status, 401);
            assert!(body.contains("bad key"));
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn unreachable_provider_is_request_error() {
    let err = client("http://127.0.0.1:1".into(), "sk-test").generate("cat").await.unwrap_err();
    assert!(matches!(err, GenerateError::Request(_)));
}
