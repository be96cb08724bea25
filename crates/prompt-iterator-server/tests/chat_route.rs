use std::sync::Arc;

use prompt_iterator_harness::vendors::demo::DEMO_TEXT;
use prompt_iterator_harness::{
    ChatClient, ChatMessage, ChatRequest, CorrectionStatus, WireDecoder, WireFrame,
};
use prompt_iterator_server::{AppState, ServerConfig, router};
use serde_json::json;
use tokio::net::TcpListener;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn start_server(upstream: &MockServer) -> String {
    let config = ServerConfig {
        default_base_url: upstream.uri(),
        correction_model: "fixer".into(),
        demo_delay_ms: 0,
        budget_secs: 10,
        ..ServerConfig::default()
    };
    let state = Arc::new(AppState::new(config).expect("state"));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    format!("http://127.0.0.1:{}", addr.port())
}

fn hello_body() -> serde_json::Value {
    json!({ "messages": [{ "role": "user", "content": "Help me write a prompt" }] })
}

async fn post_chat(
    proxy: &str,
    api_key: Option<&str>,
    body: impl Into<reqwest::Body>,
) -> reqwest::Response {
    let mut req = reqwest::Client::new()
        .post(format!("{proxy}/api/chat"))
        .header("content-type", "application/json")
        .body(body);
    if let Some(key) = api_key {
        req = req.header("x-api-key", key);
    }
    req.send().await.unwrap()
}

fn decode_all(body: &[u8]) -> Vec<WireFrame> {
    let mut decoder = WireDecoder::default();
    let mut frames = decoder.push_chunk(body).expect("frames");
    frames.extend(decoder.finish().expect("tail"));
    frames
}

fn sse(chunks: &[serde_json::Value]) -> String {
    let mut body: String = chunks.iter().map(|c| format!("data: {c}\n\n")).collect();
    body.push_str("data: [DONE]\n\n");
    body
}

async fn no_upstream_calls(upstream: &MockServer) {
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(upstream)
        .await;
}

#[tokio::test]
async fn demo_key_streams_canned_text_without_upstream() {
    let upstream = MockServer::start().await;
    no_upstream_calls(&upstream).await;
    let proxy = start_server(&upstream).await;

    let resp = post_chat(&proxy, Some("demo"), hello_body().to_string()).await;
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()["content-type"].to_str().unwrap(),
        "text/plain; charset=utf-8"
    );
    assert_eq!(resp.headers()["x-vercel-ai-data-stream"], "v1");

    let frames = decode_all(&resp.bytes().await.unwrap());
    assert_eq!(frames.len(), DEMO_TEXT.chars().count());
    let mut text = String::new();
    for frame in frames {
        match frame {
            WireFrame::Text(fragment) => {
                assert_eq!(fragment.chars().count(), 1);
                text.push_str(&fragment);
            }
            other => panic!("unexpected frame {other:?}"),
        }
    }
    assert_eq!(text, DEMO_TEXT);
}

#[tokio::test]
async fn demo_key_streams_canned_text_for_an_empty_conversation() {
    let upstream = MockServer::start().await;
    no_upstream_calls(&upstream).await;
    let proxy = start_server(&upstream).await;

    let resp = post_chat(&proxy, Some("demo"), json!({ "messages": [] }).to_string()).await;
    assert_eq!(resp.status(), 200);
    let text: String = decode_all(&resp.bytes().await.unwrap())
        .into_iter()
        .map(|frame| match frame {
            WireFrame::Text(fragment) => fragment,
            other => panic!("unexpected frame {other:?}"),
        })
        .collect();
    assert_eq!(text, DEMO_TEXT);
}

#[tokio::test]
async fn invalid_json_is_bad_request() {
    let upstream = MockServer::start().await;
    let proxy = start_server(&upstream).await;

    let resp = post_chat(&proxy, Some("sk-test"), "{not json").await;
    assert_eq!(resp.status(), 400);
    assert_eq!(resp.text().await.unwrap(), "Invalid JSON in request body");
}

#[tokio::test]
async fn missing_messages_is_rejected_before_any_upstream_call() {
    let upstream = MockServer::start().await;
    no_upstream_calls(&upstream).await;
    let proxy = start_server(&upstream).await;

    let resp = post_chat(&proxy, Some("sk-test"), json!({ "model": "x" }).to_string()).await;
    assert_eq!(resp.status(), 400);
    assert_eq!(resp.text().await.unwrap(), "Missing or invalid messages array");

    let resp = post_chat(&proxy, Some("sk-test"), json!({ "messages": [] }).to_string()).await;
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn missing_api_key_is_configuration_error() {
    let upstream = MockServer::start().await;
    no_upstream_calls(&upstream).await;
    let proxy = start_server(&upstream).await;

    let resp = post_chat(&proxy, None, hello_body().to_string()).await;
    assert_eq!(resp.status(), 401);
    assert!(resp.text().await.unwrap().starts_with("Configuration Error:"));
}

#[tokio::test]
async fn unknown_preset_is_bad_request() {
    let upstream = MockServer::start().await;
    no_upstream_calls(&upstream).await;
    let proxy = start_server(&upstream).await;

    let mut body = hello_body();
    body["preset"] = json!("poetry");
    let resp = post_chat(&proxy, Some("sk-test"), body.to_string()).await;
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn upstream_unauthorized_maps_to_authentication_failed() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-bad"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
        .expect(1)
        .mount(&upstream)
        .await;
    let proxy = start_server(&upstream).await;

    let resp = post_chat(&proxy, Some("sk-bad"), hello_body().to_string()).await;
    assert_eq!(resp.status(), 401);
    assert_eq!(
        resp.text().await.unwrap(),
        format!("Authentication Failed: Invalid API Key for {}.", upstream.uri())
    );
}

#[tokio::test]
async fn upstream_not_found_names_the_model() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&upstream)
        .await;
    let proxy = start_server(&upstream).await;

    let mut body = hello_body();
    body["model"] = json!("gpt-missing");
    let resp = post_chat(&proxy, Some("sk-test"), body.to_string()).await;
    assert_eq!(resp.status(), 404);
    assert!(
        resp.text()
            .await
            .unwrap()
            .starts_with("Model Not Found: The model 'gpt-missing'")
    );
}

#[tokio::test]
async fn unreachable_base_url_is_gateway_timeout() {
    let upstream = MockServer::start().await;
    let proxy = start_server(&upstream).await;

    let resp = reqwest::Client::new()
        .post(format!("{proxy}/api/chat"))
        .header("x-api-key", "sk-test")
        .header("x-base-url", "http://127.0.0.1:9/v1/")
        .body(hello_body().to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 504);
    assert!(
        resp.text()
            .await
            .unwrap()
            .starts_with("Connection Failed: Could not reach http://127.0.0.1:9/v1.")
    );
}

#[tokio::test]
async fn malformed_tool_call_is_repaired_before_forwarding() {
    let upstream = MockServer::start().await;
    let stream_body = sse(&[
        json!({"choices": [{"delta": {"content": "Here is a draft."}}]}),
        json!({"choices": [{"delta": {"tool_calls": [{
            "index": 0,
            "id": "call_1",
            "type": "function",
            "function": {"name": "propose_prompt", "arguments": "{\"title\":\"Draft\"}"}
        }]}}]}),
        json!({"choices": [{"delta": {}, "finish_reason": "tool_calls"}]}),
    ]);
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(stream_body),
        )
        .expect(1)
        .mount(&upstream)
        .await;

    let fixed = json!({
        "title": "Draft",
        "role": "Editor",
        "objective": "Tighten the copy",
        "constraints": ["Keep it short"],
        "finalPrompt": "You are an editor."
    });
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"model": "fixer"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": format!("```json\n{fixed}\n```")}}]
        })))
        .expect(1)
        .mount(&upstream)
        .await;
    let proxy = start_server(&upstream).await;

    let client = ChatClient::new(&proxy, "sk-test");
    let mut prefixes = String::new();
    let message = client
        .send(
            &ChatRequest::new(vec![ChatMessage::user("Help me write a prompt")]),
            |frame| prefixes.push(frame.prefix()),
        )
        .await
        .expect("stream");

    assert_eq!(prefixes, "0ee9a");
    assert_eq!(message.content, "Here is a draft.");
    assert_eq!(
        message.corrections,
        vec![CorrectionStatus::Correcting, CorrectionStatus::Success]
    );
    assert_eq!(message.tool_invocations.len(), 1);
    assert_eq!(message.tool_invocations[0].call.args, fixed);
    assert_eq!(
        message.tool_invocations[0].result,
        Some(json!("Prompt proposal generated"))
    );
}

#[tokio::test]
async fn health_reports_version_and_uptime() {
    let upstream = MockServer::start().await;
    let proxy = start_server(&upstream).await;

    let body: serde_json::Value = reqwest::get(format!("{proxy}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["uptime_secs"].is_u64());
    assert!(!body["version"].as_str().unwrap().is_empty());
}
