//! Integration tests for the protocol clients using wiremock.

use futures::StreamExt;
use parlor_client::{BlockingClient, Client};
use parlor_types::{ClientError, Message, Role};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn chat_success_body() -> serde_json::Value {
    json!({
        "model": "llama3",
        "created_at": "2024-05-01T00:00:00Z",
        "message": {"role": "assistant", "content": "Hello! How can I help?"},
        "done": true,
        "done_reason": "stop",
        "prompt_eval_count": 20,
        "eval_count": 10
    })
}

#[tokio::test]
async fn chat_decodes_single_object() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_success_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::with_base_url(server.uri()).unwrap();
    let response = client
        .chat("llama3", &[Message::user("Hello")])
        .await
        .expect("chat should succeed");

    let message = response.message.expect("reply carries a message");
    assert_eq!(message.role, Role::Assistant);
    assert_eq!(message.content, "Hello! How can I help?");
    assert!(response.done);
    assert_eq!(response.eval_count, Some(10));
}

#[tokio::test]
async fn chat_sends_full_message_list() {
    let server = MockServer::start().await;
    let expected = json!({
        "model": "llama3",
        "messages": [
            {"role": "system", "content": "Be terse."},
            {"role": "user", "content": "Hi"}
        ],
        "stream": false
    });
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_json(&expected))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_success_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::with_base_url(server.uri()).unwrap();
    let messages = [Message::system("Be terse."), Message::user("Hi")];
    client
        .chat("llama3", &messages)
        .await
        .expect("chat should succeed");
}

#[tokio::test]
async fn generate_decodes_single_object() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3",
            "response": "I am a language model.",
            "done": true,
            "done_reason": "stop"
        })))
        .mount(&server)
        .await;

    let client = Client::with_base_url(server.uri()).unwrap();
    let response = client
        .generate("llama3", "Who are you?", None)
        .await
        .expect("generate should succeed");
    assert_eq!(response.response, "I am a language model.");
    assert!(response.done);
}

#[tokio::test]
async fn generate_body_omits_system_unless_non_empty() {
    let server = MockServer::start().await;
    // Exact body match: no `system` key may be present.
    let expected = json!({"model": "llama3", "prompt": "hi", "stream": false});
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_json(&expected))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3", "response": "ok", "done": true
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = Client::with_base_url(server.uri()).unwrap();
    client.generate("llama3", "hi", None).await.unwrap();
    client.generate("llama3", "hi", Some("")).await.unwrap();
}

#[tokio::test]
async fn non_200_status_is_server_error_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model runner crashed"))
        .mount(&server)
        .await;

    let client = Client::with_base_url(server.uri()).unwrap();
    let err = client
        .chat("llama3", &[Message::user("Hi")])
        .await
        .unwrap_err();
    match err {
        ClientError::Server { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "model runner crashed");
        }
        other => panic!("expected Server, got: {other:?}"),
    }
}

#[tokio::test]
async fn not_found_status_surfaces_as_404() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(404).set_body_string("model 'x' not found"))
        .mount(&server)
        .await;

    let client = Client::with_base_url(server.uri()).unwrap();
    let err = client.generate("x", "hi", None).await.unwrap_err();
    assert!(matches!(err, ClientError::Server { status: 404, .. }));
}

#[tokio::test]
async fn malformed_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json at all"))
        .mount(&server)
        .await;

    let client = Client::with_base_url(server.uri()).unwrap();
    let err = client
        .chat("llama3", &[Message::user("Hi")])
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Decode(_)));
}

#[tokio::test]
async fn connection_refused_is_transport_error() {
    // Port 1 is never serving; the connection is refused immediately.
    let client = Client::with_base_url("http://127.0.0.1:1").unwrap();
    let err = client
        .chat("llama3", &[Message::user("Hi")])
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn chat_stream_yields_records_in_order() {
    let server = MockServer::start().await;
    let ndjson = concat!(
        r#"{"model":"llama3","message":{"role":"assistant","content":"Hel"},"done":false}"#,
        "\n",
        r#"{"model":"llama3","message":{"role":"assistant","content":"lo"},"done":false}"#,
        "\n",
        r#"{"model":"llama3","message":{"role":"assistant","content":""},"done":true,"done_reason":"stop","eval_count":5,"prompt_eval_count":12}"#,
        "\n",
    );
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ndjson))
        .mount(&server)
        .await;

    let client = Client::with_base_url(server.uri()).unwrap();
    let records: Vec<_> = client
        .chat_stream("llama3", &[Message::user("Hi")])
        .await
        .expect("open should succeed")
        .collect()
        .await;

    let records: Vec<_> = records.into_iter().map(|r| r.unwrap()).collect();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].fragment(), "Hel");
    assert_eq!(records[1].fragment(), "lo");
    assert!(records[2].done);
    assert_eq!(records[2].done_reason.as_deref(), Some("stop"));
}

#[tokio::test]
async fn chat_stream_terminates_on_malformed_line() {
    let server = MockServer::start().await;
    let ndjson = concat!(
        r#"{"model":"llama3","message":{"role":"assistant","content":"Hel"},"done":false}"#,
        "\n",
        "garbage line\n",
        r#"{"model":"llama3","message":{"role":"assistant","content":"lo"},"done":false}"#,
        "\n",
    );
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ndjson))
        .mount(&server)
        .await;

    let client = Client::with_base_url(server.uri()).unwrap();
    let records: Vec<_> = client
        .chat_stream("llama3", &[Message::user("Hi")])
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(records.len(), 2, "one good record, then the terminating error");
    assert!(records[0].is_ok());
    assert!(matches!(records[1], Err(ClientError::Decode(_))));
}

#[tokio::test]
async fn stream_open_fails_on_non_200() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(503).set_body_string("loading"))
        .mount(&server)
        .await;

    let client = Client::with_base_url(server.uri()).unwrap();
    let err = client
        .chat_stream("llama3", &[Message::user("Hi")])
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Server { status: 503, .. }));
}

#[tokio::test]
async fn generate_stream_yields_fragments() {
    let server = MockServer::start().await;
    let ndjson = concat!(
        r#"{"model":"llama3","response":"One","done":false}"#,
        "\n",
        r#"{"model":"llama3","response":" two","done":false}"#,
        "\n",
        r#"{"model":"llama3","response":"","done":true,"done_reason":"stop"}"#,
        "\n",
    );
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ndjson))
        .mount(&server)
        .await;

    let client = Client::with_base_url(server.uri()).unwrap();
    let records: Vec<_> = client
        .generate_stream("llama3", "count", Some("Be brief."))
        .await
        .unwrap()
        .collect()
        .await;

    let text: String = records
        .iter()
        .map(|r| r.as_ref().unwrap().response.as_str())
        .collect();
    assert_eq!(text, "One two");
}

#[tokio::test]
async fn list_models_strips_latest_suffix() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [
                {"name": "llama3:latest", "size": 4661224676_u64},
                {"name": "mistral:7b"}
            ]
        })))
        .mount(&server)
        .await;

    let client = Client::with_base_url(server.uri()).unwrap();
    let models = client.list_models().await.unwrap();
    assert_eq!(models, vec!["llama3", "mistral:7b"]);
}

#[tokio::test]
async fn list_running_uses_ps_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/ps"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{"name": "llama3:latest", "expires_at": "2024-05-01T00:05:00Z"}]
        })))
        .mount(&server)
        .await;

    let client = Client::with_base_url(server.uri()).unwrap();
    let running = client.list_running().await.unwrap();
    assert_eq!(running, vec!["llama3"]);
}

#[tokio::test]
async fn list_models_non_200_is_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = Client::with_base_url(server.uri()).unwrap();
    let err = client.list_models().await.unwrap_err();
    assert!(matches!(err, ClientError::Server { status: 500, .. }));
}

// ─── Blocking client ─────────────────────────────────────────────────────────
//
// The blocking client must run off the async runtime; each test drives it
// through spawn_blocking against the same mock server.

#[tokio::test]
async fn blocking_chat_decodes_single_object() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_success_body()))
        .mount(&server)
        .await;

    let uri = server.uri();
    let response = tokio::task::spawn_blocking(move || {
        let client = BlockingClient::with_base_url(uri).unwrap();
        client.chat("llama3", &[Message::user("Hello")])
    })
    .await
    .unwrap()
    .expect("chat should succeed");

    assert_eq!(response.message.unwrap().content, "Hello! How can I help?");
}

#[tokio::test]
async fn blocking_chat_stream_iterates_records() {
    let server = MockServer::start().await;
    let ndjson = concat!(
        r#"{"model":"llama3","message":{"role":"assistant","content":"a"},"done":false}"#,
        "\n",
        r#"{"model":"llama3","message":{"role":"assistant","content":"b"},"done":true}"#,
        "\n",
    );
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ndjson))
        .mount(&server)
        .await;

    let uri = server.uri();
    let fragments = tokio::task::spawn_blocking(move || {
        let client = BlockingClient::with_base_url(uri).unwrap();
        let records = client.chat_stream("llama3", &[Message::user("Hi")]).unwrap();
        records
            .map(|r| r.map(|record| record.fragment().to_string()))
            .collect::<Result<Vec<_>, _>>()
    })
    .await
    .unwrap()
    .expect("stream should decode");

    assert_eq!(fragments, vec!["a", "b"]);
}

#[tokio::test]
async fn blocking_server_error_carries_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let uri = server.uri();
    let err = tokio::task::spawn_blocking(move || {
        let client = BlockingClient::with_base_url(uri).unwrap();
        client.generate("llama3", "hi", None)
    })
    .await
    .unwrap()
    .unwrap_err();

    assert!(matches!(err, ClientError::Server { status: 500, .. }));
}

#[tokio::test]
async fn blocking_list_models_strips_latest() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{"name": "llama3:latest"}]
        })))
        .mount(&server)
        .await;

    let uri = server.uri();
    let models = tokio::task::spawn_blocking(move || {
        let client = BlockingClient::with_base_url(uri).unwrap();
        client.list_models()
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(models, vec!["llama3"]);
}

#[test]
fn from_env_always_succeeds() {
    assert!(Client::from_env().is_ok());
    assert!(BlockingClient::from_env().is_ok());
}
