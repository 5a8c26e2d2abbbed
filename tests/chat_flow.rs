//! Workspace-level test: a full conversation across both execution modes.
//!
//! Drives the session layer end to end against a mock server (async
//! connect, a streamed turn, a model switch, then a blocking turn) and
//! asserts that the full history is resent on every chat call.

use futures::StreamExt;
use parlor_session::{CancellationToken, ChatConfig, ChatSession};
use parlor_types::Role;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn streamed_then_blocking_turn_resends_full_history() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{"name": "llama3:latest"}, {"name": "mistral:7b"}]
        })))
        .mount(&server)
        .await;

    // First turn, streamed.
    let first_body = json!({
        "model": "llama3",
        "messages": [{"role": "user", "content": "Hi"}],
        "stream": true
    });
    let ndjson = concat!(
        r#"{"model":"llama3","message":{"role":"assistant","content":"Hello"},"done":false}"#,
        "\n",
        r#"{"model":"llama3","message":{"role":"assistant","content":"!"},"done":false}"#,
        "\n",
        r#"{"model":"llama3","message":{"role":"assistant","content":""},"done":true,"done_reason":"stop"}"#,
        "\n",
    );
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_json(&first_body))
        .respond_with(ResponseTemplate::new(200).set_body_string(ndjson))
        .expect(1)
        .mount(&server)
        .await;

    // Second turn, blocking, against the switched model. The entire prior
    // conversation must be in the request body: the server is stateless.
    let second_body = json!({
        "model": "mistral:7b",
        "messages": [
            {"role": "user", "content": "Hi"},
            {"role": "assistant", "content": "Hello!"},
            {"role": "user", "content": "How are you?"}
        ],
        "stream": false
    });
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_json(&second_body))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "mistral:7b",
            "message": {"role": "assistant", "content": "Doing well."},
            "done": true,
            "done_reason": "stop"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = ChatConfig::new("llama3").base_url(server.uri());
    let mut session = ChatSession::connect_async(config).await.unwrap();

    let mut fragments = Vec::new();
    {
        let mut stream = session
            .send_turn_streaming("Hi", CancellationToken::new())
            .await
            .unwrap();
        while let Some(fragment) = stream.next().await {
            fragments.push(fragment.unwrap());
        }
    }
    assert_eq!(fragments.concat(), "Hello!");
    assert_eq!(session.history().len(), 2);

    // Switching models keeps the shared history.
    session.set_model("mistral:7b").unwrap();

    let (session, reply) = tokio::task::spawn_blocking(move || {
        let mut session = session;
        let reply = session.send_turn("How are you?");
        (session, reply)
    })
    .await
    .unwrap();

    assert_eq!(reply.unwrap(), "Doing well.");
    let history = session.history();
    assert_eq!(history.len(), 4);
    assert_eq!(history[3].role, Role::Assistant);
    assert_eq!(history[3].content, "Doing well.");
}
