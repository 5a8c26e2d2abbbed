//! Blocking protocol client.
//!
//! Mirrors [`Client`](crate::Client) for synchronous callers. Every call
//! blocks until the response is read (or, for the `_stream` variants,
//! until each successive record arrives). Must not be driven from an async
//! runtime thread; a caller with a UI runs it on a worker thread.

use parlor_types::{ChatResponse, ClientError, GenerateResponse, Message, TagsResponse};
use serde::de::DeserializeOwned;

use crate::client::BASE_URL_ENV;
use crate::decode::{BlockingRecords, decode_object};
use crate::request::{chat_body, generate_body, model_names};
use crate::transport::{BlockingResponseHandle, BlockingTransport, BodyReader};

/// Blocking client for the generate, chat, and model-listing endpoints.
#[derive(Debug)]
pub struct BlockingClient {
    transport: BlockingTransport,
}

impl BlockingClient {
    /// Client against the default local endpoint,
    /// `http://localhost:11434`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            transport: BlockingTransport::default(),
        }
    }

    /// Client against the given base URL.
    pub fn with_base_url(base_url: impl AsRef<str>) -> Result<Self, ClientError> {
        Ok(Self {
            transport: BlockingTransport::open(base_url)?,
        })
    }

    /// Client from the environment: honors `OLLAMA_HOST` when set,
    /// otherwise the default local endpoint.
    pub fn from_env() -> Result<Self, ClientError> {
        match std::env::var(BASE_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => Self::with_base_url(url),
            _ => Ok(Self::new()),
        }
    }

    /// Base URL this client targets.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }

    /// Single-turn completion, non-streaming.
    ///
    /// `system` is forwarded only when provided and non-empty.
    pub fn generate(
        &self,
        model: &str,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<GenerateResponse, ClientError> {
        let body = generate_body(model, prompt, system, false)?;
        tracing::debug!(model, stream = false, "sending generate request");
        let response = self.transport.post_json("/api/generate", &body)?;
        read_json(response)
    }

    /// Single-turn completion as a lazy record iterator over the open
    /// response body.
    pub fn generate_stream(
        &self,
        model: &str,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<BlockingRecords<BodyReader, GenerateResponse>, ClientError> {
        let body = generate_body(model, prompt, system, true)?;
        tracing::debug!(model, stream = true, "sending generate request");
        let response = self.transport.post_json("/api/generate", &body)?;
        open_records(response)
    }

    /// Multi-turn chat completion, non-streaming.
    pub fn chat(&self, model: &str, messages: &[Message]) -> Result<ChatResponse, ClientError> {
        let body = chat_body(model, messages, false)?;
        tracing::debug!(model, turns = messages.len(), stream = false, "sending chat request");
        let response = self.transport.post_json("/api/chat", &body)?;
        read_json(response)
    }

    /// Multi-turn chat completion as a lazy record iterator over the open
    /// response body.
    pub fn chat_stream(
        &self,
        model: &str,
        messages: &[Message],
    ) -> Result<BlockingRecords<BodyReader, ChatResponse>, ClientError> {
        let body = chat_body(model, messages, true)?;
        tracing::debug!(model, turns = messages.len(), stream = true, "sending chat request");
        let response = self.transport.post_json("/api/chat", &body)?;
        open_records(response)
    }

    /// Installed models from `GET /api/tags`, in server order, with any
    /// trailing `:latest` suffix stripped.
    pub fn list_models(&self) -> Result<Vec<String>, ClientError> {
        let response = self.transport.get("/api/tags")?;
        let tags: TagsResponse = read_json(response)?;
        Ok(model_names(&tags.models))
    }
}

impl Default for BlockingClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Require HTTP 200, then decode the whole body as one JSON object.
fn read_json<T: DeserializeOwned>(response: BlockingResponseHandle) -> Result<T, ClientError> {
    let status = response.status();
    if status != 200 {
        let body = response.text().unwrap_or_default();
        return Err(ClientError::Server { status, body });
    }
    let bytes = response.bytes()?;
    decode_object(&bytes)
}

/// Require HTTP 200, then hand the still-open body to the line decoder.
fn open_records<T: DeserializeOwned>(
    response: BlockingResponseHandle,
) -> Result<BlockingRecords<BodyReader, T>, ClientError> {
    let status = response.status();
    if status != 200 {
        let body = response.text().unwrap_or_default();
        return Err(ClientError::Server { status, body });
    }
    Ok(BlockingRecords::new(response.into_reader()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::DEFAULT_BASE_URL;

    #[test]
    fn default_base_url() {
        assert_eq!(BlockingClient::new().base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn with_base_url_overrides() {
        let client = BlockingClient::with_base_url("http://remote:11434/").unwrap();
        assert_eq!(client.base_url(), "http://remote:11434");
    }

    #[test]
    fn empty_model_fails_before_any_request() {
        let client = BlockingClient::with_base_url("http://localhost:1").unwrap();
        let err = client.chat("", &[Message::user("hi")]).unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
        let err = client.generate("", "hi", None).unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
    }
}
