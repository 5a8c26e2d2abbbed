//! Asynchronous protocol client.

use parlor_types::{ChatResponse, ClientError, GenerateResponse, Message, PsResponse, TagsResponse};
use serde::de::DeserializeOwned;

use crate::decode::{RecordStream, decode_object, record_stream};
use crate::request::{chat_body, generate_body, model_names};
use crate::transport::{ResponseHandle, Transport};

/// Environment variable honored by [`Client::from_env`].
pub(crate) const BASE_URL_ENV: &str = "OLLAMA_HOST";

/// Asynchronous client for the generate, chat, and model-listing
/// endpoints.
///
/// One request is in flight per call; the client itself holds no mutable
/// state, so a failed call leaves nothing to clean up.
///
/// # Example
///
/// ```no_run
/// use parlor_client::Client;
///
/// # async fn run() -> Result<(), parlor_types::ClientError> {
/// let client = Client::new();
/// let reply = client.generate("llama3", "Who are you?", None).await?;
/// println!("{}", reply.response);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Client {
    transport: Transport,
}

impl Client {
    /// Client against the default local endpoint,
    /// `http://localhost:11434`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            transport: Transport::default(),
        }
    }

    /// Client against the given base URL.
    pub fn with_base_url(base_url: impl AsRef<str>) -> Result<Self, ClientError> {
        Ok(Self {
            transport: Transport::open(base_url)?,
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
    pub async fn generate(
        &self,
        model: &str,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<GenerateResponse, ClientError> {
        let body = generate_body(model, prompt, system, false)?;
        tracing::debug!(model, stream = false, "sending generate request");
        let response = self.transport.post_json("/api/generate", &body).await?;
        read_json(response).await
    }

    /// Single-turn completion as a lazy record sequence over the open
    /// response body.
    pub async fn generate_stream(
        &self,
        model: &str,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<RecordStream<GenerateResponse>, ClientError> {
        let body = generate_body(model, prompt, system, true)?;
        tracing::debug!(model, stream = true, "sending generate request");
        let response = self.transport.post_json("/api/generate", &body).await?;
        open_stream(response).await
    }

    /// Multi-turn chat completion, non-streaming.
    pub async fn chat(
        &self,
        model: &str,
        messages: &[Message],
    ) -> Result<ChatResponse, ClientError> {
        let body = chat_body(model, messages, false)?;
        tracing::debug!(model, turns = messages.len(), stream = false, "sending chat request");
        let response = self.transport.post_json("/api/chat", &body).await?;
        read_json(response).await
    }

    /// Multi-turn chat completion as a lazy record sequence over the open
    /// response body.
    pub async fn chat_stream(
        &self,
        model: &str,
        messages: &[Message],
    ) -> Result<RecordStream<ChatResponse>, ClientError> {
        let body = chat_body(model, messages, true)?;
        tracing::debug!(model, turns = messages.len(), stream = true, "sending chat request");
        let response = self.transport.post_json("/api/chat", &body).await?;
        open_stream(response).await
    }

    /// Installed models from `GET /api/tags`, in server order, with any
    /// trailing `:latest` suffix stripped.
    pub async fn list_models(&self) -> Result<Vec<String>, ClientError> {
        let response = self.transport.get("/api/tags").await?;
        let tags: TagsResponse = read_json(response).await?;
        Ok(model_names(&tags.models))
    }

    /// Models currently loaded in server memory, from `GET /api/ps`.
    pub async fn list_running(&self) -> Result<Vec<String>, ClientError> {
        let response = self.transport.get("/api/ps").await?;
        let ps: PsResponse = read_json(response).await?;
        Ok(model_names(&ps.models))
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

/// Require HTTP 200, then decode the whole body as one JSON object.
async fn read_json<T: DeserializeOwned>(response: ResponseHandle) -> Result<T, ClientError> {
    let status = response.status();
    if status != 200 {
        let body = response.text().await.unwrap_or_default();
        return Err(ClientError::Server { status, body });
    }
    let bytes = response.bytes().await?;
    decode_object(&bytes)
}

/// Require HTTP 200, then hand the still-open body to the line decoder.
async fn open_stream<T>(response: ResponseHandle) -> Result<RecordStream<T>, ClientError>
where
    T: DeserializeOwned + Send + 'static,
{
    let status = response.status();
    if status != 200 {
        let body = response.text().await.unwrap_or_default();
        return Err(ClientError::Server { status, body });
    }
    Ok(record_stream(response.byte_stream()))
}
