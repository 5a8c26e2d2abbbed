//! Conversation session: history, model selection, turn delivery.

use parlor_client::{BlockingClient, Client};
use parlor_types::{ChatResponse, ClientError, Message, Role};
use tokio_util::sync::CancellationToken;

use crate::config::ChatConfig;
use crate::stream::TurnStream;

/// A conversation with one model server.
///
/// The session owns the ordered message history and the active model and
/// mediates every interaction through the protocol clients. There is no
/// internal locking: `&mut self` on every mutating operation means at most
/// one call is outstanding at a time, and multi-threaded callers serialize
/// access themselves.
///
/// Blocking operations ([`connect`](ChatSession::connect),
/// [`send_turn`](ChatSession::send_turn), [`generate`](ChatSession::generate),
/// [`refresh_models`](ChatSession::refresh_models)) must not be called from
/// an async runtime thread; the `_async` counterparts and
/// [`send_turn_streaming`](ChatSession::send_turn_streaming) exist for that
/// context.
#[derive(Debug)]
pub struct ChatSession {
    model: String,
    system: Option<String>,
    history: Vec<Message>,
    available: Vec<String>,
    client: BlockingClient,
    async_client: Client,
}

impl ChatSession {
    /// Connect, validate the configured model against the server's model
    /// list, and seed the history with the system prompt if one is
    /// configured. Blocking.
    ///
    /// Fails with `ModelNotAvailable` when the model is absent from the
    /// listing; no chat call is made in that case.
    pub fn connect(config: ChatConfig) -> Result<Self, ClientError> {
        let client = BlockingClient::with_base_url(&config.base_url)?;
        let async_client = Client::with_base_url(&config.base_url)?;
        let available = client.list_models()?;
        Self::assemble(config, client, async_client, available)
    }

    /// Async counterpart of [`connect`](ChatSession::connect).
    pub async fn connect_async(config: ChatConfig) -> Result<Self, ClientError> {
        let client = BlockingClient::with_base_url(&config.base_url)?;
        let async_client = Client::with_base_url(&config.base_url)?;
        let available = async_client.list_models().await?;
        Self::assemble(config, client, async_client, available)
    }

    fn assemble(
        config: ChatConfig,
        client: BlockingClient,
        async_client: Client,
        available: Vec<String>,
    ) -> Result<Self, ClientError> {
        if !available.iter().any(|name| name == &config.model) {
            return Err(ClientError::ModelNotAvailable {
                model: config.model,
                available,
            });
        }
        let system = config.system.filter(|s| !s.is_empty());
        let mut history = Vec::new();
        if let Some(system) = &system {
            history.push(Message::system(system.clone()));
        }
        tracing::debug!(model = %config.model, "session connected");
        Ok(Self {
            model: config.model,
            system,
            history,
            available,
            client,
            async_client,
        })
    }

    /// The active model.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The configured system prompt, if any.
    #[must_use]
    pub fn system(&self) -> Option<&str> {
        self.system.as_deref()
    }

    /// The conversation so far, oldest message first.
    #[must_use]
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Model names cached from the last listing.
    #[must_use]
    pub fn available_models(&self) -> &[String] {
        &self.available
    }

    /// Switch the active model for subsequent turns.
    ///
    /// Validated against the model list cached at connect/refresh time.
    /// Switching never clears the history; earlier turns simply came from
    /// a different model.
    pub fn set_model(&mut self, model: impl Into<String>) -> Result<(), ClientError> {
        let model = model.into();
        if !self.available.iter().any(|name| name == &model) {
            return Err(ClientError::ModelNotAvailable {
                model,
                available: self.available.clone(),
            });
        }
        tracing::debug!(model = %model, "switched model");
        self.model = model;
        Ok(())
    }

    /// Re-fetch the server's model list and replace the cached one.
    /// Blocking.
    pub fn refresh_models(&mut self) -> Result<&[String], ClientError> {
        self.available = self.client.list_models()?;
        Ok(&self.available)
    }

    /// Async counterpart of [`refresh_models`](ChatSession::refresh_models).
    pub async fn refresh_models_async(&mut self) -> Result<&[String], ClientError> {
        self.available = self.async_client.list_models().await?;
        Ok(&self.available)
    }

    /// Send one user turn and return the assistant's reply. Blocking,
    /// non-streaming.
    ///
    /// The full history plus the new user turn is sent. On success both
    /// turns are appended, so the history grows by exactly two messages;
    /// on any failure the history is left untouched and the turn can be
    /// retried.
    pub fn send_turn(&mut self, prompt: impl Into<String>) -> Result<String, ClientError> {
        let user = Message::user(prompt);
        let mut outgoing = self.history.clone();
        outgoing.push(user.clone());

        let response = self.client.chat(&self.model, &outgoing)?;
        let reply = assistant_reply(response)?;
        let content = reply.content.clone();

        self.history.push(user);
        self.history.push(reply);
        tracing::debug!(turns = self.history.len(), "committed chat turn");
        Ok(content)
    }

    /// Send one user turn and stream the assistant's reply as text
    /// fragments.
    ///
    /// The user turn is appended to the history before the request opens;
    /// if opening fails, the append is rolled back and the error returned.
    /// Once the stream is live, every way it can end (final record,
    /// cancellation, decode failure, or simply dropping the stream)
    /// commits the text accumulated so far as one assistant turn, so a
    /// partial reply the user has already seen is never dropped.
    ///
    /// The `cancel` token is checked before each fragment is yielded;
    /// cancellation is cooperative and does not interrupt an in-flight
    /// socket read. The stream is finite and not restartable, and `&mut
    /// self` keeps it the only outstanding call on this session.
    pub async fn send_turn_streaming(
        &mut self,
        prompt: impl Into<String>,
        cancel: CancellationToken,
    ) -> Result<TurnStream<'_>, ClientError> {
        self.history.push(Message::user(prompt));
        match self.async_client.chat_stream(&self.model, &self.history).await {
            Ok(records) => Ok(TurnStream::new(self, records, cancel)),
            Err(err) => {
                self.history.pop();
                Err(err)
            }
        }
    }

    /// One-shot completion with the configured system prompt. Blocking.
    ///
    /// The conversation history is neither consulted nor modified.
    pub fn generate(&self, prompt: &str) -> Result<String, ClientError> {
        let response = self
            .client
            .generate(&self.model, prompt, self.system.as_deref())?;
        Ok(response.response)
    }

    /// Append a finished assistant turn. Called by [`TurnStream`] when a
    /// streamed reply completes or is cut short.
    pub(crate) fn push_assistant(&mut self, content: String) {
        self.history.push(Message::assistant(content));
        tracing::debug!(turns = self.history.len(), "committed streamed turn");
    }
}

/// Extract the assistant message from a non-streaming chat response.
fn assistant_reply(response: ChatResponse) -> Result<Message, ClientError> {
    match response.message {
        Some(message) if message.role == Role::Assistant => Ok(message),
        Some(message) => Err(ClientError::Decode(format!(
            "expected assistant reply, got role {:?}",
            message.role
        ))),
        None => Err(ClientError::Decode("chat response missing message".into())),
    }
}
