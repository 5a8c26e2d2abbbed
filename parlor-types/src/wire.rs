//! Request bodies and response records for the Ollama HTTP API.
//!
//! One record type per endpoint rather than free-form JSON, so protocol
//! drift surfaces as a decode error at the boundary instead of a missing
//! key deep in the caller.
//!
//! Reference: <https://github.com/ollama/ollama/blob/main/docs/api.md>

use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Body for `POST /api/generate`. Ephemeral, built per call.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateBody<'a> {
    /// Model identifier.
    pub model: &'a str,
    /// The prompt text.
    pub prompt: &'a str,
    /// Whether the server should stream NDJSON records.
    pub stream: bool,
    /// System prompt; serialized only when present. Callers pass `None`
    /// rather than `Some("")`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<&'a str>,
}

/// Body for `POST /api/chat`. Ephemeral, built per call.
#[derive(Debug, Clone, Serialize)]
pub struct ChatBody<'a> {
    /// Model identifier.
    pub model: &'a str,
    /// Full conversation so far, oldest first.
    pub messages: &'a [Message],
    /// Whether the server should stream NDJSON records.
    pub stream: bool,
}

/// One decoded record from `POST /api/generate`.
///
/// A non-streaming response is exactly one record with `done == true`; a
/// streaming response is a sequence of records whose `response` fragments
/// concatenate to the full reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// Model that produced this record.
    #[serde(default)]
    pub model: String,
    /// Text fragment (streaming) or the whole reply (non-streaming).
    #[serde(default)]
    pub response: String,
    /// True on the final record of a reply.
    #[serde(default)]
    pub done: bool,
    /// Why generation stopped ("stop", "length"); final record only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_reason: Option<String>,
    /// Prompt tokens evaluated; final record only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,
    /// Tokens generated; final record only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,
}

/// One decoded record from `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Model that produced this record.
    #[serde(default)]
    pub model: String,
    /// Message fragment (streaming) or the whole assistant message
    /// (non-streaming). The final streamed record carries an empty fragment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    /// True on the final record of a reply.
    #[serde(default)]
    pub done: bool,
    /// Why generation stopped ("stop", "length"); final record only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_reason: Option<String>,
    /// Prompt tokens evaluated; final record only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,
    /// Tokens generated; final record only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,
}

impl ChatResponse {
    /// The text fragment carried by this record, if any.
    #[must_use]
    pub fn fragment(&self) -> &str {
        self.message.as_ref().map_or("", |m| m.content.as_str())
    }
}

/// Response of `GET /api/tags` (installed models).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagsResponse {
    /// Installed models, in server order.
    pub models: Vec<ModelTag>,
}

/// Response of `GET /api/ps` (models currently loaded in memory).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PsResponse {
    /// Loaded models, in server order.
    #[serde(default)]
    pub models: Vec<ModelTag>,
}

/// A single entry in a model listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelTag {
    /// Full model name as reported by the server, e.g. `llama3:latest`.
    pub name: String,
}

impl ModelTag {
    /// Model name with any trailing `:latest` suffix stripped.
    ///
    /// The server reports the default tag explicitly (`llama3:latest`) while
    /// users configure the bare name; both refer to the same model.
    #[must_use]
    pub fn short_name(&self) -> &str {
        self.name.strip_suffix(":latest").unwrap_or(&self.name)
    }
}
