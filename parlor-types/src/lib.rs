#![deny(missing_docs)]
//! Shared types for the parlor Ollama client.
//!
//! Holds the conversation message model, the typed wire records for each
//! server endpoint, and the error taxonomy. The client and session crates
//! build on these; nothing here performs I/O.

mod error;
mod message;
mod wire;

pub use error::ClientError;
pub use message::{Message, Role};
pub use wire::{
    ChatBody, ChatResponse, GenerateBody, GenerateResponse, ModelTag, PsResponse, TagsResponse,
};
