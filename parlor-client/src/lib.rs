#![deny(missing_docs)]
//! HTTP protocol client for a local Ollama model server.
//!
//! Three layers, leaf first: [`transport`] issues one HTTP request at a
//! time over a reusable connection and hands back the body as bytes, whole
//! or chunk by chunk; [`decode`] reassembles newline-delimited JSON records
//! from arbitrarily fragmented input; [`Client`] and [`BlockingClient`]
//! build the typed requests for the generate, chat, and model-listing
//! endpoints and turn status codes and payloads into typed results.
//!
//! No retry policy lives here. A failed call surfaces immediately and the
//! next call starts fresh; see `parlor_types::ClientError::is_retryable`
//! for the caller-side classification.

pub mod decode;
pub mod transport;

mod blocking;
mod client;
mod request;

pub use blocking::BlockingClient;
pub use client::Client;
pub use decode::{BlockingRecords, LineDecoder, RecordStream};
pub use transport::DEFAULT_BASE_URL;
