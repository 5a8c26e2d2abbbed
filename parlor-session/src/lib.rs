#![deny(missing_docs)]
//! Conversation session over the parlor protocol client.
//!
//! [`ChatSession`] owns the ordered message history and the active model,
//! and mediates every user interaction: blocking single-shot turns,
//! streamed turns with cooperative cancellation, and model switching. The
//! server keeps no conversational state between calls, so the session
//! resends the full history each turn.

mod config;
mod session;
mod stream;

pub use config::ChatConfig;
pub use session::ChatSession;
pub use stream::TurnStream;

// The cancellation token type accepted by streaming turns.
pub use tokio_util::sync::CancellationToken;
