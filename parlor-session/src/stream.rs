//! Streamed delivery of one assistant turn.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use parlor_client::RecordStream;
use parlor_types::{ChatResponse, ClientError};
use tokio_util::sync::CancellationToken;

use crate::session::ChatSession;

/// Lazy sequence of assistant text fragments for one streamed turn.
///
/// Produced by [`ChatSession::send_turn_streaming`]. Finite, fused, and
/// not restartable. Empty keep-alive records are skipped; every yielded
/// fragment is non-empty.
///
/// When the sequence ends, whether by the server's final record,
/// cancellation via the token, a terminating decode error, or the consumer
/// dropping the stream early, the text accumulated so far is committed to
/// the session history as a single assistant message (nothing is committed
/// when no text arrived at all).
#[derive(Debug)]
pub struct TurnStream<'a> {
    session: &'a mut ChatSession,
    records: RecordStream<ChatResponse>,
    cancel: CancellationToken,
    accumulated: String,
    finished: bool,
    committed: bool,
}

impl<'a> TurnStream<'a> {
    pub(crate) fn new(
        session: &'a mut ChatSession,
        records: RecordStream<ChatResponse>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            session,
            records,
            cancel,
            accumulated: String::new(),
            finished: false,
            committed: false,
        }
    }

    /// Text accumulated so far.
    #[must_use]
    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    fn finish(&mut self) {
        self.finished = true;
        self.commit();
    }

    fn commit(&mut self) {
        if self.committed {
            return;
        }
        self.committed = true;
        if !self.accumulated.is_empty() {
            self.session
                .push_assistant(std::mem::take(&mut self.accumulated));
        }
    }
}

impl Stream for TurnStream<'_> {
    type Item = Result<String, ClientError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }
        if this.cancel.is_cancelled() {
            tracing::debug!("streamed turn cancelled");
            this.finish();
            return Poll::Ready(None);
        }
        loop {
            match Pin::new(&mut this.records).poll_next(cx) {
                Poll::Ready(Some(Ok(record))) => {
                    let fragment = record.fragment();
                    if !fragment.is_empty() {
                        let fragment = fragment.to_string();
                        this.accumulated.push_str(&fragment);
                        if record.done {
                            this.finish();
                        }
                        return Poll::Ready(Some(Ok(fragment)));
                    }
                    if record.done {
                        this.finish();
                        return Poll::Ready(None);
                    }
                    // Keep-alive record with no text; poll for the next one.
                }
                Poll::Ready(Some(Err(err))) => {
                    this.finish();
                    return Poll::Ready(Some(Err(err)));
                }
                Poll::Ready(None) => {
                    this.finish();
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl Drop for TurnStream<'_> {
    fn drop(&mut self) {
        // A consumer that stops pulling still gets the partial reply
        // committed; the history stays consistent with what was shown.
        self.commit();
    }
}
