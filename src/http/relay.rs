//! Chunked body relay from the upstream to the client.
//!
//! The upstream body is handed to the server in frames of at most
//! [`RELAY_CHUNK_SIZE`] bytes. Each frame is yielded on its own, so hyper
//! writes and flushes it to the client before the next one is produced and the
//! client sees a live stream (token-by-token completions) instead of a
//! buffered body.
//!
//! Termination:
//! - end of the upstream body: stream ends normally
//! - upstream read error: logged, then passed on so the server aborts the
//!   connection (status and headers are already on the wire)
//! - client went away: the server drops the relay, which drops the upstream
//!   response and frees its connection

use std::pin::Pin;
use std::task::{ready, Context, Poll};

use axum::body::Bytes;
use futures_util::stream::{BoxStream, Stream, StreamExt};

use crate::http::request::RequestId;
use crate::observability::metrics;

/// Largest frame handed to the server in one go.
pub const RELAY_CHUNK_SIZE: usize = 1024;

/// Re-chunks an upstream byte stream into bounded frames.
pub struct ChunkedRelay<E> {
    upstream: BoxStream<'static, Result<Bytes, E>>,
    pending: Bytes,
    chunk_size: usize,
    relayed: u64,
    finished: bool,
    request_id: RequestId,
}

impl<E> ChunkedRelay<E>
where
    E: std::fmt::Display + 'static,
{
    pub fn new<S>(upstream: S, request_id: RequestId) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    {
        Self::with_chunk_size(upstream, request_id, RELAY_CHUNK_SIZE)
    }

    pub fn with_chunk_size<S>(upstream: S, request_id: RequestId, chunk_size: usize) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    {
        Self {
            upstream: upstream.boxed(),
            pending: Bytes::new(),
            chunk_size: chunk_size.max(1),
            relayed: 0,
            finished: false,
            request_id,
        }
    }

    /// Bytes handed to the server so far.
    pub fn relayed(&self) -> u64 {
        self.relayed
    }

    fn finish(&mut self) {
        self.finished = true;
        metrics::record_streamed_bytes(self.relayed);
    }
}

impl<E> Stream for ChunkedRelay<E>
where
    E: std::fmt::Display + 'static,
{
    type Item = Result<Bytes, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if !this.pending.is_empty() {
                let n = this.pending.len().min(this.chunk_size);
                let chunk = this.pending.split_to(n);
                this.relayed += n as u64;
                return Poll::Ready(Some(Ok(chunk)));
            }
            if this.finished {
                return Poll::Ready(None);
            }

            match ready!(this.upstream.poll_next_unpin(cx)) {
                Some(Ok(bytes)) => this.pending = bytes,
                Some(Err(e)) => {
                    tracing::error!(
                        request_id = %this.request_id,
                        relayed_bytes = this.relayed,
                        error = %e,
                        "Error while reading upstream body, response truncated"
                    );
                    this.finish();
                    return Poll::Ready(Some(Err(e)));
                }
                None => {
                    tracing::debug!(
                        request_id = %this.request_id,
                        relayed_bytes = this.relayed,
                        "Upstream body complete"
                    );
                    this.finish();
                    return Poll::Ready(None);
                }
            }
        }
    }
}

impl<E> Drop for ChunkedRelay<E> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!(
                request_id = %self.request_id,
                relayed_bytes = self.relayed,
                "Client stopped reading, releasing upstream body"
            );
            self.finished = true;
            metrics::record_streamed_bytes(self.relayed);
        }
    }
}
