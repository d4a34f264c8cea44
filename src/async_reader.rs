//! Async stream adapter over bridge state.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Buf;

use crate::bridge::Shared;
use crate::error::Error;

/// A single-use [`futures_io::AsyncRead`] stream over a bridge's body
/// content.
///
/// Shares the semantics of [`crate::BodyReader`]; instead of blocking on the
/// bridge's condition variable it parks the task waker, which every
/// producer-side state change wakes.
pub struct AsyncBodyReader {
    shared: Arc<Shared>,
    live: bool,
}

impl AsyncBodyReader {
    pub(crate) fn new(shared: Arc<Shared>, live: bool) -> Self {
        AsyncBodyReader { shared, live }
    }

    /// Closes the stream, cancelling any chunks still queued. Idempotent.
    pub fn close(&mut self) {
        if self.live {
            self.shared.close_and_cancel();
        }
    }
}

impl futures_io::AsyncRead for AsyncBodyReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if !this.live {
            return Poll::Ready(Err(Error::Cancelled.into()));
        }
        if buf.is_empty() {
            return Poll::Ready(Ok(0));
        }
        let (n, ack) = {
            let mut state = this.shared.state.lock().unwrap();
            if let Some(chunk) = state.queue.front_mut() {
                let n = buf.len().min(chunk.bytes.len());
                buf[..n].copy_from_slice(&chunk.bytes[..n]);
                chunk.bytes.advance(n);
                let ack = if chunk.bytes.is_empty() {
                    state.queue.pop_front().map(|chunk| chunk.ack)
                } else {
                    None
                };
                (n, ack)
            } else if let Some(error) = &state.failure {
                return Poll::Ready(Err(error.clone().into()));
            } else if state.finished {
                return Poll::Ready(Ok(0));
            } else if state.closed {
                return Poll::Ready(Err(Error::Cancelled.into()));
            } else {
                state.read_waker = Some(cx.waker().clone());
                return Poll::Pending;
            }
        };
        // Ack with no lock held, same as the blocking reader.
        if let Some(ack) = ack {
            ack.complete();
        }
        Poll::Ready(Ok(n))
    }
}

impl Drop for AsyncBodyReader {
    fn drop(&mut self) {
        self.close();
    }
}

mod trait_assert {
    trait _AssertMarker: Send + Sync + Unpin {}
    impl _AssertMarker for super::AsyncBodyReader {}
}
