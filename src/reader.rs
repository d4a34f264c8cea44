//! Blocking stream adapter over bridge state.

use std::io;
use std::sync::Arc;

use bytes::Buf;

use crate::bridge::Shared;
use crate::error::Error;

/// A single-use blocking [`io::Read`] stream over a bridge's body content.
///
/// Bytes come out in transport arrival order; end-of-stream is observed once
/// the body completes and the queue drains; reads after a mid-body
/// [`close`](Self::close) fail with a cancellation error. Dropping the
/// reader closes it.
pub struct BodyReader {
    shared: Arc<Shared>,
    live: bool,
}

impl BodyReader {
    pub(crate) fn new(shared: Arc<Shared>, live: bool) -> Self {
        BodyReader { shared, live }
    }

    /// Closes the stream, cancelling any chunks still queued.
    ///
    /// Idempotent. Chunks delivered after this point have their acks failed
    /// eagerly instead of being buffered, bounding memory growth while a
    /// cancelled request is still producing.
    pub fn close(&mut self) {
        if self.live {
            self.shared.close_and_cancel();
        }
    }

    /// A handle that closes this stream from another thread, e.g. to
    /// abandon a blocked read.
    pub fn closer(&self) -> BodyCloser {
        BodyCloser {
            shared: self.shared.clone(),
            live: self.live,
        }
    }
}

impl io::Read for BodyReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.live {
            return Err(Error::Cancelled.into());
        }
        if buf.is_empty() {
            return Ok(0);
        }
        let (n, ack) = {
            let mut state = self.shared.state.lock().unwrap();
            loop {
                if let Some(chunk) = state.queue.front_mut() {
                    let n = buf.len().min(chunk.bytes.len());
                    buf[..n].copy_from_slice(&chunk.bytes[..n]);
                    chunk.bytes.advance(n);
                    let ack = if chunk.bytes.is_empty() {
                        state.queue.pop_front().map(|chunk| chunk.ack)
                    } else {
                        None
                    };
                    break (n, ack);
                }
                if let Some(error) = &state.failure {
                    return Err(error.clone().into());
                }
                if state.finished {
                    return Ok(0);
                }
                if state.closed {
                    return Err(Error::Cancelled.into());
                }
                state = self.shared.readable.wait(state).unwrap();
            }
        };
        // The ack may call back into producer code; never hold the bridge
        // lock while invoking it.
        if let Some(ack) = ack {
            ack.complete();
        }
        Ok(n)
    }
}

impl Drop for BodyReader {
    fn drop(&mut self) {
        self.close();
    }
}

/// Closes a [`BodyReader`]'s stream from any thread.
///
/// A closer obtained from a dead reader (the second acquisition on a
/// bridge) is inert.
#[derive(Clone)]
pub struct BodyCloser {
    shared: Arc<Shared>,
    live: bool,
}

impl BodyCloser {
    /// Closes the stream; see [`BodyReader::close`].
    pub fn close(&self) {
        if self.live {
            self.shared.close_and_cancel();
        }
    }
}

mod trait_assert {
    trait _AssertMarker: Send + Sync {}
    impl _AssertMarker for super::BodyReader {}
    impl _AssertMarker for super::BodyCloser {}
}
