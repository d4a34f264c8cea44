//! Flow-controlled response-body units.

use std::fmt;

use bytes::Bytes;

use crate::error::Error;

/// The producer-supplied capability acknowledging one [`Chunk`].
///
/// Invoking the handle tells the transport that the chunk's buffer is no
/// longer needed and that its flow-control window may advance. Both terminal
/// operations consume the handle, so a chunk can never be acknowledged
/// twice.
pub struct AckHandle(Box<dyn FnOnce(crate::Result<()>) + Send>);

impl AckHandle {
    /// Wraps a callback to be invoked with the chunk's terminal outcome.
    pub fn new(callback: impl FnOnce(crate::Result<()>) + Send + 'static) -> Self {
        AckHandle(Box::new(callback))
    }

    /// A handle for producers that do not track per-chunk completion.
    pub fn noop() -> Self {
        AckHandle(Box::new(|_| {}))
    }

    /// Signals that the chunk's bytes were fully consumed.
    pub fn complete(self) {
        (self.0)(Ok(()))
    }

    /// Signals that the chunk was discarded without being consumed.
    pub fn fail(self, reason: Error) {
        (self.0)(Err(reason))
    }
}

impl fmt::Debug for AckHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AckHandle").finish_non_exhaustive()
    }
}

/// One flow-controlled unit of response body: a read-only buffer paired with
/// the acknowledgement handle that reopens the producer's window.
#[derive(Debug)]
pub struct Chunk {
    pub(crate) bytes: Bytes,
    pub(crate) ack: AckHandle,
}

impl Chunk {
    /// Pairs a buffer with its acknowledgement handle.
    pub fn new(bytes: impl Into<Bytes>, ack: AckHandle) -> Self {
        Chunk {
            bytes: bytes.into(),
            ack,
        }
    }

    /// The number of unread bytes remaining in this chunk.
    pub fn remaining(&self) -> usize {
        self.bytes.len()
    }
}
