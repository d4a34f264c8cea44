//! Shared bridge state and the producer/consumer handles.
//!
//! A bridge connects exactly one producer (the transport's I/O thread,
//! driving [`ResponseSink`]) with at most one consumer (the application
//! thread, holding [`ResponseHandle`]). All coordination happens through one
//! mutex-guarded state struct, a condition variable for blocked readers, and
//! two one-shot gates for the response head and the final outcome.

use std::collections::VecDeque;
use std::mem;
use std::sync::{Arc, Condvar, Mutex};
#[cfg(feature = "async")]
use std::task::Waker;
use std::time::Duration;

#[cfg(feature = "async")]
use crate::async_reader::AsyncBodyReader;
use crate::chunk::Chunk;
use crate::error::{BoxError, Error};
use crate::head::ResponseHead;
use crate::latch::Latch;
use crate::reader::BodyReader;

/// Creates a connected producer/consumer pair around fresh bridge state.
pub fn channel() -> (ResponseSink, ResponseHandle) {
    let shared = Arc::new(Shared {
        state: Mutex::new(State {
            queue: VecDeque::new(),
            failure: None,
            finished: false,
            closed: false,
            reader_taken: false,
            #[cfg(feature = "async")]
            read_waker: None,
        }),
        readable: Condvar::new(),
        headers: Latch::new(),
        outcome: Latch::new(),
    });
    let sink = ResponseSink {
        shared: shared.clone(),
        completed: false,
    };
    let handle = ResponseHandle { shared };
    (sink, handle)
}

pub(crate) struct Shared {
    pub(crate) state: Mutex<State>,
    pub(crate) readable: Condvar,
    pub(crate) headers: Latch<crate::Result<ResponseHead>>,
    pub(crate) outcome: Latch<crate::Result<()>>,
}

pub(crate) struct State {
    pub(crate) queue: VecDeque<Chunk>,
    pub(crate) failure: Option<Error>,
    /// The body ended normally; readers observe end-of-stream once the
    /// queue drains. Never set together with `failure`.
    pub(crate) finished: bool,
    pub(crate) closed: bool,
    reader_taken: bool,
    #[cfg(feature = "async")]
    pub(crate) read_waker: Option<Waker>,
}

impl Shared {
    /// Wakes a reader blocked on the queue, whichever flavor is parked.
    pub(crate) fn wake_reader(&self, state: &mut State) {
        #[cfg(feature = "async")]
        if let Some(waker) = state.read_waker.take() {
            waker.wake();
        }
        #[cfg(not(feature = "async"))]
        let _ = state;
        self.readable.notify_all();
    }

    /// Records `error` as the terminal failure unless a terminal state is
    /// already visible, draining queued chunks in arrival order.
    ///
    /// Returns the drained chunks; their acks must be failed with no lock
    /// held.
    fn record_failure(&self, error: &Error) -> VecDeque<Chunk> {
        let drained = {
            let mut state = self.state.lock().unwrap();
            if state.failure.is_some() || state.finished {
                return VecDeque::new();
            }
            state.failure = Some(error.clone());
            let drained = mem::take(&mut state.queue);
            self.wake_reader(&mut state);
            drained
        };
        // A waiter blocked on headers before any arrived must not hang.
        self.headers.open(Err(error.clone()));
        drained
    }

    /// Marks the bridge closed and returns the chunks to cancel; their acks
    /// must be failed with no lock held. Idempotent.
    fn close(&self) -> VecDeque<Chunk> {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return VecDeque::new();
        }
        state.closed = true;
        let drained = mem::take(&mut state.queue);
        self.wake_reader(&mut state);
        drained
    }

    pub(crate) fn close_and_cancel(&self) {
        for chunk in self.close() {
            chunk.ack.fail(Error::Cancelled);
        }
    }
}

/// The producer-side handle: the surface the transport's I/O thread drives.
///
/// The expected call order is zero-or-one [`headers`](Self::headers),
/// zero-or-more [`content`](Self::content), one of
/// [`success`](Self::success)/[`failure`](Self::failure), then exactly one
/// [`complete`](Self::complete). Dropping the sink without completing is
/// treated as a disconnect so no waiter can hang on a vanished producer.
pub struct ResponseSink {
    shared: Arc<Shared>,
    completed: bool,
}

impl ResponseSink {
    /// Records the response head and opens the headers gate.
    pub fn headers(&self, head: ResponseHead) {
        self.shared.headers.open(Ok(head));
    }

    /// Delivers one body chunk.
    ///
    /// Zero-length chunks are acknowledged and dropped immediately; they
    /// carry no information and must not occupy a queue slot. Chunks
    /// arriving after the reader closed the stream have their ack failed
    /// with [`Error::Cancelled`] without being queued, and chunks arriving
    /// after a recorded failure are failed with that failure, so the
    /// producer's flow control is never left waiting.
    pub fn content(&self, chunk: Chunk) {
        let mut state = self.shared.state.lock().unwrap();
        if state.closed || state.finished {
            drop(state);
            chunk.ack.fail(Error::Cancelled);
            return;
        }
        if let Some(error) = state.failure.clone() {
            drop(state);
            chunk.ack.fail(error);
            return;
        }
        if chunk.bytes.is_empty() {
            drop(state);
            chunk.ack.complete();
            return;
        }
        state.queue.push_back(chunk);
        self.shared.wake_reader(&mut state);
    }

    /// Marks the body complete: readers observe end-of-stream once the
    /// queue drains. A no-op after a recorded failure or a close, so the
    /// first terminal state wins.
    pub fn success(&self) {
        let mut state = self.shared.state.lock().unwrap();
        if state.closed || state.failure.is_some() {
            return;
        }
        state.finished = true;
        self.shared.wake_reader(&mut state);
    }

    /// Reports a transport failure.
    ///
    /// The first failure wins. Chunks still queued at this point have their
    /// acks failed with it, in arrival order, so the transport's buffer
    /// reclamation never stalls on bytes nobody will read.
    pub fn failure(&self, error: impl Into<BoxError>) {
        self.fail_with(Error::transport(error));
    }

    /// Finishes the request, opening the headers and outcome gates.
    ///
    /// This is the one call guaranteed to fire exactly once per request;
    /// consuming `self` makes a second call impossible. A failing result
    /// that was not already reported through [`failure`](Self::failure)
    /// takes the same recording path, including the queue drain.
    pub fn complete(mut self, result: Result<(), BoxError>) {
        self.completed = true;
        self.finish(result.map_err(Error::transport));
    }

    fn fail_with(&self, error: Error) {
        let drained = self.shared.record_failure(&error);
        for chunk in drained {
            chunk.ack.fail(error.clone());
        }
    }

    fn finish(&self, result: crate::Result<()>) {
        let outcome = match result {
            Ok(()) => {
                // Tolerate producers that skip `success`; a reader must not
                // block past a completed request.
                self.success();
                let state = self.shared.state.lock().unwrap();
                state.failure.clone().map_or(Ok(()), Err)
            }
            Err(error) => {
                self.fail_with(error.clone());
                let state = self.shared.state.lock().unwrap();
                // First failure wins over the completion result.
                Err(state.failure.clone().unwrap_or(error))
            }
        };
        let headers_fallback = match &outcome {
            Ok(()) => Error::Disconnected,
            Err(error) => error.clone(),
        };
        self.shared.headers.open(Err(headers_fallback));
        self.shared.outcome.open(outcome);
    }
}

impl Drop for ResponseSink {
    fn drop(&mut self) {
        if !self.completed {
            self.finish(Err(Error::Disconnected));
        }
    }
}

/// The consumer-side handle: blocking accessors for the response head, the
/// final outcome, and the body stream.
pub struct ResponseHandle {
    shared: Arc<Shared>,
}

impl ResponseHandle {
    /// Blocks until the response head is available.
    ///
    /// Fails with [`Error::TimedOut`] if nothing arrives within `timeout`,
    /// or with the recorded failure if the request failed before any
    /// headers were seen.
    pub fn wait_headers(&self, timeout: Duration) -> crate::Result<ResponseHead> {
        self.shared.headers.wait(timeout).unwrap_or(Err(Error::TimedOut))
    }

    /// Blocks until the whole request has finished, successfully or not.
    pub fn wait_outcome(&self, timeout: Duration) -> crate::Result<()> {
        self.shared.outcome.wait(timeout).unwrap_or(Err(Error::TimedOut))
    }

    /// Returns the blocking body reader.
    ///
    /// Body content is not replayable: the first call returns the live
    /// reader, and every later call returns a reader that is already
    /// terminally closed.
    pub fn reader(&self) -> BodyReader {
        BodyReader::new(self.shared.clone(), self.take_reader_slot())
    }

    /// Returns the async body reader.
    ///
    /// Shares the single-use guard with [`reader`](Self::reader): only one
    /// live reader of either flavor ever exists per bridge.
    #[cfg(feature = "async")]
    #[cfg_attr(docsrs, doc(cfg(feature = "async")))]
    pub fn async_reader(&self) -> AsyncBodyReader {
        AsyncBodyReader::new(self.shared.clone(), self.take_reader_slot())
    }

    fn take_reader_slot(&self) -> bool {
        let mut state = self.shared.state.lock().unwrap();
        let live = !state.reader_taken;
        state.reader_taken = true;
        live
    }
}

impl Drop for ResponseHandle {
    fn drop(&mut self) {
        // A handle discarded without ever taking the reader abandons the
        // body; release the transport's in-flight chunks.
        let taken = self.shared.state.lock().unwrap().reader_taken;
        if !taken {
            self.shared.close_and_cancel();
        }
    }
}

mod trait_assert {
    trait _AssertMarker: Send + Sync {}
    impl _AssertMarker for super::ResponseSink {}
    impl _AssertMarker for super::ResponseHandle {}
}
