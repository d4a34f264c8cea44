//! Backpressure-preserving bridge from an asynchronous response-body
//! producer to a blocking reader.
//!
//! ## Overview
//!
//! Transports that deliver HTTP response bodies asynchronously hand out the
//! body as a sequence of buffer chunks on an I/O thread, each paired with a
//! completion callback used for flow control: the next chunk is withheld
//! until the previous chunk's callback fires. Application code usually wants
//! the opposite shape — an ordinary blocking byte stream read from its own
//! thread, with no knowledge of the callback protocol.
//!
//! Penstock is the piece in between: a bounded, cancellable producer/consumer
//! channel between exactly one producer (the transport callbacks, driving a
//! [`ResponseSink`]) and at most one consumer (the application, holding a
//! [`ResponseHandle`]). It guarantees
//!
//! - every [`Chunk`]'s acknowledgement fires exactly once, whether the chunk
//!   is read, the request fails, or the stream is closed mid-flight;
//! - bytes come out in exact arrival order, with end-of-stream only after
//!   every preceding chunk;
//! - the first failure wins and is replayed to every current and future
//!   waiter;
//! - closing the stream cancels queued and in-flight content immediately,
//!   so a cancelled-but-still-producing request cannot grow memory.
//!
//! Backpressure itself is the transport's discipline — it withholds the next
//! chunk until the previous ack — so the bridge's obligation is solely to
//! acknowledge promptly and exactly once.
//!
//! ## Usage
//!
//! ```
//! use std::io::Read;
//! use std::thread;
//! use std::time::Duration;
//!
//! use penstock::{AckHandle, Chunk, ResponseHead};
//!
//! let (sink, handle) = penstock::channel();
//! let producer = thread::spawn(move || {
//!     sink.headers(ResponseHead { status: 200, headers: vec![] });
//!     sink.content(Chunk::new(&b"hello"[..], AckHandle::noop()));
//!     sink.success();
//!     sink.complete(Ok(()));
//! });
//!
//! let head = handle.wait_headers(Duration::from_secs(1)).unwrap();
//! assert_eq!(head.status, 200);
//! let mut body = String::new();
//! handle.reader().read_to_string(&mut body).unwrap();
//! assert_eq!(body, "hello");
//! producer.join().unwrap();
//! ```
//!
//! ## Features
//!
//! - `async`: adds `AsyncBodyReader`, a `futures_io::AsyncRead` flavor of
//!   the body stream over the same bridge state.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]

#[cfg(feature = "async")]
mod async_reader;
mod bridge;
mod chunk;
mod error;
mod head;
mod latch;
mod reader;

#[cfg(feature = "async")]
#[cfg_attr(docsrs, doc(cfg(feature = "async")))]
pub use async_reader::AsyncBodyReader;
pub use bridge::{channel, ResponseHandle, ResponseSink};
pub use chunk::{AckHandle, Chunk};
pub use error::{BoxError, Error, Result};
pub use head::ResponseHead;
pub use reader::{BodyCloser, BodyReader};
