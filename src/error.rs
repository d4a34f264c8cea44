//! Error types for bridge operations.

use std::io;
use std::sync::Arc;

use thiserror::Error;

/// A boxed error reported by the transport driving a bridge.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The errors produced by a bridge.
///
/// Every failure is recorded once (first writer wins) and replayed to all
/// current and future waiters, so the variants are cheaply clonable.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// A bounded wait on headers or the final outcome expired.
    #[error("Wait expired before the response made progress")]
    TimedOut,
    /// The transport failed while producing the response.
    #[error("Transport failure")]
    Transport(#[source] Arc<dyn std::error::Error + Send + Sync>),
    /// The reader closed the body stream; content past this point is
    /// discarded rather than delivered.
    #[error("Body stream closed by the reader")]
    Cancelled,
    /// The producer went away without completing the response.
    #[error("Producer disconnected before the response completed")]
    Disconnected,
}

impl Error {
    pub(crate) fn transport(cause: impl Into<BoxError>) -> Self {
        Error::Transport(Arc::from(cause.into()))
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> io::Error {
        let kind = match &err {
            Error::TimedOut => io::ErrorKind::TimedOut,
            Error::Transport(_) => io::ErrorKind::Other,
            Error::Cancelled => io::ErrorKind::ConnectionAborted,
            // Deliberately not `Interrupted`: `Read::read_to_end` retries
            // interrupted reads, which would spin on a vanished producer.
            Error::Disconnected => io::ErrorKind::BrokenPipe,
        };
        io::Error::new(kind, err)
    }
}

/// A `Result` alias where the `Err` case is [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
