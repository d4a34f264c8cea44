use std::io::{ErrorKind, Read};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use penstock::{channel, AckHandle, Chunk, Error, ResponseHead};

/// Records every acknowledgement outcome in invocation order.
#[derive(Clone, Default)]
struct AckLog(Arc<Mutex<Vec<penstock::Result<()>>>>);

impl AckLog {
    fn handle(&self) -> AckHandle {
        let log = self.0.clone();
        AckHandle::new(move |outcome| log.lock().unwrap().push(outcome))
    }

    fn events(&self) -> Vec<penstock::Result<()>> {
        self.0.lock().unwrap().clone()
    }
}

fn head() -> ResponseHead {
    ResponseHead {
        status: 200,
        headers: vec![("content-length".into(), "10".into())],
    }
}

#[test]
fn mixed_chunk_sizes_read_one_byte_at_a_time() {
    let (sink, handle) = channel();
    let acks = AckLog::default();
    sink.headers(head());
    sink.content(Chunk::new(&b"abcd"[..], acks.handle()));
    sink.content(Chunk::new(&b""[..], acks.handle()));
    sink.content(Chunk::new(&b"efghij"[..], acks.handle()));
    // The zero-length chunk was acked without ever occupying a queue slot.
    assert_eq!(acks.events().len(), 1);
    assert!(acks.events()[0].is_ok());
    sink.success();
    sink.complete(Ok(()));

    let mut reader = handle.reader();
    let mut out = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte).unwrap() {
            0 => break,
            n => out.extend_from_slice(&byte[..n]),
        }
    }
    assert_eq!(out, b"abcdefghij");
    // End-of-stream is idempotent across repeated reads.
    assert_eq!(reader.read(&mut byte).unwrap(), 0);

    let events = acks.events();
    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|e| e.is_ok()));
}

#[test]
fn ack_fires_only_after_full_drain() {
    let (sink, handle) = channel();
    let acks = AckLog::default();
    sink.content(Chunk::new(&b"abcdef"[..], acks.handle()));

    let mut reader = handle.reader();
    let mut buf = [0u8; 4];
    assert_eq!(reader.read(&mut buf).unwrap(), 4);
    assert_eq!(&buf, b"abcd");
    assert!(acks.events().is_empty());
    assert_eq!(reader.read(&mut buf).unwrap(), 2);
    assert_eq!(&buf[..2], b"ef");
    assert!(matches!(acks.events().as_slice(), [Ok(())]));
    sink.success();
    sink.complete(Ok(()));
}

#[test]
fn failure_fails_queued_chunk_and_read() {
    let (sink, handle) = channel();
    let acks = AckLog::default();
    sink.content(Chunk::new(&b"pending"[..], acks.handle()));
    sink.failure("connection reset");

    let mut reader = handle.reader();
    let err = reader.read(&mut [0u8; 8]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Other);

    let events = acks.events();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        Err(Error::Transport(cause)) if cause.to_string() == "connection reset"
    ));
    sink.complete(Err("connection reset".into()));
}

#[test]
fn first_failure_wins() {
    let (sink, handle) = channel();
    sink.failure("first");
    sink.failure("second");
    sink.complete(Err("third".into()));

    let outcome = handle.wait_outcome(Duration::from_secs(1));
    assert!(matches!(
        outcome,
        Err(Error::Transport(cause)) if cause.to_string() == "first"
    ));
    let headers = handle.wait_headers(Duration::from_secs(1));
    assert!(matches!(
        headers,
        Err(Error::Transport(cause)) if cause.to_string() == "first"
    ));
}

#[test]
fn close_before_content_cancels_late_chunks() {
    let (sink, handle) = channel();
    let acks = AckLog::default();
    let mut reader = handle.reader();
    reader.close();

    sink.content(Chunk::new(&b"late"[..], acks.handle()));
    assert!(matches!(acks.events().as_slice(), [Err(Error::Cancelled)]));

    let err = reader.read(&mut [0u8; 4]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConnectionAborted);
    sink.complete(Ok(()));
}

#[test]
fn close_is_idempotent() {
    let (sink, handle) = channel();
    let acks = AckLog::default();
    sink.content(Chunk::new(&b"abc"[..], acks.handle()));

    let mut reader = handle.reader();
    reader.close();
    reader.close();
    reader.closer().close();
    assert!(matches!(acks.events().as_slice(), [Err(Error::Cancelled)]));
    sink.complete(Ok(()));
}

#[test]
fn second_reader_is_dead() {
    let (sink, handle) = channel();
    sink.content(Chunk::new(&b"live"[..], AckHandle::noop()));
    sink.success();

    let mut first = handle.reader();
    let mut second = handle.reader();
    let err = second.read(&mut [0u8; 4]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConnectionAborted);
    // Dropping the dead reader must not disturb the live one.
    drop(second);

    let mut out = String::new();
    first.read_to_string(&mut out).unwrap();
    assert_eq!(out, "live");
    sink.complete(Ok(()));
}

#[test]
fn read_blocks_until_content_arrives() {
    let (sink, handle) = channel();
    let reader_thread = thread::spawn(move || {
        let mut reader = handle.reader();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).map(|_| out)
    });

    thread::sleep(Duration::from_millis(50));
    sink.content(Chunk::new(&b"slow"[..], AckHandle::noop()));
    sink.success();
    sink.complete(Ok(()));
    assert_eq!(reader_thread.join().unwrap().unwrap(), b"slow");
}

#[test]
fn close_wakes_blocked_reader() {
    let (sink, handle) = channel();
    let reader = handle.reader();
    let closer = reader.closer();
    let reader_thread = thread::spawn(move || {
        let mut reader = reader;
        reader.read(&mut [0u8; 4])
    });

    thread::sleep(Duration::from_millis(50));
    closer.close();
    let err = reader_thread.join().unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConnectionAborted);
    sink.complete(Ok(()));
}

#[test]
fn producer_drop_unblocks_everything() {
    let (sink, handle) = channel();
    let reader = handle.reader();
    let reader_thread = thread::spawn(move || {
        let mut reader = reader;
        reader.read(&mut [0u8; 4])
    });

    thread::sleep(Duration::from_millis(50));
    drop(sink);
    let err = reader_thread.join().unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BrokenPipe);
    assert!(matches!(
        handle.wait_outcome(Duration::ZERO),
        Err(Error::Disconnected)
    ));
    assert!(matches!(
        handle.wait_headers(Duration::ZERO),
        Err(Error::Disconnected)
    ));
}

#[test]
fn wait_headers_times_out_then_delivers() {
    let (sink, handle) = channel();
    assert!(matches!(
        handle.wait_headers(Duration::from_millis(10)),
        Err(Error::TimedOut)
    ));

    sink.headers(head());
    let delivered = handle.wait_headers(Duration::ZERO).unwrap();
    assert_eq!(delivered.status, 200);
    assert_eq!(delivered.content_length(), Some(10));
    sink.complete(Ok(()));
}

#[test]
fn headers_open_no_later_than_outcome() {
    let (sink, handle) = channel();
    sink.headers(head());
    sink.success();
    sink.complete(Ok(()));

    handle.wait_outcome(Duration::from_secs(1)).unwrap();
    // Once the outcome is final, headers must already be available.
    assert_eq!(handle.wait_headers(Duration::ZERO).unwrap().status, 200);
}

#[test]
fn content_after_failure_is_refused_with_that_failure() {
    let (sink, handle) = channel();
    let acks = AckLog::default();
    sink.failure("boom");
    sink.content(Chunk::new(&b"x"[..], acks.handle()));
    assert!(matches!(
        acks.events().as_slice(),
        [Err(Error::Transport(cause))] if cause.to_string() == "boom"
    ));
    sink.complete(Err("boom".into()));
    drop(handle);
}

#[test]
fn dropping_handle_without_reader_closes_bridge() {
    let (sink, handle) = channel();
    let acks = AckLog::default();
    sink.content(Chunk::new(&b"abc"[..], acks.handle()));
    drop(handle);
    assert!(matches!(acks.events().as_slice(), [Err(Error::Cancelled)]));

    sink.content(Chunk::new(&b"more"[..], acks.handle()));
    let events = acks.events();
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[1], Err(Error::Cancelled)));
    sink.complete(Ok(()));
}

#[test]
fn eof_survives_close_after_body_end() {
    let (sink, handle) = channel();
    sink.content(Chunk::new(&b"x"[..], AckHandle::noop()));
    sink.success();
    sink.complete(Ok(()));

    let mut reader = handle.reader();
    let mut out = String::new();
    reader.read_to_string(&mut out).unwrap();
    assert_eq!(out, "x");
    reader.close();
    // The body ended before the close, so this is still a clean EOF.
    assert_eq!(reader.read(&mut [0u8; 1]).unwrap(), 0);
}

#[test]
fn ack_gated_producer_streams_in_order() {
    let (sink, handle) = channel();
    let payload: Vec<u8> = (0..256usize * 7).map(|i| (i % 251) as u8).collect();
    let expected = payload.clone();

    let producer = thread::spawn(move || {
        for piece in payload.chunks(7) {
            let (tx, rx) = mpsc::channel();
            let ack = AckHandle::new(move |outcome| {
                let _ = tx.send(outcome);
            });
            sink.content(Chunk::new(piece.to_vec(), ack));
            // Real transport discipline: hold the next chunk until the
            // previous ack reopens the window.
            rx.recv().expect("ack dropped").expect("ack failed");
        }
        sink.success();
        sink.complete(Ok(()));
    });

    let mut out = Vec::new();
    handle.reader().read_to_end(&mut out).unwrap();
    producer.join().unwrap();
    assert_eq!(out, expected);
}
