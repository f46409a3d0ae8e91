mod common;

use common::{SharedSink, closed_port, payload, serve_chunks, serve_then_stall};
use gethttp::net::Connection;
use gethttp::{PostError, RetrieveError, Retriever};
use rstest::rstest;
use std::thread;
use std::time::{Duration, Instant};

fn retriever_for(port: u16) -> Retriever {
    Retriever::builder()
        .port(port)
        .build()
        .expect("Failed to build retriever")
}

#[test]
fn test_hello_then_close() {
    let (addr, server) = serve_chunks(vec![b"hello".to_vec()]);
    let mut retriever = retriever_for(addr.port());
    let sink = SharedSink::default();

    let transfer = retriever
        .retrieve("127.0.0.1", "/hello.txt", sink.clone())
        .expect("Retrieval should succeed");

    assert_eq!(sink.contents(), b"hello");
    assert_eq!(transfer.bytes, 5);
    assert_eq!(transfer.chunks, 1);
    assert_eq!(
        transfer.completed, 2,
        "One 5-byte completion and one zero-length completion"
    );
    assert_eq!(transfer.posted, transfer.completed);

    server.join().expect("Server thread panicked");
}

#[test]
fn test_two_full_buffers_in_order() {
    let data = payload(2048);
    let (addr, server) = serve_chunks(vec![data[..1024].to_vec(), data[1024..].to_vec()]);
    let mut retriever = retriever_for(addr.port());
    let sink = SharedSink::default();

    let transfer = retriever
        .retrieve("127.0.0.1", "/blob.bin", sink.clone())
        .expect("Retrieval should succeed");

    assert_eq!(sink.contents(), data);
    assert_eq!(transfer.bytes, 2048);
    assert!(transfer.chunks >= 2, "A 1024-byte buffer needs at least two reads");

    server.join().expect("Server thread panicked");
}

#[rstest]
#[case::single_byte(vec![1])]
#[case::exact_buffer(vec![1024])]
#[case::larger_than_buffer(vec![1500])]
#[case::many_small_pushes(vec![7, 3, 11, 1, 64])]
#[case::large_then_tiny(vec![65536, 3])]
fn test_output_is_concatenation_of_pushes(#[case] sizes: Vec<usize>) {
    let data = payload(sizes.iter().sum());

    let mut chunks = Vec::new();
    let mut offset = 0;
    for size in &sizes {
        chunks.push(data[offset..offset + size].to_vec());
        offset += size;
    }

    let (addr, server) = serve_chunks(chunks);
    let mut retriever = retriever_for(addr.port());
    let sink = SharedSink::default();

    let transfer = retriever
        .retrieve("127.0.0.1", "/data", sink.clone())
        .expect("Retrieval should succeed");

    assert_eq!(sink.contents(), data, "Bytes must arrive complete and in order");
    assert_eq!(transfer.bytes, data.len() as u64);
    assert!(transfer.chunks >= (data.len() as u64).div_ceil(1024));
    assert_eq!(transfer.completed, transfer.chunks + 1);
    assert_eq!(transfer.posted, transfer.completed);

    server.join().expect("Server thread panicked");
}

#[test]
fn test_small_buffer_is_reused_across_reads() {
    let data = payload(100);
    let (addr, server) = serve_chunks(vec![data.clone()]);
    let mut retriever = Retriever::builder()
        .port(addr.port())
        .buffer_size(8)
        .build()
        .expect("Failed to build retriever");
    let sink = SharedSink::default();

    let transfer = retriever
        .retrieve("127.0.0.1", "/data", sink.clone())
        .expect("Retrieval should succeed");

    assert_eq!(sink.contents(), data);
    assert!(transfer.chunks >= 13, "100 bytes need at least 13 reads of 8");

    server.join().expect("Server thread panicked");
}

#[test]
fn test_empty_response() {
    let (addr, server) = serve_chunks(Vec::new());
    let mut retriever = retriever_for(addr.port());
    let sink = SharedSink::default();

    let transfer = retriever
        .retrieve("127.0.0.1", "/empty", sink.clone())
        .expect("Retrieval should succeed");

    assert!(sink.contents().is_empty());
    assert_eq!((transfer.chunks, transfer.posted, transfer.completed), (0, 1, 1));

    server.join().expect("Server thread panicked");
}

#[test]
fn test_request_line_is_sent() {
    let (addr, server) = serve_chunks(vec![b"ok".to_vec()]);
    let mut retriever = retriever_for(addr.port());

    retriever
        .retrieve("127.0.0.1", "/docs/readme.txt", SharedSink::default())
        .expect("Retrieval should succeed");

    let line = server.join().expect("Server thread panicked");
    assert_eq!(line, "GET /docs/readme.txt\n");
}

#[test]
fn test_sequential_retrievals_share_reactor() {
    let mut retriever = None;

    for body in [&b"first"[..], &b"second"[..]] {
        let (addr, server) = serve_chunks(vec![body.to_vec()]);
        let retriever = retriever.get_or_insert_with(|| retriever_for(addr.port()));
        let sink = SharedSink::default();

        let connection = Connection::connect("127.0.0.1", addr.port(), None)
            .expect("Failed to connect");
        retriever
            .retrieve_from(&connection, "/", sink.clone())
            .expect("Retrieval should succeed");

        assert_eq!(sink.contents(), body);
        server.join().expect("Server thread panicked");
    }

    let stats = retriever.expect("Retriever was created").stats();
    assert_eq!(stats.posted, stats.completed);
    assert_eq!(stats.completed, 4);
}

#[test]
fn test_connect_refused_posts_nothing() {
    let addr = closed_port();
    let mut retriever = retriever_for(addr.port());
    let sink = SharedSink::default();

    let result = retriever.retrieve("127.0.0.1", "/", sink.clone());

    assert!(
        matches!(result, Err(RetrieveError::Connect { .. })),
        "Expected a connect error"
    );
    assert_eq!(retriever.stats().posted, 0, "No read may be posted");
    assert!(sink.contents().is_empty());
}

#[test]
fn test_unknown_host() {
    let mut retriever = retriever_for(23456);

    let result = retriever.retrieve("no-such-host.invalid", "/", SharedSink::default());

    assert!(
        matches!(result, Err(RetrieveError::Resolution { ref host, .. }) if host == "no-such-host.invalid"),
        "Expected a resolution error"
    );
    assert_eq!(retriever.stats().posted, 0);
}

#[test]
fn test_invalid_path_sends_nothing() {
    let (addr, release, server) = serve_then_stall(b"");
    let mut retriever = retriever_for(addr.port());

    let result = retriever.retrieve("127.0.0.1", "/a\nb", SharedSink::default());

    assert!(matches!(result, Err(RetrieveError::InvalidPath(_))));
    assert_eq!(retriever.stats().posted, 0);

    let _ = release.send(());
    server.join().expect("Server thread panicked");
}

#[test]
fn test_silent_peer_times_out_and_keeps_partial_output() {
    let (addr, release, server) = serve_then_stall(b"partial");
    let timeout = Duration::from_millis(150);
    let mut retriever = Retriever::builder()
        .port(addr.port())
        .read_timeout(timeout)
        .build()
        .expect("Failed to build retriever");
    let sink = SharedSink::default();

    let start = Instant::now();
    let result = retriever.retrieve("127.0.0.1", "/slow", sink.clone());

    assert!(
        matches!(result, Err(RetrieveError::TimedOut(t)) if t == timeout),
        "Expected a read timeout"
    );
    assert!(start.elapsed() < Duration::from_secs(3));
    assert_eq!(sink.contents(), b"partial", "Forwarded bytes are not rolled back");

    let stats = retriever.stats();
    assert_eq!(stats.posted, stats.completed);

    let _ = release.send(());
    server.join().expect("Server thread panicked");
}

#[test]
fn test_cancel_from_another_thread() {
    let (addr, release, server) = serve_then_stall(b"");
    let mut retriever = retriever_for(addr.port());
    let handle = retriever.handle();

    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        handle.shutdown()
    });

    let start = Instant::now();
    let result = retriever.retrieve("127.0.0.1", "/forever", SharedSink::default());

    assert!(matches!(result, Err(RetrieveError::Cancelled)));
    assert!(start.elapsed() < Duration::from_secs(3));
    assert!(canceller.join().expect("Canceller panicked"));

    let _ = release.send(());
    server.join().expect("Server thread panicked");

    let (addr, release, server) = serve_then_stall(b"");
    let connection = Connection::connect("127.0.0.1", addr.port(), None).expect("Failed to connect");
    let result = retriever.retrieve_from(&connection, "/", SharedSink::default());

    assert!(
        matches!(result, Err(RetrieveError::Post(PostError::Shutdown))),
        "A shut down reactor must refuse new reads"
    );

    drop(connection);
    let _ = release.send(());
    server.join().expect("Server thread panicked");
}
