#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener};
use std::rc::Rc;
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// A sink that keeps every delivered byte for inspection.
#[derive(Clone, Default)]
pub struct SharedSink(pub Rc<RefCell<Vec<u8>>>);

impl SharedSink {
    pub fn contents(&self) -> Vec<u8> {
        self.0.borrow().clone()
    }
}

impl Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Deterministic, non-repeating-looking test payload.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

/// A one-shot peer: accepts a single connection, reads the request line,
/// then writes each chunk with its own `write_all` and closes.
///
/// The handle yields the request line the peer received.
pub fn serve_chunks(chunks: Vec<Vec<u8>>) -> (SocketAddr, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
    let addr = listener.local_addr().expect("Failed to get local address");

    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("Failed to accept connection");
        let mut reader = BufReader::new(stream);

        let mut line = String::new();
        reader
            .read_line(&mut line)
            .expect("Failed to read request line");

        let mut stream = reader.into_inner();
        for chunk in chunks {
            stream.write_all(&chunk).expect("Failed to write chunk");
            stream.flush().expect("Failed to flush chunk");
            thread::sleep(Duration::from_millis(5));
        }

        line
    });

    (addr, handle)
}

/// A peer that accepts, reads the request line, sends `greeting`, and then
/// holds the connection open without sending anything else until the
/// returned sender fires (or five seconds pass).
pub fn serve_then_stall(greeting: &'static [u8]) -> (SocketAddr, Sender<()>, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
    let addr = listener.local_addr().expect("Failed to get local address");
    let (release, released) = mpsc::channel::<()>();

    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("Failed to accept connection");
        let mut reader = BufReader::new(stream);

        let mut line = String::new();
        let _ = reader.read_line(&mut line);

        let mut stream = reader.into_inner();
        stream.write_all(greeting).expect("Failed to write greeting");

        let _ = released.recv_timeout(Duration::from_secs(5));
    });

    (addr, release, handle)
}

/// An address nothing listens on.
pub fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
    listener.local_addr().expect("Failed to get local address")
}
