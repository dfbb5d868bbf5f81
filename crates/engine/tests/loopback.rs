//! End-to-end transmission over a loopback TCP pair: a memory header, a
//! file body, and a memory trailer leave the socket in chain order through
//! the real syscall-backed transmitter.

#![cfg(unix)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::os::fd::AsRawFd;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chain::{Chain, FileSpan, MemorySpan, Span};
use engine::{Connection, SendConfig, send_chain};
use tempfile::NamedTempFile;
use transmit::SocketTransmitter;

#[test]
fn chain_bytes_arrive_in_order() {
    let header = b"HTTP/1.1 200 OK\r\ncontent-length: 262144\r\n\r\n";
    let body: Vec<u8> = (0..256 * 1024).map(|i| (i % 251) as u8).collect();
    let trailer = b"\r\n-- end --\r\n";

    let mut tmp = NamedTempFile::new().unwrap();
    tmp.write_all(&body).unwrap();
    tmp.flush().unwrap();
    let file = Arc::new(tmp.reopen().unwrap());

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let sender = TcpStream::connect(addr).unwrap();
    sender.set_nonblocking(true).unwrap();
    let (mut receiver, _) = listener.accept().unwrap();

    let expected_len = header.len() + body.len() + trailer.len();
    let reader = thread::spawn(move || {
        let mut received = Vec::with_capacity(expected_len);
        let mut buf = [0u8; 16 * 1024];
        while received.len() < expected_len {
            let n = receiver.read(&mut buf).unwrap();
            assert!(n > 0, "sender closed early");
            received.extend_from_slice(&buf[..n]);
        }
        received
    });

    let mut chain: Chain = [
        Span::Memory(MemorySpan::new(Arc::from(&header[..]))),
        Span::Flush,
        Span::File(FileSpan::new(Arc::clone(&file), 0, body.len() as u64)),
        Span::Memory(MemorySpan::new(Arc::from(&trailer[..]))),
    ]
    .into_iter()
    .collect();

    let mut conn = Connection::new(SocketTransmitter::new(sender.as_raw_fd()));
    // Batching off: loopback tests should not sit behind the cork timer.
    let config = SendConfig {
        tcp_batching: false,
        ..SendConfig::new()
    };

    let mut rounds = 0;
    while !chain.is_empty() {
        send_chain(&mut conn, &mut chain, &config).unwrap();
        if chain.is_empty() {
            break;
        }
        // Stand-in for the reactor: wait for buffer space to drain, then
        // re-arm readiness.
        rounds += 1;
        assert!(rounds < 10_000, "transfer made no progress");
        thread::sleep(Duration::from_millis(1));
        conn.set_write_ready(true);
    }

    assert_eq!(conn.bytes_sent(), expected_len as u64);

    let received = reader.join().unwrap();
    assert_eq!(received.len(), expected_len);
    assert_eq!(&received[..header.len()], header);
    assert_eq!(&received[header.len()..header.len() + body.len()], &body[..]);
    assert_eq!(&received[header.len() + body.len()..], trailer);
}
