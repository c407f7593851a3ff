//! Integration tests for the framed TCP transport.
//!
//! Each test binds a transport on a random port, connects a raw
//! `TcpStream` as the client, and speaks the wire format by hand
//! (2-byte big-endian length + UTF-8 payload) to pin down byte-level
//! compatibility.

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use palaver_transport::{
    Connection, TcpConnection, TcpTransport, Transport, TransportError,
    MAX_FRAME_LEN,
};

/// Binds a transport, connects a client, and returns both ends.
async fn connected_pair() -> (TcpConnection, TcpStream) {
    let mut transport = TcpTransport::bind("127.0.0.1:0")
        .await
        .expect("should bind");
    let addr = transport.local_addr().expect("should have local addr");

    let accept = tokio::spawn(async move { transport.accept().await });
    let client = TcpStream::connect(addr).await.expect("should connect");
    let conn = accept
        .await
        .expect("accept task should not panic")
        .expect("accept should succeed");

    (conn, client)
}

/// Writes one frame to the client socket by hand.
async fn client_send(client: &mut TcpStream, line: &str) {
    client
        .write_u16(line.len() as u16)
        .await
        .expect("write length");
    client.write_all(line.as_bytes()).await.expect("write payload");
}

/// Reads one frame from the client socket by hand.
async fn client_recv(client: &mut TcpStream) -> String {
    let len = client.read_u16().await.expect("read length");
    let mut payload = vec![0u8; len as usize];
    client.read_exact(&mut payload).await.expect("read payload");
    String::from_utf8(payload).expect("valid UTF-8")
}

#[tokio::test]
async fn test_send_produces_length_prefixed_frame() {
    let (conn, mut client) = connected_pair().await;
    conn.send("hello").await.expect("send should succeed");

    let mut raw = [0u8; 7];
    client.read_exact(&mut raw).await.expect("read raw frame");
    assert_eq!(&raw[..2], &[0x00, 0x05], "big-endian length prefix");
    assert_eq!(&raw[2..], b"hello");
}

#[tokio::test]
async fn test_recv_returns_client_frame() {
    let (conn, mut client) = connected_pair().await;
    client_send(&mut client, "/auth alice secret123").await;

    let line = conn.recv().await.expect("recv should succeed");
    assert_eq!(line.as_deref(), Some("/auth alice secret123"));
}

#[tokio::test]
async fn test_round_trip_preserves_order() {
    let (conn, mut client) = connected_pair().await;

    for i in 0..5 {
        conn.send(&format!("msg-{i}")).await.expect("send");
    }
    for i in 0..5 {
        assert_eq!(client_recv(&mut client).await, format!("msg-{i}"));
    }
}

#[tokio::test]
async fn test_recv_empty_frame_is_empty_string() {
    let (conn, mut client) = connected_pair().await;
    client_send(&mut client, "").await;

    let line = conn.recv().await.expect("recv should succeed");
    assert_eq!(line.as_deref(), Some(""));
}

#[tokio::test]
async fn test_recv_after_clean_close_returns_none() {
    let (conn, client) = connected_pair().await;
    drop(client);

    let line = conn.recv().await.expect("clean close is not an error");
    assert!(line.is_none());
}

#[tokio::test]
async fn test_recv_truncated_frame_is_error() {
    let (conn, mut client) = connected_pair().await;

    // Announce 10 bytes but deliver only 3, then disconnect.
    client.write_u16(10).await.expect("write length");
    client.write_all(b"abc").await.expect("write partial payload");
    drop(client);

    let result = conn.recv().await;
    assert!(
        matches!(result, Err(TransportError::ReceiveFailed(_))),
        "truncated frame should be a receive error, got {result:?}"
    );
}

#[tokio::test]
async fn test_recv_invalid_utf8_is_error() {
    let (conn, mut client) = connected_pair().await;

    client.write_u16(2).await.expect("write length");
    client.write_all(&[0xff, 0xfe]).await.expect("write payload");

    let result = conn.recv().await;
    assert!(
        matches!(result, Err(TransportError::InvalidUtf8(_))),
        "non-UTF-8 payload should be rejected, got {result:?}"
    );
}

#[tokio::test]
async fn test_send_oversized_frame_is_rejected() {
    let (conn, _client) = connected_pair().await;

    let oversized = "x".repeat(MAX_FRAME_LEN + 1);
    let result = conn.send(&oversized).await;
    assert!(
        matches!(result, Err(TransportError::FrameTooLong(n)) if n == MAX_FRAME_LEN + 1),
        "oversized frame should be rejected, got {result:?}"
    );
}

#[tokio::test]
async fn test_send_max_len_frame_succeeds() {
    let (conn, mut client) = connected_pair().await;

    let exact = "y".repeat(MAX_FRAME_LEN);
    conn.send(&exact).await.expect("max-length frame should fit");
    assert_eq!(client_recv(&mut client).await, exact);
}

#[tokio::test]
async fn test_concurrent_send_while_recv_blocked() {
    // A blocked reader must not hold up outbound frames — broadcasts
    // are delivered to sessions that are idle on their read side.
    let (conn, mut client) = connected_pair().await;
    let conn = std::sync::Arc::new(conn);

    let reader = Arc::clone(&conn);
    let recv_task = tokio::spawn(async move { reader.recv().await });

    // Give the recv a moment to park on the socket.
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;

    conn.send("broadcast while parked").await.expect("send");
    assert_eq!(client_recv(&mut client).await, "broadcast while parked");

    client_send(&mut client, "done").await;
    let received = recv_task.await.expect("no panic").expect("recv ok");
    assert_eq!(received.as_deref(), Some("done"));
}
