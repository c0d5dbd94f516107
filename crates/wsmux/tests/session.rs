//! End-to-end session tests over the public facade API: two multiplexed
//! connections back to back on an in-memory transport pair.

use bytes::Bytes;
use wsmux::conn::{ConnectionState, MuxConnection, MuxError, TerminalSize};
use wsmux::frame::{RESIZE, STDIN, STDOUT};
use wsmux::transport::pair;

#[tokio::test]
async fn full_duplex_exec_session() {
    let (client_end, server_end) = pair();
    let client = MuxConnection::open(client_end);
    let server = MuxConnection::open(server_end);

    // Register everything before any traffic flows; early frames for
    // unregistered indices would be dropped.
    let mut client_stdout = client.stdout().unwrap();
    let mut client_stderr = client.stderr().unwrap();
    let client_stdin = client.stdin();

    let mut server_stdin = server.read_stream(STDIN).unwrap();
    let mut server_resize = server.read_stream(RESIZE).unwrap();
    let server_stdout = server.write_stream(STDOUT);
    let server_stderr = server.write_stream(wsmux::frame::STDERR);

    let server_task = tokio::spawn(async move {
        server_stderr.write(b"ready").await.unwrap();

        let resize = server_resize.read().await.unwrap().unwrap();
        let size = TerminalSize::from_payload(&resize).unwrap();
        assert_eq!(size, TerminalSize::new(120, 40));

        while let Some(line) = server_stdin.read().await.unwrap() {
            server_stdout.write(&line).await.unwrap();
        }
    });

    assert_eq!(
        client_stderr.read().await.unwrap().unwrap().as_ref(),
        b"ready"
    );

    client.send_resize(TerminalSize::new(120, 40)).await.unwrap();

    client_stdin.write(b"echo hello").await.unwrap();
    client_stdin.write(b"exit").await.unwrap();
    assert_eq!(
        client_stdout.read().await.unwrap().unwrap().as_ref(),
        b"echo hello"
    );
    assert_eq!(
        client_stdout.read().await.unwrap().unwrap().as_ref(),
        b"exit"
    );

    client.close().await;
    assert_eq!(client.state(), ConnectionState::Closed);

    // The server observes the peer close as end-of-stream on stdin.
    server_task.await.unwrap();
    server.closed().await;
    assert_eq!(server.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn writes_preserve_message_boundaries_across_the_facade() {
    let (left, right) = pair();
    let source = MuxConnection::open(left);
    let sink = MuxConnection::open(right);

    let mut reader = sink.read_stream(9).unwrap();
    let writer = source.write_stream(9);

    writer.write(b"a").await.unwrap();
    writer.write(b"").await.unwrap();
    writer.write(b"bc").await.unwrap();

    assert_eq!(reader.read().await.unwrap().unwrap().as_ref(), b"a");
    assert_eq!(reader.read().await.unwrap().unwrap(), Bytes::new());
    assert_eq!(reader.read().await.unwrap().unwrap().as_ref(), b"bc");
}

#[tokio::test]
async fn no_cross_delivery_between_indices() {
    let (left, right) = pair();
    let source = MuxConnection::open(left);
    let sink = MuxConnection::open(right);

    let mut readers = Vec::new();
    for index in 0..4u8 {
        readers.push(sink.read_stream(index).unwrap());
    }

    // Stays under the per-index delivery queue depth so every write can
    // complete before the readers start draining.
    let mut writer_tasks = Vec::new();
    for index in 0..4u8 {
        let writer = source.write_stream(index);
        writer_tasks.push(tokio::spawn(async move {
            for _ in 0..24 {
                writer.write(&[index; 16]).await.unwrap();
            }
        }));
    }
    for task in writer_tasks {
        task.await.unwrap();
    }

    for (index, reader) in readers.iter_mut().enumerate() {
        for _ in 0..24 {
            let chunk = reader.read().await.unwrap().unwrap();
            assert!(chunk.iter().all(|byte| *byte as usize == index));
        }
    }
}

#[tokio::test]
async fn byte_reader_over_the_facade() {
    let (left, right) = pair();
    let source = MuxConnection::open(left);
    let sink = MuxConnection::open(right);

    let reader = sink.read_stream(1).unwrap();
    let writer = source.write_stream(1);

    writer.write(b"hello, ").await.unwrap();
    writer.write(b"world").await.unwrap();
    source.close().await;

    let mut flattened = reader.into_byte_reader();
    let mut collected = String::new();
    tokio::io::AsyncReadExt::read_to_string(&mut flattened, &mut collected)
        .await
        .unwrap();
    assert_eq!(collected, "hello, world");
}

#[tokio::test]
async fn closed_connection_rejects_registration_and_writes() {
    let (left, _right) = pair();
    let connection = MuxConnection::open(left);
    connection.close().await;

    assert!(matches!(
        connection.read_stream(1),
        Err(MuxError::ConnectionClosed)
    ));
    assert!(matches!(
        connection.write_stream(0).write(b"x").await,
        Err(MuxError::ConnectionClosed)
    ));
}
