//! Exec-session example — a full-duplex terminal session over one
//! multiplexed connection: stdin echoed to stdout, a stderr banner, and
//! a resize event on the control channel.
//!
//! Run with:
//!   cargo run --example exec-session

use wsmux::conn::{MuxConnection, TerminalSize};
use wsmux::frame::{RESIZE, STDIN};
use wsmux::transport::pair;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .init();

    let (client_end, server_end) = pair();
    let client = MuxConnection::open(client_end);
    let server = MuxConnection::open(server_end);

    // Register the client's read streams before the server starts
    // writing; frames for unregistered indices are dropped.
    let mut stdout = client.stdout()?;
    let mut stderr = client.stderr()?;
    let stdin = client.stdin();

    // Server side: echo stdin to stdout, report resizes, greet on stderr.
    let mut server_stdin = server.read_stream(STDIN)?;
    let mut server_resize = server.read_stream(RESIZE)?;
    let server_stdout = server.write_stream(wsmux::frame::STDOUT);
    let server_stderr = server.write_stream(wsmux::frame::STDERR);

    let server_task = tokio::spawn(async move {
        server_stderr.write(b"session ready\n").await?;
        loop {
            tokio::select! {
                chunk = server_stdin.read() => match chunk? {
                    Some(chunk) => server_stdout.write(&chunk).await?,
                    None => break,
                },
                event = server_resize.read() => match event? {
                    Some(payload) => {
                        let size = TerminalSize::from_payload(&payload)?;
                        eprintln!("[server] terminal resized to {}x{}", size.width, size.height);
                    }
                    None => break,
                },
            }
        }
        Ok::<_, Box<dyn std::error::Error + Send + Sync>>(())
    });

    // Client side: read the banner, resize, type a couple of lines.
    let banner = stderr.read().await?.expect("server sends a banner");
    eprintln!("[client] stderr: {}", String::from_utf8_lossy(&banner));

    client.send_resize(TerminalSize::new(120, 40)).await?;

    for line in [&b"echo hello\n"[..], &b"exit\n"[..]] {
        stdin.write(line).await?;
        let echoed = stdout.read().await?.expect("server echoes each line");
        eprintln!("[client] stdout: {}", String::from_utf8_lossy(&echoed));
    }

    client.close().await;
    server.closed().await;
    server_task.await?.map_err(|e| e.to_string())?;
    Ok(())
}
