//! Fanout example — independent producers writing concurrently on
//! distinct stream indices, with per-index consumers on the far end.
//!
//! Run with:
//!   cargo run --example fanout

use wsmux::conn::MuxConnection;
use wsmux::transport::pair;

const PRODUCERS: [u8; 3] = [10, 11, 12];
const MESSAGES_PER_PRODUCER: usize = 100;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .init();

    let (left, right) = pair();
    let source = MuxConnection::open(left);
    let sink = MuxConnection::open(right);

    let mut consumers = Vec::new();
    for index in PRODUCERS {
        let mut reader = sink.read_stream(index)?;
        consumers.push(tokio::spawn(async move {
            let mut received = 0usize;
            while let Some(chunk) = reader.read().await? {
                assert!(chunk.starts_with(format!("producer-{index}").as_bytes()));
                received += 1;
            }
            Ok::<_, wsmux::conn::MuxError>((index, received))
        }));
    }

    let mut producers = Vec::new();
    for index in PRODUCERS {
        let writer = source.write_stream(index);
        producers.push(tokio::spawn(async move {
            for sequence in 0..MESSAGES_PER_PRODUCER {
                let payload = format!("producer-{index} message {sequence}");
                writer.write(payload.as_bytes()).await?;
            }
            Ok::<_, wsmux::conn::MuxError>(())
        }));
    }

    for producer in producers {
        producer.await??;
    }
    source.close().await;

    for consumer in consumers {
        let (index, received) = consumer.await??;
        eprintln!("[sink] stream {index}: {received} messages");
        assert_eq!(received, MESSAGES_PER_PRODUCER);
    }

    eprintln!("[sink] dropped frames: {}", sink.dropped_frames());
    Ok(())
}
