//! Loopback Relay Example
//!
//! Wires a router between two in-memory port pairs, pushes frames in from the
//! "ground station" end and reads them back out of the "output" end.

use std::sync::Arc;
use std::time::Duration;
use uavrelay_core::{BytePort, LinkId, Port, RouterConfig};
use uavrelay_harness::{encode_frame, DelimitedDecoder, FramedSender, MemoryPort};
use uavrelay_runtime::{LinkConfig, RouterBuilder};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    let _ = tracing_subscriber::fmt::try_init();

    println!("uavrelay - Loopback Relay Example");
    println!("=================================");

    let (gcs_local, gcs_remote) = MemoryPort::pair("gcs", "gcs-remote");
    let (out_local, out_remote) = MemoryPort::pair("out", "out-remote");

    let router = RouterBuilder::new(RouterConfig::testing())
        .link(LinkId::GROUND, link_for(gcs_local))
        .link(LinkId::OUTPUT, link_for(out_local))
        .build_and_start()?;

    println!("\n1. Relaying three frames from ground to output...");
    for payload in [&b"hello"[..], &b"attitude"[..], &b"gps"[..]] {
        let frame = encode_frame(payload)?;
        gcs_remote.write(frame.as_bytes()).await?;
    }

    let mut received = Vec::new();
    let mut buf = [0u8; 64];
    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    while tokio::time::Instant::now() < deadline {
        let count = out_remote.read(&mut buf, Duration::from_millis(20)).await?;
        received.extend_from_slice(&buf[..count]);
        if received.len() >= 3 * 3 + 5 + 8 + 3 {
            break;
        }
    }
    println!("   [OK] {} bytes arrived at the output end", received.len());

    println!("\n2. Link counters...");
    for link in LinkId::ALL {
        let stats = router.stats(link);
        println!(
            "   {}: sent={} forwarded={} retries={} errors={}",
            link, stats.sent, stats.forwarded, stats.retries, stats.errors
        );
    }

    router.shutdown().await?;
    println!("\nDone.");
    Ok(())
}

fn link_for(port: Arc<MemoryPort>) -> LinkConfig {
    let sender = Arc::new(FramedSender::new(port.clone()));
    LinkConfig::new(Port::enabled(port), sender, Box::new(DelimitedDecoder::new()))
}
