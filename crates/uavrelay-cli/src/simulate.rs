//! Loopback simulation
//!
//! Runs a real router between two pairs of in-memory ports. Each pair has a
//! local end (owned by the router) and a remote end standing in for the
//! ground station and the secondary radio. Frames written at one remote end
//! should come out of the other.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::time::{self, Duration, Instant};
use uavrelay_core::{
    AccessMode, BytePort, LinkId, LinkStatsSnapshot, ObjectMetadata, ObjectRef, ObjectStore,
    PollerConfig, Port,
};
use uavrelay_harness::{
    encode_frame, DelimitedDecoder, FramedSender, MemoryObjectStore, MemoryPort, ScriptedInput,
};
use uavrelay_runtime::{LinkConfig, RouterBuilder};

use tracing::{debug, info};

use crate::config::AppConfig;
use crate::error::Result;

/// Object the simulated receiver samples are committed to
pub const RECEIVER_OBJECT: ObjectRef = ObjectRef::new(0xCC7E_2B28);

/// Statistics for one link at the end of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkReport {
    pub link: LinkId,
    pub name: String,
    pub stats: LinkStatsSnapshot,
    /// Bytes that reached this link's remote end
    pub bytes_out: usize,
}

/// Result of a simulation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub duration_ms: u64,
    pub frames_injected: u32,
    pub links: Vec<LinkReport>,
}

/// Run the router for `duration` with traffic injected on both sides
pub async fn run_simulation(config: &AppConfig, duration: Duration) -> Result<SimulationReport> {
    let mut router_config = config.router.clone();
    let store = Arc::new(MemoryObjectStore::new());

    if config.simulation.poll && router_config.poller.is_none() {
        router_config.poller = Some(PollerConfig {
            object: RECEIVER_OBJECT,
            ..PollerConfig::default()
        });
    }
    if let Some(poller) = &router_config.poller {
        store.register(
            poller.object,
            ObjectMetadata {
                ack_required: false,
                access: AccessMode::ReadOnly,
            },
        );
    }

    let (gcs_local, gcs_remote) = MemoryPort::pair("gcs", "gcs-remote");
    let (out_local, out_remote) = MemoryPort::pair("out", "out-remote");
    let remotes = [gcs_remote, out_remote];

    let mut builder = RouterBuilder::new(router_config.clone())
        .link(LinkId::GROUND, loopback_link(gcs_local))
        .link(LinkId::OUTPUT, loopback_link(out_local))
        .object_store(store.clone() as Arc<dyn ObjectStore>);
    if router_config.poller.is_some() {
        builder = builder.input_source(Box::new(sweep(config.simulation.channels)));
    }
    let router = builder.build_and_start()?;

    let mut frames_injected = 0u32;
    for (side, remote) in remotes.iter().enumerate() {
        for i in 0..config.simulation.frames_per_side {
            let frame = encode_frame(&[side as u8, i, 0x55])?;
            remote.write(frame.as_bytes()).await?;
            frames_injected += 1;
        }
    }
    info!(frames_injected, ?duration, "traffic injected, running");

    let mut bytes_out = [0usize; 2];
    let deadline = Instant::now() + duration;
    let mut buf = [0u8; 256];
    while Instant::now() < deadline {
        for (index, remote) in remotes.iter().enumerate() {
            bytes_out[index] += remote.read(&mut buf, Duration::from_millis(5)).await?;
        }
        time::sleep(Duration::from_millis(1)).await;
    }

    let links = LinkId::ALL
        .into_iter()
        .map(|link| LinkReport {
            link,
            name: router_config.link(link).name.clone(),
            stats: router.stats(link),
            bytes_out: bytes_out[link.index()],
        })
        .collect();
    debug!("simulation finished, shutting down router");
    router.shutdown().await?;

    Ok(SimulationReport {
        duration_ms: duration.as_millis() as u64,
        frames_injected,
        links,
    })
}

fn loopback_link(port: Arc<MemoryPort>) -> LinkConfig {
    let sender = Arc::new(FramedSender::new(port.clone()));
    LinkConfig::new(Port::enabled(port), sender, Box::new(DelimitedDecoder::new()))
}

/// Channel 0 sweeps a stick from low to high; the rest sit at centre
fn sweep(channels: usize) -> ScriptedInput {
    let rest = vec![1500; channels.saturating_sub(1)];
    ScriptedInput::sweep((1000..=2000).step_by(25), &rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simulation_relays_both_ways() {
        let mut config = AppConfig::default();
        config.router = uavrelay_core::RouterConfig::testing();
        config.simulation.poll = false;
        config.simulation.frames_per_side = 3;

        let report = run_simulation(&config, Duration::from_millis(300))
            .await
            .unwrap();

        assert_eq!(report.frames_injected, 6);
        for link in &report.links {
            assert_eq!(link.stats.forwarded, 3);
            assert_eq!(link.stats.sent, 3);
            // each frame is [start, len, 3 bytes, end]
            assert_eq!(link.bytes_out, 3 * 6);
        }
    }
}
