//! The two-link router
//!
//! `Router::new` builds both links from explicit configuration and wires them
//! as each other's relay peer. `start` spawns the per-link task pair (and the
//! poller when one is configured) and hands back a [`RouterHandle`]. There is
//! no global state: everything the tasks share is reachable from the router.

use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;
use uavrelay_core::{
    ChangeNotification, DebugSink, FrameDecoder, InputSource, LinkId, LinkStatsSnapshot,
    ObjectRef, ObjectStore, Port, RelayError, RelayResult, RouterConfig, SessionSender,
    TracingDebugSink,
};

use crate::link::{EventReceiver, Link, LinkHandle};
use crate::logic::EventDispatcher;
use crate::poller::Poller;
use crate::tasks::{RxTask, TxTask};

use tracing::{debug, info, trace};

// ----------------------------------------------------------------------------
// Link Configuration
// ----------------------------------------------------------------------------

/// Port and transport session halves for one link
pub struct LinkConfig {
    pub port: Port,
    pub sender: Arc<dyn SessionSender>,
    pub decoder: Box<dyn FrameDecoder>,
}

impl LinkConfig {
    pub fn new(port: Port, sender: Arc<dyn SessionSender>, decoder: Box<dyn FrameDecoder>) -> Self {
        Self {
            port,
            sender,
            decoder,
        }
    }

    /// A link whose port is the disabled sentinel
    pub fn disabled(sender: Arc<dyn SessionSender>, decoder: Box<dyn FrameDecoder>) -> Self {
        Self::new(Port::Disabled, sender, decoder)
    }
}

// ----------------------------------------------------------------------------
// Router
// ----------------------------------------------------------------------------

/// Two links relaying for each other, not yet running
pub struct Router {
    config: RouterConfig,
    links: [Arc<Link>; 2],
    receivers: [EventReceiver; 2],
    decoders: [Box<dyn FrameDecoder>; 2],
    pub(crate) store: Option<Arc<dyn ObjectStore>>,
    pub(crate) input: Option<Box<dyn InputSource>>,
    pub(crate) sink: Arc<dyn DebugSink>,
}

impl Router {
    /// Build both links; link 0 and link 1 become each other's peer
    pub fn new(config: RouterConfig, link_configs: [LinkConfig; 2]) -> RelayResult<Self> {
        config.validate()?;

        let [ground, output] = link_configs;
        let (ground_link, ground_rx) = Link::new(
            LinkId::GROUND,
            config.link(LinkId::GROUND),
            ground.port,
            ground.sender,
        )?;
        let (output_link, output_rx) = Link::new(
            LinkId::OUTPUT,
            config.link(LinkId::OUTPUT),
            output.port,
            output.sender,
        )?;

        Ok(Self {
            config,
            links: [Arc::new(ground_link), Arc::new(output_link)],
            receivers: [ground_rx, output_rx],
            decoders: [ground.decoder, output.decoder],
            store: None,
            input: None,
            sink: Arc::new(TracingDebugSink),
        })
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn link(&self, id: LinkId) -> &Arc<Link> {
        &self.links[id.index()]
    }

    /// Producer handle for one link
    pub fn handle(&self, id: LinkId) -> LinkHandle {
        self.link(id).handle()
    }

    /// Queue change notifications for `object` on `link`
    pub fn subscribe(
        &self,
        store: &Arc<dyn ObjectStore>,
        object: ObjectRef,
        link: LinkId,
    ) -> RelayResult<()> {
        subscribe_link(self.handle(link), store, object)
    }

    /// Spawn the link tasks and the poller. Must be called inside a Tokio runtime.
    pub fn start(self) -> RelayResult<RouterHandle> {
        if let Some(poller) = &self.config.poller {
            if self.input.is_none() {
                return Err(RelayError::config_error(
                    "poller configured without an input source",
                ));
            }
            if self.store.is_none() {
                return Err(RelayError::config_error(
                    "poller configured without an object store",
                ));
            }
            debug!(link = %poller.link, "poller will feed link");
        }

        let Router {
            config,
            links,
            receivers,
            decoders,
            store,
            input,
            sink,
        } = self;

        let mut dispatcher = EventDispatcher::new(config.retry);
        if let Some(store) = store {
            dispatcher = dispatcher.with_store(store);
        }
        let dispatcher = Arc::new(dispatcher);

        let mut tasks = Vec::new();
        for ((id, receiver), decoder) in LinkId::ALL.into_iter().zip(receivers).zip(decoders) {
            let link = Arc::clone(&links[id.index()]);
            let peer = links[id.peer().index()].handle();

            let mut tx = TxTask::new(Arc::clone(&link), receiver, Arc::clone(&dispatcher));
            tasks.push(SpawnedTask::new(format!("tx-{}", id), tokio::spawn(async move {
                tx.run().await
            })));

            let mut rx = RxTask::new(link, peer, decoder, config.rx);
            tasks.push(SpawnedTask::new(format!("rx-{}", id), tokio::spawn(async move {
                rx.run().await
            })));
        }

        if let (Some(poller_config), Some(source)) = (config.poller, input) {
            let handle = links[poller_config.link.index()].handle();
            let mut poller = Poller::new(poller_config, handle, source, sink);
            tasks.push(SpawnedTask::new("poller".to_string(), tokio::spawn(async move {
                poller.run().await
            })));
        }

        info!(tasks = tasks.len(), "router started");
        Ok(RouterHandle { links, tasks })
    }
}

/// Register a store callback that turns notifications into events on `handle`'s queue
pub(crate) fn subscribe_link(
    handle: LinkHandle,
    store: &Arc<dyn ObjectStore>,
    object: ObjectRef,
) -> RelayResult<()> {
    let weak_store: Weak<dyn ObjectStore> = Arc::downgrade(store);
    let link = handle.id();
    store.on_change(
        object,
        Box::new(move |notification: ChangeNotification| {
            let ack_required = weak_store
                .upgrade()
                .and_then(|store| store.get_metadata(notification.object).ok())
                .map(|metadata| metadata.ack_required)
                .unwrap_or(false);
            if !handle.enqueue(notification.into_event(ack_required)) {
                trace!(link = %handle.id(), object = %notification.object, "change notification dropped");
            }
        }),
    )?;
    debug!(%link, %object, "subscribed to object changes");
    Ok(())
}

// ----------------------------------------------------------------------------
// Router Handle
// ----------------------------------------------------------------------------

struct SpawnedTask {
    name: String,
    handle: JoinHandle<RelayResult<()>>,
}

impl SpawnedTask {
    fn new(name: String, handle: JoinHandle<RelayResult<()>>) -> Self {
        Self { name, handle }
    }
}

/// Handle to a running router
pub struct RouterHandle {
    links: [Arc<Link>; 2],
    tasks: Vec<SpawnedTask>,
}

impl RouterHandle {
    /// Producer handle for one link
    pub fn handle(&self, id: LinkId) -> LinkHandle {
        self.links[id.index()].handle()
    }

    pub fn link(&self, id: LinkId) -> &Arc<Link> {
        &self.links[id.index()]
    }

    /// Read-only counters for one link
    pub fn stats(&self, id: LinkId) -> LinkStatsSnapshot {
        self.links[id.index()].stats().snapshot()
    }

    /// Swap a link's port and session sender while running
    pub fn reconfigure(&self, id: LinkId, port: Port, sender: Arc<dyn SessionSender>) {
        self.links[id.index()].reconfigure(port, sender);
    }

    /// Queue change notifications for `object` on `link`
    pub fn subscribe(
        &self,
        store: &Arc<dyn ObjectStore>,
        object: ObjectRef,
        link: LinkId,
    ) -> RelayResult<()> {
        subscribe_link(self.handle(link), store, object)
    }

    /// Names of the spawned tasks
    pub fn task_names(&self) -> Vec<&str> {
        self.tasks.iter().map(|task| task.name.as_str()).collect()
    }

    /// True while every spawned task is alive
    pub fn is_running(&self) -> bool {
        !self.tasks.is_empty() && self.tasks.iter().all(|task| !task.handle.is_finished())
    }

    /// Abort all tasks and wait for them to unwind
    pub async fn shutdown(mut self) -> RelayResult<()> {
        info!("shutting down router");
        for task in &self.tasks {
            task.handle.abort();
        }
        for task in self.tasks.drain(..) {
            match task.handle.await {
                Ok(result) => result?,
                Err(e) if e.is_cancelled() => {}
                Err(e) => {
                    return Err(RelayError::task_error(format!(
                        "task {} failed: {}",
                        task.name, e
                    )))
                }
            }
        }
        info!("router shut down");
        Ok(())
    }
}
