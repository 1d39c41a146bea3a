//! Router Builder API
//!
//! Builder-style assembly for consumers (CLI, harness, tests): register the two
//! links, an optional object store and input source, then build or start.

use std::sync::Arc;
use uavrelay_core::{
    DebugSink, InputSource, LinkId, ObjectRef, ObjectStore, RelayError, RelayResult,
    RouterConfig,
};

use crate::router::{LinkConfig, Router, RouterHandle};

use tracing::info;

// ----------------------------------------------------------------------------
// Router Builder
// ----------------------------------------------------------------------------

/// Builder for a [`Router`]
pub struct RouterBuilder {
    config: RouterConfig,
    links: [Option<LinkConfig>; 2],
    store: Option<Arc<dyn ObjectStore>>,
    subscriptions: Vec<(ObjectRef, LinkId)>,
    input: Option<Box<dyn InputSource>>,
    sink: Option<Arc<dyn DebugSink>>,
}

impl RouterBuilder {
    pub fn new(config: RouterConfig) -> Self {
        Self {
            config,
            links: [None, None],
            store: None,
            subscriptions: Vec::new(),
            input: None,
            sink: None,
        }
    }

    /// Register the port and session halves for one link
    pub fn link(mut self, id: LinkId, link: LinkConfig) -> Self {
        self.links[id.index()] = Some(link);
        self
    }

    /// Object store used for subscriptions and polled samples
    pub fn object_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Route change notifications for `object` to `link` once built
    pub fn subscribe(mut self, object: ObjectRef, link: LinkId) -> Self {
        self.subscriptions.push((object, link));
        self
    }

    /// Input source sampled by the poller
    pub fn input_source(mut self, source: Box<dyn InputSource>) -> Self {
        self.input = Some(source);
        self
    }

    /// Where poller diagnostics go; defaults to tracing
    pub fn debug_sink(mut self, sink: Arc<dyn DebugSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Build the router without starting any task
    pub fn build(self) -> RelayResult<Router> {
        let [ground, output] = self.links;
        let ground =
            ground.ok_or_else(|| RelayError::config_error("link0 has no port configuration"))?;
        let output =
            output.ok_or_else(|| RelayError::config_error("link1 has no port configuration"))?;

        if !self.subscriptions.is_empty() && self.store.is_none() {
            return Err(RelayError::config_error(
                "subscriptions require an object store",
            ));
        }

        let mut router = Router::new(self.config, [ground, output])?;
        if let Some(store) = &self.store {
            for (object, link) in &self.subscriptions {
                router.subscribe(store, *object, *link)?;
            }
        }
        router.store = self.store;
        router.input = self.input;
        if let Some(sink) = self.sink {
            router.sink = sink;
        }
        Ok(router)
    }

    /// Build and start the router
    pub fn build_and_start(self) -> RelayResult<RouterHandle> {
        info!("building telemetry router");
        self.build()?.start()
    }
}
