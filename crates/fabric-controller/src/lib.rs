//! Fabric Controller - OpenFlow control-plane core
//!
//! Consumes switch, discovery, packet-in and statistics events from the
//! protocol stack and answers with flow installs, packet-outs and
//! statistics requests.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                     PROTOCOL STACK (OpenFlow 1.3)             │
//! └──────────────┬──────────────────────────────▲─────────────────┘
//!                │ ControllerEvent              │ ControllerCommand
//! ┌──────────────▼──────────────────────────────┴─────────────────┐
//! │                       EVENT DISPATCHER                        │
//! │   SwitchRegistry | TopologyGraph | ForwardingEngine | Stats   │
//! └──────────────────────────────▲────────────────────────────────┘
//!                                │ every stats_interval_secs
//!                        ┌───────┴───────┐
//!                        │ STATS POLLER  │
//!                        └───────────────┘
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod events;
pub mod forwarding;
pub mod registry;
pub mod sink;
pub mod stats;

use fabric_common::{DatapathId, FabricError, FabricResult, FlowRule, FlowStatEntry, PortNo, PortStat};
use fabric_path::{PathResolver, TopologyGraph, TopologySnapshot};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub use config::{ControllerConfig, ForwardingMode, LinkWeight};
pub use events::{ControllerEvent, LinkEvent, PacketIn};
pub use forwarding::{
    ForwardingAction, ForwardingEngine, ForwardingStrategy, LearningStrategy, ShortestPathStrategy,
};
pub use registry::{Switch, SwitchRegistry, SwitchState};
pub use sink::{ControllerCommand, ProtocolSink};
pub use stats::{StatsPoller, StatsStore, SwitchStats};

/// Controller core
///
/// All state mutation happens through [`Controller::dispatch`], which the
/// event loop calls one event at a time.
pub struct Controller {
    config: ControllerConfig,
    graph: Arc<RwLock<TopologyGraph>>,
    registry: Arc<SwitchRegistry>,
    forwarding: ForwardingEngine,
    stats: StatsStore,
    sink: Arc<dyn ProtocolSink>,
}

impl Controller {
    /// Build every component from configuration
    pub fn new(config: ControllerConfig, sink: Arc<dyn ProtocolSink>) -> Self {
        let graph = Arc::new(RwLock::new(TopologyGraph::new(config.path_cache_capacity)));
        let registry = Arc::new(SwitchRegistry::new(graph.clone()));

        let strategy: Box<dyn ForwardingStrategy> = match config.forwarding_mode {
            ForwardingMode::Learning => Box::new(LearningStrategy::new()),
            ForwardingMode::ShortestPath => Box::new(ShortestPathStrategy::new(Arc::new(
                PathResolver::new(graph.clone()),
            ))),
        };
        let forwarding = ForwardingEngine::new(strategy, sink.clone(), config.learned_flow_priority);
        let stats = StatsStore::new(registry.clone(), config.learned_flow_priority);

        Self {
            config,
            graph,
            registry,
            forwarding,
            stats,
            sink,
        }
    }

    /// Route one event to its handler
    ///
    /// Handler failures are logged and swallowed so one bad event never
    /// stops the loop.
    pub fn dispatch(&self, event: ControllerEvent) {
        let kind = event.kind();
        let result = match event {
            ControllerEvent::SwitchUp { datapath, ports } => self.on_switch_up(datapath, ports),
            ControllerEvent::SwitchDown { datapath } => self.on_switch_down(datapath),
            ControllerEvent::LinkDiscovered(link) => self.on_link_discovered(link),
            ControllerEvent::LinkRemoved(link) => self.on_link_removed(link),
            ControllerEvent::PacketIn(packet) => self.on_packet_in(&packet),
            ControllerEvent::PortStatsReply { datapath, stats } => self.on_port_stats(datapath, stats),
            ControllerEvent::FlowStatsReply { datapath, stats } => self.on_flow_stats(datapath, stats),
        };

        if let Err(e) = result {
            warn!("Dropping {} event: {}", kind, e);
        }
    }

    /// Consume events until every sender is gone
    pub async fn run(self: Arc<Self>, mut events: mpsc::Receiver<ControllerEvent>) {
        info!(
            "Controller running ({} forwarding)",
            self.forwarding.strategy_name()
        );
        while let Some(event) = events.recv().await {
            self.dispatch(event);
        }
        info!("Event channel closed, controller stopping");
    }

    /// Poller wired to this controller's registry and sink
    pub fn stats_poller(&self) -> StatsPoller {
        StatsPoller::new(self.registry.clone(), self.sink.clone(), self.config.stats_interval())
    }

    /// Active configuration
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Switch registry
    pub fn registry(&self) -> &Arc<SwitchRegistry> {
        &self.registry
    }

    /// Shared topology graph
    pub fn graph(&self) -> &Arc<RwLock<TopologyGraph>> {
        &self.graph
    }

    /// Forwarding engine
    pub fn forwarding(&self) -> &ForwardingEngine {
        &self.forwarding
    }

    /// Latest statistics
    pub fn stats(&self) -> &StatsStore {
        &self.stats
    }

    /// Consistent copy of the topology
    pub fn topology_snapshot(&self) -> TopologySnapshot {
        self.graph.read().snapshot()
    }

    fn on_switch_up(&self, datapath: DatapathId, ports: Vec<PortNo>) -> FabricResult<()> {
        if self.registry.on_switch_up(datapath, ports) && self.config.install_table_miss {
            debug!("Install table-miss rule on {}", datapath);
            self.sink.install_flow(FlowRule::table_miss(datapath));
        }
        Ok(())
    }

    fn on_switch_down(&self, datapath: DatapathId) -> FabricResult<()> {
        if self.registry.on_switch_down(datapath).is_some() {
            self.forwarding.forget_switch(datapath);
            self.stats.forget(datapath);
        }
        Ok(())
    }

    fn on_link_discovered(&self, link: LinkEvent) -> FabricResult<()> {
        link.validate()?;
        self.ensure_registered(link.src)?;
        self.ensure_registered(link.dst)?;

        let forward = self.config.link_weight(link.src, link.dst);
        let reverse = self.config.link_weight(link.dst, link.src);
        let mut graph = self.graph.write();
        graph.add_link(link.src, link.dst, link.src_port, forward);
        graph.add_link(link.dst, link.src, link.dst_port, reverse);
        info!(
            "Link {}:{} <-> {}:{} (weights {}/{})",
            link.src, link.src_port, link.dst, link.dst_port, forward, reverse
        );
        Ok(())
    }

    fn on_link_removed(&self, link: LinkEvent) -> FabricResult<()> {
        link.validate()?;
        let mut graph = self.graph.write();
        let removed = graph.remove_link(link.src, link.dst) | graph.remove_link(link.dst, link.src);
        if removed {
            info!("Link {} <-> {} removed", link.src, link.dst);
        }
        Ok(())
    }

    fn on_packet_in(&self, packet: &PacketIn) -> FabricResult<()> {
        self.ensure_registered(packet.datapath)?;
        self.forwarding.on_packet_in(packet)?;
        Ok(())
    }

    fn on_port_stats(&self, datapath: DatapathId, stats: Vec<PortStat>) -> FabricResult<()> {
        self.ensure_registered(datapath)?;
        self.stats.on_port_stats_reply(datapath, stats);
        Ok(())
    }

    fn on_flow_stats(&self, datapath: DatapathId, stats: Vec<FlowStatEntry>) -> FabricResult<()> {
        self.ensure_registered(datapath)?;
        self.stats.on_flow_stats_reply(datapath, stats);
        Ok(())
    }

    fn ensure_registered(&self, datapath: DatapathId) -> FabricResult<()> {
        if self.registry.is_registered(datapath) {
            Ok(())
        } else {
            Err(FabricError::UnknownSwitch(datapath))
        }
    }
}
