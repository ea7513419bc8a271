//! Forwarding decision engine

use crate::events::PacketIn;
use crate::sink::ProtocolSink;
use dashmap::DashMap;
use fabric_common::{
    ofp, DatapathId, EthernetHeader, FabricResult, FlowRule, MacAddr, OutputAction, PacketOut,
    PacketPayload, PortDecision, PortNo,
};
use fabric_path::PathResolver;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Resolves an output port from the current forwarding state
pub trait ForwardingStrategy: Send + Sync {
    /// Strategy name for logs
    fn name(&self) -> &'static str;

    /// Output port on `datapath` for a frame `src -> dst` that entered on `in_port`
    fn resolve_output_port(
        &self,
        datapath: DatapathId,
        in_port: PortNo,
        src: MacAddr,
        dst: MacAddr,
    ) -> PortDecision;

    /// Drop per-switch state after a disconnect
    fn forget_switch(&self, _datapath: DatapathId) {}
}

/// Per-switch MAC learning
#[derive(Default)]
pub struct LearningStrategy {
    tables: DashMap<DatapathId, HashMap<MacAddr, PortNo>>,
}

impl LearningStrategy {
    /// Create strategy with empty tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Learned port of `mac` on `datapath`
    pub fn lookup(&self, datapath: DatapathId, mac: MacAddr) -> Option<PortNo> {
        self.tables.get(&datapath)?.get(&mac).copied()
    }
}

impl ForwardingStrategy for LearningStrategy {
    fn name(&self) -> &'static str {
        "learning"
    }

    fn resolve_output_port(
        &self,
        datapath: DatapathId,
        in_port: PortNo,
        src: MacAddr,
        dst: MacAddr,
    ) -> PortDecision {
        let mut table = self.tables.entry(datapath).or_default();
        table.insert(src, in_port);

        match table.get(&dst) {
            Some(port) => PortDecision::Port(*port),
            None => PortDecision::Flood,
        }
    }

    fn forget_switch(&self, datapath: DatapathId) {
        self.tables.remove(&datapath);
    }
}

/// Shortest path over the discovered topology
pub struct ShortestPathStrategy {
    resolver: Arc<PathResolver>,
}

impl ShortestPathStrategy {
    /// Create strategy over a resolver
    pub fn new(resolver: Arc<PathResolver>) -> Self {
        Self { resolver }
    }
}

impl ForwardingStrategy for ShortestPathStrategy {
    fn name(&self) -> &'static str {
        "shortest-path"
    }

    fn resolve_output_port(
        &self,
        datapath: DatapathId,
        in_port: PortNo,
        src: MacAddr,
        dst: MacAddr,
    ) -> PortDecision {
        self.resolver.resolve_output_port(datapath, src, dst, in_port)
    }
}

/// Decision for one packet-in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForwardingAction {
    /// Chosen output
    pub output: PortDecision,
    /// Set for every non-flood decision
    pub install_flow_rule: bool,
}

impl ForwardingAction {
    fn new(output: PortDecision) -> Self {
        Self {
            output,
            install_flow_rule: !output.is_flood(),
        }
    }
}

/// Turns packet-ins into flow installs and packet-outs
pub struct ForwardingEngine {
    strategy: Box<dyn ForwardingStrategy>,
    sink: Arc<dyn ProtocolSink>,
    priority: u16,
    /// (switch, destination) -> output port already installed
    installed: DashMap<(DatapathId, MacAddr), PortNo>,
}

impl ForwardingEngine {
    /// Create engine installing learned rules at `priority`
    pub fn new(strategy: Box<dyn ForwardingStrategy>, sink: Arc<dyn ProtocolSink>, priority: u16) -> Self {
        Self {
            strategy,
            sink,
            priority,
            installed: DashMap::new(),
        }
    }

    /// Active strategy name
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Decide without emitting anything; `None` for discovery frames
    pub fn decide(
        &self,
        datapath: DatapathId,
        in_port: PortNo,
        src: MacAddr,
        dst: MacAddr,
        ether_type: u16,
    ) -> Option<ForwardingAction> {
        if ether_type == ofp::ETH_TYPE_LLDP {
            return None;
        }
        let output = self.strategy.resolve_output_port(datapath, in_port, src, dst);
        Some(ForwardingAction::new(output))
    }

    /// Handle a packet-in end to end
    ///
    /// Installs a rule the first time a switch forwards to a destination,
    /// and again only if that output changes. Always sends exactly one
    /// packet-out for the frame.
    pub fn on_packet_in(&self, packet: &PacketIn) -> FabricResult<Option<ForwardingAction>> {
        let header = EthernetHeader::parse(&packet.data)?;
        let Some(action) = self.decide(
            packet.datapath,
            packet.in_port,
            header.src,
            header.dst,
            header.ether_type,
        ) else {
            return Ok(None);
        };

        debug!(
            "packet in {} {} {} {} -> {} ({})",
            packet.datapath,
            header.src,
            header.dst,
            packet.in_port,
            action.output,
            self.strategy.name()
        );

        if let PortDecision::Port(out_port) = action.output {
            self.install_once(packet.datapath, packet.in_port, header.dst, out_port);
        }

        self.sink.send_packet_out(PacketOut {
            datapath: packet.datapath,
            payload: PacketPayload::from_packet_in(packet.buffer_id, &packet.data),
            in_port: packet.in_port,
            action: OutputAction::from(action.output),
        });

        Ok(Some(action))
    }

    /// Drop everything known about a disconnected switch
    pub fn forget_switch(&self, datapath: DatapathId) {
        self.strategy.forget_switch(datapath);
        self.installed.retain(|(dpid, _), _| *dpid != datapath);
    }

    /// Number of rules recorded as installed
    pub fn installed_rules(&self) -> usize {
        self.installed.len()
    }

    fn install_once(&self, datapath: DatapathId, in_port: PortNo, dst: MacAddr, out_port: PortNo) {
        let key = (datapath, dst);
        if self.installed.get(&key).map(|p| *p) == Some(out_port) {
            return;
        }
        self.installed.insert(key, out_port);
        self.sink
            .install_flow(FlowRule::learned(datapath, self.priority, in_port, dst, out_port));
    }
}
