//! Statistics polling and reporting

use crate::registry::SwitchRegistry;
use crate::sink::ProtocolSink;
use dashmap::DashMap;
use fabric_common::{DatapathId, FlowStat, FlowStatEntry, PortStat, StatsKind};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Latest counters of one switch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwitchStats {
    /// Sorted by port number
    pub ports: Vec<PortStat>,
    /// Learned rules only, sorted by ingress port then destination
    pub flows: Vec<FlowStat>,
}

/// Most recent statistics per switch
///
/// Each reply replaces the previous snapshot of its kind.
pub struct StatsStore {
    snapshots: DashMap<DatapathId, SwitchStats>,
    registry: Arc<SwitchRegistry>,
    learned_priority: u16,
}

impl StatsStore {
    /// Create store keeping flows at `learned_priority`
    pub fn new(registry: Arc<SwitchRegistry>, learned_priority: u16) -> Self {
        Self {
            snapshots: DashMap::new(),
            registry,
            learned_priority,
        }
    }

    /// Record a port statistics reply; `false` if the switch is unknown
    pub fn on_port_stats_reply(&self, datapath: DatapathId, mut stats: Vec<PortStat>) -> bool {
        if !self.registry.is_registered(datapath) {
            debug!("Port stats from unregistered switch {}, discarding", datapath);
            return false;
        }

        stats.sort_by_key(|s| s.port_no);
        for s in &stats {
            info!(
                "port stats {} port={} rx_pkts={} rx_bytes={} rx_err={} tx_pkts={} tx_bytes={} tx_err={}",
                datapath,
                s.port_no,
                s.rx_packets,
                s.rx_bytes,
                s.rx_errors,
                s.tx_packets,
                s.tx_bytes,
                s.tx_errors
            );
        }
        self.snapshots.entry(datapath).or_default().ports = stats;
        true
    }

    /// Record a flow statistics reply; `false` if the switch is unknown
    ///
    /// Only rules at the learned priority with a full match are kept.
    pub fn on_flow_stats_reply(&self, datapath: DatapathId, entries: Vec<FlowStatEntry>) -> bool {
        if !self.registry.is_registered(datapath) {
            debug!("Flow stats from unregistered switch {}, discarding", datapath);
            return false;
        }

        let mut flows: Vec<FlowStat> = entries
            .iter()
            .filter(|e| e.priority == self.learned_priority)
            .filter_map(FlowStat::from_entry)
            .collect();
        flows.sort_by_key(FlowStat::sort_key);

        for f in &flows {
            info!(
                "flow stats {} in_port={} eth_dst={} out_port={} packets={} bytes={}",
                datapath, f.in_port, f.eth_dst, f.output_port, f.packet_count, f.byte_count
            );
        }
        self.snapshots.entry(datapath).or_default().flows = flows;
        true
    }

    /// Latest port counters
    pub fn port_stats(&self, datapath: DatapathId) -> Option<Vec<PortStat>> {
        self.snapshots.get(&datapath).map(|s| s.ports.clone())
    }

    /// Latest learned-flow counters
    pub fn flow_stats(&self, datapath: DatapathId) -> Option<Vec<FlowStat>> {
        self.snapshots.get(&datapath).map(|s| s.flows.clone())
    }

    /// Latest port and flow counters
    pub fn snapshot(&self, datapath: DatapathId) -> Option<SwitchStats> {
        self.snapshots.get(&datapath).map(|s| s.clone())
    }

    /// Drop the snapshot of a disconnected switch
    pub fn forget(&self, datapath: DatapathId) {
        self.snapshots.remove(&datapath);
    }
}

/// Periodic port and flow statistics requests
pub struct StatsPoller {
    registry: Arc<SwitchRegistry>,
    sink: Arc<dyn ProtocolSink>,
    interval: Duration,
}

impl StatsPoller {
    /// Create poller over the registry's active switches
    pub fn new(registry: Arc<SwitchRegistry>, sink: Arc<dyn ProtocolSink>, interval: Duration) -> Self {
        Self {
            registry,
            sink,
            interval,
        }
    }

    /// One round: a port and a flow request per active switch
    ///
    /// Returns the number of switches polled.
    pub fn poll_once(&self) -> usize {
        let active = self.registry.list_active();
        for datapath in &active {
            debug!("Send stats request: {}", datapath);
            self.sink.send_stats_request(*datapath, StatsKind::Port);
            self.sink.send_stats_request(*datapath, StatsKind::Flow);
        }
        active.len()
    }

    /// Poll forever, sleeping a full interval between rounds
    pub async fn run(self) {
        info!("Starting stats poller every {:?}", self.interval);
        loop {
            self.poll_once();
            tokio::time::sleep(self.interval).await;
        }
    }

    /// Run on a new tokio task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
