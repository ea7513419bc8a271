//! Port and flow statistics records

use crate::{MacAddr, PortNo};
use serde::{Deserialize, Serialize};

/// Statistics request kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatsKind {
    /// Per-port counters for all ports
    Port,
    /// Per-flow counters for all flows
    Flow,
}

/// Per-port counters as reported by the switch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortStat {
    /// Port number
    pub port_no: PortNo,
    /// Received packets
    pub rx_packets: u64,
    /// Received bytes
    pub rx_bytes: u64,
    /// Receive errors
    pub rx_errors: u64,
    /// Transmitted packets
    pub tx_packets: u64,
    /// Transmitted bytes
    pub tx_bytes: u64,
    /// Transmit errors
    pub tx_errors: u64,
}

/// One entry of a flow-statistics reply, any priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowStatEntry {
    /// Rule priority
    pub priority: u16,
    /// Matched ingress port, if any
    pub match_in_port: Option<PortNo>,
    /// Matched destination MAC, if any
    pub match_eth_dst: Option<MacAddr>,
    /// First output action port, if any
    pub output_port: Option<PortNo>,
    /// Matched packets
    pub packet_count: u64,
    /// Matched bytes
    pub byte_count: u64,
}

/// Counters of a learned forwarding rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowStat {
    /// Matched ingress port
    pub in_port: PortNo,
    /// Matched destination MAC
    pub eth_dst: MacAddr,
    /// Output port
    pub output_port: PortNo,
    /// Matched packets
    pub packet_count: u64,
    /// Matched bytes
    pub byte_count: u64,
}

impl FlowStat {
    /// Project a reply entry; `None` when a learned-rule field is missing
    pub fn from_entry(entry: &FlowStatEntry) -> Option<Self> {
        Some(Self {
            in_port: entry.match_in_port?,
            eth_dst: entry.match_eth_dst?,
            output_port: entry.output_port?,
            packet_count: entry.packet_count,
            byte_count: entry.byte_count,
        })
    }

    /// Sort key of the flow report
    #[inline(always)]
    pub fn sort_key(&self) -> (PortNo, MacAddr) {
        (self.in_port, self.eth_dst)
    }
}
