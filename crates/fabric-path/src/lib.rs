//! Fabric Path - Topology graph and shortest-path forwarding
//!
//! Keeps the directed graph of switches, hosts and links learned from
//! discovery and packet-in events, and turns it into per-switch output ports.
//!
//! # Features
//!
//! - Directed, weighted adjacency with stable edge order
//! - Deterministic Dijkstra (ties go to the lower node id)
//! - Bounded host-pair path cache, flushed on every topology mutation
//! - Fail-open resolution: anything unresolvable floods

#![warn(missing_docs)]

pub mod cache;
pub mod graph;
pub mod resolver;

pub use cache::{PathCache, PathKey};
pub use graph::{HostAttachment, Link, TopologyGraph, TopologySnapshot};
pub use resolver::PathResolver;

use fabric_common::{DatapathId, MacAddr, PortNo};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Weight of host attachment edges unless set explicitly
pub const HOST_EDGE_WEIGHT: u64 = 0;

/// Default path cache bound
pub const DEFAULT_CACHE_CAPACITY: u64 = 4096;

/// Graph node: a switch or an end host
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeId {
    /// OpenFlow switch
    Switch(DatapathId),
    /// End host, keyed by MAC
    Host(MacAddr),
}

impl NodeId {
    /// Datapath id for switch nodes
    pub const fn as_switch(&self) -> Option<DatapathId> {
        match self {
            Self::Switch(dpid) => Some(*dpid),
            Self::Host(_) => None,
        }
    }
}

impl From<DatapathId> for NodeId {
    fn from(dpid: DatapathId) -> Self {
        Self::Switch(dpid)
    }
}

impl From<MacAddr> for NodeId {
    fn from(mac: MacAddr) -> Self {
        Self::Host(mac)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Switch(dpid) => write!(f, "s{}", dpid.as_u64()),
            Self::Host(mac) => write!(f, "{mac}"),
        }
    }
}

/// Directed edge out of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Neighbor
    pub to: NodeId,
    /// Egress port on the source switch; `None` on host-to-switch edges
    pub port: Option<PortNo>,
    /// Non-negative cost
    pub weight: u64,
}
