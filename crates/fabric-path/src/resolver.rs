//! Output-port resolution over the shared topology graph

use crate::{graph::TopologyGraph, NodeId};
use fabric_common::{DatapathId, MacAddr, PortDecision, PortNo};
use parking_lot::{RwLock, RwLockUpgradableReadGuard, RwLockWriteGuard};
use std::sync::Arc;
use tracing::debug;

/// Shortest-path resolver
///
/// Reads and host learning share the graph lock with every topology
/// mutation, so a resolution never observes a half-applied change.
pub struct PathResolver {
    graph: Arc<RwLock<TopologyGraph>>,
}

impl PathResolver {
    /// Create resolver over a shared graph
    pub fn new(graph: Arc<RwLock<TopologyGraph>>) -> Self {
        Self { graph }
    }

    /// Shared graph handle
    pub fn graph(&self) -> &Arc<RwLock<TopologyGraph>> {
        &self.graph
    }

    /// Output port on `dpid` for a frame from `src` to `dst`
    ///
    /// Learns `src` at `(dpid, in_port)` when it is new. Unknown destinations,
    /// missing paths and paths that no longer cross `dpid` all flood.
    pub fn resolve_output_port(
        &self,
        dpid: DatapathId,
        src: MacAddr,
        dst: MacAddr,
        in_port: PortNo,
    ) -> PortDecision {
        let guard = self.graph.upgradable_read();
        let graph = if guard.contains(&NodeId::Host(src)) {
            RwLockUpgradableReadGuard::downgrade(guard)
        } else {
            let mut writer = RwLockUpgradableReadGuard::upgrade(guard);
            writer.add_host_edge(src, dpid, in_port);
            RwLockWriteGuard::downgrade(writer)
        };

        if !graph.contains(&NodeId::Host(dst)) {
            debug!("Destination {} unknown, flooding on {}", dst, dpid);
            return PortDecision::Flood;
        }

        let Some(path) = cached_or_computed(&graph, src, dst) else {
            debug!("No path {} -> {}, flooding on {}", src, dst, dpid);
            return PortDecision::Flood;
        };

        match next_hop_port(&graph, &path, dpid) {
            Some(port) => PortDecision::Port(port),
            None => {
                debug!("Switch {} not on path {} -> {}, flooding", dpid, src, dst);
                PortDecision::Flood
            }
        }
    }

    /// Cached host-to-host path, computing it on a miss
    pub fn resolve_path(&self, src: MacAddr, dst: MacAddr) -> Option<Arc<[NodeId]>> {
        let graph = self.graph.read();
        cached_or_computed(&graph, src, dst)
    }
}

fn cached_or_computed(graph: &TopologyGraph, src: MacAddr, dst: MacAddr) -> Option<Arc<[NodeId]>> {
    let key = (src, dst);
    if let Some(path) = graph.path_cache().get(&key) {
        return Some(path);
    }

    let path: Arc<[NodeId]> = graph
        .shortest_path(&NodeId::Host(src), &NodeId::Host(dst))?
        .into();
    graph.path_cache().insert(key, path.clone());
    Some(path)
}

fn next_hop_port(graph: &TopologyGraph, path: &[NodeId], dpid: DatapathId) -> Option<PortNo> {
    let here = NodeId::Switch(dpid);
    let index = path.iter().position(|node| *node == here)?;
    let next = path.get(index + 1)?;
    graph.edge(&here, next)?.port
}
