//! Directed topology graph of switches, hosts and links

use crate::{cache::PathCache, Edge, NodeId, HOST_EDGE_WEIGHT};
use fabric_common::{DatapathId, MacAddr, PortNo};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap, HashMap};
use tracing::{debug, info};

/// Directed switch-to-switch link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Sending switch
    pub src: DatapathId,
    /// Receiving switch
    pub dst: DatapathId,
    /// Egress port on `src`
    pub out_port: PortNo,
    /// Path cost
    pub weight: u64,
}

/// Where a host was first seen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostAttachment {
    /// Host address
    pub mac: MacAddr,
    /// Access switch
    pub datapath: DatapathId,
    /// Access port
    pub port: PortNo,
}

/// Serializable view of the graph for debug export
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologySnapshot {
    /// Graph generation the snapshot was taken at
    pub generation: u64,
    /// Switch nodes
    pub switches: Vec<DatapathId>,
    /// Directed links
    pub links: Vec<Link>,
    /// Learned hosts
    pub hosts: Vec<HostAttachment>,
}

/// Topology graph
///
/// Owns the path cache so that every edge or weight mutation flushes it in
/// the same critical section.
pub struct TopologyGraph {
    /// Out-edges per node, in insertion order
    adjacency: BTreeMap<NodeId, Vec<Edge>>,
    /// Host-pair paths valid for the current generation
    cache: PathCache,
    /// Bumped on every mutation
    generation: u64,
}

impl TopologyGraph {
    /// Create empty graph with a bounded path cache
    pub fn new(cache_capacity: u64) -> Self {
        Self {
            adjacency: BTreeMap::new(),
            cache: PathCache::new(cache_capacity),
            generation: 0,
        }
    }

    /// Add a switch node; `false` if already present
    pub fn add_switch_node(&mut self, dpid: DatapathId) -> bool {
        let node = NodeId::Switch(dpid);
        if self.adjacency.contains_key(&node) {
            return false;
        }
        self.adjacency.insert(node, Vec::new());
        self.invalidate();
        true
    }

    /// Remove a switch with every incident edge
    ///
    /// Hosts attached only to this switch go with it so they are re-learned
    /// wherever they show up next.
    pub fn remove_switch_node(&mut self, dpid: DatapathId) -> bool {
        let node = NodeId::Switch(dpid);
        let Some(edges) = self.adjacency.remove(&node) else {
            return false;
        };

        let orphans: Vec<NodeId> = edges
            .iter()
            .filter(|e| matches!(e.to, NodeId::Host(_)))
            .filter(|e| {
                self.adjacency
                    .get(&e.to)
                    .map(|out| out.iter().all(|h| h.to == node))
                    .unwrap_or(false)
            })
            .map(|e| e.to)
            .collect();

        for host in &orphans {
            self.adjacency.remove(host);
        }
        for out in self.adjacency.values_mut() {
            out.retain(|e| e.to != node);
        }

        info!(
            "Removed switch {} ({} links, {} hosts)",
            dpid,
            edges.len() - orphans.len(),
            orphans.len()
        );
        self.invalidate();
        true
    }

    /// Add or update one direction of a switch-to-switch link
    ///
    /// Callers add both directions of a discovered link. Returns `false` when
    /// either endpoint is not a known switch.
    pub fn add_link(&mut self, src: DatapathId, dst: DatapathId, out_port: PortNo, weight: u64) -> bool {
        let to = NodeId::Switch(dst);
        if !self.adjacency.contains_key(&to) {
            return false;
        }
        let Some(out) = self.adjacency.get_mut(&NodeId::Switch(src)) else {
            return false;
        };

        match out.iter_mut().find(|e| e.to == to) {
            Some(edge) if edge.port == Some(out_port) && edge.weight == weight => return true,
            Some(edge) => {
                edge.port = Some(out_port);
                edge.weight = weight;
            }
            None => out.push(Edge { to, port: Some(out_port), weight }),
        }

        debug!("Link {} -> {} via port {} (weight {})", src, dst, out_port, weight);
        self.invalidate();
        true
    }

    /// Remove one direction of a switch-to-switch link
    pub fn remove_link(&mut self, src: DatapathId, dst: DatapathId) -> bool {
        let to = NodeId::Switch(dst);
        let Some(out) = self.adjacency.get_mut(&NodeId::Switch(src)) else {
            return false;
        };
        let before = out.len();
        out.retain(|e| e.to != to);
        if out.len() == before {
            return false;
        }
        self.invalidate();
        true
    }

    /// Change the weight of an existing directed edge
    pub fn set_link_weight(&mut self, src: NodeId, dst: NodeId, weight: u64) -> bool {
        let Some(edge) = self
            .adjacency
            .get_mut(&src)
            .and_then(|out| out.iter_mut().find(|e| e.to == dst))
        else {
            return false;
        };
        if edge.weight == weight {
            return true;
        }
        edge.weight = weight;
        self.invalidate();
        true
    }

    /// Attach a newly seen host to `dpid` at `port` with weight 0
    pub fn add_host_edge(&mut self, mac: MacAddr, dpid: DatapathId, port: PortNo) -> bool {
        self.add_host_edge_weighted(mac, dpid, port, HOST_EDGE_WEIGHT)
    }

    /// Attach a host with an explicit edge weight
    ///
    /// A host already in the graph keeps its first attachment.
    pub fn add_host_edge_weighted(&mut self, mac: MacAddr, dpid: DatapathId, port: PortNo, weight: u64) -> bool {
        let host = NodeId::Host(mac);
        let switch = NodeId::Switch(dpid);
        if self.adjacency.contains_key(&host) {
            return false;
        }
        let Some(out) = self.adjacency.get_mut(&switch) else {
            return false;
        };

        out.push(Edge { to: host, port: Some(port), weight });
        self.adjacency.insert(host, vec![Edge { to: switch, port: None, weight }]);

        info!("Learned host {} on switch {} port {}", mac, dpid, port);
        self.invalidate();
        true
    }

    /// Node membership
    #[inline]
    pub fn contains(&self, node: &NodeId) -> bool {
        self.adjacency.contains_key(node)
    }

    /// Directed edge between two nodes
    pub fn edge(&self, src: &NodeId, dst: &NodeId) -> Option<&Edge> {
        self.adjacency.get(src)?.iter().find(|e| e.to == *dst)
    }

    /// Out-edges of a node
    pub fn neighbors(&self, node: &NodeId) -> &[Edge] {
        self.adjacency.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Path cache bound to this graph
    #[inline]
    pub fn path_cache(&self) -> &PathCache {
        &self.cache
    }

    /// Mutation counter
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of directed edges
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(Vec::len).sum()
    }

    /// Switch nodes in id order
    pub fn switches(&self) -> Vec<DatapathId> {
        self.adjacency.keys().filter_map(NodeId::as_switch).collect()
    }

    /// Directed switch-to-switch links
    pub fn links(&self) -> Vec<Link> {
        self.adjacency
            .iter()
            .filter_map(|(node, out)| node.as_switch().map(|src| (src, out)))
            .flat_map(|(src, out)| {
                out.iter().filter_map(move |e| {
                    let dst = e.to.as_switch()?;
                    Some(Link { src, dst, out_port: e.port?, weight: e.weight })
                })
            })
            .collect()
    }

    /// Learned hosts and their attachment points
    pub fn hosts(&self) -> Vec<HostAttachment> {
        self.adjacency
            .iter()
            .filter_map(|(node, out)| match node {
                NodeId::Host(mac) => out.first().map(|e| (*mac, e.to)),
                NodeId::Switch(_) => None,
            })
            .filter_map(|(mac, switch)| {
                let datapath = switch.as_switch()?;
                let port = self.edge(&switch, &NodeId::Host(mac))?.port?;
                Some(HostAttachment { mac, datapath, port })
            })
            .collect()
    }

    /// Serializable view
    pub fn snapshot(&self) -> TopologySnapshot {
        TopologySnapshot {
            generation: self.generation,
            switches: self.switches(),
            links: self.links(),
            hosts: self.hosts(),
        }
    }

    /// Weighted shortest path using Dijkstra
    ///
    /// Equal-cost ties resolve to the lower node id first and then to edge
    /// insertion order, so repeated runs on the same graph agree.
    pub fn shortest_path(&self, from: &NodeId, to: &NodeId) -> Option<Vec<NodeId>> {
        if !self.contains(from) || !self.contains(to) {
            return None;
        }

        let mut distances: HashMap<NodeId, u64> = HashMap::new();
        let mut previous: HashMap<NodeId, NodeId> = HashMap::new();
        let mut heap = BinaryHeap::new();

        distances.insert(*from, 0);
        heap.push(DijkstraState { cost: 0, node: *from });

        while let Some(DijkstraState { cost, node }) = heap.pop() {
            if node == *to {
                let mut path = vec![*to];
                let mut current = *to;
                while let Some(prev) = previous.get(&current) {
                    path.push(*prev);
                    current = *prev;
                }
                path.reverse();
                return Some(path);
            }

            if cost > *distances.get(&node).unwrap_or(&u64::MAX) {
                continue;
            }

            for edge in self.neighbors(&node) {
                let new_cost = cost.saturating_add(edge.weight);
                if new_cost < *distances.get(&edge.to).unwrap_or(&u64::MAX) {
                    distances.insert(edge.to, new_cost);
                    previous.insert(edge.to, node);
                    heap.push(DijkstraState { cost: new_cost, node: edge.to });
                }
            }
        }

        None
    }

    /// Total weight along a path, `None` if an edge is missing
    pub fn path_cost(&self, path: &[NodeId]) -> Option<u64> {
        path.windows(2)
            .map(|hop| self.edge(&hop[0], &hop[1]).map(|e| e.weight))
            .sum()
    }

    fn invalidate(&mut self) {
        self.generation += 1;
        self.cache.invalidate_all();
        debug!("Topology generation {}, path cache flushed", self.generation);
    }
}

impl Default for TopologyGraph {
    fn default() -> Self {
        Self::new(crate::DEFAULT_CACHE_CAPACITY)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DijkstraState {
    cost: u64,
    node: NodeId,
}

impl Ord for DijkstraState {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse for min-heap
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for DijkstraState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn s(id: u64) -> NodeId {
        NodeId::Switch(DatapathId(id))
    }

    fn mac(last: u8) -> MacAddr {
        MacAddr::new([2, 0, 0, 0, 0, last])
    }

    fn link(graph: &mut TopologyGraph, a: u64, a_port: PortNo, b: u64, b_port: PortNo, weight: u64) {
        assert!(graph.add_link(DatapathId(a), DatapathId(b), a_port, weight));
        assert!(graph.add_link(DatapathId(b), DatapathId(a), b_port, weight));
    }

    fn triangle() -> TopologyGraph {
        let mut graph = TopologyGraph::default();
        for id in 1..=3 {
            graph.add_switch_node(DatapathId(id));
        }
        link(&mut graph, 1, 1, 2, 1, 1);
        link(&mut graph, 2, 2, 3, 1, 1);
        link(&mut graph, 1, 2, 3, 2, 100);
        graph
    }

    #[test]
    fn test_weighted_detour_beats_expensive_direct_link() {
        let graph = triangle();
        assert_eq!(graph.shortest_path(&s(1), &s(3)), Some(vec![s(1), s(2), s(3)]));
        assert_eq!(graph.path_cost(&[s(1), s(2), s(3)]), Some(2));
    }

    #[test]
    fn test_bidirectional_link_edges() {
        let graph = triangle();
        assert_eq!(graph.edge(&s(1), &s(2)).and_then(|e| e.port), Some(1));
        assert_eq!(graph.edge(&s(2), &s(1)).and_then(|e| e.port), Some(1));
        assert_eq!(graph.links().len(), 6);
    }

    #[test]
    fn test_add_switch_is_idempotent() {
        let mut graph = TopologyGraph::default();
        assert!(graph.add_switch_node(DatapathId(1)));
        assert!(!graph.add_switch_node(DatapathId(1)));
        assert_eq!(graph.switches(), vec![DatapathId(1)]);
    }

    #[test]
    fn test_link_to_unknown_switch_is_ignored() {
        let mut graph = TopologyGraph::default();
        graph.add_switch_node(DatapathId(1));
        assert!(!graph.add_link(DatapathId(1), DatapathId(9), 1, 1));
        assert!(!graph.add_link(DatapathId(9), DatapathId(1), 1, 1));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_remove_switch_cascades() {
        let mut graph = triangle();
        graph.add_host_edge(mac(1), DatapathId(2), 5);
        graph.add_host_edge(mac(3), DatapathId(3), 5);

        assert!(graph.remove_switch_node(DatapathId(2)));
        assert!(!graph.contains(&s(2)));
        assert!(!graph.contains(&NodeId::Host(mac(1))));
        assert!(graph.contains(&NodeId::Host(mac(3))));
        assert!(graph.edge(&s(1), &s(2)).is_none());
        assert!(graph.edge(&s(3), &s(2)).is_none());
        assert_eq!(graph.shortest_path(&s(1), &s(3)), Some(vec![s(1), s(3)]));
        assert!(!graph.remove_switch_node(DatapathId(2)));
    }

    #[test]
    fn test_host_edge_pair() {
        let mut graph = triangle();
        assert!(graph.add_host_edge(mac(7), DatapathId(1), 4));
        assert!(!graph.add_host_edge(mac(7), DatapathId(3), 9));

        let host = NodeId::Host(mac(7));
        let down = graph.edge(&s(1), &host).unwrap();
        assert_eq!((down.port, down.weight), (Some(4), 0));
        let up = graph.edge(&host, &s(1)).unwrap();
        assert_eq!((up.port, up.weight), (None, 0));

        assert_eq!(
            graph.hosts(),
            vec![HostAttachment { mac: mac(7), datapath: DatapathId(1), port: 4 }]
        );
    }

    #[test]
    fn test_host_on_unknown_switch_is_ignored() {
        let mut graph = TopologyGraph::default();
        assert!(!graph.add_host_edge(mac(1), DatapathId(1), 1));
        assert!(!graph.contains(&NodeId::Host(mac(1))));
    }

    #[test]
    fn test_mutations_bump_generation() {
        let mut graph = triangle();
        let start = graph.generation();

        assert!(graph.set_link_weight(s(1), s(3), 1));
        assert_eq!(graph.generation(), start + 1);
        assert_eq!(graph.shortest_path(&s(1), &s(3)), Some(vec![s(1), s(3)]));

        // No-op updates leave the cache alone
        assert!(graph.set_link_weight(s(1), s(3), 1));
        assert!(graph.add_link(DatapathId(1), DatapathId(2), 1, 1));
        assert_eq!(graph.generation(), start + 1);

        assert!(graph.remove_link(DatapathId(1), DatapathId(3)));
        assert_eq!(graph.generation(), start + 2);
        assert!(!graph.remove_link(DatapathId(1), DatapathId(3)));
    }

    #[test]
    fn test_unreachable_and_missing_nodes() {
        let mut graph = TopologyGraph::default();
        graph.add_switch_node(DatapathId(1));
        graph.add_switch_node(DatapathId(2));
        assert_eq!(graph.shortest_path(&s(1), &s(2)), None);
        assert_eq!(graph.shortest_path(&s(1), &s(9)), None);
        assert_eq!(graph.shortest_path(&s(1), &s(1)), Some(vec![s(1)]));
    }

    #[test]
    fn test_equal_cost_tie_is_stable() {
        // 1 -> 2 -> 4 and 1 -> 3 -> 4 both cost 2
        let mut graph = TopologyGraph::default();
        for id in 1..=4 {
            graph.add_switch_node(DatapathId(id));
        }
        link(&mut graph, 1, 1, 3, 1, 1);
        link(&mut graph, 1, 2, 2, 1, 1);
        link(&mut graph, 2, 2, 4, 1, 1);
        link(&mut graph, 3, 2, 4, 2, 1);

        let first = graph.shortest_path(&s(1), &s(4));
        for _ in 0..10 {
            assert_eq!(graph.shortest_path(&s(1), &s(4)), first);
        }
        assert_eq!(first, Some(vec![s(1), s(2), s(4)]));
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut graph = triangle();
        graph.add_host_edge(mac(1), DatapathId(1), 9);
        let snapshot = graph.snapshot();
        assert_eq!(snapshot.switches.len(), 3);
        assert_eq!(snapshot.hosts.len(), 1);
        assert_eq!(snapshot.generation, graph.generation());
    }

    proptest! {
        #[test]
        fn prop_discovered_links_are_symmetric(
            links in prop::collection::vec((1u64..8, 1u32..48, 1u64..8, 1u32..48, 0u64..50), 1..30)
        ) {
            let mut graph = TopologyGraph::default();
            for id in 1..8 {
                graph.add_switch_node(DatapathId(id));
            }
            let mut expected = HashMap::new();
            for (a, a_port, b, b_port, weight) in links {
                if a == b {
                    continue;
                }
                graph.add_link(DatapathId(a), DatapathId(b), a_port, weight);
                graph.add_link(DatapathId(b), DatapathId(a), b_port, weight);
                expected.insert((a, b), a_port);
                expected.insert((b, a), b_port);
            }
            for ((a, b), port) in expected {
                prop_assert_eq!(graph.edge(&s(a), &s(b)).and_then(|e| e.port), Some(port));
                prop_assert!(graph.edge(&s(b), &s(a)).is_some());
            }
        }

        #[test]
        fn prop_shortest_path_never_beats_by_direct_edge(
            links in prop::collection::vec((1u64..6, 1u64..6, 0u64..20), 1..20)
        ) {
            let mut graph = TopologyGraph::default();
            for id in 1..6 {
                graph.add_switch_node(DatapathId(id));
            }
            for (i, (a, b, weight)) in links.iter().enumerate() {
                graph.add_link(DatapathId(*a), DatapathId(*b), i as u32 + 1, *weight);
            }
            for link in graph.links() {
                let path = graph.shortest_path(&s(link.src.as_u64()), &s(link.dst.as_u64()));
                prop_assert!(path.is_some());
                let cost = graph.path_cost(&path.unwrap()).unwrap();
                prop_assert!(cost <= link.weight);
            }
        }
    }
}
