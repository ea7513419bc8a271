//! Switch lifecycle tracking

use fabric_common::{DatapathId, PortNo};
use fabric_path::TopologyGraph;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchState {
    /// Connected and registered
    Active,
    /// Disconnected, entry about to be dropped
    Dead,
}

/// Connected switch
#[derive(Debug, Clone)]
pub struct Switch {
    /// Datapath id
    pub datapath: DatapathId,
    /// Ports from the latest features reply
    pub ports: BTreeSet<PortNo>,
    /// Connection state
    pub state: SwitchState,
    /// First registration time
    pub connected_at: Instant,
}

/// Registry of connected switches
///
/// Membership changes are mirrored into the topology graph while the
/// registry lock is held; the lock order is always registry, then graph.
pub struct SwitchRegistry {
    switches: RwLock<BTreeMap<DatapathId, Switch>>,
    graph: Arc<RwLock<TopologyGraph>>,
}

impl SwitchRegistry {
    /// Create registry mirroring into `graph`
    pub fn new(graph: Arc<RwLock<TopologyGraph>>) -> Self {
        Self {
            switches: RwLock::new(BTreeMap::new()),
            graph,
        }
    }

    /// Register a switch; `true` only on first registration
    pub fn on_switch_up(&self, datapath: DatapathId, ports: impl IntoIterator<Item = PortNo>) -> bool {
        let mut switches = self.switches.write();
        let ports: BTreeSet<PortNo> = ports.into_iter().collect();

        if let Some(existing) = switches.get_mut(&datapath) {
            debug!("Switch {} already registered, refreshing ports", datapath);
            existing.ports = ports;
            return false;
        }

        info!("Register datapath {} ({} ports)", datapath, ports.len());
        switches.insert(
            datapath,
            Switch {
                datapath,
                ports,
                state: SwitchState::Active,
                connected_at: Instant::now(),
            },
        );
        self.graph.write().add_switch_node(datapath);
        true
    }

    /// Unregister a switch and drop it from the graph
    ///
    /// Returns the removed entry marked dead; unknown ids are a no-op.
    pub fn on_switch_down(&self, datapath: DatapathId) -> Option<Switch> {
        let mut switches = self.switches.write();
        let Some(mut switch) = switches.remove(&datapath) else {
            debug!("Switch {} not registered, ignoring disconnect", datapath);
            return None;
        };

        self.graph.write().remove_switch_node(datapath);
        switch.state = SwitchState::Dead;
        info!("Unregister datapath {}", datapath);
        Some(switch)
    }

    /// Whether `datapath` is registered
    pub fn is_registered(&self, datapath: DatapathId) -> bool {
        self.switches.read().contains_key(&datapath)
    }

    /// Ids of all active switches
    pub fn list_active(&self) -> BTreeSet<DatapathId> {
        self.switches
            .read()
            .values()
            .filter(|s| s.state == SwitchState::Active)
            .map(|s| s.datapath)
            .collect()
    }

    /// Copy of one switch entry
    pub fn get(&self, datapath: DatapathId) -> Option<Switch> {
        self.switches.read().get(&datapath).cloned()
    }

    /// Number of registered switches
    pub fn len(&self) -> usize {
        self.switches.read().len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.switches.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabric_path::NodeId;

    fn registry() -> SwitchRegistry {
        SwitchRegistry::new(Arc::new(RwLock::new(TopologyGraph::default())))
    }

    #[test]
    fn test_switch_up_is_idempotent() {
        let registry = registry();
        assert!(registry.on_switch_up(DatapathId(1), [1, 2]));
        assert!(!registry.on_switch_up(DatapathId(1), [1, 2, 3]));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.list_active(), BTreeSet::from([DatapathId(1)]));
        assert_eq!(registry.get(DatapathId(1)).unwrap().ports.len(), 3);
        assert!(registry.graph.read().contains(&NodeId::Switch(DatapathId(1))));
    }

    #[test]
    fn test_switch_down_removes_graph_node() {
        let registry = registry();
        registry.on_switch_up(DatapathId(1), [1]);
        registry.on_switch_up(DatapathId(2), [1]);
        registry.graph.write().add_link(DatapathId(1), DatapathId(2), 1, 1);

        let removed = registry.on_switch_down(DatapathId(2)).unwrap();
        assert_eq!(removed.state, SwitchState::Dead);
        assert!(!registry.is_registered(DatapathId(2)));
        assert!(!registry.graph.read().contains(&NodeId::Switch(DatapathId(2))));
        assert_eq!(registry.graph.read().edge_count(), 0);
    }

    #[test]
    fn test_unknown_switch_down_is_noop() {
        let registry = registry();
        registry.on_switch_up(DatapathId(1), Vec::new());
        assert!(registry.on_switch_down(DatapathId(7)).is_none());
        assert!(registry.on_switch_down(DatapathId(1)).is_some());
        assert!(registry.on_switch_down(DatapathId(1)).is_none());
        assert!(registry.is_empty());
    }
}
