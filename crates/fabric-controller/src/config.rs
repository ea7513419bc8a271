//! Controller Configuration

use fabric_common::{ofp, DatapathId, FabricError, FabricResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Forwarding strategy
    pub forwarding_mode: ForwardingMode,
    /// Seconds between statistics rounds
    pub stats_interval_secs: u64,
    /// Run the statistics poller
    pub stats_enabled: bool,
    /// Host-pair path cache bound
    pub path_cache_capacity: u64,
    /// Weight of a discovered link without an override
    pub default_link_weight: u64,
    /// Per-direction weight overrides
    pub link_weights: Vec<LinkWeight>,
    /// Priority of learned rules
    pub learned_flow_priority: u16,
    /// Install the send-to-controller rule on connect
    pub install_table_miss: bool,
    /// Inbound event channel bound
    pub event_queue_depth: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            forwarding_mode: ForwardingMode::ShortestPath,
            stats_interval_secs: 10,
            stats_enabled: true,
            path_cache_capacity: fabric_path::DEFAULT_CACHE_CAPACITY,
            default_link_weight: 1,
            link_weights: Vec::new(),
            learned_flow_priority: ofp::LEARNED_FLOW_PRIORITY,
            install_table_miss: true,
            event_queue_depth: 1024,
        }
    }
}

impl ControllerConfig {
    /// Load from file
    pub fn load(path: &str) -> FabricResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| FabricError::Config(format!("{path}: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the controller cannot run with
    pub fn validate(&self) -> FabricResult<()> {
        if self.stats_interval_secs == 0 {
            return Err(FabricError::Config("stats_interval_secs must be positive".into()));
        }
        if self.path_cache_capacity == 0 {
            return Err(FabricError::Config("path_cache_capacity must be positive".into()));
        }
        if self.learned_flow_priority == ofp::TABLE_MISS_PRIORITY {
            return Err(FabricError::Config(
                "learned_flow_priority collides with the table-miss rule".into(),
            ));
        }
        if self.event_queue_depth == 0 {
            return Err(FabricError::Config("event_queue_depth must be positive".into()));
        }
        Ok(())
    }

    /// Statistics cadence
    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs)
    }

    /// Weight for the `src -> dst` direction
    pub fn link_weight(&self, src: DatapathId, dst: DatapathId) -> u64 {
        self.link_weights
            .iter()
            .find(|w| w.src == src && w.dst == dst)
            .map(|w| w.weight)
            .unwrap_or(self.default_link_weight)
    }
}

/// Forwarding strategy selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForwardingMode {
    /// Per-switch MAC learning, no topology
    Learning,
    /// Dijkstra over the discovered topology
    ShortestPath,
}

/// Weight override for one link direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkWeight {
    /// Sending switch
    pub src: DatapathId,
    /// Receiving switch
    pub dst: DatapathId,
    /// Dijkstra weight for this direction
    pub weight: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ControllerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.stats_interval(), Duration::from_secs(10));
        assert_eq!(config.forwarding_mode, ForwardingMode::ShortestPath);
    }

    #[test]
    fn test_parse_partial_json() {
        let json = r#"{
            "forwarding_mode": "learning",
            "stats_interval_secs": 5,
            "link_weights": [
                { "src": 1, "dst": 2, "weight": 100 },
                { "src": 2, "dst": 1, "weight": 100 }
            ]
        }"#;

        let config: ControllerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.forwarding_mode, ForwardingMode::Learning);
        assert_eq!(config.stats_interval_secs, 5);
        assert_eq!(config.path_cache_capacity, fabric_path::DEFAULT_CACHE_CAPACITY);
        assert_eq!(config.link_weight(DatapathId(1), DatapathId(2)), 100);
        assert_eq!(config.link_weight(DatapathId(1), DatapathId(3)), 1);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = ControllerConfig { stats_interval_secs: 0, ..Default::default() };
        assert!(matches!(config.validate(), Err(FabricError::Config(_))));

        let config = ControllerConfig { learned_flow_priority: 0, ..Default::default() };
        assert!(config.validate().is_err());

        let config = ControllerConfig { path_cache_capacity: 0, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = ControllerConfig::load("/nonexistent/fabric.json").unwrap_err();
        assert!(matches!(err, FabricError::Io(_)));
    }
}
