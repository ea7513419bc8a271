//! Forwarding decisions, flow rules and packet-out requests

use crate::{ofp, DatapathId, MacAddr, PortNo};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Output port chosen for a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDecision {
    /// Destination unknown or unreachable: flood
    Flood,
    /// Emit on a specific port
    Port(PortNo),
}

impl PortDecision {
    /// Flood decision
    #[inline(always)]
    pub const fn is_flood(&self) -> bool {
        matches!(self, Self::Flood)
    }

    /// OpenFlow port number, `OFPP_FLOOD` for floods
    #[inline(always)]
    pub const fn port_no(&self) -> PortNo {
        match self {
            Self::Flood => ofp::OFPP_FLOOD,
            Self::Port(port) => *port,
        }
    }
}

impl fmt::Display for PortDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flood => write!(f, "FLOOD"),
            Self::Port(port) => write!(f, "{port}"),
        }
    }
}

/// Output action of a flow rule or packet-out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputAction {
    /// Physical port
    Port(PortNo),
    /// All ports except ingress
    Flood,
    /// Punt to the controller
    Controller {
        /// Bytes of the frame to include (`OFPCML_NO_BUFFER` for all)
        max_len: u16,
    },
}

impl OutputAction {
    /// OpenFlow output port number
    pub const fn port_no(&self) -> PortNo {
        match self {
            Self::Port(port) => *port,
            Self::Flood => ofp::OFPP_FLOOD,
            Self::Controller { .. } => ofp::OFPP_CONTROLLER,
        }
    }
}

impl From<PortDecision> for OutputAction {
    fn from(decision: PortDecision) -> Self {
        match decision {
            PortDecision::Flood => Self::Flood,
            PortDecision::Port(port) => Self::Port(port),
        }
    }
}

/// Match fields; `None` is a wildcard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowMatch {
    /// Ingress port
    pub in_port: Option<PortNo>,
    /// Destination MAC
    pub eth_dst: Option<MacAddr>,
}

impl FlowMatch {
    /// Match everything
    pub const fn any() -> Self {
        Self { in_port: None, eth_dst: None }
    }

    /// Exact match on ingress port and destination
    pub const fn exact(in_port: PortNo, eth_dst: MacAddr) -> Self {
        Self { in_port: Some(in_port), eth_dst: Some(eth_dst) }
    }
}

/// Forwarding-table entry to install on a switch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowRule {
    /// Target switch
    pub datapath: DatapathId,
    /// Rule priority
    pub priority: u16,
    /// Match criteria
    pub flow_match: FlowMatch,
    /// Apply-actions output
    pub action: OutputAction,
}

impl FlowRule {
    /// Lowest-priority catch-all that sends unmatched frames to the controller
    pub const fn table_miss(datapath: DatapathId) -> Self {
        Self {
            datapath,
            priority: ofp::TABLE_MISS_PRIORITY,
            flow_match: FlowMatch::any(),
            action: OutputAction::Controller { max_len: ofp::OFPCML_NO_BUFFER },
        }
    }

    /// Rule learned from a forwarding decision
    pub const fn learned(
        datapath: DatapathId,
        priority: u16,
        in_port: PortNo,
        eth_dst: MacAddr,
        out_port: PortNo,
    ) -> Self {
        Self {
            datapath,
            priority,
            flow_match: FlowMatch::exact(in_port, eth_dst),
            action: OutputAction::Port(out_port),
        }
    }
}

/// Frame carried by a packet-out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketPayload {
    /// Frame still buffered on the switch
    Buffered(u32),
    /// Full frame
    Raw(Bytes),
}

impl PacketPayload {
    /// Reference the switch buffer when there is one, else carry the frame
    pub fn from_packet_in(buffer_id: Option<u32>, data: &Bytes) -> Self {
        match buffer_id {
            Some(id) if id != ofp::OFP_NO_BUFFER => Self::Buffered(id),
            _ => Self::Raw(data.clone()),
        }
    }
}

/// Instruction to emit one frame on a switch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketOut {
    /// Target switch
    pub datapath: DatapathId,
    /// Frame or buffer reference
    pub payload: PacketPayload,
    /// Port the frame arrived on
    pub in_port: PortNo,
    /// Output action
    pub action: OutputAction,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_port_numbers() {
        assert_eq!(PortDecision::Flood.port_no(), ofp::OFPP_FLOOD);
        assert_eq!(PortDecision::Port(3).port_no(), 3);
        assert_eq!(OutputAction::from(PortDecision::Port(7)), OutputAction::Port(7));
        assert_eq!(OutputAction::from(PortDecision::Flood), OutputAction::Flood);
    }

    #[test]
    fn test_table_miss_rule() {
        let rule = FlowRule::table_miss(DatapathId(1));
        assert_eq!(rule.priority, ofp::TABLE_MISS_PRIORITY);
        assert_eq!(rule.flow_match, FlowMatch::any());
        assert_eq!(rule.action.port_no(), ofp::OFPP_CONTROLLER);
    }

    #[test]
    fn test_payload_prefers_buffer() {
        let data = Bytes::from_static(b"frame");
        assert_eq!(PacketPayload::from_packet_in(Some(42), &data), PacketPayload::Buffered(42));
        assert_eq!(
            PacketPayload::from_packet_in(Some(ofp::OFP_NO_BUFFER), &data),
            PacketPayload::Raw(data.clone())
        );
        assert_eq!(PacketPayload::from_packet_in(None, &data), PacketPayload::Raw(data));
    }
}
