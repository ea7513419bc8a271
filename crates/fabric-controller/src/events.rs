//! Inbound control-plane events

use bytes::Bytes;
use fabric_common::{DatapathId, FabricError, FabricResult, FlowStatEntry, PortNo, PortStat};

/// Frame punted by a switch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketIn {
    /// Reporting switch
    pub datapath: DatapathId,
    /// Ingress port
    pub in_port: PortNo,
    /// Switch-side buffer holding the frame, if any
    pub buffer_id: Option<u32>,
    /// Raw Ethernet frame
    pub data: Bytes,
}

/// Link seen by discovery, described from both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkEvent {
    /// First switch
    pub src: DatapathId,
    /// Port on `src` facing `dst`
    pub src_port: PortNo,
    /// Second switch
    pub dst: DatapathId,
    /// Port on `dst` facing `src`
    pub dst_port: PortNo,
}

impl LinkEvent {
    /// Reject self-loops
    pub fn validate(&self) -> FabricResult<()> {
        if self.src == self.dst {
            return Err(FabricError::MalformedEvent(format!(
                "link from {} to itself (ports {} and {})",
                self.src, self.src_port, self.dst_port
            )));
        }
        Ok(())
    }
}

/// Event delivered by the protocol stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    /// Switch connected and finished the features handshake
    SwitchUp {
        /// Connected switch
        datapath: DatapathId,
        /// Ports reported in the features reply
        ports: Vec<PortNo>,
    },
    /// Switch connection lost
    SwitchDown {
        /// Disconnected switch
        datapath: DatapathId,
    },
    /// Discovery found a switch-to-switch link
    LinkDiscovered(LinkEvent),
    /// Discovery timed a link out
    LinkRemoved(LinkEvent),
    /// Unmatched frame
    PacketIn(PacketIn),
    /// Reply to a port statistics request
    PortStatsReply {
        /// Replying switch
        datapath: DatapathId,
        /// One record per port
        stats: Vec<PortStat>,
    },
    /// Reply to a flow statistics request
    FlowStatsReply {
        /// Replying switch
        datapath: DatapathId,
        /// Every rule in the table, any priority
        stats: Vec<FlowStatEntry>,
    },
}

impl ControllerEvent {
    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SwitchUp { .. } => "switch-up",
            Self::SwitchDown { .. } => "switch-down",
            Self::LinkDiscovered(_) => "link-discovered",
            Self::LinkRemoved(_) => "link-removed",
            Self::PacketIn(_) => "packet-in",
            Self::PortStatsReply { .. } => "port-stats-reply",
            Self::FlowStatsReply { .. } => "flow-stats-reply",
        }
    }
}
