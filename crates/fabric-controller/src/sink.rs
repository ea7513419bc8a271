//! Outbound boundary towards the protocol stack

use fabric_common::{DatapathId, FlowRule, PacketOut, StatsKind};
use tokio::sync::mpsc;
use tracing::warn;

/// Request for the protocol stack to encode and send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerCommand {
    /// Flow-mod add
    InstallFlow(FlowRule),
    /// Packet-out
    PacketOut(PacketOut),
    /// Multipart statistics request
    StatsRequest {
        /// Target switch
        datapath: DatapathId,
        /// Port or flow statistics
        kind: StatsKind,
    },
}

/// Fire-and-forget sender of controller requests
pub trait ProtocolSink: Send + Sync {
    /// Install a forwarding rule
    fn install_flow(&self, rule: FlowRule);

    /// Emit one frame
    fn send_packet_out(&self, packet: PacketOut);

    /// Ask a switch for statistics; the reply arrives as an event
    fn send_stats_request(&self, datapath: DatapathId, kind: StatsKind);
}

impl ProtocolSink for mpsc::UnboundedSender<ControllerCommand> {
    fn install_flow(&self, rule: FlowRule) {
        if self.send(ControllerCommand::InstallFlow(rule)).is_err() {
            warn!("Protocol stack gone, dropping flow install");
        }
    }

    fn send_packet_out(&self, packet: PacketOut) {
        if self.send(ControllerCommand::PacketOut(packet)).is_err() {
            warn!("Protocol stack gone, dropping packet-out");
        }
    }

    fn send_stats_request(&self, datapath: DatapathId, kind: StatsKind) {
        if self.send(ControllerCommand::StatsRequest { datapath, kind }).is_err() {
            warn!("Protocol stack gone, dropping {:?} stats request for {}", kind, datapath);
        }
    }
}
