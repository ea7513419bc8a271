//! OpenFlow 1.3 constants used by the controller

use crate::PortNo;

/// Flood out every port except the ingress port
pub const OFPP_FLOOD: PortNo = 0xffff_fffb;

/// Send to the controller
pub const OFPP_CONTROLLER: PortNo = 0xffff_fffd;

/// Controller action: send the whole frame, do not buffer
pub const OFPCML_NO_BUFFER: u16 = 0xffff;

/// Packet-in carried no switch buffer
pub const OFP_NO_BUFFER: u32 = 0xffff_ffff;

/// Priority of the catch-all send-to-controller rule
pub const TABLE_MISS_PRIORITY: u16 = 0;

/// Priority of rules learned from packet-in decisions
pub const LEARNED_FLOW_PRIORITY: u16 = 1;

/// Link-layer discovery protocol ethertype
pub const ETH_TYPE_LLDP: u16 = 0x88cc;

/// 802.1Q VLAN tag ethertype
pub const ETH_TYPE_VLAN: u16 = 0x8100;
