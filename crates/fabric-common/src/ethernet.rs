//! Ethernet header extraction
//!
//! The protocol stack hands the controller raw frames; forwarding only needs
//! the two addresses and the ethertype, so nothing past the L2 header is read.

use crate::{ofp, FabricError, FabricResult, MacAddr};

const HEADER_LEN: usize = 14;
const VLAN_TAG_LEN: usize = 4;

/// Addresses and ethertype of an Ethernet frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetHeader {
    /// Destination address
    pub dst: MacAddr,
    /// Source address
    pub src: MacAddr,
    /// Ethertype of the payload (inner type for 802.1Q frames)
    pub ether_type: u16,
}

impl EthernetHeader {
    /// Parse the header at the start of `frame`
    pub fn parse(frame: &[u8]) -> FabricResult<Self> {
        if frame.len() < HEADER_LEN {
            return Err(FabricError::MalformedFrame(format!(
                "{} bytes, need at least {}",
                frame.len(),
                HEADER_LEN
            )));
        }

        let dst = mac_at(frame, 0);
        let src = mac_at(frame, 6);
        let mut ether_type = u16::from_be_bytes([frame[12], frame[13]]);

        if ether_type == ofp::ETH_TYPE_VLAN {
            let inner = HEADER_LEN + VLAN_TAG_LEN;
            if frame.len() < inner {
                return Err(FabricError::MalformedFrame("truncated 802.1Q tag".into()));
            }
            ether_type = u16::from_be_bytes([frame[inner - 2], frame[inner - 1]]);
        }

        Ok(Self { dst, src, ether_type })
    }

    /// Link-layer discovery frame
    #[inline(always)]
    pub fn is_lldp(&self) -> bool {
        self.ether_type == ofp::ETH_TYPE_LLDP
    }
}

fn mac_at(frame: &[u8], offset: usize) -> MacAddr {
    let mut octets = [0u8; 6];
    octets.copy_from_slice(&frame[offset..offset + 6]);
    MacAddr::new(octets)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(dst: [u8; 6], src: [u8; 6], ether_type: u16) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&dst);
        buf.extend_from_slice(&src);
        buf.extend_from_slice(&ether_type.to_be_bytes());
        buf.extend_from_slice(&[0u8; 46]);
        buf
    }

    #[test]
    fn test_parse_plain_frame() {
        let raw = frame([0xff; 6], [2, 0, 0, 0, 0, 1], 0x0800);
        let header = EthernetHeader::parse(&raw).unwrap();
        assert_eq!(header.dst, MacAddr::BROADCAST);
        assert_eq!(header.src, MacAddr::new([2, 0, 0, 0, 0, 1]));
        assert_eq!(header.ether_type, 0x0800);
        assert!(!header.is_lldp());
    }

    #[test]
    fn test_parse_vlan_tagged_frame() {
        let mut raw = frame([2, 0, 0, 0, 0, 2], [2, 0, 0, 0, 0, 1], ofp::ETH_TYPE_VLAN);
        raw[14..16].copy_from_slice(&100u16.to_be_bytes());
        raw[16..18].copy_from_slice(&ofp::ETH_TYPE_LLDP.to_be_bytes());
        let header = EthernetHeader::parse(&raw).unwrap();
        assert!(header.is_lldp());
    }

    #[test]
    fn test_short_frame_is_malformed() {
        let err = EthernetHeader::parse(&[0u8; 10]).unwrap_err();
        assert!(matches!(err, FabricError::MalformedFrame(_)));

        let mut raw = frame([0xff; 6], [2, 0, 0, 0, 0, 1], ofp::ETH_TYPE_VLAN);
        raw.truncate(16);
        assert!(EthernetHeader::parse(&raw).is_err());
    }
}
