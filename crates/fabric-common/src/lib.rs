//! Fabric Common - Shared types for the fabric controller
//!
//! This crate holds everything the topology and controller crates agree on:
//! - Datapath, port and MAC identifiers
//! - Flow rules, packet-out requests and forwarding decisions
//! - Port and flow statistics records
//! - Ethernet header extraction for packet-in frames
//! - Error handling

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod ethernet;
pub mod flow;
pub mod ofp;
pub mod stats;

pub use error::*;
pub use ethernet::EthernetHeader;
pub use flow::*;
pub use stats::*;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Switch port number
pub type PortNo = u32;

/// Datapath (switch) identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct DatapathId(pub u64);

impl DatapathId {
    /// Raw 64-bit value
    #[inline(always)]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for DatapathId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for DatapathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// 48-bit Ethernet hardware address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct MacAddr([u8; 6]);

impl MacAddr {
    /// ff:ff:ff:ff:ff:ff
    pub const BROADCAST: Self = Self([0xff; 6]);

    /// Create from raw octets
    #[inline(always)]
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Raw octets
    #[inline(always)]
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl From<[u8; 6]> for MacAddr {
    fn from(octets: [u8; 6]) -> Self {
        Self(octets)
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

impl FromStr for MacAddr {
    type Err = FabricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; 6];
        let mut parts = s.split(|c| c == ':' || c == '-');

        for octet in octets.iter_mut() {
            let part = parts
                .next()
                .ok_or_else(|| FabricError::MalformedEvent(format!("short MAC address: {s}")))?;
            if part.len() != 2 {
                return Err(FabricError::MalformedEvent(format!("bad MAC octet in {s}")));
            }
            *octet = u8::from_str_radix(part, 16)
                .map_err(|_| FabricError::MalformedEvent(format!("bad MAC octet in {s}")))?;
        }

        if parts.next().is_some() {
            return Err(FabricError::MalformedEvent(format!("long MAC address: {s}")));
        }

        Ok(Self(octets))
    }
}

impl Serialize for MacAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mac_display_and_parse() {
        let mac = MacAddr::new([0x00, 0x1b, 0x21, 0xaa, 0x0f, 0xff]);
        assert_eq!(mac.to_string(), "00:1b:21:aa:0f:ff");
        assert_eq!("00:1b:21:aa:0f:ff".parse::<MacAddr>().unwrap(), mac);
        assert_eq!("00-1B-21-AA-0F-FF".parse::<MacAddr>().unwrap(), mac);
    }

    #[test]
    fn test_mac_parse_rejects_garbage() {
        assert!("00:1b:21".parse::<MacAddr>().is_err());
        assert!("00:1b:21:aa:0f:ff:01".parse::<MacAddr>().is_err());
        assert!("zz:1b:21:aa:0f:ff".parse::<MacAddr>().is_err());
    }

    #[test]
    fn test_datapath_display() {
        assert_eq!(DatapathId(0x1f).to_string(), "000000000000001f");
    }
}
