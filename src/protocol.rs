//! EtherType and IP-protocol constants used by [`crate::header::classify`].
//!
//! Grounded on the teacher's `ProtocolTypes` enum (`repr(u8)`, `Nom` derive,
//! hand-written `From<u8>`): this is the same "small closed wire enum with a
//! fallback variant" shape, scaled down to the two fields `classify` needs.

use nom_derive::Nom;
use serde::Serialize;

/// The handful of EtherType values the codec distinguishes.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Nom)]
pub enum EtherType {
    Ipv4 = 0x0800,
    Unsupported,
}

impl From<u16> for EtherType {
    fn from(value: u16) -> Self {
        match value {
            0x0800 => EtherType::Ipv4,
            _ => EtherType::Unsupported,
        }
    }
}

/// IP protocol numbers relevant to TRDP classification.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Nom)]
pub enum IpProtocol {
    Udp = 17,
    Unsupported,
}

impl From<u8> for IpProtocol {
    fn from(value: u8) -> Self {
        match value {
            17 => IpProtocol::Udp,
            _ => IpProtocol::Unsupported,
        }
    }
}
