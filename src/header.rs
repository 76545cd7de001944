//! TT header codec (spec.md §4.1, §6).
//!
//! Grounded on the teacher's `netflow_header.rs`: a tiny `nom_derive::Nom`
//! struct used purely to pull a fixed-width integer off the front of a
//! byte slice, plus an enum that classifies what was found. Here the fixed
//! header is 4 bytes (`flow_id`, `len`) instead of netflow's 2-byte
//! version field, and classification distinguishes TRDP-over-UDP from
//! native TT framing instead of netflow versions.

use nom::IResult;
use nom::number::complete::be_u16;
use nom_derive::{Nom, Parse};
use serde::Serialize;

use crate::error::TtError;
use crate::protocol::{EtherType, IpProtocol};

/// Offsets within an Ethernet II frame, assuming no 802.1Q tag.
const ETH_DST_LEN: usize = 6;
const ETH_SRC_LEN: usize = 6;
const ETH_TYPE_LEN: usize = 2;
const ETH_HEADER_LEN: usize = ETH_DST_LEN + ETH_SRC_LEN + ETH_TYPE_LEN;

/// IPv4 header's protocol field offset (from the start of the IP header)
/// and minimum header length for a header with no options.
const IPV4_PROTOCOL_OFFSET: usize = 9;
const IPV4_MIN_HEADER_LEN: usize = 20;
const UDP_HEADER_LEN: usize = 8;

/// The fixed-size TT header carried immediately after the MAC header.
#[derive(Nom, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TtHeader {
    /// Flow identifier, unique within the port's send table.
    #[nom(Parse = "be_u16")]
    pub flow_id: u16,
    /// Total frame length excluding FCS, as carried on the wire.
    #[nom(Parse = "be_u16")]
    pub len: u16,
}

impl TtHeader {
    pub fn parse(input: &[u8]) -> IResult<&[u8], TtHeader> {
        TtHeader::parse_be(input)
    }

    pub fn to_bytes(self) -> [u8; crate::config::TT_HLEN] {
        let mut bytes = [0u8; crate::config::TT_HLEN];
        bytes[0..2].copy_from_slice(&self.flow_id.to_be_bytes());
        bytes[2..4].copy_from_slice(&self.len.to_be_bytes());
        bytes
    }
}

/// What a frame classifies as, per spec.md §4.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FrameClass {
    /// IPv4/UDP with a destination port matching the configured `TT_PORT`.
    TrdpOverUdp { flow_id: u16 },
    /// EtherType matches the configured `ETH_P_TT`.
    TtNative,
    Other,
}

fn ethertype_at(frame: &[u8]) -> Option<u16> {
    if frame.len() < ETH_HEADER_LEN {
        return None;
    }
    Some(u16::from_be_bytes([
        frame[ETH_DST_LEN + ETH_SRC_LEN],
        frame[ETH_DST_LEN + ETH_SRC_LEN + 1],
    ]))
}

/// Classify a raw Ethernet frame as `TrdpOverUdp`, `TtNative`, or `Other`.
///
/// `tt_port` and `eth_p_tt` are the per-deployment tunables from
/// [`crate::config::ScheduleConfig`].
pub fn classify(frame: &[u8], tt_port: u16, eth_p_tt: u16) -> FrameClass {
    let Some(ethertype) = ethertype_at(frame) else {
        return FrameClass::Other;
    };

    if ethertype == eth_p_tt {
        return FrameClass::TtNative;
    }

    if EtherType::from(ethertype) != EtherType::Ipv4 {
        return FrameClass::Other;
    }

    let ip_start = ETH_HEADER_LEN;
    if frame.len() < ip_start + IPV4_MIN_HEADER_LEN {
        return FrameClass::Other;
    }
    let protocol = frame[ip_start + IPV4_PROTOCOL_OFFSET];
    if IpProtocol::from(protocol) != IpProtocol::Udp {
        return FrameClass::Other;
    }

    // No IP options assumed, matching the rest of the corpus's fixed-width
    // header reads; a real deployment would derive ihl from the frame.
    let udp_start = ip_start + IPV4_MIN_HEADER_LEN;
    if frame.len() < udp_start + UDP_HEADER_LEN {
        return FrameClass::Other;
    }
    let dst_port = u16::from_be_bytes([frame[udp_start + 2], frame[udp_start + 3]]);
    if dst_port != tt_port {
        return FrameClass::Other;
    }

    let payload_start = udp_start + UDP_HEADER_LEN;
    if frame.len() < payload_start + 2 {
        return FrameClass::Other;
    }
    let flow_id = u16::from_be_bytes([frame[payload_start], frame[payload_start + 1]]);
    FrameClass::TrdpOverUdp { flow_id }
}

/// Push a 4-byte TT header onto `frame`, moving the MAC header forward and
/// rewriting its EtherType, per spec.md §4.1.
///
/// `frame` is the full Ethernet frame bytes (MAC header + payload).
/// Returns the new frame with the TT header inserted after the MAC header.
pub fn push_tt(frame: &[u8], flow_id: u16, eth_p_tt: u16) -> Result<Vec<u8>, TtError> {
    if frame.len() < ETH_HEADER_LEN {
        return Err(TtError::OutOfHeadroom);
    }

    let header = TtHeader {
        flow_id,
        len: frame.len() as u16,
    };

    let mut out = Vec::with_capacity(frame.len() + crate::config::TT_HLEN);
    out.extend_from_slice(&frame[..ETH_DST_LEN + ETH_SRC_LEN]);
    out.extend_from_slice(&eth_p_tt.to_be_bytes());
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(&frame[ETH_HEADER_LEN..]);
    Ok(out)
}

/// Inverse of [`push_tt`]: drop the TT header and restore the original
/// EtherType.
pub fn pop_tt(frame: &[u8]) -> Result<Vec<u8>, TtError> {
    if frame.len() < ETH_HEADER_LEN + crate::config::TT_HLEN {
        return Err(TtError::NotWritable);
    }

    let (rest, header) =
        TtHeader::parse(&frame[ETH_HEADER_LEN..]).map_err(|_| TtError::NotWritable)?;
    let _ = header;

    let mut out = Vec::with_capacity(frame.len() - crate::config::TT_HLEN);
    out.extend_from_slice(&frame[..ETH_DST_LEN + ETH_SRC_LEN]);
    out.extend_from_slice(&(EtherType::Ipv4 as u16).to_be_bytes());
    out.extend_from_slice(rest);
    Ok(out)
}
