//! IPv6 fixed header (RFC 8200).
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |Version| Traffic Class |           Flow Label                  |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |         Payload Length        |  Next Header  |   Hop Limit   |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                         Source Address (128)                  |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                      Destination Address (128)                |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use std::mem;
use std::net::Ipv6Addr;

use zerocopy::byteorder::{BigEndian, U16};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::packet::protocol::IpProto;

/// IPv6 header, fixed 40 bytes.
#[repr(C, packed)]
#[derive(FromBytes, IntoBytes, Immutable, Unaligned, KnownLayout, Debug, Clone, Copy)]
pub struct Ipv6Header {
    /// Version (4 bits), Traffic Class (8 bits), Flow Label (20 bits)
    ver_tc_flow: [u8; 4],
    /// Payload length (excludes the header itself)
    payload_length: U16<BigEndian>,
    next_header: IpProto,
    hop_limit: u8,
    src_ip: [u8; 16],
    dst_ip: [u8; 16],
}

impl Ipv6Header {
    pub const FIXED_LEN: usize = mem::size_of::<Ipv6Header>();

    /// Returns the IP version (should always be 6)
    #[inline]
    pub fn version(&self) -> u8 {
        self.ver_tc_flow[0] >> 4
    }

    /// Returns the Traffic Class (8 bits)
    #[inline]
    pub fn traffic_class(&self) -> u8 {
        ((self.ver_tc_flow[0] & 0x0F) << 4) | (self.ver_tc_flow[1] >> 4)
    }

    /// Returns the Flow Label (20 bits)
    #[inline]
    pub fn flow_label(&self) -> u32 {
        let b1 = (self.ver_tc_flow[1] & 0x0F) as u32;
        let b2 = self.ver_tc_flow[2] as u32;
        let b3 = self.ver_tc_flow[3] as u32;
        (b1 << 16) | (b2 << 8) | b3
    }

    /// Payload length in bytes, not counting the 40-byte header.
    #[inline]
    pub fn payload_length(&self) -> usize {
        self.payload_length.get() as usize
    }

    /// Total packet length (header + payload), the `LEN=` value.
    #[inline]
    pub fn total_length(&self) -> usize {
        Self::FIXED_LEN + self.payload_length()
    }

    #[inline]
    pub fn next_header(&self) -> IpProto {
        self.next_header
    }

    #[inline]
    pub fn hop_limit(&self) -> u8 {
        self.hop_limit
    }

    #[inline]
    pub fn src_ip(&self) -> Ipv6Addr {
        Ipv6Addr::from(self.src_ip)
    }

    #[inline]
    pub fn dst_ip(&self) -> Ipv6Addr {
        Ipv6Addr::from(self.dst_ip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zerocopy::byteorder::U16;

    fn create_test_header() -> Ipv6Header {
        Ipv6Header {
            ver_tc_flow: [0x60, 0x00, 0x00, 0x00],
            payload_length: U16::new(0),
            next_header: IpProto::TCP,
            hop_limit: 64,
            src_ip: [0x20, 0x01, 0x0d, 0xb8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1],
            dst_ip: [0x20, 0x01, 0x0d, 0xb8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2],
        }
    }

    #[test]
    fn test_ipv6_header_size() {
        assert_eq!(mem::size_of::<Ipv6Header>(), 40);
        assert_eq!(Ipv6Header::FIXED_LEN, 40);
    }

    #[test]
    fn test_ipv6_version() {
        let header = create_test_header();
        assert_eq!(header.version(), 6);
    }

    #[test]
    fn test_ipv6_traffic_class() {
        let mut header = create_test_header();

        // Traffic class 0xAB: low nibble of byte 0, high nibble of byte 1
        header.ver_tc_flow[0] = 0x6A;
        header.ver_tc_flow[1] = 0xB0;

        assert_eq!(header.traffic_class(), 0xAB);
    }

    #[test]
    fn test_ipv6_flow_label() {
        let mut header = create_test_header();

        header.ver_tc_flow[1] = (header.ver_tc_flow[1] & 0xF0) | 0x01;
        header.ver_tc_flow[2] = 0x23;
        header.ver_tc_flow[3] = 0x45;

        assert_eq!(header.flow_label(), 0x12345);
    }

    #[test]
    fn test_ipv6_total_length() {
        let mut header = create_test_header();
        header.payload_length = U16::new(1024);

        assert_eq!(header.payload_length(), 1024);
        assert_eq!(header.total_length(), 40 + 1024);
    }

    #[test]
    fn test_ipv6_addresses_compressed_display() {
        let header = create_test_header();
        assert_eq!(header.src_ip().to_string(), "2001:db8::1");
        assert_eq!(header.dst_ip().to_string(), "2001:db8::2");
    }
}
