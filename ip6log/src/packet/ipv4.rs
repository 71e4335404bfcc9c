//! Minimal IPv4 header view, used only for the `TUNNEL=` annotation on
//! 6-in-4 (SIT) links where an IPv4 header sits in the link-layer slot.

use std::mem;
use std::net::Ipv4Addr;

use zerocopy::byteorder::{BigEndian, U16};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// IPv4 header without options, fixed 20 bytes.
#[repr(C, packed)]
#[derive(FromBytes, IntoBytes, Immutable, Unaligned, KnownLayout, Debug, Clone, Copy)]
pub struct Ipv4Header {
    ver_ihl: u8,
    tos: u8,
    total_length: U16<BigEndian>,
    identification: U16<BigEndian>,
    flags_frag: U16<BigEndian>,
    ttl: u8,
    protocol: u8,
    checksum: U16<BigEndian>,
    src_ip: [u8; 4],
    dst_ip: [u8; 4],
}

impl Ipv4Header {
    pub const FIXED_LEN: usize = mem::size_of::<Ipv4Header>();

    #[inline]
    pub fn src_ip(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.src_ip)
    }

    #[inline]
    pub fn dst_ip(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.dst_ip)
    }
}
