//! ICMPv6 header (RFC 4443).
//!
//! The four bytes after the checksum are a union: echo identifier and
//! sequence for echo messages, the MTU for packet-too-big, the pointer
//! for parameter problems. The accessors expose each view; which one is
//! meaningful depends on the message type.

use std::mem;

use zerocopy::byteorder::{BigEndian, U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::protocol_constants;

protocol_constants!(
    Icmp6Type, u8:
    DEST_UNREACH = 1;
    PACKET_TOO_BIG = 2;
    TIME_EXCEEDED = 3;
    PARAM_PROBLEM = 4;
    ECHO_REQUEST = 128;
    ECHO_REPLY = 129;
    MLD_QUERY = 130;
    MLD_REPORT = 131;
    MLD_REDUCTION = 132;
);

impl Icmp6Type {
    /// Error messages that carry the offending packet after the header.
    #[inline]
    pub fn embeds_packet(&self) -> bool {
        matches!(
            *self,
            Icmp6Type::DEST_UNREACH
                | Icmp6Type::PACKET_TOO_BIG
                | Icmp6Type::TIME_EXCEEDED
                | Icmp6Type::PARAM_PROBLEM
        )
    }
}

/// ICMPv6 header, fixed 8 bytes.
#[repr(C, packed)]
#[derive(FromBytes, IntoBytes, Immutable, Unaligned, KnownLayout, Debug, Clone, Copy)]
pub struct Icmp6Header {
    icmp_type: Icmp6Type,
    code: u8,
    checksum: U16<BigEndian>,
    data: U32<BigEndian>,
}

impl Icmp6Header {
    pub const FIXED_LEN: usize = mem::size_of::<Icmp6Header>();

    #[inline]
    pub fn icmp_type(&self) -> Icmp6Type {
        self.icmp_type
    }

    #[inline]
    pub fn code(&self) -> u8 {
        self.code
    }

    /// Echo identifier (echo request/reply only).
    #[inline]
    pub fn echo_id(&self) -> u16 {
        (self.data.get() >> 16) as u16
    }

    /// Echo sequence number (echo request/reply only).
    #[inline]
    pub fn echo_sequence(&self) -> u16 {
        self.data.get() as u16
    }

    /// Path MTU (packet-too-big only).
    #[inline]
    pub fn mtu(&self) -> u32 {
        self.data.get()
    }

    /// Offset of the erroneous field (parameter problem only).
    #[inline]
    pub fn pointer(&self) -> u32 {
        self.data.get()
    }
}
