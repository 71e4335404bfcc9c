//! UDP header (RFC 768). UDP-Lite shares the same layout, with the
//! length field repurposed as a checksum coverage.

use std::mem;

use zerocopy::byteorder::{BigEndian, U16};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// UDP header, fixed 8 bytes.
#[repr(C, packed)]
#[derive(FromBytes, IntoBytes, Immutable, Unaligned, KnownLayout, Debug, Clone, Copy)]
pub struct UdpHeader {
    src_port: U16<BigEndian>,
    dst_port: U16<BigEndian>,
    length: U16<BigEndian>,
    checksum: U16<BigEndian>,
}

impl UdpHeader {
    pub const FIXED_LEN: usize = mem::size_of::<UdpHeader>();

    #[inline]
    pub fn src_port(&self) -> u16 {
        self.src_port.get()
    }

    #[inline]
    pub fn dst_port(&self) -> u16 {
        self.dst_port.get()
    }

    #[inline]
    pub fn length(&self) -> u16 {
        self.length.get()
    }
}
