//! IPv6 extension headers: the generic prefix plus the Fragment, AH and
//! ESP layouts the chain walker needs to look inside.

use std::mem;

use zerocopy::byteorder::{BigEndian, U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::packet::protocol::IpProto;

/// Generic extension-header prefix. Hop-by-Hop, Routing and Destination
/// Options all start this way; the minimum extension header is 8 bytes so
/// reading the full prefix is always safe on a well-formed chain.
#[repr(C, packed)]
#[derive(FromBytes, IntoBytes, Immutable, Unaligned, KnownLayout, Debug, Clone, Copy)]
pub struct ExtHeaderPrefix {
    next_header: IpProto,
    /// Length in 8-byte units, not counting the first 8 bytes.
    hdr_ext_len: u8,
    _opt: [u8; 6],
}

impl ExtHeaderPrefix {
    pub const FIXED_LEN: usize = mem::size_of::<ExtHeaderPrefix>();

    #[inline]
    pub fn next_header(&self) -> IpProto {
        self.next_header
    }

    #[inline]
    pub fn hdr_ext_len(&self) -> u8 {
        self.hdr_ext_len
    }

    /// Total size of an options-style header: `(len + 1) * 8`.
    #[inline]
    pub fn options_len(&self) -> usize {
        (self.hdr_ext_len as usize + 1) * 8
    }

    /// Total size when the length byte counts 4-byte units past the first
    /// two, the AH convention: `(len + 2) * 4`.
    #[inline]
    pub fn auth_len(&self) -> usize {
        (self.hdr_ext_len as usize + 2) * 4
    }
}

/// Fragment header (RFC 8200 §4.5), fixed 8 bytes.
#[repr(C, packed)]
#[derive(FromBytes, IntoBytes, Immutable, Unaligned, KnownLayout, Debug, Clone, Copy)]
pub struct FragmentHeader {
    next_header: IpProto,
    _reserved: u8,
    /// Fragment offset (upper 13 bits, 8-byte units) + flags (low 3 bits).
    frag_off: U16<BigEndian>,
    identification: U32<BigEndian>,
}

impl FragmentHeader {
    pub const FIXED_LEN: usize = mem::size_of::<FragmentHeader>();

    const OFFSET_MASK: u16 = 0xFFF8;
    const MORE_FRAGMENTS: u16 = 0x0001;

    #[inline]
    pub fn next_header(&self) -> IpProto {
        self.next_header
    }

    /// Offset field with the flag bits masked off, still scaled (the raw
    /// byte value, not the 8-byte unit count).
    #[inline]
    pub fn offset_masked(&self) -> u16 {
        self.frag_off.get() & Self::OFFSET_MASK
    }

    /// Non-initial fragment: headers past this one belong to a different
    /// fragment and cannot be trusted.
    #[inline]
    pub fn is_non_initial(&self) -> bool {
        self.offset_masked() != 0
    }

    #[inline]
    pub fn more_fragments(&self) -> bool {
        self.frag_off.get() & Self::MORE_FRAGMENTS != 0
    }

    #[inline]
    pub fn identification(&self) -> u32 {
        self.identification.get()
    }
}

/// Authentication Header (RFC 4302), fixed part.
#[repr(C, packed)]
#[derive(FromBytes, IntoBytes, Immutable, Unaligned, KnownLayout, Debug, Clone, Copy)]
pub struct AuthHeader {
    next_header: IpProto,
    payload_len: u8,
    _reserved: U16<BigEndian>,
    spi: U32<BigEndian>,
    sequence: U32<BigEndian>,
}

impl AuthHeader {
    pub const FIXED_LEN: usize = mem::size_of::<AuthHeader>();

    #[inline]
    pub fn next_header(&self) -> IpProto {
        self.next_header
    }

    #[inline]
    pub fn spi(&self) -> u32 {
        self.spi.get()
    }

    #[inline]
    pub fn sequence(&self) -> u32 {
        self.sequence.get()
    }
}

/// ESP header (RFC 4303). Everything after the sequence number is
/// encrypted, so this is as far as a dissector can see.
#[repr(C, packed)]
#[derive(FromBytes, IntoBytes, Immutable, Unaligned, KnownLayout, Debug, Clone, Copy)]
pub struct EspHeader {
    spi: U32<BigEndian>,
    sequence: U32<BigEndian>,
}

impl EspHeader {
    pub const FIXED_LEN: usize = mem::size_of::<EspHeader>();

    #[inline]
    pub fn spi(&self) -> u32 {
        self.spi.get()
    }

    #[inline]
    pub fn sequence(&self) -> u32 {
        self.sequence.get()
    }
}
