//! TCP header (RFC 9293).

use std::mem;

use zerocopy::byteorder::{BigEndian, U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// TCP header, fixed 20 bytes before options.
#[repr(C, packed)]
#[derive(FromBytes, IntoBytes, Immutable, Unaligned, KnownLayout, Debug, Clone, Copy)]
pub struct TcpHeader {
    src_port: U16<BigEndian>,
    dst_port: U16<BigEndian>,
    sequence: U32<BigEndian>,
    acknowledgment: U32<BigEndian>,
    /// Data offset (4 bits), reserved (4 bits), flags (8 bits)
    data_offset_flags: U16<BigEndian>,
    window_size: U16<BigEndian>,
    checksum: U16<BigEndian>,
    urgent_pointer: U16<BigEndian>,
}

impl TcpHeader {
    pub const FIXED_LEN: usize = mem::size_of::<TcpHeader>();

    /// Options never exceed 40 bytes (data offset caps at 15 words).
    pub const MAX_OPTIONS_LEN: usize = 40;

    pub const FLAG_FIN: u16 = 0x0001;
    pub const FLAG_SYN: u16 = 0x0002;
    pub const FLAG_RST: u16 = 0x0004;
    pub const FLAG_PSH: u16 = 0x0008;
    pub const FLAG_ACK: u16 = 0x0010;
    pub const FLAG_URG: u16 = 0x0020;
    pub const FLAG_ECE: u16 = 0x0040;
    pub const FLAG_CWR: u16 = 0x0080;

    #[inline]
    pub fn src_port(&self) -> u16 {
        self.src_port.get()
    }

    #[inline]
    pub fn dst_port(&self) -> u16 {
        self.dst_port.get()
    }

    #[inline]
    pub fn sequence(&self) -> u32 {
        self.sequence.get()
    }

    #[inline]
    pub fn acknowledgment(&self) -> u32 {
        self.acknowledgment.get()
    }

    /// Header length in 32-bit words.
    #[inline]
    pub fn data_offset(&self) -> u8 {
        (self.data_offset_flags.get() >> 12) as u8
    }

    /// Header length in bytes, options included.
    #[inline]
    pub fn header_len(&self) -> usize {
        self.data_offset() as usize * 4
    }

    /// Length of the options area, zero when the offset field is below the
    /// minimum (a malformed header).
    #[inline]
    pub fn options_len(&self) -> usize {
        self.header_len().saturating_sub(Self::FIXED_LEN)
    }

    /// The 4 reserved bits between data offset and flags, scaled left by
    /// two so the printed value matches the traditional `RES=0x..` field.
    #[inline]
    pub fn reserved_bits(&self) -> u8 {
        (((self.data_offset_flags.get() >> 8) as u8) & 0x0F) << 2
    }

    #[inline]
    pub fn window_size(&self) -> u16 {
        self.window_size.get()
    }

    #[inline]
    pub fn urgent_pointer(&self) -> u16 {
        self.urgent_pointer.get()
    }

    #[inline]
    fn has_flag(&self, flag: u16) -> bool {
        self.data_offset_flags.get() & flag != 0
    }

    #[inline]
    pub fn is_fin(&self) -> bool {
        self.has_flag(Self::FLAG_FIN)
    }

    #[inline]
    pub fn is_syn(&self) -> bool {
        self.has_flag(Self::FLAG_SYN)
    }

    #[inline]
    pub fn is_rst(&self) -> bool {
        self.has_flag(Self::FLAG_RST)
    }

    #[inline]
    pub fn is_psh(&self) -> bool {
        self.has_flag(Self::FLAG_PSH)
    }

    #[inline]
    pub fn is_ack(&self) -> bool {
        self.has_flag(Self::FLAG_ACK)
    }

    #[inline]
    pub fn is_urg(&self) -> bool {
        self.has_flag(Self::FLAG_URG)
    }

    #[inline]
    pub fn is_ece(&self) -> bool {
        self.has_flag(Self::FLAG_ECE)
    }

    #[inline]
    pub fn is_cwr(&self) -> bool {
        self.has_flag(Self::FLAG_CWR)
    }
}
