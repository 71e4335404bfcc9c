//! Wire-format header structures.
//!
//! Every struct here is a `#[repr(C, packed)]` zerocopy view over raw
//! packet bytes; the dissector obtains them through
//! [`PacketView::read_header`](crate::buffer::PacketView::read_header)
//! so no unvalidated access can happen.

pub mod ext;
pub mod icmp6;
pub mod ipv4;
pub mod ipv6;
pub mod protocol;
pub mod tcp;
pub mod udp;
