//! ip6tables-LOG style dissection of IPv6 packets into text lines.
//!
//! The library walks an IPv6 extension-header chain over untrusted bytes
//! and renders one bounded, single-line description per packet, the way
//! the classic firewall LOG target does. Dissection is best-effort: a
//! short packet yields a partial line ending in a truncation marker, never
//! an error and never a panic.
//!
//! # Example
//!
//! ```
//! use ip6log::buffer::PacketView;
//! use ip6log::log::{render_log_line, LogFlags, PacketInfo};
//!
//! // IPv6 header with no payload, next header 59 (no next header)
//! let mut packet = vec![0x60, 0x00, 0x00, 0x00, 0x00, 0x00, 59, 64];
//! packet.extend_from_slice(&[0u8; 32]); // :: -> ::
//!
//! let view = PacketView::new(&packet);
//! let info = PacketInfo { in_name: "eth0", ..Default::default() };
//! let line = render_log_line(&view, &info, LogFlags::ALL, 4, "");
//! assert_eq!(line, "<4>IN=eth0 OUT= MAC= SRC=:: DST=:: LEN=40 TC=0 HOPLIMIT=64 FLOWLBL=0 PROTO=59 \n");
//! ```

pub mod buffer;
pub mod dissect;
pub mod log;
mod macros;
pub mod packet;
