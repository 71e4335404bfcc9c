//! Line assembly around the dissector: flag set, invocation metadata,
//! the `MAC=` / `TUNNEL=` link annotations, registration-time target
//! validation and the serialized sink boundary.

use std::fmt::Write as _;
use std::io;
use std::ops::{BitOr, BitOrAssign};
use std::sync::Mutex;

use thiserror::Error;

use crate::buffer::PacketView;
use crate::dissect::{Dissector, Recursion};
use crate::packet::ipv4::Ipv4Header;

/// Ethernet header length, the amount a SIT link backs up to find the
/// original MAC header.
pub const ETHER_HDR_LEN: usize = 14;

/// Fixed prefix storage size, NUL terminator included.
pub const PREFIX_STORAGE: usize = 30;

/// Syslog levels stop at debug (7).
pub const MAX_LEVEL: u8 = 7;

/// Verbosity toggles for one log target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogFlags(u8);

impl LogFlags {
    pub const NONE: LogFlags = LogFlags(0);
    /// Show TCP sequence and acknowledgment numbers.
    pub const TCPSEQ: LogFlags = LogFlags(0x01);
    /// Hex-dump the TCP options area.
    pub const TCPOPT: LogFlags = LogFlags(0x02);
    /// Show extension-header contents in `OPT ( .. )` brackets.
    pub const IPOPT: LogFlags = LogFlags(0x04);
    /// Show the owning socket's uid/gid when known.
    pub const UID: LogFlags = LogFlags(0x08);
    pub const ALL: LogFlags = LogFlags(0x0F);

    #[inline]
    pub fn contains(self, other: LogFlags) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for LogFlags {
    type Output = LogFlags;

    fn bitor(self, rhs: LogFlags) -> LogFlags {
        LogFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for LogFlags {
    fn bitor_assign(&mut self, rhs: LogFlags) {
        self.0 |= rhs.0;
    }
}

/// Link-layer type of the receiving device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevType {
    Ethernet,
    /// 6-in-4 tunnel: an IPv4 header occupies the link-layer slot.
    Sit,
    Other(u16),
}

/// Where the link-layer header sits in the buffer.
#[derive(Debug, Clone, Copy)]
pub struct LinkInfo {
    pub dev_type: DevType,
    pub hard_header_len: usize,
    pub mac_offset: usize,
}

/// Credentials of the socket that owns the packet, when the caller knows
/// them.
#[derive(Debug, Clone, Copy)]
pub struct SocketOwner {
    pub uid: u32,
    pub gid: u32,
}

/// Per-invocation metadata that is not derivable from the packet bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PacketInfo<'a> {
    pub in_name: &'a str,
    pub out_name: &'a str,
    pub mark: u32,
    pub socket: Option<SocketOwner>,
    pub link: Option<LinkInfo>,
    /// Offset of the IPv6 header within the view.
    pub network_offset: usize,
}

/// Build one complete log line for the packet, trailing newline included.
pub fn render_log_line(
    view: &PacketView<'_>,
    info: &PacketInfo<'_>,
    flags: LogFlags,
    level: u8,
    prefix: &str,
) -> String {
    let mut line = String::with_capacity(256);
    let _ = write!(
        line,
        "<{}>{}IN={} OUT={} ",
        level, prefix, info.in_name, info.out_name
    );

    // The MAC field only makes sense on the ingress path.
    if !info.in_name.is_empty() && info.out_name.is_empty() {
        write_mac_field(&mut line, view, info);
    }

    let outcome = Dissector::new(view, flags).dissect(info.network_offset, Recursion::Allowed);
    outcome.write_to(&mut line);

    if flags.contains(LogFlags::UID) {
        if let Some(owner) = info.socket {
            let _ = write!(line, "UID={} GID={} ", owner.uid, owner.gid);
        }
    }
    if info.mark != 0 {
        let _ = write!(line, "MARK=0x{:x} ", info.mark);
    }

    line.push('\n');
    line
}

fn write_mac_field(line: &mut String, view: &PacketView<'_>, info: &PacketInfo<'_>) {
    line.push_str("MAC=");

    let link = match info.link {
        Some(link) if link.hard_header_len != 0 && link.mac_offset != info.network_offset => link,
        _ => {
            line.push(' ');
            return;
        }
    };

    // On SIT links the slot holds the outer IPv4 header; the original
    // Ethernet header, if still in the buffer, sits ETHER_HDR_LEN before
    // it. An underflow leaves the MAC field empty.
    let mac_start = if link.dev_type == DevType::Sit {
        link.mac_offset.checked_sub(ETHER_HDR_LEN)
    } else {
        Some(link.mac_offset)
    };
    if let Some(start) = mac_start {
        if let Ok(mac) = view.read(start, link.hard_header_len) {
            for (i, b) in mac.iter().enumerate() {
                if i == 0 {
                    let _ = write!(line, "{:02x}", b);
                } else {
                    let _ = write!(line, ":{:02x}", b);
                }
            }
        }
    }
    line.push(' ');

    if link.dev_type == DevType::Sit {
        if let Ok(iph) = view.read_header::<Ipv4Header>(link.mac_offset) {
            let _ = write!(line, "TUNNEL={}->{} ", iph.src_ip(), iph.dst_ip());
        }
    }
}

/// Rejected target configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("log level {0} out of range (max {MAX_LEVEL})")]
    LevelOutOfRange(u8),
    #[error("log prefix is not NUL-terminated within {PREFIX_STORAGE} bytes")]
    UnterminatedPrefix,
}

/// Validated log-target configuration: severity level, line prefix and
/// verbosity flags. Validation happens once here; the per-packet path
/// assumes a well-formed target.
#[derive(Debug, Clone, Copy)]
pub struct LogTarget {
    level: u8,
    flags: LogFlags,
    prefix: [u8; PREFIX_STORAGE],
}

impl Default for LogTarget {
    /// The configuration used when none is supplied: level 0, all
    /// verbosity flags set, empty prefix.
    fn default() -> Self {
        Self {
            level: 0,
            flags: LogFlags::ALL,
            prefix: [0; PREFIX_STORAGE],
        }
    }
}

impl LogTarget {
    pub fn new(level: u8, flags: LogFlags, prefix: &str) -> Result<Self, RegisterError> {
        let bytes = prefix.as_bytes();
        if bytes.len() >= PREFIX_STORAGE {
            return Err(RegisterError::UnterminatedPrefix);
        }
        let mut storage = [0u8; PREFIX_STORAGE];
        storage[..bytes.len()].copy_from_slice(bytes);
        Self::from_raw(level, flags, storage)
    }

    /// Validate a wire-format target: fixed prefix storage that must
    /// contain its NUL terminator.
    pub fn from_raw(
        level: u8,
        flags: LogFlags,
        prefix: [u8; PREFIX_STORAGE],
    ) -> Result<Self, RegisterError> {
        if level > MAX_LEVEL {
            return Err(RegisterError::LevelOutOfRange(level));
        }
        if prefix[PREFIX_STORAGE - 1] != 0 {
            return Err(RegisterError::UnterminatedPrefix);
        }
        Ok(Self {
            level,
            flags,
            prefix,
        })
    }

    #[inline]
    pub fn level(&self) -> u8 {
        self.level
    }

    #[inline]
    pub fn flags(&self) -> LogFlags {
        self.flags
    }

    /// Prefix up to the first NUL. Non-UTF-8 storage renders as empty.
    pub fn prefix(&self) -> &str {
        let end = self
            .prefix
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(PREFIX_STORAGE);
        std::str::from_utf8(&self.prefix[..end]).unwrap_or("")
    }
}

/// Destination for finished lines.
pub trait LogSink {
    fn write_line(&mut self, line: &str) -> io::Result<()>;
}

impl<W: io::Write> LogSink for W {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.write_all(line.as_bytes())
    }
}

/// A target bound to a sink. The mutex spans both building and writing a
/// line, so lines from concurrent callers never interleave.
pub struct Logger<S> {
    target: LogTarget,
    sink: Mutex<S>,
}

impl<S: LogSink> Logger<S> {
    pub fn new(target: LogTarget, sink: S) -> Self {
        Self {
            target,
            sink: Mutex::new(sink),
        }
    }

    pub fn target(&self) -> &LogTarget {
        &self.target
    }

    /// Dissect the packet and write one line to the sink.
    pub fn log(&self, view: &PacketView<'_>, info: &PacketInfo<'_>) -> io::Result<()> {
        let mut sink = self.sink.lock().unwrap_or_else(|e| e.into_inner());
        let line = render_log_line(
            view,
            info,
            self.target.flags(),
            self.target.level(),
            self.target.prefix(),
        );
        sink.write_line(&line)
    }

    /// Hand the sink back, e.g. to inspect what was written.
    pub fn into_sink(self) -> S {
        self.sink.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_packet(next_header: u8, payload: &[u8]) -> Vec<u8> {
        let mut packet = Vec::new();
        packet.extend_from_slice(&[0x60, 0x00, 0x00, 0x00]);
        packet.extend_from_slice(&(payload.len() as u16).to_be_bytes());
        packet.push(next_header);
        packet.push(64);
        packet.extend_from_slice(&[
            0x20, 0x01, 0x0d, 0xb8, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x01,
        ]);
        packet.extend_from_slice(&[
            0x20, 0x01, 0x0d, 0xb8, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x02,
        ]);
        packet.extend_from_slice(payload);
        packet
    }

    fn udp_payload() -> Vec<u8> {
        let mut udp = Vec::new();
        udp.extend_from_slice(&5353u16.to_be_bytes());
        udp.extend_from_slice(&53u16.to_be_bytes());
        udp.extend_from_slice(&8u16.to_be_bytes());
        udp.extend_from_slice(&0u16.to_be_bytes());
        udp
    }

    #[test]
    fn test_flags_compose() {
        let flags = LogFlags::TCPSEQ | LogFlags::IPOPT;
        assert!(flags.contains(LogFlags::TCPSEQ));
        assert!(flags.contains(LogFlags::IPOPT));
        assert!(!flags.contains(LogFlags::UID));
        assert!(LogFlags::ALL.contains(flags));
        assert_eq!(LogFlags::ALL.bits(), 0x0F);
    }

    #[test]
    fn test_basic_line_shape() {
        let packet = create_test_packet(17, &udp_payload());
        let view = PacketView::new(&packet);
        let info = PacketInfo {
            in_name: "eth0",
            out_name: "",
            link: None,
            ..Default::default()
        };
        let line = render_log_line(&view, &info, LogFlags::NONE, 4, "fw: ");
        assert_eq!(
            line,
            "<4>fw: IN=eth0 OUT= MAC= SRC=2001:db8::1 DST=2001:db8::2 \
             LEN=48 TC=0 HOPLIMIT=64 FLOWLBL=0 PROTO=UDP SPT=5353 DPT=53 LEN=8 \n"
        );
    }

    #[test]
    fn test_egress_has_no_mac_field() {
        let packet = create_test_packet(17, &udp_payload());
        let view = PacketView::new(&packet);
        let info = PacketInfo {
            in_name: "",
            out_name: "eth1",
            ..Default::default()
        };
        let line = render_log_line(&view, &info, LogFlags::NONE, 4, "");
        assert!(line.starts_with("<4>IN= OUT=eth1 SRC="));
        assert!(!line.contains("MAC="));
    }

    #[test]
    fn test_ethernet_mac_bytes() {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&[
            0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0x86, 0xdd,
        ]);
        buffer.extend_from_slice(&create_test_packet(17, &udp_payload()));
        let view = PacketView::new(&buffer);
        let info = PacketInfo {
            in_name: "eth0",
            out_name: "",
            link: Some(LinkInfo {
                dev_type: DevType::Ethernet,
                hard_header_len: ETHER_HDR_LEN,
                mac_offset: 0,
            }),
            network_offset: 14,
            ..Default::default()
        };
        let line = render_log_line(&view, &info, LogFlags::NONE, 4, "");
        assert!(line.contains("MAC=00:11:22:33:44:55:66:77:88:99:aa:bb:86:dd SRC="));
    }

    #[test]
    fn test_sit_underflow_gives_empty_mac_and_tunnel() {
        // Outer IPv4 header in the link slot, IPv6 right behind it.
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&[
            0x45, 0x00, 0x00, 0x3C, 0x00, 0x00, 0x00, 0x00, 0x40, 0x29, 0x00, 0x00,
        ]);
        buffer.extend_from_slice(&[192, 0, 2, 1]);
        buffer.extend_from_slice(&[198, 51, 100, 2]);
        buffer.extend_from_slice(&create_test_packet(17, &udp_payload()));
        let view = PacketView::new(&buffer);
        let info = PacketInfo {
            in_name: "sit0",
            out_name: "",
            link: Some(LinkInfo {
                dev_type: DevType::Sit,
                hard_header_len: ETHER_HDR_LEN,
                mac_offset: 0,
            }),
            network_offset: 20,
            ..Default::default()
        };
        let line = render_log_line(&view, &info, LogFlags::NONE, 4, "");
        assert!(line.contains("MAC= TUNNEL=192.0.2.1->198.51.100.2 SRC="));
    }

    #[test]
    fn test_uid_gid_only_with_flag_and_socket() {
        let packet = create_test_packet(17, &udp_payload());
        let view = PacketView::new(&packet);
        let mut info = PacketInfo {
            in_name: "eth0",
            socket: Some(SocketOwner { uid: 1000, gid: 100 }),
            ..Default::default()
        };

        let line = render_log_line(&view, &info, LogFlags::UID, 4, "");
        assert!(line.contains("UID=1000 GID=100 "));

        let line = render_log_line(&view, &info, LogFlags::NONE, 4, "");
        assert!(!line.contains("UID="));

        info.socket = None;
        let line = render_log_line(&view, &info, LogFlags::UID, 4, "");
        assert!(!line.contains("UID="));
    }

    #[test]
    fn test_mark_only_when_nonzero() {
        let packet = create_test_packet(17, &udp_payload());
        let view = PacketView::new(&packet);
        let mut info = PacketInfo {
            in_name: "eth0",
            mark: 0xDEAD,
            ..Default::default()
        };
        let line = render_log_line(&view, &info, LogFlags::NONE, 4, "");
        assert!(line.ends_with("MARK=0xdead \n"));

        info.mark = 0;
        let line = render_log_line(&view, &info, LogFlags::NONE, 4, "");
        assert!(!line.contains("MARK="));
    }

    #[test]
    fn test_target_rejects_bad_level() {
        assert!(matches!(
            LogTarget::new(8, LogFlags::NONE, ""),
            Err(RegisterError::LevelOutOfRange(8))
        ));
        assert!(LogTarget::new(7, LogFlags::NONE, "").is_ok());
    }

    #[test]
    fn test_target_rejects_unterminated_prefix() {
        let too_long = "x".repeat(PREFIX_STORAGE);
        assert!(matches!(
            LogTarget::new(4, LogFlags::NONE, &too_long),
            Err(RegisterError::UnterminatedPrefix)
        ));

        let raw = [b'x'; PREFIX_STORAGE];
        assert!(matches!(
            LogTarget::from_raw(4, LogFlags::NONE, raw),
            Err(RegisterError::UnterminatedPrefix)
        ));
    }

    #[test]
    fn test_target_prefix_roundtrip() {
        let target = LogTarget::new(5, LogFlags::ALL, "fw-drop: ").unwrap();
        assert_eq!(target.level(), 5);
        assert_eq!(target.prefix(), "fw-drop: ");
        assert_eq!(target.flags(), LogFlags::ALL);

        let longest = "y".repeat(PREFIX_STORAGE - 1);
        let target = LogTarget::new(0, LogFlags::NONE, &longest).unwrap();
        assert_eq!(target.prefix(), longest);
    }

    #[test]
    fn test_default_target() {
        let target = LogTarget::default();
        assert_eq!(target.level(), 0);
        assert_eq!(target.flags(), LogFlags::ALL);
        assert_eq!(target.prefix(), "");
    }

    #[test]
    fn test_logger_writes_whole_lines() {
        let packet = create_test_packet(17, &udp_payload());
        let view = PacketView::new(&packet);
        let info = PacketInfo {
            in_name: "eth0",
            ..Default::default()
        };

        let target = LogTarget::new(4, LogFlags::NONE, "t: ").unwrap();
        let logger = Logger::new(target, Vec::new());
        logger.log(&view, &info).unwrap();
        logger.log(&view, &info).unwrap();

        let written = String::from_utf8(logger.into_sink()).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], lines[1]);
        assert!(lines[0].starts_with("<4>t: IN=eth0 OUT= "));
    }
}
