//! Extension-header chain walker and transport dissector.
//!
//! [`Dissector::dissect`] walks an IPv6 packet inside a [`PacketView`] and
//! collects the text fragments of an ip6tables-LOG style line: addresses
//! and header fields first, then each extension header in chain order,
//! then the transport fields. Dissection is best-effort over untrusted
//! bytes: a short read emits a `TRUNCATED` / `INCOMPLETE [..]` marker,
//! keeps everything already produced and stops.

use std::fmt::{self, Write as _};

use smallvec::SmallVec;
use smol_str::{format_smolstr, SmolStr};

use crate::buffer::PacketView;
use crate::log::LogFlags;
use crate::packet::ext::{AuthHeader, EspHeader, ExtHeaderPrefix, FragmentHeader};
use crate::packet::icmp6::{Icmp6Header, Icmp6Type};
use crate::packet::ipv6::Ipv6Header;
use crate::packet::protocol::IpProto;
use crate::packet::tcp::TcpHeader;
use crate::packet::udp::UdpHeader;

/// Inline fragment capacity; an ordinary line fits without spilling.
const INLINE_FRAGMENTS: usize = 16;

/// How a dissection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DissectStatus {
    /// Every reachable header was decoded.
    Complete,
    /// A read crossed the logical end of the packet.
    Truncated,
    /// An extension-header type the walker has no layout for.
    UnknownHeader(u8),
    /// The rest of the packet is opaque (ESP payload).
    OpaquePayload,
}

/// The fragments of one line body plus the terminal status.
#[derive(Debug, Clone)]
pub struct DissectOutcome {
    fragments: SmallVec<[SmolStr; INLINE_FRAGMENTS]>,
    status: DissectStatus,
}

impl DissectOutcome {
    fn new() -> Self {
        Self {
            fragments: SmallVec::new(),
            status: DissectStatus::Complete,
        }
    }

    pub fn fragments(&self) -> &[SmolStr] {
        &self.fragments
    }

    pub fn status(&self) -> DissectStatus {
        self.status
    }

    fn push(&mut self, fragment: impl Into<SmolStr>) {
        self.fragments.push(fragment.into());
    }

    /// Append the concatenated fragments to `out`.
    pub fn write_to(&self, out: &mut String) {
        for fragment in &self.fragments {
            out.push_str(fragment);
        }
    }
}

impl fmt::Display for DissectOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for fragment in &self.fragments {
            f.write_str(fragment)?;
        }
        Ok(())
    }
}

/// Pass-by-value recursion capability. The outermost call holds
/// `Allowed`; descending yields `Nested`, and a nested capability can
/// never be re-armed, so embedded-packet dissection is bounded at one
/// level no matter what the bytes say.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recursion {
    Allowed,
    Nested,
}

impl Recursion {
    #[inline]
    pub fn descend(self) -> Recursion {
        Recursion::Nested
    }

    #[inline]
    pub fn is_outermost(self) -> bool {
        matches!(self, Recursion::Allowed)
    }
}

/// Walks one packet. Borrow is immutable; the same dissector can run the
/// same packet any number of times with identical results.
pub struct Dissector<'a> {
    view: &'a PacketView<'a>,
    flags: LogFlags,
}

impl<'a> Dissector<'a> {
    pub fn new(view: &'a PacketView<'a>, flags: LogFlags) -> Self {
        Self { view, flags }
    }

    /// Dissect the IPv6 packet starting at `start` into line fragments.
    pub fn dissect(&self, start: usize, recursion: Recursion) -> DissectOutcome {
        let mut out = DissectOutcome::new();
        self.walk(&mut out, start, recursion);
        out
    }

    fn walk(&self, out: &mut DissectOutcome, start: usize, recursion: Recursion) {
        let ip6 = match self.view.read_header::<Ipv6Header>(start) {
            Ok(h) => h,
            Err(_) => {
                out.push("TRUNCATED");
                out.status = DissectStatus::Truncated;
                return;
            }
        };

        out.push(format_smolstr!("SRC={} DST={} ", ip6.src_ip(), ip6.dst_ip()));
        out.push(format_smolstr!(
            "LEN={} TC={} HOPLIMIT={} FLOWLBL={} ",
            ip6.total_length(),
            ip6.traffic_class(),
            ip6.hop_limit(),
            ip6.flow_label()
        ));

        let ipopt = self.flags.contains(LogFlags::IPOPT);
        let mut cursor = start + Ipv6Header::FIXED_LEN;
        let mut current = ip6.next_header();
        // Set once a non-initial fragment is seen; later headers belong to
        // a different fragment and only the PROTO tag can be trusted.
        let mut fragment = false;

        while current != IpProto::IPV6_NONXT && current.is_ext_header() {
            let prefix = match self.view.read_header::<ExtHeaderPrefix>(cursor) {
                Ok(p) => p,
                Err(_) => {
                    out.push("TRUNCATED");
                    out.status = DissectStatus::Truncated;
                    return;
                }
            };

            if ipopt {
                out.push("OPT ( ");
            }

            let hdrlen;
            match current {
                IpProto::IPV6_FRAG => {
                    out.push("FRAG:");
                    let fh = match self.view.read_header::<FragmentHeader>(cursor) {
                        Ok(h) => h,
                        Err(_) => {
                            out.push("TRUNCATED ");
                            out.status = DissectStatus::Truncated;
                            return;
                        }
                    };
                    out.push(format_smolstr!("{} ", fh.offset_masked()));
                    if fh.more_fragments() {
                        out.push("INCOMPLETE ");
                    }
                    out.push(format_smolstr!("ID:{:08x} ", fh.identification()));
                    if fh.is_non_initial() {
                        fragment = true;
                    }
                    hdrlen = FragmentHeader::FIXED_LEN;
                }
                IpProto::IPV6_OPTS | IpProto::IPV6_ROUTE | IpProto::HOPOPT => {
                    if fragment {
                        if ipopt {
                            out.push(")");
                        }
                        return;
                    }
                    hdrlen = prefix.options_len();
                }
                IpProto::AH => {
                    if ipopt {
                        out.push("AH ");
                        if fragment {
                            out.push(")");
                            return;
                        }
                        let ah = match self.view.read_header::<AuthHeader>(cursor) {
                            Ok(h) => h,
                            Err(_) => {
                                out.push(format_smolstr!(
                                    "INCOMPLETE [{} bytes] )",
                                    self.view.remaining_from(cursor)
                                ));
                                out.status = DissectStatus::Truncated;
                                return;
                            }
                        };
                        out.push(format_smolstr!("SPI=0x{:x} ", ah.spi()));
                    }
                    hdrlen = prefix.auth_len();
                }
                IpProto::ESP => {
                    if ipopt {
                        out.push("ESP ");
                        if fragment {
                            out.push(")");
                            return;
                        }
                        let esp = match self.view.read_header::<EspHeader>(cursor) {
                            Ok(h) => h,
                            Err(_) => {
                                out.push(format_smolstr!(
                                    "INCOMPLETE [{} bytes] )",
                                    self.view.remaining_from(cursor)
                                ));
                                out.status = DissectStatus::Truncated;
                                return;
                            }
                        };
                        out.push(format_smolstr!("SPI=0x{:x} )", esp.spi()));
                    }
                    out.status = DissectStatus::OpaquePayload;
                    return;
                }
                other => {
                    out.push(format_smolstr!("Unknown Ext Hdr {}", u8::from(other)));
                    out.status = DissectStatus::UnknownHeader(other.into());
                    return;
                }
            }

            if ipopt {
                out.push(") ");
            }
            current = prefix.next_header();
            cursor += hdrlen;
        }

        self.transport(out, cursor, current, fragment, recursion);
    }

    fn transport(
        &self,
        out: &mut DissectOutcome,
        cursor: usize,
        proto: IpProto,
        fragment: bool,
        recursion: Recursion,
    ) {
        match proto {
            IpProto::TCP => {
                out.push("PROTO=TCP ");
                if fragment {
                    return;
                }
                let th = match self.view.read_header::<TcpHeader>(cursor) {
                    Ok(h) => h,
                    Err(_) => return self.incomplete(out, cursor),
                };
                out.push(format_smolstr!(
                    "SPT={} DPT={} ",
                    th.src_port(),
                    th.dst_port()
                ));
                if self.flags.contains(LogFlags::TCPSEQ) {
                    out.push(format_smolstr!(
                        "SEQ={} ACK={} ",
                        th.sequence(),
                        th.acknowledgment()
                    ));
                }
                out.push(format_smolstr!("WINDOW={} ", th.window_size()));
                out.push(format_smolstr!("RES=0x{:02x} ", th.reserved_bits()));
                for (set, name) in [
                    (th.is_cwr(), "CWR "),
                    (th.is_ece(), "ECE "),
                    (th.is_urg(), "URG "),
                    (th.is_ack(), "ACK "),
                    (th.is_psh(), "PSH "),
                    (th.is_rst(), "RST "),
                    (th.is_syn(), "SYN "),
                    (th.is_fin(), "FIN "),
                ] {
                    if set {
                        out.push(name);
                    }
                }
                out.push(format_smolstr!("URGP={} ", th.urgent_pointer()));

                if self.flags.contains(LogFlags::TCPOPT) && th.options_len() > 0 {
                    let optsize = th.options_len().min(TcpHeader::MAX_OPTIONS_LEN);
                    let opts = match self.view.read(cursor + TcpHeader::FIXED_LEN, optsize) {
                        Ok(o) => o,
                        Err(_) => {
                            out.push("OPT (TRUNCATED)");
                            out.status = DissectStatus::Truncated;
                            return;
                        }
                    };
                    let mut dump = String::with_capacity(optsize * 2 + 8);
                    dump.push_str("OPT (");
                    for b in opts {
                        let _ = write!(dump, "{:02X}", b);
                    }
                    dump.push_str(") ");
                    out.push(dump);
                }
            }
            IpProto::UDP | IpProto::UDPLITE => {
                if proto == IpProto::UDP {
                    out.push("PROTO=UDP ");
                } else {
                    out.push("PROTO=UDPLITE ");
                }
                if fragment {
                    return;
                }
                let uh = match self.view.read_header::<UdpHeader>(cursor) {
                    Ok(h) => h,
                    Err(_) => return self.incomplete(out, cursor),
                };
                out.push(format_smolstr!(
                    "SPT={} DPT={} LEN={} ",
                    uh.src_port(),
                    uh.dst_port(),
                    uh.length()
                ));
            }
            IpProto::IPV6_ICMP => {
                out.push("PROTO=ICMPv6 ");
                if fragment {
                    return;
                }
                let ic = match self.view.read_header::<Icmp6Header>(cursor) {
                    Ok(h) => h,
                    Err(_) => return self.incomplete(out, cursor),
                };
                out.push(format_smolstr!(
                    "TYPE={} CODE={} ",
                    u8::from(ic.icmp_type()),
                    ic.code()
                ));
                match ic.icmp_type() {
                    Icmp6Type::ECHO_REQUEST | Icmp6Type::ECHO_REPLY => {
                        out.push(format_smolstr!(
                            "ID={} SEQ={} ",
                            ic.echo_id(),
                            ic.echo_sequence()
                        ));
                    }
                    Icmp6Type::MLD_QUERY | Icmp6Type::MLD_REPORT | Icmp6Type::MLD_REDUCTION => {}
                    t if t.embeds_packet() => {
                        if t == Icmp6Type::PARAM_PROBLEM {
                            out.push(format_smolstr!("POINTER={:08x} ", ic.pointer()));
                        }
                        self.embedded_packet(out, cursor, ic, recursion);
                    }
                    _ => {}
                }
            }
            other => {
                out.push(format_smolstr!("PROTO={} ", u8::from(other)));
            }
        }
    }

    /// Shared tail for the ICMPv6 error messages that carry the offending
    /// packet: one bracketed nested dissection, outermost invocation only,
    /// plus the MTU field for packet-too-big.
    fn embedded_packet(
        &self,
        out: &mut DissectOutcome,
        cursor: usize,
        ic: &Icmp6Header,
        recursion: Recursion,
    ) {
        if recursion.is_outermost() {
            out.push("[");
            let nested = self.dissect(cursor + Icmp6Header::FIXED_LEN, recursion.descend());
            out.fragments.extend(nested.fragments);
            out.push("] ");
        }
        if ic.icmp_type() == Icmp6Type::PACKET_TOO_BIG {
            out.push(format_smolstr!("MTU={} ", ic.mtu()));
        }
    }

    fn incomplete(&self, out: &mut DissectOutcome, cursor: usize) {
        out.push(format_smolstr!(
            "INCOMPLETE [{} bytes] ",
            self.view.remaining_from(cursor)
        ));
        out.status = DissectStatus::Truncated;
    }
}
