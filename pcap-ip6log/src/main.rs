use std::fs::File;
use std::io;
use std::path::PathBuf;

use clap::Parser;
use pcap_parser::traits::PcapReaderIterator;
use pcap_parser::*;
use tracing::{debug, error, info};

use ip6log::buffer::PacketView;
use ip6log::log::{DevType, LinkInfo, LogFlags, LogTarget, Logger, PacketInfo, ETHER_HDR_LEN};

const ETHERTYPE_IPV6: u16 = 0x86DD;
const ETHERTYPE_VLAN: u16 = 0x8100;

#[derive(Parser, Debug)]
#[command(name = "pcap-ip6log")]
#[command(about = "Replay a pcap capture as ip6tables-LOG style lines", long_about = None)]
struct Args {
    /// Path to the PCAP file to read
    #[arg(short, long, value_name = "FILE")]
    pcap: PathBuf,

    /// Syslog level for the line header (0-7)
    #[arg(long, default_value_t = 4)]
    level: u8,

    /// Prefix inserted after the level marker
    #[arg(long, default_value = "")]
    prefix: String,

    /// Interface name reported in IN=
    #[arg(long, default_value = "eth0")]
    in_name: String,

    /// Show extension-header contents
    #[arg(long)]
    ipopt: bool,

    /// Show TCP sequence numbers
    #[arg(long)]
    tcpseq: bool,

    /// Hex-dump TCP options
    #[arg(long)]
    tcpopt: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut flags = LogFlags::NONE;
    if args.ipopt {
        flags |= LogFlags::IPOPT;
    }
    if args.tcpseq {
        flags |= LogFlags::TCPSEQ;
    }
    if args.tcpopt {
        flags |= LogFlags::TCPOPT;
    }

    let target = match LogTarget::new(args.level, flags, &args.prefix) {
        Ok(target) => target,
        Err(e) => {
            error!("Invalid log target: {}", e);
            std::process::exit(1);
        }
    };
    let logger = Logger::new(target, io::stdout());

    info!("Reading PCAP file: {:?}", args.pcap);
    if let Err(e) = process_pcap(&args.pcap, &args.in_name, &logger) {
        error!("Failed to process PCAP file: {}", e);
        std::process::exit(1);
    }
    info!("PCAP processing completed!");
}

/// Process the capture packet by packet, logging every IPv6 frame.
fn process_pcap(
    pcap_path: &PathBuf,
    in_name: &str,
    logger: &Logger<io::Stdout>,
) -> Result<(), String> {
    let file = File::open(pcap_path).map_err(|e| format!("Failed to open {pcap_path:?}: {e}"))?;

    let mut packet_count: u64 = 0;
    let mut logged_count: u64 = 0;

    // Try PCAPNG first, fall back to legacy PCAP.
    match PcapNGReader::new(65536, file) {
        Ok(mut reader) => {
            info!("Detected PCAPNG format");
            loop {
                match reader.next() {
                    Ok((offset, block)) => {
                        match block {
                            PcapBlockOwned::NG(Block::EnhancedPacket(epb)) => {
                                packet_count += 1;
                                if log_frame(logger, in_name, epb.data, packet_count)? {
                                    logged_count += 1;
                                }
                            }
                            PcapBlockOwned::NG(Block::SimplePacket(spb)) => {
                                packet_count += 1;
                                if log_frame(logger, in_name, spb.data, packet_count)? {
                                    logged_count += 1;
                                }
                            }
                            PcapBlockOwned::NG(Block::SectionHeader(_shb)) => {
                                debug!("PCAPNG Section Header found");
                            }
                            PcapBlockOwned::NG(Block::InterfaceDescription(_idb)) => {
                                debug!("PCAPNG Interface Description found");
                            }
                            _ => {
                                // Other block types (interface statistics, etc.)
                            }
                        }
                        reader.consume(offset);
                    }
                    Err(PcapError::Eof) => break,
                    Err(PcapError::Incomplete(_)) => {
                        reader
                            .refill()
                            .map_err(|e| format!("Error refilling PCAPNG reader: {:?}", e))?;
                    }
                    Err(e) => {
                        return Err(format!("Error reading PCAPNG: {:?}", e));
                    }
                }
            }
        }
        Err(_) => {
            let file =
                File::open(pcap_path).map_err(|e| format!("Failed to open {pcap_path:?}: {e}"))?;

            let mut reader = LegacyPcapReader::new(65536, file)
                .map_err(|e| format!("Failed to create PCAP reader: {:?}", e))?;

            loop {
                match reader.next() {
                    Ok((offset, block)) => {
                        match block {
                            PcapBlockOwned::Legacy(packet) => {
                                packet_count += 1;
                                if log_frame(logger, in_name, packet.data, packet_count)? {
                                    logged_count += 1;
                                }
                            }
                            PcapBlockOwned::LegacyHeader(_header) => {
                                debug!("Legacy PCAP header found");
                            }
                            _ => {}
                        }
                        reader.consume(offset);
                    }
                    Err(PcapError::Eof) => break,
                    Err(PcapError::Incomplete(_)) => {
                        reader
                            .refill()
                            .map_err(|e| format!("Error refilling PCAP reader: {:?}", e))?;
                    }
                    Err(e) => {
                        return Err(format!("Error reading PCAP: {:?}", e));
                    }
                }
            }
        }
    }

    info!(
        "Processed {} frames, logged {} IPv6 packets",
        packet_count, logged_count
    );
    Ok(())
}

/// Log one Ethernet frame if it carries IPv6, skipping a single 802.1Q
/// tag. Non-IPv6 frames are counted and dropped.
fn log_frame(
    logger: &Logger<io::Stdout>,
    in_name: &str,
    data: &[u8],
    frame_no: u64,
) -> Result<bool, String> {
    let Some(network_offset) = ipv6_offset(data) else {
        debug!("Frame {} is not IPv6, skipping", frame_no);
        return Ok(false);
    };

    let view = PacketView::new(data);
    let info = PacketInfo {
        in_name,
        out_name: "",
        link: Some(LinkInfo {
            dev_type: DevType::Ethernet,
            hard_header_len: ETHER_HDR_LEN,
            mac_offset: 0,
        }),
        network_offset,
        ..Default::default()
    };

    logger
        .log(&view, &info)
        .map_err(|e| format!("Failed to write log line: {}", e))?;
    Ok(true)
}

/// Offset of the IPv6 header in an Ethernet frame, or None.
fn ipv6_offset(data: &[u8]) -> Option<usize> {
    if data.len() < ETHER_HDR_LEN {
        return None;
    }
    let ethertype = u16::from_be_bytes([data[12], data[13]]);
    if ethertype == ETHERTYPE_IPV6 {
        return Some(ETHER_HDR_LEN);
    }
    if ethertype == ETHERTYPE_VLAN && data.len() >= ETHER_HDR_LEN + 4 {
        let inner = u16::from_be_bytes([data[16], data[17]]);
        if inner == ETHERTYPE_IPV6 {
            return Some(ETHER_HDR_LEN + 4);
        }
    }
    None
}
