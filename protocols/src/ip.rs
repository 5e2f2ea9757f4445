use std::net::{Ipv4Addr, Ipv6Addr};

use anyhow::{Context, anyhow};
use pnet::packet::ip::IpNextHeaderProtocol;
use pnet::packet::ipv4::{self, Ipv4Flags, MutableIpv4Packet};
use pnet::packet::ipv6::MutableIpv6Packet;

use crate::{IP_V4_HDR_LEN, IP_V6_HDR_LEN};

const TTL: u8 = 64;

/// Writes an IPv4 header (no options) at the start of `buffer`.
pub fn create_ipv4_header(
    buffer: &mut [u8],
    src_addr: Ipv4Addr,
    dst_addr: Ipv4Addr,
    protocol: IpNextHeaderProtocol,
    payload_len: usize,
) -> anyhow::Result<()> {
    let total_len = IP_V4_HDR_LEN + payload_len;
    let total_len = u16::try_from(total_len).map_err(|_| anyhow!("ipv4 packet of {total_len} bytes is too long"))?;
    let mut ip = MutableIpv4Packet::new(buffer).context("creating ipv4 header")?;
    ip.set_version(4);
    ip.set_header_length((IP_V4_HDR_LEN / 4) as u8);
    ip.set_total_length(total_len);
    ip.set_identification(rand::random());
    ip.set_flags(Ipv4Flags::DontFragment);
    ip.set_ttl(TTL);
    ip.set_next_level_protocol(protocol);
    ip.set_source(src_addr);
    ip.set_destination(dst_addr);
    ip.set_checksum(0);
    let csum = ipv4::checksum(&ip.to_immutable());
    ip.set_checksum(csum);
    Ok(())
}

pub fn create_ipv6_header(
    buffer: &mut [u8],
    src_addr: Ipv6Addr,
    dst_addr: Ipv6Addr,
    next_header: IpNextHeaderProtocol,
    payload_len: usize,
) -> anyhow::Result<()> {
    let payload_len = u16::try_from(payload_len).map_err(|_| anyhow!("ipv6 payload of {payload_len} bytes is too long"))?;
    let header_len = IP_V6_HDR_LEN.min(buffer.len());
    let mut ip = MutableIpv6Packet::new(&mut buffer[..header_len])
        .context("creating ipv6 header")?;
    ip.set_version(6);
    ip.set_payload_length(payload_len);
    ip.set_next_header(next_header);
    ip.set_hop_limit(TTL);
    ip.set_source(src_addr);
    ip.set_destination(dst_addr);
    Ok(())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
