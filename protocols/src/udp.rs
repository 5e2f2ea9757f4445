use std::net::Ipv6Addr;

use anyhow::{Context, anyhow};
use pnet::packet::udp::{self, MutableUdpPacket};

use crate::UDP_HDR_LEN;

/// UDP datagram for IPv4. The checksum is left at zero (optional over IPv4).
pub fn create_packet(src_port: u16, dst_port: u16, payload: Vec<u8>) -> anyhow::Result<Vec<u8>> {
    let total_len: usize = UDP_HDR_LEN + payload.len();
    let length = u16::try_from(total_len).map_err(|_| anyhow!("udp datagram of {total_len} bytes is too long"))?;
    let mut buffer: Vec<u8> = vec![0u8; total_len];
    {
        let mut udp: MutableUdpPacket = MutableUdpPacket::new(&mut buffer).context("creating udp packet")?;
        udp.set_source(src_port);
        udp.set_destination(dst_port);
        udp.set_length(length);
        udp.set_payload(&payload);
        udp.set_checksum(0);
    }
    Ok(buffer)
}

/// UDP datagram for IPv6, where the checksum is mandatory.
pub fn create_packet_v6(
    src_addr: &Ipv6Addr,
    dst_addr: &Ipv6Addr,
    src_port: u16,
    dst_port: u16,
    payload: Vec<u8>,
) -> anyhow::Result<Vec<u8>> {
    let mut buffer = create_packet(src_port, dst_port, payload)?;
    {
        let mut udp: MutableUdpPacket = MutableUdpPacket::new(&mut buffer).context("creating udp packet")?;
        let csum = udp::ipv6_checksum(&udp.to_immutable(), src_addr, dst_addr);
        udp.set_checksum(csum);
    }
    Ok(buffer)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
