//! Frame encoding and capture decoding on top of `pnet` packet views.

use pnet::packet::Packet;
use pnet::packet::arp::ArpPacket;
use pnet::packet::ethernet::{EtherTypes, EthernetPacket};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::ipv6::Ipv6Packet;
use pnet::packet::udp::UdpPacket;

use crate::arp::ArpFrame;
use crate::dhcp::{self, DhcpMessage};
use crate::dhcpv6::{self, Dhcpv6Message};
use crate::frame::{Captured, CapturedPacket, EchoReply, EthernetHeader, Frame, FramePayload};
use crate::{ARP_LEN, ETH_HDR_LEN, IP_V4_HDR_LEN, IP_V6_HDR_LEN, UDP_HDR_LEN, ethernet, fuzz, icmp, ip, udp};

/// Serializes `frame`. With `fuzz` set, DHCP payloads are randomized before
/// the UDP header is computed.
pub fn encode(frame: &Frame, fuzz: bool) -> anyhow::Result<Vec<u8>> {
    let EthernetHeader {
        source,
        destination,
    } = frame.ethernet;
    match &frame.payload {
        FramePayload::Arp(arp) => {
            let mut pkt = vec![0u8; ETH_HDR_LEN + ARP_LEN];
            ethernet::make_header(&mut pkt, source, destination, EtherTypes::Arp)?;
            arp.write(&mut pkt[ETH_HDR_LEN..])?;
            Ok(pkt)
        }
        FramePayload::EchoReply(EchoReply {
            source: src_addr,
            destination: dst_addr,
            identifier,
            sequence,
            payload,
        }) => {
            let echo = icmp::create_echo_reply(*identifier, *sequence, payload)?;
            let mut pkt = vec![0u8; ETH_HDR_LEN + IP_V4_HDR_LEN + echo.len()];
            ethernet::make_header(&mut pkt, source, destination, EtherTypes::Ipv4)?;
            ip::create_ipv4_header(
                &mut pkt[ETH_HDR_LEN..],
                *src_addr,
                *dst_addr,
                IpNextHeaderProtocols::Icmp,
                echo.len(),
            )?;
            pkt[ETH_HDR_LEN + IP_V4_HDR_LEN..].copy_from_slice(&echo);
            Ok(pkt)
        }
        FramePayload::Dhcp {
            source: src_addr,
            destination: dst_addr,
            message,
        } => {
            let mut payload = message.to_bytes();
            if fuzz {
                fuzz::mutate(&mut payload);
            }
            let datagram = udp::create_packet(dhcp::CLIENT_PORT, dhcp::SERVER_PORT, payload)?;
            let mut pkt = vec![0u8; ETH_HDR_LEN + IP_V4_HDR_LEN + datagram.len()];
            ethernet::make_header(&mut pkt, source, destination, EtherTypes::Ipv4)?;
            ip::create_ipv4_header(
                &mut pkt[ETH_HDR_LEN..],
                *src_addr,
                *dst_addr,
                IpNextHeaderProtocols::Udp,
                datagram.len(),
            )?;
            pkt[ETH_HDR_LEN + IP_V4_HDR_LEN..].copy_from_slice(&datagram);
            Ok(pkt)
        }
        FramePayload::Dhcpv6 {
            source: src_addr,
            destination: dst_addr,
            message,
        } => {
            let mut payload = message.to_bytes();
            if fuzz {
                fuzz::mutate(&mut payload);
            }
            let datagram = udp::create_packet_v6(
                src_addr,
                dst_addr,
                dhcpv6::CLIENT_PORT,
                dhcpv6::SERVER_PORT,
                payload,
            )?;
            let mut pkt = vec![0u8; ETH_HDR_LEN + IP_V6_HDR_LEN + datagram.len()];
            ethernet::make_header(&mut pkt, source, destination, EtherTypes::Ipv6)?;
            ip::create_ipv6_header(
                &mut pkt[ETH_HDR_LEN..],
                *src_addr,
                *dst_addr,
                IpNextHeaderProtocols::Udp,
                datagram.len(),
            )?;
            pkt[ETH_HDR_LEN + IP_V6_HDR_LEN..].copy_from_slice(&datagram);
            Ok(pkt)
        }
    }
}

/// Recognizes the inbound traffic the engine reacts to. Anything else,
/// including malformed packets, yields `None`.
pub fn decode(bytes: &[u8]) -> Option<Captured> {
    let eth = EthernetPacket::new(bytes)?;
    let ethernet = EthernetHeader::new(eth.get_source(), eth.get_destination());
    let packet = match eth.get_ethertype() {
        EtherTypes::Arp => CapturedPacket::Arp(ArpFrame::read(&ArpPacket::new(eth.payload())?)?),
        EtherTypes::Ipv4 => decode_ipv4(&Ipv4Packet::new(eth.payload())?)?,
        EtherTypes::Ipv6 => decode_ipv6(&Ipv6Packet::new(eth.payload())?)?,
        _ => return None,
    };
    Some(Captured { ethernet, packet })
}

fn decode_ipv4(ip: &Ipv4Packet) -> Option<CapturedPacket> {
    let (source, destination) = (ip.get_source(), ip.get_destination());
    match ip.get_next_level_protocol() {
        IpNextHeaderProtocols::Udp => {
            let datagram = UdpPacket::new(ip.payload())?;
            if datagram.get_source() != dhcp::SERVER_PORT || datagram.get_destination() != dhcp::CLIENT_PORT {
                return None;
            }
            let message = DhcpMessage::parse(udp_payload(&datagram)).ok()?;
            Some(CapturedPacket::Dhcp {
                source,
                destination,
                message,
            })
        }
        IpNextHeaderProtocols::Icmp => {
            let (identifier, sequence) = icmp::read_echo_request(ip.payload())?;
            Some(CapturedPacket::EchoRequest {
                source,
                destination,
                identifier,
                sequence,
            })
        }
        _ => None,
    }
}

fn decode_ipv6(ip: &Ipv6Packet) -> Option<CapturedPacket> {
    let (source, destination) = (ip.get_source(), ip.get_destination());
    match ip.get_next_header() {
        IpNextHeaderProtocols::Udp => {
            let datagram = UdpPacket::new(ip.payload())?;
            if datagram.get_source() != dhcpv6::SERVER_PORT
                || datagram.get_destination() != dhcpv6::CLIENT_PORT
            {
                return None;
            }
            let message = Dhcpv6Message::parse(udp_payload(&datagram)).ok()?;
            Some(CapturedPacket::Dhcpv6 {
                source,
                destination,
                message,
            })
        }
        IpNextHeaderProtocols::Icmpv6 => {
            let target = icmp::read_neighbor_solicit(ip.payload())?;
            Some(CapturedPacket::NeighborSolicit { source, target })
        }
        _ => None,
    }
}

/// UDP payload trimmed to the length the header announces.
fn udp_payload<'a>(datagram: &'a UdpPacket<'a>) -> &'a [u8] {
    let payload = datagram.payload();
    let announced = usize::from(datagram.get_length()).saturating_sub(UDP_HDR_LEN);
    &payload[..announced.min(payload.len())]
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
