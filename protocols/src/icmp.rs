use std::net::Ipv6Addr;

use anyhow::Context;
use pnet::packet::Packet;
use pnet::packet::icmp::echo_reply::MutableEchoReplyPacket;
use pnet::packet::icmp::echo_request::EchoRequestPacket;
use pnet::packet::icmp::{self, IcmpCode, IcmpPacket, IcmpTypes};
use pnet::packet::icmpv6::ndp::NeighborSolicitPacket;
use pnet::packet::icmpv6::{Icmpv6Packet, Icmpv6Types};

const ECHO_HDR_LEN: usize = 8;

/// Payload carried by every echo reply the engine sends.
pub const ECHO_REPLY_PAYLOAD: &[u8] = b"12345678912345678912";

pub fn create_echo_reply(identifier: u16, sequence: u16, payload: &[u8]) -> anyhow::Result<Vec<u8>> {
    let mut buffer = vec![0u8; ECHO_HDR_LEN + payload.len()];
    {
        let mut echo = MutableEchoReplyPacket::new(&mut buffer).context("creating echo reply")?;
        echo.set_icmp_type(IcmpTypes::EchoReply);
        echo.set_icmp_code(IcmpCode(0));
        echo.set_identifier(identifier);
        echo.set_sequence_number(sequence);
        echo.set_payload(payload);
        echo.set_checksum(0);
    }
    let csum = icmp::checksum(&IcmpPacket::new(&buffer).context("reading echo reply")?);
    buffer[2..4].copy_from_slice(&csum.to_be_bytes());
    Ok(buffer)
}

/// Identifier and sequence number of an echo request.
pub fn read_echo_request(bytes: &[u8]) -> Option<(u16, u16)> {
    let icmp = IcmpPacket::new(bytes)?;
    if icmp.get_icmp_type() != IcmpTypes::EchoRequest {
        return None;
    }
    let echo = EchoRequestPacket::new(icmp.packet())?;
    Some((echo.get_identifier(), echo.get_sequence_number()))
}

/// Target address of a neighbor solicitation.
pub fn read_neighbor_solicit(bytes: &[u8]) -> Option<Ipv6Addr> {
    let icmp = Icmpv6Packet::new(bytes)?;
    if icmp.get_icmpv6_type() != Icmpv6Types::NeighborSolicit {
        return None;
    }
    NeighborSolicitPacket::new(icmp.packet()).map(|ns| ns.get_target_addr())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use pnet::packet::icmp::echo_reply::EchoReplyPacket;
    use pnet::packet::icmp::echo_request::MutableEchoRequestPacket;
    use pnet::packet::icmpv6::ndp::MutableNeighborSolicitPacket;

    #[test]
    fn echo_reply_fields_and_checksum() {
        let bytes = create_echo_reply(0x1234, 7, ECHO_REPLY_PAYLOAD).unwrap();
        let reply = EchoReplyPacket::new(&bytes).unwrap();
        assert_eq!(reply.get_icmp_type(), IcmpTypes::EchoReply);
        assert_eq!(reply.get_identifier(), 0x1234);
        assert_eq!(reply.get_sequence_number(), 7);
        assert_eq!(reply.payload(), ECHO_REPLY_PAYLOAD);

        let generic = IcmpPacket::new(&bytes).unwrap();
        assert_eq!(generic.get_checksum(), icmp::checksum(&generic));
    }

    #[test]
    fn echo_request_is_read_back() {
        let mut buf = [0u8; ECHO_HDR_LEN + 4];
        {
            let mut req = MutableEchoRequestPacket::new(&mut buf).unwrap();
            req.set_icmp_type(IcmpTypes::EchoRequest);
            req.set_identifier(42);
            req.set_sequence_number(3);
        }
        assert_eq!(read_echo_request(&buf), Some((42, 3)));

        let reply = create_echo_reply(1, 1, &[]).unwrap();
        assert_eq!(read_echo_request(&reply), None);
    }

    #[test]
    fn neighbor_solicit_target() {
        let target: Ipv6Addr = "fe80::beef".parse().unwrap();
        let mut buf = [0u8; 24];
        {
            let mut ns = MutableNeighborSolicitPacket::new(&mut buf).unwrap();
            ns.set_icmpv6_type(Icmpv6Types::NeighborSolicit);
            ns.set_target_addr(target);
        }
        assert_eq!(read_neighbor_solicit(&buf), Some(target));
        assert_eq!(read_neighbor_solicit(&[128, 0, 0, 0]), None);
    }
}
