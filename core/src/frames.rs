//! Builders for the ARP and ICMP frames the engine emits.

use std::net::Ipv4Addr;

use pnet::util::MacAddr;
use starve_protocols::arp::{ArpFrame, ArpOp};
use starve_protocols::frame::EchoReply;
use starve_protocols::icmp::ECHO_REPLY_PAYLOAD;
use starve_protocols::{EthernetHeader, Frame, FramePayload};

/// Broadcast who-has for `target`.
pub fn arp_probe(local_mac: MacAddr, local_ip: Ipv4Addr, target: Ipv4Addr) -> Frame {
    Frame::new(
        EthernetHeader::new(local_mac, MacAddr::broadcast()),
        FramePayload::Arp(ArpFrame::request(local_mac, local_ip, target)),
    )
}

/// Unsolicited reply claiming that `addr` lives at the null hardware address.
pub fn gratuitous_arp(identity: MacAddr, addr: Ipv4Addr) -> Frame {
    Frame::new(
        EthernetHeader::new(identity, MacAddr::broadcast()),
        FramePayload::Arp(ArpFrame {
            op: ArpOp::Reply,
            sender_hw: MacAddr::zero(),
            sender_ip: addr,
            target_hw: MacAddr::zero(),
            target_ip: addr,
        }),
    )
}

/// Answer to an echo request `requester` sent from `source` to `destination`.
pub fn echo_reply(
    identity: MacAddr,
    requester: MacAddr,
    source: Ipv4Addr,
    destination: Ipv4Addr,
    identifier: u16,
    sequence: u16,
) -> Frame {
    Frame::new(
        EthernetHeader::new(identity, requester),
        FramePayload::EchoReply(EchoReply {
            source: destination,
            destination: source,
            identifier,
            sequence,
            payload: ECHO_REPLY_PAYLOAD.to_vec(),
        }),
    )
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
