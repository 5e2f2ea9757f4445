//! Structured frame descriptions.
//!
//! The engine only ever builds [`Frame`]s and inspects [`Captured`] packets;
//! turning them into bytes and back is the job of [`crate::wire`].

use std::net::{Ipv4Addr, Ipv6Addr};

use pnet::util::MacAddr;

use crate::arp::{ArpFrame, ArpOp};
use crate::dhcp::DhcpMessage;
use crate::dhcpv6::Dhcpv6Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetHeader {
    pub source: MacAddr,
    pub destination: MacAddr,
}

impl EthernetHeader {
    pub fn new(source: MacAddr, destination: MacAddr) -> Self {
        Self {
            source,
            destination,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoReply {
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
    pub identifier: u16,
    pub sequence: u16,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramePayload {
    Arp(ArpFrame),
    EchoReply(EchoReply),
    /// IPv4/UDP from the client port to the server port.
    Dhcp {
        source: Ipv4Addr,
        destination: Ipv4Addr,
        message: DhcpMessage,
    },
    /// IPv6/UDP from the client port to the server port.
    Dhcpv6 {
        source: Ipv6Addr,
        destination: Ipv6Addr,
        message: Dhcpv6Message,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub ethernet: EthernetHeader,
    pub payload: FramePayload,
}

impl Frame {
    pub fn new(ethernet: EthernetHeader, payload: FramePayload) -> Self {
        Self { ethernet, payload }
    }

    pub fn dhcp(&self) -> Option<&DhcpMessage> {
        match &self.payload {
            FramePayload::Dhcp { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn dhcpv6(&self) -> Option<&Dhcpv6Message> {
        match &self.payload {
            FramePayload::Dhcpv6 { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn arp(&self) -> Option<&ArpFrame> {
        match &self.payload {
            FramePayload::Arp(arp) => Some(arp),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapturedPacket {
    /// DHCP sent from the server port to the client port.
    Dhcp {
        source: Ipv4Addr,
        destination: Ipv4Addr,
        message: DhcpMessage,
    },
    Dhcpv6 {
        source: Ipv6Addr,
        destination: Ipv6Addr,
        message: Dhcpv6Message,
    },
    EchoRequest {
        source: Ipv4Addr,
        destination: Ipv4Addr,
        identifier: u16,
        sequence: u16,
    },
    Arp(ArpFrame),
    NeighborSolicit {
        source: Ipv6Addr,
        target: Ipv6Addr,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captured {
    pub ethernet: EthernetHeader,
    pub packet: CapturedPacket,
}

/// Capture filter per address family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureFilter {
    V4,
    V6,
}

impl CaptureFilter {
    /// The equivalent BPF expression.
    pub fn expression(&self) -> &'static str {
        match self {
            CaptureFilter::V4 => "arp or icmp or (udp and src port 67 and dst port 68)",
            CaptureFilter::V6 => "icmp6 or (udp and src port 547 and dst port 546)",
        }
    }

    pub fn matches(&self, captured: &Captured) -> bool {
        match (self, &captured.packet) {
            (
                CaptureFilter::V4,
                CapturedPacket::Dhcp { .. } | CapturedPacket::EchoRequest { .. } | CapturedPacket::Arp(_),
            ) => true,
            (CaptureFilter::V6, CapturedPacket::Dhcpv6 { .. } | CapturedPacket::NeighborSolicit { .. }) => true,
            _ => false,
        }
    }
}

impl Captured {
    pub fn is_arp(&self, op: ArpOp) -> bool {
        matches!(&self.packet, CapturedPacket::Arp(arp) if arp.op == op)
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
