use std::net::Ipv4Addr;

use anyhow::Context;
use pnet::packet::arp::{ArpHardwareTypes, ArpOperation, ArpOperations, ArpPacket, MutableArpPacket};
use pnet::packet::ethernet::EtherTypes;
use pnet::util::MacAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArpOp {
    Request,
    Reply,
}

impl ArpOp {
    fn to_pnet(self) -> ArpOperation {
        match self {
            ArpOp::Request => ArpOperations::Request,
            ArpOp::Reply => ArpOperations::Reply,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArpFrame {
    pub op: ArpOp,
    pub sender_hw: MacAddr,
    pub sender_ip: Ipv4Addr,
    pub target_hw: MacAddr,
    pub target_ip: Ipv4Addr,
}

impl ArpFrame {
    /// Who-has `target_ip`, with a zeroed target hardware address.
    pub fn request(sender_hw: MacAddr, sender_ip: Ipv4Addr, target_ip: Ipv4Addr) -> Self {
        Self {
            op: ArpOp::Request,
            sender_hw,
            sender_ip,
            target_hw: MacAddr::zero(),
            target_ip,
        }
    }

    pub fn write(&self, buffer: &mut [u8]) -> anyhow::Result<()> {
        let mut arp = MutableArpPacket::new(buffer).context("creating arp packet")?;
        arp.set_hardware_type(ArpHardwareTypes::Ethernet);
        arp.set_protocol_type(EtherTypes::Ipv4);
        arp.set_hw_addr_len(6);
        arp.set_proto_addr_len(4);
        arp.set_operation(self.op.to_pnet());
        arp.set_sender_hw_addr(self.sender_hw);
        arp.set_sender_proto_addr(self.sender_ip);
        arp.set_target_hw_addr(self.target_hw);
        arp.set_target_proto_addr(self.target_ip);
        Ok(())
    }

    /// Ethernet/IPv4 requests and replies only.
    pub fn read(arp: &ArpPacket) -> Option<Self> {
        if arp.get_hardware_type() != ArpHardwareTypes::Ethernet
            || arp.get_protocol_type() != EtherTypes::Ipv4
        {
            return None;
        }
        let op = match arp.get_operation() {
            op if op == ArpOperations::Request => ArpOp::Request,
            op if op == ArpOperations::Reply => ArpOp::Reply,
            _ => return None,
        };
        Some(Self {
            op,
            sender_hw: arp.get_sender_hw_addr(),
            sender_ip: arp.get_sender_proto_addr(),
            target_hw: arp.get_target_hw_addr(),
            target_ip: arp.get_target_proto_addr(),
        })
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
