use std::net::{IpAddr, Ipv4Addr};
use std::ops::RangeInclusive;

use anyhow::bail;
use pnet::util::MacAddr;
use rand::Rng;
use starve_common::config::Mode;
use starve_common::network::interface::LinkInfo;
use starve_protocols::arp::ArpOp;
use starve_protocols::dhcp::{self, DhcpMessage, DhcpOption, MessageType};
use starve_protocols::{CaptureFilter, Captured, CapturedPacket, EthernetHeader, Frame, FramePayload};

use super::{Confirmation, Inbound, Lease, LeaseProtocol, OfferV4};
use crate::session::ServerIdentity;

/// Parameter request list in the order a stock macOS client sends it.
pub const PARAMETER_REQUEST_LIST: [u8; 10] = [1, 121, 3, 6, 15, 119, 252, 95, 44, 46];
pub const MAX_MESSAGE_SIZE: u16 = 1500;
pub const REQUESTED_LEASE_TIME: u32 = 10_000;
const HOSTNAME_LEN: usize = 8;
const HOSTNAME_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const XID_RANGE: RangeInclusive<u32> = 1..=900_000_000;

#[derive(Debug, Clone)]
pub struct V4Protocol {
    local: LinkInfo,
    router_mac: Option<MacAddr>,
}

impl V4Protocol {
    pub fn new(local: LinkInfo, router_mac: Option<MacAddr>) -> Self {
        Self { local, router_mac }
    }

    fn broadcast_frame(&self, message: DhcpMessage) -> Frame {
        Frame::new(
            EthernetHeader::new(self.local.mac, self.router_mac.unwrap_or(MacAddr::broadcast())),
            FramePayload::Dhcp {
                source: Ipv4Addr::UNSPECIFIED,
                destination: Ipv4Addr::BROADCAST,
                message,
            },
        )
    }
}

/// Eight characters out of `A-Z0-9`.
pub fn random_hostname() -> String {
    let mut rng = rand::rng();
    (0..HOSTNAME_LEN)
        .map(|_| char::from(HOSTNAME_CHARSET[rng.random_range(0..HOSTNAME_CHARSET.len())]))
        .collect()
}

fn server_id_of(message: &DhcpMessage, source: Ipv4Addr) -> Ipv4Addr {
    message
        .server_id()
        .or_else(|| (!message.siaddr.is_unspecified()).then_some(message.siaddr))
        .unwrap_or(source)
}

impl LeaseProtocol for V4Protocol {
    fn mode(&self) -> Mode {
        Mode::V4
    }

    fn capture_filter(&self) -> CaptureFilter {
        CaptureFilter::V4
    }

    fn transaction_id(&self) -> u32 {
        rand::rng().random_range(XID_RANGE)
    }

    fn build_discover(&self, client: MacAddr, xid: u32) -> anyhow::Result<Frame> {
        let message = DhcpMessage::request_header(xid, client)
            .with_flags(dhcp::BROADCAST_FLAG)
            .with_options(vec![
                DhcpOption::MessageType(MessageType::Discover),
                DhcpOption::ParameterRequestList(PARAMETER_REQUEST_LIST.to_vec()),
                DhcpOption::MaxMessageSize(MAX_MESSAGE_SIZE),
                DhcpOption::client_id_for(client),
                DhcpOption::LeaseTime(REQUESTED_LEASE_TIME),
                DhcpOption::Hostname(random_hostname()),
                DhcpOption::End,
            ]);
        Ok(self.broadcast_frame(message))
    }

    fn build_request(&self, lease: &Lease) -> anyhow::Result<Option<Frame>> {
        let Lease::V4(offer) = lease else {
            bail!("DHCPv4 cannot request a DHCPv6 lease");
        };
        let message = DhcpMessage::request_header(offer.xid(), offer.client_mac())
            .with_flags(dhcp::BROADCAST_FLAG)
            .with_options(vec![
                DhcpOption::MessageType(MessageType::Request),
                DhcpOption::ServerId(offer.server_id),
                DhcpOption::RequestedAddress(offer.offered()),
                DhcpOption::Hostname(random_hostname()),
                DhcpOption::End,
            ]);
        Ok(Some(self.broadcast_frame(message)))
    }

    fn build_release(
        &self,
        server: &ServerIdentity,
        client: MacAddr,
        addr: Ipv4Addr,
        xid: u32,
    ) -> anyhow::Result<Option<Frame>> {
        let IpAddr::V4(server_addr) = server.addr else {
            bail!("DHCPv4 release needs an IPv4 server, got {}", server.addr);
        };
        let message = DhcpMessage::request_header(xid, client)
            .with_ciaddr(addr)
            .with_options(vec![
                DhcpOption::MessageType(MessageType::Release),
                DhcpOption::ServerId(server_addr),
                DhcpOption::client_id_for(client),
                DhcpOption::End,
            ]);
        Ok(Some(Frame::new(
            EthernetHeader::new(client, server.mac),
            FramePayload::Dhcp {
                source: addr,
                destination: server_addr,
                message,
            },
        )))
    }

    fn classify(&self, captured: &Captured) -> Option<Inbound> {
        match &captured.packet {
            CapturedPacket::Dhcp {
                source, message, ..
            } if message.op == dhcp::BOOTREPLY => match message.message_type()? {
                MessageType::Offer => Some(Inbound::Offer(Lease::V4(OfferV4 {
                    server_id: server_id_of(message, *source),
                    server_mac: captured.ethernet.source,
                    source: *source,
                    message: message.clone(),
                }))),
                MessageType::Ack => Some(Inbound::Confirmation(Confirmation {
                    server: IpAddr::V4(server_id_of(message, *source)),
                    server_mac: captured.ethernet.source,
                    client_mac: Some(message.chaddr),
                    addr: Some(IpAddr::V4(message.yiaddr)),
                })),
                _ => None,
            },
            CapturedPacket::EchoRequest {
                source,
                destination,
                identifier,
                sequence,
            } => Some(Inbound::EchoRequest {
                requester: captured.ethernet.source,
                source: *source,
                destination: *destination,
                identifier: *identifier,
                sequence: *sequence,
            }),
            // our own knockoff replies carry a null sender
            CapturedPacket::Arp(arp) if arp.op == ArpOp::Reply && !arp.sender_hw.is_zero() => {
                Some(Inbound::ArpReply {
                    mac: arp.sender_hw,
                    addr: arp.sender_ip,
                })
            }
            CapturedPacket::Arp(arp) if arp.op == ArpOp::Request => Some(Inbound::ArpRequest {
                sender: arp.sender_ip,
                target: arp.target_ip,
            }),
            _ => None,
        }
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
