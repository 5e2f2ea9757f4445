use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pnet::ipnetwork::Ipv4Network;
use pnet::util::MacAddr;
use starve_common::config::{Config, Mode, Timeouts};
use starve_common::network::interface::LinkInfo;
use starve_core::link::MemoryLink;
use starve_protocols::arp::{ArpFrame, ArpOp};
use starve_protocols::dhcp::{self, DhcpMessage, DhcpOption, MessageType};
use starve_protocols::dhcpv6::{self, Dhcpv6Message, Dhcpv6Option};
use starve_protocols::{Captured, CapturedPacket, EthernetHeader, Frame, FramePayload};

pub const SERVER_MAC: MacAddr = MacAddr(0x00, 0x50, 0x56, 0xc0, 0x00, 0x01);
pub const SERVER_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);
pub const SERVER_MASK: Ipv4Addr = Ipv4Addr::new(255, 255, 255, 252);
pub const SERVER_DUID: [u8; 10] = [0, 3, 0, 1, 0x00, 0x50, 0x56, 0xc0, 0x00, 0x01];
pub const LOCAL_MAC: MacAddr = MacAddr(0x02, 0x42, 0, 0, 0, 9);

pub fn server_ll() -> Ipv6Addr {
    "fe80::1".parse().unwrap()
}

/// Local end on 10.0.0.9/29.
pub fn local() -> LinkInfo {
    LinkInfo {
        name: "veth0".into(),
        mac: LOCAL_MAC,
        ipv4_net: Some(Ipv4Network::new(Ipv4Addr::new(10, 0, 0, 9), 29).unwrap()),
        link_local: Some("fe80::9".parse().unwrap()),
    }
}

/// Millisecond timeouts so a whole run fits in a test.
pub fn fast_config(mode: Mode) -> Config {
    let mut cfg = Config::new("veth0");
    cfg.mode = mode;
    cfg.timeouts = Timeouts {
        sender_pacing: Duration::from_millis(1),
        exhaustion_wait: Duration::from_millis(5),
        server_retry: Duration::from_millis(5),
        capture_window: Duration::from_millis(30),
    };
    cfg
}

/// What the scripted server saw.
#[derive(Debug, Default)]
pub struct ServerLog {
    pub offers: AtomicU32,
    pub requests: AtomicU32,
    pub released: Mutex<Vec<Ipv4Addr>>,
    pub clients: Mutex<Vec<MacAddr>>,
}

impl ServerLog {
    pub fn offers(&self) -> u32 {
        self.offers.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> u32 {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> Vec<Ipv4Addr> {
        let mut released = self.released.lock().unwrap().clone();
        released.sort();
        released
    }

    pub fn clients(&self) -> Vec<MacAddr> {
        self.clients.lock().unwrap().clone()
    }
}

/// A DHCPv4 server with `pool` free leases, plus hosts answering ARP.
pub fn v4_network(pool: u32, neighbors: Vec<(MacAddr, Ipv4Addr)>) -> (MemoryLink, Arc<ServerLog>) {
    let log = Arc::new(ServerLog::default());
    let server = Arc::clone(&log);
    let link = MemoryLink::with_responder(move |frame| match &frame.payload {
        FramePayload::Dhcp { message, .. } => server.answer_v4(message, pool),
        FramePayload::Arp(arp) if arp.op == ArpOp::Request => neighbors
            .iter()
            .filter(|(_, addr)| *addr == arp.target_ip)
            .map(|(mac, addr)| arp_reply(*mac, *addr, arp))
            .collect(),
        _ => Vec::new(),
    });
    (link, log)
}

impl ServerLog {
    fn answer_v4(&self, message: &DhcpMessage, pool: u32) -> Vec<Captured> {
        match message.message_type() {
            Some(MessageType::Discover) => {
                self.clients.lock().unwrap().push(message.chaddr);
                let leased = self.offers.load(Ordering::SeqCst);
                if leased >= pool {
                    return Vec::new();
                }
                self.offers.fetch_add(1, Ordering::SeqCst);
                let offered = Ipv4Addr::from(u32::from(Ipv4Addr::new(10, 0, 1, 0)) + leased);
                vec![v4_reply(message, MessageType::Offer, offered)]
            }
            Some(MessageType::Request) => {
                self.requests.fetch_add(1, Ordering::SeqCst);
                let requested = message.requested_address().unwrap_or(Ipv4Addr::UNSPECIFIED);
                vec![v4_reply(message, MessageType::Ack, requested)]
            }
            Some(MessageType::Release) => {
                self.released.lock().unwrap().push(message.ciaddr);
                Vec::new()
            }
            _ => Vec::new(),
        }
    }
}

fn v4_reply(request: &DhcpMessage, kind: MessageType, yiaddr: Ipv4Addr) -> Captured {
    let mut reply = DhcpMessage::request_header(request.xid, request.chaddr).with_options(vec![
        DhcpOption::MessageType(kind),
        DhcpOption::ServerId(SERVER_IP),
        DhcpOption::SubnetMask(SERVER_MASK),
        DhcpOption::LeaseTime(3600),
        DhcpOption::End,
    ]);
    reply.op = dhcp::BOOTREPLY;
    reply.yiaddr = yiaddr;
    Captured {
        ethernet: EthernetHeader::new(SERVER_MAC, MacAddr::broadcast()),
        packet: CapturedPacket::Dhcp {
            source: SERVER_IP,
            destination: Ipv4Addr::BROADCAST,
            message: reply,
        },
    }
}

fn arp_reply(mac: MacAddr, addr: Ipv4Addr, request: &ArpFrame) -> Captured {
    Captured {
        ethernet: EthernetHeader::new(mac, request.sender_hw),
        packet: CapturedPacket::Arp(ArpFrame {
            op: ArpOp::Reply,
            sender_hw: mac,
            sender_ip: addr,
            target_hw: request.sender_hw,
            target_ip: request.sender_ip,
        }),
    }
}

/// A DHCPv6 server with `pool` free addresses. With `rapid_commit` it
/// answers a rapid-commit solicit with an advertise followed by a reply.
pub fn v6_network(pool: u32, rapid_commit: bool) -> (MemoryLink, Arc<ServerLog>) {
    let log = Arc::new(ServerLog::default());
    let server = Arc::clone(&log);
    let link = MemoryLink::with_responder(move |frame| server.answer_v6(frame, pool, rapid_commit));
    (link, log)
}

impl ServerLog {
    fn answer_v6(&self, frame: &Frame, pool: u32, rapid_commit: bool) -> Vec<Captured> {
        let Some(message) = frame.dhcpv6() else {
            return Vec::new();
        };
        let client = frame.ethernet.source;
        match message.msg_type {
            dhcpv6::MessageType::Solicit => {
                self.clients.lock().unwrap().push(client);
                let leased = self.offers.load(Ordering::SeqCst);
                if leased >= pool {
                    return Vec::new();
                }
                self.offers.fetch_add(1, Ordering::SeqCst);
                let addr: Ipv6Addr = format!("2001:db8::{:x}", leased + 1).parse().unwrap();
                let advertise = v6_reply(message, dhcpv6::MessageType::Advertise, client, addr);
                if rapid_commit && message.has_rapid_commit() {
                    let reply = v6_reply(message, dhcpv6::MessageType::Reply, client, addr);
                    return vec![advertise, reply];
                }
                vec![advertise]
            }
            dhcpv6::MessageType::Request => {
                self.requests.fetch_add(1, Ordering::SeqCst);
                let addr = message
                    .ia_na()
                    .and_then(Dhcpv6Option::assigned_address)
                    .unwrap_or(Ipv6Addr::UNSPECIFIED);
                vec![v6_reply(message, dhcpv6::MessageType::Reply, client, addr)]
            }
            _ => Vec::new(),
        }
    }
}

fn v6_reply(request: &Dhcpv6Message, kind: dhcpv6::MessageType, client: MacAddr, addr: Ipv6Addr) -> Captured {
    let client_id = request.client_id().unwrap_or_default().to_vec();
    Captured {
        ethernet: EthernetHeader::new(SERVER_MAC, client),
        packet: CapturedPacket::Dhcpv6 {
            source: server_ll(),
            destination: "fe80::9".parse().unwrap(),
            message: Dhcpv6Message::new(
                kind,
                request.transaction_id,
                vec![
                    Dhcpv6Option::ClientId(client_id),
                    Dhcpv6Option::ServerId(SERVER_DUID.to_vec()),
                    Dhcpv6Option::IaNa {
                        iaid: 0xf,
                        t1: 0,
                        t2: 0,
                        options: vec![Dhcpv6Option::IaAddress {
                            addr,
                            preferred: 300,
                            valid: 600,
                            options: Vec::new(),
                        }],
                    },
                ],
            ),
        },
    }
}

/// Every request the engine sent, in order.
pub fn sent_requests(link: &MemoryLink) -> Vec<DhcpMessage> {
    link.sent()
        .iter()
        .filter_map(Frame::dhcp)
        .filter(|m| m.message_type() == Some(MessageType::Request))
        .cloned()
        .collect()
}
