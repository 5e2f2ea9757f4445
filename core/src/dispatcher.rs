//! The listener loop, sole writer of the session.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use starve_common::config::{Display, IDLE_WINDOW_LIMIT};
use starve_common::network::mac;
use starve_common::{link_received, link_sent, notice, received, sent};
use starve_protocols::CaptureFilter;
use tokio::time::Instant;

use crate::frames;
use crate::identity::IdentityPool;
use crate::link::PacketLink;
use crate::protocol::{Confirmation, Inbound, Lease, LeaseProtocol};
use crate::sender::hex;
use crate::session::SessionWriter;
use crate::stop::StopSignal;

/// Consecutive capture windows without an offer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IdleWindows {
    count: u32,
}

impl IdleWindows {
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Accounts for one finished window. Returns `true` once the limit of
    /// consecutive idle windows is reached.
    pub fn close_window(&mut self, saw_offer: bool) -> bool {
        if saw_offer {
            self.count = 0;
            return false;
        }
        if self.count > 0 {
            notice!("timeout waiting on dhcp packet count {}", self.count);
        }
        self.count += 1;
        self.count >= IDLE_WINDOW_LIMIT
    }
}

pub struct Dispatcher {
    pub link: Arc<dyn PacketLink>,
    pub protocol: Arc<dyn LeaseProtocol>,
    pub identities: Arc<IdentityPool>,
    pub session: SessionWriter,
    pub stop: StopSignal,
    pub display: Display,
    pub capture_window: Duration,
    /// Disables exhaustion detection.
    pub fuzz: bool,
    pub protected_server: Option<Ipv4Addr>,
}

impl Dispatcher {
    pub async fn run(self) -> anyhow::Result<()> {
        tracing::debug!("Thread 0 - (Sniffer) READY");
        let filter = self.protocol.capture_filter();
        let view = self.session.view();
        let mut idle = IdleWindows::default();

        while !self.stop.is_triggered() && !view.is_exhausted() {
            let saw_offer = self.capture_window(&filter).await?;
            if self.stop.is_triggered() {
                break;
            }
            if idle.close_window(saw_offer) && !self.fuzz {
                if self.session.mark_exhausted() {
                    notice!("no offers for {} capture windows, pool exhausted", idle.count());
                }
                break;
            }
        }
        tracing::debug!("Thread 0 - (Sniffer) done");
        Ok(())
    }

    /// Handles everything captured until the window closes. Returns whether an
    /// offer or any DHCPv6 advertise was seen.
    async fn capture_window(&self, filter: &CaptureFilter) -> anyhow::Result<bool> {
        let deadline = Instant::now() + self.capture_window;
        let mut saw_offer = false;
        loop {
            let captured = tokio::select! {
                captured = self.link.capture_until(filter, deadline) => captured.context("capturing")?,
                _ = self.stop.stopped() => return Ok(saw_offer),
            };
            let Some(captured) = captured else {
                return Ok(saw_offer);
            };
            if let Some(inbound) = self.protocol.classify(&captured) {
                saw_offer |= self.handle(inbound)?;
            }
        }
    }

    fn handle(&self, inbound: Inbound) -> anyhow::Result<bool> {
        match inbound {
            Inbound::Offer(lease) => self.on_offer(lease),
            Inbound::EmptyAdvertise { server_mac } => {
                tracing::debug!("v6 ADVERTISE FROM [{server_mac}] without an address");
                Ok(true)
            }
            Inbound::Confirmation(confirmation) => {
                if self.display.show_lease_confirm {
                    log_confirmation(&confirmation);
                }
                Ok(false)
            }
            Inbound::EchoRequest {
                requester,
                source,
                destination,
                identifier,
                sequence,
            } => {
                if self.display.show_icmp {
                    link_received!("ICMP_Request {source} for {destination}");
                }
                let reply = frames::echo_reply(
                    self.identities.next(),
                    requester,
                    source,
                    destination,
                    identifier,
                    sequence,
                );
                self.link.send(&reply).context("sending echo reply")?;
                if self.display.show_icmp {
                    link_sent!("ICMP_Reply {destination} to {source}");
                }
                tracing::debug!("{reply:?}");
                Ok(false)
            }
            Inbound::ArpReply { mac, addr } => {
                if self.session.record_neighbor(mac, addr) && self.display.show_arp {
                    link_received!("ARP_Response {addr} : {mac}");
                }
                Ok(false)
            }
            Inbound::ArpRequest { sender, target } => {
                if self.display.show_arp {
                    tracing::debug!("ARP_Request {target} from {sender}");
                }
                Ok(false)
            }
            Inbound::NeighborSolicit { source, target } => {
                if self.display.show_icmp {
                    link_received!("v6 ICMP REQUEST FROM [{source}] -> [{target}]");
                }
                Ok(false)
            }
        }
    }

    fn on_offer(&self, lease: Lease) -> anyhow::Result<bool> {
        let server = lease.server();
        match &lease {
            Lease::V4(_) => received!("DHCP_Offer   {lease}"),
            Lease::V6(record) => received!(
                "v6 ADVERTISE FROM [{}] -> [{}] - LEASE: IPv6[{}]",
                hex(&record.server_duid),
                record.client_mac,
                record.assigned.map(|a| a.to_string()).unwrap_or_default()
            ),
        }
        if let (Some(protected), IpAddr::V4(addr)) = (self.protected_server, server.addr) {
            if addr == protected {
                tracing::info!("skipped protected server {protected}");
                return Ok(false);
            }
        }

        if self.session.record_server(server, lease.subnet_mask()) {
            let vendor = mac::get_vendor(server.mac).unwrap_or_else(|| "unknown vendor".to_string());
            notice!("DHCP server {} at {} ({vendor})", server.addr, server.mac);
        }
        if let Lease::V6(record) = &lease {
            self.session.record_advertise(record.clone());
        }
        if self.display.show_options {
            dump_options(&lease);
        }

        if let Some(request) = self.protocol.build_request(&lease)? {
            self.link.send(&request).context("sending request")?;
            match &lease {
                Lease::V4(offer) => sent!("DHCP_Request {}", offer.offered()),
                Lease::V6(record) => sent!(
                    "v6 REQUEST ACK IPv6[{}]",
                    record.assigned.map(|a| a.to_string()).unwrap_or_default()
                ),
            }
        }
        Ok(true)
    }
}

fn log_confirmation(confirmation: &Confirmation) {
    let addr = confirmation.addr.map(|a| a.to_string()).unwrap_or_default();
    let client = confirmation
        .client_mac
        .map(|m| m.to_string())
        .unwrap_or_default();
    match confirmation.server {
        IpAddr::V4(server) => link_received!(
            "DHCP_ACK   {}\t{server} IP: {addr} for MAC=[{client}]",
            confirmation.server_mac
        ),
        IpAddr::V6(server) => {
            link_received!("v6 DHCP REPLY FROM [{server}] -> [{client}] - LEASE: IPv6[{addr}]")
        }
    }
}

fn dump_options(lease: &Lease) {
    match lease {
        Lease::V4(offer) => {
            let m = &offer.message;
            tracing::debug!("\t* xid={}", m.xid);
            tracing::debug!("\t* CIaddr={}", m.ciaddr);
            tracing::debug!("\t* YIaddr={}", m.yiaddr);
            tracing::debug!("\t* SIaddr={}", m.siaddr);
            tracing::debug!("\t* GIaddr={}", m.giaddr);
            tracing::debug!("\t* CHaddr={}", m.chaddr);
            for option in &m.options {
                tracing::debug!("\t\t* {option:?}");
            }
        }
        Lease::V6(record) => {
            tracing::debug!("\t* trid={:06x}", record.transaction_id);
            tracing::debug!("\t* client id={}", hex(&record.client_duid));
            tracing::debug!("\t* server id={}", hex(&record.server_duid));
            if let Some(ia_na) = &record.ia_na {
                tracing::debug!("\t* {ia_na:?}");
            }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::MemoryLink;
    use crate::protocol::{V4Protocol, V6Protocol};
    use crate::session::{self, SessionSettings, SessionView};
    use pnet::ipnetwork::Ipv4Network;
    use pnet::util::MacAddr;
    use starve_common::config::Mode;
    use starve_common::network::interface::LinkInfo;
    use starve_protocols::arp::{ArpFrame, ArpOp};
    use starve_protocols::dhcp::{self, DhcpMessage, DhcpOption, MessageType};
    use starve_protocols::dhcpv6::{self, Dhcpv6Message, Dhcpv6Option};
    use starve_protocols::{Captured, CapturedPacket, EthernetHeader, FramePayload};
    use std::time::SystemTime;

    const WINDOW: Duration = Duration::from_millis(20);
    const SERVER_MAC: MacAddr = MacAddr(0x00, 0x50, 0x56, 0x00, 0x00, 0x01);
    const LOCAL_MAC: MacAddr = MacAddr(0x02, 0, 0, 0, 0, 9);

    fn local() -> LinkInfo {
        LinkInfo {
            name: "eth0".into(),
            mac: LOCAL_MAC,
            ipv4_net: Some(Ipv4Network::new(Ipv4Addr::new(10, 0, 0, 9), 24).unwrap()),
            link_local: Some("fe80::9".parse().unwrap()),
        }
    }

    fn dispatcher(
        link: Arc<MemoryLink>,
        protocol: Arc<dyn LeaseProtocol>,
        mode: Mode,
        rapid_commit: bool,
    ) -> (Dispatcher, SessionView) {
        let (writer, view) = session::new(SessionSettings {
            mode,
            rapid_commit,
            request_options: vec![23, 24],
        });
        let dispatcher = Dispatcher {
            link,
            protocol,
            identities: Arc::new(IdentityPool::default()),
            session: writer,
            stop: StopSignal::new(),
            display: Display {
                show_arp: true,
                show_icmp: true,
                show_options: true,
                show_lease_confirm: true,
            },
            capture_window: WINDOW,
            fuzz: false,
            protected_server: None,
        };
        (dispatcher, view)
    }

    fn v4_dispatcher(link: Arc<MemoryLink>) -> (Dispatcher, SessionView) {
        dispatcher(link, Arc::new(V4Protocol::new(local(), None)), Mode::V4, false)
    }

    fn offer(server: Ipv4Addr, client_last: u8) -> Captured {
        let client = MacAddr::new(0xde, 0xad, 0, 0, 0, client_last);
        let mut message = DhcpMessage::request_header(1000 + u32::from(client_last), client).with_options(vec![
            DhcpOption::MessageType(MessageType::Offer),
            DhcpOption::ServerId(server),
            DhcpOption::SubnetMask(Ipv4Addr::new(255, 255, 255, 0)),
        ]);
        message.op = dhcp::BOOTREPLY;
        message.yiaddr = Ipv4Addr::new(10, 0, 0, 100 + client_last);
        Captured {
            ethernet: EthernetHeader::new(SERVER_MAC, MacAddr::broadcast()),
            packet: CapturedPacket::Dhcp {
                source: server,
                destination: Ipv4Addr::BROADCAST,
                message,
            },
        }
    }

    fn advertise(client_last: u8) -> Captured {
        let client = MacAddr::new(0xde, 0xad, 0, 0, 0, client_last);
        Captured {
            ethernet: EthernetHeader::new(SERVER_MAC, client),
            packet: CapturedPacket::Dhcpv6 {
                source: "fe80::1".parse().unwrap(),
                destination: "fe80::9".parse().unwrap(),
                message: Dhcpv6Message::new(
                    dhcpv6::MessageType::Advertise,
                    u32::from(client_last),
                    vec![
                        Dhcpv6Option::ClientId(dhcpv6::duid_llt(client, SystemTime::now())),
                        Dhcpv6Option::ServerId(vec![0, 3, 0, 1, 0x00, 0x50, 0x56, 0, 0, 1]),
                        Dhcpv6Option::IaNa {
                            iaid: 0xf,
                            t1: 0,
                            t2: 0,
                            options: vec![Dhcpv6Option::IaAddress {
                                addr: format!("2001:db8::{client_last}").parse().unwrap(),
                                preferred: 60,
                                valid: 120,
                                options: vec![],
                            }],
                        },
                    ],
                ),
            },
        }
    }

    fn reply_to(advertise: &Captured) -> Captured {
        let mut reply = advertise.clone();
        if let CapturedPacket::Dhcpv6 { message, .. } = &mut reply.packet {
            message.msg_type = dhcpv6::MessageType::Reply;
        }
        reply
    }

    #[test]
    fn idle_windows_reach_limit_and_reset_on_offer() {
        let mut idle = IdleWindows::default();
        for _ in 0..4 {
            assert!(!idle.close_window(false));
        }
        assert_eq!(idle.count(), 4);
        assert!(!idle.close_window(true));
        assert_eq!(idle.count(), 0);
        for _ in 0..4 {
            assert!(!idle.close_window(false));
        }
        assert!(idle.close_window(false));
        assert_eq!(idle.count(), IDLE_WINDOW_LIMIT);
    }

    #[tokio::test]
    async fn five_idle_windows_mark_exhaustion() {
        let link = Arc::new(MemoryLink::new());
        let (dispatcher, view) = v4_dispatcher(link);
        let started = Instant::now();
        dispatcher.run().await.unwrap();
        assert!(view.is_exhausted());
        assert!(started.elapsed() >= WINDOW * IDLE_WINDOW_LIMIT);
        assert_eq!(view.revision(), 1);
    }

    #[tokio::test]
    async fn fuzz_mode_never_exhausts() {
        let link = Arc::new(MemoryLink::new());
        let (mut dispatcher, view) = v4_dispatcher(link);
        dispatcher.fuzz = true;
        let stop = dispatcher.stop.clone();
        let handle = tokio::spawn(dispatcher.run());
        tokio::time::sleep(WINDOW * (IDLE_WINDOW_LIMIT + 3)).await;
        assert!(!view.is_exhausted());
        stop.trigger();
        handle.await.unwrap().unwrap();
        assert!(!view.is_exhausted());
    }

    #[tokio::test]
    async fn offer_records_server_and_requests_lease() {
        let link = Arc::new(MemoryLink::new());
        let (dispatcher, view) = v4_dispatcher(link.clone());
        link.inject(offer(Ipv4Addr::new(10, 0, 0, 1), 7));
        dispatcher.run().await.unwrap();

        let server = view.server().unwrap();
        assert_eq!(server.addr, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(server.mac, SERVER_MAC);
        assert_eq!(view.subnet_mask(), Some(Ipv4Addr::new(255, 255, 255, 0)));

        let sent = link.sent();
        assert_eq!(sent.len(), 1);
        let request = sent[0].dhcp().unwrap();
        assert_eq!(request.message_type(), Some(MessageType::Request));
        assert_eq!(request.xid, 1007);
        assert_eq!(request.chaddr, MacAddr::new(0xde, 0xad, 0, 0, 0, 7));
        assert_eq!(request.requested_address(), Some(Ipv4Addr::new(10, 0, 0, 107)));
    }

    #[tokio::test]
    async fn protected_server_is_ignored() {
        let link = Arc::new(MemoryLink::new());
        let (mut dispatcher, view) = v4_dispatcher(link.clone());
        dispatcher.protected_server = Some(Ipv4Addr::new(10, 0, 0, 1));
        link.inject(offer(Ipv4Addr::new(10, 0, 0, 1), 7));
        dispatcher.run().await.unwrap();

        assert!(link.sent().is_empty());
        assert_eq!(view.server(), None);
        assert_eq!(view.subnet_mask(), None);
        // only the exhaustion flag was written
        assert_eq!(view.revision(), 1);
    }

    #[tokio::test]
    async fn offer_in_a_window_resets_the_idle_count() {
        let link = Arc::new(MemoryLink::new());
        let (dispatcher, view) = v4_dispatcher(link.clone());
        let injector = {
            let link = link.clone();
            tokio::spawn(async move {
                // land inside the fourth window
                tokio::time::sleep(WINDOW * 3 + WINDOW / 2).await;
                link.inject(offer(Ipv4Addr::new(10, 0, 0, 1), 1));
            })
        };
        let started = Instant::now();
        dispatcher.run().await.unwrap();
        injector.await.unwrap();
        assert!(view.is_exhausted());
        // the offer window is followed by a full run of idle windows
        assert!(started.elapsed() >= WINDOW * 3 + WINDOW / 2 + WINDOW * IDLE_WINDOW_LIMIT);
    }

    #[tokio::test]
    async fn arp_replies_fill_the_neighbor_table() {
        let link = Arc::new(MemoryLink::new());
        let (dispatcher, view) = v4_dispatcher(link.clone());
        let neighbor = MacAddr::new(2, 0, 0, 0, 0, 5);
        link.inject(Captured {
            ethernet: EthernetHeader::new(neighbor, LOCAL_MAC),
            packet: CapturedPacket::Arp(ArpFrame {
                op: ArpOp::Reply,
                sender_hw: neighbor,
                sender_ip: Ipv4Addr::new(10, 0, 0, 5),
                target_hw: LOCAL_MAC,
                target_ip: Ipv4Addr::new(10, 0, 0, 9),
            }),
        });
        link.inject(Captured {
            ethernet: EthernetHeader::new(neighbor, MacAddr::broadcast()),
            packet: CapturedPacket::Arp(ArpFrame::request(
                neighbor,
                Ipv4Addr::new(10, 0, 0, 5),
                Ipv4Addr::new(10, 0, 0, 1),
            )),
        });
        dispatcher.run().await.unwrap();
        assert_eq!(view.neighbors(), vec![(neighbor, Ipv4Addr::new(10, 0, 0, 5))]);
        assert!(link.sent().is_empty());
    }

    #[tokio::test]
    async fn echo_requests_are_answered_from_a_fresh_identity() {
        let link = Arc::new(MemoryLink::new());
        let (dispatcher, _view) = v4_dispatcher(link.clone());
        link.inject(Captured {
            ethernet: EthernetHeader::new(SERVER_MAC, MacAddr::new(0xde, 0xad, 0, 0, 0, 1)),
            packet: CapturedPacket::EchoRequest {
                source: Ipv4Addr::new(10, 0, 0, 1),
                destination: Ipv4Addr::new(10, 0, 0, 101),
                identifier: 11,
                sequence: 4,
            },
        });
        dispatcher.run().await.unwrap();

        let sent = link.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].ethernet.destination, SERVER_MAC);
        assert_eq!(&[sent[0].ethernet.source.0, sent[0].ethernet.source.1], &[0xde, 0xad]);
        let FramePayload::EchoReply(reply) = &sent[0].payload else {
            panic!("not an echo reply");
        };
        assert_eq!(reply.source, Ipv4Addr::new(10, 0, 0, 101));
        assert_eq!(reply.destination, Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!((reply.identifier, reply.sequence), (11, 4));
    }

    #[tokio::test]
    async fn every_advertise_triggers_one_request() {
        let link = Arc::new(MemoryLink::new());
        let protocol = Arc::new(V6Protocol::new("fe80::9".parse().unwrap(), false, vec![23, 24]));
        let (dispatcher, view) = dispatcher(link.clone(), protocol, Mode::V6, false);
        for client in 1..=3 {
            let adv = advertise(client);
            link.inject(adv.clone());
            link.inject(reply_to(&adv));
        }
        dispatcher.run().await.unwrap();

        let sent = link.sent();
        assert_eq!(sent.len(), 3);
        for (frame, client) in sent.iter().zip(1..=3u8) {
            let request = frame.dhcpv6().unwrap();
            assert_eq!(request.msg_type, dhcpv6::MessageType::Request);
            assert_eq!(
                request.client_id().and_then(dhcpv6::duid_link_addr),
                Some(MacAddr::new(0xde, 0xad, 0, 0, 0, client))
            );
            assert_eq!(request.server_id(), Some(&[0, 3, 0, 1, 0x00, 0x50, 0x56, 0, 0, 1][..]));
        }
        let record = view.advertise().unwrap();
        assert_eq!(record.assigned, Some("2001:db8::3".parse().unwrap()));
        assert_eq!(view.server().map(|s| s.mac), Some(SERVER_MAC));
    }

    #[tokio::test]
    async fn empty_advertises_keep_the_pool_alive() {
        let link = Arc::new(MemoryLink::new());
        let protocol = Arc::new(V6Protocol::new("fe80::9".parse().unwrap(), false, vec![]));
        let (dispatcher, view) = dispatcher(link.clone(), protocol, Mode::V6, false);
        let stop = dispatcher.stop.clone();
        let mut empty = advertise(1);
        if let CapturedPacket::Dhcpv6 { message, .. } = &mut empty.packet {
            message.options.retain(|option| !matches!(option, Dhcpv6Option::IaNa { .. }));
        }
        let feeder = {
            let link = link.clone();
            let stop = stop.clone();
            tokio::spawn(async move {
                while !stop.is_triggered() {
                    link.inject(empty.clone());
                    tokio::time::sleep(WINDOW / 4).await;
                }
            })
        };
        let handle = tokio::spawn(dispatcher.run());
        tokio::time::sleep(WINDOW * (IDLE_WINDOW_LIMIT + 3)).await;
        assert!(!view.is_exhausted());
        stop.trigger();
        handle.await.unwrap().unwrap();
        feeder.await.unwrap();

        assert!(!view.is_exhausted());
        assert!(link.sent().is_empty());
        assert_eq!(view.advertise(), None);
        assert_eq!(view.server(), None);
        assert_eq!(view.revision(), 0);
    }

    #[tokio::test]
    async fn rapid_commit_sends_no_request() {
        let link = Arc::new(MemoryLink::new());
        let protocol = Arc::new(V6Protocol::new("fe80::9".parse().unwrap(), true, vec![]));
        let (dispatcher, view) = dispatcher(link.clone(), protocol, Mode::V6, true);
        let adv = advertise(1);
        link.inject(adv.clone());
        link.inject(reply_to(&adv));
        dispatcher.run().await.unwrap();

        assert!(link.sent().is_empty());
        assert!(view.advertise().is_some());
    }

    #[tokio::test]
    async fn stop_signal_ends_the_loop_without_exhaustion() {
        let link = Arc::new(MemoryLink::new());
        let (dispatcher, view) = v4_dispatcher(link);
        let stop = dispatcher.stop.clone();
        stop.trigger();
        dispatcher.run().await.unwrap();
        assert!(!view.is_exhausted());
    }

    #[tokio::test]
    async fn failed_request_send_is_fatal() {
        let link = Arc::new(MemoryLink::new());
        let (dispatcher, _view) = v4_dispatcher(link.clone());
        link.inject(offer(Ipv4Addr::new(10, 0, 0, 1), 7));
        link.fail_sends();
        assert!(dispatcher.run().await.is_err());
    }
}
