use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::SystemTime;

use anyhow::bail;
use pnet::util::MacAddr;
use rand::Rng;
use starve_common::config::Mode;
use starve_protocols::dhcpv6::{self, Dhcpv6Message, Dhcpv6Option, MessageType};
use starve_protocols::{CaptureFilter, Captured, CapturedPacket, EthernetHeader, Frame, FramePayload};

use super::{Confirmation, Inbound, Lease, LeaseProtocol};
use crate::session::{AdvertiseRecord, ServerIdentity};

/// Identity association id of every IA_NA we send.
pub const IAID: u32 = 0xf;
const MAX_TRANSACTION_ID: u32 = 0xFF_FFFF;

#[derive(Debug, Clone)]
pub struct V6Protocol {
    link_local: Ipv6Addr,
    rapid_commit: bool,
    request_options: Vec<u16>,
}

impl V6Protocol {
    pub fn new(link_local: Ipv6Addr, rapid_commit: bool, request_options: Vec<u16>) -> Self {
        Self {
            link_local,
            rapid_commit,
            request_options,
        }
    }

    fn frame(&self, client: MacAddr, message: Dhcpv6Message) -> Frame {
        Frame::new(
            EthernetHeader::new(client, dhcpv6::ALL_SERVERS_MAC),
            FramePayload::Dhcpv6 {
                source: self.link_local,
                destination: dhcpv6::ALL_SERVERS,
                message,
            },
        )
    }

    fn advertise_record(&self, captured: &Captured, source: Ipv6Addr, message: &Dhcpv6Message) -> Option<AdvertiseRecord> {
        let ia_na = message.ia_na()?;
        // an advertise without an address is a NoAddrsAvail answer, not an offer
        let assigned = ia_na.assigned_address()?;
        Some(AdvertiseRecord {
            transaction_id: message.transaction_id,
            client_duid: message.client_id()?.to_vec(),
            server_duid: message.server_id()?.to_vec(),
            ia_na: Some(ia_na.clone()),
            assigned: Some(assigned),
            client_mac: captured.ethernet.destination,
            server_mac: captured.ethernet.source,
            server_ip: source,
        })
    }
}

impl LeaseProtocol for V6Protocol {
    fn mode(&self) -> Mode {
        Mode::V6
    }

    fn capture_filter(&self) -> CaptureFilter {
        CaptureFilter::V6
    }

    fn transaction_id(&self) -> u32 {
        rand::rng().random_range(0..=MAX_TRANSACTION_ID)
    }

    fn build_discover(&self, client: MacAddr, xid: u32) -> anyhow::Result<Frame> {
        let mut options = vec![
            Dhcpv6Option::ClientId(dhcpv6::duid_llt(client, SystemTime::now())),
            Dhcpv6Option::IaNa {
                iaid: IAID,
                t1: 0,
                t2: 0,
                options: Vec::new(),
            },
        ];
        if self.rapid_commit {
            options.push(Dhcpv6Option::RapidCommit);
        }
        options.push(Dhcpv6Option::ElapsedTime(0));
        options.push(Dhcpv6Option::OptionRequest(self.request_options.clone()));
        Ok(self.frame(client, Dhcpv6Message::new(MessageType::Solicit, xid, options)))
    }

    fn build_request(&self, lease: &Lease) -> anyhow::Result<Option<Frame>> {
        let Lease::V6(record) = lease else {
            bail!("DHCPv6 cannot request a DHCPv4 lease");
        };
        if self.rapid_commit {
            return Ok(None);
        }
        let ia_options = match &record.ia_na {
            Some(Dhcpv6Option::IaNa { options, .. }) => options.clone(),
            _ => Vec::new(),
        };
        let message = Dhcpv6Message::new(
            MessageType::Request,
            self.transaction_id(),
            vec![
                Dhcpv6Option::ClientId(record.client_duid.clone()),
                Dhcpv6Option::ServerId(record.server_duid.clone()),
                Dhcpv6Option::IaNa {
                    iaid: IAID,
                    t1: 0,
                    t2: 0,
                    options: ia_options,
                },
                Dhcpv6Option::ElapsedTime(0),
                Dhcpv6Option::OptionRequest(self.request_options.clone()),
            ],
        );
        Ok(Some(self.frame(record.client_mac, message)))
    }

    fn build_release(
        &self,
        _server: &ServerIdentity,
        client: MacAddr,
        addr: Ipv4Addr,
        _xid: u32,
    ) -> anyhow::Result<Option<Frame>> {
        tracing::warn!("IPv6 release is not supported, skipping {client} ({addr})");
        Ok(None)
    }

    fn classify(&self, captured: &Captured) -> Option<Inbound> {
        match &captured.packet {
            CapturedPacket::Dhcpv6 { source, message, .. } => match message.msg_type {
                MessageType::Advertise => Some(match self.advertise_record(captured, *source, message) {
                    Some(record) => Inbound::Offer(Lease::V6(record)),
                    None => Inbound::EmptyAdvertise {
                        server_mac: captured.ethernet.source,
                    },
                }),
                MessageType::Reply => Some(Inbound::Confirmation(Confirmation {
                    server: IpAddr::V6(*source),
                    server_mac: captured.ethernet.source,
                    client_mac: message.client_id().and_then(dhcpv6::duid_link_addr),
                    addr: message
                        .ia_na()
                        .and_then(Dhcpv6Option::assigned_address)
                        .map(IpAddr::V6),
                })),
                _ => None,
            },
            CapturedPacket::NeighborSolicit { target, .. } => Some(Inbound::NeighborSolicit {
                source: captured.ethernet.source,
                target: *target,
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
