//! Protocol strategies.
//!
//! The sender and the dispatcher are written once against [`LeaseProtocol`];
//! [`v4::V4Protocol`] and [`v6::V6Protocol`] supply the DHCP and DHCPv6
//! specifics.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use pnet::util::MacAddr;
use starve_common::config::{Config, Mode};
use starve_common::network::interface::LinkInfo;
use starve_protocols::dhcp::DhcpMessage;
use starve_protocols::{CaptureFilter, Captured, Frame};

use crate::session::{AdvertiseRecord, ServerIdentity};

pub mod v4;
pub mod v6;

pub use v4::V4Protocol;
pub use v6::V6Protocol;

pub trait LeaseProtocol: Send + Sync {
    fn mode(&self) -> Mode;

    fn capture_filter(&self) -> CaptureFilter;

    /// Fresh random transaction id in the range the protocol allows.
    fn transaction_id(&self) -> u32;

    fn build_discover(&self, client: MacAddr, xid: u32) -> anyhow::Result<Frame>;

    /// Answer to an offer. `None` when the protocol needs no second round trip.
    fn build_request(&self, lease: &Lease) -> anyhow::Result<Option<Frame>>;

    /// Release of `addr`, leased to `client`. `None` when unsupported.
    fn build_release(
        &self,
        server: &ServerIdentity,
        client: MacAddr,
        addr: Ipv4Addr,
        xid: u32,
    ) -> anyhow::Result<Option<Frame>>;

    /// `None` for anything the engine does not react to.
    fn classify(&self, captured: &Captured) -> Option<Inbound>;
}

/// Picks the strategy for the configured mode.
pub fn for_config(cfg: &Config, link: &LinkInfo) -> Arc<dyn LeaseProtocol> {
    match cfg.mode {
        Mode::V4 => Arc::new(V4Protocol::new(link.clone(), cfg.router_mac)),
        Mode::V6 => Arc::new(V6Protocol::new(
            link.link_local.unwrap_or(Ipv6Addr::UNSPECIFIED),
            cfg.rapid_commit,
            cfg.request_options.clone(),
        )),
    }
}

/// A DHCPv4 offer together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferV4 {
    pub message: DhcpMessage,
    /// Server identifier option, else `siaddr`, else the IP source.
    pub server_id: Ipv4Addr,
    pub server_mac: MacAddr,
    pub source: Ipv4Addr,
}

impl OfferV4 {
    pub fn xid(&self) -> u32 {
        self.message.xid
    }

    pub fn client_mac(&self) -> MacAddr {
        self.message.chaddr
    }

    pub fn offered(&self) -> Ipv4Addr {
        self.message.yiaddr
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lease {
    V4(OfferV4),
    V6(AdvertiseRecord),
}

impl Lease {
    pub fn server(&self) -> ServerIdentity {
        match self {
            Lease::V4(offer) => ServerIdentity {
                addr: IpAddr::V4(offer.server_id),
                mac: offer.server_mac,
            },
            Lease::V6(record) => ServerIdentity {
                addr: IpAddr::V6(record.server_ip),
                mac: record.server_mac,
            },
        }
    }

    pub fn subnet_mask(&self) -> Option<Ipv4Addr> {
        match self {
            Lease::V4(offer) => offer.message.subnet_mask(),
            Lease::V6(_) => None,
        }
    }

    pub fn client_mac(&self) -> MacAddr {
        match self {
            Lease::V4(offer) => offer.client_mac(),
            Lease::V6(record) => record.client_mac,
        }
    }

    pub fn offered(&self) -> Option<IpAddr> {
        match self {
            Lease::V4(offer) => Some(IpAddr::V4(offer.offered())),
            Lease::V6(record) => record.assigned.map(IpAddr::V6),
        }
    }
}

/// Final confirmation of a lease (ACK or REPLY).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub server: IpAddr,
    pub server_mac: MacAddr,
    pub client_mac: Option<MacAddr>,
    pub addr: Option<IpAddr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Offer(Lease),
    /// A DHCPv6 advertise carrying no usable lease. Still proof the server answers.
    EmptyAdvertise {
        server_mac: MacAddr,
    },
    Confirmation(Confirmation),
    EchoRequest {
        requester: MacAddr,
        source: Ipv4Addr,
        destination: Ipv4Addr,
        identifier: u16,
        sequence: u16,
    },
    ArpReply {
        mac: MacAddr,
        addr: Ipv4Addr,
    },
    ArpRequest {
        sender: Ipv4Addr,
        target: Ipv4Addr,
    },
    NeighborSolicit {
        source: MacAddr,
        target: Ipv6Addr,
    },
}

impl fmt::Display for Lease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let offered = self
            .offered()
            .map_or_else(|| "-".to_string(), |addr| addr.to_string());
        let server = self.server();
        write!(f, "{} ({}) IP: {} for MAC=[{}]", server.addr, server.mac, offered, self.client_mac())
    }
}
