use std::net::{Ipv4Addr, Ipv6Addr};

use pnet::datalink::{self, NetworkInterface};
use pnet::ipnetwork::{IpNetwork, Ipv4Network, Ipv6Network};
use pnet::util::MacAddr;
use thiserror::Error;

use crate::config::Mode;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("no interface named '{0}'")]
    NotFound(String),
    /// The interface is operationally down.
    #[error("interface '{0}' is down")]
    IsDown(String),
    /// The interface does not have a MAC address.
    #[error("interface '{0}' has no MAC address")]
    NoMacAddress(String),
    /// IPv4 mode needs an address for ARP sweeps and echo replies.
    #[error("interface '{0}' has no IPv4 address")]
    NoIpv4(String),
    /// DHCPv6 solicits are sourced from the link-local address.
    #[error("interface '{0}' has no IPv6 link-local address")]
    NoLinkLocal(String),
}

pub trait NetworkInterfaceExtension {
    fn get_ipv4_nets(&self) -> Vec<Ipv4Network>;
    fn get_ipv6_nets(&self) -> Vec<Ipv6Network>;
    fn get_ipv4_net(&self) -> Option<Ipv4Network>;
    fn get_link_local(&self) -> Option<Ipv6Addr>;
}

impl NetworkInterfaceExtension for NetworkInterface {
    fn get_ipv4_nets(&self) -> Vec<Ipv4Network> {
        self.ips
            .iter()
            .filter_map(|ip| {
                if let IpNetwork::V4(ipv4) = ip {
                    Some(*ipv4)
                } else {
                    None
                }
            })
            .collect()
    }

    fn get_ipv6_nets(&self) -> Vec<Ipv6Network> {
        self.ips
            .iter()
            .filter_map(|ip| {
                if let IpNetwork::V6(ipv6) = ip {
                    Some(*ipv6)
                } else {
                    None
                }
            })
            .collect()
    }

    fn get_ipv4_net(&self) -> Option<Ipv4Network> {
        self.get_ipv4_nets()
            .into_iter()
            .find(|net| !net.ip().is_loopback())
    }

    fn get_link_local(&self) -> Option<Ipv6Addr> {
        self.get_ipv6_nets()
            .into_iter()
            .map(|net| net.ip())
            .find(|ip| ip.is_unicast_link_local())
    }
}

/// Addresses of the local end of the attacked segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkInfo {
    pub name: String,
    pub mac: MacAddr,
    pub ipv4_net: Option<Ipv4Network>,
    pub link_local: Option<Ipv6Addr>,
}

impl LinkInfo {
    /// Checks that `interface` carries what `mode` needs and captures its addresses.
    pub fn for_mode(interface: &NetworkInterface, mode: Mode) -> Result<Self, InterfaceError> {
        let name = interface.name.clone();
        if !interface.is_up() {
            return Err(InterfaceError::IsDown(name));
        }
        let mac = interface
            .mac
            .filter(|mac| !mac.is_zero())
            .ok_or_else(|| InterfaceError::NoMacAddress(name.clone()))?;
        let info = Self {
            mac,
            ipv4_net: interface.get_ipv4_net(),
            link_local: interface.get_link_local(),
            name,
        };
        match mode {
            Mode::V4 if info.ipv4_net.is_none() => Err(InterfaceError::NoIpv4(info.name)),
            Mode::V6 if info.link_local.is_none() => Err(InterfaceError::NoLinkLocal(info.name)),
            _ => Ok(info),
        }
    }

    pub fn ipv4_addr(&self) -> Option<Ipv4Addr> {
        self.ipv4_net.map(|net| net.ip())
    }
}

/// Finds the interface the attack runs on.
pub fn find_by_name(name: &str) -> Result<NetworkInterface, InterfaceError> {
    select_by_name(name, datalink::interfaces())
}

fn select_by_name(
    name: &str,
    interfaces: Vec<NetworkInterface>,
) -> Result<NetworkInterface, InterfaceError> {
    interfaces
        .into_iter()
        .find(|interface| interface.name == name)
        .ok_or_else(|| InterfaceError::NotFound(name.to_string()))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
