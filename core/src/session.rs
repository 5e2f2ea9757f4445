//! Shared session state.
//!
//! One run has exactly one [`SessionWriter`], owned by the dispatcher, and any
//! number of read-only [`SessionView`]s. The writer is not `Clone`. Every
//! mutation bumps a revision counter, which lets tests observe who wrote.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use pnet::util::MacAddr;
use starve_common::config::Mode;
use starve_protocols::dhcpv6::Dhcpv6Option;

/// The DHCP server that answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerIdentity {
    pub addr: IpAddr,
    pub mac: MacAddr,
}

/// Identifiers of the latest solicit/advertise exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertiseRecord {
    pub transaction_id: u32,
    pub client_duid: Vec<u8>,
    pub server_duid: Vec<u8>,
    pub ia_na: Option<Dhcpv6Option>,
    pub assigned: Option<Ipv6Addr>,
    pub client_mac: MacAddr,
    pub server_mac: MacAddr,
    pub server_ip: Ipv6Addr,
}

/// Protocol parameters fixed for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub mode: Mode,
    pub rapid_commit: bool,
    pub request_options: Vec<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub server: Option<ServerIdentity>,
    pub subnet_mask: Option<Ipv4Addr>,
    /// Leased address per hardware address.
    pub neighbors: HashMap<MacAddr, Ipv4Addr>,
    pub advertise: Option<AdvertiseRecord>,
}

#[derive(Debug)]
struct Shared {
    settings: SessionSettings,
    state: RwLock<SessionState>,
    exhausted: AtomicBool,
    revision: AtomicU64,
}

pub fn new(settings: SessionSettings) -> (SessionWriter, SessionView) {
    let shared = Arc::new(Shared {
        settings,
        state: RwLock::new(SessionState::default()),
        exhausted: AtomicBool::new(false),
        revision: AtomicU64::new(0),
    });
    (
        SessionWriter {
            shared: Arc::clone(&shared),
        },
        SessionView { shared },
    )
}

#[derive(Debug)]
pub struct SessionWriter {
    shared: Arc<Shared>,
}

impl SessionWriter {
    pub fn view(&self) -> SessionView {
        SessionView {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Records the answering server. Returns `true` when it was not known yet
    /// or has changed. A missing mask keeps the previously recorded one.
    pub fn record_server(&self, server: ServerIdentity, subnet_mask: Option<Ipv4Addr>) -> bool {
        self.update(|state| {
            let changed = state.server != Some(server);
            state.server = Some(server);
            if subnet_mask.is_some() {
                state.subnet_mask = subnet_mask;
            }
            changed
        })
    }

    /// Returns `true` when the neighbor is new or moved to another address.
    pub fn record_neighbor(&self, mac: MacAddr, addr: Ipv4Addr) -> bool {
        self.update(|state| state.neighbors.insert(mac, addr) != Some(addr))
    }

    pub fn record_advertise(&self, record: AdvertiseRecord) {
        self.update(|state| state.advertise = Some(record));
    }

    /// Sets the exhaustion flag. Returns `true` only for the call that
    /// actually flipped it.
    pub fn mark_exhausted(&self) -> bool {
        let flipped = !self.shared.exhausted.swap(true, Ordering::SeqCst);
        if flipped {
            self.shared.revision.fetch_add(1, Ordering::SeqCst);
        }
        flipped
    }

    fn update<R>(&self, apply: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut state = self
            .shared
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let result = apply(&mut state);
        self.shared.revision.fetch_add(1, Ordering::SeqCst);
        result
    }
}

#[derive(Debug, Clone)]
pub struct SessionView {
    shared: Arc<Shared>,
}

impl SessionView {
    pub fn settings(&self) -> &SessionSettings {
        &self.shared.settings
    }

    pub fn is_exhausted(&self) -> bool {
        self.shared.exhausted.load(Ordering::SeqCst)
    }

    /// Number of mutations so far.
    pub fn revision(&self) -> u64 {
        self.shared.revision.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> SessionState {
        self.read(SessionState::clone)
    }

    pub fn server(&self) -> Option<ServerIdentity> {
        self.read(|state| state.server)
    }

    pub fn subnet_mask(&self) -> Option<Ipv4Addr> {
        self.read(|state| state.subnet_mask)
    }

    pub fn neighbors(&self) -> Vec<(MacAddr, Ipv4Addr)> {
        self.read(|state| state.neighbors.iter().map(|(mac, ip)| (*mac, *ip)).collect())
    }

    pub fn advertise(&self) -> Option<AdvertiseRecord> {
        self.read(|state| state.advertise.clone())
    }

    fn read<R>(&self, get: impl FnOnce(&SessionState) -> R) -> R {
        let state = self
            .shared
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        get(&state)
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

    fn settings() -> SessionSettings {
        SessionSettings {
            mode: Mode::V4,
            rapid_commit: false,
            request_options: vec![23, 24],
        }
    }

    fn server(last: u8) -> ServerIdentity {
        ServerIdentity {
            addr: IpAddr::V4(Ipv4Addr::new(10, 0, 0, last)),
            mac: MacAddr::new(0, 0x50, 0x56, 0, 0, last),
        }
    }

    #[test]
    fn exhaustion_flips_once() {
        let (writer, view) = new(settings());
        assert!(!view.is_exhausted());
        assert!(writer.mark_exhausted());
        assert!(!writer.mark_exhausted());
        assert!(!writer.mark_exhausted());
        assert!(view.is_exhausted());
        assert_eq!(view.revision(), 1);
    }

    #[test]
    fn server_recording_keeps_known_mask() {
        let (writer, view) = new(settings());
        assert!(writer.record_server(server(1), Some(Ipv4Addr::new(255, 255, 255, 0))));
        assert!(!writer.record_server(server(1), None));
        assert_eq!(view.server(), Some(server(1)));
        assert_eq!(view.subnet_mask(), Some(Ipv4Addr::new(255, 255, 255, 0)));
        assert!(writer.record_server(server(2), None));
        assert_eq!(view.server(), Some(server(2)));
    }

    #[test]
    fn neighbors_are_keyed_by_mac() {
        let (writer, view) = new(settings());
        let mac = MacAddr::new(2, 0, 0, 0, 0, 1);
        assert!(writer.record_neighbor(mac, Ipv4Addr::new(10, 0, 0, 5)));
        assert!(!writer.record_neighbor(mac, Ipv4Addr::new(10, 0, 0, 5)));
        assert!(writer.record_neighbor(mac, Ipv4Addr::new(10, 0, 0, 6)));
        assert_eq!(view.neighbors(), vec![(mac, Ipv4Addr::new(10, 0, 0, 6))]);
    }

    #[test]
    fn every_write_bumps_revision_and_views_do_not() {
        let (writer, view) = new(settings());
        let other = writer.view();
        let _ = view.snapshot();
        let _ = other.neighbors();
        assert_eq!(view.revision(), 0);
        writer.record_server(server(1), None);
        writer.record_neighbor(MacAddr::zero(), Ipv4Addr::LOCALHOST);
        assert_eq!(other.revision(), 2);
    }
}
