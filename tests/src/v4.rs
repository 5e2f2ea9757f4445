use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use pnet::util::MacAddr;
use starve_common::config::Mode;
use starve_core::session::ServerIdentity;
use starve_core::{AttackError, Orchestrator, StopSignal};

use crate::support::{self, SERVER_IP, SERVER_MAC};

#[tokio::test]
async fn small_pool_is_exhausted_and_every_offer_requested() {
    let (link, server) = support::v4_network(8, Vec::new());
    let link = Arc::new(link);

    let outcome = Orchestrator::new(support::fast_config(Mode::V4), support::local(), link.clone(), StopSignal::new())
        .run()
        .await
        .expect("run should end in exhaustion");

    assert_eq!(
        outcome.server,
        Some(ServerIdentity {
            addr: IpAddr::V4(SERVER_IP),
            mac: SERVER_MAC,
        })
    );
    assert_eq!(server.offers(), 8);
    assert_eq!(server.requests(), 8);

    let requested: HashSet<Ipv4Addr> = support::sent_requests(&link)
        .iter()
        .filter_map(|m| m.requested_address())
        .collect();
    let offered: HashSet<Ipv4Addr> = (0..8).map(|i| Ipv4Addr::new(10, 0, 1, i)).collect();
    assert_eq!(requested, offered);
}

#[tokio::test]
async fn neighbors_are_scanned_released_and_knocked_off() {
    let first = MacAddr::new(0x02, 0, 0, 0, 0, 0x0a);
    let second = MacAddr::new(0x02, 0, 0, 0, 0, 0x0c);
    let (link, server) = support::v4_network(
        4,
        vec![
            (first, Ipv4Addr::new(10, 0, 0, 10)),
            (second, Ipv4Addr::new(10, 0, 0, 12)),
        ],
    );
    let mut cfg = support::fast_config(Mode::V4);
    cfg.attacks.scan_neighbors = true;
    cfg.attacks.release = true;
    cfg.attacks.knockoff = true;

    let outcome = Orchestrator::new(cfg, support::local(), Arc::new(link), StopSignal::new())
        .run()
        .await
        .expect("run should end in exhaustion");

    // 10.0.0.8/29
    assert_eq!(outcome.probed, 8);
    assert_eq!(outcome.neighbors, 2);
    assert_eq!(outcome.released, 2);
    assert_eq!(
        server.released(),
        vec![Ipv4Addr::new(10, 0, 0, 10), Ipv4Addr::new(10, 0, 0, 12)]
    );
    // the server offered a /30
    assert_eq!(outcome.knocked_off, 4);
}

#[tokio::test]
async fn protected_server_is_never_requested() {
    let (link, server) = support::v4_network(8, Vec::new());
    let mut cfg = support::fast_config(Mode::V4);
    cfg.protected_server = Some(SERVER_IP);
    cfg.timeouts.server_retry = std::time::Duration::from_millis(1);

    let err = Orchestrator::new(cfg, support::local(), Arc::new(link), StopSignal::new())
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, AttackError::NoServerResponse { .. }), "{err}");
    assert!(server.offers() > 0);
    assert_eq!(server.requests(), 0);
}

#[tokio::test]
async fn concurrent_senders_rotate_the_configured_macs() {
    let macs = vec![
        MacAddr::new(0x00, 0x11, 0x22, 0x33, 0x44, 0x01),
        MacAddr::new(0x00, 0x11, 0x22, 0x33, 0x44, 0x02),
        MacAddr::new(0x00, 0x11, 0x22, 0x33, 0x44, 0x03),
    ];
    let (link, server) = support::v4_network(6, Vec::new());
    let mut cfg = support::fast_config(Mode::V4);
    cfg.threads = 3;
    cfg.client_macs = macs.clone();

    Orchestrator::new(cfg, support::local(), Arc::new(link), StopSignal::new())
        .run()
        .await
        .expect("run should end in exhaustion");

    let clients = server.clients();
    assert!(clients.len() >= 6);
    assert!(clients.iter().all(|mac| macs.contains(mac)));
    // the first round hands out each address once
    let first_round: HashSet<MacAddr> = clients.iter().take(3).copied().collect();
    assert_eq!(first_round.len(), 3);
}

#[tokio::test]
async fn a_dead_link_aborts_the_run() {
    let (link, _server) = support::v4_network(8, Vec::new());
    link.fail_sends();

    let err = Orchestrator::new(support::fast_config(Mode::V4), support::local(), Arc::new(link), StopSignal::new())
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, AttackError::Worker(_)), "{err}");
}
