use std::net::IpAddr;
use std::sync::Arc;

use starve_common::config::Mode;
use starve_core::link::MemoryLink;
use starve_core::{Orchestrator, StopSignal};
use starve_protocols::dhcpv6::{self, Dhcpv6Message};
use starve_protocols::Frame;

use crate::support::{self, SERVER_DUID, SERVER_MAC};

fn sent_v6(link: &MemoryLink, kind: dhcpv6::MessageType) -> Vec<Dhcpv6Message> {
    link.sent()
        .iter()
        .filter_map(Frame::dhcpv6)
        .filter(|m| m.msg_type == kind)
        .cloned()
        .collect()
}

#[tokio::test]
async fn every_advertise_is_requested() {
    let (link, server) = support::v6_network(3, false);
    let link = Arc::new(link);

    let outcome = Orchestrator::new(support::fast_config(Mode::V6), support::local(), link.clone(), StopSignal::new())
        .run()
        .await
        .expect("run should end in exhaustion");

    let identity = outcome.server.expect("server recorded");
    assert_eq!(identity.addr, IpAddr::V6(support::server_ll()));
    assert_eq!(identity.mac, SERVER_MAC);
    assert_eq!(server.offers(), 3);
    assert_eq!(server.requests(), 3);

    let requests = sent_v6(&link, dhcpv6::MessageType::Request);
    assert_eq!(requests.len(), 3);
    for request in &requests {
        assert_eq!(request.server_id(), Some(&SERVER_DUID[..]));
        assert!(request.client_id().and_then(dhcpv6::duid_link_addr).is_some());
    }
}

#[tokio::test]
async fn rapid_commit_never_sends_a_request() {
    let (link, server) = support::v6_network(3, true);
    let link = Arc::new(link);
    let mut cfg = support::fast_config(Mode::V6);
    cfg.rapid_commit = true;

    Orchestrator::new(cfg, support::local(), link.clone(), StopSignal::new())
        .run()
        .await
        .expect("run should end in exhaustion");

    assert_eq!(server.offers(), 3);
    assert_eq!(server.requests(), 0);
    assert!(sent_v6(&link, dhcpv6::MessageType::Request).is_empty());
    let solicits = sent_v6(&link, dhcpv6::MessageType::Solicit);
    assert!(solicits.iter().all(Dhcpv6Message::has_rapid_commit));
}

#[tokio::test]
async fn neighbor_attacks_are_skipped_in_v6() {
    let (link, _server) = support::v6_network(2, false);
    let link = Arc::new(link);
    let mut cfg = support::fast_config(Mode::V6);
    cfg.attacks.scan_neighbors = true;
    cfg.attacks.release = true;
    cfg.attacks.knockoff = true;

    let outcome = Orchestrator::new(cfg, support::local(), link.clone(), StopSignal::new())
        .run()
        .await
        .expect("run should end in exhaustion");

    assert_eq!((outcome.probed, outcome.released, outcome.knocked_off), (0, 0, 0));
    assert!(link.sent().iter().all(|frame| frame.arp().is_none()));
}
