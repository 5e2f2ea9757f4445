//! ARP sweep of the local subnet.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use starve_common::config::Mode;
use starve_common::link_sent;
use starve_common::network::interface::LinkInfo;
use starve_common::network::range;

use crate::frames;
use crate::link::PacketLink;
use crate::stop::StopSignal;

/// Sends one who-has per address of the local IPv4 network, `spacing` apart.
/// Replies are picked up by the dispatcher. Returns the number of probes sent.
pub async fn sweep(
    link: Arc<dyn PacketLink>,
    mode: Mode,
    local: &LinkInfo,
    spacing: Duration,
    stop: &StopSignal,
) -> anyhow::Result<usize> {
    if mode == Mode::V6 {
        tracing::warn!("neighbor scan is IPv4 only, skipping");
        return Ok(0);
    }
    let (Some(network), Some(local_ip)) = (local.ipv4_net, local.ipv4_addr()) else {
        tracing::warn!("{} has no IPv4 network to scan", local.name);
        return Ok(0);
    };

    let mut sent = 0;
    for target in range::from_ipv4_net(network).to_iter() {
        if stop.is_triggered() {
            break;
        }
        link_sent!("ARP: sending {target}");
        link.send(&frames::arp_probe(local.mac, local_ip, target))
            .with_context(|| format!("probing {target}"))?;
        sent += 1;
        tokio::select! {
            _ = tokio::time::sleep(spacing) => {}
            _ = stop.stopped() => break,
        }
    }
    tracing::debug!("ARP sweep sent {sent} probes");
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
