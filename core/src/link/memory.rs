//! In-memory link for engine tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use anyhow::bail;
use async_trait::async_trait;
use starve_protocols::{CaptureFilter, Captured, Frame};
use tokio::sync::Notify;
use tokio::time::Instant;

use super::PacketLink;

/// Produces the traffic a sent frame provokes, like a server answering a discover.
pub type Responder = Box<dyn Fn(&Frame) -> Vec<Captured> + Send + Sync>;

/// Records every sent frame and replays injected captures.
///
/// Captures not matching the filter of the capture call that dequeues them
/// are dropped, as a kernel filter would.
#[derive(Default)]
pub struct MemoryLink {
    sent: Mutex<Vec<Frame>>,
    inbound: Mutex<VecDeque<Captured>>,
    arrived: Notify,
    responder: Option<Responder>,
    failing: AtomicBool,
}

impl MemoryLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responder(responder: impl Fn(&Frame) -> Vec<Captured> + Send + Sync + 'static) -> Self {
        Self {
            responder: Some(Box::new(responder)),
            ..Self::default()
        }
    }

    pub fn inject(&self, captured: Captured) {
        self.inbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(captured);
        self.arrived.notify_one();
    }

    pub fn sent(&self) -> Vec<Frame> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn take_sent(&self) -> Vec<Frame> {
        std::mem::take(&mut *self.sent.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Makes every following send fail.
    pub fn fail_sends(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    fn pop_matching(&self, filter: &CaptureFilter) -> Option<Captured> {
        let mut inbound = self.inbound.lock().unwrap_or_else(PoisonError::into_inner);
        while let Some(captured) = inbound.pop_front() {
            if filter.matches(&captured) {
                return Some(captured);
            }
        }
        None
    }
}

#[async_trait]
impl PacketLink for MemoryLink {
    fn send(&self, frame: &Frame) -> anyhow::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            bail!("link is down");
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(frame.clone());
        if let Some(responder) = &self.responder {
            for captured in responder(frame) {
                self.inject(captured);
            }
        }
        Ok(())
    }

    async fn capture_until(
        &self,
        filter: &CaptureFilter,
        deadline: Instant,
    ) -> anyhow::Result<Option<Captured>> {
        loop {
            let arrived = self.arrived.notified();
            tokio::pin!(arrived);
            arrived.as_mut().enable();
            if let Some(captured) = self.pop_matching(filter) {
                return Ok(Some(captured));
            }
            tokio::select! {
                _ = &mut arrived => continue,
                _ = tokio::time::sleep_until(deadline) => return Ok(None),
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
