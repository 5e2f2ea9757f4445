//! Raw Ethernet link backed by a `pnet` datalink channel.

use std::io::ErrorKind;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, bail};
use async_trait::async_trait;
use pnet::datalink::{self, Channel, Config, DataLinkReceiver, DataLinkSender, NetworkInterface};
use starve_protocols::{CaptureFilter, Captured, Frame, wire};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::Instant;

use crate::link::PacketLink;

const READ_TIMEOUT: Duration = Duration::from_millis(50);

pub struct PnetLink {
    tx: Mutex<Box<dyn DataLinkSender>>,
    rx: tokio::sync::Mutex<UnboundedReceiver<Vec<u8>>>,
    fuzz: bool,
}

impl PnetLink {
    /// Opens the interface and starts capturing right away, so no answer to
    /// the first sends is missed.
    pub fn open(intf: &NetworkInterface, fuzz: bool) -> anyhow::Result<Self> {
        Self::open_with(intf, fuzz, datalink::channel)
    }

    fn open_with<F>(intf: &NetworkInterface, fuzz: bool, channel_opener: F) -> anyhow::Result<Self>
    where
        F: FnOnce(&NetworkInterface, Config) -> std::io::Result<Channel>,
    {
        let (tx, rx) = open_eth_channel(intf, &get_config(), channel_opener)?;
        Ok(Self {
            tx: Mutex::new(tx),
            rx: tokio::sync::Mutex::new(start_capture(rx)),
            fuzz,
        })
    }
}

#[async_trait]
impl PacketLink for PnetLink {
    fn send(&self, frame: &Frame) -> anyhow::Result<()> {
        let bytes = wire::encode(frame, self.fuzz)?;
        let mut tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        match tx.send_to(&bytes, None) {
            Some(result) => result.context("sending frame"),
            None => bail!("no buffer space to send a {} byte frame", bytes.len()),
        }
    }

    async fn capture_until(
        &self,
        filter: &CaptureFilter,
        deadline: Instant,
    ) -> anyhow::Result<Option<Captured>> {
        let mut rx = self.rx.lock().await;
        loop {
            let bytes = match tokio::time::timeout_at(deadline, rx.recv()).await {
                Err(_elapsed) => return Ok(None),
                Ok(None) => bail!("capture thread stopped"),
                Ok(Some(bytes)) => bytes,
            };
            if let Some(captured) = wire::decode(&bytes) {
                if filter.matches(&captured) {
                    return Ok(Some(captured));
                }
            }
        }
    }
}

/// Moves the blocking receiver onto its own thread and forwards raw frames.
/// The thread ends once the returned receiver is dropped.
fn start_capture(mut rx: Box<dyn DataLinkReceiver>) -> UnboundedReceiver<Vec<u8>> {
    let (queue_tx, queue_rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        while !queue_tx.is_closed() {
            match rx.next() {
                Ok(frame) => {
                    if queue_tx.send(frame.to_vec()).is_err() {
                        break;
                    }
                }
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {}
                Err(e) => {
                    tracing::debug!("capture stopped: {e}");
                    break;
                }
            }
        }
    });
    queue_rx
}

fn open_eth_channel<F>(
    intf: &NetworkInterface,
    cfg: &Config,
    channel_opener: F,
) -> anyhow::Result<(Box<dyn DataLinkSender>, Box<dyn DataLinkReceiver>)>
where
    F: FnOnce(&NetworkInterface, Config) -> std::io::Result<Channel>,
{
    let ch: Channel = channel_opener(intf, *cfg).with_context(|| format!("opening on {}", intf.name))?;
    match ch {
        Channel::Ethernet(tx, rx) => {
            tracing::debug!("datalink channel open on {}", intf.name);
            Ok((tx, rx))
        }
        _ => bail!("non-ethernet channel for {}", intf.name),
    }
}

fn get_config() -> Config {
    Config {
        read_timeout: Some(READ_TIMEOUT),
        ..Default::default()
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
