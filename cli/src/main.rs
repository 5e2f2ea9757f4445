mod commands;
mod terminal;

use std::future::Future;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, bail};
use commands::CommandLine;
use starve_common::config::Config;
use starve_common::network::interface::{self, LinkInfo};
use starve_common::notice;
use starve_core::network::channel::PnetLink;
use starve_core::{AttackError, Orchestrator, Outcome, StopSignal};
use terminal::{logging, print};

/// Exit status after a user interrupt.
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let cfg = CommandLine::parse_args().into_config();

    logging::init(&cfg);
    print::header("dhcp pool exhaustion");
    print::options(&cfg);

    match run(cfg).await {
        Ok(outcome) => {
            print::summary(&outcome);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{e:#}");
            exit_code(&e)
        }
    }
}

async fn run(cfg: Config) -> anyhow::Result<Outcome> {
    if !is_root::is_root() {
        bail!("raw link-layer access needs root privileges");
    }
    let intf = interface::find_by_name(&cfg.interface)?;
    let local = LinkInfo::for_mode(&intf, cfg.mode)?;
    let link = PnetLink::open(&intf, cfg.fuzz)
        .with_context(|| format!("opening a channel on {}", intf.name))?;
    tracing::debug!("using {} ({})", local.name, local.mac);

    let stop = StopSignal::new();
    let interrupt = stop.clone();
    tokio::spawn(async move {
        if forward_interrupts(tokio::signal::ctrl_c, &interrupt).await {
            std::process::exit(i32::from(EXIT_INTERRUPTED));
        }
    });

    let outcome = Orchestrator::new(cfg, local, Arc::new(link), stop)
        .run()
        .await?;
    Ok(outcome)
}

/// Triggers `stop` on the first interrupt. Returns `true` if a second one
/// arrives before shutdown completes.
async fn forward_interrupts<F, Fut>(mut next_signal: F, stop: &StopSignal) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if next_signal().await.is_err() {
        return false;
    }
    notice!("interrupted, stopping all workers");
    stop.trigger();
    if next_signal().await.is_err() {
        return false;
    }
    notice!("interrupted again, exiting now");
    true
}

fn exit_code(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<AttackError>() {
        Some(AttackError::Interrupted) => ExitCode::from(EXIT_INTERRUPTED),
        _ => ExitCode::FAILURE,
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
