use std::fmt::Display;

use colored::*;
use starve_common::config::{Config, Mode};
use starve_core::Outcome;

pub const TOTAL_WIDTH: usize = 64;
const KEY_WIDTH: usize = 24;

pub fn print(msg: &str) {
    tracing::info!(target: "starve::print", "{msg}");
}

pub fn header(msg: &str) {
    let formatted: String = format!("⟦ {} ⟧", msg);
    let msg_len: usize = formatted.chars().count();

    let dash_count: usize = TOTAL_WIDTH.saturating_sub(msg_len);
    let left: usize = dash_count / 2;
    let right: usize = dash_count - left;

    let line: ColoredString = format!(
        "{}{}{}",
        "─".repeat(left),
        formatted.to_uppercase().bright_green(),
        "─".repeat(right)
    )
    .bright_black();

    print(&format!("{}", line));
}

fn aligned_line<V: Display>(key: &str, value: V) -> String {
    let dots: String = ".".repeat((KEY_WIDTH + 1).saturating_sub(key.len()));
    format!("{}{}: {}", key, dots.bright_black(), value)
}

/// Effective options, shown at debug verbosity.
pub fn options(cfg: &Config) {
    if !cfg.is_debug() {
        return;
    }
    let seconds = |d: std::time::Duration| format!("{:.3}s", d.as_secs_f64());
    let lines = [
        aligned_line("interface", &cfg.interface),
        aligned_line("IPv6", cfg.mode == Mode::V6),
        aligned_line("v6 rapid commit", cfg.rapid_commit),
        aligned_line("fuzz", cfg.fuzz),
        aligned_line("sender threads", cfg.threads),
        aligned_line("client MACs", cfg.client_macs.len()),
        aligned_line("requested options", cfg.request_options.len()),
        aligned_line("show ARP", cfg.display.show_arp),
        aligned_line("show ICMP", cfg.display.show_icmp),
        aligned_line("show lease options", cfg.display.show_options),
        aligned_line("show lease confirm", cfg.display.show_lease_confirm),
        aligned_line("neighbor scan", cfg.attacks.scan_neighbors),
        aligned_line("neighbor release", cfg.attacks.release),
        aligned_line("gratuitous ARP knockoff", cfg.attacks.knockoff),
        aligned_line("timeout threads", seconds(cfg.timeouts.sender_pacing)),
        aligned_line("timeout dos", seconds(cfg.timeouts.exhaustion_wait)),
        aligned_line("timeout dhcp request", seconds(cfg.timeouts.server_retry)),
        aligned_line(
            "protected server",
            cfg.protected_server.map_or_else(|| "-".to_string(), |ip| ip.to_string()),
        ),
        aligned_line(
            "router MAC",
            cfg.router_mac.map_or_else(|| "broadcast".to_string(), |mac| mac.to_string()),
        ),
    ];
    tracing::debug!("---------------------[OPTIONS]-----------");
    for line in lines {
        tracing::debug!("{line}");
    }
}

pub fn summary(outcome: &Outcome) {
    header("results");
    if let Some(server) = outcome.server {
        print(&aligned_line("DHCP server", format!("{} ({})", server.addr, server.mac)));
    }
    print(&aligned_line("ARP probes sent", outcome.probed));
    print(&aligned_line("neighbors known", outcome.neighbors));
    print(&aligned_line("leases released", outcome.released));
    print(&aligned_line("addresses knocked off", outcome.knocked_off));
    print(&"═".repeat(TOTAL_WIDTH).bright_black().to_string());
}
