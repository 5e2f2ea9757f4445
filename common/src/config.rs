use std::net::Ipv4Addr;
use std::time::Duration;

use pnet::util::MacAddr;
use thiserror::Error;

/// Consecutive capture windows without an offer before the pool counts as exhausted.
pub const IDLE_WINDOW_LIMIT: u32 = 5;

/// How many times the orchestrator polls for a first server response.
pub const SERVER_RETRY_BUDGET: u32 = 20;

/// Spacing between two probes of the ARP neighbor sweep.
pub const ARP_SWEEP_SPACING: Duration = Duration::from_millis(5);

/// Option codes requested by DHCPv6 solicits when the user did not pick any.
pub const DEFAULT_REQUEST_OPTIONS: std::ops::RangeInclusive<u16> = 0..=79;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    V4,
    V6,
}

/// Named durations driving every wait of the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timeouts {
    /// Sleep between two discovers of one sender loop. Zero disables pacing.
    pub sender_pacing: Duration,
    /// Poll interval while waiting for exhaustion, also the delay before the knockoff.
    pub exhaustion_wait: Duration,
    /// Poll interval while waiting for the first server response.
    pub server_retry: Duration,
    /// Length of one dispatcher capture window.
    pub capture_window: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            sender_pacing: Duration::from_millis(400),
            exhaustion_wait: Duration::from_secs(8),
            server_retry: Duration::from_secs(2),
            capture_window: Duration::from_secs(3),
        }
    }
}

/// What the dispatcher reports beyond offers and requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Display {
    pub show_arp: bool,
    pub show_icmp: bool,
    pub show_options: bool,
    pub show_lease_confirm: bool,
}

/// Secondary attacks run around the exhaustion phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Attacks {
    /// Sweep the local subnet with ARP probes once a server answered.
    pub scan_neighbors: bool,
    /// Release the lease of every known neighbor.
    pub release: bool,
    /// Poison the segment with gratuitous ARP replies after exhaustion.
    pub knockoff: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub interface: String,
    pub mode: Mode,
    /// Ask DHCPv6 servers for the two-message exchange.
    pub rapid_commit: bool,
    /// Client hardware addresses to rotate through instead of random ones.
    pub client_macs: Vec<MacAddr>,
    pub request_options: Vec<u16>,
    pub fuzz: bool,
    pub threads: usize,
    pub display: Display,
    pub attacks: Attacks,
    pub timeouts: Timeouts,
    pub color: bool,
    pub verbosity: u8,
    /// Offers from this server are never answered.
    pub protected_server: Option<Ipv4Addr>,
    /// Destination MAC of IPv4 discovers and requests. Broadcast when unset.
    pub router_mac: Option<MacAddr>,
}

impl Config {
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            mode: Mode::V4,
            rapid_commit: false,
            client_macs: Vec::new(),
            request_options: DEFAULT_REQUEST_OPTIONS.collect(),
            fuzz: false,
            threads: 1,
            display: Display::default(),
            attacks: Attacks::default(),
            timeouts: Timeouts::default(),
            color: false,
            verbosity: 10,
            protected_server: None,
            router_mac: None,
        }
    }

    pub fn is_debug(&self) -> bool {
        self.verbosity >= 99
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionListError {
    #[error("'{0}' is not an option code")]
    NotACode(String),
    #[error("'{0}' is not a valid option range")]
    BadRange(String),
    #[error("{0} option codes requested, at most {MAX_REQUEST_OPTIONS} fit in a request")]
    TooMany(usize),
}

/// Upper bound on requested option codes.
pub const MAX_REQUEST_OPTIONS: usize = 255;

/// Parses a requested option list such as `12,14-19,23`.
///
/// Ranges are inclusive on both ends.
pub fn parse_option_codes(list: &str) -> Result<Vec<u16>, OptionListError> {
    let mut codes: Vec<u16> = Vec::new();
    for item in list.split(',').map(str::trim).filter(|item| !item.is_empty()) {
        match item.split_once('-') {
            Some((start, end)) => {
                let start: u16 = start
                    .trim()
                    .parse()
                    .map_err(|_| OptionListError::BadRange(item.to_string()))?;
                let end: u16 = end
                    .trim()
                    .parse()
                    .map_err(|_| OptionListError::BadRange(item.to_string()))?;
                if start > end {
                    return Err(OptionListError::BadRange(item.to_string()));
                }
                codes.extend(start..=end);
            }
            None => codes.push(
                item.parse()
                    .map_err(|_| OptionListError::NotACode(item.to_string()))?,
            ),
        }
        if codes.len() > MAX_REQUEST_OPTIONS {
            return Err(OptionListError::TooMany(codes.len()));
        }
    }
    Ok(codes)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
