use std::net::Ipv4Addr;
use std::time::Duration;

use clap::Parser;
use pnet::util::MacAddr;
use starve_common::config::{self, Attacks, Config, Display, Mode, Timeouts};
use starve_common::network::mac;

#[derive(Parser, Debug)]
#[command(name = "starve")]
#[command(version, about = "Enhanced DHCP pool exhaustion.")]
pub struct CommandLine {
    /// Interface to attack on
    pub interface: String,

    /// 0 silent, 1 minimal, 10 default, 99 debug
    #[arg(short = 'v', long, default_value_t = 10)]
    pub verbosity: u8,

    /// DHCPv6 instead of DHCPv4
    #[arg(short = '6', long)]
    pub ipv6: bool,

    /// Ask DHCPv6 servers for a two-way exchange
    #[arg(short = '1', long = "v6-rapid-commit")]
    pub rapid_commit: bool,

    /// Client MACs to rotate through, e.g. 00:11:22:33:44:55,00:11:22:33:44:56
    #[arg(short = 's', long = "client-src", value_delimiter = ',', value_parser = parse_mac)]
    pub client_src: Vec<MacAddr>,

    /// Option codes to request, e.g. 21,22,23 or 12,14-19,23 (default 0-79)
    #[arg(short = 'O', long = "request-options", value_parser = parse_option_codes)]
    pub request_options: Option<OptionCodes>,

    /// Randomly fuzz outgoing DHCP payloads
    #[arg(short = 'f', long)]
    pub fuzz: bool,

    /// Number of sender threads
    #[arg(short = 't', long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    pub threads: u16,

    /// Print ARP who-has requests and replies
    #[arg(short = 'a', long)]
    pub show_arp: bool,

    /// Print ICMP requests
    #[arg(short = 'i', long)]
    pub show_icmp: bool,

    /// Print full lease details
    #[arg(short = 'o', long)]
    pub show_options: bool,

    /// Print DHCP acks and DHCPv6 replies
    #[arg(short = 'l', long)]
    pub show_lease_confirm: bool,

    /// Knock the segment offline with gratuitous ARPs once exhausted
    #[arg(short = 'g', long = "neighbors-attack-garp")]
    pub garp: bool,

    /// Release the leases of all known neighbors
    #[arg(short = 'r', long = "neighbors-attack-release")]
    pub release: bool,

    /// ARP scan the local subnet for neighbors
    #[arg(short = 'n', long = "neighbors-scan-arp")]
    pub scan: bool,

    /// Pause between two discovers of one thread, in seconds
    #[arg(short = 'x', long = "timeout-threads", default_value = "0.4", value_parser = parse_seconds)]
    pub timeout_threads: Duration,

    /// Wait before the gratuitous ARP knockoff, in seconds
    #[arg(short = 'y', long = "timeout-dos", default_value = "8", value_parser = parse_seconds)]
    pub timeout_dos: Duration,

    /// Wait between two checks for a first server response, in seconds
    #[arg(short = 'z', long = "timeout-dhcprequest", default_value = "2", value_parser = parse_seconds)]
    pub timeout_request: Duration,

    /// Colored output
    #[arg(short = 'c', long)]
    pub color: bool,

    /// DHCP server whose offers are never answered
    #[arg(short = 'p', long = "protect-server", value_name = "IP")]
    pub protect_server: Option<Ipv4Addr>,

    /// Destination MAC of discovers and requests (broadcast by default)
    #[arg(short = 'm', long = "router-mac", value_name = "MAC", value_parser = parse_mac)]
    pub router_mac: Option<MacAddr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionCodes(pub Vec<u16>);

fn parse_mac(text: &str) -> Result<MacAddr, String> {
    mac::parse(text)
}

fn parse_option_codes(text: &str) -> Result<OptionCodes, String> {
    config::parse_option_codes(text)
        .map(OptionCodes)
        .map_err(|e| e.to_string())
}

fn parse_seconds(text: &str) -> Result<Duration, String> {
    let seconds: f64 = text
        .parse()
        .map_err(|_| format!("'{text}' is not a number of seconds"))?;
    Duration::try_from_secs_f64(seconds).map_err(|e| format!("'{text}': {e}"))
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn into_config(self) -> Config {
        let defaults = Config::new(self.interface.clone());
        Config {
            interface: self.interface,
            mode: if self.ipv6 { Mode::V6 } else { Mode::V4 },
            rapid_commit: self.rapid_commit,
            client_macs: self.client_src,
            request_options: self
                .request_options
                .map_or(defaults.request_options, |codes| codes.0),
            fuzz: self.fuzz,
            threads: usize::from(self.threads),
            display: Display {
                show_arp: self.show_arp,
                show_icmp: self.show_icmp,
                show_options: self.show_options,
                show_lease_confirm: self.show_lease_confirm,
            },
            attacks: Attacks {
                scan_neighbors: self.scan,
                release: self.release,
                knockoff: self.garp,
            },
            timeouts: Timeouts {
                sender_pacing: self.timeout_threads,
                exhaustion_wait: self.timeout_dos,
                server_retry: self.timeout_request,
                capture_window: defaults.timeouts.capture_window,
            },
            color: self.color,
            verbosity: self.verbosity,
            protected_server: self.protect_server,
            router_mac: self.router_mac,
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
