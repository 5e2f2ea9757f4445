//! Event categories of the attack log.
//!
//! Every line the engine emits belongs to one [`Tag`]. The tag travels as the
//! `tracing` target of the event, so the terminal layer can render it without
//! parsing the message. Use the exported macros instead of spelling the
//! targets by hand.

use tracing::{Level, Metadata};

pub const TARGET_RECEIVED: &str = "starve::received";
pub const TARGET_SENT: &str = "starve::sent";
pub const TARGET_LINK_RECEIVED: &str = "starve::link_received";
pub const TARGET_LINK_SENT: &str = "starve::link_sent";
pub const TARGET_WAITING: &str = "starve::waiting";
pub const TARGET_NOTICE: &str = "starve::notice";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// Inbound DHCP traffic (`<--`).
    Received,
    /// Outbound DHCP traffic (`-->`).
    Sent,
    /// Inbound ARP / ICMP (`<-`).
    LinkReceived,
    /// Outbound ARP / ICMP (`->`).
    LinkSent,
    Waiting,
    Debug,
    Notice,
    Warning,
    Error,
    Plain,
}

impl Tag {
    pub fn of(meta: &Metadata<'_>) -> Self {
        match meta.target() {
            TARGET_RECEIVED => return Tag::Received,
            TARGET_SENT => return Tag::Sent,
            TARGET_LINK_RECEIVED => return Tag::LinkReceived,
            TARGET_LINK_SENT => return Tag::LinkSent,
            TARGET_WAITING => return Tag::Waiting,
            TARGET_NOTICE => return Tag::Notice,
            _ => {}
        }
        match *meta.level() {
            Level::ERROR => Tag::Error,
            Level::WARN => Tag::Warning,
            Level::DEBUG | Level::TRACE => Tag::Debug,
            Level::INFO => Tag::Plain,
        }
    }

    /// Line prefix used at normal verbosity.
    pub fn prefix(&self) -> Option<&'static str> {
        match self {
            Tag::Received => Some("[<---]"),
            Tag::Sent => Some("[--->]"),
            Tag::LinkReceived => Some("[ <- ]"),
            Tag::LinkSent => Some("[ -> ]"),
            Tag::Waiting => Some("[ ?? ]"),
            Tag::Debug => Some("[DBG ]"),
            Tag::Notice => Some("[ -- ]"),
            Tag::Warning => Some("[ !! ]"),
            Tag::Error => Some("[XXXX]"),
            Tag::Plain => None,
        }
    }

    /// Single character streamed at minimal verbosity.
    pub fn symbol(&self) -> Option<char> {
        match self {
            Tag::Received => Some('!'),
            Tag::Sent => Some('.'),
            Tag::LinkSent => Some(':'),
            Tag::LinkReceived => Some(';'),
            Tag::Waiting => Some('?'),
            Tag::Debug => Some('D'),
            Tag::Notice => Some('N'),
            Tag::Warning => Some('W'),
            Tag::Error => Some('E'),
            Tag::Plain => None,
        }
    }
}

#[doc(hidden)]
pub mod __rt {
    pub use tracing;
}

/// Inbound DHCP / DHCPv6 event.
#[macro_export]
macro_rules! received {
    ($($arg:tt)*) => {
        $crate::log::__rt::tracing::info!(target: "starve::received", $($arg)*)
    };
}

/// Outbound DHCP / DHCPv6 event.
#[macro_export]
macro_rules! sent {
    ($($arg:tt)*) => {
        $crate::log::__rt::tracing::info!(target: "starve::sent", $($arg)*)
    };
}

/// Inbound ARP / ICMP event.
#[macro_export]
macro_rules! link_received {
    ($($arg:tt)*) => {
        $crate::log::__rt::tracing::info!(target: "starve::link_received", $($arg)*)
    };
}

/// Outbound ARP / ICMP event.
#[macro_export]
macro_rules! link_sent {
    ($($arg:tt)*) => {
        $crate::log::__rt::tracing::info!(target: "starve::link_sent", $($arg)*)
    };
}

#[macro_export]
macro_rules! waiting {
    ($($arg:tt)*) => {
        $crate::log::__rt::tracing::info!(target: "starve::waiting", $($arg)*)
    };
}

#[macro_export]
macro_rules! notice {
    ($($arg:tt)*) => {
        $crate::log::__rt::tracing::info!(target: "starve::notice", $($arg)*)
    };
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
