use std::io::{self, Write};

use colored::*;
use starve_common::config::Config;
use starve_common::log::Tag;
use tracing::{Event, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::{self, Writer};
use tracing_subscriber::fmt::{FmtContext, FormatEvent};
use tracing_subscriber::registry::LookupSpan;

/// Verbosity at which every event is reduced to one character.
pub const VERBOSITY_MINIMAL: u8 = 1;
/// Verbosity from which debug events are shown.
pub const VERBOSITY_DEBUG: u8 = 99;

pub struct StarveFormatter {
    minimal: bool,
    fuzz: bool,
}

impl StarveFormatter {
    pub fn new(cfg: &Config) -> Self {
        Self {
            minimal: cfg.verbosity == VERBOSITY_MINIMAL,
            fuzz: cfg.fuzz,
        }
    }

    /// The text written for one event, `None` when the event is not shown.
    fn render(&self, tag: Tag, message: &str) -> Option<String> {
        if self.minimal {
            return tag.symbol().map(|symbol| paint(tag, symbol.to_string()).to_string());
        }
        let mut line = match tag.prefix() {
            Some(prefix) => format!("{prefix} {message}"),
            None => message.to_string(),
        };
        if self.fuzz {
            line.insert_str(0, "[FUZZ] ");
        }
        Some(format!("{}\n", paint(tag, line)))
    }
}

fn paint(tag: Tag, text: String) -> ColoredString {
    match tag {
        Tag::Received => text.green(),
        Tag::LinkReceived => text.blue(),
        Tag::LinkSent => text.cyan(),
        Tag::Sent => text.white(),
        Tag::Waiting => text.yellow(),
        Tag::Debug => text.purple(),
        Tag::Notice | Tag::Error => text.red().bold(),
        Tag::Warning => text.yellow().bold(),
        Tag::Plain => text.normal(),
    }
}

impl<S, N> FormatEvent<S, N> for StarveFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> format::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let tag = Tag::of(event.metadata());
        let mut message = String::new();
        ctx.field_format()
            .format_fields(Writer::new(&mut message), event)?;

        match self.render(tag, &message) {
            Some(text) => write!(writer, "{text}"),
            None => Ok(()),
        }
    }
}

/// Stdout that flushes after every event, so minimal output shows up
/// without waiting for a newline.
pub struct FlushingStdout;

impl Write for FlushingStdout {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut out = io::stdout().lock();
        let written = out.write(buf)?;
        out.flush()?;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()
    }
}

fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::OFF,
        v if v >= VERBOSITY_DEBUG => LevelFilter::DEBUG,
        _ => LevelFilter::INFO,
    }
}

pub fn init(cfg: &Config) {
    colored::control::set_override(cfg.color);
    let filter = EnvFilter::builder()
        .with_default_directive(level_for(cfg.verbosity).into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .event_format(StarveFormatter::new(cfg))
        .with_writer(|| FlushingStdout)
        .init();
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;

    fn formatter(verbosity: u8, fuzz: bool) -> StarveFormatter {
        colored::control::set_override(false);
        let mut cfg = Config::new("eth0");
        cfg.verbosity = verbosity;
        cfg.fuzz = fuzz;
        StarveFormatter::new(&cfg)
    }

    #[test]
    fn normal_lines_carry_the_tag_prefix() {
        let f = formatter(10, false);
        assert_eq!(f.render(Tag::Sent, "DHCP_Discover").as_deref(), Some("[--->] DHCP_Discover\n"));
        assert_eq!(f.render(Tag::Notice, "[DONE]").as_deref(), Some("[ -- ] [DONE]\n"));
        assert_eq!(f.render(Tag::Plain, "hello").as_deref(), Some("hello\n"));
    }

    #[test]
    fn fuzz_mode_marks_every_line() {
        let f = formatter(10, true);
        assert_eq!(
            f.render(Tag::Received, "DHCP_Offer").as_deref(),
            Some("[FUZZ] [<---] DHCP_Offer\n")
        );
    }

    #[test]
    fn minimal_verbosity_streams_symbols() {
        let f = formatter(VERBOSITY_MINIMAL, false);
        assert_eq!(f.render(Tag::Sent, "DHCP_Discover").as_deref(), Some("."));
        assert_eq!(f.render(Tag::Received, "DHCP_Offer").as_deref(), Some("!"));
        assert_eq!(f.render(Tag::Plain, "header"), None);
    }

    #[test]
    fn verbosity_selects_the_level() {
        assert_eq!(level_for(0), LevelFilter::OFF);
        assert_eq!(level_for(1), LevelFilter::INFO);
        assert_eq!(level_for(10), LevelFilter::INFO);
        assert_eq!(level_for(99), LevelFilter::DEBUG);
    }
}
