//! Rendering of reports and source listings.
//!
//! Reports are always JSON (compact or indented); the listing printed by
//! `ip-enrich list` is a small table, styled with anstyle when stdout is
//! an interactive terminal.

use std::fmt::{self, Write as _};
use std::io::{self, IsTerminal};
use std::str::FromStr;
use std::sync::Arc;

use anstyle::{AnsiColor, Color, Style};
use serde::{Deserialize, Serialize};

use crate::report::{Report, SourceResult};
use crate::sources::Source;

/// How a report is written to stdout.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Single-line JSON
    Json,
    /// Indented JSON
    #[default]
    Pretty,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Json => "json",
            OutputFormat::Pretty => "pretty",
        })
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "pretty" => Ok(OutputFormat::Pretty),
            other => Err(format!("unknown output format '{other}' (expected json or pretty)")),
        }
    }
}

/// Report formatter. Kept object safe so the format can be picked at runtime.
pub trait Formatter {
    fn format_report(&self, report: &Report) -> io::Result<String>;
}

pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl Formatter for JsonFormatter {
    fn format_report(&self, report: &Report) -> io::Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(report).map_err(io::Error::other)?
        } else {
            serde_json::to_string(report).map_err(io::Error::other)?
        };
        Ok(format!("{json}\n"))
    }
}

pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Json => Box::new(JsonFormatter::new(false)),
        OutputFormat::Pretty => Box::new(JsonFormatter::new(true)),
    }
}

pub struct Styles {
    pub header: Style,
    pub muted: Style,
    pub success: Style,
    pub error: Style,
}

impl Default for Styles {
    fn default() -> Self {
        Self {
            header: Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Blue))),
            muted: Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))),
            success: Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green))),
            error: Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        }
    }
}

/// Human-oriented text: the source table and per-source progress lines.
pub struct StyledFormatter {
    styles: Styles,
    use_colors: bool,
}

impl StyledFormatter {
    /// Colors only when stdout is a terminal and `NO_COLOR` is unset.
    pub fn new() -> Self {
        Self {
            styles: Styles::default(),
            use_colors: io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
        }
    }

    /// Same as `new`, but for text written to stderr.
    pub fn for_stderr() -> Self {
        Self {
            styles: Styles::default(),
            use_colors: io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
        }
    }

    pub fn without_colors() -> Self {
        Self {
            styles: Styles::default(),
            use_colors: false,
        }
    }

    fn styled(&self, text: &str, style: &Style) -> String {
        if self.use_colors {
            format!("{}{}{}", style.render(), text, style.render_reset())
        } else {
            text.to_string()
        }
    }

    /// `ID  NAME` table, one source per line, in the given order.
    pub fn format_sources(&self, sources: &[Arc<dyn Source>]) -> String {
        let width = sources
            .iter()
            .map(|s| s.id().len())
            .max()
            .unwrap_or(0)
            .max("ID".len());

        let mut out = String::new();
        let header = format!("{:<width$}  NAME", "ID");
        let _ = writeln!(out, "{}", self.styled(&header, &self.styles.header));
        for source in sources {
            let _ = writeln!(out, "{:<width$}  {}", source.id(), source.name());
        }
        out
    }

    /// One line describing a finished source, for progress output.
    pub fn format_progress(&self, result: &SourceResult) -> String {
        match &result.error {
            None if result.payload.is_none() => format!(
                "{} {} {}",
                self.styled("✓", &self.styles.success),
                result.source_name,
                self.styled("(no data)", &self.styles.muted)
            ),
            None => format!(
                "{} {}",
                self.styled("✓", &self.styles.success),
                result.source_name
            ),
            Some(err) => format!(
                "{} {} {}",
                self.styled("✗", &self.styles.error),
                result.source_name,
                self.styled(err, &self.styles.muted)
            ),
        }
    }
}

impl Default for StyledFormatter {
    fn default() -> Self {
        Self::new()
    }
}
