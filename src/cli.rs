use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

/// Command-line interface definition.
///
/// Verbosity levels (ignored when `RUST_LOG` is set):
/// 0 - silent (only the report)
/// 1 - errors
/// 2 - warnings + errors (default)
/// 3 - per-source progress
/// 4 - debug
/// 5 - trace
#[derive(Parser, Debug, Clone)]
#[command(
    name = "ip-enrich",
    author,
    version,
    about = "Query threat and reputation sources for an IP address concurrently",
    subcommand_negates_reqs = true
)]
pub struct Cli {
    /// Target IP address (IPv4 or IPv6)
    #[arg(required_unless_present = "generate_schema")]
    pub ip: Option<String>,

    /// Comma separated source ids to query (default: all)
    #[arg(short = 'p', long, value_name = "IDS")]
    pub sources: Option<String>,

    /// Report format
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Overall deadline in seconds
    #[arg(short, long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Verbosity level (0-5)
    #[arg(long, global = true, default_value_t = 2)]
    pub verbose: u8,

    /// Print the JSON schema of the report and exit
    #[arg(long)]
    pub generate_schema: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List available sources
    List,
}

impl Cli {
    /// Parse CLI arguments from process args.
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Print a line per finished source?
    pub fn show_progress(&self) -> bool {
        self.verbose >= 3
    }

    pub fn warn_enabled(&self) -> bool {
        self.verbose >= 2
    }

    pub fn error_enabled(&self) -> bool {
        self.verbose >= 1
    }
}
