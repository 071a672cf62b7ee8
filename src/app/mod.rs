//! High-level application orchestration layer.
//!
//! `App` is the CLI-facing façade around the library. Steps in `App::run`:
//!   1. Schema generation early-exit
//!   2. Config load / validation
//!   3. Source registry setup (`list` short-circuits here)
//!   4. IP validation
//!   5. Source selection (unknown ids warned about and dropped)
//!   6. Concurrent enrichment under a deadline, Ctrl-C cancels
//!   7. Report rendering to stdout
//!
//! User-facing problems are reported on stderr and mapped to exit code 1;
//! only unexpected failures surface as `Err`.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::context::RunContext;
use crate::errors::{IpEnrichError, Result};
use crate::executor::{Executor, ResultCallback};
use crate::netutil::{is_non_public, parse_ip};
use crate::output::{StyledFormatter, create_formatter};
use crate::providers::register_builtin;
use crate::registry::SourceRegistry;
use crate::report::{Report, SourceResult};
use crate::sources::Source;

/// Sources resolved from a request, plus the ids that matched nothing.
pub struct Selection {
    pub sources: Vec<Arc<dyn Source>>,
    pub unknown: Vec<String>,
}

impl Selection {
    /// `UnknownSource` listing the unmatched ids, if there were any.
    pub fn unknown_error(&self) -> Option<IpEnrichError> {
        if self.unknown.is_empty() {
            return None;
        }
        Some(IpEnrichError::UnknownSource {
            ids: self.unknown.clone(),
        })
    }
}

/// Application façade.
pub struct App;

impl App {
    /// Execute the end-to-end enrichment workflow.
    ///
    /// Returns: intended process exit code (0 = success, 1 = user/input error).
    pub async fn run(cli: &Cli) -> Result<i32> {
        if Self::maybe_print_schema(cli)? {
            return Ok(0);
        }

        let Some(config) = Self::load_config(cli) else {
            return Ok(1);
        };

        let registry = SourceRegistry::new();
        register_builtin(&registry)?;

        if let Some(Command::List) = cli.command {
            print!("{}", StyledFormatter::new().format_sources(&registry.all()));
            return Ok(0);
        }

        let Some(ip) = Self::resolve_ip(cli) else {
            return Ok(1);
        };

        let selection = Self::select(&registry, &config.output.sources);
        if let Some(err) = selection.unknown_error() {
            warn!(category = %err.category(), "{err} (ignored)");
        }
        if selection.sources.is_empty() {
            return Ok(Self::fail(cli, &IpEnrichError::NoSourcesMatched));
        }

        let executor = Executor::builder()
            .timeout(config.network.timeout)
            .max_body_size(config.network.max_body_size)
            .build()?;

        let report = Self::enrich(cli, &config, &executor, ip, &selection.sources).await?;

        let rendered = create_formatter(config.output.format)
            .format_report(&report)
            .map_err(|e| IpEnrichError::io("rendering report", e))?;
        print!("{rendered}");

        Ok(0)
    }

    /// Resolve requested ids against `registry`.
    pub fn select(registry: &SourceRegistry, requested: &[String]) -> Selection {
        Selection {
            sources: registry.filter(requested),
            unknown: registry.validate(requested),
        }
    }
}

/// Helpers: early exits and input handling.
impl App {
    fn maybe_print_schema(cli: &Cli) -> Result<bool> {
        if cli.generate_schema {
            match Report::json_schema() {
                Ok(schema) => {
                    println!("{schema}");
                }
                Err(e) => {
                    return Err(IpEnrichError::internal(format!(
                        "failed to generate JSON schema: {e}"
                    )));
                }
            }
            return Ok(true);
        }
        Ok(false)
    }

    /// Report a fatal input problem on stderr; returns the exit code.
    fn fail(cli: &Cli, err: &IpEnrichError) -> i32 {
        debug!(category = %err.category(), kind = ?err.kind(), error = %err, "run stopped");
        if cli.error_enabled() {
            eprintln!("Error ({}): {err}", err.category());
        }
        1
    }

    fn load_config(cli: &Cli) -> Option<Config> {
        let mut config = Config::from_env();
        config.merge_with_cli(cli);
        if let Err(e) = config.validate() {
            let err: IpEnrichError = e.into();
            Self::fail(cli, &err);
            return None;
        }
        debug!(?config, "configuration loaded");
        Some(config)
    }

    fn resolve_ip(cli: &Cli) -> Option<IpAddr> {
        let raw = cli.ip.as_deref().unwrap_or_default();
        match parse_ip(raw) {
            Ok(ip) => {
                if is_non_public(ip) && cli.warn_enabled() {
                    eprintln!(
                        "Warning: {ip} is not a public address; most sources will have no data"
                    );
                }
                Some(ip)
            }
            Err(e) => {
                Self::fail(cli, &e);
                None
            }
        }
    }
}

/// Helper: the concurrent run itself.
impl App {
    async fn enrich(
        cli: &Cli,
        config: &Config,
        executor: &Executor,
        ip: IpAddr,
        sources: &[Arc<dyn Source>],
    ) -> Result<Report> {
        let start_time = Instant::now();
        let ctx = RunContext::with_timeout(config.network.timeout);

        let signal_ctx = ctx.clone();
        let signal_task = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, cancelling outstanding sources");
                signal_ctx.cancel();
            }
        });

        let progress = StyledFormatter::for_stderr();
        let show_progress = cli.show_progress();
        let print_progress = move |result: &SourceResult| {
            if show_progress {
                eprintln!("{}", progress.format_progress(result));
            }
        };
        let on_result: &ResultCallback = &print_progress;

        let ip = ip.to_string();
        let outcome = executor.execute(&ctx, &ip, sources, Some(on_result)).await;
        signal_task.abort();

        let report = Report::new(ip, outcome?);
        let summary = report.summary();
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            empty = summary.empty,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "report ready"
        );
        Ok(report)
    }
}
