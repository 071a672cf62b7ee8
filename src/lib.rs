//! ipenrich library
//!
//! Enrich a single IP address with threat and reputation data from several
//! independent sources at once. The library provides:
//!
//! - A uniform `Source` trait that any provider plugs into
//! - A `SourceRegistry` for choosing which sources run
//! - An `Executor` that fans out concurrently under one deadline and
//!   always returns one result per source, failures included
//! - A normalized `Report` ready for rendering
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use ipenrich::providers::register_builtin;
//! use ipenrich::{Executor, Report, RunContext, SourceRegistry};
//!
//! # async fn demo() -> ipenrich::Result<()> {
//! let registry = SourceRegistry::new();
//! register_builtin(&registry)?;
//! let sources = registry.filter(&["shodan", "greynoise"]);
//!
//! let executor = Executor::new()?;
//! let ctx = RunContext::with_timeout(Duration::from_secs(10));
//! let results = executor.execute(&ctx, "1.1.1.1", &sources, None).await?;
//!
//! let report = Report::new("1.1.1.1", results);
//! println!("{}", serde_json::to_string_pretty(&report).unwrap());
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod cli;
pub mod config;
pub mod context;
pub mod errors;
pub mod executor;
pub mod logging;
pub mod netutil;
pub mod output;
pub mod providers;
pub mod registry;
pub mod report;
pub mod sources;
pub mod transport;

// Re-export commonly used types for convenience
pub use context::{CancelReason, RunContext};
pub use errors::{ErrorCategory, ErrorKind, IpEnrichError, Result};
pub use executor::{Executor, ExecutorBuilder, MAX_BODY_SIZE, Stage};
pub use output::OutputFormat;
pub use registry::{SourceRegistry, SourceRegistryBuilder};
pub use report::{Report, ReportSummary, SourceResult};
pub use sources::{Source, SourceDescriptor, SourceRequest};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport, TransportError};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
