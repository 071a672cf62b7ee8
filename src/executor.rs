//! Concurrent fan-out of one IP lookup across many sources.
//!
//! Each source runs as its own tokio task under a shared `RunContext`.
//! Finished results flow through a single mpsc channel to one collector,
//! so there is no shared result buffer to lock. Guarantees:
//!   * one `SourceResult` per requested source, failures included
//!   * results (and callbacks) arrive in completion order
//!   * when the context ends, in-flight requests resolve to
//!     `cancelled` / `timeout` results instead of hanging
//!   * a panicking source becomes an `internal` result

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, info, trace};

use crate::context::RunContext;
use crate::errors::{IpEnrichError, Result};
use crate::report::SourceResult;
use crate::sources::Source;
use crate::transport::{HttpTransport, ReqwestTransport, TransportError};

/// Upper bound on bytes read from any single response body.
pub const MAX_BODY_SIZE: usize = 5 * 1024 * 1024;

/// Client-level timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Invoked once per result, in completion order.
pub type ResultCallback = dyn Fn(&SourceResult) + Send + Sync;

/// Position of one source invocation in its lifecycle.
///
/// `Pending -> Building -> (BuildFailed | Built -> Requesting ->
/// (TransportFailed | Responded -> Parsing -> (ParseFailed | Parsed)))`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Pending,
    Building,
    BuildFailed,
    Built,
    Requesting,
    TransportFailed,
    Responded,
    Parsing,
    ParseFailed,
    Parsed,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Stage::BuildFailed | Stage::TransportFailed | Stage::ParseFailed | Stage::Parsed
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Pending => "pending",
            Stage::Building => "building",
            Stage::BuildFailed => "build_failed",
            Stage::Built => "built",
            Stage::Requesting => "requesting",
            Stage::TransportFailed => "transport_failed",
            Stage::Responded => "responded",
            Stage::Parsing => "parsing",
            Stage::ParseFailed => "parse_failed",
            Stage::Parsed => "parsed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone)]
pub struct Executor {
    transport: Arc<dyn HttpTransport>,
    max_body_size: usize,
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("max_body_size", &self.max_body_size)
            .finish_non_exhaustive()
    }
}

impl Executor {
    /// Executor over a default reqwest client.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> ExecutorBuilder {
        ExecutorBuilder::default()
    }

    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }

    /// Query every source for `ip` concurrently and wait for all of them.
    ///
    /// Returns `NoSourcesMatched` when `sources` is empty; otherwise every
    /// per-source failure is carried inside its result and the call itself
    /// succeeds. Results are in completion order.
    pub async fn execute(
        &self,
        ctx: &RunContext,
        ip: &str,
        sources: &[Arc<dyn Source>],
        callback: Option<&ResultCallback>,
    ) -> Result<Vec<SourceResult>> {
        let started = Instant::now();
        let mut rx = self.execute_stream(ctx, ip, sources)?;

        let mut results = Vec::with_capacity(sources.len());
        while let Some(result) = rx.recv().await {
            if let Some(cb) = callback {
                cb(&result);
            }
            results.push(result);
        }

        let failed = results.iter().filter(|r| !r.is_success()).count();
        info!(
            ip,
            total = results.len(),
            failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "enrichment finished"
        );
        Ok(results)
    }

    /// Like `execute`, but hands results out as they complete. The channel
    /// closes after the last source reached a terminal state.
    pub fn execute_stream(
        &self,
        ctx: &RunContext,
        ip: &str,
        sources: &[Arc<dyn Source>],
    ) -> Result<mpsc::Receiver<SourceResult>> {
        if sources.is_empty() {
            return Err(IpEnrichError::NoSourcesMatched);
        }

        debug!(ip, sources = sources.len(), "starting enrichment");

        // Capacity covers every result, so units never wait on the reader.
        let (tx, rx) = mpsc::channel(sources.len());
        let ip: Arc<str> = Arc::from(ip);

        for source in sources {
            let unit = run_one(
                Arc::clone(&self.transport),
                self.max_body_size,
                ctx.clone(),
                Arc::clone(&ip),
                Arc::clone(source),
            );
            let source = Arc::clone(source);
            let tx = tx.clone();

            tokio::spawn(async move {
                let handle = tokio::spawn(unit);
                let _guard = AbortOnDrop(handle.abort_handle());
                let result = match handle.await {
                    Ok(result) => result,
                    Err(e) => {
                        let err = IpEnrichError::internal(format!("source task failed: {e}"));
                        debug!(source = source.id(), error = %err, "source task aborted");
                        SourceResult::failure(source.as_ref(), 0, &err)
                    }
                };
                // Receiver gone means the caller stopped listening.
                let _ = tx.send(result).await;
            });
        }

        Ok(rx)
    }
}

#[derive(Clone)]
pub struct ExecutorBuilder {
    timeout: Duration,
    transport: Option<Arc<dyn HttpTransport>>,
    max_body_size: usize,
}

impl Default for ExecutorBuilder {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            transport: None,
            max_body_size: MAX_BODY_SIZE,
        }
    }
}

impl ExecutorBuilder {
    /// Client-level timeout for the default transport.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use a custom (or shared) transport instead of a fresh reqwest client.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = bytes;
        self
    }

    pub fn build(self) -> Result<Executor> {
        let transport = match self.transport {
            Some(t) => t,
            None => Arc::new(ReqwestTransport::new(self.timeout)?),
        };
        Ok(Executor {
            transport,
            max_body_size: self.max_body_size,
        })
    }
}

/// Aborts the wrapped task when the supervising task goes away.
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

async fn run_one(
    transport: Arc<dyn HttpTransport>,
    max_body: usize,
    ctx: RunContext,
    ip: Arc<str>,
    source: Arc<dyn Source>,
) -> SourceResult {
    let started = Instant::now();
    let source = source.as_ref();
    trace!(source = source.id(), stage = %Stage::Pending);

    trace!(source = source.id(), stage = %Stage::Building);
    let request = match source.build_request(&ip, &ctx) {
        Ok(request) => request,
        Err(e) => return finish(source, Stage::BuildFailed, 0, Err(e), started),
    };
    trace!(source = source.id(), stage = %Stage::Built, url = %request.url);

    // Context may already be over before dialing.
    if let Some(reason) = ctx.state() {
        return finish(source, Stage::TransportFailed, 0, Err(reason.into_error()), started);
    }

    trace!(source = source.id(), stage = %Stage::Requesting);
    let response = tokio::select! {
        biased;
        reason = ctx.done() => Err((0, reason.into_error())),
        res = transport.send(&request, max_body) => res.map_err(|e| classify(&ctx, e)),
    };
    let response = match response {
        Ok(response) => response,
        Err((status, e)) => return finish(source, Stage::TransportFailed, status, Err(e), started),
    };

    trace!(
        source = source.id(),
        stage = %Stage::Responded,
        status = response.status,
        bytes = response.body.len(),
        truncated = response.truncated
    );

    trace!(source = source.id(), stage = %Stage::Parsing);
    match source.parse_response(&response.body, response.status) {
        Ok(result) => finish(source, Stage::Parsed, response.status, Ok(result), started),
        Err(e) => finish(source, Stage::ParseFailed, response.status, Err(e), started),
    }
}

/// Map a transport failure to a result error, preferring the context's own
/// reason when it has already ended.
fn classify(ctx: &RunContext, err: TransportError) -> (u16, IpEnrichError) {
    if let Some(reason) = ctx.state() {
        return (0, reason.into_error());
    }
    match err {
        TransportError::Timeout => (0, IpEnrichError::Timeout),
        other => (other.status(), IpEnrichError::transport(other)),
    }
}

fn finish(
    source: &dyn Source,
    stage: Stage,
    status: u16,
    outcome: Result<SourceResult>,
    started: Instant,
) -> SourceResult {
    debug_assert!(stage.is_terminal());
    let elapsed_ms = started.elapsed().as_millis() as u64;
    match outcome {
        Ok(result) => {
            debug!(source = source.id(), %stage, status, elapsed_ms, "source finished");
            result
        }
        Err(e) => {
            debug!(
                source = source.id(),
                %stage,
                status,
                elapsed_ms,
                category = %e.category(),
                kind = ?e.kind(),
                error = %e,
                "source failed"
            );
            SourceResult::failure(source, status, &e)
        }
    }
}
