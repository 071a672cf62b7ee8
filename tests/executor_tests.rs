//! Executor scenarios against a scripted in-memory transport.
//!
//! No test here touches the network: every source points at a fake
//! `<id>.test` host and the transport answers from a script keyed by host.
//! Deadline behaviour runs on tokio's paused clock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use ipenrich::errors::{ErrorKind, IpEnrichError, Result};
use ipenrich::executor::ResultCallback;
use ipenrich::sources::{SourceDescriptor, SourceRequest, decode_json};
use ipenrich::{
    Executor, HttpResponse, HttpTransport, Report, RunContext, Source, SourceRegistry,
    SourceResult, TransportError,
};

/// What the fake upstream does for one host.
#[derive(Clone)]
enum Reply {
    Respond(u16, &'static str),
    After(Duration, u16, &'static str),
    Hang,
    Fail(TransportError),
}

#[derive(Default)]
struct ScriptedTransport {
    replies: HashMap<String, Reply>,
    calls: AtomicUsize,
    body_limits: Mutex<Vec<usize>>,
}

impl ScriptedTransport {
    fn new() -> Self {
        Self::default()
    }

    fn on(mut self, id: &str, reply: Reply) -> Self {
        self.replies.insert(format!("{id}.test"), reply);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn respond(status: u16, body: &str, max_body: usize) -> HttpResponse {
    let bytes = body.as_bytes();
    let kept = bytes.len().min(max_body);
    HttpResponse {
        status,
        body: bytes[..kept].to_vec(),
        truncated: kept < bytes.len(),
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(
        &self,
        request: &SourceRequest,
        max_body: usize,
    ) -> std::result::Result<HttpResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.body_limits.lock().unwrap().push(max_body);

        let host = request.url.host_str().unwrap_or_default();
        match self.replies.get(host).cloned() {
            Some(Reply::Respond(status, body)) => Ok(respond(status, body, max_body)),
            Some(Reply::After(delay, status, body)) => {
                tokio::time::sleep(delay).await;
                Ok(respond(status, body, max_body))
            }
            Some(Reply::Hang) => std::future::pending().await,
            Some(Reply::Fail(err)) => Err(err),
            None => Err(TransportError::Connect(format!("no route to {host}"))),
        }
    }
}

/// Source following the usual policy: optional "known empty" status,
/// 200 only, JSON object payload, `{"ok": false}` as failure flag.
struct TestSource {
    descriptor: SourceDescriptor,
    empty_on: Option<u16>,
    panic_on_parse: bool,
}

impl TestSource {
    fn new(id: &str, name: &str) -> Self {
        Self::with_template(id, name, &format!("https://{id}.test/lookup/{{ip}}"))
    }

    fn with_template(id: &str, name: &str, template: &str) -> Self {
        Self {
            descriptor: SourceDescriptor::builder(id, name, template)
                .build()
                .unwrap(),
            empty_on: None,
            panic_on_parse: false,
        }
    }

    fn empty_on(mut self, status: u16) -> Self {
        self.empty_on = Some(status);
        self
    }

    fn panicking(mut self) -> Self {
        self.panic_on_parse = true;
        self
    }

    fn shared(self) -> Arc<dyn Source> {
        Arc::new(self)
    }
}

impl Source for TestSource {
    fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    fn parse_response(&self, body: &[u8], status_code: u16) -> Result<SourceResult> {
        if self.panic_on_parse {
            panic!("parser bug in {}", self.id());
        }
        if self.empty_on == Some(status_code) {
            return Ok(SourceResult::empty(self, status_code));
        }
        if status_code != 200 {
            return Err(IpEnrichError::unexpected_status(status_code));
        }
        let value: serde_json::Value = decode_json(body)?;
        if value.get("ok") == Some(&serde_json::Value::Bool(false)) {
            return Err(IpEnrichError::upstream_failure("ok=false"));
        }
        Ok(SourceResult::success(self, status_code, Some(value)))
    }
}

fn executor(transport: Arc<ScriptedTransport>) -> Executor {
    Executor::builder().transport(transport).build().unwrap()
}

fn by_id<'a>(results: &'a [SourceResult], id: &str) -> &'a SourceResult {
    results
        .iter()
        .find(|r| r.source_id == id)
        .unwrap_or_else(|| panic!("no result for {id}"))
}

#[tokio::test(start_paused = true)]
async fn success_empty_and_timeout_in_one_run() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on("a", Reply::Respond(200, r#"{"asn": 13335}"#))
            .on("b", Reply::Respond(404, r#"{"detail": "not found"}"#))
            .on("c", Reply::Hang),
    );
    let sources = vec![
        TestSource::new("a", "Alpha").shared(),
        TestSource::new("b", "Bravo").empty_on(404).shared(),
        TestSource::new("c", "Charlie").shared(),
    ];

    let ctx = RunContext::with_timeout(Duration::from_secs(10));
    let started = tokio::time::Instant::now();
    let results = executor(transport)
        .execute(&ctx, "1.1.1.1", &sources, None)
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    assert!(started.elapsed() >= Duration::from_secs(10));

    let a = by_id(&results, "a");
    assert!(a.is_success());
    assert_eq!(a.status_code, 200);
    assert_eq!(a.payload, Some(serde_json::json!({"asn": 13335})));

    let b = by_id(&results, "b");
    assert!(b.is_success());
    assert!(b.payload.is_none());
    assert_eq!(b.status_code, 404);

    let c = by_id(&results, "c");
    assert!(!c.is_success());
    assert_eq!(c.error_kind, Some(ErrorKind::Timeout));
    assert_eq!(c.status_code, 0);
}

#[tokio::test]
async fn every_failure_mode_still_yields_one_result_each() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on("ok", Reply::Respond(200, r#"{"x": 1}"#))
            .on("status", Reply::Respond(500, "oops"))
            .on("garbage", Reply::Respond(200, "<html>"))
            .on("flag", Reply::Respond(200, r#"{"ok": false}"#))
            .on("refused", Reply::Fail(TransportError::Connect("refused".into())))
            .on(
                "reset",
                Reply::Fail(TransportError::Body {
                    status: 200,
                    message: "connection reset".into(),
                }),
            ),
    );
    let ids = ["ok", "status", "garbage", "flag", "refused", "reset", "unrouted"];
    let sources: Vec<_> = ids
        .iter()
        .map(|id| TestSource::new(id, &id.to_uppercase()).shared())
        .collect();

    let results = executor(transport)
        .execute(
            &RunContext::with_timeout(Duration::from_secs(5)),
            "8.8.8.8",
            &sources,
            None,
        )
        .await
        .unwrap();

    assert_eq!(results.len(), ids.len());
    for id in ids {
        assert_eq!(results.iter().filter(|r| r.source_id == id).count(), 1);
    }

    let kind = |id: &str| by_id(&results, id).error_kind;
    assert_eq!(kind("ok"), None);
    assert_eq!(kind("status"), Some(ErrorKind::UnexpectedStatus));
    assert_eq!(kind("garbage"), Some(ErrorKind::Decode));
    assert_eq!(kind("flag"), Some(ErrorKind::UpstreamFailure));
    assert_eq!(kind("refused"), Some(ErrorKind::Transport));
    assert_eq!(kind("reset"), Some(ErrorKind::Transport));
    assert_eq!(kind("unrouted"), Some(ErrorKind::Transport));

    assert_eq!(by_id(&results, "status").status_code, 500);
    assert_eq!(by_id(&results, "garbage").status_code, 200);
    assert_eq!(by_id(&results, "reset").status_code, 200);
    assert_eq!(by_id(&results, "refused").status_code, 0);
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_in_flight_requests() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on("fast", Reply::Respond(200, "{}"))
            .on("slow", Reply::Hang),
    );
    let sources = vec![
        TestSource::new("fast", "Fast").shared(),
        TestSource::new("slow", "Slow").shared(),
    ];

    let ctx = RunContext::new();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        canceller.cancel();
    });

    let results = executor(transport)
        .execute(&ctx, "1.1.1.1", &sources, None)
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(by_id(&results, "fast").is_success());
    let slow = by_id(&results, "slow");
    assert_eq!(slow.error_kind, Some(ErrorKind::Cancelled));
    assert_eq!(slow.error.as_deref(), Some("operation cancelled"));
}

#[tokio::test]
async fn ended_context_never_dials() {
    let transport = Arc::new(ScriptedTransport::new().on("a", Reply::Respond(200, "{}")));
    let sources = vec![
        TestSource::new("a", "Alpha").shared(),
        TestSource::new("b", "Bravo").shared(),
    ];

    let ctx = RunContext::new();
    ctx.cancel();
    let results = executor(Arc::clone(&transport))
        .execute(&ctx, "1.1.1.1", &sources, None)
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results
        .iter()
        .all(|r| r.error_kind == Some(ErrorKind::Cancelled)));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn request_build_failure_skips_the_network() {
    let transport = Arc::new(ScriptedTransport::new().on("good", Reply::Respond(200, "{}")));
    let sources = vec![
        TestSource::with_template("broken", "Broken", "not a url/{ip}").shared(),
        TestSource::new("good", "Good").shared(),
    ];

    let results = executor(Arc::clone(&transport))
        .execute(&RunContext::new(), "1.1.1.1", &sources, None)
        .await
        .unwrap();

    let broken = by_id(&results, "broken");
    assert_eq!(broken.error_kind, Some(ErrorKind::RequestBuild));
    assert_eq!(broken.status_code, 0);
    assert!(by_id(&results, "good").is_success());
    assert_eq!(transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn callback_fires_once_per_result_in_completion_order() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on("a", Reply::After(Duration::from_secs(3), 200, "{}"))
            .on("b", Reply::After(Duration::from_secs(1), 200, "{}"))
            .on("c", Reply::After(Duration::from_secs(2), 404, "")),
    );
    let sources = vec![
        TestSource::new("a", "Alpha").shared(),
        TestSource::new("b", "Bravo").shared(),
        TestSource::new("c", "Charlie").empty_on(404).shared(),
    ];

    let seen = Arc::new(Mutex::new(Vec::new()));
    let record = {
        let seen = Arc::clone(&seen);
        move |r: &SourceResult| seen.lock().unwrap().push(r.source_id.clone())
    };
    let callback: &ResultCallback = &record;

    let results = executor(transport)
        .execute(
            &RunContext::with_timeout(Duration::from_secs(10)),
            "1.1.1.1",
            &sources,
            Some(callback),
        )
        .await
        .unwrap();

    let order: Vec<String> = results.iter().map(|r| r.source_id.clone()).collect();
    assert_eq!(*seen.lock().unwrap(), ["b", "c", "a"]);
    assert_eq!(order, ["b", "c", "a"]);
}

#[tokio::test(start_paused = true)]
async fn stream_yields_in_completion_order_then_closes() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on("a", Reply::After(Duration::from_secs(2), 200, "{}"))
            .on("b", Reply::After(Duration::from_millis(500), 200, "{}")),
    );
    let sources = vec![
        TestSource::new("a", "Alpha").shared(),
        TestSource::new("b", "Bravo").shared(),
    ];

    let mut rx = executor(transport)
        .execute_stream(&RunContext::new(), "1.1.1.1", &sources)
        .unwrap();

    assert_eq!(rx.recv().await.unwrap().source_id, "b");
    assert_eq!(rx.recv().await.unwrap().source_id, "a");
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn empty_source_set_is_rejected() {
    let exec = executor(Arc::new(ScriptedTransport::new()));
    let err = exec
        .execute(&RunContext::new(), "1.1.1.1", &[], None)
        .await
        .unwrap_err();
    assert!(matches!(err, IpEnrichError::NoSourcesMatched));
    assert!(exec.execute_stream(&RunContext::new(), "1.1.1.1", &[]).is_err());
}

#[tokio::test]
async fn panicking_source_becomes_internal_result() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on("bad", Reply::Respond(200, "{}"))
            .on("good", Reply::Respond(200, "{}")),
    );
    let sources = vec![
        TestSource::new("bad", "Bad").panicking().shared(),
        TestSource::new("good", "Good").shared(),
    ];

    let results = executor(transport)
        .execute(&RunContext::new(), "1.1.1.1", &sources, None)
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    let bad = by_id(&results, "bad");
    assert_eq!(bad.error_kind, Some(ErrorKind::Internal));
    assert_eq!(bad.source_name, "Bad");
    assert!(by_id(&results, "good").is_success());
}

#[tokio::test]
async fn body_limit_reaches_the_transport() {
    let transport = Arc::new(
        ScriptedTransport::new().on("big", Reply::Respond(200, r#"{"padding": "0123456789"}"#)),
    );
    let sources = vec![TestSource::new("big", "Big").shared()];

    let exec = Executor::builder()
        .transport(Arc::clone(&transport) as Arc<dyn HttpTransport>)
        .max_body_size(8)
        .build()
        .unwrap();
    let results = exec
        .execute(&RunContext::new(), "1.1.1.1", &sources, None)
        .await
        .unwrap();

    assert_eq!(*transport.body_limits.lock().unwrap(), [8]);
    // A truncated JSON document cannot decode.
    assert_eq!(results[0].error_kind, Some(ErrorKind::Decode));
}

#[tokio::test]
async fn repeated_runs_produce_identical_reports() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .on("a", Reply::Respond(200, r#"{"tags": ["vpn"]}"#))
            .on("b", Reply::Respond(404, ""))
            .on("c", Reply::Respond(503, "")),
    );
    let sources = vec![
        TestSource::new("c", "Charlie").shared(),
        TestSource::new("a", "Alpha").shared(),
        TestSource::new("b", "Bravo").empty_on(404).shared(),
    ];
    let exec = executor(transport);
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    let mut reports = Vec::new();
    for _ in 0..2 {
        let ctx = RunContext::with_timeout(Duration::from_secs(10));
        let results = exec.execute(&ctx, "9.9.9.9", &sources, None).await.unwrap();
        reports.push(Report::with_timestamp("9.9.9.9", at, results));
    }

    assert_eq!(reports[0], reports[1]);
    let ids: Vec<&str> = reports[0]
        .results
        .iter()
        .map(|r| r.source_id.as_str())
        .collect();
    assert_eq!(ids, ["a", "b", "c"]);
}

#[tokio::test]
async fn registry_filter_feeds_the_executor() {
    let registry = SourceRegistry::builder()
        .with_source(TestSource::new("a", "Alpha"))
        .with_source(TestSource::new("b", "Bravo"))
        .with_source(TestSource::new("c", "Charlie"))
        .build()
        .unwrap();
    let requested = ["a", "z", "a"];
    assert_eq!(registry.validate(&requested), ["z"]);

    let transport = Arc::new(ScriptedTransport::new().on("a", Reply::Respond(200, "{}")));
    let results = executor(Arc::clone(&transport))
        .execute(&RunContext::new(), "1.1.1.1", &registry.filter(&requested), None)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].source_id, "a");
    assert_eq!(transport.calls(), 1);
}
