//! Normalized per-source results and the aggregate report for a run.

use chrono::{DateTime, SubsecRound, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::{ErrorKind, IpEnrichError};
use crate::sources::Source;

/// Outcome of querying one source.
///
/// Exactly one of `error` / success holds: a result without `error` is a
/// success, whose `payload` may still be absent when the source answered
/// "no data for this IP".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SourceResult {
    pub source_id: String,
    pub source_name: String,

    /// HTTP status of the exchange, 0 when no exchange happened.
    pub status_code: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,

    /// Source-owned data, opaque to the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl SourceResult {
    pub fn success<S: Source + ?Sized>(
        source: &S,
        status_code: u16,
        payload: Option<serde_json::Value>,
    ) -> Self {
        Self {
            source_id: source.id().to_string(),
            source_name: source.name().to_string(),
            status_code,
            error: None,
            error_kind: None,
            payload,
        }
    }

    /// Successful lookup that found nothing.
    pub fn empty<S: Source + ?Sized>(source: &S, status_code: u16) -> Self {
        Self::success(source, status_code, None)
    }

    pub fn failure<S: Source + ?Sized>(source: &S, status_code: u16, err: &IpEnrichError) -> Self {
        Self {
            source_id: source.id().to_string(),
            source_name: source.name().to_string(),
            status_code,
            error: Some(err.to_string()),
            error_kind: Some(err.kind()),
            payload: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Success without payload ("known empty").
    pub fn is_empty(&self) -> bool {
        self.is_success() && self.payload.is_none()
    }
}

/// Everything gathered for a single IP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Report {
    pub ip: String,
    pub timestamp: DateTime<Utc>,
    pub results: Vec<SourceResult>,
}

impl Report {
    /// Build a report stamped with the current time (second precision).
    pub fn new(ip: impl Into<String>, results: Vec<SourceResult>) -> Self {
        Self::with_timestamp(ip, Utc::now().trunc_subsecs(0), results)
    }

    /// Results are ordered by source name, then id, so two runs over the
    /// same sources compare equal regardless of completion order.
    pub fn with_timestamp(
        ip: impl Into<String>,
        timestamp: DateTime<Utc>,
        mut results: Vec<SourceResult>,
    ) -> Self {
        results.sort_by(|a, b| {
            a.source_name
                .cmp(&b.source_name)
                .then_with(|| a.source_id.cmp(&b.source_id))
        });
        Self {
            ip: ip.into(),
            timestamp,
            results,
        }
    }

    pub fn get(&self, source_id: &str) -> Option<&SourceResult> {
        self.results.iter().find(|r| r.source_id == source_id)
    }

    pub fn summary(&self) -> ReportSummary {
        let succeeded = self.results.iter().filter(|r| r.is_success()).count();
        ReportSummary {
            total: self.results.len(),
            succeeded,
            failed: self.results.len() - succeeded,
            empty: self.results.iter().filter(|r| r.is_empty()).count(),
        }
    }

    /// JSON schema describing the serialized report.
    pub fn json_schema() -> serde_json::Result<String> {
        let schema = schemars::schema_for!(Report);
        serde_json::to_string_pretty(&schema)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub empty: usize,
}
