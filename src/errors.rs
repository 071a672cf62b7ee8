//! Unified error handling for ipenrich.
//!
//! Every failure a source invocation can hit is a typed variant here, so the
//! executor can capture it as data inside the matching `SourceResult` instead
//! of propagating it. Errors that concern the invocation as a whole (invalid
//! IP, empty source set, bad configuration) use the same enum and surface to
//! the caller.
//!
//! Categories are coarse on purpose:
//!   - Input: user / configuration problems
//!   - Network: transport failures, cancellation, timeouts
//!   - Upstream: the remote API answered, but not with data we accept
//!   - Parse: the body did not decode into the expected shape
//!   - Internal: logic bugs or unexpected states
//!
//! Usage:
//!   use ipenrich::errors::{Result, IpEnrichError};
//!
//!   fn pick() -> Result<()> {
//!       Err(IpEnrichError::NoSourcesMatched)
//!   }

use std::io;
use std::net::AddrParseError;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// High-level classification for structured reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Network,
    Upstream,
    Parse,
    Internal,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorCategory::Input => "input",
            ErrorCategory::Network => "network",
            ErrorCategory::Upstream => "upstream",
            ErrorCategory::Parse => "parse",
            ErrorCategory::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// Machine-readable tag stored next to the message of a failed result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    RequestBuild,
    Transport,
    Cancelled,
    Timeout,
    UnexpectedStatus,
    Decode,
    UpstreamFailure,
    UnknownSource,
    Configuration,
    Internal,
}

/// Primary error type.
#[derive(Error, Debug)]
pub enum IpEnrichError {
    // ------------------------ Per-source failures ---------------------------
    #[error("failed to build request: {reason}")]
    RequestBuild { reason: String },

    #[error("transport error: {source}")]
    Transport {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("timeout exceeded")]
    Timeout,

    #[error("unexpected status code: {code}")]
    UnexpectedStatus { code: u16 },

    #[error("failed to parse response: {reason}")]
    Decode { reason: String },

    #[error("API reported failure: {reason}")]
    UpstreamFailure { reason: String },

    // ------------------------ Input / Validation ----------------------------
    #[error("unknown sources: {}", ids.join(", "))]
    UnknownSource { ids: Vec<String> },

    #[error("source already registered: {id}")]
    DuplicateSource { id: String },

    #[error("no sources matched request")]
    NoSourcesMatched,

    #[error("'{ip}' is not a valid IP address")]
    InvalidIpAddress { ip: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    // ----------------------------- I/O --------------------------------------
    #[error("I/O error during {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },

    // ---------------------------- Internal ----------------------------------
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl IpEnrichError {
    /// Categorize the error for structured output.
    pub fn category(&self) -> ErrorCategory {
        use IpEnrichError::*;
        match self {
            UnknownSource { .. }
            | DuplicateSource { .. }
            | NoSourcesMatched
            | InvalidIpAddress { .. }
            | Configuration { .. }
            | RequestBuild { .. } => ErrorCategory::Input,

            Transport { .. } | Cancelled | Timeout => ErrorCategory::Network,

            UnexpectedStatus { .. } | UpstreamFailure { .. } => ErrorCategory::Upstream,

            Decode { .. } => ErrorCategory::Parse,

            Io { .. } | Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Tag recorded on a failed `SourceResult`.
    pub fn kind(&self) -> ErrorKind {
        use IpEnrichError::*;
        match self {
            RequestBuild { .. } => ErrorKind::RequestBuild,
            Transport { .. } => ErrorKind::Transport,
            Cancelled => ErrorKind::Cancelled,
            Timeout => ErrorKind::Timeout,
            UnexpectedStatus { .. } => ErrorKind::UnexpectedStatus,
            Decode { .. } => ErrorKind::Decode,
            UpstreamFailure { .. } => ErrorKind::UpstreamFailure,
            UnknownSource { .. } => ErrorKind::UnknownSource,
            DuplicateSource { .. }
            | NoSourcesMatched
            | InvalidIpAddress { .. }
            | Configuration { .. } => ErrorKind::Configuration,
            Io { .. } | Internal { .. } => ErrorKind::Internal,
        }
    }

    // ---------------------------- Constructors -----------------------------

    pub fn request_build(reason: impl Into<String>) -> Self {
        Self::RequestBuild {
            reason: reason.into(),
        }
    }

    pub fn transport(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Transport {
            source: source.into(),
        }
    }

    pub fn unexpected_status(code: u16) -> Self {
        Self::UnexpectedStatus { code }
    }

    pub fn decode(reason: impl Into<String>) -> Self {
        Self::Decode {
            reason: reason.into(),
        }
    }

    pub fn upstream_failure(reason: impl Into<String>) -> Self {
        Self::UpstreamFailure {
            reason: reason.into(),
        }
    }

    pub fn invalid_ip(ip: impl Into<String>) -> Self {
        Self::InvalidIpAddress { ip: ip.into() }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Public result alias.
pub type Result<T> = std::result::Result<T, IpEnrichError>;

impl From<io::Error> for IpEnrichError {
    fn from(e: io::Error) -> Self {
        IpEnrichError::Io {
            operation: "unspecified".into(),
            source: e,
        }
    }
}

impl From<AddrParseError> for IpEnrichError {
    fn from(e: AddrParseError) -> Self {
        IpEnrichError::InvalidIpAddress { ip: e.to_string() }
    }
}
