//! Stop Forum Spam: spam reporting frequency for an IP.

use serde::{Deserialize, Serialize};

use crate::errors::{IpEnrichError, Result};
use crate::report::SourceResult;
use crate::sources::{Source, SourceDescriptor, decode_json, null_default, to_payload};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StopForumSpamResponse {
    /// 1 on success, 0 on failure.
    #[serde(deserialize_with = "null_default")]
    pub success: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(deserialize_with = "null_default")]
    pub ip: IpRecord,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpRecord {
    #[serde(deserialize_with = "null_default")]
    pub value: String,
    #[serde(deserialize_with = "null_default")]
    pub frequency: u64,
    /// 1 if the IP appears in the database.
    #[serde(deserialize_with = "null_default")]
    pub appears: u8,
    #[serde(deserialize_with = "null_default")]
    pub confidence: f64,
    #[serde(rename = "lastseen", deserialize_with = "null_default")]
    pub last_seen: String,
    #[serde(deserialize_with = "null_default")]
    pub delegated_country: String,
    #[serde(deserialize_with = "null_default")]
    pub country: String,
    #[serde(deserialize_with = "null_default")]
    pub asn: u32,
}

pub struct StopForumSpam {
    descriptor: SourceDescriptor,
}

impl StopForumSpam {
    pub const ID: &'static str = "stopforumspam";

    pub fn new() -> Result<Self> {
        let descriptor = SourceDescriptor::builder(
            Self::ID,
            "Stop Forum Spam",
            "https://api.stopforumspam.org/api?json&ip={ip}",
        )
        .build()?;
        Ok(Self { descriptor })
    }
}

impl Source for StopForumSpam {
    fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    fn parse_response(&self, body: &[u8], status_code: u16) -> Result<SourceResult> {
        if status_code != 200 {
            return Err(IpEnrichError::unexpected_status(status_code));
        }

        let resp: StopForumSpamResponse = decode_json(body)?;

        if resp.success != 1 {
            let reason = match resp.error.as_deref() {
                Some(msg) => format!("success={} ({msg})", resp.success),
                None => format!("success={}", resp.success),
            };
            return Err(IpEnrichError::upstream_failure(reason));
        }

        Ok(SourceResult::success(self, status_code, Some(to_payload(&resp)?)))
    }
}
