//! GreyNoise Community API.

use serde::{Deserialize, Serialize};

use crate::errors::{IpEnrichError, Result};
use crate::report::SourceResult;
use crate::sources::{Source, SourceDescriptor, decode_json, null_default, to_payload};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GreyNoiseResponse {
    #[serde(deserialize_with = "null_default")]
    pub ip: String,
    /// Seen scanning the internet ("background noise").
    #[serde(deserialize_with = "null_default")]
    pub noise: bool,
    /// Known benign service (CDN, SaaS, ...).
    #[serde(deserialize_with = "null_default")]
    pub riot: bool,
    #[serde(deserialize_with = "null_default")]
    pub classification: String,
    #[serde(deserialize_with = "null_default")]
    pub name: String,
    #[serde(deserialize_with = "null_default")]
    pub link: String,
    #[serde(deserialize_with = "null_default")]
    pub last_seen: String,
    #[serde(deserialize_with = "null_default")]
    pub message: String,
}

pub struct GreyNoise {
    descriptor: SourceDescriptor,
}

impl GreyNoise {
    pub const ID: &'static str = "greynoise";

    pub fn new() -> Result<Self> {
        let descriptor = SourceDescriptor::builder(
            Self::ID,
            "GreyNoise",
            "https://api.greynoise.io/v3/community/{ip}",
        )
        .build()?;
        Ok(Self { descriptor })
    }
}

impl Source for GreyNoise {
    fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    fn parse_response(&self, body: &[u8], status_code: u16) -> Result<SourceResult> {
        // 404 means GreyNoise has never observed the IP
        if status_code == 404 {
            return Ok(SourceResult::empty(self, status_code));
        }
        if status_code != 200 {
            return Err(IpEnrichError::unexpected_status(status_code));
        }

        let resp: GreyNoiseResponse = decode_json(body)?;
        Ok(SourceResult::success(self, status_code, Some(to_payload(&resp)?)))
    }
}
