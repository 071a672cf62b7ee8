//! Shodan InternetDB (keyless).

use serde::{Deserialize, Serialize};

use crate::errors::{IpEnrichError, Result};
use crate::report::SourceResult;
use crate::sources::{Source, SourceDescriptor, decode_json, null_default, to_payload};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShodanResponse {
    #[serde(deserialize_with = "null_default")]
    pub ip: String,
    #[serde(deserialize_with = "null_default")]
    pub ports: Vec<u16>,
    #[serde(deserialize_with = "null_default")]
    pub hostnames: Vec<String>,
    #[serde(deserialize_with = "null_default")]
    pub cpes: Vec<String>,
    #[serde(deserialize_with = "null_default")]
    pub tags: Vec<String>,
    #[serde(deserialize_with = "null_default")]
    pub vulns: Vec<String>,
}

pub struct Shodan {
    descriptor: SourceDescriptor,
}

impl Shodan {
    pub const ID: &'static str = "shodan";

    pub fn new() -> Result<Self> {
        let descriptor =
            SourceDescriptor::builder(Self::ID, "Shodan", "https://internetdb.shodan.io/{ip}")
                .build()?;
        Ok(Self { descriptor })
    }
}

impl Source for Shodan {
    fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    fn parse_response(&self, body: &[u8], status_code: u16) -> Result<SourceResult> {
        // IP not in the InternetDB dataset
        if status_code == 404 {
            return Ok(SourceResult::empty(self, status_code));
        }
        if status_code != 200 {
            return Err(IpEnrichError::unexpected_status(status_code));
        }

        let resp: ShodanResponse = decode_json(body)?;
        Ok(SourceResult::success(self, status_code, Some(to_payload(&resp)?)))
    }
}
