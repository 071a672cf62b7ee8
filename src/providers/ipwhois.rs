//! ipwho.is: geolocation and connection details.

use serde::{Deserialize, Serialize};

use crate::errors::{IpEnrichError, Result};
use crate::report::SourceResult;
use crate::sources::{Source, SourceDescriptor, decode_json, null_default, to_payload};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpWhoisResponse {
    #[serde(deserialize_with = "null_default")]
    pub ip: String,
    #[serde(deserialize_with = "null_default")]
    pub success: bool,
    /// Only present when `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "type", deserialize_with = "null_default")]
    pub kind: String,
    #[serde(deserialize_with = "null_default")]
    pub continent: String,
    #[serde(deserialize_with = "null_default")]
    pub continent_code: String,
    #[serde(deserialize_with = "null_default")]
    pub country: String,
    #[serde(deserialize_with = "null_default")]
    pub country_code: String,
    #[serde(deserialize_with = "null_default")]
    pub region: String,
    #[serde(deserialize_with = "null_default")]
    pub region_code: String,
    #[serde(deserialize_with = "null_default")]
    pub city: String,
    #[serde(deserialize_with = "null_default")]
    pub latitude: f64,
    #[serde(deserialize_with = "null_default")]
    pub longitude: f64,
    #[serde(deserialize_with = "null_default")]
    pub is_eu: bool,
    #[serde(deserialize_with = "null_default")]
    pub postal: String,
    #[serde(deserialize_with = "null_default")]
    pub calling_code: String,
    #[serde(deserialize_with = "null_default")]
    pub capital: String,
    #[serde(deserialize_with = "null_default")]
    pub borders: String,
    #[serde(deserialize_with = "null_default")]
    pub flag: Flag,
    #[serde(deserialize_with = "null_default")]
    pub connection: Connection,
    #[serde(deserialize_with = "null_default")]
    pub timezone: Timezone,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Flag {
    #[serde(deserialize_with = "null_default")]
    pub img: String,
    #[serde(deserialize_with = "null_default")]
    pub emoji: String,
    #[serde(deserialize_with = "null_default")]
    pub emoji_unicode: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Connection {
    #[serde(deserialize_with = "null_default")]
    pub asn: u32,
    #[serde(deserialize_with = "null_default")]
    pub org: String,
    #[serde(deserialize_with = "null_default")]
    pub isp: String,
    #[serde(deserialize_with = "null_default")]
    pub domain: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timezone {
    #[serde(deserialize_with = "null_default")]
    pub id: String,
    #[serde(deserialize_with = "null_default")]
    pub abbr: String,
    #[serde(deserialize_with = "null_default")]
    pub is_dst: bool,
    #[serde(deserialize_with = "null_default")]
    pub offset: i32,
    #[serde(deserialize_with = "null_default")]
    pub utc: String,
    #[serde(deserialize_with = "null_default")]
    pub current_time: String,
}

pub struct IpWhois {
    descriptor: SourceDescriptor,
}

impl IpWhois {
    pub const ID: &'static str = "ipwhois";

    pub fn new() -> Result<Self> {
        let descriptor =
            SourceDescriptor::builder(Self::ID, "IP Whois", "https://ipwho.is/{ip}").build()?;
        Ok(Self { descriptor })
    }
}

impl Source for IpWhois {
    fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    fn parse_response(&self, body: &[u8], status_code: u16) -> Result<SourceResult> {
        if status_code != 200 {
            return Err(IpEnrichError::unexpected_status(status_code));
        }

        let resp: IpWhoisResponse = decode_json(body)?;

        // ipwho.is reports lookup failures inside a 200 response
        if !resp.success {
            let reason = match resp.message.as_deref() {
                Some(msg) if !msg.is_empty() => format!("success=false ({msg})"),
                _ => "success=false".to_string(),
            };
            return Err(IpEnrichError::upstream_failure(reason));
        }

        Ok(SourceResult::success(self, status_code, Some(to_payload(&resp)?)))
    }
}
