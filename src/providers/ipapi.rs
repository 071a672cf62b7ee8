//! ipapi.is: ASN, hosting/VPN/Tor flags and geolocation.

use serde::{Deserialize, Serialize};

use crate::errors::{IpEnrichError, Result};
use crate::report::SourceResult;
use crate::sources::{Source, SourceDescriptor, decode_json, null_default, to_payload};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpApiResponse {
    #[serde(deserialize_with = "null_default")]
    pub ip: String,
    #[serde(deserialize_with = "null_default")]
    pub rir: String,
    #[serde(deserialize_with = "null_default")]
    pub is_bogon: bool,
    #[serde(deserialize_with = "null_default")]
    pub is_mobile: bool,
    #[serde(deserialize_with = "null_default")]
    pub is_crawler: bool,
    #[serde(deserialize_with = "null_default")]
    pub is_datacenter: bool,
    #[serde(deserialize_with = "null_default")]
    pub is_tor: bool,
    #[serde(deserialize_with = "null_default")]
    pub is_proxy: bool,
    #[serde(deserialize_with = "null_default")]
    pub is_vpn: bool,
    #[serde(deserialize_with = "null_default")]
    pub is_abuser: bool,
    pub company: Option<Company>,
    pub asn: Option<Asn>,
    pub location: Option<Location>,
    #[serde(deserialize_with = "null_default")]
    pub elapsed_ms: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Company {
    #[serde(deserialize_with = "null_default")]
    pub name: String,
    #[serde(deserialize_with = "null_default")]
    pub abuser_score: String,
    #[serde(deserialize_with = "null_default")]
    pub domain: String,
    #[serde(rename = "type", deserialize_with = "null_default")]
    pub kind: String,
    #[serde(deserialize_with = "null_default")]
    pub network: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Asn {
    #[serde(deserialize_with = "null_default")]
    pub asn: u32,
    #[serde(deserialize_with = "null_default")]
    pub abuser_score: String,
    #[serde(deserialize_with = "null_default")]
    pub route: String,
    #[serde(deserialize_with = "null_default")]
    pub descr: String,
    #[serde(deserialize_with = "null_default")]
    pub country: String,
    #[serde(deserialize_with = "null_default")]
    pub active: bool,
    #[serde(deserialize_with = "null_default")]
    pub org: String,
    #[serde(deserialize_with = "null_default")]
    pub domain: String,
    #[serde(deserialize_with = "null_default")]
    pub abuse: String,
    #[serde(rename = "type", deserialize_with = "null_default")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    #[serde(deserialize_with = "null_default")]
    pub continent: String,
    #[serde(deserialize_with = "null_default")]
    pub country: String,
    #[serde(deserialize_with = "null_default")]
    pub country_code: String,
    #[serde(deserialize_with = "null_default")]
    pub state: String,
    #[serde(deserialize_with = "null_default")]
    pub city: String,
    #[serde(deserialize_with = "null_default")]
    pub latitude: f64,
    #[serde(deserialize_with = "null_default")]
    pub longitude: f64,
    #[serde(deserialize_with = "null_default")]
    pub zip: String,
    #[serde(deserialize_with = "null_default")]
    pub timezone: String,
    #[serde(deserialize_with = "null_default")]
    pub local_time: String,
    #[serde(deserialize_with = "null_default")]
    pub local_time_unix: i64,
    #[serde(deserialize_with = "null_default")]
    pub is_dst: bool,
}

pub struct IpApi {
    descriptor: SourceDescriptor,
}

impl IpApi {
    pub const ID: &'static str = "ipapi";

    pub fn new() -> Result<Self> {
        let descriptor =
            SourceDescriptor::builder(Self::ID, "IP API", "https://api.ipapi.is/?q={ip}")
                .build()?;
        Ok(Self { descriptor })
    }
}

impl Source for IpApi {
    fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    fn parse_response(&self, body: &[u8], status_code: u16) -> Result<SourceResult> {
        if status_code != 200 {
            return Err(IpEnrichError::unexpected_status(status_code));
        }

        let resp: IpApiResponse = decode_json(body)?;
        Ok(SourceResult::success(self, status_code, Some(to_payload(&resp)?)))
    }
}
