//! Pluggable intelligence sources.
//!
//! Every provider implements the uniform `Source` trait so the executor can
//! drive them all the same way:
//!   * `build_request` turns an IP into a ready-to-send HTTP request
//!   * `parse_response` normalizes the raw body + status into a `SourceResult`
//!
//! Providers compose the shared behaviour (URL templating, default headers)
//! by holding a `SourceDescriptor` and delegating to it; only
//! `parse_response` is provider specific.
//!
//! `parse_response` must follow the same branch order everywhere:
//!   1. a provider-documented "known empty" status -> success without payload
//!   2. any other non-success status -> `UnexpectedStatus`, body ignored
//!   3. body that does not decode -> `Decode`
//!   4. body carrying the API's own failure flag -> `UpstreamFailure`
//!   5. otherwise -> success with the decoded payload
//!
//! Adding a provider (example skeleton):
//! ```ignore
//! struct Example { descriptor: SourceDescriptor }
//!
//! impl Source for Example {
//!     fn descriptor(&self) -> &SourceDescriptor { &self.descriptor }
//!     fn parse_response(&self, body: &[u8], status_code: u16) -> Result<SourceResult> {
//!         if status_code != 200 {
//!             return Err(IpEnrichError::unexpected_status(status_code));
//!         }
//!         let resp: ExampleResponse = decode_json(body)?;
//!         Ok(SourceResult::success(self, status_code, Some(to_payload(&resp)?)))
//!     }
//! }
//! ```

mod descriptor;

pub use descriptor::{
    DEFAULT_USER_AGENT, IP_PLACEHOLDER, SourceDescriptor, SourceDescriptorBuilder, SourceRequest,
};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::context::RunContext;
use crate::errors::{IpEnrichError, Result};
use crate::report::SourceResult;

/// Trait every intelligence source must implement.
///
/// Sources are shared read-only across concurrent invocations and must not
/// keep per-call state.
pub trait Source: Send + Sync {
    /// Identity and request template.
    fn descriptor(&self) -> &SourceDescriptor;

    /// Unique, stable identifier (e.g. "shodan").
    fn id(&self) -> &str {
        self.descriptor().id()
    }

    /// Human-readable name (e.g. "Shodan").
    fn name(&self) -> &str {
        self.descriptor().name()
    }

    /// Construct the HTTP request for `ip`. No network activity happens here.
    fn build_request(&self, ip: &str, ctx: &RunContext) -> Result<SourceRequest> {
        self.descriptor().build_request(ip, ctx)
    }

    /// Normalize a raw response into a result.
    fn parse_response(&self, body: &[u8], status_code: u16) -> Result<SourceResult>;
}

/// Decode a JSON body into the provider's response shape.
pub fn decode_json<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| IpEnrichError::decode(e.to_string()))
}

/// Field deserializer that reads an explicit JSON `null` as the type's
/// default, the same as a missing key under `#[serde(default)]`.
pub fn null_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Re-encode a typed response as the opaque payload carried by a result.
pub fn to_payload<T: Serialize>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value)
        .map_err(|e| IpEnrichError::internal(format!("payload encoding failed: {e}")))
}
