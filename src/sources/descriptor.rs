//! Declarative identity + request template shared by all sources.

use std::time::Duration;

use reqwest::Method;
use reqwest::Url;
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue, USER_AGENT};

use crate::context::RunContext;
use crate::errors::{IpEnrichError, Result};

/// Placeholder substituted with the target IP in URL templates.
pub const IP_PLACEHOLDER: &str = "{ip}";

/// Identifying client header sent to every source unless overridden.
pub const DEFAULT_USER_AGENT: &str = concat!("ip-enrich/", env!("CARGO_PKG_VERSION"));

/// A fully built request, ready for a transport.
#[derive(Debug, Clone)]
pub struct SourceRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    /// Remaining budget of the run at build time.
    pub timeout: Option<Duration>,
}

/// Immutable description of a source.
#[derive(Debug, Clone)]
pub struct SourceDescriptor {
    id: String,
    name: String,
    url_template: String,
    method: Method,
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl SourceDescriptor {
    pub fn builder(
        id: impl Into<String>,
        name: impl Into<String>,
        url_template: impl Into<String>,
    ) -> SourceDescriptorBuilder {
        SourceDescriptorBuilder {
            id: id.into(),
            name: name.into(),
            url_template: url_template.into(),
            method: Method::GET,
            headers: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url_template(&self) -> &str {
        &self.url_template
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Substitute `ip` into the template and apply method + headers.
    ///
    /// Default `Accept` and `User-Agent` are set first; descriptor headers
    /// are applied afterwards and replace them on conflict.
    pub fn build_request(&self, ip: &str, ctx: &RunContext) -> Result<SourceRequest> {
        let raw = self.url_template.replacen(IP_PLACEHOLDER, ip, 1);
        let url = Url::parse(&raw)
            .map_err(|e| IpEnrichError::request_build(format!("invalid URL '{raw}': {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        for (name, value) in &self.headers {
            headers.insert(name.clone(), value.clone());
        }

        Ok(SourceRequest {
            method: self.method.clone(),
            url,
            headers,
            timeout: ctx.remaining(),
        })
    }
}

pub struct SourceDescriptorBuilder {
    id: String,
    name: String,
    url_template: String,
    method: Method,
    headers: Vec<(String, String)>,
}

impl SourceDescriptorBuilder {
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Validate and freeze the descriptor.
    ///
    /// The template must contain the IP placeholder exactly once, and every
    /// header must be a legal HTTP header.
    pub fn build(self) -> Result<SourceDescriptor> {
        if self.id.trim().is_empty() {
            return Err(IpEnrichError::request_build("source id must not be empty"));
        }

        let placeholders = self.url_template.matches(IP_PLACEHOLDER).count();
        if placeholders != 1 {
            return Err(IpEnrichError::request_build(format!(
                "URL template for '{}' must contain {IP_PLACEHOLDER} exactly once (found {placeholders})",
                self.id
            )));
        }

        let mut headers = Vec::with_capacity(self.headers.len());
        for (name, value) in self.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                IpEnrichError::request_build(format!("invalid header name '{name}': {e}"))
            })?;
            let value = HeaderValue::from_str(&value).map_err(|e| {
                IpEnrichError::request_build(format!("invalid value for header '{name}': {e}"))
            })?;
            headers.push((name, value));
        }

        Ok(SourceDescriptor {
            id: self.id,
            name: self.name,
            url_template: self.url_template,
            method: self.method,
            headers,
        })
    }
}
