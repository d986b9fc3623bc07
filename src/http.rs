//! Single-attempt HTTP GET used by every fetcher.
//!
//! Upstream services report failures inside the JSON payload, so the status
//! code is not inspected here; callers decode the body and check it.

use std::time::Duration;

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use url::Url;

use crate::{AppError, Result};

pub const SLACK_TIMEOUT: Duration = Duration::from_secs(10);
pub const DIRECTORY_TIMEOUT: Duration = Duration::from_secs(30);

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
pub const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub content_type: Option<&'static str>,
    pub url: Url,
    pub bearer_token: Option<String>,
    pub timeout: Duration,
}

impl ApiRequest {
    pub fn get(url: Url, timeout: Duration) -> Self {
        Self {
            method: Method::GET,
            content_type: None,
            url,
            bearer_token: None,
            timeout,
        }
    }

    pub fn with_content_type(mut self, content_type: &'static str) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn with_bearer(mut self, token: &str) -> Self {
        self.bearer_token = Some(token.to_string());
        self
    }
}

pub trait Transport {
    /// Sends the request once and returns the raw response body.
    fn execute(&self, request: &ApiRequest) -> Result<Vec<u8>>;
}

pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        // Err only means a provider is already installed for the process.
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| AppError::Network(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: &ApiRequest) -> Result<Vec<u8>> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .timeout(request.timeout);

        if let Some(content_type) = request.content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        if let Some(token) = &request.bearer_token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = builder.send().map_err(|e| {
            AppError::Network(format!(
                "{} {}: {}",
                request.method,
                redact(&request.url),
                e
            ))
        })?;

        tracing::debug!(
            status = %response.status(),
            url = %redact(&request.url),
            "response received"
        );

        let bytes = response.bytes().map_err(|e| {
            AppError::Network(format!(
                "reading body from {}: {}",
                redact(&request.url),
                e
            ))
        })?;

        Ok(bytes.to_vec())
    }
}

/// URL without its query string, so tokens embedded in it stay out of logs.
pub fn redact(url: &Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}
