//! Per-month list of names allowed into the report.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::http::{ApiRequest, DIRECTORY_TIMEOUT, Transport, redact};
use crate::settings::DirectorySettings;
use crate::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizedName {
    pub name: String,
}

impl AuthorizedName {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Deserialize)]
struct AuthorizedNamesResponse {
    #[serde(default)]
    data: Vec<AuthorizedName>,
}

pub struct NameDirectory<'a, T: Transport> {
    transport: &'a T,
    settings: &'a DirectorySettings,
}

impl<'a, T: Transport> NameDirectory<'a, T> {
    pub fn new(transport: &'a T, settings: &'a DirectorySettings) -> Self {
        Self { transport, settings }
    }

    /// Names for `month` (`YYYYMM`). An empty list is not an error here.
    pub fn fetch_authorized_names(&self, month: &str) -> Result<Vec<AuthorizedName>> {
        let url = expand_template(&self.settings.url, month, &self.settings.access_token)?;
        tracing::debug!(url = %redact(&url), month, "fetching authorized names");

        let request = ApiRequest::get(url, DIRECTORY_TIMEOUT);
        let body = self.transport.execute(&request)?;

        let response: AuthorizedNamesResponse = serde_json::from_slice(&body)
            .map_err(|e| AppError::Directory(format!("authorized names for {}: {}", month, e)))?;

        tracing::info!(month, names = response.data.len(), "fetched authorized names");
        Ok(response.data)
    }
}

/// Fills `{month}`/`{token}`, or two positional `%s` slots in that order.
pub fn expand_template(template: &str, month: &str, token: &str) -> Result<Url> {
    let expanded = if template.contains("{month}") {
        template.replace("{month}", month).replace("{token}", token)
    } else {
        template.replacen("%s", month, 1).replacen("%s", token, 1)
    };

    Url::parse(&expanded).map_err(|e| AppError::InvalidConfig(format!("directory.url: {}", e)))
}
