use std::fs;
use std::path::{Path, PathBuf};

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::{AppError, Result};

pub const SETTINGS_FILE: &str = "config.toml";
pub const DEFAULT_SLACK_API_BASE_URL: &str = "https://slack.com/api/";
pub const DEFAULT_UTC_OFFSET: &str = "+09:00";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub slack: SlackSettings,
    pub directory: DirectorySettings,
    #[serde(default)]
    pub report: ReportSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackSettings {
    #[serde(default, rename = "bot-token")]
    pub bot_token: String,
    #[serde(default, rename = "user-token")]
    pub user_token: String,
    #[serde(default, rename = "channel-id")]
    pub channel_id: String,
    #[serde(default = "default_api_base_url", rename = "api-base-url")]
    pub api_base_url: String,
}

/// Where the per-month list of authorized names lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectorySettings {
    /// URL template with `{month}` and `{token}` placeholders, or two `%s` slots
    #[serde(default)]
    pub url: String,
    #[serde(default, rename = "access-token")]
    pub access_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSettings {
    #[serde(default = "default_utc_offset", rename = "utc-offset")]
    pub utc_offset: String,
    #[serde(default = "default_output_dir", rename = "output-dir")]
    pub output_dir: PathBuf,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            utc_offset: default_utc_offset(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_api_base_url() -> String {
    DEFAULT_SLACK_API_BASE_URL.to_string()
}

fn default_utc_offset() -> String {
    DEFAULT_UTC_OFFSET.to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| AppError::ReadFile {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Settings =
            toml::from_str(content).map_err(|e| AppError::TomlParse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        let required = [
            ("slack.bot-token", &self.slack.bot_token),
            ("slack.user-token", &self.slack.user_token),
            ("slack.channel-id", &self.slack.channel_id),
            ("slack.api-base-url", &self.slack.api_base_url),
            ("directory.url", &self.directory.url),
            ("directory.access-token", &self.directory.access_token),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(AppError::InvalidConfig(format!("{} is empty", key)));
            }
        }

        let template = &self.directory.url;
        let named = template.contains("{month}");
        let positional = template.matches("%s").count() >= 2;
        if !named && !positional {
            return Err(AppError::InvalidConfig(
                "directory.url must contain {month} or two %s placeholders".to_string(),
            ));
        }

        self.utc_offset()?;
        Ok(())
    }

    /// The fixed offset report dates and times are rendered in.
    pub fn utc_offset(&self) -> Result<FixedOffset> {
        self.report.utc_offset.parse::<FixedOffset>().map_err(|e| {
            AppError::InvalidConfig(format!(
                "report.utc-offset {:?}: {}",
                self.report.utc_offset, e
            ))
        })
    }
}

#[cfg(test)]
pub(crate) fn test_settings() -> Settings {
    Settings {
        slack: SlackSettings {
            bot_token: "xoxb-bot".to_string(),
            user_token: "xoxp-user".to_string(),
            channel_id: "C0123".to_string(),
            api_base_url: DEFAULT_SLACK_API_BASE_URL.to_string(),
        },
        directory: DirectorySettings {
            url: "https://names.example.com/exec?month={month}&token={token}".to_string(),
            access_token: "gs-secret".to_string(),
        },
        report: ReportSettings::default(),
    }
}
