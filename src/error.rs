use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("failed to read file at {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid date format: {0}")]
    InvalidDate(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("network error: {0}")]
    Network(String),

    #[error("Slack directory error: {0}")]
    Directory(String),

    #[error("Slack API error: {0}")]
    SlackApi(String),

    #[error("no authorized names found for {month}, aborting")]
    NoAuthorizedNames { month: String },

    #[error("invalid sheet name derived from {0:?}")]
    InvalidSheetName(String),

    #[error("duplicate sheet name: {0}")]
    DuplicateSheetName(String),

    #[error("spreadsheet error: {0}")]
    Xlsx(String),

    #[error("failed to write file at {path}: {source}")]
    WriteFile {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl AppError {
    /// Builds the payload-level failure message Slack reports in `error`/`needed`.
    pub fn slack_detail(error: &str, needed: &str) -> String {
        if needed.is_empty() {
            error.to_string()
        } else {
            format!("{}, needed: {}", error, needed)
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
