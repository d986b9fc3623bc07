use std::path::PathBuf;

use clap::Parser;

use crate::settings::SETTINGS_FILE;

#[derive(Parser)]
#[command(name = "slack-monthly-report")]
#[command(
    about = "Export a channel's monthly messages to one spreadsheet sheet per authorized sender"
)]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file (TOML format)
    #[arg(short, long, default_value = SETTINGS_FILE)]
    pub config: PathBuf,

    /// Report through this date (YYYY-MM-DD); prompts on stdin when omitted
    #[arg(short, long)]
    pub date: Option<String>,
}
