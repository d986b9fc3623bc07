pub mod cli;
pub mod commands;
pub mod directory;
pub mod error;
pub mod http;
pub mod input;
pub mod report;
pub mod settings;
pub mod slack;
pub mod window;
pub mod workbook;

pub use cli::Cli;
pub use commands::{generate_report, run_monthly_report};
pub use error::{AppError, Result};
pub use settings::Settings;
