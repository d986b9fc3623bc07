use std::io;

use chrono::NaiveDate;

use crate::AppError;
use crate::cli::Cli;
use crate::directory::NameDirectory;
use crate::error::Result;
use crate::http::{ReqwestTransport, Transport};
use crate::input::prompt_date;
use crate::report::build_report;
use crate::settings::Settings;
use crate::slack::SlackClient;
use crate::window::{ReportWindow, parse_date};
use crate::workbook::{ReportFile, write_report};

pub fn run_monthly_report(cli: &Cli) -> Result<()> {
    let settings = Settings::load(&cli.config)?;

    let target = match &cli.date {
        Some(s) => parse_date(s)?,
        None => prompt_date(&mut io::stdin().lock(), &mut io::stdout())?,
    };

    let transport = ReqwestTransport::new()?;
    let file = generate_report(&transport, &settings, target)?;

    println!(
        "Report written to {} ({} sheets, {} rows).",
        file.path.display(),
        file.sheets,
        file.rows
    );
    Ok(())
}

/// Fetches names, members and history in that order, then writes the workbook.
/// Any failure aborts before the workbook exists.
pub fn generate_report<T: Transport>(
    transport: &T,
    settings: &Settings,
    target: NaiveDate,
) -> Result<ReportFile> {
    let window = ReportWindow::for_date(target, settings.utc_offset()?)?;
    let month = window.month_key();

    println!(
        "Collecting messages from {} to {}...",
        window.start.format("%Y-%m-%d %H:%M:%S %:z"),
        window.end.format("%Y-%m-%d %H:%M:%S %:z")
    );

    let names = NameDirectory::new(transport, &settings.directory).fetch_authorized_names(&month)?;
    if names.is_empty() {
        return Err(AppError::NoAuthorizedNames { month });
    }

    let slack = SlackClient::new(transport, &settings.slack);
    let members = slack.fetch_members()?;
    let messages = slack.fetch_history(&settings.slack.channel_id, &window)?;

    let report = build_report(&messages, &members, &names, &window);
    write_report(&report, &settings.report.output_dir)
}
