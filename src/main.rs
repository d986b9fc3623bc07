use clap::Parser;
use slack_monthly_report::Cli;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(e) = slack_monthly_report::run_monthly_report(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
