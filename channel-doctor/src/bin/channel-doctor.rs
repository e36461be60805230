use channel_doctor::config::{Cli, FileConfig, Settings};
use channel_doctor::{dashboard, export, generate_report};
use clap::Parser;
use eyre::Context;
use std::io::{IsTerminal, Write};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // stdout carries the dashboard; diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();

    let cli = Cli::parse();
    let file = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let settings = Settings::resolve(cli, file)?;

    let http = reqwest::Client::builder()
        .user_agent(concat!("channel-doctor/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("build HTTP client")?;

    let report = generate_report(&settings, http).await?;

    let mut stdout = std::io::stdout().lock();
    dashboard::render(&mut stdout, &report, settings.top).context("render dashboard")?;
    stdout.flush().context("flush stdout")?;

    if let Some(path) = &settings.csv {
        export::write_csv_file(&report.videos, path)?;
    }
    if let Some(path) = &settings.json {
        export::write_json_file(&report, path)?;
    }

    Ok(())
}
