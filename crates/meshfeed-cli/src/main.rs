mod cli;
mod error;
mod render;

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use meshfeed_core::{FeedConsumer, HttpPageFetcher, PageSize, ReqwestHttpClient, Trigger};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, OutputFormat};
use crate::error::CliError;
use crate::render::FeedView;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

async fn run() -> Result<ExitCode, CliError> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let fetcher = HttpPageFetcher::new(cli.endpoint.as_str(), Arc::new(ReqwestHttpClient::new()));
    let mut consumer = FeedConsumer::new(PageSize::clamped(i64::from(cli.page_size)));

    let status: Box<dyn Write + Send> = match cli.format {
        OutputFormat::Text => Box::new(std::io::stdout()),
        OutputFormat::Ndjson => Box::new(std::io::stderr()),
    };
    let mut view = FeedView::new(std::io::stdout(), status, cli.format);

    tracing::debug!(endpoint = %cli.endpoint, page_size = cli.page_size, "starting reader");
    view.step(&mut consumer, Trigger::Mount, &fetcher).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match Command::parse(&line) {
            Some(Command::Next) => view.step(&mut consumer, Trigger::Proximity, &fetcher).await?,
            Some(Command::Retry) => view.step(&mut consumer, Trigger::ManualRetry, &fetcher).await?,
            Some(Command::Quit) => break,
            None => eprintln!("Enter loads more, r retries, q quits."),
        }
    }

    if consumer.last_error().is_some() {
        return Ok(ExitCode::from(3));
    }
    Ok(ExitCode::SUCCESS)
}

fn init_tracing(verbose: bool) -> Result<(), CliError> {
    let level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level))
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| CliError::Trace(e.to_string()))
}
