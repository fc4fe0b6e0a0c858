use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use meshfeed_web::{routes, trace, ServerConfig, ServerError};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

async fn run() -> Result<(), ServerError> {
    let config = ServerConfig::parse();
    trace::init_tracer(&config.log_filter)?;

    let aggregator = Arc::new(config.aggregator());
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|source| ServerError::Bind {
            addr: config.bind,
            source,
        })?;

    tracing::info!(
        addr = %config.bind,
        query = %config.query,
        providers = ?aggregator.provider_ids(),
        "meshfeed-web listening"
    );

    axum::serve(listener, routes::app(aggregator))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(%error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
