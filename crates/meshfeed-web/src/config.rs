//! Server configuration.
//!
//! | Option | Env | Default |
//! |--------|-----|---------|
//! | `--bind` | `MESHFEED_BIND` | `127.0.0.1:8080` |
//! | `--query` | `MESHFEED_QUERY` | `#meshArchive` |
//! | `--timeout-ms` | `MESHFEED_TIMEOUT_MS` | `10000` |
//! | `--log-filter` | `RUST_LOG` | `info` |
//!
//! Upstream credentials are read from the environment by the session layer
//! (`MESHFEED_BLUESKY_IDENTIFIER` or `BLUESKY_IDENTIFIER`, and
//! `MESHFEED_BLUESKY_APP_PASSWORD` or `BLUESKY_APP_PASSWORD`).

use std::net::SocketAddr;

use clap::Parser;
use meshfeed_core::http_client::DEFAULT_TIMEOUT_MS;
use meshfeed_core::{AggregatorBuilder, FeedAggregator, DEFAULT_QUERY};

#[derive(Debug, Clone, Parser)]
#[command(
    name = "meshfeed-web",
    version,
    about = "Serves the aggregated tag feed over HTTP"
)]
pub struct ServerConfig {
    /// Socket address to listen on.
    #[arg(long, env = "MESHFEED_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Search query sent to every provider.
    #[arg(long, env = "MESHFEED_QUERY", default_value = DEFAULT_QUERY)]
    pub query: String,

    /// Upstream request timeout in milliseconds.
    #[arg(long, env = "MESHFEED_TIMEOUT_MS", default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,

    /// tracing filter directive.
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_filter: String,
}

impl ServerConfig {
    pub fn aggregator(&self) -> FeedAggregator {
        AggregatorBuilder::new()
            .with_env_credentials()
            .with_query(self.query.as_str())
            .with_timeout_ms(self.timeout_ms)
            .build()
    }
}
