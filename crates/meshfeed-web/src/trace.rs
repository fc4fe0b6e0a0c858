//! Tracing

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::error::ServerError;

/// Installs the global subscriber: fmt output filtered by `filter`.
pub fn init_tracer(filter: &str) -> Result<(), ServerError> {
    let layer_filter = EnvFilter::builder()
        .parse(filter)
        .map_err(|e| ServerError::Trace(e.to_string()))?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(layer_filter)
        .try_init()
        .map_err(|e| ServerError::Trace(e.to_string()))
}
