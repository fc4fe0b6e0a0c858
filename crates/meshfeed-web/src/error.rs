use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use meshfeed_core::UpstreamError;
use serde::Serialize;
use thiserror::Error;

/// `error` field of every failed feed query.
pub const FAILURE_MESSAGE: &str = "Failed to retrieve archive posts";

/// Errors surfaced by request handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub details: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Upstream(error) => {
                // Mirrors the last provider's status.
                let status = StatusCode::from_u16(error.status()).unwrap_or(StatusCode::BAD_GATEWAY);
                let body = ErrorBody {
                    error: String::from(FAILURE_MESSAGE),
                    details: error.details(),
                };
                (status, Json(body)).into_response()
            }
        }
    }
}

/// Server startup and lifecycle errors mapped to exit codes.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid log filter: {0}")]
    Trace(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

impl ServerError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Trace(_) => 2,
            Self::Bind { .. } => 10,
            Self::Serve(_) => 11,
        }
    }
}
