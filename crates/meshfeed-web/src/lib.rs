//! # Meshfeed Web
//!
//! Inbound HTTP surface for the feed aggregator.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Command-line and environment configuration |
//! | [`error`] | Handler and startup errors |
//! | [`routes`] | Router and handlers |
//! | [`trace`] | Subscriber setup |

pub mod config;
pub mod error;
pub mod routes;
pub mod trace;

pub use config::ServerConfig;
pub use error::{ApiError, ServerError};
pub use routes::{app, router};
