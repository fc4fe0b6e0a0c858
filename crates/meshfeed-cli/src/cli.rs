//! CLI argument definitions.
//!
//! # Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--endpoint` | `http://127.0.0.1:8080` | Base URL of a running `meshfeed-web` |
//! | `--page-size` | `30` | Posts per page (1-50) |
//! | `--format` | `text` | Post output format (text, ndjson) |
//! | `--verbose` | `false` | Debug logging on stderr |
//!
//! # Keys
//!
//! | Input | Action |
//! |-------|--------|
//! | Enter | Load the next page |
//! | `r` | Retry after a failure |
//! | `q` | Quit |

use clap::{Parser, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    name = "meshfeed",
    author,
    version,
    about = "Scroll the aggregated tag feed from a terminal"
)]
pub struct Cli {
    /// Base URL of the feed server.
    #[arg(long, env = "MESHFEED_ENDPOINT", default_value = "http://127.0.0.1:8080")]
    pub endpoint: String,

    /// Posts requested per page.
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u8).range(1..=50))]
    pub page_size: u8,

    /// Output format for posts.
    ///
    /// - text: readable cards (default)
    /// - ndjson: one JSON post per line, status messages on stderr
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Log at debug level on stderr.
    #[arg(long, short)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Ndjson,
}

/// One line of reader input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Next,
    Retry,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "" | "n" | "next" => Some(Self::Next),
            "r" | "retry" => Some(Self::Retry),
            "q" | "quit" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }
}
