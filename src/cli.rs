//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::config::MAX_PAGE_SIZE;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// freebooks - list the free books on the Tech Book Fest market
///
/// Fetches every product on the market, keeps the ones with a free
/// variant, and prints them as a Markdown table sorted by circle,
/// first event and title.
///
/// Examples:
///   freebooks
///   freebooks --concurrency 10 --no-progress
///   freebooks --format json --output books.json
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Marketplace origin
    #[arg(long, default_value = "https://techbookfest.org", value_name = "URL")]
    pub base_url: String,

    /// Number of market variants to list (single page, no pagination)
    #[arg(long, default_value = "2000", value_name = "COUNT")]
    pub page_size: usize,

    /// Maximum number of detail requests in flight (1..=2000)
    #[arg(short = 'j', long, default_value = "50", value_name = "NUM")]
    pub concurrency: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "30", value_name = "SECS")]
    pub timeout: u64,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only, no progress bar)
    #[arg(short, long)]
    pub quiet: bool,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown table (default)
    #[default]
    Markdown,
    /// JSON document
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err("Base URL must start with 'http://' or 'https://'".to_string());
        }

        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(format!("Page size must be between 1 and {}", MAX_PAGE_SIZE));
        }

        if self.concurrency == 0 || self.concurrency > MAX_PAGE_SIZE {
            return Err(format!("Concurrency must be between 1 and {}", MAX_PAGE_SIZE));
        }

        if self.timeout == 0 {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
