//! Run configuration.
//!
//! All settings come from command-line flags layered over built-in
//! defaults. Nothing is read from files or the environment.

use crate::cli::{Args, OutputFormat};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Marketplace endpoint settings.
    #[serde(default)]
    pub endpoint: EndpointConfig,

    /// Listing and fan-out settings.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Report output settings.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Where the marketplace lives and how long to wait for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Marketplace origin.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://techbookfest.org".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl EndpointConfig {
    fn base(&self) -> Result<Url, url::ParseError> {
        let mut base = Url::parse(&self.base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(base)
    }

    /// Market page whose response sets the XSRF cookie.
    pub fn market_url(&self) -> Result<Url, url::ParseError> {
        self.base()?.join("market")
    }

    /// GraphQL endpoint.
    pub fn graphql_url(&self) -> Result<Url, url::ParseError> {
        self.base()?.join("api/graphql")
    }

    /// Prefix for product page links.
    pub fn product_base(&self) -> String {
        self.base_url.trim_end_matches('/').to_string()
    }
}

/// Listing and fan-out settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Number of variants requested from the listing.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Maximum number of detail requests in flight.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Draw a progress bar during the fan-out.
    #[serde(default = "default_true")]
    pub show_progress: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            concurrency: default_concurrency(),
            show_progress: true,
        }
    }
}

/// Largest page the market listing accepts.
pub const MAX_PAGE_SIZE: usize = 2000;

fn default_page_size() -> usize {
    MAX_PAGE_SIZE
}

fn default_concurrency() -> usize {
    50
}

fn default_true() -> bool {
    true
}

/// Report output settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Report format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Destination file; stdout when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Config {
    /// Build the configuration from parsed command-line arguments.
    pub fn from_args(args: &Args) -> Self {
        Self {
            endpoint: EndpointConfig {
                base_url: args.base_url.clone(),
                timeout_seconds: args.timeout,
            },
            fetch: FetchConfig {
                page_size: args.page_size,
                concurrency: args.concurrency,
                show_progress: !args.no_progress && !args.quiet,
            },
            output: OutputConfig {
                format: args.format,
                path: args.output.clone(),
            },
        }
    }
}
