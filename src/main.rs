//! freebooks - free book catalog for the Tech Book Fest market
//!
//! Lists every product on the market, fetches product details
//! concurrently, and prints the free ones as a sorted Markdown table.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Any error (session, listing, detail fetch, output)

mod aggregate;
mod cli;
mod config;
mod market;
mod models;
mod report;

use aggregate::{AggregateError, Aggregator};
use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, FetchConfig};
use indicatif::{ProgressBar, ProgressStyle};
use market::{CatalogError, MarketClient};
use models::{Report, ReportMetadata};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Initialize logging
    init_logging(&args);

    info!("freebooks v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_catalog(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Catalog failed: {:#}", e);
            eprintln!("\nError: {:#}", e);
            if is_network_failure(&e) {
                eprintln!("   Check your network connection and --base-url.");
            }
            std::process::exit(1);
        }
    }
}

/// Initialize logging based on verbosity settings.
///
/// Logs go to stderr so stdout carries only the report.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete catalog workflow.
async fn run_catalog(args: Args) -> Result<()> {
    let start_time = Instant::now();
    let config = Config::from_args(&args);

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    // Step 1: Establish a session
    let client =
        MarketClient::new(&config.endpoint).context("Failed to create market client")?;
    let session = interruptible(&cancel, client.establish_session())
        .await
        .context("Failed to establish market session")?;

    // Step 2: List candidates
    let page = interruptible(
        &cancel,
        client.list_candidates(&session, config.fetch.page_size),
    )
    .await
    .context("Failed to list market products")?;

    if page.has_next_page {
        warn!(
            "Market lists more than {} variants; only the first page is used",
            config.fetch.page_size
        );
        debug!("Listing stopped at cursor {:?}", page.end_cursor);
    }

    let total_candidates = page.candidates.len();
    let stdout_is_json =
        config.output.format == OutputFormat::Json && config.output.path.is_none();
    if !stdout_is_json {
        println!("{}", report::count_line(total_candidates));
    }

    // Step 3: Fan out detail fetches
    let progress = make_progress_bar(total_candidates as u64, config.fetch.show_progress);
    let aggregator = Aggregator::new(config.fetch.concurrency, config.endpoint.product_base())
        .with_progress(progress.clone());

    let result = aggregator
        .run(Arc::new(client.bind(session)), page.candidates, &cancel)
        .await;
    progress.finish_and_clear();

    let books = result.context("Failed to fetch product details")?;
    if books.is_empty() {
        warn!("No free products found");
    }

    // Step 4: Render
    let output = match config.output.format {
        OutputFormat::Markdown => report::render_markdown_table(&books),
        OutputFormat::Json => {
            let report = Report {
                metadata: ReportMetadata {
                    base_url: config.endpoint.base_url.clone(),
                    generated_at: Utc::now(),
                    total_candidates,
                    free_products: books.len(),
                    config: Config {
                        fetch: FetchConfig {
                            concurrency: aggregator.concurrency(),
                            ..config.fetch.clone()
                        },
                        ..config.clone()
                    },
                    duration_seconds: start_time.elapsed().as_secs_f64(),
                },
                books,
            };
            let mut json = report::generate_json_report(&report)?;
            json.push('\n');
            json
        }
    };

    match &config.output.path {
        Some(path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!("Report saved to {}", path.display());
        }
        None => print!("{}", output),
    }

    info!("Done in {:.1}s", start_time.elapsed().as_secs_f64());

    Ok(())
}

/// Cancel `token` on the first Ctrl-C and exit on the second.
fn spawn_interrupt_handler(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("Interrupted; stopping (press Ctrl-C again to exit now)");
        token.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
}

/// Await `step` unless `cancel` fires first.
async fn interruptible<T, E>(
    cancel: &CancellationToken,
    step: impl Future<Output = std::result::Result<T, E>>,
) -> Result<T>
where
    E: std::error::Error + Send + Sync + 'static,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AggregateError::Cancelled.into()),
        out = step => Ok(out?),
    }
}

/// Progress bar for the detail fan-out, hidden when disabled.
fn make_progress_bar(len: u64, enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb
}

/// True when the failure happened before the market answered.
fn is_network_failure(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        if let Some(e) = cause.downcast_ref::<CatalogError>() {
            return e.is_transport();
        }
        matches!(
            cause.downcast_ref::<AggregateError>(),
            Some(AggregateError::Fetch(e)) if e.is_transport()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_interruptible_stops_on_cancel() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        // A request that never answers.
        let hung = std::future::pending::<std::result::Result<(), CatalogError>>();
        let err = tokio::time::timeout(Duration::from_secs(5), interruptible(&cancel, hung))
            .await
            .expect("cancellation should end the wait")
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<AggregateError>(),
            Some(AggregateError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn test_interruptible_passes_results_through() {
        let cancel = CancellationToken::new();

        let value = interruptible(&cancel, async { Ok::<_, CatalogError>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);

        let err = interruptible(&cancel, async {
            Err::<(), _>(CatalogError::MissingToken)
        })
        .await
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CatalogError>(),
            Some(CatalogError::MissingToken)
        ));
    }
}
