//! search-probe: run resilient searches against the clip search API.
//!
//! ```text
//! search-probe [--config FILE] query <TEXT>   one search, JSON to stdout
//! search-probe [--config FILE] watch          probe until Ctrl+C
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use search_resilience::config::{load_config, ResilienceConfig};
use search_resilience::lifecycle::{signals, Shutdown};
use search_resilience::observability::{
    logging, metrics, FanoutSink, MetricsSink, TelemetrySink, TracingSink,
};
use search_resilience::probe::SearchProbe;
use search_resilience::{ResilientSearch, SearchClient, SearchErrorTracker, SearchQuery};

#[derive(Parser)]
#[command(name = "search-probe")]
#[command(about = "Resilient client and probe for the clip search API", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override search.base_url from the config.
    #[arg(short, long)]
    url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single search with automatic retries
    Query {
        text: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        sort: Option<String>,
    },
    /// Probe search on an interval until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ResilienceConfig::default(),
    };
    if let Some(url) = cli.url {
        config.search.base_url = url;
    }

    logging::init_logging(&config.observability.log_level);
    tracing::info!(
        base_url = %config.search.base_url,
        max_retries = config.retry.max_retries,
        failure_threshold = config.circuit_breaker.failure_threshold,
        "Configuration loaded"
    );

    let telemetry: Arc<dyn TelemetrySink> = Arc::new(
        FanoutSink::new()
            .with(Arc::new(TracingSink))
            .with(Arc::new(MetricsSink)),
    );
    let client = SearchClient::new(&config.search)?;
    let tracker = SearchErrorTracker::new(config.policy(), telemetry);
    let search = ResilientSearch::new(client, tracker, config.retry.automatic);

    match cli.command {
        Commands::Query { text, page, limit, sort } => {
            let mut query = SearchQuery::new(text).page(page);
            if let Some(limit) = limit {
                query = query.limit(limit);
            }
            if let Some(sort) = sort {
                query = query.sort(sort);
            }

            let result = search.search(&query).await;
            let state = search.tracker().state();
            search.tracker().dispose();

            match result {
                Ok(results) => {
                    if results.is_degraded() {
                        eprintln!("warning: {}", state.message.unwrap_or_default());
                    }
                    println!("{}", serde_json::to_string_pretty(&results.body)?);
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    eprintln!("{}", serde_json::to_string_pretty(&state)?);
                    std::process::exit(1);
                }
            }
        }
        Commands::Watch => {
            if config.observability.metrics_enabled {
                match config.observability.metrics_address.parse() {
                    Ok(addr) => metrics::init_metrics(addr),
                    Err(_) => tracing::error!(
                        metrics_address = %config.observability.metrics_address,
                        "Failed to parse metrics address"
                    ),
                }
            }

            let shutdown = Shutdown::new();
            tokio::spawn(signals::shutdown_on_ctrl_c(shutdown.clone()));

            let probe = SearchProbe::new(search, config.probe.clone());
            probe.run(shutdown.subscribe()).await;
            tracing::info!("Shutdown complete");
        }
    }

    Ok(())
}
