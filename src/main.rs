mod config;
mod fetch;
mod model;
mod orchestrator;
mod parser;
mod price;
mod registry;
#[cfg(test)]
mod testing;

use config::{AppConfig, load_config};
use fetch::{HttpImageFetcher, HttpPageFetcher, ImageFetcher};
use model::ConfigError;
use orchestrator::ScrapeOrchestrator;
use parser::FetchContext;
use registry::ExtractorRegistry;
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so stdout carries only the JSON batch
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    std::panic::set_hook(Box::new(|panic_info| {
        error!("Panic occurred: {}", panic_info);
    }));

    let config_path = env::args().nth(1).unwrap_or_else(|| "config.json".to_string());
    let config = match load_config(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Config load error ({}): {}", config_path, e);
            return ExitCode::FAILURE;
        }
    };

    let orchestrator = match build_orchestrator(&config) {
        Ok(o) => o,
        Err(e) => {
            error!("Startup failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Ctrl-C cuts the drain wait short; whatever finished is still reported
    let interrupt = CancellationToken::new();
    let on_signal = interrupt.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping batch...");
            on_signal.cancel();
        }
    });

    info!("Scraping {} URLs with {} workers", config.urls.len(), config.concurrency);
    let batch = orchestrator.with_interrupt(interrupt).run(&config.urls).await;
    info!("Successfully fetched {} machines.", batch.len());

    match serde_json::to_string_pretty(&batch) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to serialize batch: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn build_orchestrator(config: &AppConfig) -> Result<ScrapeOrchestrator, ConfigError> {
    let pages = HttpPageFetcher::new(&config.user_agent, config.fetch_timeout())?;
    let images: Option<Arc<dyn ImageFetcher>> = if config.download_photos {
        Some(Arc::new(HttpImageFetcher::new(pages.client().clone())))
    } else {
        None
    };

    let registry = ExtractorRegistry::with_default_sites(FetchContext::new(Arc::new(pages), images))?;
    info!("Registered extractors: {}", registry.names().join(", "));

    ScrapeOrchestrator::from_config(Arc::new(registry), config)
}
