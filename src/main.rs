//! Command-line entry point for token-peek
//!
//! Detects the token on a page and keeps its metrics fresh until Ctrl-C.
//!
//! ```text
//! token-peek <url> [page.json | page.txt]
//! token-peek --trending
//! ```

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::sync::Arc;
use token_peek::{
    BackendClient, DetectionTrigger, InMemoryStore, LogPresenter, PageSnapshot, PanelController,
    PanelView, PeekConfig, SettingsStore, StaticTabObserver,
};
use tracing::{info, warn, Level};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(first) = args.first() else {
        bail!("usage: token-peek <url> [page.json | page.txt] | token-peek --trending");
    };

    let store = Arc::new(InMemoryStore::new());
    let mut config = PeekConfig::from_env();
    config.apply_settings(&SettingsStore::new(store.clone()).load().await);
    info!("Using backend {}", config.api_base_url);

    let api = Arc::new(BackendClient::new(&config)?);
    let tabs = Arc::new(StaticTabObserver::default());
    let controller = PanelController::new(config, api, tabs.clone(), Arc::new(LogPresenter), store);

    if first == "--trending" {
        let tokens = controller.trending().await.context("Failed to load trending tokens")?;
        for token in tokens.iter() {
            info!(
                "#{} {} ({}) {} mcap {} 24h {}",
                token.rank, token.name, token.symbol, token.mint, token.market_cap, token.price_change_24h
            );
        }
        let Some(top) = tokens.first() else {
            info!("Trending list is empty");
            return Ok(());
        };
        let view = controller.select_token(top.mint.clone()).await?;
        if view != PanelView::Main {
            info!("Panel is {:?}, nothing to refresh", view);
            return Ok(());
        }
    } else {
        let page = match args.get(1) {
            Some(path) => Some(load_page(Path::new(path))?),
            None => None,
        };
        tabs.set_url(first, page);
        let view = controller.handle(DetectionTrigger::TabActivated).await?;
        if view != PanelView::Main {
            info!("Panel is {:?}, nothing to refresh", view);
            return Ok(());
        }
    }
    controller.start_detection_polling();

    info!("Watching, press Ctrl-C to stop");
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
    }
    controller.shutdown();
    Ok(())
}

/// A `.json` file is a serialized `PageSnapshot`; anything else is taken as
/// the page's visible text.
fn load_page(path: &Path) -> Result<PageSnapshot> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read page file {}", path.display()))?;
    if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&raw).context("Failed to parse page snapshot")
    } else {
        Ok(PageSnapshot::from_text(raw))
    }
}
