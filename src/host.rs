//! Collaborators supplied by the host shell (browser extension, CLI, tests).
//!
//! The controller never talks to tabs, storage or the UI directly; it goes
//! through these traits so the whole pipeline runs without a browser.

use crate::config::PeekSettings;
use crate::detection::page::PageSnapshot;
use crate::metrics::types::TokenMetricsRecord;
use crate::types::{SiteContext, TokenAddress};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Storage key of the user settings object.
pub const SETTINGS_KEY: &str = "tp_settings";
/// Storage key of the last bound token.
pub const CURRENT_TOKEN_KEY: &str = "currentToken";

/// Query for the active tab.
#[async_trait]
pub trait TabObserver: Send + Sync {
    /// URL and page snapshot of the active tab, or `None` if there is none.
    async fn active_tab(&self) -> Result<Option<SiteContext>>;
}

/// Tab observer backed by a value the caller sets.
#[derive(Default)]
pub struct StaticTabObserver {
    current: Mutex<Option<SiteContext>>,
}

impl StaticTabObserver {
    pub fn new(ctx: Option<SiteContext>) -> Self {
        Self { current: Mutex::new(ctx) }
    }

    pub fn set_context(&self, ctx: Option<SiteContext>) {
        if let Ok(mut current) = self.current.lock() {
            *current = ctx;
        }
    }

    /// Navigate to `url`, replacing the page snapshot.
    pub fn set_url(&self, url: &str, document: Option<PageSnapshot>) {
        self.set_context(Some(SiteContext::new(url, document.map(Arc::new))));
    }
}

#[async_trait]
impl TabObserver for StaticTabObserver {
    async fn active_tab(&self) -> Result<Option<SiteContext>> {
        let current = self
            .current
            .lock()
            .map_err(|_| anyhow::anyhow!("tab state poisoned"))?;
        Ok(current.clone())
    }
}

/// Opaque key-value storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;
    async fn set(&self, key: &str, value: Value) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

#[derive(Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Typed access to the settings object.
pub struct SettingsStore {
    store: Arc<dyn KeyValueStore>,
}

impl SettingsStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Stored settings merged over defaults. Missing, unreadable or corrupt
    /// settings yield the defaults.
    pub async fn load(&self) -> PeekSettings {
        match self.store.get(SETTINGS_KEY).await {
            Ok(Some(value)) => serde_json::from_value(value).unwrap_or_else(|e| {
                warn!("Stored settings are corrupt, using defaults: {}", e);
                PeekSettings::default()
            }),
            Ok(None) => PeekSettings::default(),
            Err(e) => {
                warn!("Failed to load settings: {:#}", e);
                PeekSettings::default()
            }
        }
    }

    pub async fn save(&self, settings: &PeekSettings) -> Result<()> {
        let value = serde_json::to_value(settings).context("Failed to serialize settings")?;
        self.store
            .set(SETTINGS_KEY, value)
            .await
            .context("Failed to save settings")?;
        debug!("Settings saved");
        Ok(())
    }

    /// Shallow-merge `partial` (a JSON object) over the current settings.
    pub async fn update(&self, partial: Value) -> Result<PeekSettings> {
        let mut merged = serde_json::to_value(self.load().await)?;
        if let (Some(target), Value::Object(fields)) = (merged.as_object_mut(), partial) {
            target.extend(fields);
        }
        let updated: PeekSettings =
            serde_json::from_value(merged).context("Invalid settings update")?;
        self.save(&updated).await?;
        Ok(updated)
    }

    pub async fn reset(&self) -> Result<()> {
        self.save(&PeekSettings::default()).await
    }
}

/// Rendering side of the panel. Calls are synchronous and must not block.
pub trait PanelPresenter: Send + Sync {
    /// Bring the panel forward when a token is first bound. Only called when
    /// `auto_open_panel` is enabled.
    fn open_panel(&self) {}
    fn show_loading(&self, mint: &TokenAddress);
    fn show_empty(&self);
    fn show_error(&self, message: &str);
    /// A freshly loaded record replaces whatever was shown.
    fn show_record(&self, record: &TokenMetricsRecord);
    /// Background refresh of the record already on screen.
    fn patch_record(&self, record: &TokenMetricsRecord);
}

/// Presenter that only logs; used by the CLI.
#[derive(Debug, Default)]
pub struct LogPresenter;

impl PanelPresenter for LogPresenter {
    fn open_panel(&self) {
        info!("Token found, opening panel");
    }

    fn show_loading(&self, mint: &TokenAddress) {
        info!("Loading {}", mint.short());
    }

    fn show_empty(&self) {
        info!("No token detected");
    }

    fn show_error(&self, message: &str) {
        warn!("{}", message);
    }

    fn show_record(&self, record: &TokenMetricsRecord) {
        info!(
            "{} ({}) {} | price {} | mcap {} | liq {} | vol {} | holders {} | top10 {} | curve {}",
            record.name,
            record.symbol,
            record.short_mint,
            record.price,
            record.market_cap,
            record.liquidity,
            record.volume_24h,
            record.holders,
            record.top10,
            record.bonding_curve
        );
        if let Some(security) = &record.security {
            info!(
                "risk {} | liquidity {} | authority {} | honeypot {}",
                security.badges.risk.text,
                security.badges.liq_lock.text,
                security.badges.mint_auth.text,
                security.badges.honeypot.text
            );
        }
    }

    fn patch_record(&self, record: &TokenMetricsRecord) {
        info!(
            "{} price {} | mcap {} | 5m {} | 1h {}",
            record.symbol, record.price, record.market_cap, record.change_5m, record.change_1h
        );
    }
}
