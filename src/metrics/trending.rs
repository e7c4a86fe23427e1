//! Ranked trending list, cached on its own cadence.

use crate::error::ApiError;
use crate::metrics::client::{Endpoint, MetricsApi};
use crate::metrics::format::{format_change, format_currency};
use crate::metrics::retry::RetryPolicy;
use crate::metrics::types::lenient_f64;
use crate::types::TokenAddress;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

const CACHE_KEY: &str = "trending";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingToken {
    pub rank: u32,
    pub mint: TokenAddress,
    pub name: String,
    pub symbol: String,
    pub market_cap: String,
    pub price_change_24h: String,
}

/// Wire shape of one trending entry. Field names vary between backend
/// revisions, hence the aliases.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawTrendingEntry {
    rank: Option<u32>,
    #[serde(alias = "address", alias = "tokenAddress")]
    mint: Option<String>,
    name: Option<String>,
    symbol: Option<String>,
    #[serde(alias = "market_cap", deserialize_with = "lenient_f64")]
    market_cap: Option<f64>,
    #[serde(alias = "price_change_24h", alias = "change24h", deserialize_with = "lenient_f64")]
    price_change_24h: Option<f64>,
}

pub struct TrendingFeed {
    api: Arc<dyn MetricsApi>,
    retry: RetryPolicy,
    cache: Cache<&'static str, Arc<Vec<TrendingToken>>>,
}

impl TrendingFeed {
    pub fn new(api: Arc<dyn MetricsApi>, retry: RetryPolicy, refresh_every: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(refresh_every)
            .build();
        Self { api, retry, cache }
    }

    /// Current trending list, refetched at most once per cache period.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Arc<Vec<TrendingToken>>, ApiError> {
        self.cache
            .try_get_with(CACHE_KEY, async {
                let path = Endpoint::Trending.path(None);
                let body = self.retry.run(|| self.api.get_json(&path)).await?;
                let tokens = parse_trending(&body);
                info!("Loaded {} trending tokens", tokens.len());
                Ok::<_, ApiError>(Arc::new(tokens))
            })
            .await
            .map_err(|e| (*e).clone())
    }

    /// Drop the cached list so the next `list` hits the backend.
    pub async fn invalidate(&self) {
        self.cache.invalidate(CACHE_KEY).await;
    }
}

/// Accepts a bare array or one wrapped in `tokens`, `trending` or `data`.
/// Entries without a valid mint are skipped; missing ranks follow list order.
pub fn parse_trending(body: &Value) -> Vec<TrendingToken> {
    let entries = body.as_array().or_else(|| {
        ["tokens", "trending", "data"]
            .iter()
            .find_map(|key| body.get(*key).and_then(Value::as_array))
    });

    let mut tokens: Vec<TrendingToken> = entries
        .into_iter()
        .flatten()
        .enumerate()
        .filter_map(|(index, item)| {
            let raw: RawTrendingEntry = serde_json::from_value(item.clone()).ok()?;
            let mint = TokenAddress::parse(raw.mint.as_deref()?.trim()).ok()?;
            Some(TrendingToken {
                rank: raw.rank.unwrap_or(index as u32 + 1),
                name: raw.name.unwrap_or_else(|| "N/A".to_string()),
                symbol: raw.symbol.unwrap_or_else(|| "N/A".to_string()),
                market_cap: format_currency(raw.market_cap.unwrap_or(0.0)),
                price_change_24h: format_change(raw.price_change_24h.unwrap_or(0.0)),
                mint,
            })
        })
        .collect();

    tokens.sort_by_key(|t| t.rank);
    debug!("Parsed {} trending entries", tokens.len());
    tokens
}
