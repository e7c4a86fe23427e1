//! Concurrent fetch of every backend section for one mint, merged into a
//! single `TokenMetricsRecord`.
//!
//! The token-detail call is mandatory. Socials, security and dex-paid calls
//! are optional: a failure degrades only that section, to the previous
//! record's value on a refresh or to an empty default on a fresh load.

use crate::error::{ApiError, FetchError};
use crate::metrics::badges::SecurityReport;
use crate::metrics::client::{Endpoint, MetricsApi};
use crate::metrics::format::{format_change, format_count, format_currency, format_percent, format_price};
use crate::metrics::retry::RetryPolicy;
use crate::metrics::types::{DexPaidHistory, SocialLinks, TokenDetails, TokenMetricsRecord};
use crate::types::TokenAddress;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

const NOT_AVAILABLE: &str = "N/A";
const ZERO_CURRENCY: &str = "$0";
const ZERO_PERCENT: &str = "0.0%";

pub struct MetricsFetcher {
    api: Arc<dyn MetricsApi>,
    retry: RetryPolicy,
}

impl MetricsFetcher {
    pub fn new(api: Arc<dyn MetricsApi>, retry: RetryPolicy) -> Self {
        Self { api, retry }
    }

    /// Fetch and merge every section for `mint`.
    ///
    /// `previous` must be the record currently shown for the same mint, or
    /// `None` for a fresh load. A record for another mint is ignored.
    #[instrument(skip_all, fields(mint = %mint, refresh = previous.is_some()))]
    pub async fn fetch(
        &self,
        mint: &TokenAddress,
        previous: Option<&TokenMetricsRecord>,
    ) -> Result<TokenMetricsRecord, FetchError> {
        let previous = previous.filter(|p| &p.mint == mint);

        let (core, socials, security, dex_paid) = tokio::join!(
            self.get(Endpoint::TokenDetails, mint),
            self.get(Endpoint::Socials, mint),
            self.get(Endpoint::Security, mint),
            self.get(Endpoint::DexPaid, mint),
        );

        let details = parse_core(core?)?;

        // Sparse sections keep what the previous record already knew.
        let socials = match (
            optional_section(socials, "socials", |v| Some(SocialLinks::from_payload(v))),
            previous,
        ) {
            (Some(fresh), Some(p)) => fresh.with_fallback(&p.socials),
            (Some(fresh), None) => fresh,
            (None, Some(p)) => p.socials.clone(),
            (None, None) => SocialLinks::default(),
        };
        let security = optional_section(security, "security", SecurityReport::parse)
            .or_else(|| previous.and_then(|p| p.security.clone()));
        let dex_paid = optional_section(dex_paid, "dex paid", DexPaidHistory::from_payload)
            .or_else(|| previous.map(|p| p.dex_paid.clone()))
            .unwrap_or_default();

        let record = merge_details(mint, &details, previous, socials, security, dex_paid);
        debug!("Merged record for {} ({})", record.symbol, record.price);
        Ok(record)
    }

    async fn get(&self, endpoint: Endpoint, mint: &TokenAddress) -> Result<Value, ApiError> {
        let path = endpoint.path(Some(mint));
        self.retry.run(|| self.api.get_json(&path)).await
    }
}

fn parse_core(body: Value) -> Result<TokenDetails, FetchError> {
    let details = body
        .get("tokenDetails")
        .filter(|d| d.is_object())
        .ok_or_else(|| FetchError::InvalidPayload("missing tokenDetails".to_string()))?;
    serde_json::from_value(details.clone()).map_err(|e| FetchError::InvalidPayload(e.to_string()))
}

fn optional_section<T>(
    result: Result<Value, ApiError>,
    section: &str,
    parse: impl FnOnce(&Value) -> Option<T>,
) -> Option<T> {
    match result {
        Ok(body) => {
            let parsed = parse(&body);
            if parsed.is_none() {
                debug!("Ignoring malformed {} payload", section);
            }
            parsed
        }
        Err(e) => {
            warn!("Optional {} request failed: {}", section, e);
            None
        }
    }
}

fn merge_details(
    mint: &TokenAddress,
    details: &TokenDetails,
    previous: Option<&TokenMetricsRecord>,
    socials: SocialLinks,
    security: Option<SecurityReport>,
    dex_paid: DexPaidHistory,
) -> TokenMetricsRecord {
    // Missing field: previous value on refresh, display default otherwise.
    let pick = |fresh: Option<String>, old: fn(&TokenMetricsRecord) -> &String, default: &str| {
        fresh
            .or_else(|| previous.map(|p| old(p).clone()))
            .unwrap_or_else(|| default.to_string())
    };
    let non_empty = |s: &Option<String>| s.clone().filter(|v| !v.trim().is_empty());
    let change = details.price_change.clone().unwrap_or_default();
    let pct = |v: Option<f64>| v.map(|v| format_percent(v, 1));

    let bonding_curve_pct = details
        .bonding_curve_percentage
        .map(|v| (v.clamp(0.0, 100.0) * 10.0).round() / 10.0)
        .or_else(|| previous.map(|p| p.bonding_curve_pct))
        .unwrap_or(0.0);

    TokenMetricsRecord {
        mint: mint.clone(),
        short_mint: mint.short(),
        name: pick(non_empty(&details.name), |p| &p.name, NOT_AVAILABLE),
        symbol: pick(non_empty(&details.symbol), |p| &p.symbol, NOT_AVAILABLE),
        image: pick(non_empty(&details.image), |p| &p.image, ""),
        price: pick(details.price_usd.map(format_price), |p| &p.price, ZERO_CURRENCY),
        market_cap: pick(details.market_cap.map(format_currency), |p| &p.market_cap, ZERO_CURRENCY),
        liquidity: pick(details.liquidity.map(format_currency), |p| &p.liquidity, ZERO_CURRENCY),
        volume_24h: pick(details.volume_24h.map(format_currency), |p| &p.volume_24h, ZERO_CURRENCY),
        fees: pick(details.fees.map(format_currency), |p| &p.fees, ZERO_CURRENCY),
        holders: pick(
            details.holders.map(|h| format_count(h.max(0.0) as u64)),
            |p| &p.holders,
            "0",
        ),
        top10: pick(pct(details.top10_percentage), |p| &p.top10, ZERO_PERCENT),
        dev: pick(pct(details.dev_percentage), |p| &p.dev, ZERO_PERCENT),
        insiders: pick(pct(details.insiders_percentage), |p| &p.insiders, ZERO_PERCENT),
        bundled: pick(pct(details.bundled_percentage), |p| &p.bundled, ZERO_PERCENT),
        sniped: pick(pct(details.snipers_percentage), |p| &p.sniped, ZERO_PERCENT),
        change_5m: pick(change.m5.map(format_change), |p| &p.change_5m, ZERO_PERCENT),
        change_1h: pick(change.h1.map(format_change), |p| &p.change_1h, ZERO_PERCENT),
        change_6h: pick(change.h6.map(format_change), |p| &p.change_6h, ZERO_PERCENT),
        change_24h: pick(change.h24.map(format_change), |p| &p.change_24h, ZERO_PERCENT),
        bonding_curve_pct,
        bonding_curve: format_percent(bonding_curve_pct, 1),
        socials,
        security,
        dex_paid,
        fetched_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    const MINT: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";

    /// Canned responses per path prefix; unknown paths answer 404.
    #[derive(Default)]
    struct CannedApi {
        responses: Mutex<HashMap<&'static str, Result<Value, ApiError>>>,
        calls: Mutex<Vec<String>>,
    }

    impl CannedApi {
        fn with(self, prefix: &'static str, response: Result<Value, ApiError>) -> Self {
            self.responses.lock().unwrap().insert(prefix, response);
            self
        }
    }

    #[async_trait]
    impl MetricsApi for CannedApi {
        async fn get_json(&self, path: &str) -> Result<Value, ApiError> {
            self.calls.lock().unwrap().push(path.to_string());
            let prefix = path.split('/').next().unwrap_or_default();
            self.responses
                .lock()
                .unwrap()
                .get(prefix)
                .cloned()
                .unwrap_or(Err(ApiError::Status { status: 404, path: path.to_string() }))
        }
    }

    fn mint() -> TokenAddress {
        TokenAddress::parse(MINT).unwrap()
    }

    fn fetcher(api: CannedApi) -> (MetricsFetcher, Arc<CannedApi>) {
        let api = Arc::new(api);
        (
            MetricsFetcher::new(api.clone(), RetryPolicy::new(3, Duration::from_millis(10))),
            api,
        )
    }

    fn full_details() -> Value {
        json!({
            "tokenDetails": {
                "name": "Peek",
                "symbol": "PEEK",
                "priceUsd": 0.00001234,
                "marketCap": 45600,
                "liquidity": 12000,
                "volume24h": 2500000,
                "holders": 1234,
                "fees": 3.5,
                "top10Percentage": 22.26,
                "devPercentage": 1.0,
                "bondingCurvePercentage": 140,
                "priceChange": { "m5": 2.0, "h1": -1.26, "h6": 0, "h24": 30 }
            }
        })
    }

    #[tokio::test]
    async fn test_fresh_fetch_formats_and_defaults() {
        let (fetcher, api) = fetcher(CannedApi::default().with("token", Ok(full_details())));
        let record = fetcher.fetch(&mint(), None).await.unwrap();

        assert_eq!(record.name, "Peek");
        assert_eq!(record.short_mint, "7xKXtg2C...uJosgAsU");
        assert_eq!(record.price, "$0.0₄1234");
        assert_eq!(record.market_cap, "$45.60K");
        assert_eq!(record.volume_24h, "$2.50M");
        assert_eq!(record.holders, "1,234");
        assert_eq!(record.top10, "22.3%");
        assert_eq!(record.insiders, "0.0%");
        assert_eq!(record.change_5m, "+2.0%");
        assert_eq!(record.change_1h, "-1.3%");
        assert_eq!(record.bonding_curve, "100.0%");
        assert!(record.socials.is_empty());
        assert!(record.security.is_none());
        assert!(!record.dex_paid.is_paid());
        assert_eq!(api.calls.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_core_failure_is_fatal() {
        let (fetcher, _) = fetcher(
            CannedApi::default()
                .with("tokenSocials", Ok(json!({ "twitter": "x" })))
                .with("token", Err(ApiError::Transport("refused".to_string()))),
        );
        let err = fetcher.fetch(&mint(), None).await.unwrap_err();
        assert!(matches!(err, FetchError::Core(ApiError::Transport(_))));
    }

    #[tokio::test]
    async fn test_missing_token_details_is_invalid() {
        let (fetcher, _) = fetcher(CannedApi::default().with("token", Ok(json!({ "data": {} }))));
        let err = fetcher.fetch(&mint(), None).await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn test_refresh_falls_back_to_previous_values() {
        let (first, _) = fetcher(
            CannedApi::default()
                .with("token", Ok(full_details()))
                .with("tokenSocials", Ok(json!({ "twitter": "https://x.com/peek" })))
                .with("tokenSecurity", Ok(json!({ "riskScore": 90 }))),
        );
        let previous = first.fetch(&mint(), None).await.unwrap();

        let (refresh, _) = fetcher(CannedApi::default().with(
            "token",
            Ok(json!({ "tokenDetails": { "priceUsd": 2.5 } })),
        ));
        let record = refresh.fetch(&mint(), Some(&previous)).await.unwrap();

        assert_eq!(record.price, "$2.50");
        assert_eq!(record.name, "Peek");
        assert_eq!(record.market_cap, "$45.60K");
        assert_eq!(record.bonding_curve_pct, 100.0);
        assert_eq!(record.socials.twitter.as_deref(), Some("https://x.com/peek"));
        assert_eq!(record.security.unwrap().badges.risk.text, "Safe");
    }

    #[tokio::test]
    async fn test_sparse_refresh_keeps_known_sections() {
        let (first, _) = fetcher(
            CannedApi::default()
                .with("token", Ok(full_details()))
                .with(
                    "tokenSocials",
                    Ok(json!({ "twitter": "https://x.com/peek", "website": "https://peek.example" })),
                )
                .with(
                    "tokenSecurity",
                    Ok(json!({ "riskScore": 90, "rugcheckSummary": { "lpLockedPct": 100 } })),
                ),
        );
        let previous = first.fetch(&mint(), None).await.unwrap();

        let (refresh, _) = fetcher(
            CannedApi::default()
                .with("token", Ok(full_details()))
                .with("tokenSocials", Ok(json!({ "website": "https://peek.app" })))
                .with("tokenSecurity", Ok(json!({}))),
        );
        let record = refresh.fetch(&mint(), Some(&previous)).await.unwrap();

        assert_eq!(record.socials.twitter.as_deref(), Some("https://x.com/peek"));
        assert_eq!(record.socials.website.as_deref(), Some("https://peek.app"));
        let security = record.security.unwrap();
        assert_eq!(security.badges.risk.text, "Safe");
        assert_eq!(security.badges.liq_lock.text, "Locked");
    }

    #[tokio::test]
    async fn test_previous_record_for_other_mint_is_ignored() {
        let (first, _) = fetcher(CannedApi::default().with("token", Ok(full_details())));
        let other = TokenAddress::parse("DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263").unwrap();
        let previous = first.fetch(&other, None).await.unwrap();

        let (sparse, _) = fetcher(CannedApi::default().with("token", Ok(json!({ "tokenDetails": {} }))));
        let record = sparse.fetch(&mint(), Some(&previous)).await.unwrap();
        assert_eq!(record.name, "N/A");
        assert_eq!(record.price, "$0");
        assert_eq!(record.holders, "0");
    }
}
