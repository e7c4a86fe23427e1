//! Backend payloads and the merged record shown in the panel.

use crate::metrics::badges::SecurityReport;
use crate::types::TokenAddress;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Numbers arrive either as JSON numbers or as numeric strings.
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite()))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceChange {
    #[serde(deserialize_with = "lenient_f64")]
    pub m5: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub h1: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub h6: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub h24: Option<f64>,
}

/// `tokenDetails` object of the core endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TokenDetails {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub image: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub price_usd: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub market_cap: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub liquidity: Option<f64>,
    #[serde(rename = "volume24h", deserialize_with = "lenient_f64")]
    pub volume_24h: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub holders: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub fees: Option<f64>,
    #[serde(rename = "top10Percentage", deserialize_with = "lenient_f64")]
    pub top10_percentage: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub dev_percentage: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub insiders_percentage: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub bundled_percentage: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub snipers_percentage: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub bonding_curve_percentage: Option<f64>,
    pub price_change: Option<PriceChange>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SocialLinks {
    pub twitter: Option<String>,
    pub website: Option<String>,
    pub github: Option<String>,
    pub telegram: Option<String>,
    pub instagram: Option<String>,
    pub tiktok: Option<String>,
    pub youtube: Option<String>,
    pub dex_banner: Option<String>,
    pub pump_live: Option<String>,
}

impl SocialLinks {
    /// Accepts an object, an array of partial objects, or either wrapped in
    /// `socials`. Earlier non-empty values win.
    pub fn from_payload(json: &Value) -> Self {
        let body = json.get("socials").unwrap_or(json);
        let parts: Vec<&Value> = match body {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };

        let mut links = SocialLinks::default();
        for part in parts {
            let Ok(found) = serde_json::from_value::<SocialLinks>(part.clone()) else {
                continue;
            };
            links.absorb(found);
        }
        links
    }

    /// Links from `self`, with gaps filled from `previous`.
    pub fn with_fallback(mut self, previous: &SocialLinks) -> Self {
        self.absorb(previous.clone());
        self
    }

    fn absorb(&mut self, other: SocialLinks) {
        fn fill(slot: &mut Option<String>, value: Option<String>) {
            if slot.is_none() {
                *slot = value.filter(|v| !v.trim().is_empty());
            }
        }
        fill(&mut self.twitter, other.twitter);
        fill(&mut self.website, other.website);
        fill(&mut self.github, other.github);
        fill(&mut self.telegram, other.telegram);
        fill(&mut self.instagram, other.instagram);
        fill(&mut self.tiktok, other.tiktok);
        fill(&mut self.youtube, other.youtube);
        fill(&mut self.dex_banner, other.dex_banner);
        fill(&mut self.pump_live, other.pump_live);
    }

    pub fn is_empty(&self) -> bool {
        *self == SocialLinks::default()
    }
}

/// DexScreener payment history (`dexPaidData`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DexPaidHistory {
    pub orders: Vec<Value>,
    pub boosts: Vec<Value>,
}

impl DexPaidHistory {
    pub fn from_payload(json: &Value) -> Option<Self> {
        let data = json.get("dexPaidData")?;
        serde_json::from_value(data.clone()).ok()
    }

    pub fn is_paid(&self) -> bool {
        !self.orders.is_empty()
    }
}

/// Everything the panel shows for one mint, already formatted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenMetricsRecord {
    pub mint: TokenAddress,
    pub short_mint: String,
    pub name: String,
    pub symbol: String,
    pub image: String,
    pub price: String,
    pub market_cap: String,
    pub liquidity: String,
    pub volume_24h: String,
    pub fees: String,
    pub holders: String,
    pub top10: String,
    pub dev: String,
    pub insiders: String,
    pub bundled: String,
    pub sniped: String,
    pub change_5m: String,
    pub change_1h: String,
    pub change_6h: String,
    pub change_24h: String,
    /// 0..=100
    pub bonding_curve_pct: f64,
    pub bonding_curve: String,
    pub socials: SocialLinks,
    pub security: Option<SecurityReport>,
    pub dex_paid: DexPaidHistory,
    pub fetched_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_details_accept_numeric_strings() {
        let details: TokenDetails = serde_json::from_value(json!({
            "name": "Bonk",
            "priceUsd": "0.0000231",
            "marketCap": 1500000,
            "volume24h": "n/a",
            "top10Percentage": 21.5,
            "priceChange": { "m5": "1.2", "h24": -4 }
        }))
        .unwrap();

        assert_eq!(details.name.as_deref(), Some("Bonk"));
        assert_eq!(details.price_usd, Some(0.0000231));
        assert_eq!(details.market_cap, Some(1_500_000.0));
        assert_eq!(details.volume_24h, None);
        assert_eq!(details.top10_percentage, Some(21.5));
        let change = details.price_change.unwrap();
        assert_eq!(change.m5, Some(1.2));
        assert_eq!(change.h1, None);
        assert_eq!(change.h24, Some(-4.0));
    }

    #[test]
    fn test_socials_from_array() {
        let links = SocialLinks::from_payload(&json!([
            { "twitter": "https://x.com/a", "website": "" },
            { "website": "https://a.io", "twitter": "https://x.com/b", "dexBanner": "b.png" }
        ]));
        assert_eq!(links.twitter.as_deref(), Some("https://x.com/a"));
        assert_eq!(links.website.as_deref(), Some("https://a.io"));
        assert_eq!(links.dex_banner.as_deref(), Some("b.png"));
        assert!(links.telegram.is_none());
    }

    #[test]
    fn test_socials_wrapped_object() {
        let links = SocialLinks::from_payload(&json!({ "socials": { "telegram": "t.me/a" } }));
        assert_eq!(links.telegram.as_deref(), Some("t.me/a"));
        assert!(SocialLinks::from_payload(&json!("garbage")).is_empty());
    }

    #[test]
    fn test_socials_fallback_fills_gaps_only() {
        let previous = SocialLinks::from_payload(&json!({
            "twitter": "https://x.com/old",
            "website": "https://old.example"
        }));
        let fresh = SocialLinks::from_payload(&json!({ "website": "https://new.example" }));

        let merged = fresh.with_fallback(&previous);
        assert_eq!(merged.twitter.as_deref(), Some("https://x.com/old"));
        assert_eq!(merged.website.as_deref(), Some("https://new.example"));
        assert!(merged.telegram.is_none());
    }

    #[test]
    fn test_dex_paid_history() {
        let history = DexPaidHistory::from_payload(&json!({
            "dexPaidData": { "orders": [{ "type": "tokenProfile", "status": "approved" }] }
        }))
        .unwrap();
        assert!(history.is_paid());
        assert!(history.boosts.is_empty());
        assert!(DexPaidHistory::from_payload(&json!({})).is_none());
    }
}
