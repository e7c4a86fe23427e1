//! Security payload → categorical badges.
//!
//! The security endpoint returns a loosely shaped rugcheck report. Only a
//! handful of fields are read; anything missing resolves to the neutral or
//! permissive reading of that field.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Score used when the payload carries none.
const DEFAULT_RISK_SCORE: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeColor {
    Green,
    Orange,
    Red,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub text: String,
    pub color: BadgeColor,
}

impl Badge {
    fn new(text: &str, color: BadgeColor) -> Self {
        Self { text: text.to_string(), color }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityBadges {
    pub risk: Badge,
    pub liq_lock: Badge,
    pub mint_auth: Badge,
    pub honeypot: Badge,
}

/// One entry of the report's risk list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub name: String,
    pub level: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityReport {
    pub risk_score: i64,
    pub badges: SecurityBadges,
    pub risk_factors: Vec<RiskFactor>,
}

/// Top-level keys that make a payload a security report at all.
const REPORT_KEYS: [&str; 5] = ["riskScore", "score", "rugcheckSummary", "rugcheck", "risks"];

impl SecurityReport {
    /// Report for `json`, or `None` when the payload carries none of the
    /// fields a report is built from.
    pub fn parse(json: &Value) -> Option<Self> {
        REPORT_KEYS
            .iter()
            .any(|key| json.get(*key).is_some_and(|v| !v.is_null()))
            .then(|| Self::from_payload(json))
    }

    pub fn from_payload(json: &Value) -> Self {
        let score = risk_score(json);
        Self {
            risk_score: score.round() as i64,
            badges: SecurityBadges {
                risk: risk_badge(score),
                liq_lock: liquidity_badge(json),
                mint_auth: authority_badge(&json["rugcheck"]),
                honeypot: honeypot_badge(json),
            },
            risk_factors: risk_factors(json),
        }
    }
}

fn risk_score(json: &Value) -> f64 {
    [
        &json["riskScore"],
        &json["rugcheckSummary"]["riskScore"],
        &json["rugcheckSummary"]["score"],
        &json["score"],
    ]
    .into_iter()
    .find_map(Value::as_f64)
    .unwrap_or(DEFAULT_RISK_SCORE)
}

fn risk_badge(score: f64) -> Badge {
    if score >= 80.0 {
        Badge::new("Safe", BadgeColor::Green)
    } else if score >= 65.0 {
        Badge::new("Low", BadgeColor::Green)
    } else if score >= 50.0 {
        Badge::new("Medium", BadgeColor::Orange)
    } else if score >= 35.0 {
        Badge::new("High", BadgeColor::Red)
    } else {
        Badge::new("Extreme", BadgeColor::Red)
    }
}

fn liquidity_badge(json: &Value) -> Badge {
    let pct = json["rugcheckSummary"]["lpLockedPct"].as_f64().unwrap_or(0.0);
    if pct == 100.0 {
        Badge::new("Locked", BadgeColor::Green)
    } else if pct > 50.0 {
        Badge::new("Partial", BadgeColor::Orange)
    } else {
        Badge::new("Unlocked", BadgeColor::Red)
    }
}

/// Authorities serialised as the string `"null"` count as revoked.
fn authority_active(value: &Value) -> bool {
    !(value.is_null() || value.as_str() == Some("null"))
}

fn authority_badge(rugcheck: &Value) -> Badge {
    if authority_active(&rugcheck["mintAuthority"]) || authority_active(&rugcheck["freezeAuthority"]) {
        Badge::new("Enabled", BadgeColor::Red)
    } else {
        Badge::new("Disabled", BadgeColor::Green)
    }
}

fn honeypot_badge(json: &Value) -> Badge {
    let extensions = &json["rugcheck"]["token_extensions"];
    let fee = json["rugcheck"]["transferFee"]["pct"].as_f64().unwrap_or(0.0);

    let suspicious = extensions["nonTransferable"].as_bool() == Some(true)
        || !extensions["defaultAccountState"].is_null()
        || fee > 0.0;

    if suspicious {
        Badge::new("Yes", BadgeColor::Red)
    } else {
        Badge::new("No", BadgeColor::Green)
    }
}

fn risk_factors(json: &Value) -> Vec<RiskFactor> {
    let list = json["risks"]
        .as_array()
        .or_else(|| json["rugcheck"]["risks"].as_array());

    list.into_iter()
        .flatten()
        .filter_map(|item| match item {
            Value::String(name) => Some(RiskFactor {
                name: name.clone(),
                level: None,
                description: None,
            }),
            Value::Object(_) => item["name"].as_str().map(|name| RiskFactor {
                name: name.to_string(),
                level: item["level"].as_str().map(str::to_string),
                description: item["description"].as_str().map(str::to_string),
            }),
            _ => None,
        })
        .collect()
}
