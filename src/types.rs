//! Core types shared by the detection pipeline and the metrics fetcher.

use crate::detection::page::PageSnapshot;
use crate::error::AddressError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Minimum and maximum length of a base58 token address.
pub const ADDRESS_MIN_LEN: usize = 32;
pub const ADDRESS_MAX_LEN: usize = 44;

/// A syntactically valid token mint address.
///
/// Only the base58 grammar is checked (`[1-9A-HJ-NP-Za-km-z]{32,44}`); the
/// address is never looked up on-chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TokenAddress(String);

impl TokenAddress {
    /// Validate `candidate` against the address grammar.
    pub fn parse(candidate: &str) -> Result<Self, AddressError> {
        let len = candidate.chars().count();
        if !(ADDRESS_MIN_LEN..=ADDRESS_MAX_LEN).contains(&len) {
            return Err(AddressError::InvalidLength(len));
        }
        if let Some(bad) = candidate.chars().find(|c| !is_base58_char(*c)) {
            return Err(AddressError::InvalidCharacter(bad));
        }
        Ok(Self(candidate.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `first8...last8`, as shown in the panel's address pill.
    pub fn short(&self) -> String {
        let s = &self.0;
        format!("{}...{}", &s[..8], &s[s.len() - 8..])
    }
}

/// Base58 alphabet without the ambiguous `0 O I l`.
pub fn is_base58_char(c: char) -> bool {
    matches!(c, '1'..='9' | 'A'..='H' | 'J'..='N' | 'P'..='Z' | 'a'..='k' | 'm'..='z')
}

impl TryFrom<String> for TokenAddress {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TokenAddress::parse(&value)
    }
}

impl From<TokenAddress> for String {
    fn from(value: TokenAddress) -> Self {
        value.0
    }
}

impl fmt::Display for TokenAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TokenAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Where a detected mint came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionSource {
    Url,
    Dom,
    None,
}

/// How much a detection result can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// Outcome of one detection cycle. Produced fresh each cycle, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub mint: Option<TokenAddress>,
    pub source: DetectionSource,
    pub confidence: Confidence,
}

impl DetectionResult {
    /// Mint read from the page URL by a site adapter.
    pub fn from_url(mint: TokenAddress) -> Self {
        Self { mint: Some(mint), source: DetectionSource::Url, confidence: Confidence::High }
    }

    /// Mint read from the DOM by a site adapter.
    pub fn from_dom(mint: TokenAddress) -> Self {
        Self { mint: Some(mint), source: DetectionSource::Dom, confidence: Confidence::Medium }
    }

    /// Mint picked by the generic page-scan heuristic.
    pub fn from_heuristic(mint: TokenAddress) -> Self {
        Self { mint: Some(mint), source: DetectionSource::Dom, confidence: Confidence::Low }
    }

    pub fn none() -> Self {
        Self { mint: None, source: DetectionSource::None, confidence: Confidence::Low }
    }
}

/// Snapshot of the active tab at detection time. Not retained beyond one cycle.
#[derive(Debug, Clone)]
pub struct SiteContext {
    pub url: String,
    pub origin: String,
    pub document: Option<Arc<PageSnapshot>>,
}

impl SiteContext {
    pub fn new(url: impl Into<String>, document: Option<Arc<PageSnapshot>>) -> Self {
        let url = url.into();
        let origin = origin_of(&url);
        Self { url, origin, document }
    }

    /// Context used when no tab is active.
    pub fn blank() -> Self {
        Self::new("", None)
    }
}

/// Serialized origin of `url`; the raw string when it does not parse.
pub fn origin_of(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => parsed.origin().ascii_serialization(),
        Err(_) => url.to_string(),
    }
}
