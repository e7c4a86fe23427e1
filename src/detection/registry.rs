//! Ordered adapter registry and the generic page-scan fallback.

use crate::detection::adapters::SiteAdapter;
use crate::detection::address::least_frequent_address;
use crate::types::{DetectionResult, SiteContext};
use tracing::{debug, instrument};

/// Resolves a `SiteContext` to at most one token address.
pub struct AdapterRegistry {
    adapters: Vec<SiteAdapter>,
}

impl AdapterRegistry {
    pub fn new(adapters: Vec<SiteAdapter>) -> Self {
        Self { adapters }
    }

    /// Registry with every built-in site.
    pub fn builtin() -> Self {
        Self::new(SiteAdapter::builtin())
    }

    /// First registered adapter whose hostname rule matches `url`.
    pub fn adapter_for(&self, url: &str) -> Option<&SiteAdapter> {
        self.adapters.iter().find(|a| a.can_handle(url))
    }

    /// Run one detection cycle.
    ///
    /// The matching adapter's URL rule wins (high confidence), then its DOM
    /// rule (medium). Unknown sites, or known sites that yielded nothing, fall
    /// through to the least-frequent-address heuristic (low).
    #[instrument(skip(self, ctx), fields(url = %ctx.url))]
    pub fn resolve(&self, ctx: &SiteContext) -> DetectionResult {
        if let Some(adapter) = self.adapter_for(&ctx.url) {
            debug!("Using {} adapter", adapter.name());

            if let Some(mint) = adapter.extract_from_url(&ctx.url) {
                return DetectionResult::from_url(mint);
            }
            if let Some(mint) = ctx.document.as_deref().and_then(|d| adapter.extract_from_dom(d)) {
                return DetectionResult::from_dom(mint);
            }
        }

        ctx.document
            .as_deref()
            .and_then(|d| least_frequent_address(d.visible_text()))
            .map(DetectionResult::from_heuristic)
            .unwrap_or_else(DetectionResult::none)
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
