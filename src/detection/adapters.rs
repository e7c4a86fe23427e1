//! Per-site extraction rules.
//!
//! Each supported trading terminal is described by a `SiteRule`; a single
//! `SiteAdapter` interprets any rule, so adding a site means adding a table
//! entry rather than another near-identical type.

use crate::detection::address::{first_address, is_likely_address};
use crate::detection::page::{DomSelector, PageSnapshot};
use crate::types::TokenAddress;
use tracing::debug;
use url::Url;

/// How a rule matches a hostname.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostMatch {
    /// `domain` itself or any subdomain of it.
    Domain(&'static str),
    /// Any hostname containing the fragment.
    Contains(&'static str),
}

impl HostMatch {
    pub fn matches(&self, host: &str) -> bool {
        match self {
            HostMatch::Domain(domain) => {
                host == *domain
                    || host
                        .strip_suffix(domain)
                        .is_some_and(|prefix| prefix.ends_with('.'))
            }
            HostMatch::Contains(fragment) => host.contains(fragment),
        }
    }
}

/// Declarative description of where one site keeps its token address.
#[derive(Debug, Clone)]
pub struct SiteRule {
    pub name: &'static str,
    pub hosts: &'static [HostMatch],
    /// Query parameters checked first, in order.
    pub query_params: &'static [&'static str],
    /// Path keywords whose following segment holds the address.
    pub path_keywords: &'static [&'static str],
    /// Selectors tried in order before falling back to the whole page text.
    pub dom_selectors: &'static [DomSelector],
}

const COMMON_SELECTORS: &[DomSelector] = &[
    DomSelector::Attribute("data-mint"),
    DomSelector::Attribute("data-token"),
    DomSelector::Attribute("data-address"),
    DomSelector::Class("token-address"),
];

/// Built-in sites in registration order.
pub static BUILTIN_RULES: &[SiteRule] = &[
    SiteRule {
        name: "GMGN",
        hosts: &[HostMatch::Domain("gmgn.ai")],
        query_params: &[],
        path_keywords: &["token"],
        dom_selectors: &[
            DomSelector::Attribute("data-mint"),
            DomSelector::Attribute("data-token"),
            DomSelector::Attribute("data-address"),
            DomSelector::Class("token-address"),
            DomSelector::Class("mint-address"),
        ],
    },
    SiteRule {
        name: "Trojan",
        hosts: &[HostMatch::Contains("trojan")],
        query_params: &["token"],
        path_keywords: &["token"],
        dom_selectors: &[
            DomSelector::Attribute("data-mint"),
            DomSelector::Attribute("data-token-address"),
            DomSelector::Class("contract-address"),
            DomSelector::Class("token-mint"),
        ],
    },
    SiteRule {
        name: "Axiom",
        hosts: &[HostMatch::Domain("axiom.trade")],
        query_params: &[],
        path_keywords: &["meme"],
        dom_selectors: COMMON_SELECTORS,
    },
    SiteRule {
        name: "Padre",
        hosts: &[HostMatch::Contains("padre")],
        query_params: &[],
        path_keywords: &["token", "solana"],
        dom_selectors: &[
            DomSelector::Attribute("data-mint"),
            DomSelector::Attribute("data-token"),
            DomSelector::Class("token-address"),
            DomSelector::Class("contract"),
        ],
    },
    SiteRule {
        name: "NeoBull X",
        hosts: &[HostMatch::Domain("bullx.io")],
        query_params: &["address"],
        path_keywords: &[],
        dom_selectors: &[
            DomSelector::Attribute("data-address"),
            DomSelector::Attribute("data-mint"),
            DomSelector::Attribute("data-token"),
            DomSelector::Attribute("data-contract"),
            DomSelector::Class("token-address"),
            DomSelector::Class("contract-address"),
            DomSelector::Class("mint-address"),
            DomSelector::InputValueContains("pump"),
            DomSelector::CopyButton,
        ],
    },
    SiteRule {
        name: "Pump.fun",
        hosts: &[HostMatch::Domain("pump.fun")],
        query_params: &[],
        path_keywords: &["coin"],
        dom_selectors: COMMON_SELECTORS,
    },
    SiteRule {
        name: "Telemetry",
        hosts: &[HostMatch::Contains("telemetry.io")],
        query_params: &[],
        path_keywords: &["trading"],
        dom_selectors: COMMON_SELECTORS,
    },
];

/// Extraction strategy for one site, driven by its `SiteRule`.
#[derive(Debug, Clone)]
pub struct SiteAdapter {
    rule: SiteRule,
}

impl SiteAdapter {
    pub fn new(rule: SiteRule) -> Self {
        Self { rule }
    }

    /// Adapters for every built-in site, in registration order.
    pub fn builtin() -> Vec<SiteAdapter> {
        BUILTIN_RULES.iter().cloned().map(SiteAdapter::new).collect()
    }

    pub fn name(&self) -> &'static str {
        self.rule.name
    }

    /// Whether the URL's hostname belongs to this site. Malformed URLs never match.
    pub fn can_handle(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        self.rule.hosts.iter().any(|h| h.matches(host))
    }

    /// Address carried in the URL: named query parameters first, then the
    /// segment after a path keyword, then any address-shaped path segment.
    pub fn extract_from_url(&self, url: &str) -> Option<TokenAddress> {
        let parsed = Url::parse(url).ok()?;

        for param in self.rule.query_params {
            let value = parsed
                .query_pairs()
                .find(|(key, _)| key == *param)
                .map(|(_, value)| value.trim().to_string());
            if let Some(mint) = value.and_then(|v| TokenAddress::parse(&v).ok()) {
                return Some(mint);
            }
        }

        let segments: Vec<&str> = parsed
            .path_segments()
            .map(|s| s.filter(|p| !p.is_empty()).collect())
            .unwrap_or_default();

        for keyword in self.rule.path_keywords {
            if let Some(pos) = segments.iter().position(|s| s == keyword) {
                if let Some(mint) = segments
                    .get(pos + 1)
                    .and_then(|s| TokenAddress::parse(s).ok())
                {
                    return Some(mint);
                }
            }
        }

        segments
            .iter()
            .find(|s| is_likely_address(s))
            .and_then(|s| TokenAddress::parse(s).ok())
    }

    /// Address found in the page: the rule's selectors first, then the first
    /// address anywhere in the visible text.
    pub fn extract_from_dom(&self, page: &PageSnapshot) -> Option<TokenAddress> {
        for selector in self.rule.dom_selectors {
            for element in page.select(selector) {
                if let Some(mint) = selector.texts(element).into_iter().find_map(first_address) {
                    debug!("{} matched {:?} in DOM", self.rule.name, selector);
                    return Some(mint);
                }
            }
        }
        first_address(page.visible_text())
    }
}
