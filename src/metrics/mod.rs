//! Backend metrics: HTTP access, retry, merge and display formatting.

pub mod badges;
pub mod client;
pub mod fetcher;
pub mod format;
pub mod retry;
pub mod trending;
pub mod types;

pub use badges::{Badge, BadgeColor, RiskFactor, SecurityBadges, SecurityReport};
pub use client::{BackendClient, Endpoint, MetricsApi};
pub use fetcher::MetricsFetcher;
pub use retry::RetryPolicy;
pub use trending::{TrendingFeed, TrendingToken};
pub use types::{DexPaidHistory, SocialLinks, TokenDetails, TokenMetricsRecord};
