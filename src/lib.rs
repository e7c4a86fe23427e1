//! token-peek - token identity detection and live metrics for trading terminals
//!
//! Resolves which token mint the active page is about, keeps one
//! "currently displayed token" session per panel, and loads and periodically
//! refreshes that token's metrics from the aggregation backend.

pub mod types;
pub mod error;
pub mod config;
pub mod detection;
pub mod metrics;
pub mod scheduler;
pub mod host;
pub mod controller;

// Re-export main types for convenience
pub use config::{PeekConfig, PeekConfigBuilder, PeekSettings};
pub use controller::{PanelController, PanelView, LOAD_ERROR_MESSAGE};
pub use detection::{AdapterRegistry, DetectionSession, DetectionTrigger, PageElement, PageSnapshot};
pub use error::{AddressError, ApiError, FetchError};
pub use host::{
    InMemoryStore, KeyValueStore, LogPresenter, PanelPresenter, SettingsStore, StaticTabObserver,
    TabObserver,
};
pub use metrics::{BackendClient, MetricsApi, MetricsFetcher, RetryPolicy, TokenMetricsRecord};
pub use types::{Confidence, DetectionResult, DetectionSource, SiteContext, TokenAddress};
