//! Panel controller: composes detection, the session, the fetcher, the
//! refresh timer and the presenter.
//!
//! Every trigger funnels through `handle`. The session is mutated under the
//! state lock before any network call starts, and a fetch result is applied
//! only if the `FetchTicket` it was started under is still current.

use crate::config::PeekConfig;
use crate::detection::registry::AdapterRegistry;
use crate::detection::session::{DetectionSession, DetectionTrigger, FetchTicket, Transition};
use crate::error::ApiError;
use crate::host::{KeyValueStore, PanelPresenter, TabObserver, CURRENT_TOKEN_KEY};
use crate::metrics::client::MetricsApi;
use crate::metrics::fetcher::MetricsFetcher;
use crate::metrics::trending::{TrendingFeed, TrendingToken};
use crate::metrics::types::TokenMetricsRecord;
use crate::scheduler::{spawn_periodic, Debouncer, RefreshScheduler};
use crate::types::{SiteContext, TokenAddress};
use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex as StdMutex, Weak};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Shown when the mandatory token-detail call fails.
pub const LOAD_ERROR_MESSAGE: &str = "Failed to load token data, try again";

/// What the panel is currently displaying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelView {
    Loading,
    Main,
    Empty,
    Error,
}

struct PanelState {
    session: DetectionSession,
    view: PanelView,
    record: Option<TokenMetricsRecord>,
}

struct Inner {
    registry: AdapterRegistry,
    fetcher: MetricsFetcher,
    trending: TrendingFeed,
    tabs: Arc<dyn TabObserver>,
    presenter: Arc<dyn PanelPresenter>,
    store: Arc<dyn KeyValueStore>,
    config: PeekConfig,
    state: Mutex<PanelState>,
    refresh: RefreshScheduler,
    mutation_debounce: Debouncer,
    url_debounce: Debouncer,
    poller: StdMutex<Option<JoinHandle<()>>>,
}

/// Cheap to clone; clones share one session.
#[derive(Clone)]
pub struct PanelController {
    inner: Arc<Inner>,
}

impl PanelController {
    pub fn new(
        config: PeekConfig,
        api: Arc<dyn MetricsApi>,
        tabs: Arc<dyn TabObserver>,
        presenter: Arc<dyn PanelPresenter>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self::with_registry(config, AdapterRegistry::builtin(), api, tabs, presenter, store)
    }

    pub fn with_registry(
        config: PeekConfig,
        registry: AdapterRegistry,
        api: Arc<dyn MetricsApi>,
        tabs: Arc<dyn TabObserver>,
        presenter: Arc<dyn PanelPresenter>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let retry = config.retry_policy();
        let inner = Inner {
            registry,
            fetcher: MetricsFetcher::new(api.clone(), retry),
            trending: TrendingFeed::new(api, retry, config.trending_refresh()),
            tabs,
            presenter,
            store,
            state: Mutex::new(PanelState {
                session: DetectionSession::new(),
                view: PanelView::Loading,
                record: None,
            }),
            refresh: RefreshScheduler::new(config.refresh_interval()),
            mutation_debounce: Debouncer::new(config.mutation_debounce()),
            url_debounce: Debouncer::new(config.url_change_debounce()),
            poller: StdMutex::new(None),
            config,
        };
        Self { inner: Arc::new(inner) }
    }

    pub fn config(&self) -> &PeekConfig {
        &self.inner.config
    }

    /// Run one detection cycle and, if the bound mint changed or the trigger
    /// forces it, load its metrics. Returns the resulting view.
    pub async fn handle(&self, trigger: DetectionTrigger) -> Result<PanelView> {
        self.inner.handle(trigger).await
    }

    /// Show `mint` regardless of what the page contains.
    pub async fn select_token(&self, mint: TokenAddress) -> Result<PanelView> {
        self.handle(DetectionTrigger::Override(mint)).await
    }

    /// Reload the current page's token, e.g. from the retry button.
    pub async fn reload(&self) -> Result<PanelView> {
        self.handle(DetectionTrigger::ManualRefresh).await
    }

    /// Start the periodic detection poll. Restarting replaces the old poll.
    pub fn start_detection_polling(&self) {
        let weak = Arc::downgrade(&self.inner);
        let handle = spawn_periodic(self.inner.config.detection_poll_interval(), move || {
            let weak = weak.clone();
            async move { Inner::run_weak(&weak, DetectionTrigger::Poll).await }
        });

        let mut poller = self.inner.poller.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = poller.replace(handle) {
            previous.abort();
        }
    }

    /// The page changed; detect again once it settles.
    pub fn notify_dom_mutation(&self) {
        let weak = Arc::downgrade(&self.inner);
        self.inner.mutation_debounce.schedule(async move {
            let _ = Inner::run_weak(&weak, DetectionTrigger::DomMutated).await;
        });
    }

    /// The active tab navigated; detect again after a short settle delay.
    pub fn notify_url_changed(&self) {
        let weak = Arc::downgrade(&self.inner);
        self.inner.url_debounce.schedule(async move {
            let _ = Inner::run_weak(&weak, DetectionTrigger::TabUrlChanged).await;
        });
    }

    pub async fn trending(&self) -> Result<Arc<Vec<TrendingToken>>, ApiError> {
        self.inner.trending.list().await
    }

    pub async fn bound_mint(&self) -> Option<TokenAddress> {
        self.inner.state.lock().await.session.bound_mint().cloned()
    }

    pub async fn current_record(&self) -> Option<TokenMetricsRecord> {
        self.inner.state.lock().await.record.clone()
    }

    pub async fn view(&self) -> PanelView {
        self.inner.state.lock().await.view
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.refresh.is_armed()
    }

    /// Stop every timer. The session itself is left as is.
    pub fn shutdown(&self) {
        self.inner.refresh.cancel();
        self.inner.mutation_debounce.cancel();
        self.inner.url_debounce.cancel();
        if let Some(poller) = self.inner.poller.lock().unwrap_or_else(|e| e.into_inner()).take() {
            poller.abort();
        }
        info!("Panel controller stopped");
    }
}

impl Inner {
    /// Timer entry point; stops the timer once the controller is gone.
    async fn run_weak(weak: &Weak<Inner>, trigger: DetectionTrigger) -> ControlFlow<()> {
        let Some(inner) = weak.upgrade() else {
            return ControlFlow::Break(());
        };
        if let Err(e) = inner.handle(trigger).await {
            warn!("Detection cycle failed: {:#}", e);
        }
        ControlFlow::Continue(())
    }

    #[instrument(skip(self))]
    async fn handle(self: &Arc<Self>, trigger: DetectionTrigger) -> Result<PanelView> {
        let ctx = self
            .tabs
            .active_tab()
            .await
            .context("Failed to query active tab")?
            .unwrap_or_else(SiteContext::blank);

        let ticket = {
            let mut state = self.state.lock().await;
            let transition = match trigger.override_mint() {
                Some(mint) => state.session.select(&ctx.origin, mint.clone()),
                None => {
                    // A manual reload retries the bound mint rather than re-reading the page.
                    let candidate = match state.session.bound_mint() {
                        Some(bound) if trigger == DetectionTrigger::ManualRefresh => Some(bound.clone()),
                        _ => self.detect(&ctx),
                    };
                    state.session.apply(&ctx.origin, candidate, trigger.is_forced())
                }
            };
            match transition {
                Transition::Unchanged => return Ok(state.view),
                Transition::Cleared { .. } => {
                    self.refresh.cancel();
                    state.record = None;
                    if state.view != PanelView::Empty {
                        state.view = PanelView::Empty;
                        self.presenter.show_empty();
                    }
                    return Ok(PanelView::Empty);
                }
                Transition::Bound { ticket, previous, .. } => {
                    self.refresh.cancel();
                    if previous.is_none() && self.config.auto_open_panel {
                        self.presenter.open_panel();
                    }
                    state.record = None;
                    state.view = PanelView::Loading;
                    self.presenter.show_loading(&ticket.mint);
                    ticket
                }
            }
        };

        self.remember_token(&ticket.mint).await;
        let result = self.fetcher.fetch(&ticket.mint, None).await;

        let mut state = self.state.lock().await;
        if !state.session.is_current(&ticket) {
            debug!("Discarding superseded result for {}", ticket.mint);
            return Ok(state.view);
        }

        match result {
            Ok(record) => {
                self.presenter.show_record(&record);
                state.record = Some(record);
                state.view = PanelView::Main;
                self.arm_refresh(ticket);
            }
            Err(e) => {
                warn!("Failed to load {}: {}", ticket.mint, e);
                state.view = PanelView::Error;
                self.presenter.show_error(LOAD_ERROR_MESSAGE);
            }
        }
        Ok(state.view)
    }

    fn detect(&self, ctx: &SiteContext) -> Option<TokenAddress> {
        let result = self.registry.resolve(ctx);
        debug!(
            "Detected {:?} via {:?} ({:?})",
            result.mint.as_ref().map(TokenAddress::as_str),
            result.source,
            result.confidence
        );
        result.mint
    }

    fn arm_refresh(self: &Arc<Self>, ticket: FetchTicket) {
        let weak = Arc::downgrade(self);
        let mint = ticket.mint.clone();
        self.refresh.arm(mint, move || {
            let weak = weak.clone();
            let ticket = ticket.clone();
            async move {
                match weak.upgrade() {
                    Some(inner) => inner.background_refresh(&ticket).await,
                    None => ControlFlow::Break(()),
                }
            }
        });
    }

    /// One refresh tick. Failures are logged and leave the panel untouched.
    #[instrument(skip_all, fields(mint = %ticket.mint))]
    async fn background_refresh(&self, ticket: &FetchTicket) -> ControlFlow<()> {
        let previous = {
            let state = self.state.lock().await;
            if !state.session.is_current(ticket) {
                return ControlFlow::Break(());
            }
            if state.view != PanelView::Main {
                return ControlFlow::Continue(());
            }
            state.record.clone()
        };

        match self.fetcher.fetch(&ticket.mint, previous.as_ref()).await {
            Ok(record) => {
                let mut state = self.state.lock().await;
                if !state.session.is_current(ticket) {
                    return ControlFlow::Break(());
                }
                if state.view == PanelView::Main {
                    self.presenter.patch_record(&record);
                    state.record = Some(record);
                }
            }
            Err(e) => warn!("Background refresh failed: {}", e),
        }
        ControlFlow::Continue(())
    }

    /// Best-effort; storage failures never affect the panel.
    async fn remember_token(&self, mint: &TokenAddress) {
        let value = json!({
            "mint": mint.as_str(),
            "lastUpdated": Utc::now().timestamp_millis(),
        });
        if let Err(e) = self.store.set(CURRENT_TOKEN_KEY, value).await {
            debug!("Failed to store current token: {:#}", e);
        }
    }
}
