//! Fakes shared by the controller tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;
use token_peek::metrics::TokenMetricsRecord;
use token_peek::{
    ApiError, InMemoryStore, MetricsApi, PanelController, PanelPresenter, PeekConfig, SiteContext,
    StaticTabObserver, TabObserver, TokenAddress,
};

pub const MINT_A: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";
pub const MINT_B: &str = "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263";

pub type Reply = Pin<Box<dyn Future<Output = Result<Value, ApiError>> + Send>>;
type Handler = Box<dyn Fn(&str) -> Reply + Send + Sync>;

/// `MetricsApi` answering through a swappable handler and recording every
/// call with its (tokio) instant.
pub struct FakeApi {
    handler: Mutex<Handler>,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl FakeApi {
    pub fn new(handler: impl Fn(&str) -> Reply + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            handler: Mutex::new(Box::new(handler)),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Core endpoint answers with `details`; every other endpoint is 404.
    pub fn serving(details: Value) -> Arc<Self> {
        Self::new(move |path| {
            let reply = if path.starts_with("token/") {
                Ok(details.clone())
            } else {
                Err(not_found(path))
            };
            Box::pin(async move { reply })
        })
    }

    pub fn set_handler(&self, handler: impl Fn(&str) -> Reply + Send + Sync + 'static) {
        *self.handler.lock().unwrap() = Box::new(handler);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Calls whose path starts with `prefix`, with their instants.
    pub fn calls_to(&self, prefix: &str) -> Vec<Instant> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(path, _)| path.starts_with(prefix))
            .map(|(_, at)| *at)
            .collect()
    }
}

#[async_trait]
impl MetricsApi for FakeApi {
    async fn get_json(&self, path: &str) -> Result<Value, ApiError> {
        self.calls.lock().unwrap().push((path.to_string(), Instant::now()));
        let reply = (self.handler.lock().unwrap())(path);
        reply.await
    }
}

pub fn not_found(path: &str) -> ApiError {
    ApiError::Status { status: 404, path: path.to_string() }
}

pub fn server_error(path: &str) -> ApiError {
    ApiError::Status { status: 500, path: path.to_string() }
}

pub fn bad_gateway(path: &str) -> ApiError {
    ApiError::Status { status: 502, path: path.to_string() }
}

pub fn details(name: &str, price: f64) -> Value {
    json!({
        "tokenDetails": {
            "name": name,
            "symbol": name.to_uppercase(),
            "priceUsd": price,
            "marketCap": 45600,
            "holders": 321
        }
    })
}

pub fn core_path(mint: &str) -> String {
    format!("token/{}/dev", mint)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shown {
    Opened,
    Loading(String),
    Empty,
    Error(String),
    Record(TokenMetricsRecord),
    Patch(TokenMetricsRecord),
}

/// Presenter recording every call in order.
#[derive(Default)]
pub struct RecordingPresenter {
    events: Mutex<Vec<Shown>>,
}

impl RecordingPresenter {
    pub fn events(&self) -> Vec<Shown> {
        self.events.lock().unwrap().clone()
    }

    pub fn records(&self) -> Vec<TokenMetricsRecord> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Shown::Record(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    pub fn patches(&self) -> Vec<TokenMetricsRecord> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Shown::Patch(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Shown) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }

    fn push(&self, event: Shown) {
        self.events.lock().unwrap().push(event);
    }
}

impl PanelPresenter for RecordingPresenter {
    fn open_panel(&self) {
        self.push(Shown::Opened);
    }

    fn show_loading(&self, mint: &TokenAddress) {
        self.push(Shown::Loading(mint.to_string()));
    }

    fn show_empty(&self) {
        self.push(Shown::Empty);
    }

    fn show_error(&self, message: &str) {
        self.push(Shown::Error(message.to_string()));
    }

    fn show_record(&self, record: &TokenMetricsRecord) {
        self.push(Shown::Record(record.clone()));
    }

    fn patch_record(&self, record: &TokenMetricsRecord) {
        self.push(Shown::Patch(record.clone()));
    }
}

/// Tab observer counting how many detection cycles queried it.
#[derive(Default)]
pub struct CountingTabs {
    pub tabs: StaticTabObserver,
    queries: AtomicUsize,
}

impl CountingTabs {
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TabObserver for CountingTabs {
    async fn active_tab(&self) -> anyhow::Result<Option<SiteContext>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.tabs.active_tab().await
    }
}

pub struct Harness {
    pub controller: PanelController,
    pub api: Arc<FakeApi>,
    pub tabs: Arc<CountingTabs>,
    pub presenter: Arc<RecordingPresenter>,
    pub store: Arc<InMemoryStore>,
}

impl Harness {
    pub fn new(api: Arc<FakeApi>) -> Self {
        Self::with_config(api, PeekConfig::default())
    }

    pub fn with_config(api: Arc<FakeApi>, config: PeekConfig) -> Self {
        let tabs = Arc::new(CountingTabs::default());
        let presenter = Arc::new(RecordingPresenter::default());
        let store = Arc::new(InMemoryStore::new());
        let controller = PanelController::new(
            config,
            api.clone(),
            tabs.clone(),
            presenter.clone(),
            store.clone(),
        );
        Self { controller, api, tabs, presenter, store }
    }

    pub fn navigate(&self, url: &str) {
        self.tabs.tabs.set_url(url, None);
    }
}

pub fn pump_url(mint: &str) -> String {
    format!("https://pump.fun/coin/{}", mint)
}
