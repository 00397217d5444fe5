#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crypto_dashboard::{
    AppConfig, DashboardError, DashboardService, HistoricalPoint, ManualClock, MarketDataSource,
    PriceSnapshot, Result, SearchProvider, TextGenerator,
};

pub const START: u64 = 1_700_000_100;

pub fn snapshot(symbol: &str, price: f64, high: f64, low: f64) -> PriceSnapshot {
    PriceSnapshot {
        symbol: symbol.to_string(),
        currency: "USD".to_string(),
        price,
        high_24h: high,
        low_24h: low,
    }
}

pub fn point(timestamp: i64, close: f64) -> HistoricalPoint {
    HistoricalPoint {
        timestamp,
        open: close,
        high: close,
        low: close,
        close,
        volume_from: 0.0,
        volume_to: 0.0,
    }
}

#[derive(Default)]
pub struct FakeMarket {
    pub prices: Mutex<HashMap<String, PriceSnapshot>>,
    pub history: Mutex<Vec<HistoricalPoint>>,
    pub price_calls: AtomicUsize,
    pub history_calls: AtomicUsize,
}

impl FakeMarket {
    pub fn with_prices(snapshots: Vec<PriceSnapshot>) -> Self {
        let market = FakeMarket::default();
        *market.prices.lock().unwrap() = snapshots
            .into_iter()
            .map(|s| (s.symbol.clone(), s))
            .collect();
        market
    }

    pub fn price_calls(&self) -> usize {
        self.price_calls.load(Ordering::SeqCst)
    }

    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataSource for FakeMarket {
    async fn latest_prices(&self, symbols: &[String], _currency: &str) -> HashMap<String, PriceSnapshot> {
        self.price_calls.fetch_add(1, Ordering::SeqCst);
        let prices = self.prices.lock().unwrap();
        symbols
            .iter()
            .filter_map(|s| prices.get(s).map(|p| (s.clone(), p.clone())))
            .collect()
    }

    async fn historical_daily(&self, _symbol: &str, _currency: &str, _days: u32) -> Vec<HistoricalPoint> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        self.history.lock().unwrap().clone()
    }
}

pub struct FakeSearch {
    pub text: Option<String>,
    pub calls: AtomicUsize,
}

impl FakeSearch {
    pub fn returning(text: &str) -> Self {
        FakeSearch {
            text: Some(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        FakeSearch {
            text: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchProvider for FakeSearch {
    async fn search(&self, _query: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.text
            .clone()
            .ok_or_else(|| DashboardError::ApiError("search offline".to_string()))
    }
}

/// Сначала отдаёт заготовленные ответы, затем отвечает по содержимому промпта.
pub struct FakeGenerator {
    pub script: Mutex<VecDeque<Result<String>>>,
    pub analysis_reply: Option<String>,
    pub sentiment_reply: Option<String>,
    pub calls: AtomicUsize,
}

impl FakeGenerator {
    pub fn new(analysis_reply: Option<&str>, sentiment_reply: Option<&str>) -> Self {
        FakeGenerator {
            script: Mutex::new(VecDeque::new()),
            analysis_reply: analysis_reply.map(str::to_string),
            sentiment_reply: sentiment_reply.map(str::to_string),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn scripted(script: Vec<Result<String>>) -> Self {
        let generator = FakeGenerator::new(None, None);
        *generator.script.lock().unwrap() = script.into_iter().collect();
        generator
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(next) = self.script.lock().unwrap().pop_front() {
            return next;
        }

        let reply = if prompt.starts_with("Classify the sentiment") {
            self.sentiment_reply.clone()
        } else {
            self.analysis_reply.clone()
        };
        reply.ok_or_else(|| DashboardError::GenerationFailed("model offline".to_string()))
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        cache_capacity: 16,
        ..AppConfig::default()
    }
}

pub struct Harness {
    pub market: Arc<FakeMarket>,
    pub search: Arc<FakeSearch>,
    pub generator: Arc<FakeGenerator>,
    pub clock: ManualClock,
    pub dashboard: DashboardService,
}

pub fn harness(market: FakeMarket, search: FakeSearch, generator: FakeGenerator) -> Harness {
    harness_with_config(market, search, generator, &test_config())
}

pub fn harness_with_config(
    market: FakeMarket,
    search: FakeSearch,
    generator: FakeGenerator,
    config: &AppConfig,
) -> Harness {
    let market = Arc::new(market);
    let search = Arc::new(search);
    let generator = Arc::new(generator);
    let clock = ManualClock::new(START);

    let dashboard = DashboardService::new(
        market.clone(),
        search.clone(),
        generator.clone(),
        Arc::new(clock.clone()),
        config,
    )
    .unwrap();

    Harness {
        market,
        search,
        generator,
        clock,
        dashboard,
    }
}
