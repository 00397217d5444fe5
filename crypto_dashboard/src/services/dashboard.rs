use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use reqwest::ClientBuilder;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::errors::{DashboardError, Result};
use crate::holders::{BucketedCache, Clock, SystemClock};
use crate::models::{
    AnalysisResult, ChartData, ChartDataset, DashboardView, HistoricalPoint, NewsCategory,
    NewsItem, PortfolioSummary, PriceAlert, PriceRow, PriceSnapshot,
};
use crate::services::alerts::{AlertEvaluator, PlaceholderAlerts};
use crate::services::analysis::{AnalysisClient, GeminiClient, RetryPolicy, TextGenerator};
use crate::services::lookup::MemoizedMarketData;
use crate::services::market_data::{MarketDataClient, MarketDataSource};
use crate::services::news::{NewsClient, SearchProvider, SerperClient};
use crate::services::portfolio::{PlaceholderPortfolio, PortfolioTracker};

pub const DEFAULT_COIN: &str = "BTC";

#[derive(Debug, Clone)]
pub struct MonitorReport {
    pub prices: HashMap<String, PriceSnapshot>,
    pub analyses: Vec<(String, AnalysisResult)>,
    pub alerts: Vec<PriceAlert>,
    pub portfolio: PortfolioSummary,
}

/// Собирает данные для страниц: котировки, новости, анализ и график.
#[derive(Clone)]
pub struct DashboardService {
    market: MemoizedMarketData,
    news: NewsClient,
    analysis: AnalysisClient,
    alerts: Arc<dyn AlertEvaluator>,
    portfolio: Arc<dyn PortfolioTracker>,
    clock: Arc<dyn Clock>,
    analysis_cache: BucketedCache<AnalysisResult>,
    news_cache: BucketedCache<Vec<NewsItem>>,
    symbols: Vec<String>,
    currency: String,
    history_days: u32,
    max_concurrent: usize,
}

impl DashboardService {
    pub fn new(
        market: Arc<dyn MarketDataSource>,
        search: Arc<dyn SearchProvider>,
        generator: Arc<dyn TextGenerator>,
        clock: Arc<dyn Clock>,
        config: &AppConfig,
    ) -> Result<Self> {
        Ok(DashboardService {
            market: MemoizedMarketData::new(market, clock.clone(), config.cache_capacity),
            news: NewsClient::new(search)?,
            analysis: AnalysisClient::new(
                generator,
                RetryPolicy::from_config(config),
                config.analysis_mode,
            ),
            alerts: Arc::new(PlaceholderAlerts),
            portfolio: Arc::new(PlaceholderPortfolio),
            clock,
            analysis_cache: BucketedCache::new(config.cache_capacity),
            news_cache: BucketedCache::new(config.cache_capacity),
            symbols: config.symbols.clone(),
            currency: config.currency.to_uppercase(),
            history_days: config.history_days,
            max_concurrent: config.max_concurrent_requests.max(1),
        })
    }

    /// Реальные клиенты CryptoCompare, Serper и Gemini с общим HTTP клиентом.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;

        Self::new(
            Arc::new(MarketDataClient::new(client.clone(), config)),
            Arc::new(SerperClient::new(client.clone(), config)),
            Arc::new(GeminiClient::new(client, config)),
            Arc::new(SystemClock),
            config,
        )
    }

    pub fn with_alerts(mut self, alerts: Arc<dyn AlertEvaluator>) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn with_portfolio(mut self, portfolio: Arc<dyn PortfolioTracker>) -> Self {
        self.portfolio = portfolio;
        self
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn analysis_mode(&self) -> crate::services::analysis::AnalysisMode {
        self.analysis.mode()
    }

    pub async fn latest_prices(&self, extra: Option<&str>) -> HashMap<String, PriceSnapshot> {
        let mut symbols = self.symbols.clone();
        if let Some(extra) = extra {
            if !symbols.iter().any(|s| s == extra) {
                symbols.push(extra.to_string());
            }
        }
        self.market.latest_prices(&symbols, &self.currency).await
    }

    /// История по возрастанию времени, независимо от порядка источника.
    pub async fn history(&self, symbol: &str) -> Vec<HistoricalPoint> {
        let mut points = self
            .market
            .historical_daily(symbol, &self.currency, self.history_days)
            .await;
        points.sort_by_key(|p| p.timestamp);
        points
    }

    /// Новости с оценкой настроения; непустой результат кэшируется на текущее окно.
    pub async fn news_for(&self, symbol: &str, category: NewsCategory) -> Vec<NewsItem> {
        let key = format!("{}:{}", symbol, category.as_str());
        let bucket = self.clock.bucket();

        if let Some(cached) = self.news_cache.get(&key, bucket).await {
            return cached;
        }

        let items = self.news.fetch_news(symbol, category).await;
        let analysis = &self.analysis;
        let items: Vec<NewsItem> = stream::iter(items)
            .map(|mut item| async move {
                item.sentiment = analysis.classify_sentiment(&item.title).await;
                item
            })
            .buffered(self.max_concurrent)
            .collect()
            .await;

        if !items.is_empty() {
            self.news_cache.insert(&key, bucket, items.clone()).await;
        }
        items
    }

    /// Анализ кэшируется только при успешной генерации.
    pub async fn analysis_for(
        &self,
        symbol: &str,
        snapshot: &PriceSnapshot,
        news: &[NewsItem],
    ) -> AnalysisResult {
        let bucket = self.clock.bucket();

        if let Some(cached) = self.analysis_cache.get(symbol, bucket).await {
            return cached;
        }

        match self.analysis.try_analyze(symbol, snapshot, &news_context(news)).await {
            Ok(result) => {
                if !result.is_fallback() {
                    self.analysis_cache.insert(symbol, bucket, result.clone()).await;
                }
                result
            }
            Err(e) => {
                tracing::error!("Ошибка анализа {}: {}", symbol, e);
                self.analysis.fallback_for(symbol, snapshot)
            }
        }
    }

    pub async fn build_view(&self, coin: Option<&str>, category: Option<&str>) -> DashboardView {
        let coin = normalize_coin(coin);
        let category = category.map(NewsCategory::from_param).unwrap_or_default();

        tracing::info!("Формирование страницы для {} ({})", coin, category.as_str());

        let prices = self.latest_prices(Some(&coin)).await;
        if prices.is_empty() {
            tracing::warn!("Котировки недоступны, показываем заглушки");
        }

        let mut rows: Vec<PriceRow> = self
            .symbols
            .iter()
            .map(|symbol| price_row(symbol, prices.get(symbol)))
            .collect();
        if !self.symbols.contains(&coin) {
            rows.push(price_row(&coin, prices.get(&coin)));
        }

        let news = self.news_for(&coin, category).await;

        let analysis = match prices.get(&coin) {
            Some(snapshot) => self.analysis_for(&coin, snapshot, &news).await,
            None => price_unavailable(&coin),
        };

        let alerts = self.alerts.check_price_alerts(&prices);
        let portfolio = self.portfolio.track_portfolio(&[]);

        DashboardView {
            chart_url: format!("/chart-data/{}", urlencoding::encode(&coin)),
            coin,
            category,
            currency: self.currency.clone(),
            current_time: Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            prices: rows,
            analysis,
            news,
            alerts,
            portfolio,
        }
    }

    pub async fn chart_data(&self, symbol: &str) -> Result<ChartData> {
        let symbol = normalize_coin(Some(symbol));
        let history = self.history(&symbol).await;
        if history.is_empty() {
            return Err(DashboardError::HistoricalDataUnavailable(symbol));
        }
        Ok(build_chart(&symbol, &self.currency, &history))
    }

    /// Один проход цикла мониторинга; `None`, если котировки получить не удалось.
    pub async fn monitor_cycle(&self) -> Option<MonitorReport> {
        let prices = self.latest_prices(None).await;
        if prices.is_empty() {
            return None;
        }

        let mut analyses = Vec::new();
        for symbol in &self.symbols {
            match prices.get(symbol) {
                Some(snapshot) => {
                    let result = self.analysis_for(symbol, snapshot, &[]).await;
                    analyses.push((symbol.clone(), result));
                }
                None => tracing::warn!("Нет котировки {} в {}", symbol, self.currency),
            }
        }

        let alerts = self.alerts.check_price_alerts(&prices);
        let portfolio = self.portfolio.track_portfolio(&[]);

        Some(MonitorReport {
            prices,
            analyses,
            alerts,
            portfolio,
        })
    }
}

fn normalize_coin(coin: Option<&str>) -> String {
    match coin.map(str::trim) {
        Some(c) if !c.is_empty() => c.to_uppercase(),
        _ => DEFAULT_COIN.to_string(),
    }
}

fn price_row(symbol: &str, snapshot: Option<&PriceSnapshot>) -> PriceRow {
    match snapshot {
        Some(s) => PriceRow {
            symbol: symbol.to_string(),
            price: s.price,
            high_24h: s.high_24h,
            low_24h: s.low_24h,
            available: true,
        },
        None => PriceRow {
            symbol: symbol.to_string(),
            price: 0.0,
            high_24h: 0.0,
            low_24h: 0.0,
            available: false,
        },
    }
}

fn price_unavailable(coin: &str) -> AnalysisResult {
    AnalysisResult::Narrative {
        analysis: format!("Price data for {} is currently unavailable.", coin),
        sentiment_news: String::new(),
        recommendations: String::new(),
    }
}

pub fn news_context(news: &[NewsItem]) -> String {
    news.iter()
        .map(|item| {
            if item.snippet.is_empty() {
                format!("- {} ({})", item.title, item.source)
            } else {
                format!("- {}: {} ({})", item.title, item.snippet, item.source)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Точки ожидаются по возрастанию времени; метки в формате YYYY-MM-DD (UTC).
pub fn build_chart(symbol: &str, currency: &str, history: &[HistoricalPoint]) -> ChartData {
    let labels = history
        .iter()
        .map(|p| {
            DateTime::<Utc>::from_timestamp(p.timestamp, 0)
                .map(|dt| dt.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| p.timestamp.to_string())
        })
        .collect();
    let data = history.iter().map(|p| p.close).collect();

    ChartData {
        labels,
        datasets: vec![ChartDataset {
            label: format!("{} Price ({})", symbol, currency),
            data,
            border_color: "rgba(54, 162, 235, 1)".to_string(),
            background_color: "rgba(54, 162, 235, 0.1)".to_string(),
            border_width: 2,
            tension: 0.4,
            fill: "origin".to_string(),
        }],
    }
}
