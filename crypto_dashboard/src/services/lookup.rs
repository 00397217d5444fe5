use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::holders::{BucketedCache, Clock};
use crate::models::{HistoricalPoint, PriceSnapshot};
use crate::services::market_data::MarketDataSource;

/// Обёртка над источником рыночных данных с кэшем по 5-минутным окнам.
///
/// Пустые результаты (сбой upstream) не запоминаются.
#[derive(Clone)]
pub struct MemoizedMarketData {
    source: Arc<dyn MarketDataSource>,
    clock: Arc<dyn Clock>,
    prices: BucketedCache<HashMap<String, PriceSnapshot>>,
    history: BucketedCache<Vec<HistoricalPoint>>,
}

impl MemoizedMarketData {
    pub fn new(source: Arc<dyn MarketDataSource>, clock: Arc<dyn Clock>, capacity: usize) -> Self {
        MemoizedMarketData {
            source,
            clock,
            prices: BucketedCache::new(capacity),
            history: BucketedCache::new(capacity),
        }
    }

    fn prices_key(symbols: &[String], currency: &str) -> String {
        let mut symbols: Vec<String> = symbols.iter().map(|s| s.to_uppercase()).collect();
        symbols.sort();
        symbols.dedup();
        format!("{}:{}", symbols.join(","), currency.to_uppercase())
    }

    fn history_key(symbol: &str, currency: &str, days: u32) -> String {
        format!("{}:{}:{}", symbol.to_uppercase(), currency.to_uppercase(), days)
    }
}

#[async_trait]
impl MarketDataSource for MemoizedMarketData {
    async fn latest_prices(&self, symbols: &[String], currency: &str) -> HashMap<String, PriceSnapshot> {
        let key = Self::prices_key(symbols, currency);
        let bucket = self.clock.bucket();

        if let Some(cached) = self.prices.get(&key, bucket).await {
            tracing::debug!("Цены {} взяты из кэша (окно {})", key, bucket);
            return cached;
        }

        let prices = self.source.latest_prices(symbols, currency).await;
        if !prices.is_empty() {
            self.prices.insert(&key, bucket, prices.clone()).await;
        }
        prices
    }

    async fn historical_daily(&self, symbol: &str, currency: &str, days: u32) -> Vec<HistoricalPoint> {
        let key = Self::history_key(symbol, currency, days);
        let bucket = self.clock.bucket();

        if let Some(cached) = self.history.get(&key, bucket).await {
            tracing::debug!("История {} взята из кэша (окно {})", key, bucket);
            return cached;
        }

        let points = self.source.historical_daily(symbol, currency, days).await;
        if !points.is_empty() {
            self.history.insert(&key, bucket, points.clone()).await;
        }
        points
    }
}
