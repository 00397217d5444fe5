pub mod config;
pub mod errors;
pub mod holders;
pub mod models;
pub mod routers;
pub mod services;
pub mod views;

pub use config::AppConfig;
pub use errors::{DashboardError, Result};
pub use holders::{BucketedCache, Clock, ManualClock, SystemClock};
pub use models::{
    AnalysisResult, ChartData, DashboardView, HistoricalPoint, NewsCategory, NewsItem,
    PriceSnapshot, SentimentLabel,
};
pub use services::{
    AnalysisClient, AnalysisMode, DashboardService, MarketDataSource, MemoizedMarketData,
    RetryPolicy, SearchProvider, TextGenerator,
};
pub use config::load_config;

#[derive(Clone)]
pub struct AppState {
    pub dashboard: DashboardService,
}
