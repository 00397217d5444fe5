pub mod alerts;
pub mod analysis;
pub mod dashboard;
pub mod lookup;
pub mod market_data;
pub mod news;
pub mod portfolio;

pub use alerts::{AlertEvaluator, PlaceholderAlerts};
pub use analysis::{AnalysisClient, AnalysisMode, GeminiClient, RetryPolicy, TextGenerator};
pub use dashboard::{DashboardService, MonitorReport};
pub use lookup::MemoizedMarketData;
pub use market_data::{MarketDataClient, MarketDataSource};
pub use news::{NewsClient, SearchProvider, SerperClient};
pub use portfolio::{PlaceholderPortfolio, PortfolioTracker};
