use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub symbol: String,
    pub currency: String,
    pub price: f64,
    pub high_24h: f64,
    pub low_24h: f64,
}

/// Дневная свеча. Внутри приложения всегда упорядочены по возрастанию `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPoint {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume_from: f64,
    pub volume_to: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub snippet: String,
    pub source: String,
    pub recency: String,
    pub sentiment: SentimentLabel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NewsCategory {
    #[default]
    Market,
    Regulation,
    Technology,
    Adoption,
}

impl NewsCategory {
    pub const ALL: [NewsCategory; 4] = [
        NewsCategory::Market,
        NewsCategory::Regulation,
        NewsCategory::Technology,
        NewsCategory::Adoption,
    ];

    /// Неизвестные значения сводятся к `Market`.
    pub fn from_param(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "regulation" => NewsCategory::Regulation,
            "technology" => NewsCategory::Technology,
            "adoption" => NewsCategory::Adoption,
            _ => NewsCategory::Market,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NewsCategory::Market => "market",
            NewsCategory::Regulation => "regulation",
            NewsCategory::Technology => "technology",
            NewsCategory::Adoption => "adoption",
        }
    }

    pub fn search_query(&self, symbol: &str) -> String {
        match self {
            NewsCategory::Market => format!(
                "{} cryptocurrency market news latest developments past 24 hours",
                symbol
            ),
            NewsCategory::Regulation => format!("{} crypto regulation news this week", symbol),
            NewsCategory::Technology => {
                format!("{} blockchain technology upgrade development news", symbol)
            }
            NewsCategory::Adoption => {
                format!("{} institutional adoption ETF investment news", symbol)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AnalysisResult {
    Narrative {
        analysis: String,
        sentiment_news: String,
        recommendations: String,
    },
    Structured {
        market_observations: Vec<String>,
        outlook: Vec<String>,
        support: f64,
        resistance: f64,
        fallback: bool,
    },
}

impl AnalysisResult {
    pub fn is_fallback(&self) -> bool {
        matches!(self, AnalysisResult::Structured { fallback: true, .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDataset {
    pub label: String,
    pub data: Vec<f64>,
    pub border_color: String,
    pub background_color: String,
    pub border_width: u32,
    pub tension: f64,
    pub fill: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAlert {
    pub symbol: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub symbol: String,
    pub quantity: f64,
    pub price: f64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub holdings: BTreeMap<String, f64>,
    pub performance: String,
}

/// Строка таблицы цен на главной странице; отсутствующие данные отображаются нулями.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRow {
    pub symbol: String,
    pub price: f64,
    pub high_24h: f64,
    pub low_24h: f64,
    pub available: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub coin: String,
    pub category: NewsCategory,
    pub currency: String,
    pub current_time: String,
    pub prices: Vec<PriceRow>,
    pub analysis: AnalysisResult,
    pub news: Vec<NewsItem>,
    pub chart_url: String,
    pub alerts: Vec<PriceAlert>,
    pub portfolio: PortfolioSummary,
}
