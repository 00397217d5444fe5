use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::errors::{DashboardError, Result};
use crate::models::{AnalysisResult, PriceSnapshot, SentimentLabel};

const NEWS_MARKER: &str = "News and Sentiment:";
const RECOMMENDATIONS_MARKER: &str = "Investment Recommendations:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    Narrative,
    #[default]
    Structured,
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisMode::Narrative => f.write_str("narrative"),
            AnalysisMode::Structured => f.write_str("structured"),
        }
    }
}

/// Генерация текста по готовому промпту.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl GeminiClient {
    pub fn new(client: Client, config: &AppConfig) -> Self {
        GeminiClient {
            client,
            api_url: config.gemini_api_url.trim_end_matches('/').to_string(),
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_model.clone(),
            temperature: config.gemini_temperature,
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.api_url, self.model);
        let payload = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": self.temperature }
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(DashboardError::RateLimited(format!("Gemini {}", self.model)));
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Неизвестная ошибка".to_string());
            return Err(DashboardError::ApiError(format!(
                "Gemini API error: {} - {}",
                status, error_text
            )));
        }

        let json: Value = response.json().await?;
        extract_gemini_text(&json)
    }
}

pub fn extract_gemini_text(json: &Value) -> Result<String> {
    let parts = json["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| {
            DashboardError::GenerationFailed("Ответ Gemini не содержит candidates".to_string())
        })?;

    let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
    if text.trim().is_empty() {
        return Err(DashboardError::GenerationFailed("Пустой ответ модели".to_string()));
    }
    Ok(text)
}

/// Линейная задержка: после n-й неудачной попытки ждём n × base_delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        RetryPolicy {
            max_attempts: config.max_llm_attempts.max(1),
            base_delay: Duration::from_secs(config.retry_base_delay_secs),
        }
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

#[derive(Clone)]
pub struct AnalysisClient {
    generator: Arc<dyn TextGenerator>,
    retry: RetryPolicy,
    mode: AnalysisMode,
}

impl AnalysisClient {
    pub fn new(generator: Arc<dyn TextGenerator>, retry: RetryPolicy, mode: AnalysisMode) -> Self {
        AnalysisClient {
            generator,
            retry,
            mode,
        }
    }

    pub fn mode(&self) -> AnalysisMode {
        self.mode
    }

    /// Повторяет запрос только при ошибке с "429"; любая другая ошибка возвращается сразу.
    pub async fn generate_with_retry(&self, prompt: &str) -> Result<String> {
        let mut attempt = 1;
        loop {
            match self.generator.generate(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_rate_limited() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for_attempt(attempt);
                    tracing::warn!(
                        "Лимит запросов к модели, попытка {}/{}, ждём {:?}",
                        attempt,
                        self.retry.max_attempts,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Ошибка генерации возвращается вызывающему; ошибка разбора уже заменена резервной записью.
    pub async fn try_analyze(
        &self,
        symbol: &str,
        snapshot: &PriceSnapshot,
        news_context: &str,
    ) -> Result<AnalysisResult> {
        tracing::info!("Анализ {} ({} режим)", symbol, self.mode);

        match self.mode {
            AnalysisMode::Narrative => {
                let prompt = build_narrative_prompt(symbol, snapshot, news_context);
                let text = self.generate_with_retry(&prompt).await?;
                Ok(parse_narrative(&text))
            }
            AnalysisMode::Structured => {
                let prompt = build_structured_prompt(symbol, snapshot, news_context);
                let text = self.generate_with_retry(&prompt).await?;
                Ok(parse_structured(&text, snapshot))
            }
        }
    }

    /// Никогда не завершается ошибкой: при сбое возвращается резервный результат.
    pub async fn analyze(&self, symbol: &str, snapshot: &PriceSnapshot, news_context: &str) -> AnalysisResult {
        match self.try_analyze(symbol, snapshot, news_context).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Ошибка анализа {}: {}", symbol, e);
                self.fallback_for(symbol, snapshot)
            }
        }
    }

    pub fn fallback_for(&self, symbol: &str, snapshot: &PriceSnapshot) -> AnalysisResult {
        match self.mode {
            AnalysisMode::Narrative => unavailable_narrative(symbol),
            AnalysisMode::Structured => fallback_analysis(snapshot),
        }
    }

    pub async fn classify_sentiment(&self, headline: &str) -> SentimentLabel {
        if headline.trim().is_empty() {
            return SentimentLabel::Neutral;
        }

        let prompt = build_sentiment_prompt(headline);
        match self.generate_with_retry(&prompt).await {
            Ok(reply) => parse_sentiment_label(&reply),
            Err(e) => {
                tracing::debug!("Классификация настроения не удалась: {}", e);
                SentimentLabel::Neutral
            }
        }
    }
}

pub fn build_narrative_prompt(symbol: &str, snapshot: &PriceSnapshot, news_context: &str) -> String {
    format!(
        "You are a cryptocurrency analyst providing concise insights and investment guidance on current crypto prices, incorporating sentiment from recent news.

Current Price of {symbol}: {price} {currency} (24h high: {high}, 24h low: {low}).

Recent news about {symbol}:
{news}

Based on the current price and recent news sentiment:

1. Provide a brief, insightful analysis focusing on potential short-term trends or observations. Mention the sentiment if it is significantly positive or negative.
2. Recommend a potential investment amount in {currency} for a hypothetical investor with a moderate risk tolerance.
3. Suggest a stop-loss percentage to mitigate potential downside risk.
4. Indicate a suitable investment timeframe (short-term, medium-term, long-term).
5. Briefly describe the best investment plan or strategy.

Format your response as a short paragraph for the analysis, then \"{news_marker}\" followed by a summary of the news, then \"{rec_marker}\" followed by the recommendations (amount, stop-loss, timeframe, plan) as bullet points.",
        symbol = symbol,
        price = snapshot.price,
        currency = snapshot.currency,
        high = snapshot.high_24h,
        low = snapshot.low_24h,
        news = news_or_placeholder(news_context),
        news_marker = NEWS_MARKER,
        rec_marker = RECOMMENDATIONS_MARKER,
    )
}

pub fn build_structured_prompt(symbol: &str, snapshot: &PriceSnapshot, news_context: &str) -> String {
    format!(
        "You are a cryptocurrency analyst. Analyse {symbol}.

Current price: {price} {currency}. 24h high: {high}. 24h low: {low}.

Recent news about {symbol}:
{news}

Respond ONLY with a JSON object of this exact shape and no other text:
{{\"market_observations\": [\"short point\", ...], \"outlook\": [\"short point\", ...], \"support\": <number>, \"resistance\": <number>}}
Use at most four points per list. support and resistance are price levels in {currency}.",
        symbol = symbol,
        price = snapshot.price,
        currency = snapshot.currency,
        high = snapshot.high_24h,
        low = snapshot.low_24h,
        news = news_or_placeholder(news_context),
    )
}

pub fn build_sentiment_prompt(headline: &str) -> String {
    format!(
        "Classify the sentiment of this cryptocurrency news headline. Answer with exactly one word: positive, negative, or neutral.\n\nHeadline: {}",
        headline.trim()
    )
}

fn news_or_placeholder(news_context: &str) -> &str {
    if news_context.trim().is_empty() {
        "No recent news available."
    } else {
        news_context
    }
}

/// Разбор свободного текста по маркерам "News and Sentiment:" и "Investment Recommendations:".
pub fn parse_narrative(text: &str) -> AnalysisResult {
    let (analysis, sentiment_news, recommendations) = match text.split_once(NEWS_MARKER) {
        Some((analysis, rest)) => match rest.split_once(RECOMMENDATIONS_MARKER) {
            Some((news, recommendations)) => (analysis, news, recommendations),
            None => (analysis, rest, ""),
        },
        None => (text, "", ""),
    };

    AnalysisResult::Narrative {
        analysis: analysis.trim().to_string(),
        sentiment_news: sentiment_news.trim().to_string(),
        recommendations: recommendations.trim().to_string(),
    }
}

#[derive(Deserialize)]
struct StructuredReply {
    #[serde(alias = "market_analysis", alias = "observations")]
    market_observations: Vec<String>,
    #[serde(alias = "short_term_outlook")]
    outlook: Vec<String>,
    support: f64,
    resistance: f64,
}

/// JSON ищется между первой `{` и последней `}`; при любой ошибке возвращается резервная запись.
pub fn parse_structured(text: &str, snapshot: &PriceSnapshot) -> AnalysisResult {
    let body = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => {
            tracing::warn!("Ответ модели не содержит JSON объекта");
            return fallback_analysis(snapshot);
        }
    };

    match serde_json::from_str::<StructuredReply>(body) {
        Ok(reply) => AnalysisResult::Structured {
            market_observations: reply.market_observations,
            outlook: reply.outlook,
            support: reply.support,
            resistance: reply.resistance,
            fallback: false,
        },
        Err(e) => {
            tracing::warn!("Не удалось разобрать JSON анализа: {}", e);
            fallback_analysis(snapshot)
        }
    }
}

pub fn fallback_analysis(snapshot: &PriceSnapshot) -> AnalysisResult {
    AnalysisResult::Structured {
        market_observations: vec![
            format!("Current price: {:.2} {}", snapshot.price, snapshot.currency),
            format!(
                "24h range: {:.2} - {:.2} {}",
                snapshot.low_24h, snapshot.high_24h, snapshot.currency
            ),
        ],
        outlook: vec![
            "Automated analysis is temporarily unavailable; levels reflect the 24h range.".to_string(),
        ],
        support: snapshot.low_24h,
        resistance: snapshot.high_24h,
        fallback: true,
    }
}

fn unavailable_narrative(symbol: &str) -> AnalysisResult {
    AnalysisResult::Narrative {
        analysis: format!("Analysis for {} is temporarily unavailable.", symbol),
        sentiment_news: String::new(),
        recommendations: String::new(),
    }
}

pub fn parse_sentiment_label(reply: &str) -> SentimentLabel {
    let reply = reply.trim().to_lowercase();
    let word = reply
        .split(|c: char| !c.is_alphabetic())
        .find(|w| !w.is_empty())
        .unwrap_or("");

    match word {
        "positive" => SentimentLabel::Positive,
        "negative" => SentimentLabel::Negative,
        _ => SentimentLabel::Neutral,
    }
}
