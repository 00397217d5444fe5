use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::errors::{DashboardError, Result};
use crate::models::{NewsCategory, NewsItem, SentimentLabel};

pub const MAX_NEWS_ITEMS: usize = 6;
const DEFAULT_SOURCE: &str = "Crypto News";
const DEFAULT_RECENCY: &str = "Recent";

/// Поисковый провайдер, возвращающий результаты в виде текста: одна строка на результат.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<String>;
}

#[derive(Clone)]
pub struct SerperClient {
    client: Client,
    api_url: String,
    api_key: String,
}

impl SerperClient {
    pub fn new(client: Client, config: &AppConfig) -> Self {
        SerperClient {
            client,
            api_url: config.serper_api_url.clone(),
            api_key: config.serper_api_key.clone(),
        }
    }
}

#[async_trait]
impl SearchProvider for SerperClient {
    async fn search(&self, query: &str) -> Result<String> {
        tracing::debug!("Serper запрос: {}", query);

        let response = self
            .client
            .post(&self.api_url)
            .header("X-API-KEY", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&json!({ "q": query }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Неизвестная ошибка".to_string());
            return Err(DashboardError::ApiError(format!(
                "Serper API error: {} - {}",
                status, error_text
            )));
        }

        let json: Value = response.json().await?;
        flatten_serper_results(&json)
    }
}

/// Превращает JSON ответ Serper в строки вида `title - snippet | source`.
pub fn flatten_serper_results(json: &Value) -> Result<String> {
    let results = json["news"]
        .as_array()
        .or_else(|| json["organic"].as_array())
        .ok_or_else(|| {
            DashboardError::InvalidDataFormat("Отсутствуют поля news/organic".to_string())
        })?;

    let lines: Vec<String> = results
        .iter()
        .filter_map(|item| {
            let title = item["title"].as_str()?.trim();
            let snippet = item["snippet"].as_str().unwrap_or("").trim();
            let mut line = format!("{} - {}", title, snippet);
            if let Some(source) = item["source"].as_str() {
                line.push_str(" | ");
                line.push_str(source.trim());
            }
            Some(line.replace('\n', " "))
        })
        .collect();

    Ok(lines.join("\n"))
}

/// Регулярные выражения компилируются один раз и переиспользуются для всех ответов поиска.
pub struct TextCleaner {
    html: Regex,
    whitespace: Regex,
}

impl TextCleaner {
    pub fn new() -> Result<Self> {
        Ok(TextCleaner {
            html: Regex::new(r"<[^>]+>")?,
            whitespace: Regex::new(r"\s+")?,
        })
    }

    pub fn clean(&self, text: &str) -> String {
        let cleaned = self.html.replace_all(text, " ");
        let cleaned = self.whitespace.replace_all(&cleaned, " ");
        cleaned.trim().to_string()
    }
}

/// Разбирает текстовый ответ поиска: не более шести новостей, пустые и битые строки пропускаются.
pub fn parse_search_results(cleaner: &TextCleaner, text: &str) -> Vec<NewsItem> {
    let mut items = Vec::new();

    for line in text.lines() {
        if items.len() >= MAX_NEWS_ITEMS {
            break;
        }

        if line.trim().is_empty() {
            continue;
        }

        // Разделитель ищется в исходной строке: " - " в начале означает пустой заголовок
        let (title, rest) = match line.split_once(" - ") {
            Some((title, rest)) => (title, rest),
            None => (line, ""),
        };

        let parts: Vec<&str> = rest.split(" | ").collect();
        let snippet = parts.first().copied().unwrap_or("");
        let source = if parts.len() > 1 {
            parts.last().copied().unwrap_or(DEFAULT_SOURCE)
        } else {
            DEFAULT_SOURCE
        };

        let title = cleaner.clean(title);
        if title.is_empty() {
            tracing::debug!("Пропущена некорректная строка поиска: {}", line);
            continue;
        }

        let source = cleaner.clean(source);
        items.push(NewsItem {
            title,
            snippet: cleaner.clean(snippet),
            source: if source.is_empty() { DEFAULT_SOURCE.to_string() } else { source },
            recency: DEFAULT_RECENCY.to_string(),
            sentiment: SentimentLabel::Neutral,
        });
    }

    items
}

#[derive(Clone)]
pub struct NewsClient {
    provider: Arc<dyn SearchProvider>,
    cleaner: Arc<TextCleaner>,
}

impl NewsClient {
    pub fn new(provider: Arc<dyn SearchProvider>) -> Result<Self> {
        Ok(NewsClient {
            provider,
            cleaner: Arc::new(TextCleaner::new()?),
        })
    }

    /// Сырой текст поиска; используется как контекст для промпта анализа.
    pub async fn search_text(&self, query: &str) -> Result<String> {
        self.provider.search(query).await
    }

    pub async fn fetch_news(&self, symbol: &str, category: NewsCategory) -> Vec<NewsItem> {
        let query = category.search_query(symbol);
        tracing::info!("Поиск новостей {} ({})", symbol, category.as_str());

        let text = match self.provider.search(&query).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Ошибка поиска новостей: {}", e);
                return Vec::new();
            }
        };

        let items = parse_search_results(&self.cleaner, &text);
        tracing::info!("Собрано {} новостей для {}", items.len(), symbol);
        items
    }
}
