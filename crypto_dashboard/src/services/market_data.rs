use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;

use crate::config::AppConfig;
use crate::errors::{DashboardError, Result};
use crate::models::{HistoricalPoint, PriceSnapshot};

/// Источник рыночных данных. Ошибки не пробрасываются: при сбое возвращается пустой результат.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn latest_prices(&self, symbols: &[String], currency: &str) -> HashMap<String, PriceSnapshot>;

    async fn historical_daily(&self, symbol: &str, currency: &str, days: u32) -> Vec<HistoricalPoint>;
}

#[derive(Clone)]
pub struct MarketDataClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl MarketDataClient {
    pub fn new(client: Client, config: &AppConfig) -> Self {
        MarketDataClient {
            client,
            base_url: config.cryptocompare_api_url.trim_end_matches('/').to_string(),
            api_key: config.cryptocompare_api_key.clone(),
        }
    }

    pub async fn fetch_latest_prices(
        &self,
        symbols: &[String],
        currency: &str,
    ) -> Result<HashMap<String, PriceSnapshot>> {
        let fsyms = symbols
            .iter()
            .map(|s| urlencoding::encode(&s.to_uppercase()).into_owned())
            .collect::<Vec<_>>()
            .join(",");
        let currency = currency.to_uppercase();

        let url = format!(
            "{}/data/pricemultifull?fsyms={}&tsyms={}&api_key={}",
            self.base_url,
            fsyms,
            urlencoding::encode(&currency),
            self.api_key
        );

        tracing::info!("Запрос текущих цен CryptoCompare: {} / {}", fsyms, currency);

        let json = self.get_json(&url, "CryptoCompare pricemultifull").await?;
        parse_price_multi_full(&json, &currency)
    }

    pub async fn fetch_historical_daily(
        &self,
        symbol: &str,
        currency: &str,
        days: u32,
    ) -> Result<Vec<HistoricalPoint>> {
        let symbol = symbol.to_uppercase();
        let currency = currency.to_uppercase();

        let url = format!(
            "{}/data/v2/histoday?fsym={}&tsym={}&limit={}&api_key={}",
            self.base_url,
            urlencoding::encode(&symbol),
            urlencoding::encode(&currency),
            days,
            self.api_key
        );

        tracing::info!("Запрос истории {} за {} дней", symbol, days);

        let json = self.get_json(&url, "CryptoCompare histoday").await?;
        parse_histoday(&json)
    }

    async fn get_json(&self, url: &str, api_name: &str) -> Result<Value> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Неизвестная ошибка".to_string());
            return Err(DashboardError::ApiError(format!(
                "{} error: {} - {}",
                api_name, status, error_text
            )));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl MarketDataSource for MarketDataClient {
    async fn latest_prices(&self, symbols: &[String], currency: &str) -> HashMap<String, PriceSnapshot> {
        match self.fetch_latest_prices(symbols, currency).await {
            Ok(prices) => {
                tracing::info!("Получено {} котировок", prices.len());
                prices
            }
            Err(e) => {
                tracing::warn!("Ошибка получения цен из CryptoCompare: {}", e);
                HashMap::new()
            }
        }
    }

    async fn historical_daily(&self, symbol: &str, currency: &str, days: u32) -> Vec<HistoricalPoint> {
        match self.fetch_historical_daily(symbol, currency, days).await {
            Ok(points) => {
                tracing::info!("Получено {} дневных точек для {}", points.len(), symbol);
                points
            }
            Err(e) => {
                tracing::warn!("Ошибка получения истории {} из CryptoCompare: {}", symbol, e);
                Vec::new()
            }
        }
    }
}

fn field_f64(obj: &Value, name: &str) -> Result<f64> {
    obj[name].as_f64().ok_or_else(|| {
        DashboardError::InvalidDataFormat(format!("Отсутствует числовое поле {}", name))
    })
}

/// Разворачивает `RAW.{SYMBOL}.{CURRENCY}` ответа pricemultifull.
pub fn parse_price_multi_full(json: &Value, currency: &str) -> Result<HashMap<String, PriceSnapshot>> {
    let raw = json["RAW"].as_object().ok_or_else(|| {
        DashboardError::InvalidDataFormat("Отсутствует поле RAW".to_string())
    })?;

    let mut prices = HashMap::new();

    for (symbol, by_currency) in raw {
        let quote = &by_currency[currency];
        if !quote.is_object() {
            tracing::debug!("Нет котировки {} в {}", symbol, currency);
            continue;
        }

        // Неполная котировка одной монеты не должна скрывать остальные
        let fields = (
            field_f64(quote, "PRICE"),
            field_f64(quote, "HIGH24HOUR"),
            field_f64(quote, "LOW24HOUR"),
        );
        match fields {
            (Ok(price), Ok(high_24h), Ok(low_24h)) => {
                prices.insert(
                    symbol.clone(),
                    PriceSnapshot {
                        symbol: symbol.clone(),
                        currency: currency.to_string(),
                        price,
                        high_24h,
                        low_24h,
                    },
                );
            }
            (price, high, low) => {
                let reason = [price, high, low]
                    .into_iter()
                    .find_map(|f| f.err())
                    .map(|e| e.to_string())
                    .unwrap_or_default();
                tracing::warn!("Котировка {} пропущена: {}", symbol, reason);
            }
        }
    }

    Ok(prices)
}

/// Разворачивает `Data.Data` ответа histoday и сортирует точки по возрастанию времени.
pub fn parse_histoday(json: &Value) -> Result<Vec<HistoricalPoint>> {
    let response = json["Response"].as_str().unwrap_or("");
    if response != "Success" {
        let message = json["Message"].as_str().unwrap_or("Unknown error");
        return Err(DashboardError::ApiError(format!(
            "CryptoCompare histoday: {}",
            message
        )));
    }

    let data = json["Data"]["Data"].as_array().ok_or_else(|| {
        DashboardError::InvalidDataFormat("Отсутствует поле Data.Data".to_string())
    })?;

    let mut points = Vec::with_capacity(data.len());
    for item in data {
        let timestamp = item["time"].as_i64().ok_or_else(|| {
            DashboardError::InvalidDataFormat("Некорректный timestamp".to_string())
        })?;

        points.push(HistoricalPoint {
            timestamp,
            open: field_f64(item, "open")?,
            high: field_f64(item, "high")?,
            low: field_f64(item, "low")?,
            close: field_f64(item, "close")?,
            volume_from: item["volumefrom"].as_f64().unwrap_or(0.0),
            volume_to: item["volumeto"].as_f64().unwrap_or(0.0),
        });
    }

    points.sort_by_key(|p| p.timestamp);
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snapshot_copies_provider_fields_verbatim() {
        let body = json!({
            "RAW": {
                "BTC": {"USD": {"PRICE": 67123.45, "HIGH24HOUR": 68000.1, "LOW24HOUR": 66001.9, "VOLUME24HOUR": 1.0}},
                "ETH": {"USD": {"PRICE": 3200.5, "HIGH24HOUR": 3300.0, "LOW24HOUR": 3100.25}}
            },
            "DISPLAY": {}
        });

        let prices = parse_price_multi_full(&body, "USD").unwrap();
        let btc = &prices["BTC"];
        assert_eq!(btc.price, 67123.45);
        assert_eq!(btc.high_24h, 68000.1);
        assert_eq!(btc.low_24h, 66001.9);
        assert_eq!(btc.currency, "USD");
        assert_eq!(prices["ETH"].low_24h, 3100.25);
    }

    #[test]
    fn unknown_currency_yields_no_entry() {
        let body = json!({"RAW": {"BTC": {"EUR": {"PRICE": 1.0, "HIGH24HOUR": 1.0, "LOW24HOUR": 1.0}}}});
        let prices = parse_price_multi_full(&body, "USD").unwrap();
        assert!(prices.is_empty());
    }

    #[test]
    fn partial_quote_is_skipped_without_losing_others() {
        let body = json!({
            "RAW": {
                "BTC": {"USD": {"PRICE": 67000.0, "HIGH24HOUR": 68000.0, "LOW24HOUR": 66000.0}},
                "NEWCOIN": {"USD": {"PRICE": 0.01}}
            }
        });

        let prices = parse_price_multi_full(&body, "USD").unwrap();
        assert_eq!(prices.len(), 1);
        assert_eq!(prices["BTC"].price, 67000.0);
        assert!(!prices.contains_key("NEWCOIN"));
    }

    #[test]
    fn missing_raw_is_an_error() {
        let body = json!({"Response": "Error", "Message": "fsyms param is invalid"});
        assert!(parse_price_multi_full(&body, "USD").is_err());
    }

    #[test]
    fn histoday_is_sorted_ascending() {
        let body = json!({
            "Response": "Success",
            "Data": {"Data": [
                {"time": 300, "open": 3.0, "high": 3.0, "low": 3.0, "close": 3.0, "volumefrom": 1.0, "volumeto": 2.0},
                {"time": 100, "open": 1.0, "high": 1.0, "low": 1.0, "close": 1.0},
                {"time": 200, "open": 2.0, "high": 2.0, "low": 2.0, "close": 2.0}
            ]}
        });

        let points = parse_histoday(&body).unwrap();
        let times: Vec<i64> = points.iter().map(|p| p.timestamp).collect();
        assert_eq!(times, vec![100, 200, 300]);
        assert_eq!(points[0].volume_to, 0.0);
        assert_eq!(points[2].volume_to, 2.0);
    }

    #[test]
    fn histoday_error_response() {
        let body = json!({"Response": "Error", "Message": "rate limit"});
        let err = parse_histoday(&body).unwrap_err();
        assert!(err.to_string().contains("rate limit"));
    }
}
