use anyhow::Result;
use config::Config;
use std::env;

use crate::services::analysis::AnalysisMode;

#[derive(Clone, Debug, serde::Deserialize)]
pub struct AppConfig {
    pub cryptocompare_api_url: String,
    #[serde(default)]
    pub cryptocompare_api_key: String,
    pub gemini_api_url: String,
    #[serde(default)]
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_temperature: f32,
    pub serper_api_url: String,
    #[serde(default)]
    pub serper_api_key: String,
    pub symbols: Vec<String>,
    pub currency: String,
    pub history_days: u32,
    pub cache_capacity: usize,
    pub max_llm_attempts: u32,
    pub retry_base_delay_secs: u64,
    pub max_concurrent_requests: usize,
    pub analysis_mode: AnalysisMode,
    pub http_timeout_secs: u64,
    pub bind_address: String,
    pub monitor_interval_secs: u64,
    pub log_dir: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            cryptocompare_api_url: "https://min-api.cryptocompare.com".to_string(),
            cryptocompare_api_key: String::new(),
            gemini_api_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            gemini_api_key: String::new(),
            gemini_model: "gemini-1.5-flash".to_string(),
            gemini_temperature: 0.7,
            serper_api_url: "https://google.serper.dev/news".to_string(),
            serper_api_key: String::new(),
            symbols: vec!["BTC".to_string(), "ETH".to_string()],
            currency: "USD".to_string(),
            history_days: 30,
            cache_capacity: 128,
            max_llm_attempts: 3,
            retry_base_delay_secs: 2,
            max_concurrent_requests: 4,
            analysis_mode: AnalysisMode::Structured,
            http_timeout_secs: 15,
            bind_address: "0.0.0.0:5000".to_string(),
            monitor_interval_secs: 30,
            log_dir: None,
        }
    }
}

impl AppConfig {
    /// Валидация конфигурации
    pub fn validate(&self) -> Result<()> {
        if self.symbols.is_empty() {
            return Err(anyhow::anyhow!("symbols cannot be empty"));
        }

        if self.currency.trim().is_empty() {
            return Err(anyhow::anyhow!("currency cannot be empty"));
        }

        if self.cache_capacity == 0 || self.cache_capacity > 10_000 {
            return Err(anyhow::anyhow!("cache_capacity must be between 1 and 10000"));
        }

        if self.history_days == 0 || self.history_days > 2000 {
            return Err(anyhow::anyhow!("history_days must be between 1 and 2000"));
        }

        if self.max_llm_attempts == 0 || self.max_llm_attempts > 10 {
            return Err(anyhow::anyhow!("max_llm_attempts must be between 1 and 10"));
        }

        if self.max_concurrent_requests == 0 || self.max_concurrent_requests > 50 {
            return Err(anyhow::anyhow!("max_concurrent_requests must be between 1 and 50"));
        }

        Ok(())
    }
}

fn required_key(name: &str) -> Result<String> {
    env::var(name).map_err(|_| anyhow::anyhow!("{} environment variable is required", name))
}

pub fn load_config() -> Result<AppConfig> {
    // Загружаем .env файл
    dotenvy::dotenv().ok();

    let defaults = AppConfig::default();
    let settings = Config::builder()
        .set_default("cryptocompare_api_url", defaults.cryptocompare_api_url)?
        .set_default("gemini_api_url", defaults.gemini_api_url)?
        .set_default("gemini_model", defaults.gemini_model)?
        .set_default("gemini_temperature", defaults.gemini_temperature as f64)?
        .set_default("serper_api_url", defaults.serper_api_url)?
        .set_default("symbols", defaults.symbols)?
        .set_default("currency", defaults.currency)?
        .set_default("history_days", defaults.history_days as i64)?
        .set_default("cache_capacity", defaults.cache_capacity as i64)?
        .set_default("max_llm_attempts", defaults.max_llm_attempts as i64)?
        .set_default("retry_base_delay_secs", defaults.retry_base_delay_secs as i64)?
        .set_default("max_concurrent_requests", defaults.max_concurrent_requests as i64)?
        .set_default("analysis_mode", "structured")?
        .set_default("http_timeout_secs", defaults.http_timeout_secs as i64)?
        .set_default("bind_address", defaults.bind_address)?
        .set_default("monitor_interval_secs", defaults.monitor_interval_secs as i64)?
        .add_source(config::File::with_name("config").required(false))
        .add_source(
            config::Environment::with_prefix("CRYPTO_DASHBOARD")
                .list_separator(",")
                .with_list_parse_key("symbols")
                .try_parsing(true),
        )
        .build()?;

    let mut config: AppConfig = settings.try_deserialize()?;

    // Ключи API читаются только из окружения
    config.cryptocompare_api_key = required_key("CRYPTOCOMPARE_API_KEY")?;
    config.gemini_api_key = required_key("GEMINI_API_KEY")?;
    config.serper_api_key = required_key("SERPER_API_KEY")?;

    config.symbols = config
        .symbols
        .iter()
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect();

    config.validate()?;

    Ok(config)
}
