// errors.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Ошибка HTTP запроса: {0}")]
    HttpError(reqwest::Error),

    #[error("Ошибка парсинга JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Ошибка regex: {0}")]
    RegexError(#[from] regex::Error),

    #[error("Исторические данные для {0} недоступны")]
    HistoricalDataUnavailable(String),

    #[error("Некорректный формат данных: {0}")]
    InvalidDataFormat(String),

    #[error("API вернул ошибку: {0}")]
    ApiError(String),

    // Текст обязан содержать "429": по нему клиент анализа решает, повторять ли запрос
    #[error("Превышен лимит запросов (429): {0}")]
    RateLimited(String),

    #[error("Ошибка генерации текста: {0}")]
    GenerationFailed(String),
}

// URL запроса содержит api_key, поэтому в текст ошибки он не попадает
impl From<reqwest::Error> for DashboardError {
    fn from(e: reqwest::Error) -> Self {
        DashboardError::HttpError(e.without_url())
    }
}

impl DashboardError {
    pub fn is_rate_limited(&self) -> bool {
        self.to_string().contains("429")
    }
}

// Определяем псевдоним Result с фиксированным типом ошибки
pub type Result<T> = std::result::Result<T, DashboardError>;
