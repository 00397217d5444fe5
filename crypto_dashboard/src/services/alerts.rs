use std::collections::HashMap;

use crate::models::{PriceAlert, PriceSnapshot};

/// Проверка ценовых оповещений. Реальные правила пока не реализованы.
pub trait AlertEvaluator: Send + Sync {
    fn check_price_alerts(&self, prices: &HashMap<String, PriceSnapshot>) -> Vec<PriceAlert>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PlaceholderAlerts;

impl AlertEvaluator for PlaceholderAlerts {
    fn check_price_alerts(&self, prices: &HashMap<String, PriceSnapshot>) -> Vec<PriceAlert> {
        tracing::debug!("Проверка оповещений для {} котировок: правил нет", prices.len());
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_never_triggers() {
        let mut prices = HashMap::new();
        prices.insert(
            "BTC".to_string(),
            PriceSnapshot {
                symbol: "BTC".to_string(),
                currency: "USD".to_string(),
                price: 1_000_000.0,
                high_24h: 1_000_000.0,
                low_24h: 1.0,
            },
        );
        assert!(PlaceholderAlerts.check_price_alerts(&prices).is_empty());
    }
}
