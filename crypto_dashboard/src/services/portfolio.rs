use std::collections::BTreeMap;

use crate::models::{PortfolioSummary, Transaction};

/// Учёт портфеля. Пока возвращает пустую сводку.
pub trait PortfolioTracker: Send + Sync {
    fn track_portfolio(&self, transactions: &[Transaction]) -> PortfolioSummary;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PlaceholderPortfolio;

impl PortfolioTracker for PlaceholderPortfolio {
    fn track_portfolio(&self, transactions: &[Transaction]) -> PortfolioSummary {
        tracing::debug!("Учёт портфеля по {} транзакциям не реализован", transactions.len());
        PortfolioSummary {
            holdings: BTreeMap::new(),
            performance: "N/A".to_string(),
        }
    }
}

pub fn display_portfolio_summary(summary: &PortfolioSummary) {
    tracing::info!(
        "Сводка портфеля: позиции {:?}, доходность {}",
        summary.holdings,
        summary.performance
    );
}
