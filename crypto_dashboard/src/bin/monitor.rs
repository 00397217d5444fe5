use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crypto_dashboard::models::AnalysisResult;
use crypto_dashboard::services::portfolio::display_portfolio_summary;
use crypto_dashboard::{load_config, DashboardService};

fn log_analysis(symbol: &str, analysis: &AnalysisResult) {
    match analysis {
        AnalysisResult::Narrative { analysis, recommendations, .. } => {
            tracing::info!("Анализ {}: {}", symbol, analysis);
            if !recommendations.is_empty() {
                tracing::info!("Рекомендации {}:\n{}", symbol, recommendations);
            }
        }
        AnalysisResult::Structured { market_observations, outlook, support, resistance, fallback } => {
            tracing::info!(
                "Анализ {}{}: поддержка {:.2}, сопротивление {:.2}",
                symbol,
                if *fallback { " (резервный)" } else { "" },
                support,
                resistance
            );
            for point in market_observations.iter().chain(outlook.iter()) {
                tracing::info!("  - {}", point);
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("crypto_dashboard=info,monitor=info,warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = load_config()?;
    let dashboard = DashboardService::from_config(&config)?;
    let mut ticker = tokio::time::interval(Duration::from_secs(config.monitor_interval_secs.max(1)));

    tracing::info!("Мониторинг {:?} каждые {} с", dashboard.symbols(), config.monitor_interval_secs);

    loop {
        ticker.tick().await;

        let report = match dashboard.monitor_cycle().await {
            Some(report) => report,
            None => {
                tracing::warn!("Не удалось получить котировки, повтор через {} с", config.monitor_interval_secs);
                continue;
            }
        };

        for (symbol, snapshot) in &report.prices {
            tracing::info!("{}: {} {}", symbol, snapshot.price, snapshot.currency);
        }
        for (symbol, analysis) in &report.analyses {
            log_analysis(symbol, analysis);
        }

        if report.alerts.is_empty() {
            tracing::info!("Оповещений нет");
        } else {
            for alert in &report.alerts {
                tracing::warn!("Оповещение {}: {}", alert.symbol, alert.message);
            }
        }

        display_portfolio_summary(&report.portfolio);
    }
}
