use std::fmt::Write;

use crate::models::{AnalysisResult, DashboardView, NewsCategory, NewsItem, PriceRow};

const CHART_JS_CDN: &str = "https://cdn.jsdelivr.net/npm/chart.js";

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Ссылка на страницу монеты: параметры кодируются для URL, затем для атрибута HTML.
fn coin_href(coin: &str, category: NewsCategory) -> String {
    escape_html(&format!(
        "/?coin={}&category={}",
        urlencoding::encode(coin),
        category.as_str()
    ))
}

fn format_price(value: f64, available: bool) -> String {
    if available {
        format!("{:.2}", value)
    } else {
        "N/A".to_string()
    }
}

fn render_prices(rows: &[PriceRow], currency: &str, selected: &str, category: NewsCategory) -> String {
    let mut html = String::from(
        "<table class=\"prices\"><tr><th>Coin</th><th>Price</th><th>24h High</th><th>24h Low</th></tr>",
    );
    for row in rows {
        let class = if row.symbol == selected { " class=\"selected\"" } else { "" };
        let _ = write!(
            html,
            "<tr{class}><td><a href=\"{href}\">{sym}</a></td><td>{price} {cur}</td><td>{high}</td><td>{low}</td></tr>",
            class = class,
            href = coin_href(&row.symbol, category),
            sym = escape_html(&row.symbol),
            price = format_price(row.price, row.available),
            cur = escape_html(currency),
            high = format_price(row.high_24h, row.available),
            low = format_price(row.low_24h, row.available),
        );
    }
    html.push_str("</table>");
    html
}

fn render_list(items: &[String]) -> String {
    let mut html = String::from("<ul>");
    for item in items {
        let _ = write!(html, "<li>{}</li>", escape_html(item));
    }
    html.push_str("</ul>");
    html
}

fn render_analysis(analysis: &AnalysisResult, currency: &str) -> String {
    match analysis {
        AnalysisResult::Narrative {
            analysis,
            sentiment_news,
            recommendations,
        } => {
            let mut html = format!("<p class=\"analysis\">{}</p>", escape_html(analysis));
            if !sentiment_news.is_empty() {
                let _ = write!(
                    html,
                    "<h3>News and Sentiment</h3><pre>{}</pre>",
                    escape_html(sentiment_news)
                );
            }
            if !recommendations.is_empty() {
                let _ = write!(
                    html,
                    "<h3>Investment Recommendations</h3><pre>{}</pre>",
                    escape_html(recommendations)
                );
            }
            html
        }
        AnalysisResult::Structured {
            market_observations,
            outlook,
            support,
            resistance,
            fallback,
        } => {
            let mut html = String::new();
            if *fallback {
                html.push_str("<p class=\"notice\">Live analysis unavailable, showing price-based levels.</p>");
            }
            let _ = write!(
                html,
                "<h3>Market Observations</h3>{}<h3>Outlook</h3>{}<p>Support: {:.2} {cur} &middot; Resistance: {:.2} {cur}</p>",
                render_list(market_observations),
                render_list(outlook),
                support,
                resistance,
                cur = escape_html(currency),
            );
            html
        }
    }
}

fn render_news(news: &[NewsItem]) -> String {
    if news.is_empty() {
        return "<p>No news available right now.</p>".to_string();
    }

    let mut html = String::from("<ul class=\"news\">");
    for item in news {
        let _ = write!(
            html,
            "<li><strong>{}</strong> <span class=\"sentiment {sent}\">{sent}</span><br>{}<br><small>{} &middot; {}</small></li>",
            escape_html(&item.title),
            escape_html(&item.snippet),
            escape_html(&item.source),
            escape_html(&item.recency),
            sent = item.sentiment.as_str(),
        );
    }
    html.push_str("</ul>");
    html
}

fn render_categories(coin: &str, selected: NewsCategory) -> String {
    NewsCategory::ALL
        .iter()
        .map(|category| {
            if *category == selected {
                format!("<strong>{}</strong>", category.as_str())
            } else {
                format!(
                    "<a href=\"{}\">{}</a>",
                    coin_href(coin, *category),
                    category.as_str()
                )
            }
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

pub fn render_index(view: &DashboardView) -> String {
    let alerts = if view.alerts.is_empty() {
        "<p>No alerts triggered.</p>".to_string()
    } else {
        render_list(
            &view
                .alerts
                .iter()
                .map(|a| format!("{}: {}", a.symbol, a.message))
                .collect::<Vec<_>>(),
        )
    };

    let holdings = if view.portfolio.holdings.is_empty() {
        "none".to_string()
    } else {
        view.portfolio
            .holdings
            .iter()
            .map(|(symbol, qty)| format!("{} {}", qty, symbol))
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{coin} | Crypto Insight Dashboard</title>
<script src="{chart_js}"></script>
</head>
<body>
<header><h1>Crypto Insight Dashboard</h1><p>Updated {time}</p></header>
<section><h2>Prices</h2>{prices}</section>
<section><h2>{coin} Analysis</h2>{analysis}</section>
<section><h2>{coin} Price Chart</h2><canvas id="price-chart"></canvas></section>
<section><h2>News</h2><p>{categories}</p>{news}</section>
<section><h2>Alerts</h2>{alerts}</section>
<section><h2>Portfolio</h2><p>Holdings: {holdings}. Performance: {performance}</p></section>
<script>
fetch({chart_url})
  .then(function (r) {{ return r.json(); }})
  .then(function (data) {{
    if (data.error) {{ return; }}
    new Chart(document.getElementById("price-chart"), {{ type: "line", data: data }});
  }});
</script>
</body>
</html>
"#,
        coin = escape_html(&view.coin),
        chart_js = CHART_JS_CDN,
        time = escape_html(&view.current_time),
        prices = render_prices(&view.prices, &view.currency, &view.coin, view.category),
        analysis = render_analysis(&view.analysis, &view.currency),
        categories = render_categories(&view.coin, view.category),
        news = render_news(&view.news),
        alerts = alerts,
        holdings = escape_html(&holdings),
        performance = escape_html(&view.portfolio.performance),
        // JSON строка: HTML сущности внутри <script> не декодируются
        chart_url = serde_json::Value::from(view.chart_url.as_str()),
    )
}
