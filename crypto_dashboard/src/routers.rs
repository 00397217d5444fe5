use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::models::DashboardView;
use crate::views::render_index;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub coin: Option<String>,
    pub category: Option<String>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub symbols: Vec<String>,
    pub analysis_mode: String,
    pub available_endpoints: Vec<String>,
}

// Главная страница: ошибки upstream превращаются в заглушки, статус всегда 200
pub async fn index(State(state): State<AppState>, Query(query): Query<DashboardQuery>) -> Html<String> {
    let view = state
        .dashboard
        .build_view(query.coin.as_deref(), query.category.as_deref())
        .await;
    Html(render_index(&view))
}

pub async fn dashboard_json(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Json<DashboardView> {
    let view = state
        .dashboard
        .build_view(query.coin.as_deref(), query.category.as_deref())
        .await;
    Json(view)
}

// Данные графика; единственный маршрут, отдающий 500 при отсутствии истории
pub async fn chart_data(State(state): State<AppState>, Path(symbol): Path<String>) -> Response {
    match state.dashboard.chart_data(&symbol).await {
        Ok(chart) => Json(chart).into_response(),
        Err(e) => {
            tracing::error!("Ошибка построения графика {}: {}", symbol, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to fetch historical data" })),
            )
                .into_response()
        }
    }
}

// Проверка здоровья сервиса
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        message: "Crypto Insight Dashboard is running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ready".to_string(),
        symbols: state.dashboard.symbols().to_vec(),
        analysis_mode: state.dashboard.analysis_mode().to_string(),
        available_endpoints: vec![
            "/".to_string(),
            "/health".to_string(),
            "/status".to_string(),
            "/api/dashboard".to_string(),
            "/api/chart/:symbol".to_string(),
            "/chart-data/:symbol".to_string(),
        ],
    })
}

// Создание маршрутов
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/status", get(get_status))
        .route("/api/dashboard", get(dashboard_json))
        .route("/api/chart/:symbol", get(chart_data))
        .route("/chart-data/:symbol", get(chart_data))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
