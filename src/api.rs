use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    app_state::{AppState, Status},
    engine::Mode,
    models::{Recommendation, SymptomQuery},
};

/// Longitud mínima de la descripción de síntomas (sin contar espacios).
pub const MIN_SYMPTOM_CHARS: usize = 3;

// --- Payloads y Respuestas de la API ---

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub id: String,
    pub generated_at: String,
    pub recommendation: Recommendation,
}

// --- Router ---

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/recommend", post(recommend_handler))
        .route("/api/status", get(status_handler))
        .route("/api/schema", get(schema_handler))
        .route("/api/shutdown", post(shutdown_handler))
        .with_state(app_state)
}

// --- Handlers ---

#[axum::debug_handler]
async fn recommend_handler(
    State(state): State<AppState>,
    Json(payload): Json<SymptomQuery>,
) -> Result<Json<RecommendResponse>, (StatusCode, Json<serde_json::Value>)> {
    let meaningful = payload.symptoms.chars().filter(|c| !c.is_whitespace()).count();
    if meaningful < MIN_SYMPTOM_CHARS {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Describa los síntomas con al menos 3 caracteres."})),
        ));
    }

    let recommendation = state.engine.recommend(&payload);
    let fell_back = state.engine.mode() == Mode::Ml && recommendation.predicted_category.is_none();
    state.record_served(fell_back);

    Ok(Json(RecommendResponse {
        id: Uuid::new_v4().to_string(),
        generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        recommendation,
    }))
}

#[axum::debug_handler]
async fn status_handler(State(state): State<AppState>) -> Json<Status> {
    Json(state.snapshot())
}

#[axum::debug_handler]
async fn schema_handler() -> Json<serde_json::Value> {
    let request = schemars::schema_for!(SymptomQuery);
    let recommendation = schemars::schema_for!(Recommendation);
    Json(json!({
        "request": request,
        "recommendation": recommendation,
    }))
}

// --- Handler de Apagado ---

#[axum::debug_handler]
async fn shutdown_handler(
    State(state): State<AppState>,
) -> impl IntoResponse {
    info!("Petición de apagado recibida.");
    if let Some(sender) = state.shutdown_sender.lock().unwrap_or_else(|e| e.into_inner()).take() {
        let _ = sender.send(());
    }
    StatusCode::OK
}
