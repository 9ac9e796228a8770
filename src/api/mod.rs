use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use validator::Validate;

use crate::database::{Database, DatabaseError, MealEntry};
use crate::food::{ClassifierLabel, NutritionFact, NutritionResolver};

const NOT_FOUND_MESSAGE: &str = "Food not found. Try a manual search.";

#[derive(Clone)]
pub struct AppState {
    resolver: Arc<NutritionResolver>,
    db: Arc<Database>,
}

#[derive(Deserialize)]
pub struct NutritionQuery {
    query: String,
}

#[derive(Deserialize, Validate)]
pub struct BatchRequest {
    #[validate(length(min = 1, max = 50))]
    queries: Vec<String>,
}

#[derive(Deserialize, Validate)]
pub struct ScanRequest {
    #[validate(length(min = 1, max = 100))]
    label: String,
    #[validate(range(min = 0.0, max = 1.0))]
    confidence: f32,
}

#[derive(Deserialize, Validate)]
pub struct MealRequest {
    #[validate(length(min = 1, max = 100))]
    query: String,
    #[validate(range(min = 0.01, max = 20.0))]
    portion: Option<f64>,
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    limit: Option<usize>,
}

#[derive(Serialize)]
pub struct ScanResponse {
    label: ClassifierLabel,
    fact: NutritionFact,
}

#[derive(Serialize)]
struct ApiResponse {
    status: String,
}

fn error_response(code: StatusCode, status: impl Into<String>) -> Response {
    (code, Json(ApiResponse { status: status.into() })).into_response()
}

fn database_error(e: DatabaseError) -> Response {
    match e {
        DatabaseError::InvalidPortion(_) | DatabaseError::MissingUser => {
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        other => {
            log::error!("Database error: {}", other);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
        }
    }
}

/// Create and configure the API router
pub fn create_api(resolver: Arc<NutritionResolver>, db: Arc<Database>) -> Router {
    let state = AppState { resolver, db };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_check))
        .route("/nutrition", get(nutrition_handler))
        .route("/nutrition/batch", post(batch_handler))
        .route("/scan", post(scan_handler))
        .route(
            "/users/:user_id/meals",
            get(history_handler).post(record_meal_handler),
        )
        .layer(ConcurrencyLimitLayer::new(64))
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> Response {
    Json(ApiResponse {
        status: "Server is running and healthy".to_string(),
    })
    .into_response()
}

async fn nutrition_handler(
    State(state): State<AppState>,
    Query(params): Query<NutritionQuery>,
) -> Response {
    if params.query.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Query must not be empty");
    }
    match state.resolver.resolve(&params.query).await {
        Ok(fact) => Json(fact).into_response(),
        Err(e) => {
            log::info!("{}", e);
            error_response(StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE)
        }
    }
}

async fn batch_handler(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> Response {
    if let Err(e) = request.validate() {
        return error_response(StatusCode::BAD_REQUEST, e.to_string());
    }
    Json(state.resolver.resolve_many(request.queries.as_slice()).await).into_response()
}

async fn scan_handler(
    State(state): State<AppState>,
    Json(request): Json<ScanRequest>,
) -> Response {
    if let Err(e) = request.validate() {
        return error_response(StatusCode::BAD_REQUEST, e.to_string());
    }
    let label = ClassifierLabel::new(request.label, request.confidence);
    match state.resolver.resolve(&label.query()).await {
        Ok(fact) => Json(ScanResponse { label, fact }).into_response(),
        Err(_) => error_response(StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE),
    }
}

async fn record_meal_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<MealRequest>,
) -> Response {
    if let Err(e) = request.validate() {
        return error_response(StatusCode::BAD_REQUEST, e.to_string());
    }
    let fact = match state.resolver.resolve(&request.query).await {
        Ok(fact) => fact,
        Err(_) => return error_response(StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE),
    };

    match state
        .db
        .record_meal(&user_id, fact, request.portion.unwrap_or(1.0))
        .await
    {
        Ok(entry) => (StatusCode::CREATED, Json(entry)).into_response(),
        Err(e) => database_error(e),
    }
}

async fn history_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<HistoryQuery>,
) -> Response {
    let result = match params.limit {
        Some(limit) => state.db.recent_meals(&user_id, limit).await,
        None => state.db.history(&user_id).await,
    };
    match result {
        Ok(meals) => Json::<Vec<MealEntry>>(meals).into_response(),
        Err(e) => database_error(e),
    }
}
