// Tax rate REST API (Axum)
//
// GET  /health
// GET  /records
// GET  /records/:municipality[?date=YYYY-MM-DD]
// GET  /records/:municipality/:date
// POST /records
//
// `/records/` is accepted as an alias of `/records` for older clients.
// A date with no covering record is an empty list with 200, not an error.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::db::RecordStore;
use crate::error::TaxError;
use crate::record::{parse_date, TaxRateRecord};
use crate::resolver::RateResolver;

/// Shared application state
pub struct AppState<S> {
    resolver: Arc<RateResolver<S>>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        AppState {
            resolver: Arc::clone(&self.resolver),
        }
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Deserialize)]
struct DateQuery {
    date: Option<String>,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Tax(#[from] TaxError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) | ApiError::Tax(TaxError::InvalidRecord(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Tax(TaxError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Tax(TaxError::StorageUnavailable(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /records - every record of every municipality
async fn list_records<S: RecordStore>(
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<TaxRateRecord>>, ApiError> {
    Ok(Json(state.resolver.store().list_all()?))
}

/// GET /records/:municipality - catalog, or the winning record when `date` is given
async fn municipality_records<S: RecordStore>(
    State(state): State<AppState<S>>,
    Path(municipality): Path<String>,
    Query(query): Query<DateQuery>,
) -> Result<Json<Vec<TaxRateRecord>>, ApiError> {
    let raw_date = query.date.as_deref().map(str::trim).filter(|d| !d.is_empty());

    match raw_date {
        Some(raw_date) => resolve_on(&state, &municipality, raw_date),
        None => Ok(Json(state.resolver.resolve_all_for_jurisdiction(&municipality)?)),
    }
}

/// GET /records/:municipality/:date - path form of the date query
async fn municipality_record_on_date<S: RecordStore>(
    State(state): State<AppState<S>>,
    Path((municipality, raw_date)): Path<(String, String)>,
) -> Result<Json<Vec<TaxRateRecord>>, ApiError> {
    resolve_on(&state, &municipality, &raw_date)
}

fn resolve_on<S: RecordStore>(
    state: &AppState<S>,
    municipality: &str,
    raw_date: &str,
) -> Result<Json<Vec<TaxRateRecord>>, ApiError> {
    let date = parse_date(raw_date)
        .map_err(|_| ApiError::BadRequest(format!("Invalid date format: {}", raw_date)))?;

    let winner = state.resolver.try_resolve(municipality, date)?;
    Ok(Json(winner.into_iter().collect()))
}

/// POST /records - store one record; the record is not echoed back
async fn create_record<S: RecordStore>(
    State(state): State<AppState<S>>,
    payload: Result<Json<TaxRateRecord>, JsonRejection>,
) -> Result<Json<ApiResponse<&'static str>>, ApiError> {
    let Json(record) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let id = state.resolver.store().insert(&record)?;
    info!(%id, municipality = %record.jurisdiction, "tax record created");

    Ok(Json(ApiResponse::ok("created")))
}

// ============================================================================
// Router
// ============================================================================

pub fn router<S: RecordStore + 'static>(resolver: Arc<RateResolver<S>>) -> Router {
    let state = AppState { resolver };

    Router::new()
        .route("/health", get(health_check))
        .route("/records", get(list_records::<S>).post(create_record::<S>))
        .route("/records/", get(list_records::<S>).post(create_record::<S>))
        .route("/records/:municipality", get(municipality_records::<S>))
        .route("/records/:municipality/:date", get(municipality_record_on_date::<S>))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteRecordStore;
    use crate::memory::InMemoryRecordStore;
    use crate::seed::seed_defaults;
    use axum::body::Body;
    use axum::http::{header, Request};
    use tower::ServiceExt;

    fn seeded_app() -> Router {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        seed_defaults(&store).unwrap();
        router(Arc::new(RateResolver::new(store)))
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn post_json(app: &Router, body: String) -> StatusCode {
        post_json_to(app, "/records", body).await
    }

    async fn post_json_to(app: &Router, uri: &str, body: String) -> StatusCode {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();
        app.clone().oneshot(request).await.unwrap().status()
    }

    async fn resolved_rate(app: &Router, uri: &str) -> f64 {
        let (status, body) = get_json(app, uri).await;
        assert_eq!(status, StatusCode::OK);
        let records: Vec<TaxRateRecord> = serde_json::from_value(body).unwrap();
        assert_eq!(records.len(), 1, "{}", uri);
        records[0].rate
    }

    #[tokio::test]
    async fn test_resolve_by_date() {
        let app = seeded_app();

        assert_eq!(resolved_rate(&app, "/records/Copenhagen?date=2024-01-01").await, 0.1);
        assert_eq!(resolved_rate(&app, "/records/Copenhagen?date=2024-03-16").await, 0.2);
        assert_eq!(resolved_rate(&app, "/records/Copenhagen?date=2024-05-02").await, 0.4);
        assert_eq!(resolved_rate(&app, "/records/Copenhagen?date=2024-07-10").await, 0.2);
    }

    #[tokio::test]
    async fn test_no_covering_record_is_empty_list() {
        let app = seeded_app();

        let (status, body) = get_json(&app, "/records/Copenhagen?date=2030-01-01").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));

        let (status, body) = get_json(&app, "/records/Nowhere").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_invalid_date_is_bad_request() {
        let app = seeded_app();

        let (status, body) = get_json(&app, "/records/Copenhagen?date=invalid_date_format").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Invalid date format"));
    }

    #[tokio::test]
    async fn test_catalog_listings() {
        let app = seeded_app();

        let (status, body) = get_json(&app, "/records").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 5);

        let (_, body) = get_json(&app, "/records/Copenhagen").await;
        assert_eq!(body.as_array().unwrap().len(), 4);
        assert_eq!(body[0]["date_start"], "2024-01-01");
        assert_eq!(body[0]["period_type"], 4);

        let (status, body) = get_json(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], "OK");
    }

    #[tokio::test]
    async fn test_insert_then_read_record() {
        let app = router(Arc::new(RateResolver::new(InMemoryRecordStore::new())));
        let body = serde_json::json!({
            "municipality": "TestCity",
            "period_type": 3,
            "date_start": "2024-06-01",
            "date_end": "2024-06-30",
            "tax_rate": 0.5,
        });

        assert_eq!(post_json(&app, body.to_string()).await, StatusCode::OK);

        let (status, records) = get_json(&app, "/records/TestCity?date=2024-06-15").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(records, serde_json::json!([body]));
    }

    #[tokio::test]
    async fn test_rejected_submissions() {
        let app = seeded_app();

        let reversed = serde_json::json!({
            "municipality": "Kolding",
            "period_type": 4,
            "date_start": "2024-12-31",
            "date_end": "2024-01-01",
            "tax_rate": 0.2,
        });
        assert_eq!(post_json(&app, reversed.to_string()).await, StatusCode::BAD_REQUEST);

        let bad_period = serde_json::json!({
            "municipality": "Kolding",
            "period_type": 0,
            "date_start": "2024-01-01",
            "date_end": "2024-12-31",
            "tax_rate": 0.2,
        });
        assert_eq!(post_json(&app, bad_period.to_string()).await, StatusCode::BAD_REQUEST);
        assert_eq!(post_json(&app, "{not json".to_string()).await, StatusCode::BAD_REQUEST);

        let (_, body) = get_json(&app, "/records/Kolding").await;
        assert_eq!(body, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_trailing_slash_and_path_date_routes() {
        let app = seeded_app();
        let kolding = serde_json::json!({
            "municipality": "Kolding",
            "period_type": 4,
            "date_start": "2024-01-01",
            "date_end": "2024-12-31",
            "tax_rate": 0.2,
        });

        assert_eq!(
            post_json_to(&app, "/records/", kolding.to_string()).await,
            StatusCode::OK
        );
        assert_eq!(resolved_rate(&app, "/records/Kolding/2024-06-01").await, 0.2);
        assert_eq!(resolved_rate(&app, "/records/Copenhagen/2024-01-01").await, 0.1);

        let (status, body) = get_json(&app, "/records/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 6);

        let (status, body) = get_json(&app, "/records/Copenhagen/2030-01-01").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));

        let (status, _) = get_json(&app, "/records/Copenhagen/not-a-date").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
