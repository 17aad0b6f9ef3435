// HTTP layer: axum routes over the resource handlers
//
// Every route locks the connection, calls one handler synchronously and
// maps the outcome to JSON. Errors share one body shape: {message, error?}.

use crate::config::Config;
use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::handlers::{
    analysts, deposits, evidence_requests, reconciliations, registers, stores,
};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: Arc<Database>, config: Config) -> Self {
        AppState {
            db,
            config: Arc::new(config),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = if self.is_client_error() {
            tracing::warn!(status = status.as_u16(), error = %self, "request rejected");
            ErrorBody {
                message: self.to_string(),
                error: None,
            }
        } else {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
            ErrorBody {
                message: "Internal server error".to_string(),
                error: Some(self.to_string()),
            }
        };

        (status, Json(body)).into_response()
    }
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::validation(rejection.body_text()))
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> AppResult<T> {
    query
        .map(|Query(value)| value)
        .map_err(|rejection| AppError::validation(rejection.body_text()))
}

fn created<T: Serialize>(body: T) -> Response {
    (StatusCode::CREATED, Json(body)).into_response()
}

// ============================================================================
// API Handlers
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// GET /api/health
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: crate::VERSION,
    })
}

/// GET /api/stores
async fn list_stores(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let conn = state.db.connection()?;
    Ok(Json(stores::list_stores(&conn)?))
}

/// POST /api/stores
async fn create_store(
    State(state): State<AppState>,
    body: Result<Json<stores::CreateStoreRequest>, JsonRejection>,
) -> AppResult<Response> {
    let req = json_body(body)?;
    let conn = state.db.connection()?;
    Ok(created(stores::create_store(&conn, req)?))
}

/// GET /api/stores/:id
async fn get_store(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let conn = state.db.connection()?;
    Ok(Json(stores::get_store(&conn, &id)?))
}

/// DELETE /api/stores/:id
async fn delete_store(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let conn = state.db.connection()?;
    Ok(Json(stores::delete_store(&conn, &id)?))
}

/// GET /api/stores/closure?date=YYYY-MM-DD&status=
async fn store_closures(
    State(state): State<AppState>,
    query: Result<Query<stores::ClosureParams>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let params = query_params(query)?;
    let conn = state.db.connection()?;
    Ok(Json(stores::store_closures(&conn, params)?))
}

/// POST /api/analysts
async fn create_analyst(
    State(state): State<AppState>,
    body: Result<Json<analysts::CreateAnalystRequest>, JsonRejection>,
) -> AppResult<Response> {
    let req = json_body(body)?;
    let conn = state.db.connection()?;
    Ok(created(analysts::create_analyst(&conn, req)?))
}

/// GET /api/analysts/:id
async fn get_analyst(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let conn = state.db.connection()?;
    Ok(Json(analysts::get_analyst(&conn, &id)?))
}

/// POST /api/cash-registers
async fn create_cash_register(
    State(state): State<AppState>,
    body: Result<Json<registers::CreateCashRegisterRequest>, JsonRejection>,
) -> AppResult<Response> {
    let req = json_body(body)?;
    let conn = state.db.connection()?;
    Ok(created(registers::create_cash_register(&conn, req)?))
}

/// GET /api/cash-registers/:id
async fn get_cash_register(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let conn = state.db.connection()?;
    Ok(Json(registers::get_cash_register(&conn, &id)?))
}

/// POST /api/sales
async fn create_sale(
    State(state): State<AppState>,
    body: Result<Json<registers::CreateSaleRequest>, JsonRejection>,
) -> AppResult<Response> {
    let req = json_body(body)?;
    let conn = state.db.connection()?;
    Ok(created(registers::create_sale(&conn, req)?))
}

/// GET /api/deposits
async fn list_deposits(
    State(state): State<AppState>,
    query: Result<Query<deposits::DepositListParams>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let params = query_params(query)?;
    let conn = state.db.connection()?;
    Ok(Json(deposits::list_deposits(&conn, &state.config.api, params)?))
}

/// POST /api/deposits
async fn create_deposit(
    State(state): State<AppState>,
    body: Result<Json<deposits::CreateDepositRequest>, JsonRejection>,
) -> AppResult<Response> {
    let req = json_body(body)?;
    let conn = state.db.connection()?;
    Ok(created(deposits::create_deposit(&conn, req)?))
}

/// GET /api/deposits/:id
async fn get_deposit(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let conn = state.db.connection()?;
    Ok(Json(deposits::get_deposit(&conn, &id)?))
}

/// PUT /api/deposits/:id/status
async fn update_deposit_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<deposits::UpdateDepositStatusRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let req = json_body(body)?;
    let conn = state.db.connection()?;
    Ok(Json(deposits::update_deposit_status(&conn, &id, req)?))
}

/// POST /api/evidence-requests
async fn create_evidence_request(
    State(state): State<AppState>,
    body: Result<Json<evidence_requests::CreateEvidenceRequest>, JsonRejection>,
) -> AppResult<Response> {
    let req = json_body(body)?;
    let conn = state.db.connection()?;
    Ok(created(evidence_requests::create_evidence_request(&conn, req)?))
}

/// GET /api/evidence-requests/:id
async fn get_evidence_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let conn = state.db.connection()?;
    Ok(Json(evidence_requests::get_evidence_request(&conn, &id)?))
}

/// PUT /api/evidence-requests/:id/status
async fn update_evidence_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<evidence_requests::UpdateEvidenceStatusRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let req = json_body(body)?;
    let conn = state.db.connection()?;
    Ok(Json(evidence_requests::update_evidence_status(
        &conn,
        &state.config.rules,
        &id,
        req,
    )?))
}

/// GET /api/evidence-requests/store/:store_id
async fn list_store_evidence(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
    query: Result<Query<evidence_requests::EvidenceListParams>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let params = query_params(query)?;
    let conn = state.db.connection()?;
    Ok(Json(evidence_requests::list_store_evidence(
        &conn, &store_id, params,
    )?))
}

/// POST /api/reconciliations
async fn create_reconciliation(
    State(state): State<AppState>,
    body: Result<Json<reconciliations::CreateReconciliationRequest>, JsonRejection>,
) -> AppResult<Response> {
    let req = json_body(body)?;
    let conn = state.db.connection()?;
    Ok(created(reconciliations::create_reconciliation(&conn, req)?))
}

/// GET /api/reconciliations
async fn list_reconciliations(
    State(state): State<AppState>,
    query: Result<Query<reconciliations::ReconciliationListParams>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let params = query_params(query)?;
    let conn = state.db.connection()?;
    Ok(Json(reconciliations::list_reconciliations(
        &conn,
        &state.config.api,
        params,
    )?))
}

/// GET /api/reconciliations/:id
async fn get_reconciliation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let conn = state.db.connection()?;
    Ok(Json(reconciliations::get_reconciliation(&conn, &id)?))
}

/// PUT /api/reconciliations/:id/status
async fn update_reconciliation_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<reconciliations::UpdateReconciliationStatusRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let req = json_body(body)?;
    let conn = state.db.connection()?;
    Ok(Json(reconciliations::update_reconciliation_status(
        &conn,
        &state.config.rules,
        &id,
        req,
    )?))
}

async fn route_not_found() -> AppError {
    AppError::not_found("Route not found")
}

// ============================================================================
// Router
// ============================================================================

/// Full application router, API mounted under `/api`
pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/stores", get(list_stores).post(create_store))
        .route("/stores/closure", get(store_closures))
        .route("/stores/:id", get(get_store).delete(delete_store))
        .route("/analysts", post(create_analyst))
        .route("/analysts/:id", get(get_analyst))
        .route("/cash-registers", post(create_cash_register))
        .route("/cash-registers/:id", get(get_cash_register))
        .route("/sales", post(create_sale))
        .route("/deposits", get(list_deposits).post(create_deposit))
        .route("/deposits/:id", get(get_deposit))
        .route("/deposits/:id/status", put(update_deposit_status))
        .route("/evidence-requests", post(create_evidence_request))
        .route("/evidence-requests/store/:store_id", get(list_store_evidence))
        .route("/evidence-requests/:id", get(get_evidence_request))
        .route("/evidence-requests/:id/status", put(update_evidence_status))
        .route(
            "/reconciliations",
            get(list_reconciliations).post(create_reconciliation),
        )
        .route("/reconciliations/:id", get(get_reconciliation))
        .route(
            "/reconciliations/:id/status",
            put(update_reconciliation_status),
        )
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .fallback(route_not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
