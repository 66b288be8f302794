use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequestParts, Path, State};
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};
use uuid::Uuid;

use muscleden_core::backend::GenerationBackend;
use muscleden_core::plan::{
    HISTORY_LIMIT, PlanForm, PlanResponse, SavedPlan, create_fitness_plan, plan_history,
    plan_record,
};
use muscleden_core::session::{self, Session, SessionConfig};
use muscleden_core::store::PlanStore;
use muscleden_core::{ErrorKind, FieldViolation, PlanError};
use muscleden_db::models::PlanSummary;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Shared, immutable state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PlanStore>,
    pub backend: Arc<dyn GenerationBackend>,
    pub sessions: Arc<SessionConfig>,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: msg.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "success": false, "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Session extraction
// ---------------------------------------------------------------------------

/// A request that carried a valid `Authorization: Bearer` session token.
pub struct RequireSession(pub Session);

impl FromRequestParts<AppState> for RequireSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(session::bearer_token)
            .ok_or_else(|| AppError::unauthorized("missing bearer session token"))?;

        let session = session::validate_token(&state.sessions, token).map_err(|e| {
            debug!(error = %e, "rejected session token");
            AppError::unauthorized(format!("invalid session: {e}"))
        })?;
        Ok(Self(session))
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub success: bool,
    #[serde(flatten)]
    pub saved: SavedPlan,
}

/// Body for a plan that was generated but could not be stored.
#[derive(Debug, Serialize)]
pub struct UnsavedResponse<'a> {
    pub success: bool,
    pub saved: bool,
    pub plan: &'a PlanResponse,
    pub error: String,
    pub kind: ErrorKind,
}

#[derive(Debug, Serialize)]
pub struct PlanErrorResponse<'a> {
    pub success: bool,
    pub error: String,
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "no_issues")]
    pub issues: &'a [FieldViolation],
}

fn no_issues(issues: &&[FieldViolation]) -> bool {
    issues.is_empty()
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub plans: Vec<PlanSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn plan_error_response(err: &PlanError) -> Response {
    if let Some(plan) = err.recovered_plan() {
        let body = UnsavedResponse {
            success: false,
            saved: false,
            plan,
            error: err.user_message(),
            kind: err.kind(),
        };
        return (StatusCode::OK, Json(body)).into_response();
    }

    let status = match err.kind() {
        ErrorKind::InvalidInput => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::GenerationFailed => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = PlanErrorResponse {
        success: false,
        error: err.user_message(),
        kind: err.detail_kind(),
        issues: err.violations(),
    };
    (status, Json(body)).into_response()
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/plans", get(list_plans).post(create_plan))
        .route("/api/plans/{id}", get(get_plan))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(state: AppState, bind: &str, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    info!("muscleden serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("muscleden serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn index() -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\
<html><head><title>Muscle Den AI</title></head><body>\
<h1>Muscle Den AI</h1>\
<p>Personalized fitness plans. Authenticate with <code>Authorization: Bearer &lt;token&gt;</code> \
(issue one with <code>muscleden login</code>).</p>\
<ul>\
<li><code>POST /api/plans</code> generate and save a plan</li>\
<li><code>GET /api/plans</code> the {HISTORY_LIMIT} most recent plans</li>\
<li><code>GET /api/plans/{{id}}</code> one saved plan</li>\
</ul>\
</body></html>"
    ))
}

async fn create_plan(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
    payload: Result<Json<PlanForm>, JsonRejection>,
) -> Response {
    let Json(form) = match payload {
        Ok(form) => form,
        Err(rejection) => return AppError::bad_request(rejection.body_text()).into_response(),
    };

    info!(session = %session.id, "plan requested");
    match create_fitness_plan(state.backend.as_ref(), state.store.as_ref(), &form).await {
        Ok(saved) => (
            StatusCode::CREATED,
            Json(CreatedResponse {
                success: true,
                saved,
            }),
        )
            .into_response(),
        Err(e) => plan_error_response(&e),
    }
}

async fn list_plans(
    State(state): State<AppState>,
    RequireSession(_session): RequireSession,
) -> Json<HistoryResponse> {
    let history = plan_history(state.store.as_ref()).await;
    Json(HistoryResponse {
        success: history.is_ok(),
        error: history.error.map(|e| e.user_message()),
        plans: history.plans,
    })
}

async fn get_plan(
    State(state): State<AppState>,
    RequireSession(_session): RequireSession,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let record = plan_record(state.store.as_ref(), id)
        .await
        .map_err(|e| AppError::internal(e.user_message()))?
        .ok_or_else(|| AppError::not_found(format!("plan {id} not found")))?;
    Ok(Json(record).into_response())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
