//! # HTTP surface
//!
//! A small JSON API over the Canvas resources and the lesson workflow, for the
//! instructor dashboard.
//!
//! # Endpoints
//! - `GET /health`
//! - `GET /course/:course_id/modules` - modules of a course
//! - `GET /course/:course_id/modules/:module_id` - the module's lesson tree
//! - `GET /course/:course_id/enrollments` - enrollments with grades
//! - `POST /course/:course_id/modules/:module_id/lesson` - apply a lesson action
//!
//! Every response body is an envelope `{ "status": "ok" | "error", "data"?, "message"? }`.
//! A lesson or course that does not exist answers `200` with `status: "error"`;
//! bad input answers `400`; a failing Canvas call answers `502`.

use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use canvas_instructor_core::canvas::{CanvasApi, Enrollment, Module};
use canvas_instructor_core::error::{CanvasError, LessonError};
use canvas_instructor_core::lesson::{LessonOrchestrator, LessonReport, LessonRequest};
use canvas_instructor_core::tree::{ModuleNode, ModuleTree};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub canvas: Arc<dyn CanvasApi>,
    pub lessons: Arc<LessonOrchestrator>,
}

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: "ok",
            data: Some(data),
            message: None,
        }
    }
}

impl Envelope<()> {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            data: None,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    /// Malformed or invalid input: 400.
    BadRequest(String),
    /// The addressed course, module or lesson does not exist: 200 with an error envelope.
    NotFound(String),
    /// Canvas failed or could not be reached: 502.
    Upstream(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::OK, message),
            ApiError::Upstream(message) => (StatusCode::BAD_GATEWAY, message),
        };
        (status, Json(Envelope::error(message))).into_response()
    }
}

impl From<CanvasError> for ApiError {
    fn from(err: CanvasError) -> Self {
        if err.status() == Some(StatusCode::NOT_FOUND) {
            ApiError::NotFound(err.to_string())
        } else {
            ApiError::Upstream(err.to_string())
        }
    }
}

impl From<LessonError> for ApiError {
    fn from(err: LessonError) -> Self {
        match err {
            LessonError::Validation(message) => ApiError::BadRequest(message),
            LessonError::LessonNotFound { .. } => ApiError::NotFound(err.to_string()),
            LessonError::Canvas(canvas) => canvas.into(),
        }
    }
}

type ApiResult<T> = Result<Json<Envelope<T>>, ApiError>;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/course/:course_id/modules", get(list_modules))
        .route("/course/:course_id/modules/:module_id", get(module_tree))
        .route(
            "/course/:course_id/modules/:module_id/lesson",
            post(update_lesson),
        )
        .route("/course/:course_id/enrollments", get(list_enrollments))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<Envelope<Value>> {
    Json(Envelope::ok(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    })))
}

async fn list_modules(
    State(state): State<AppState>,
    Path(course_id): Path<u64>,
) -> ApiResult<Vec<Module>> {
    let modules = state.canvas.list_modules(course_id).await?;
    Ok(Json(Envelope::ok(modules)))
}

async fn module_tree(
    State(state): State<AppState>,
    Path((course_id, module_id)): Path<(u64, u64)>,
) -> ApiResult<Vec<ModuleNode>> {
    let items = state.canvas.list_module_items(course_id, module_id).await?;
    Ok(Json(Envelope::ok(ModuleTree::build(items).into_nodes())))
}

async fn list_enrollments(
    State(state): State<AppState>,
    Path(course_id): Path<u64>,
) -> ApiResult<Vec<Enrollment>> {
    let enrollments = state.canvas.list_enrollments(course_id).await?;
    Ok(Json(Envelope::ok(enrollments)))
}

async fn update_lesson(
    State(state): State<AppState>,
    Path((course_id, module_id)): Path<(u64, u64)>,
    body: Result<Json<LessonRequest>, JsonRejection>,
) -> ApiResult<LessonReport> {
    let Json(request) = body.map_err(|rejection| {
        warn!(error = %rejection, "Rejected malformed lesson request");
        ApiError::BadRequest(rejection.body_text())
    })?;
    let report = state
        .lessons
        .update_lesson(course_id, module_id, &request)
        .await?;
    Ok(Json(Envelope::ok(report)))
}

pub async fn serve(state: AppState, host: &str, port: u16) -> Result<()> {
    let app = create_router(state);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "HTTP server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
