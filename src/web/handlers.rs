//! HTTP handlers for the dashboard server.

use super::render::{self, UploadFailure};
use super::session_store::Session;
use super::AppState;
use crate::analytics::export::{ExportError, ExportFormat};
use crate::errors::DashboardError;
use crate::io::load_dataset;
use crate::pipeline::{analyze, export_report, resolve_selection};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Json;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

/// Multipart field carrying the CSV file
const FILE_FIELD: &str = "file";

#[derive(Debug, Default, Deserialize)]
pub struct DateQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        match self {
            DashboardError::SessionNotFound(_) => {
                (StatusCode::NOT_FOUND, Html(render::not_found_page())).into_response()
            }
            DashboardError::Load(error) if error.is_schema_error() => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Html(render::upload_page(Some(&UploadFailure::InvalidSchema))),
            )
                .into_response(),
            DashboardError::Load(error) => (
                StatusCode::BAD_REQUEST,
                Html(render::upload_page(Some(&UploadFailure::Processing(
                    error.to_string(),
                )))),
            )
                .into_response(),
            DashboardError::InvalidDate(error) => {
                (StatusCode::BAD_REQUEST, error.to_string()).into_response()
            }
            DashboardError::Export(error @ ExportError::UnknownFormat { .. }) => {
                (StatusCode::BAD_REQUEST, error.to_string()).into_response()
            }
            DashboardError::Export(error) => {
                warn!(error = %error, "❌ Export failed");
                (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()).into_response()
            }
        }
    }
}

fn lookup_session(state: &AppState, raw_id: &str) -> Result<Session, DashboardError> {
    let id = Uuid::parse_str(raw_id).unwrap_or_else(|_| Uuid::nil());
    state
        .store
        .get(&id)
        .ok_or(DashboardError::SessionNotFound(id))
}

fn processing_failure(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Html(render::upload_page(Some(&UploadFailure::Processing(
            message.into(),
        )))),
    )
        .into_response()
}

/// `GET /`
pub async fn index() -> Html<String> {
    Html(render::upload_page(None))
}

/// `POST /upload`
pub async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut upload = None;
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some(FILE_FIELD) {
                    continue;
                }
                let file_name = field.file_name().unwrap_or("upload.csv").to_string();
                match field.bytes().await {
                    Ok(bytes) => upload = Some((file_name, bytes)),
                    Err(e) => return processing_failure(e.to_string()),
                }
                break;
            }
            Ok(None) => break,
            Err(e) => return processing_failure(e.to_string()),
        }
    }

    let Some((file_name, bytes)) = upload else {
        return processing_failure("Aucun fichier reçu");
    };

    match load_dataset(bytes.as_ref()) {
        Ok(dataset) => {
            let rows = dataset.len();
            let id = state.store.insert(file_name.clone(), dataset);
            info!(session = %id, file = %file_name, rows, "📥 File uploaded");
            Redirect::to(&format!("/dashboard/{}", id)).into_response()
        }
        Err(error) => {
            warn!(file = %file_name, error = %error, "❌ Upload rejected");
            DashboardError::from(error).into_response()
        }
    }
}

/// `GET /dashboard/:id`
pub async fn dashboard(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DateQuery>,
) -> Result<Html<String>, DashboardError> {
    let session = lookup_session(&state, &id)?;
    let selection = resolve_selection(
        &session.dataset,
        query.start.as_deref(),
        query.end.as_deref(),
    )?;
    let analysis = analyze(
        &session.source_name,
        &session.dataset,
        selection,
        &state.settings,
    );
    Ok(Html(render::dashboard_page(session.id, &analysis, &selection)))
}

/// `GET /api/dashboard/:id`
pub async fn dashboard_json(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DateQuery>,
) -> Result<Response, DashboardError> {
    let session = lookup_session(&state, &id)?;
    let selection = resolve_selection(
        &session.dataset,
        query.start.as_deref(),
        query.end.as_deref(),
    )?;
    let analysis = analyze(
        &session.source_name,
        &session.dataset,
        selection,
        &state.settings,
    );
    Ok(Json(analysis.report).into_response())
}

/// File name offered for a download: source stem plus the format extension.
fn download_name(source_name: &str, format: ExportFormat) -> String {
    let stem = std::path::Path::new(source_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem: String = stem
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = if stem.is_empty() { "rapport".to_string() } else { stem };
    format!("{}_dashboard.{}", stem, format.file_extension())
}

/// `GET /export/:id?format=json|csv|xlsx`
pub async fn export(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, DashboardError> {
    let session = lookup_session(&state, &id)?;
    let format: ExportFormat = query.format.as_deref().unwrap_or("json").parse()?;
    let selection = resolve_selection(
        &session.dataset,
        query.start.as_deref(),
        query.end.as_deref(),
    )?;
    let analysis = analyze(
        &session.source_name,
        &session.dataset,
        selection,
        &state.settings,
    );
    let bytes = export_report(&analysis.report, format)?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        download_name(&session.source_name, format)
    );
    Ok((
        [
            (header::CONTENT_TYPE, format.mime_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}
