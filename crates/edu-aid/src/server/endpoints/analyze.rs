//! API endpoints for uploading score sheets and retrieving analyses.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::analysis::error::AnalysisError;
use crate::ingest;
use crate::server::types::ApiError;
use crate::store::SessionKey;
use crate::types::AppState;

/// Converts a pipeline error to an API response.
///
/// Only upload problems and empty datasets are user-visible; anything else
/// is an internal error.
fn analysis_error_to_response(error: AnalysisError) -> Response {
    let status = match &error {
        AnalysisError::UnsupportedFileType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        AnalysisError::EmptyDataset => StatusCode::UNPROCESSABLE_ENTITY,
        AnalysisError::Decode { .. } | AnalysisError::MissingFile => StatusCode::BAD_REQUEST,
    };
    ApiError::new(status, error.to_string()).into_response()
}

/// POST /analyze
///
/// Accepts a multipart upload (`file` field), runs the analysis pipeline,
/// stores the report under a fresh session key, and returns both.
pub async fn post_analyze(State(s): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    let mut filename = None;
    let mut bytes = None;

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some("file") => {
                filename = field.file_name().map(str::to_string);
                match field.bytes().await {
                    Ok(data) => bytes = Some(data),
                    Err(e) => {
                        warn!(error = %e, "Failed to read upload body");
                        return ApiError::with_detail(
                            StatusCode::BAD_REQUEST,
                            "Failed to read uploaded file",
                            e.to_string(),
                        )
                        .into_response();
                    }
                }
            }
            Ok(Some(_)) => continue,
            Ok(None) => break,
            Err(e) => {
                return ApiError::with_detail(
                    StatusCode::BAD_REQUEST,
                    "Malformed multipart request",
                    e.to_string(),
                )
                .into_response();
            }
        }
    }

    let (Some(filename), Some(bytes)) = (filename, bytes) else {
        return analysis_error_to_response(AnalysisError::MissingFile);
    };
    if bytes.is_empty() {
        return analysis_error_to_response(AnalysisError::MissingFile);
    }

    let extension = filename.rsplit('.').next().unwrap_or_default().to_string();
    info!(filename = %filename, size = bytes.len(), "POST /analyze - received upload");

    let rows = match ingest::decode_rows(&extension, &bytes) {
        Ok(rows) => rows,
        Err(e) => {
            warn!(error = %e, "Upload rejected");
            return analysis_error_to_response(e);
        }
    };

    match s.analyzer.analyze(&rows).await {
        Ok(report) => {
            let key = SessionKey::generate();
            info!(session = %key, students = report.total_students, "Storing analysis report");
            s.store.set(key.clone(), report.clone());

            (
                StatusCode::OK,
                Json(json!({
                    "session_id": key.as_str(),
                    "report": report,
                })),
            )
                .into_response()
        }
        Err(e) => {
            if e.is_user_error() {
                warn!(error = %e, "Analysis rejected");
            } else {
                error!(error = %e, "Analysis failed");
            }
            analysis_error_to_response(e)
        }
    }
}

/// GET /analysis/:session
pub async fn get_analysis(
    Path(session): Path<String>,
    State(s): State<Arc<AppState>>,
) -> Response {
    match s.store.get(&SessionKey::from_string(session)) {
        Some(report) => (StatusCode::OK, Json(report)).into_response(),
        None => ApiError::not_found("No analysis for that session").into_response(),
    }
}

/// GET /analysis/:session/statistics
pub async fn get_statistics(
    Path(session): Path<String>,
    State(s): State<Arc<AppState>>,
) -> Response {
    match s.store.get(&SessionKey::from_string(session)) {
        Some(report) => (StatusCode::OK, Json(report.statistics)).into_response(),
        None => ApiError::not_found("No analysis for that session").into_response(),
    }
}

/// GET /analysis/:session/clusters
pub async fn get_clusters(
    Path(session): Path<String>,
    State(s): State<Arc<AppState>>,
) -> Response {
    match s.store.get(&SessionKey::from_string(session)) {
        Some(report) => (StatusCode::OK, Json(report.clusters)).into_response(),
        None => ApiError::not_found("No analysis for that session").into_response(),
    }
}

/// GET /analysis/:session/report
///
/// Render-ready payload for the (external) PDF layer: the analysis plus
/// headline numbers, without the raw statistics tables.
pub async fn get_report(Path(session): Path<String>, State(s): State<Arc<AppState>>) -> Response {
    let Some(report) = s.store.get(&SessionKey::from_string(session)) else {
        return ApiError::not_found("No analysis for that session").into_response();
    };

    let body = json!({
        "generated_at": report.generated_at,
        "total_students": report.total_students,
        "total_subjects": report.total_subjects,
        "overall_assessment": report.analysis.overall_assessment,
        "individual_insights": report.analysis.individual_insights,
        "patterns": report.analysis.patterns,
        "recommendations": report.analysis.recommendations,
        "insights": report.analysis.insights,
        "ai_powered": report.analysis.ai_powered,
    });
    (StatusCode::OK, Json(body)).into_response()
}

/// DELETE /analysis/:session
pub async fn delete_analysis(
    Path(session): Path<String>,
    State(s): State<Arc<AppState>>,
) -> Response {
    let key = SessionKey::from_string(session);
    if s.store.delete(&key) {
        info!(session = %key, "Deleted analysis session");
        (StatusCode::OK, Json(json!({ "message": "Session deleted" }))).into_response()
    } else {
        ApiError::not_found("No analysis for that session").into_response()
    }
}

/// GET /sessions
///
/// Lists active session keys for monitoring.
pub async fn get_sessions(State(s): State<Arc<AppState>>) -> Response {
    let sessions: Vec<String> = s
        .store
        .list()
        .into_iter()
        .map(|k| k.as_str().to_string())
        .collect();

    (
        StatusCode::OK,
        Json(json!({
            "count": sessions.len(),
            "sessions": sessions,
        })),
    )
        .into_response()
}
