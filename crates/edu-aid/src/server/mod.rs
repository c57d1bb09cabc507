use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;

use crate::server::endpoints::{analyze, status};
use crate::types::AppState;

mod endpoints;
mod types;

/// Creates the application router.
///
/// # Parameters
/// - `app_state`: The shared application state.
///
/// # Returns
/// The router.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let analysis_router = Router::new()
        .route("/analysis/:session", get(analyze::get_analysis))
        .route("/analysis/:session", delete(analyze::delete_analysis))
        .route(
            "/analysis/:session/statistics",
            get(analyze::get_statistics),
        )
        .route("/analysis/:session/clusters", get(analyze::get_clusters))
        .route("/analysis/:session/report", get(analyze::get_report))
        .route("/sessions", get(analyze::get_sessions));

    Router::new()
        .route("/health", get(status::get_health))
        .route("/analyze", post(analyze::post_analyze))
        .layer(DefaultBodyLimit::max(app_state.config.max_upload_bytes))
        .merge(analysis_router)
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Analyzer;
    use crate::config::{AppConfig, CourseCatalog, InsightConfig};
    use crate::insight::InsightClient;
    use crate::store::MemorySessionStore;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::util::ServiceExt;

    fn test_state() -> Arc<AppState> {
        let insight = InsightClient::new(InsightConfig {
            enabled: false,
            ..InsightConfig::default()
        })
        .unwrap();
        Arc::new(AppState {
            config: AppConfig::default(),
            analyzer: Analyzer::new(insight, CourseCatalog::built_in()),
            store: Arc::new(MemorySessionStore::new()),
        })
    }

    fn multipart_body(boundary: &str, filename: &str, content: &str) -> Body {
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: text/csv\r\n\r\n{content}\r\n--{boundary}--\r\n"
        );
        Body::from(body)
    }

    #[tokio::test]
    async fn test_health() {
        let router = create_router(test_state());
        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_session_is_404() {
        let router = create_router(test_state());
        let response = router
            .oneshot(
                Request::get("/analysis/nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_upload_roundtrip_and_fetch() {
        let state = test_state();
        let router = create_router(state.clone());

        let boundary = "XBOUNDARY";
        let csv = "Name,Subject,Grade,SS1_1st,SS1_2nd\nAda,Mathematics,82,80,84\n";
        let response = router
            .clone()
            .oneshot(
                Request::post("/analyze")
                    .header(
                        "content-type",
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(multipart_body(boundary, "scores.csv", csv))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let sessions = state.store.list();
        assert_eq!(sessions.len(), 1);

        let response = router
            .oneshot(
                Request::get(format!("/analysis/{}", sessions[0].as_str()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unsupported_extension_is_415() {
        let router = create_router(test_state());

        let boundary = "XBOUNDARY";
        let response = router
            .oneshot(
                Request::post("/analyze")
                    .header(
                        "content-type",
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(multipart_body(boundary, "scores.pdf", "junk"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_empty_dataset_is_422() {
        let router = create_router(test_state());

        let boundary = "XBOUNDARY";
        // Rows exist but none carries a student identifier.
        let csv = "Subject,SS1_1st\nMathematics,80\n";
        let response = router
            .oneshot(
                Request::post("/analyze")
                    .header(
                        "content-type",
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(multipart_body(boundary, "scores.csv", csv))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
