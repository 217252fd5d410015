//! HTTP route handlers for the host API.

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use reqbridge::core::registry::Kinded;
use reqbridge::engine::store::HttpDocument;
use reqbridge::error::BridgeError;
use reqbridge::io::config::BridgeConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::state::AppState;

/// Build the API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/config", get(get_config))
        .route("/pipeline", get(get_pipeline))
        .route("/fs/readdir", get(readdir))
        .route("/document", get(get_document))
}

async fn health() -> &'static str {
    "ok"
}

/// GET /api/config - the active configuration snapshot.
async fn get_config(State(state): State<AppState>) -> Json<BridgeConfig> {
    Json((*state.activation.watchers.current()).clone())
}

#[derive(Debug, Serialize)]
struct PipelineResponse {
    region_parsers: Vec<String>,
    variable_replacers: Vec<String>,
}

/// GET /api/pipeline - component kinds in execution order.
async fn get_pipeline(State(state): State<AppState>) -> Json<PipelineResponse> {
    let pipeline = state.activation.engine.pipeline().read().await;
    Json(PipelineResponse {
        region_parsers: pipeline
            .region_parsers
            .iter()
            .map(|parser| parser.kind().to_string())
            .collect(),
        variable_replacers: pipeline
            .variable_replacers
            .iter()
            .map(|replacer| replacer.kind().to_string())
            .collect(),
    })
}

#[derive(Debug, Deserialize)]
struct PathQuery {
    path: String,
}

#[derive(Debug, Serialize)]
struct ReaddirResponse {
    entries: Vec<String>,
}

/// GET /api/fs/readdir?path= - entry names of a directory. `path` must be
/// relative to the project and may not climb out of it.
async fn readdir(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> Result<Json<ReaddirResponse>, StatusCode> {
    let path = state
        .project_path(&query.path)
        .ok_or(StatusCode::BAD_REQUEST)?;
    let entries = state
        .activation
        .files
        .readdir(path.as_path())
        .await
        .map_err(status_for)?;
    Ok(Json(ReaddirResponse { entries }))
}

/// GET /api/document?path= - a prepared request document.
async fn get_document(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> Result<Json<HttpDocument>, StatusCode> {
    let path = state
        .project_path(&query.path)
        .ok_or(StatusCode::BAD_REQUEST)?;
    let doc = state
        .activation
        .engine
        .load_document(path.as_path())
        .await
        .map_err(status_for)?;
    Ok(Json((*doc).clone()))
}

fn status_for(err: BridgeError) -> StatusCode {
    if err.is_not_found() {
        return StatusCode::NOT_FOUND;
    }
    match err {
        BridgeError::NoValidLocator(_) => StatusCode::BAD_REQUEST,
        other => {
            warn!(error = %other, "request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn not_found_maps_to_404() {
        let err = BridgeError::io("read x", io::Error::from(io::ErrorKind::NotFound));
        assert_eq!(status_for(err), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(BridgeError::ResourceNotFound("x".to_string())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn unresolvable_path_is_bad_request() {
        assert_eq!(
            status_for(BridgeError::NoValidLocator(String::new())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn other_failures_are_internal() {
        let err = BridgeError::io("read x", io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(status_for(err), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
