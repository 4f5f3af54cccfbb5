//! Request handlers

use axum::body::Bytes;
use axum::extract::{Path as UrlPath, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

use super::files::{attachment_disposition, content_type_for, serve_file};
use super::AppState;
use crate::error::{validate_download_file, validate_query, AppError};
use crate::guard;
use crate::search::SearchResult;

const INDEX_TEMPLATE: &str = include_str!("index.html");

/// Body of `POST /api/search`
#[derive(Debug, Default, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
    /// Overrides the default search root when non-empty
    #[serde(default, rename = "baseDir")]
    pub base_dir: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Query string of `GET /api/download`
#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    pub file: Option<String>,
    pub dir: Option<String>,
}

/// Escape text for an HTML attribute or element body
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn render_index(default_root: &Path) -> String {
    INDEX_TEMPLATE.replace(
        "{{BASE_DIR}}",
        &escape_html(&default_root.display().to_string()),
    )
}

pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(render_index(&state.config.default_root))
}

async fn run_search(state: &AppState, request: SearchRequest) -> Result<Vec<SearchResult>, AppError> {
    validate_query(&request.query)?;
    let root = state.config.search_root(request.base_dir.as_deref())?;

    if request.query.trim().is_empty() {
        debug!("Blank query, skipping search in {}", root.display());
        return Ok(Vec::new());
    }

    let outcome = state.pipeline.run(&root, &request.query).await?;
    info!(
        "Search for {:?} in {}: {} candidates, {} results ({:?}) in {:?}",
        request.query,
        root.display(),
        outcome.candidates,
        outcome.results.len(),
        outcome.exit,
        outcome.elapsed
    );
    Ok(outcome.results)
}

/// `POST /api/search`.
///
/// Malformed bodies and invalid requests are 400; every other failure is a
/// 200 with the `error` field set so the page has one error path.
pub async fn search(State(state): State<AppState>, body: Bytes) -> Response {
    let request: SearchRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            debug!("Rejecting search body: {}", e);
            return (StatusCode::BAD_REQUEST, "Invalid request body").into_response();
        }
    };

    match run_search(&state, request).await {
        Ok(results) => Json(SearchResponse {
            results,
            error: None,
        })
        .into_response(),
        Err(e @ AppError::InvalidRequest(_)) => e.into_response(),
        Err(e) => {
            warn!("Search failed [{}]: {}", e.error_code(), e);
            Json(SearchResponse {
                results: Vec::new(),
                error: Some(e.message()),
            })
            .into_response()
        }
    }
}

/// `GET /api/download?file=<relative>&dir=<root>`
pub async fn download(
    State(state): State<AppState>,
    Query(params): Query<DownloadParams>,
) -> Result<Response, AppError> {
    let file = validate_download_file(params.file.as_deref())?;
    let root = state.config.select_root(params.dir.as_deref())?;

    let path = guard::resolve(file, &root).inspect_err(|e| {
        if matches!(e, AppError::AccessDenied(_)) {
            warn!("Denied download of {:?} under {}", file, root.display());
        }
    })?;

    let filename = Path::new(file)
        .file_name()
        .or_else(|| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_string());

    info!("Serving {}", path.display());
    serve_file(
        &path,
        "application/octet-stream",
        Some(attachment_disposition(&filename)),
    )
    .await
}

/// `GET /static/*path`
pub async fn static_asset(
    State(state): State<AppState>,
    UrlPath(asset): UrlPath<String>,
) -> Result<Response, AppError> {
    let path = guard::resolve(&asset, &state.config.static_dir)?;
    serve_file(&path, content_type_for(&path), None).await
}
