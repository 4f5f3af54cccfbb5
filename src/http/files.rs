//! File streaming helpers

use axum::body::{Body, Bytes};
use axum::http::{self, header, HeaderValue, StatusCode};
use axum::response::Response;
use futures::stream;
use std::io;
use std::path::Path;
use tokio::io::AsyncReadExt;

use crate::error::AppError;

const CHUNK_SIZE: usize = 64 * 1024;

/// Open `path` and stream it in fixed-size chunks
pub async fn file_body(path: &Path) -> io::Result<Body> {
    let file = tokio::fs::File::open(path).await?;

    let chunks = stream::try_unfold(file, |mut file| async move {
        let mut buf = vec![0u8; CHUNK_SIZE];
        let n = file.read(&mut buf).await?;
        if n == 0 {
            return Ok::<_, io::Error>(None);
        }
        buf.truncate(n);
        Ok(Some((Bytes::from(buf), file)))
    });

    Ok(Body::from_stream(chunks))
}

/// `Content-Disposition` for an attachment.
///
/// The plain `filename` carries an ASCII fallback; `filename*` carries the
/// exact name percent-encoded as UTF-8.
pub fn attachment_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(filename)
    )
}

/// Content type for a static asset, by extension
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") | Some("mjs") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("txt") => "text/plain; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        Some("woff2") => "font/woff2",
        _ => "application/octet-stream",
    }
}

/// Stream a regular file with the given headers
pub async fn serve_file(
    path: &Path,
    content_type: &str,
    disposition: Option<String>,
) -> Result<Response, AppError> {
    let metadata = tokio::fs::metadata(path).await?;
    if !metadata.is_file() {
        return Err(AppError::FileNotFound(path.display().to_string()));
    }

    let body = file_body(path).await?;
    let mut builder = http::Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, metadata.len());

    if let Some(disposition) = disposition {
        let value = HeaderValue::from_str(&disposition)
            .map_err(|e| AppError::Internal(format!("invalid header: {}", e)))?;
        builder = builder.header(header::CONTENT_DISPOSITION, value);
    }

    builder
        .body(body)
        .map_err(|e| AppError::Internal(e.to_string()))
}
