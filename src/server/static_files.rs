// src/server/static_files.rs

//! Static file serving from the base directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use percent_encoding::percent_decode_str;
use tracing::debug;

use super::script::script_tag;
use super::ServerState;

/// Serve a file from the base directory, injecting the live-reload script
/// into HTML.
pub(crate) async fn serve_file(State(state): State<Arc<ServerState>>, uri: Uri) -> Response {
    let Some(path) = resolve_path(uri.path(), &state.base_dir) else {
        debug!(path = uri.path(), "not found");
        return StatusCode::NOT_FOUND.into_response();
    };

    let body = match tokio::fs::read(&path).await {
        Ok(body) => body,
        Err(err) => {
            debug!(path = %path.display(), error = %err, "read failed");
            return StatusCode::NOT_FOUND.into_response();
        }
    };

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    let is_html = mime.essence_str() == "text/html";
    let content_type = if is_html || mime.type_() == "text" {
        format!("{}; charset=utf-8", mime.essence_str())
    } else {
        mime.essence_str().to_string()
    };

    let body = if is_html {
        inject_script(&body, &script_tag())
    } else {
        body
    };

    (
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "no-cache".to_string()),
        ],
        body,
    )
        .into_response()
}

/// Resolve a URL path to a file under `base`, using `index.html` for
/// directories. Paths escaping `base` resolve to `None`.
pub fn resolve_path(url: &str, base: &Path) -> Option<PathBuf> {
    let clean = normalize_url(url);
    if clean.split('/').any(|segment| segment == "..") {
        return None;
    }

    // Canonicalize to resolve symlinks and verify the path is under `base`.
    let canonical = base.join(&clean).canonicalize().ok()?;
    let base_canonical = base.canonicalize().ok()?;
    if !canonical.starts_with(&base_canonical) {
        return None;
    }

    if canonical.is_file() {
        return Some(canonical);
    }
    if canonical.is_dir() {
        let index = canonical.join("index.html");
        if index.is_file() {
            return Some(index);
        }
    }
    None
}

/// Decode, strip the query string and trim slashes.
fn normalize_url(url: &str) -> String {
    let decoded = percent_decode_str(url)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_default();

    let path = decoded.split('?').next().unwrap_or(&decoded);
    path.trim_matches('/').to_string()
}

/// Insert `tag` before the last `</body>`, or append it when there is none.
pub fn inject_script(content: &[u8], tag: &str) -> Vec<u8> {
    const PATTERN: &[u8] = b"</body>";

    let mut result = Vec::with_capacity(content.len() + tag.len());
    match content
        .windows(PATTERN.len())
        .rposition(|w| w.eq_ignore_ascii_case(PATTERN))
    {
        Some(pos) => {
            result.extend_from_slice(&content[..pos]);
            result.extend_from_slice(tag.as_bytes());
            result.extend_from_slice(&content[pos..]);
        }
        None => {
            result.extend_from_slice(content);
            result.extend_from_slice(tag.as_bytes());
        }
    }
    result
}
