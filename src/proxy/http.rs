//! HTTP front-end
//!
//! Serves cached values at `GET /:key`.
//!
//! # Responses
//! - `200` with the raw value and a sniffed `Content-Type`
//! - `404` with an empty `text/plain` body when the backend has no such key
//! - `500` with a JSON error body when the backend cannot be reached

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;

use super::AppState;
use crate::error::Result;

/// Creates the router with the single lookup endpoint.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/:key", get(get_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handler for GET /:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response> {
    let response = match state.read_through(&key).await? {
        Some(value) => {
            let content_type = sniff_content_type(&value);
            ([(header::CONTENT_TYPE, content_type)], value).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, "text/plain")],
            "",
        )
            .into_response(),
    };

    Ok(response)
}

// == Content Sniffing ==
const HTML_TAGS: &[&[u8]] = &[
    b"<!DOCTYPE HTML",
    b"<HTML",
    b"<HEAD",
    b"<SCRIPT",
    b"<IFRAME",
    b"<H1",
    b"<DIV",
    b"<FONT",
    b"<TABLE",
    b"<A",
    b"<STYLE",
    b"<TITLE",
    b"<B",
    b"<BODY",
    b"<BR",
    b"<P",
    b"<!--",
];

const SIGNATURES: &[(&[u8], &str)] = &[
    (b"%PDF-", "application/pdf"),
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"\x1f\x8b\x08", "application/x-gzip"),
    (b"PK\x03\x04", "application/zip"),
];

/// Guesses a MIME type from the leading bytes of a value.
pub fn sniff_content_type(body: &[u8]) -> &'static str {
    let text = body.trim_ascii_start();

    let is_html = HTML_TAGS.iter().any(|tag| {
        text.len() > tag.len()
            && text[..tag.len()].eq_ignore_ascii_case(tag)
            && matches!(text[tag.len()], b' ' | b'>')
    });
    if is_html {
        return "text/html; charset=utf-8";
    }
    if text.starts_with(b"<?xml") {
        return "text/xml; charset=utf-8";
    }

    if let Some(&(_, mime)) = SIGNATURES.iter().find(|(magic, _)| body.starts_with(magic)) {
        return mime;
    }

    let is_binary = body
        .iter()
        .any(|&b| b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\x0c' | b'\r' | 0x1b));
    if !is_binary && std::str::from_utf8(body).is_ok() {
        "text/plain; charset=utf-8"
    } else {
        "application/octet-stream"
    }
}
