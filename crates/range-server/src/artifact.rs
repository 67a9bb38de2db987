//! Byte-range artifact serving (RFC 7233 partial content).

use std::io::SeekFrom;
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Path, Request, State};
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::stream::{self, BoxStream, StreamExt};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, Take};
use tokio_util::io::ReaderStream;
use tracing::{debug, error, warn};

use crate::mime::mime_for_path;
use crate::multipart::{closing_delimiter, content_length, part_header};
use crate::range::{parse_range_header, ByteSpan, RangeOutcome};
use crate::AppState;

/// Serve one artifact below the configured root, honoring `Range` headers.
///
/// Responses with a body always declare an exact `Content-Length`; chunked
/// transfer-encoding is never used. The embedded differential updater that
/// consumes AppImage ranges requires exact upfront lengths, and precomputing
/// them is equally valid for every other format.
pub async fn serve_artifact(
    State(state): State<Arc<AppState>>,
    Path(rest): Path<String>,
    request: Request,
) -> Response {
    if request.method() != Method::GET {
        return (StatusCode::METHOD_NOT_ALLOWED, [(header::ALLOW, "GET")]).into_response();
    }

    let Some(file_path) = resolve_artifact_path(&state.artifact_root, &rest) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let size = match tokio::fs::metadata(&file_path).await {
        Ok(metadata) if metadata.is_file() => metadata.len(),
        _ => {
            debug!(path = %file_path.display(), "artifact not found");
            return StatusCode::NOT_FOUND.into_response();
        }
    };
    let mime_type = mime_for_path(&file_path);

    let range_header = match request.headers().get(header::RANGE) {
        None => return serve_full(&file_path, size, mime_type).await,
        Some(value) => match value.to_str() {
            Ok(value) => value,
            Err(_) => return StatusCode::BAD_REQUEST.into_response(),
        },
    };

    let spans = match parse_range_header(size, range_header) {
        RangeOutcome::Empty => return StatusCode::NO_CONTENT.into_response(),
        RangeOutcome::Malformed => {
            warn!(range = range_header, "malformed range header");
            return StatusCode::BAD_REQUEST.into_response();
        }
        RangeOutcome::Unsatisfiable => {
            return (
                StatusCode::RANGE_NOT_SATISFIABLE,
                [(header::CONTENT_RANGE, format!("bytes */{size}"))],
            )
                .into_response();
        }
        RangeOutcome::Satisfiable(spans) => spans,
    };

    let result = if spans.len() == 1 {
        serve_single_range(&file_path, size, mime_type, spans[0]).await
    } else {
        serve_multipart(&state, &file_path, size, mime_type, &spans).await
    };
    match result {
        Ok(response) => response,
        Err(err) => {
            error!(path = %file_path.display(), error = %err, "failed to read artifact spans");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Map the request path onto the artifact root, refusing traversal segments.
fn resolve_artifact_path(root: &std::path::Path, rest: &str) -> Option<PathBuf> {
    let mut path = root.to_path_buf();
    for segment in rest.split('/') {
        if segment.is_empty() || segment == "." {
            continue;
        }
        if segment == ".." {
            return None;
        }
        path.push(segment);
    }
    Some(path)
}

/// 200 with the whole file; length is known so the body is never chunked.
async fn serve_full(file_path: &std::path::Path, size: u64, mime_type: &'static str) -> Response {
    let file = match File::open(file_path).await {
        Ok(file) => file,
        Err(err) => {
            error!(path = %file_path.display(), error = %err, "failed to open artifact");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    (
        StatusCode::OK,
        [
            (header::ACCEPT_RANGES, "bytes".to_string()),
            (header::CONTENT_LENGTH, size.to_string()),
            (header::CONTENT_TYPE, mime_type.to_string()),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response()
}

async fn serve_single_range(
    file_path: &std::path::Path,
    size: u64,
    mime_type: &'static str,
    span: ByteSpan,
) -> std::io::Result<Response> {
    let payload = span_stream(file_path, span).await?;
    Ok((
        StatusCode::PARTIAL_CONTENT,
        [
            (header::ACCEPT_RANGES, "bytes".to_string()),
            (header::CACHE_CONTROL, "no-cache".to_string()),
            (
                header::CONTENT_RANGE,
                format!("bytes {}-{}/{size}", span.start, span.end),
            ),
            (header::CONTENT_LENGTH, span.payload_len().to_string()),
            (header::CONTENT_TYPE, mime_type.to_string()),
        ],
        Body::from_stream(payload),
    )
        .into_response())
}

/// 206 `multipart/byteranges`: one part per requested span, emitted in
/// request order, with the exact total length declared up front.
async fn serve_multipart(
    state: &AppState,
    file_path: &std::path::Path,
    size: u64,
    mime_type: &'static str,
    spans: &[ByteSpan],
) -> std::io::Result<Response> {
    let part_headers: Vec<String> = spans
        .iter()
        .map(|span| part_header(&state.boundary, mime_type, *span, size))
        .collect();
    let closing = closing_delimiter(&state.boundary);
    let declared_length = content_length(&part_headers, spans, &closing);

    // Each part is a header block followed by the span payload, streamed
    // straight from the file rather than buffered; the declared length is
    // computed from the spans alone.
    let mut parts: Vec<BoxStream<'static, std::io::Result<Bytes>>> =
        Vec::with_capacity(spans.len() * 2 + 1);
    for (header_block, span) in part_headers.into_iter().zip(spans) {
        let header_bytes = Bytes::from(header_block);
        parts.push(stream::once(async move { Ok(header_bytes) }).boxed());
        parts.push(span_stream(file_path, *span).await?.boxed());
    }
    let closing_bytes = Bytes::from(closing);
    parts.push(stream::once(async move { Ok(closing_bytes) }).boxed());
    let body = Body::from_stream(stream::iter(parts).flatten());

    Ok((
        StatusCode::PARTIAL_CONTENT,
        [
            (header::ACCEPT_RANGES, "bytes".to_string()),
            (header::CACHE_CONTROL, "no-cache".to_string()),
            (header::CONTENT_LENGTH, declared_length.to_string()),
            (
                header::CONTENT_TYPE,
                format!("multipart/byteranges; boundary={}", state.boundary),
            ),
        ],
        body,
    )
        .into_response())
}

/// Open a reader positioned at the span, limited to exactly its length.
async fn span_stream(
    file_path: &std::path::Path,
    span: ByteSpan,
) -> std::io::Result<ReaderStream<Take<File>>> {
    let mut file = File::open(file_path).await?;
    file.seek(SeekFrom::Start(span.start)).await?;
    Ok(ReaderStream::new(file.take(span.payload_len())))
}
