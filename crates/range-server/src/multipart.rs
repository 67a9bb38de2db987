//! `multipart/byteranges` response construction (RFC 2616 §19.2).
//!
//! Each part is preceded by a header block (boundary delimiter line,
//! `Content-Type`, `Content-Range`, blank line) and the body ends with a
//! closing `--<boundary>--` delimiter. The total `Content-Length` must be
//! computed up front: delta-sync clients cannot consume chunked framing, so
//! every byte that will be streamed has to be accounted for before the
//! response starts.

use crate::range::ByteSpan;

pub const CRLF: &str = "\r\n";

/// Generate a multipart boundary, fresh per server instance.
///
/// The boundary only needs to be unlikely to collide with artifact content;
/// it is not a secret.
pub fn generate_boundary() -> String {
    let mut boundary = String::with_capacity(32);
    for _ in 0..32 {
        boundary.push(char::from_digit(fastrand::u32(0..16), 16).unwrap_or('0'));
    }
    boundary
}

/// Header block emitted before one part's payload.
pub fn part_header(boundary: &str, mime_type: &str, span: ByteSpan, size: u64) -> String {
    format!(
        "{CRLF}--{boundary}{CRLF}Content-Type: {mime_type}{CRLF}Content-Range: bytes {}-{}/{size}{CRLF}{CRLF}",
        span.start, span.end
    )
}

/// Closing delimiter terminating the multipart body.
pub fn closing_delimiter(boundary: &str) -> String {
    format!("{CRLF}--{boundary}--")
}

/// Exact byte count of the full multipart body: every part header, every
/// span's payload, and the closing delimiter.
pub fn content_length(part_headers: &[String], spans: &[ByteSpan], closing: &str) -> u64 {
    let headers: u64 = part_headers.iter().map(|header| header.len() as u64).sum();
    let payloads: u64 = spans.iter().map(ByteSpan::payload_len).sum();
    headers + payloads + closing.len() as u64
}
