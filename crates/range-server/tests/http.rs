//! End-to-end tests for the artifact routes, driven through the router
//! without binding a socket.

use std::sync::Arc;

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use feed::{DownloadSettings, DownloadUrls};
use range_server::{create_router, AppState};
use tempfile::TempDir;
use tower::util::ServiceExt;

const FILE_SIZE: usize = 1000;

fn artifact_bytes() -> Vec<u8> {
    (0..FILE_SIZE).map(|i| (i % 251) as u8).collect()
}

fn test_settings() -> DownloadSettings {
    DownloadSettings {
        name: Some("Test App".into()),
        product_name: Some("Test App".into()),
        version: "2.0.0".into(),
        root_url: "http://downloads.example.com".into(),
        download_urls: DownloadUrls {
            darwin: Some("http://downloads.example.com/mac/{{version}}.dmg".into()),
            linux: Some("http://downloads.example.com/linux/app.{{ext}}".into()),
            win32: None,
        },
    }
}

fn test_router() -> Result<(Router, TempDir)> {
    let dir = TempDir::new()?;
    std::fs::write(dir.path().join("app.AppImage"), artifact_bytes())?;
    std::fs::write(dir.path().join("app.deb"), artifact_bytes())?;
    let state = AppState::new(dir.path().to_path_buf(), &test_settings())?;
    Ok((create_router(Arc::new(state)), dir))
}

async fn get_with_range(router: Router, path: &str, range: Option<&str>) -> Result<axum::response::Response> {
    let mut request = Request::builder().uri(path);
    if let Some(range) = range {
        request = request.header(header::RANGE, range);
    }
    Ok(router.oneshot(request.body(Body::empty())?).await?)
}

#[tokio::test]
async fn non_get_method_is_rejected_with_allow_header() -> Result<()> {
    let (router, _dir) = test_router()?;
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/download/app.AppImage")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()[header::ALLOW], "GET");
    Ok(())
}

#[tokio::test]
async fn missing_file_is_404() -> Result<()> {
    let (router, _dir) = test_router()?;
    let response = get_with_range(router, "/download/nope.deb", None).await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn no_range_header_serves_whole_file() -> Result<()> {
    let (router, _dir) = test_router()?;
    let response = get_with_range(router, "/download/app.AppImage", None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::ACCEPT_RANGES], "bytes");
    assert_eq!(
        response.headers()[header::CONTENT_LENGTH],
        FILE_SIZE.to_string().as_str()
    );
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    assert_eq!(body.as_ref(), artifact_bytes());
    Ok(())
}

#[tokio::test]
async fn empty_range_set_is_204() -> Result<()> {
    let (router, _dir) = test_router()?;
    let response = get_with_range(router, "/download/app.AppImage", Some("bytes=")).await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    Ok(())
}

#[tokio::test]
async fn malformed_range_is_400() -> Result<()> {
    let (router, _dir) = test_router()?;
    let response = get_with_range(router, "/download/app.AppImage", Some("bananas=0-1")).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (router, _dir) = test_router()?;
    let response = get_with_range(router, "/download/app.AppImage", Some("bytes=a-b")).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn out_of_bounds_range_is_416_with_total_size() -> Result<()> {
    let (router, _dir) = test_router()?;
    let response = get_with_range(router, "/download/app.AppImage", Some("bytes=1000-1099")).await?;
    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(
        response.headers()[header::CONTENT_RANGE],
        format!("bytes */{FILE_SIZE}").as_str()
    );
    Ok(())
}

#[tokio::test]
async fn single_range_carries_exact_span() -> Result<()> {
    let (router, _dir) = test_router()?;
    let response = get_with_range(router, "/download/app.AppImage", Some("bytes=10-19")).await?;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        response.headers()[header::CONTENT_RANGE],
        format!("bytes 10-19/{FILE_SIZE}").as_str()
    );
    assert_eq!(response.headers()[header::CONTENT_LENGTH], "10");
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
    assert_eq!(response.headers()[header::ACCEPT_RANGES], "bytes");
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    assert_eq!(body.as_ref(), &artifact_bytes()[10..=19]);
    Ok(())
}

#[tokio::test]
async fn zero_length_span_declares_zero_content_length() -> Result<()> {
    let (router, _dir) = test_router()?;
    let response = get_with_range(router, "/download/app.AppImage", Some("bytes=42-42")).await?;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()[header::CONTENT_LENGTH], "0");
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    assert!(body.is_empty());
    Ok(())
}

#[tokio::test]
async fn multipart_response_accounts_for_every_byte() -> Result<()> {
    let (router, _dir) = test_router()?;
    let response =
        get_with_range(router, "/download/app.AppImage", Some("bytes=0-99,200-299")).await?;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);

    let content_type = response.headers()[header::CONTENT_TYPE].to_str()?.to_owned();
    assert!(content_type.starts_with("multipart/byteranges; boundary="));
    let boundary = content_type
        .rsplit_once('=')
        .map(|(_, b)| b.to_owned())
        .expect("boundary parameter");

    let declared: usize = response.headers()[header::CONTENT_LENGTH]
        .to_str()?
        .parse()?;
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    assert_eq!(declared, body.len());

    let text = String::from_utf8_lossy(&body);
    let first = text
        .find(&format!("bytes 0-99/{FILE_SIZE}"))
        .expect("first part header");
    let second = text
        .find(&format!("bytes 200-299/{FILE_SIZE}"))
        .expect("second part header");
    // Parts appear in request order.
    assert!(first < second);
    assert!(text.ends_with(&format!("\r\n--{boundary}--")));

    // Payloads sit right behind their header blocks.
    let artifact = artifact_bytes();
    let first_payload_at = text[first..].find("\r\n\r\n").expect("blank line") + first + 4;
    assert_eq!(
        &body[first_payload_at..first_payload_at + 100],
        &artifact[0..100]
    );
    Ok(())
}

#[tokio::test]
async fn content_type_follows_extension_table() -> Result<()> {
    let (router, _dir) = test_router()?;
    let response = get_with_range(router.clone(), "/download/app.deb", Some("bytes=0-9")).await?;
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/x-debian-package"
    );
    let response = get_with_range(router, "/download/app.AppImage", Some("bytes=0-9")).await?;
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/octet-stream"
    );
    Ok(())
}

#[tokio::test]
async fn feed_rejects_missing_or_invalid_parameters() -> Result<()> {
    let (router, _dir) = test_router()?;
    let response = router
        .clone()
        .oneshot(Request::builder().uri("/feed?format=deb").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = router
        .oneshot(
            Request::builder()
                .uri("/feed?format=deb&platform=amiga&version=1.0.0")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn feed_answers_204_when_client_is_current() -> Result<()> {
    let (router, _dir) = test_router()?;
    let response = router
        .oneshot(
            Request::builder()
                .uri("/feed?format=deb&platform=linux&version=2.0.0")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    Ok(())
}

#[tokio::test]
async fn feed_offers_resolved_url_to_stale_client() -> Result<()> {
    let (router, _dir) = test_router()?;
    let response = router
        .oneshot(
            Request::builder()
                .uri("/feed?format=deb&platform=linux&version=1.0.0")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    let parsed: serde_json::Value = serde_json::from_slice(&body)?;
    assert_eq!(
        parsed["url"],
        "http://downloads.example.com/linux/app.deb"
    );
    Ok(())
}
