//! Feed queries and package downloads for Linux.
//!
//! Mac and Windows delegate the whole cycle to the host update mechanism;
//! on Linux the client talks to the feed endpoint itself, fetches the
//! packaged artifact and stages it for a privileged install.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{debug, info};

use crate::config::UpdateConfig;
use crate::error::{Result, UpdateError};

/// What the feed said about the client's version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedAnswer {
    /// A newer version exists; its artifact lives at `url`.
    Available { url: String },
    NotAvailable,
}

#[derive(Debug, Deserialize)]
struct FeedBody {
    url: String,
}

/// HTTP client honoring the configured request defaults.
pub fn build_client(config: &UpdateConfig) -> Result<reqwest::Client> {
    let redirects = if config.request.follow_redirects {
        reqwest::redirect::Policy::limited(config.request.max_redirects as usize)
    } else {
        reqwest::redirect::Policy::none()
    };
    let client = reqwest::Client::builder()
        .timeout(config.request.timeout)
        .redirect(redirects)
        .build()?;
    Ok(client)
}

/// Ask the feed whether an update exists for the configured version.
///
/// `200` carries a JSON body naming the artifact URL, `204` means the client
/// is current, `400` means the check parameters were rejected. Any other
/// status is treated as a malformed response rather than silently dropped.
pub async fn query_feed(client: &reqwest::Client, config: &UpdateConfig) -> Result<FeedAnswer> {
    let feed_url = config.feed_url.as_deref().ok_or(UpdateError::MissingFeedUrl)?;
    debug!(%feed_url, version = %config.version, "querying update feed");
    let response = client
        .get(feed_url)
        .query(&[
            ("format", config.format.as_str()),
            ("platform", config.platform.as_str()),
            ("version", &config.version),
        ])
        .send()
        .await?;

    match response.status() {
        reqwest::StatusCode::NO_CONTENT => Ok(FeedAnswer::NotAvailable),
        reqwest::StatusCode::BAD_REQUEST => Err(UpdateError::BadRequest),
        reqwest::StatusCode::OK => {
            let body: FeedBody = response
                .json()
                .await
                .map_err(|e| UpdateError::MalformedResponse(e.to_string()))?;
            Ok(FeedAnswer::Available { url: body.url })
        }
        status => Err(UpdateError::MalformedResponse(format!(
            "unexpected feed status {status}"
        ))),
    }
}

/// Download the packaged artifact to the staging path.
///
/// The response's content type must be on the format's allow-list; formats
/// with an empty list (AppImage) skip the check. A mismatch usually means a
/// captive portal or misrouted CDN answered instead of the artifact host.
pub async fn download_artifact(
    client: &reqwest::Client,
    config: &UpdateConfig,
    url: &str,
) -> Result<PathBuf> {
    info!(%url, "downloading update artifact");
    let response = client.get(url).send().await?.error_for_status()?;

    if let Some(linux_format) = config.format.linux_format() {
        let allowed = linux_format.allowed_mime_types();
        if !allowed.is_empty() {
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_owned();
            let essence = content_type.split(';').next().unwrap_or("").trim();
            if !allowed.contains(&essence) {
                return Err(UpdateError::ContentTypeMismatch(content_type));
            }
        }
    }

    let bytes = response.bytes().await?;
    tokio::fs::write(&config.tmp_update_path, &bytes)
        .await
        .map_err(UpdateError::Write)?;
    Ok(config.tmp_update_path.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use feed::{Platform, UpdateFormat};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer, format: UpdateFormat) -> UpdateConfig {
        UpdateConfig::builder(format, Platform::Linux, "1.2.0")
            .feed_url(format!("{}/feed", server.uri()))
            .build()
    }

    #[tokio::test]
    async fn feed_queries_carry_format_platform_and_version() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .and(query_param("format", "deb"))
            .and(query_param("platform", "linux"))
            .and(query_param("version", "1.2.0"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let config = config(&server, UpdateFormat::Deb);
        let client = build_client(&config).unwrap();
        let answer = query_feed(&client, &config).await.unwrap();
        assert_eq!(answer, FeedAnswer::NotAvailable);
    }

    #[tokio::test]
    async fn feed_200_names_the_artifact_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "url": "http://host/app.deb" })),
            )
            .mount(&server)
            .await;

        let config = config(&server, UpdateFormat::Deb);
        let client = build_client(&config).unwrap();
        let answer = query_feed(&client, &config).await.unwrap();
        assert_eq!(
            answer,
            FeedAnswer::Available {
                url: "http://host/app.deb".to_owned()
            }
        );
    }

    #[tokio::test]
    async fn feed_400_is_a_bad_request_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let config = config(&server, UpdateFormat::Deb);
        let client = build_client(&config).unwrap();
        let err = query_feed(&client, &config).await.unwrap_err();
        assert!(matches!(err, UpdateError::BadRequest));
    }

    #[tokio::test]
    async fn unexpected_feed_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = config(&server, UpdateFormat::Deb);
        let client = build_client(&config).unwrap();
        let err = query_feed(&client, &config).await.unwrap_err();
        assert!(matches!(err, UpdateError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn download_rejects_disallowed_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/app.deb"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_bytes(b"<html>captive portal</html>".to_vec()),
            )
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let config = UpdateConfig::builder(UpdateFormat::Deb, Platform::Linux, "1.2.0")
            .feed_url(format!("{}/feed", server.uri()))
            .tmp_update_path(tmp.path().join("app.deb"))
            .build();
        let client = build_client(&config).unwrap();
        let err = download_artifact(&client, &config, &format!("{}/app.deb", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, UpdateError::ContentTypeMismatch(_)));
        assert!(!config.tmp_update_path.exists());
    }

    #[tokio::test]
    async fn download_stages_the_artifact() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/app.deb"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/x-debian-package")
                    .set_body_bytes(vec![0x21, 0x3c, 0x61, 0x72]),
            )
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let config = UpdateConfig::builder(UpdateFormat::Deb, Platform::Linux, "1.2.0")
            .feed_url(format!("{}/feed", server.uri()))
            .tmp_update_path(tmp.path().join("app.deb"))
            .build();
        let client = build_client(&config).unwrap();
        let staged = download_artifact(&client, &config, &format!("{}/app.deb", server.uri()))
            .await
            .unwrap();
        assert_eq!(std::fs::read(staged).unwrap(), vec![0x21, 0x3c, 0x61, 0x72]);
    }
}
