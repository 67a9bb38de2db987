//! Update feed endpoint consumed by the Linux update client.
//!
//! `GET /feed?format=<fmt>&platform=<plat>&version=<ver>` answers `400` for
//! missing/invalid parameters, `204` when no newer artifact is offered, and
//! `200` with a JSON `{"url": ...}` body otherwise.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use feed::{Platform, UpdateFormat};
use semver::Version;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::FeedError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    platform: Option<String>,
    #[serde(default)]
    version: Option<String>,
}

/// Body of a positive feed response.
#[derive(Debug, Serialize)]
pub struct UpdateLocation {
    pub url: String,
}

pub async fn check_update(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FeedQuery>,
) -> Result<Response, FeedError> {
    let format = parse_param::<UpdateFormat>(query.format.as_deref(), "format")?;
    let platform = parse_param::<Platform>(query.platform.as_deref(), "platform")?;
    let raw_version = query
        .version
        .as_deref()
        .ok_or(FeedError::MissingParam("version"))?;
    let client_version = Version::parse(raw_version).map_err(|_| FeedError::InvalidParam {
        name: "version",
        value: raw_version.to_owned(),
    })?;

    if client_version >= *state.current_version() {
        debug!(%client_version, %platform, "client already up to date");
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    match state.download_url(platform, format) {
        Some(url) => {
            debug!(%platform, %format, url, "offering update");
            Ok((StatusCode::OK, Json(UpdateLocation { url })).into_response())
        }
        None => {
            // Nothing published for this platform/format pair.
            debug!(%platform, %format, "no download configured");
            Ok(StatusCode::NO_CONTENT.into_response())
        }
    }
}

fn parse_param<T: std::str::FromStr>(
    raw: Option<&str>,
    name: &'static str,
) -> Result<T, FeedError> {
    let raw = raw.ok_or(FeedError::MissingParam(name))?;
    raw.parse().map_err(|_| FeedError::InvalidParam {
        name,
        value: raw.to_owned(),
    })
}
