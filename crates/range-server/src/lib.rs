//! Artifact distribution server for application updates.
//!
//! Two routes, both stateless per request:
//!
//! - `/feed` — the update feed the Linux client polls: reports whether a
//!   newer artifact exists for a platform/format pair.
//! - `/download/<path>` — byte-range file serving (RFC 7233) over the
//!   artifact directory, including `multipart/byteranges` responses with
//!   exact upfront `Content-Length` accounting for differential (zsync)
//!   consumers.
//!
//! The multipart boundary is generated once per server instance; it only
//! has to avoid accidental collision with artifact bytes.

use std::path::PathBuf;
use std::sync::Arc;

use axum::routing::{any, get};
use axum::Router;
use feed::{
    resolve_mac_url, resolve_urls, resolve_windows_urls, Arch, DownloadSettings, Platform,
    ResolvedUrls, UpdateFormat, WindowsDownloadUrls,
};
use semver::Version;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

mod artifact;
mod error;
mod feed_route;
mod mime;
mod multipart;
mod range;

pub use error::{ConfigError, ErrorResponse, FeedError};
pub use feed_route::UpdateLocation;
pub use range::{parse_range_header, ByteSpan, RangeOutcome};

/// Shared server state: artifact root, multipart boundary and the resolved
/// download URL set for the currently served release.
pub struct AppState {
    pub artifact_root: PathBuf,
    pub boundary: String,
    current_version: Version,
    mac_url: Option<String>,
    windows_urls: Option<WindowsDownloadUrls>,
    linux_urls: Option<ResolvedUrls>,
}

impl AppState {
    /// Resolve the download URL set once and fix the multipart boundary for
    /// the lifetime of this server instance.
    pub fn new(artifact_root: PathBuf, settings: &DownloadSettings) -> Result<Self, ConfigError> {
        Ok(Self {
            artifact_root,
            boundary: multipart::generate_boundary(),
            current_version: Version::parse(&settings.version)?,
            mac_url: resolve_mac_url(settings),
            windows_urls: resolve_windows_urls(settings),
            linux_urls: resolve_urls(settings, Platform::Linux),
        })
    }

    pub fn current_version(&self) -> &Version {
        &self.current_version
    }

    /// Download URL offered to a client of the given platform and format.
    pub fn download_url(&self, platform: Platform, format: UpdateFormat) -> Option<String> {
        match platform {
            Platform::Mac => self.mac_url.clone(),
            Platform::Windows => self
                .windows_urls
                .as_ref()
                .map(|urls| urls.installer.clone()),
            Platform::Linux => {
                let linux_format = format.linux_format()?;
                self.linux_urls
                    .as_ref()
                    .and_then(|urls| urls.url_for(Arch::X64, linux_format))
                    .map(str::to_owned)
            }
        }
    }
}

/// Create the axum router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/feed", get(feed_route::check_update))
        // All methods routed so non-GET can answer 405 with an Allow header.
        .route("/download/{*path}", any(artifact::serve_artifact))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
