use std::path::PathBuf;
use std::time::Duration;

use feed::{Platform, UpdateFormat};

/// Daily.
pub const SCHEDULED_CHECK_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

const DEFAULT_APP_NAME: &str = "app";

/// Defaults for HTTP requests made against the feed and artifact hosts.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub timeout: Duration,
    pub follow_redirects: bool,
    pub max_redirects: u32,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            follow_redirects: false,
            max_redirects: 0,
        }
    }
}

/// Configuration for one update client, fixed at construction.
///
/// Defaults are resolved exactly once when the builder finishes; the client
/// never re-merges settings afterwards.
#[derive(Debug, Clone)]
pub struct UpdateConfig {
    /// Feed endpoint queried directly on Linux; native platforms carry the
    /// feed URL into the host update mechanism instead.
    pub feed_url: Option<String>,
    pub format: UpdateFormat,
    pub name: String,
    pub platform: Platform,
    pub product_name: String,
    pub request: RequestOptions,
    /// Where a downloaded package is staged between download and install.
    pub tmp_update_path: PathBuf,
    /// Version of the running application.
    pub version: String,
    /// Delay between periodic background checks.
    pub check_interval: Duration,
}

impl UpdateConfig {
    pub fn builder(
        format: UpdateFormat,
        platform: Platform,
        version: impl Into<String>,
    ) -> UpdateConfigBuilder {
        UpdateConfigBuilder {
            format,
            platform,
            version: version.into(),
            feed_url: None,
            name: None,
            product_name: None,
            request: RequestOptions::default(),
            tmp_update_path: None,
            check_interval: SCHEDULED_CHECK_INTERVAL,
        }
    }
}

/// Builder for [`UpdateConfig`].
pub struct UpdateConfigBuilder {
    format: UpdateFormat,
    platform: Platform,
    version: String,
    feed_url: Option<String>,
    name: Option<String>,
    product_name: Option<String>,
    request: RequestOptions,
    tmp_update_path: Option<PathBuf>,
    check_interval: Duration,
}

impl UpdateConfigBuilder {
    pub fn feed_url(mut self, url: impl Into<String>) -> Self {
        self.feed_url = Some(url.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn product_name(mut self, product_name: impl Into<String>) -> Self {
        self.product_name = Some(product_name.into());
        self
    }

    pub fn request_options(mut self, request: RequestOptions) -> Self {
        self.request = request;
        self
    }

    pub fn tmp_update_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.tmp_update_path = Some(path.into());
        self
    }

    pub fn check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    pub fn build(self) -> UpdateConfig {
        let name = self.name.unwrap_or_else(|| DEFAULT_APP_NAME.to_owned());
        let product_name = self.product_name.unwrap_or_else(|| name.clone());
        let tmp_update_path = self.tmp_update_path.unwrap_or_else(|| {
            PathBuf::from(format!("/tmp/{name}.{}", self.format.as_str()))
        });
        UpdateConfig {
            feed_url: self.feed_url,
            format: self.format,
            name,
            platform: self.platform,
            product_name,
            request: self.request,
            tmp_update_path,
            version: self.version,
            check_interval: self.check_interval,
        }
    }
}
