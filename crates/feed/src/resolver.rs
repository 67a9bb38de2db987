use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use url::Url;

use crate::platform::{Arch, LinuxFormat, Platform};

/// Name used when the settings do not provide one.
const APP_DEFAULT_NAME: &str = "app";

const VERSION_PLACEHOLDER: &str = "{{version}}";
const ARCH_PLACEHOLDER: &str = "{{arch}}";
const FORMAT_PLACEHOLDER: &str = "{{ext}}";

/// URL templates per target platform.
///
/// The Windows entry may be a plain releases-directory URL or a split
/// `{releases, installer}` pair when the installer lives elsewhere.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DownloadUrls {
    #[serde(default)]
    pub darwin: Option<String>,
    #[serde(default)]
    pub linux: Option<String>,
    #[serde(default)]
    pub win32: Option<WindowsUrls>,
}

/// The two accepted shapes of the Windows download configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WindowsUrls {
    Releases(String),
    Split { releases: String, installer: String },
}

/// Release publishing settings, fixed at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadSettings {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    pub version: String,
    pub root_url: String,
    #[serde(default)]
    pub download_urls: DownloadUrls,
}

impl DownloadSettings {
    pub fn app_name(&self) -> &str {
        self.name.as_deref().unwrap_or(APP_DEFAULT_NAME)
    }
}

/// Concrete URLs produced from a single template.
///
/// `{{arch}}` and `{{ext}}` each introduce a mapping level: a template with
/// both yields a tree keyed by architecture then format, a template with one
/// yields a flat map, a template with neither yields a single URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedUrls {
    Single(String),
    ByFormat(BTreeMap<LinuxFormat, String>),
    ByArch(BTreeMap<Arch, String>),
    ByArchAndFormat(BTreeMap<Arch, BTreeMap<LinuxFormat, String>>),
}

impl ResolvedUrls {
    /// Look up the URL for a given format/architecture pair.
    pub fn url_for(&self, arch: Arch, format: LinuxFormat) -> Option<&str> {
        match self {
            ResolvedUrls::Single(url) => Some(url),
            ResolvedUrls::ByFormat(by_format) => by_format.get(&format).map(String::as_str),
            ResolvedUrls::ByArch(by_arch) => by_arch.get(&arch).map(String::as_str),
            ResolvedUrls::ByArchAndFormat(tree) => tree
                .get(&arch)
                .and_then(|by_format| by_format.get(&format))
                .map(String::as_str),
        }
    }
}

/// Resolved Windows download locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowsDownloadUrls {
    /// Directory the native updater polls for release metadata.
    pub releases: String,
    /// Full installer download, cache-busted unless versioned.
    pub installer: String,
}

/// Resolve the Mac download URL by substituting the app version.
pub fn resolve_mac_url(settings: &DownloadSettings) -> Option<String> {
    let template = settings.download_urls.darwin.as_deref()?;
    Some(template.replace(VERSION_PLACEHOLDER, &settings.version))
}

/// Resolve the Windows releases/installer URL pair.
///
/// Only the installer URL may be versioned: each versioned installer is a
/// physically distinct file, so it needs no cache busting. The releases URL
/// must stay stable for the native updater to poll, and a mutable
/// (non-versioned) installer gets a `cb` query parameter so stale caches are
/// bypassed.
pub fn resolve_windows_urls(settings: &DownloadSettings) -> Option<WindowsDownloadUrls> {
    let urls = settings.download_urls.win32.as_ref()?;

    let (releases, installer, installer_is_versioned) = match urls {
        WindowsUrls::Releases(releases) => {
            if releases.contains(VERSION_PLACEHOLDER) {
                error!("only the Windows installer URL may be versioned; configure a split releases/installer pair");
                return None;
            }
            // "<Name>Setup.exe" is the file name the installer packager produces.
            let installer = join_url_path(releases, &format!("{}Setup.exe", settings.app_name()));
            (releases.clone(), installer, false)
        }
        WindowsUrls::Split {
            releases,
            installer,
        } => {
            if releases.contains(VERSION_PLACEHOLDER) {
                error!("only the Windows installer URL may be versioned");
                return None;
            }
            let versioned = installer.contains(VERSION_PLACEHOLDER);
            let installer = installer.replace(VERSION_PLACEHOLDER, &settings.version);
            (releases.clone(), installer, versioned)
        }
    };

    let installer = if installer_is_versioned {
        installer
    } else {
        cachebusted_url(&installer)
    };

    Some(WindowsDownloadUrls {
        releases,
        installer,
    })
}

/// Resolve the URL template configured for `platform` into concrete URLs.
///
/// Substitutes the exact-token placeholders `{{version}}`, `{{name}}`,
/// `{{platform}}` and `{{rootUrl}}`, resolves schemeless URLs against the
/// root URL, then expands `{{arch}}`/`{{ext}}` into a URL tree. Unrecognized
/// tokens are left untouched so a misconfiguration stays visible upstream.
pub fn resolve_urls(settings: &DownloadSettings, platform: Platform) -> Option<ResolvedUrls> {
    let template = match platform {
        Platform::Mac => settings.download_urls.darwin.as_deref(),
        Platform::Linux => settings.download_urls.linux.as_deref(),
        // Windows has its own releases/installer shape; see resolve_windows_urls.
        Platform::Windows => match settings.download_urls.win32.as_ref() {
            Some(WindowsUrls::Releases(releases)) => Some(releases.as_str()),
            Some(WindowsUrls::Split { .. }) | None => None,
        },
    };
    let template = match template {
        Some(template) if !template.is_empty() => template,
        _ => {
            warn!(platform = %platform, "no download URL template configured");
            return None;
        }
    };

    let replaces = [
        ("{{name}}", slugify(settings.app_name())),
        ("{{platform}}", platform.as_str().to_string()),
        ("{{rootUrl}}", settings.root_url.clone()),
        (VERSION_PLACEHOLDER, settings.version.clone()),
    ];
    let mut resolved = template.to_string();
    for (token, value) in &replaces {
        resolved = resolved.replace(token, value);
    }

    if !has_http_scheme(&resolved) {
        resolved = match resolve_against_root(&settings.root_url, &resolved) {
            Some(absolute) => absolute,
            None => {
                error!(root_url = %settings.root_url, "invalid root URL; cannot resolve relative template");
                return None;
            }
        };
    }

    let has_arch = resolved.contains(ARCH_PLACEHOLDER);
    let has_format = resolved.contains(FORMAT_PLACEHOLDER);
    Some(match (has_arch, has_format) {
        (true, true) => {
            let mut tree = BTreeMap::new();
            for arch in Arch::ALL {
                let per_arch = resolved.replace(ARCH_PLACEHOLDER, arch.as_str());
                let mut by_format = BTreeMap::new();
                for format in LinuxFormat::ALL {
                    by_format.insert(format, per_arch.replace(FORMAT_PLACEHOLDER, format.as_str()));
                }
                tree.insert(arch, by_format);
            }
            ResolvedUrls::ByArchAndFormat(tree)
        }
        (true, false) => {
            let by_arch = Arch::ALL
                .into_iter()
                .map(|arch| (arch, resolved.replace(ARCH_PLACEHOLDER, arch.as_str())))
                .collect();
            ResolvedUrls::ByArch(by_arch)
        }
        (false, true) => {
            let by_format = LinuxFormat::ALL
                .into_iter()
                .map(|format| (format, resolved.replace(FORMAT_PLACEHOLDER, format.as_str())))
                .collect();
            ResolvedUrls::ByFormat(by_format)
        }
        (false, false) => ResolvedUrls::Single(resolved),
    })
}

fn has_http_scheme(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn resolve_against_root(root_url: &str, relative: &str) -> Option<String> {
    let base = Url::parse(root_url).ok()?;
    base.join(relative).ok().map(|url| url.to_string())
}

fn join_url_path(base: &str, segment: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), segment)
}

/// Append a `cb=<unix-millis>` query parameter so repeatedly overwritten
/// files are fetched past intermediate caches.
fn cachebusted_url(url: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}cb={}", unix_millis())
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or(0)
}

/// Lowercased, ascii-folded, kebab-cased app name used for `{{name}}`.
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;
    for ch in name.chars().map(ascii_fold) {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }
    slug
}

/// Fold common Latin-1 accented characters onto their ascii base letter.
fn ascii_fold(ch: char) -> char {
    match ch {
        'à'..='å' | 'À'..='Å' => 'a',
        'ç' | 'Ç' => 'c',
        'è'..='ë' | 'È'..='Ë' => 'e',
        'ì'..='ï' | 'Ì'..='Ï' => 'i',
        'ñ' | 'Ñ' => 'n',
        'ò'..='ö' | 'Ò'..='Ö' => 'o',
        'ù'..='ü' | 'Ù'..='Ü' => 'u',
        'ý' | 'ÿ' | 'Ý' => 'y',
        other => other,
    }
}
