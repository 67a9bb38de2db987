//! Download URL resolution for application updates.
//!
//! Release artifacts are published under templated URLs configured per
//! platform. This crate turns those templates into concrete download
//! locations by exact-token placeholder substitution (`{{version}}`,
//! `{{name}}`, `{{platform}}`, `{{rootUrl}}`, `{{arch}}`, `{{ext}}`),
//! expanding `{{arch}}`/`{{ext}}` into URL trees keyed by architecture
//! and package format. Resolution is a pure function of the settings:
//! no I/O, no state.

mod platform;
mod resolver;

pub use platform::{Arch, LinuxFormat, Platform, UpdateFormat};
pub use resolver::{
    DownloadSettings, DownloadUrls, ResolvedUrls, WindowsDownloadUrls, WindowsUrls,
    resolve_mac_url, resolve_urls, resolve_windows_urls,
};
