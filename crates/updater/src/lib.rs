//! Self-update client for desktop builds.
//!
//! The client periodically asks a release feed whether a newer version
//! exists, downloads the packaged artifact, and walks the user through the
//! install and restart. Mac and Windows delegate the download to the host
//! platform's update mechanism; on Linux the client handles `.deb`/`.rpm`
//! packages itself (privileged install through the system package manager)
//! and updates AppImages in place with a differential fetch.
//!
//! ```ignore
//! use std::sync::Arc;
//! use feed::{Platform, UpdateFormat};
//! use updater::{UpdateClient, UpdateConfig, UpdaterHooks};
//!
//! # async fn demo(prompt: Arc<dyn updater::UserPrompt>, lifecycle: Arc<dyn updater::AppLifecycle>) {
//! let config = UpdateConfig::builder(UpdateFormat::Deb, Platform::Linux, "1.4.2")
//!     .feed_url("https://releases.example.com/feed")
//!     .name("browser")
//!     .product_name("Browser")
//!     .build();
//! let client = UpdateClient::spawn(config, UpdaterHooks::new(prompt, lifecycle));
//! let handle = client.handle();
//! handle.check_for_updates(true).await.ok();
//! # }
//! ```

mod appimage;
mod client;
mod config;
mod error;
mod events;
mod hooks;
mod installer;
mod linux;

pub use appimage::{AppImageOutcome, AppImageUpdateTool, AppImageUpdater, EnvAppImageUpdater};
pub use client::{default_format_for, UpdateClient, UpdaterHandle, UpdaterHooks};
pub use config::{
    RequestOptions, UpdateConfig, UpdateConfigBuilder, SCHEDULED_CHECK_INTERVAL,
};
pub use error::{Result, UpdateError};
pub use events::{QuitIntent, UpdaterEvent, UpdaterStatus};
pub use hooks::{
    AppLifecycle, InstallChoice, NativeCheckOutcome, NativeUpdater, Notice,
    UnsupportedNativeUpdater, UserPrompt,
};
pub use installer::{PkexecExecutor, PrivilegedCommand, PrivilegedExecutor};
