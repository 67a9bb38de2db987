//! Seams between the update client and its host application.
//!
//! The client decides *when* something should happen; the host decides how
//! it looks (dialogs) and how the process is torn down (relaunch). Each
//! seam is a trait so tests can observe the client through mocks.

use async_trait::async_trait;

use crate::error::{Result, UpdateError};
use crate::events::QuitIntent;

/// The user's answer to "install the downloaded update now?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallChoice {
    /// Keep the pending update and re-offer it at the next check.
    Later,
    InstallNow,
}

/// Modal notices shown for user-triggered checks only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    CheckFailed(String),
    NoUpdateAvailable,
}

/// Dialog rendering, supplied by the UI layer.
#[async_trait]
pub trait UserPrompt: Send + Sync {
    async fn ask_to_install(&self) -> InstallChoice;
    async fn show_notice(&self, notice: Notice);
}

/// Process lifecycle hooks of the host application.
#[async_trait]
pub trait AppLifecycle: Send + Sync {
    /// Give quit listeners a chance to veto the install restart.
    async fn before_quit(&self, intent: &QuitIntent);

    /// Restart the process through the host's relaunch facility.
    async fn relaunch(&self);

    /// Hand off to the host updater's install-and-quit path.
    async fn quit_and_install(&self);

    fn relaunch_supported(&self) -> bool {
        true
    }
}

/// Outcome reported by a host-native update mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeCheckOutcome {
    /// The host updater found, downloaded and staged an update.
    UpdateDownloaded,
    UpdateNotAvailable,
}

/// The host platform's own update facility (Mac/Windows). It owns the whole
/// check-and-download cycle; the client only consumes the outcome.
#[async_trait]
pub trait NativeUpdater: Send + Sync {
    async fn check_for_updates(&self) -> Result<NativeCheckOutcome>;
}

/// Placeholder for builds without a host update mechanism.
pub struct UnsupportedNativeUpdater;

#[async_trait]
impl NativeUpdater for UnsupportedNativeUpdater {
    async fn check_for_updates(&self) -> Result<NativeCheckOutcome> {
        Err(UpdateError::Unsupported("no native update mechanism"))
    }
}
