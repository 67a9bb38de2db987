//! Differential AppImage updates.
//!
//! AppImages update in place through the bundled `appimageupdate` tool,
//! which applies a zsync delta against the published image. The tool does
//! not use exit codes to distinguish "updated" from "already current", so
//! its summary line is parsed: `used N local, fetched M` with `M > 0` means
//! new bytes were pulled and the image on disk changed.

use std::path::PathBuf;
use std::sync::OnceLock;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{Result, UpdateError};

const UPDATE_TOOL: &str = "appimageupdate";

/// Result of running the differential update against the running image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppImageOutcome {
    /// New bytes were fetched; the image on disk is now the new version.
    Updated,
    AlreadyCurrent,
}

/// Seam over the in-place image update.
#[async_trait]
pub trait AppImageUpdater: Send + Sync {
    async fn update(&self) -> Result<AppImageOutcome>;
}

/// Runs the `appimageupdate` tool against the mounted image.
pub struct AppImageUpdateTool {
    program: String,
    image_path: PathBuf,
}

impl AppImageUpdateTool {
    pub fn new(image_path: impl Into<PathBuf>) -> Self {
        Self {
            program: UPDATE_TOOL.to_owned(),
            image_path: image_path.into(),
        }
    }

    /// Locate the running image through the `APPIMAGE` variable the AppImage
    /// runtime exports.
    pub fn from_env() -> Result<Self> {
        let image_path = std::env::var_os("APPIMAGE")
            .ok_or(UpdateError::Unsupported("not running from an AppImage"))?;
        Ok(Self::new(PathBuf::from(image_path)))
    }

    #[cfg(test)]
    fn with_program(program: impl Into<String>, image_path: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            image_path: image_path.into(),
        }
    }
}

#[async_trait]
impl AppImageUpdater for AppImageUpdateTool {
    async fn update(&self) -> Result<AppImageOutcome> {
        info!(image = %self.image_path.display(), "running differential update");
        let output = Command::new(&self.program)
            .arg(&self.image_path)
            .output()
            .await
            .map_err(|e| UpdateError::Subprocess(e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(UpdateError::Subprocess(format!(
                "{UPDATE_TOOL} exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let fetched = parse_fetched_bytes(&stdout)?;
        debug!(fetched, "differential update finished");
        if fetched > 0 {
            Ok(AppImageOutcome::Updated)
        } else {
            Ok(AppImageOutcome::AlreadyCurrent)
        }
    }
}

/// Default updater that locates the image at update time, so building the
/// hooks never fails on platforms without the `APPIMAGE` variable.
pub struct EnvAppImageUpdater;

#[async_trait]
impl AppImageUpdater for EnvAppImageUpdater {
    async fn update(&self) -> Result<AppImageOutcome> {
        AppImageUpdateTool::from_env()?.update().await
    }
}

/// Extract the fetched byte count from the tool's summary line.
fn parse_fetched_bytes(stdout: &str) -> Result<u64> {
    static SUMMARY: OnceLock<regex::Regex> = OnceLock::new();
    let re = SUMMARY.get_or_init(|| {
        regex::Regex::new(r"used [0-9]+ local, fetched ([0-9]+)").unwrap()
    });
    let captures = re.captures(stdout).ok_or_else(|| {
        UpdateError::Subprocess(format!("no update summary in tool output: {stdout:?}"))
    })?;
    captures[1]
        .parse()
        .map_err(|_| UpdateError::Subprocess("fetched byte count out of range".to_owned()))
}
