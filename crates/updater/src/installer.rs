//! Privileged package installation.
//!
//! Installing a `.deb` or `.rpm` needs root, so the install step is a single
//! elevated subprocess. The command is built here and handed to a
//! [`PrivilegedExecutor`], which is the seam tests replace to observe the
//! exact invocation without touching the system package manager.

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use feed::LinuxFormat;

use crate::error::{Result, UpdateError};

/// A fully-built elevated invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivilegedCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Label shown by the elevation prompt.
    pub prompt: String,
}

impl PrivilegedCommand {
    /// Package-manager install command for a downloaded artifact.
    pub fn install(format: LinuxFormat, artifact: &Path, product_name: &str) -> Result<Self> {
        let program = match format {
            LinuxFormat::Deb => "dpkg",
            LinuxFormat::Rpm => "rpm",
            LinuxFormat::AppImage => {
                return Err(UpdateError::Unsupported(
                    "AppImage updates replace the image in place",
                ))
            }
        };
        Ok(Self {
            program: program.to_owned(),
            args: vec!["-i".to_owned(), artifact.display().to_string()],
            prompt: format!("{product_name} Update"),
        })
    }
}

/// Runs a [`PrivilegedCommand`] with elevated rights.
#[async_trait]
pub trait PrivilegedExecutor: Send + Sync {
    async fn run(&self, command: &PrivilegedCommand) -> Result<()>;
}

/// Elevates through `pkexec`, the stock PolicyKit askpass path on desktop
/// Linux.
pub struct PkexecExecutor;

#[async_trait]
impl PrivilegedExecutor for PkexecExecutor {
    async fn run(&self, command: &PrivilegedCommand) -> Result<()> {
        info!(program = %command.program, "running privileged install");
        let output = Command::new("pkexec")
            .arg(&command.program)
            .args(&command.args)
            .output()
            .await
            .map_err(|e| UpdateError::Subprocess(e.to_string()))?;
        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(UpdateError::Install(format!(
                "{} exited with {}: {}",
                command.program,
                output.status,
                stderr.trim()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn deb_install_uses_dpkg() {
        let cmd = PrivilegedCommand::install(
            LinuxFormat::Deb,
            &PathBuf::from("/tmp/app.deb"),
            "My App",
        )
        .unwrap();
        assert_eq!(cmd.program, "dpkg");
        assert_eq!(cmd.args, vec!["-i", "/tmp/app.deb"]);
        assert_eq!(cmd.prompt, "My App Update");
    }

    #[test]
    fn rpm_install_uses_rpm() {
        let cmd =
            PrivilegedCommand::install(LinuxFormat::Rpm, &PathBuf::from("/tmp/app.rpm"), "App")
                .unwrap();
        assert_eq!(cmd.program, "rpm");
        assert_eq!(cmd.args[0], "-i");
    }

    #[test]
    fn appimage_is_rejected() {
        let err = PrivilegedCommand::install(
            LinuxFormat::AppImage,
            &PathBuf::from("/tmp/app.AppImage"),
            "App",
        )
        .unwrap_err();
        assert!(matches!(err, UpdateError::Unsupported(_)));
    }
}
