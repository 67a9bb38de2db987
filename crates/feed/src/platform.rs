use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Platforms an update feed can serve, named by their runtime identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "darwin")]
    Mac,
    #[serde(rename = "linux")]
    Linux,
    #[serde(rename = "win32")]
    Windows,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Mac, Platform::Linux, Platform::Windows];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Mac => "darwin",
            Platform::Linux => "linux",
            Platform::Windows => "win32",
        }
    }

    /// Platform of the running process.
    pub fn current() -> Option<Platform> {
        match std::env::consts::OS {
            "macos" => Some(Platform::Mac),
            "linux" => Some(Platform::Linux),
            "windows" => Some(Platform::Windows),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "darwin" => Ok(Platform::Mac),
            "linux" => Ok(Platform::Linux),
            "win32" => Ok(Platform::Windows),
            other => Err(format!("unknown platform: {other}")),
        }
    }
}

/// Supported build architectures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Arch {
    #[serde(rename = "ia32")]
    Ia32,
    #[serde(rename = "x64")]
    X64,
}

impl Arch {
    pub const ALL: [Arch; 2] = [Arch::Ia32, Arch::X64];

    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::Ia32 => "ia32",
            Arch::X64 => "x64",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Linux packaging formats an update can be distributed as.
///
/// AppImages carry their own embedded differential updater and are served
/// through byte-range requests; deb/rpm packages are downloaded whole and
/// handed to the system package manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LinuxFormat {
    AppImage,
    #[serde(rename = "deb")]
    Deb,
    #[serde(rename = "rpm")]
    Rpm,
}

impl LinuxFormat {
    pub const ALL: [LinuxFormat; 3] = [LinuxFormat::AppImage, LinuxFormat::Deb, LinuxFormat::Rpm];

    pub fn as_str(&self) -> &'static str {
        match self {
            LinuxFormat::AppImage => "AppImage",
            LinuxFormat::Deb => "deb",
            LinuxFormat::Rpm => "rpm",
        }
    }

    /// Content types accepted when downloading an artifact of this format.
    /// AppImages update through their embedded differential tool instead of
    /// a whole-file download, so they have no allow-list here.
    pub fn allowed_mime_types(&self) -> &'static [&'static str] {
        match self {
            LinuxFormat::AppImage => &[],
            LinuxFormat::Deb => &[
                "application/x-debian-package",
                "application/vnd.debian.binary-package",
            ],
            LinuxFormat::Rpm => &["application/x-rpm", "application/octet-stream"],
        }
    }
}

impl fmt::Display for LinuxFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinuxFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AppImage" => Ok(LinuxFormat::AppImage),
            "deb" => Ok(LinuxFormat::Deb),
            "rpm" => Ok(LinuxFormat::Rpm),
            other => Err(format!("unknown linux format: {other}")),
        }
    }
}

/// Update delivery mechanism configured for a running application instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateFormat {
    /// Delegate to the host platform's own update facility (Mac/Windows).
    #[serde(rename = "native")]
    Native,
    #[serde(rename = "deb")]
    Deb,
    #[serde(rename = "rpm")]
    Rpm,
    #[serde(rename = "AppImage")]
    AppImage,
}

impl UpdateFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateFormat::Native => "native",
            UpdateFormat::Deb => "deb",
            UpdateFormat::Rpm => "rpm",
            UpdateFormat::AppImage => "AppImage",
        }
    }

    /// The Linux packaging format this update format maps to, if any.
    pub fn linux_format(&self) -> Option<LinuxFormat> {
        match self {
            UpdateFormat::Native => None,
            UpdateFormat::Deb => Some(LinuxFormat::Deb),
            UpdateFormat::Rpm => Some(LinuxFormat::Rpm),
            UpdateFormat::AppImage => Some(LinuxFormat::AppImage),
        }
    }
}

impl fmt::Display for UpdateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpdateFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "native" => Ok(UpdateFormat::Native),
            "deb" => Ok(UpdateFormat::Deb),
            "rpm" => Ok(UpdateFormat::Rpm),
            "AppImage" => Ok(UpdateFormat::AppImage),
            other => Err(format!("unknown update format: {other}")),
        }
    }
}
