//! Version and host environment API types.

use serde::{Deserialize, Serialize};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Operating environment the server is running in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub enum Environment {
    /// Native Windows host
    Windows,
    /// Linux host (any non-ARM architecture, not containerized)
    Linux,
    /// Linux inside a Docker container
    #[serde(rename = "Linux-Docker")]
    LinuxDocker,
    /// Linux on aarch64, not containerized
    #[serde(rename = "Linux-ARM")]
    LinuxArm,
}

impl Environment {
    /// Label used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Windows => "Windows",
            Self::Linux => "Linux",
            Self::LinuxDocker => "Linux-Docker",
            Self::LinuxArm => "Linux-ARM",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response of `GET /api/version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct VersionInformation {
    /// Version of the running server
    pub version: String,
    /// Latest released version, `null` until the release check has succeeded once
    pub latest_version: Option<String>,
    /// Environment the server is running in
    pub environment: Environment,
    /// Configured recording backend
    pub backend: String,
    /// Configured encoder
    pub encoder: String,
}
