//! Detection of the environment the server runs in.

use std::path::Path;
use tvhub_types::Environment;

/// File Docker creates at the root of every container.
pub const CONTAINER_MARKER: &str = "/.dockerenv";

/// Classify a host from its OS name, container marker and CPU architecture.
///
/// Every non-Windows OS is treated as a Linux host. A container always wins
/// over the architecture.
pub fn classify(os: &str, container_marker_present: bool, arch: &str) -> Environment {
    if os == "windows" {
        Environment::Windows
    } else if container_marker_present {
        Environment::LinuxDocker
    } else if arch == "aarch64" {
        Environment::LinuxArm
    } else {
        Environment::Linux
    }
}

/// Detect the environment of the current process.
pub fn detect() -> Environment {
    classify(
        std::env::consts::OS,
        Path::new(CONTAINER_MARKER).exists(),
        std::env::consts::ARCH,
    )
}
