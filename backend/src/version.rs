//! Version information embedded at compile time.

use crate::state::AppState;
use tvhub_types::VersionInformation;

/// Package version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// User agent sent with outbound requests, e.g. `tvhub/0.1.0`.
pub fn default_user_agent() -> String {
    format!("tvhub/{}", VERSION)
}

/// Collect the version information reported by `GET /api/version`.
///
/// Never fails: if the release lookup is unavailable, `latest_version`
/// carries the last known value or `None`.
pub async fn get(state: &AppState) -> VersionInformation {
    let latest_version = state.version_cache().latest_version().await;
    let general = state.general();

    VersionInformation {
        version: VERSION.to_string(),
        latest_version,
        environment: state.environment(),
        backend: general.backend.clone(),
        encoder: general.encoder.clone(),
    }
}
