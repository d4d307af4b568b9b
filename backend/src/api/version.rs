//! Version information API endpoints.

use axum::extract::State;
use axum::Json;
use tvhub_types::VersionInformation;

use crate::state::AppState;

/// Get version information
///
/// Returns the running server version, the latest released version, the
/// environment the server runs in, and the configured backend and encoder.
/// `latest_version` is `null` until the release check has succeeded once;
/// a failing release check never fails this endpoint.
#[utoipa::path(
    get,
    path = "/api/version",
    tag = "Version",
    responses(
        (status = 200, description = "Version information", body = VersionInformation)
    )
)]
pub async fn get_version(State(state): State<AppState>) -> Json<VersionInformation> {
    Json(crate::version::get(&state).await)
}
