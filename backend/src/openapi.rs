//! OpenAPI documentation configuration.

use tvhub_types::{Environment, VersionInformation};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(crate::api::version::get_version),
    components(schemas(VersionInformation, Environment)),
    tags(
        (name = "Version", description = "Server version and environment endpoints")
    ),
    info(
        title = "tvhub API",
        description = "REST API of the tvhub server",
        license(
            name = "MIT OR Apache-2.0"
        )
    )
)]
pub struct ApiDoc;
