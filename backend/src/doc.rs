//! OpenAPI documentation for the REST API.
//!
//! Registers the HTTP paths from the inbound layer, their payload schemas and
//! the session cookie carrying the driver id. Swagger UI serves the document
//! in debug builds.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::{CarparkFeature, Error, ErrorCode, InterestOutcome, RefreshOutcome};
use crate::inbound::http::carparks::{
    CarparksResponse, InterestResponse, MapConfigResponse, ReleaseRequest, ReleaseResponse,
};

struct SessionCookieAddon;

impl Modify for SessionCookieAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie carrying the signed-in driver id.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SessionCookieAddon),
    info(
        title = "Carpark backend API",
        description = "Carpark availability map and driver interest tracking."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::carparks::list_carparks,
        crate::inbound::http::carparks::map_config,
        crate::inbound::http::carparks::toggle_interest,
        crate::inbound::http::carparks::release_parking,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        CarparkFeature,
        CarparksResponse,
        Error,
        ErrorCode,
        InterestOutcome,
        InterestResponse,
        MapConfigResponse,
        RefreshOutcome,
        ReleaseRequest,
        ReleaseResponse,
    )),
    tags(
        (name = "carparks", description = "Carpark map snapshot"),
        (name = "interest", description = "Driver interest in carparks"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
