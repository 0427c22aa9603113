//! Carpark map and driver interest HTTP handlers.
//!
//! ```text
//! GET  /api/v1/carparks
//! GET  /api/v1/map-config
//! POST /api/v1/carparks/{carParkNo}/interest
//! POST /api/v1/parking/release
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use crate::domain::{
    CarparkFeature, CarparkId, CarparkMap, Error, InterestOutcome, InterestRelease,
    InterestToggle, RefreshOutcome,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Snapshot of map-ready carparks.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CarparksResponse {
    pub carparks: Vec<CarparkFeature>,
    /// Whether this request triggered or waited on a sync pass.
    pub refresh: RefreshOutcome,
    /// RFC 3339 time of the last successful sync, if any.
    pub last_synced_at: Option<String>,
}

impl From<CarparkMap> for CarparksResponse {
    fn from(value: CarparkMap) -> Self {
        Self {
            carparks: value.carparks,
            refresh: value.refresh,
            last_synced_at: value.last_synced_at.map(|at| at.to_rfc3339()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MapConfigResponse {
    pub map_api_key: Option<String>,
}

/// Result of toggling interest in a carpark.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InterestResponse {
    pub outcome: InterestOutcome,
    #[schema(example = "ACB")]
    pub car_park_no: String,
    /// Regenerated snapshot; `null` when regeneration failed after the
    /// change was committed.
    pub carparks: Option<Vec<CarparkFeature>>,
}

impl From<InterestToggle> for InterestResponse {
    fn from(value: InterestToggle) -> Self {
        Self {
            outcome: value.outcome,
            car_park_no: value.carpark.into(),
            carparks: value.carparks,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseRequest {
    #[schema(example = 10)]
    pub reward_points: u32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseResponse {
    pub released_carpark: Option<String>,
    pub points: u32,
}

impl From<InterestRelease> for ReleaseResponse {
    fn from(value: InterestRelease) -> Self {
        Self {
            released_carpark: value.released.map(String::from),
            points: value.points,
        }
    }
}

fn parse_car_park_no(raw: &str) -> Result<CarparkId, Error> {
    CarparkId::new(raw).map_err(|err| {
        Error::invalid_request(format!("invalid carpark number: {err}")).with_details(json!({
            "field": "carParkNo",
            "value": raw,
        }))
    })
}

/// Serve the carpark snapshot, refreshing it first when stale.
#[utoipa::path(
    get,
    path = "/api/v1/carparks",
    description = "Serve map-ready carparks. A stale snapshot triggers a sync \
                   pass; the request waits for it only for a bounded time.",
    responses(
        (status = 200, description = "Carpark snapshot", body = CarparksResponse),
        (status = 503, description = "Snapshot unavailable", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["carparks"],
    operation_id = "listCarparks"
)]
#[get("/carparks")]
pub async fn list_carparks(state: web::Data<HttpState>) -> ApiResult<HttpResponse> {
    let map = state.carparks.carpark_map().await?;
    Ok(HttpResponse::Ok()
        .insert_header(("Cache-Control", "no-cache"))
        .json(CarparksResponse::from(map)))
}

/// Configuration consumed by the map view.
#[utoipa::path(
    get,
    path = "/api/v1/map-config",
    responses((status = 200, description = "Map view configuration", body = MapConfigResponse)),
    tags = ["carparks"],
    operation_id = "getMapConfig"
)]
#[get("/map-config")]
pub async fn map_config(state: web::Data<HttpState>) -> HttpResponse {
    HttpResponse::Ok().json(MapConfigResponse {
        map_api_key: state.map_view.api_key.clone(),
    })
}

/// Toggle the signed-in driver's interest in a carpark.
#[utoipa::path(
    post,
    path = "/api/v1/carparks/{carParkNo}/interest",
    params(("carParkNo" = String, Path, description = "Registry carpark number")),
    description = "Selecting the carpark the driver already follows removes the \
                   interest; selecting another one moves it.",
    responses(
        (status = 200, description = "Interest toggled", body = InterestResponse),
        (status = 400, description = "Malformed carpark number", body = Error),
        (status = 401, description = "No signed-in driver", body = Error),
        (status = 404, description = "Unknown carpark or driver", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["interest"],
    operation_id = "toggleCarparkInterest"
)]
#[post("/carparks/{carParkNo}/interest")]
pub async fn toggle_interest(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let driver = session.require_driver_id()?;
    let carpark = parse_car_park_no(&path.into_inner())?;
    let toggle = state.interest.set_interest(&driver, &carpark).await?;
    Ok(HttpResponse::Ok()
        .insert_header(("Cache-Control", "no-store"))
        .json(InterestResponse::from(toggle)))
}

/// Release the driver's interest on parking and credit reward points.
#[utoipa::path(
    post,
    path = "/api/v1/parking/release",
    request_body = ReleaseRequest,
    responses(
        (status = 200, description = "Interest released", body = ReleaseResponse),
        (status = 400, description = "Malformed request body", body = Error),
        (status = 401, description = "No signed-in driver", body = Error),
        (status = 404, description = "Unknown driver", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["interest"],
    operation_id = "releaseParkingInterest"
)]
#[post("/parking/release")]
pub async fn release_parking(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<ReleaseRequest>,
) -> ApiResult<HttpResponse> {
    let driver = session.require_driver_id()?;
    let release = state
        .interest
        .release_interest(&driver, payload.reward_points)
        .await?;
    Ok(HttpResponse::Ok()
        .insert_header(("Cache-Control", "no-store"))
        .json(ReleaseResponse::from(release)))
}

#[cfg(test)]
#[path = "carparks_tests.rs"]
mod tests;
