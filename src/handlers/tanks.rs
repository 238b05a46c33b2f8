use crate::{entities::tank, errors::ServiceError, handlers::AppState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct SeedTanksRequest {
    #[validate(length(min = 1, message = "at least one serial is required"))]
    pub serials: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SeedTanksResponse {
    pub created: u64,
}

/// GET /api/v1/tanks
pub async fn list_tanks(
    State(state): State<AppState>,
) -> Result<Json<Vec<tank::Model>>, ServiceError> {
    let tanks = state.services.tanks.list_tanks().await?;
    Ok(Json(tanks))
}

/// GET /api/v1/tanks/:serial
pub async fn get_tank(
    State(state): State<AppState>,
    Path(serial): Path<String>,
) -> Result<Json<tank::Model>, ServiceError> {
    let tank = state.services.tanks.get_tank(&serial).await?;
    Ok(Json(tank))
}

/// POST /api/v1/tanks/seed
pub async fn seed_tanks(
    State(state): State<AppState>,
    Json(payload): Json<SeedTanksRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;
    let created = state.services.tanks.seed_tanks(&payload.serials).await?;

    let status = if created > 0 {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(SeedTanksResponse { created })))
}
