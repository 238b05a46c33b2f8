use crate::{
    entities::{movement, MovementType},
    errors::ServiceError,
    handlers::AppState,
    services::movements::RecordMovement,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize)]
pub struct MovementFilters {
    pub serial: Option<String>,
}

/// Body of `POST /api/v1/movements`. `movement_type` is kept as text so an
/// unknown value is answered with 400 rather than a deserialization rejection.
#[derive(Debug, Deserialize, Validate)]
pub struct RecordMovementRequest {
    #[validate(length(min = 1, message = "serial is required"))]
    pub serial: String,
    pub movement_type: String,
    /// Defaults to today's local date.
    pub movement_date: Option<NaiveDate>,
    pub project: Option<String>,
    pub responsible_engineer: Option<String>,
    pub responsible_contractor: Option<String>,
    pub smt_number: Option<String>,
}

impl RecordMovementRequest {
    fn into_command(self, today: NaiveDate) -> Result<RecordMovement, ServiceError> {
        let movement_type: MovementType = self.movement_type.parse()?;
        Ok(RecordMovement {
            serial: self.serial.trim().to_string(),
            movement_type,
            movement_date: self.movement_date.unwrap_or(today),
            project: self.project,
            engineer: self.responsible_engineer,
            contractor: self.responsible_contractor,
            smt_number: self.smt_number,
        })
    }
}

/// GET /api/v1/movements?serial=
pub async fn list_movements(
    State(state): State<AppState>,
    Query(filters): Query<MovementFilters>,
) -> Result<Json<Vec<movement::Model>>, ServiceError> {
    let movements = state
        .services
        .tanks
        .list_movements(filters.serial.as_deref())
        .await?;
    Ok(Json(movements))
}

/// POST /api/v1/movements
pub async fn record_movement(
    State(state): State<AppState>,
    Json(payload): Json<RecordMovementRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;
    let command = payload.into_command(Local::now().date_naive())?;
    let recorded = state.services.movements.record_movement(command).await?;
    Ok((StatusCode::CREATED, Json(recorded)))
}
