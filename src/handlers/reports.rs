use crate::{
    errors::ServiceError,
    handlers::AppState,
    services::reports::{EngineerOutCount, TankMovementCount},
};
use axum::{extract::State, Json};

/// GET /api/v1/reports/out-by-engineer
pub async fn out_by_engineer(
    State(state): State<AppState>,
) -> Result<Json<Vec<EngineerOutCount>>, ServiceError> {
    let rows = state
        .services
        .reports
        .summary_current_out_by_engineer()
        .await?;
    Ok(Json(rows))
}

/// GET /api/v1/reports/movement-counts
pub async fn movement_counts(
    State(state): State<AppState>,
) -> Result<Json<Vec<TankMovementCount>>, ServiceError> {
    let rows = state.services.reports.movement_counts_by_tank().await?;
    Ok(Json(rows))
}
