use crate::{
    errors::ServiceError, handlers::AppState, services::reconciliation::TankDrift,
};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct RecomputeResponse {
    pub updated: u64,
}

/// POST /api/v1/maintenance/recompute
pub async fn recompute(
    State(state): State<AppState>,
) -> Result<Json<RecomputeResponse>, ServiceError> {
    let updated = state
        .services
        .reconciliation
        .recompute_tank_states_from_history()
        .await?;
    Ok(Json(RecomputeResponse { updated }))
}

/// GET /api/v1/maintenance/drift
pub async fn drift(State(state): State<AppState>) -> Result<Json<Vec<TankDrift>>, ServiceError> {
    let drift = state.services.reconciliation.detect_drift().await?;
    Ok(Json(drift))
}
