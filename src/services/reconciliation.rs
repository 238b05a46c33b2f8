use crate::{
    db::DbPool,
    entities::{
        movement::{self, Entity as Movement},
        tank::{self, Entity as Tank, TankStatus},
    },
    errors::ServiceError,
    services::tanks::{latest_by_serial, lock_tank_rows},
};
use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, EntityTrait, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// A tank whose stored state disagrees with its movement history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TankDrift {
    pub serial: String,
    pub stored_status: TankStatus,
    pub stored_last_movement_date: Option<NaiveDate>,
    pub expected_status: TankStatus,
    pub expected_last_movement_date: NaiveDate,
}

/// Status and date every tank with history should carry, derived from its
/// latest movement alone.
pub(crate) fn expected_states(
    movements: impl IntoIterator<Item = movement::Model>,
) -> HashMap<String, (TankStatus, NaiveDate)> {
    latest_by_serial(movements)
        .into_iter()
        .map(|(serial, last)| {
            (
                serial,
                (last.movement_type.resulting_status(), last.movement_date),
            )
        })
        .collect()
}

pub(crate) fn find_drift(
    tanks: Vec<tank::Model>,
    expected: &HashMap<String, (TankStatus, NaiveDate)>,
) -> Vec<TankDrift> {
    tanks
        .into_iter()
        .filter_map(|t| {
            let (status, date) = *expected.get(&t.serial)?;
            if t.status == status && t.last_movement_date == Some(date) {
                return None;
            }
            Some(TankDrift {
                serial: t.serial,
                stored_status: t.status,
                stored_last_movement_date: t.last_movement_date,
                expected_status: status,
                expected_last_movement_date: date,
            })
        })
        .collect()
}

/// Repairs tank state that drifted away from the movement history.
#[derive(Clone)]
pub struct ReconciliationService {
    db_pool: Arc<DbPool>,
}

impl ReconciliationService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    async fn drift_on<C: ConnectionTrait>(conn: &C) -> Result<Vec<TankDrift>, ServiceError> {
        let tanks = Tank::find()
            .order_by_asc(tank::Column::Serial)
            .all(conn)
            .await?;
        let movements = Movement::find().all(conn).await?;

        Ok(find_drift(tanks, &expected_states(movements)))
    }

    /// Lists the tanks a recompute would change, without writing anything.
    #[instrument(skip(self))]
    pub async fn detect_drift(&self) -> Result<Vec<TankDrift>, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let drift = Self::drift_on(&txn).await?;
        txn.commit().await?;

        if !drift.is_empty() {
            warn!(tanks = drift.len(), "Tank state drift detected");
        }
        Ok(drift)
    }

    /// Rewrites status and last movement date of every tank from its latest
    /// movement. Tanks without movements are left alone. Returns the number of
    /// tanks whose stored state changed.
    #[instrument(skip(self))]
    pub async fn recompute_tank_states_from_history(&self) -> Result<u64, ServiceError> {
        let txn = self.db_pool.begin().await?;
        // Holding every tank row keeps movements from landing between the
        // fold and the writes.
        lock_tank_rows(&txn, None).await?;
        let drift = Self::drift_on(&txn).await?;

        for d in &drift {
            tank::ActiveModel {
                serial: Set(d.serial.clone()),
                status: Set(d.expected_status),
                last_movement_date: Set(Some(d.expected_last_movement_date)),
            }
            .update(&txn)
            .await?;

            info!(
                serial = %d.serial,
                from = %d.stored_status,
                to = %d.expected_status,
                "Tank state corrected from history"
            );
        }

        txn.commit().await?;

        let updated = drift.len() as u64;
        info!(updated, "Tank state recompute finished");
        Ok(updated)
    }
}
