use crate::{
    db::DbPool,
    entities::{
        movement::{self, Entity as Movement, MovementType},
        tank::{self, Entity as Tank, TankStatus},
    },
    errors::ServiceError,
    services::tanks::latest_by_serial,
};
use sea_orm::{
    sea_query::{Expr, Query},
    ColumnTrait, EntityTrait, FromQueryResult, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{instrument, warn};

/// Bucket used for dispatches recorded without an engineer.
pub const NO_ENGINEER_LABEL: &str = "(no engineer)";

/// Number of tanks currently out under one responsible engineer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineerOutCount {
    pub responsible_engineer: String,
    pub count: u64,
}

/// Movement totals for one tank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TankMovementCount {
    pub serial: String,
    pub status: TankStatus,
    pub dispatches: u64,
    pub receipts: u64,
    pub total: u64,
}

#[derive(Debug, FromQueryResult)]
struct MovementTypeCount {
    serial: String,
    movement_type: MovementType,
    movements: i64,
}

/// Counts out tanks per engineer of their latest dispatch, largest first and
/// then by name. Tanks without a dispatch as their latest movement are skipped.
pub(crate) fn tally_out_by_engineer(
    out_tanks: &[tank::Model],
    latest: &HashMap<String, movement::Model>,
) -> Vec<EngineerOutCount> {
    let mut counts: HashMap<String, u64> = HashMap::new();

    for t in out_tanks {
        match latest.get(&t.serial) {
            Some(last) if last.is_dispatch() => {
                let engineer = last
                    .responsible_engineer
                    .as_deref()
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                    .unwrap_or(NO_ENGINEER_LABEL);
                *counts.entry(engineer.to_string()).or_default() += 1;
            }
            Some(last) => warn!(
                serial = %t.serial,
                latest_movement_id = last.id,
                "Tank is out but its latest movement is a receipt; run reconciliation"
            ),
            None => warn!(
                serial = %t.serial,
                "Tank is out but has no movements; run reconciliation"
            ),
        }
    }

    let mut rows: Vec<EngineerOutCount> = counts
        .into_iter()
        .map(|(responsible_engineer, count)| EngineerOutCount {
            responsible_engineer,
            count,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.responsible_engineer.cmp(&b.responsible_engineer))
    });
    rows
}

/// Read-only aggregate views over the registry and the movement history.
#[derive(Clone)]
pub struct ReportService {
    db_pool: Arc<DbPool>,
}

impl ReportService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Tanks currently out, grouped by the engineer responsible for their
    /// latest dispatch.
    #[instrument(skip(self))]
    pub async fn summary_current_out_by_engineer(
        &self,
    ) -> Result<Vec<EngineerOutCount>, ServiceError> {
        let txn = self.db_pool.begin().await?;

        let out_tanks = Tank::find()
            .filter(tank::Column::Status.eq(TankStatus::Out))
            .order_by_asc(tank::Column::Serial)
            .all(&txn)
            .await?;

        if out_tanks.is_empty() {
            txn.commit().await?;
            return Ok(Vec::new());
        }

        // Subquery rather than a bound list: the number of out tanks is unbounded.
        let out_serials = Query::select()
            .column(tank::Column::Serial)
            .from(Tank)
            .and_where(tank::Column::Status.eq(TankStatus::Out))
            .to_owned();
        let movements = Movement::find()
            .filter(movement::Column::Serial.in_subquery(out_serials))
            .all(&txn)
            .await?;
        txn.commit().await?;

        let latest = latest_by_serial(movements);
        Ok(tally_out_by_engineer(&out_tanks, &latest))
    }

    /// Dispatch and receipt totals for every tank, ordered by serial. Tanks
    /// without history are included with zero counts.
    #[instrument(skip(self))]
    pub async fn movement_counts_by_tank(&self) -> Result<Vec<TankMovementCount>, ServiceError> {
        let txn = self.db_pool.begin().await?;

        let tanks = Tank::find()
            .order_by_asc(tank::Column::Serial)
            .all(&txn)
            .await?;

        let grouped = Movement::find()
            .select_only()
            .column(movement::Column::Serial)
            .column(movement::Column::MovementType)
            .column_as(Expr::col(movement::Column::Id).count(), "movements")
            .group_by(movement::Column::Serial)
            .group_by(movement::Column::MovementType)
            .into_model::<MovementTypeCount>()
            .all(&txn)
            .await?;
        txn.commit().await?;

        let mut by_serial: BTreeMap<String, (u64, u64)> = BTreeMap::new();
        for row in grouped {
            let entry = by_serial.entry(row.serial).or_default();
            let n = u64::try_from(row.movements).unwrap_or_default();
            match row.movement_type {
                MovementType::Dispatch => entry.0 += n,
                MovementType::Receipt => entry.1 += n,
            }
        }

        Ok(tanks
            .into_iter()
            .map(|t| {
                let (dispatches, receipts) = by_serial.get(&t.serial).copied().unwrap_or_default();
                TankMovementCount {
                    serial: t.serial,
                    status: t.status,
                    dispatches,
                    receipts,
                    total: dispatches + receipts,
                }
            })
            .collect())
    }
}
