use crate::{
    db::DbPool,
    entities::{
        movement::{self, Entity as Movement},
        tank::{self, Entity as Tank, TankStatus},
    },
    errors::ServiceError,
};
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, Select, Set,
    TransactionTrait,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Orders movements most recent first: by date, then by insertion order.
pub(crate) fn newest_first(select: Select<Movement>) -> Select<Movement> {
    select
        .order_by_desc(movement::Column::MovementDate)
        .order_by_desc(movement::Column::Id)
}

/// Picks the most recent movement of every serial, using the same
/// `(movement_date, id)` ordering as [`newest_first`].
pub(crate) fn latest_by_serial(
    movements: impl IntoIterator<Item = movement::Model>,
) -> HashMap<String, movement::Model> {
    let mut latest: HashMap<String, movement::Model> = HashMap::new();
    for m in movements {
        match latest.get(&m.serial) {
            Some(current) if (current.movement_date, current.id) >= (m.movement_date, m.id) => {}
            _ => {
                latest.insert(m.serial.clone(), m);
            }
        }
    }
    latest
}

/// Rows per INSERT while seeding, well under SQLite's bound-parameter limit.
const SEED_CHUNK: usize = 500;

/// No-op `UPDATE` over one tank (or all of them) that must run before any read
/// in a write transaction. SQLite cannot upgrade a read transaction to a write
/// once another connection is writing, so the write lock is taken first and
/// contenders wait on the busy timeout instead of failing. On Postgres it
/// locks the matched rows. Returns the number of tanks matched.
pub(crate) async fn lock_tank_rows<C: ConnectionTrait>(
    conn: &C,
    serial: Option<&str>,
) -> Result<u64, DbErr> {
    let mut touch =
        Tank::update_many().col_expr(tank::Column::Status, Expr::col(tank::Column::Status).into());
    if let Some(serial) = serial {
        touch = touch.filter(tank::Column::Serial.eq(serial));
    }
    Ok(touch.exec(conn).await?.rows_affected)
}

/// Read access to the tank registry plus the seeding and removal plumbing
/// used by outer surfaces.
#[derive(Clone)]
pub struct TankService {
    db_pool: Arc<DbPool>,
}

impl TankService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// All tanks ordered by serial.
    #[instrument(skip(self))]
    pub async fn list_tanks(&self) -> Result<Vec<tank::Model>, ServiceError> {
        let tanks = Tank::find()
            .order_by_asc(tank::Column::Serial)
            .all(self.db_pool.as_ref())
            .await?;
        Ok(tanks)
    }

    #[instrument(skip(self))]
    pub async fn get_tank(&self, serial: &str) -> Result<tank::Model, ServiceError> {
        Tank::find_by_id(serial.to_string())
            .one(self.db_pool.as_ref())
            .await?
            .ok_or_else(|| ServiceError::tank_not_found(serial))
    }

    /// Movements newest first, optionally restricted to one serial. A blank
    /// serial means no filter.
    #[instrument(skip(self))]
    pub async fn list_movements(
        &self,
        serial: Option<&str>,
    ) -> Result<Vec<movement::Model>, ServiceError> {
        let mut query = Movement::find();
        if let Some(serial) = serial.map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(movement::Column::Serial.eq(serial));
        }

        let movements = newest_first(query).all(self.db_pool.as_ref()).await?;
        Ok(movements)
    }

    /// Creates a tank for every serial that does not exist yet. Existing tanks
    /// keep their status and history. Returns how many tanks were created.
    #[instrument(skip(self, serials), fields(requested = serials.len()))]
    pub async fn seed_tanks(&self, serials: &[String]) -> Result<u64, ServiceError> {
        let wanted: BTreeSet<String> = serials
            .iter()
            .map(|s| s.trim())
            .filter(|s| {
                if s.is_empty() {
                    warn!("Skipping blank tank serial while seeding");
                }
                !s.is_empty()
            })
            .map(str::to_string)
            .collect();

        let wanted: Vec<String> = wanted.into_iter().collect();
        let mut inserted = 0u64;

        // INSERT .. ON CONFLICT DO NOTHING writes first and never overwrites an
        // existing tank, so no read is needed.
        let txn = self.db_pool.begin().await?;
        for chunk in wanted.chunks(SEED_CHUNK) {
            let rows = chunk.iter().map(|serial| tank::ActiveModel {
                serial: Set(serial.clone()),
                status: Set(TankStatus::In),
                last_movement_date: Set(None),
            });

            inserted += Tank::insert_many(rows)
                .on_conflict(
                    OnConflict::column(tank::Column::Serial)
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(&txn)
                .await?;
        }
        txn.commit().await?;

        info!(inserted, "Tank seeding completed");
        Ok(inserted)
    }

    /// Removes a tank together with its movement history. The foreign key does
    /// not cascade, so movements are deleted first in the same transaction.
    /// Returns the number of movements removed.
    #[instrument(skip(self))]
    pub async fn delete_tank(&self, serial: &str) -> Result<u64, ServiceError> {
        let txn = self.db_pool.begin().await?;

        let removed = Movement::delete_many()
            .filter(movement::Column::Serial.eq(serial))
            .exec(&txn)
            .await?
            .rows_affected;

        let deleted = Tank::delete_by_id(serial.to_string())
            .exec(&txn)
            .await?
            .rows_affected;
        if deleted == 0 {
            // Dropping the transaction rolls it back.
            return Err(ServiceError::tank_not_found(serial));
        }
        txn.commit().await?;

        warn!(serial, movements_removed = removed, "Tank deleted");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::MovementType;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn movement(id: i32, serial: &str, date: (i32, u32, u32), kind: MovementType) -> movement::Model {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        movement::Model {
            id,
            serial: serial.to_string(),
            movement_type: kind,
            movement_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            project: None,
            responsible_engineer: None,
            responsible_contractor: None,
            smt_number: Some("00001".into()),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn latest_prefers_later_date_then_higher_id() {
        let latest = latest_by_serial(vec![
            movement(1, "T1", (2024, 3, 1), MovementType::Dispatch),
            movement(3, "T1", (2024, 2, 1), MovementType::Receipt),
            movement(2, "T1", (2024, 3, 1), MovementType::Receipt),
            movement(4, "T2", (2024, 1, 1), MovementType::Dispatch),
        ]);

        assert_eq!(latest.len(), 2);
        assert_eq!(latest["T1"].id, 2);
        assert_eq!(latest["T2"].id, 4);
    }

    #[test]
    fn latest_ignores_input_order() {
        let forward = latest_by_serial(vec![
            movement(1, "T1", (2024, 3, 1), MovementType::Dispatch),
            movement(2, "T1", (2024, 3, 1), MovementType::Receipt),
        ]);
        let backward = latest_by_serial(vec![
            movement(2, "T1", (2024, 3, 1), MovementType::Receipt),
            movement(1, "T1", (2024, 3, 1), MovementType::Dispatch),
        ]);
        assert_eq!(forward["T1"].id, backward["T1"].id);
    }
}
