use crate::{
    db::{self, DbPool},
    entities::{
        movement::{self, MovementType},
        tank::{self, Entity as Tank, TankStatus},
    },
    errors::ServiceError,
    services::tanks::lock_tank_rows,
};
use chrono::{Local, NaiveDate, Utc};
use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, EntityTrait, NotSet, QueryFilter,
    QuerySelect, Set, TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

static SMT_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{5}$").expect("SMT pattern is valid"));

/// A dispatch or receipt to append to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMovement {
    pub serial: String,
    pub movement_type: MovementType,
    pub movement_date: NaiveDate,
    pub project: Option<String>,
    pub engineer: Option<String>,
    pub contractor: Option<String>,
    pub smt_number: Option<String>,
}

impl RecordMovement {
    pub fn dispatch(
        serial: impl Into<String>,
        movement_date: NaiveDate,
        project: impl Into<String>,
        engineer: impl Into<String>,
        contractor: impl Into<String>,
        smt_number: impl Into<String>,
    ) -> Self {
        Self {
            serial: serial.into(),
            movement_type: MovementType::Dispatch,
            movement_date,
            project: Some(project.into()),
            engineer: Some(engineer.into()),
            contractor: Some(contractor.into()),
            smt_number: Some(smt_number.into()),
        }
    }

    pub fn receipt(
        serial: impl Into<String>,
        movement_date: NaiveDate,
        smt_number: impl Into<String>,
    ) -> Self {
        Self {
            serial: serial.into(),
            movement_type: MovementType::Receipt,
            movement_date,
            project: None,
            engineer: None,
            contractor: None,
            smt_number: Some(smt_number.into()),
        }
    }
}

/// Checks an SMT number and returns it trimmed. Every movement needs one and it
/// must be exactly five ASCII digits.
pub fn validate_smt_number(smt_number: Option<&str>) -> Result<String, ServiceError> {
    let smt = smt_number.unwrap_or_default().trim();
    if SMT_NUMBER.is_match(smt) {
        Ok(smt.to_string())
    } else {
        Err(ServiceError::ValidationError(
            "SMT number is required and must be exactly 5 digits".to_string(),
        ))
    }
}

/// Trims optional free text; blank becomes `None`.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Appends movements and keeps the owning tank's status in step with them.
#[derive(Clone)]
pub struct MovementService {
    db_pool: Arc<DbPool>,
}

impl MovementService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Records a movement dated no later than today's local date.
    pub async fn record_movement(
        &self,
        command: RecordMovement,
    ) -> Result<movement::Model, ServiceError> {
        self.record_movement_as_of(command, Local::now().date_naive())
            .await
    }

    /// Records a movement, treating `today` as the latest acceptable date.
    ///
    /// The tank update and the movement insert share one transaction. The tank
    /// row is claimed with a write before it is read, so concurrent writers
    /// queue on the lock and then see the status left by the winner. The
    /// status flip is also a compare-and-set on the status read, so a writer
    /// that loses the race on the same serial fails with `Conflict` instead of
    /// producing a second outstanding dispatch.
    #[instrument(
        skip(self, command),
        fields(serial = %command.serial, movement_type = %command.movement_type)
    )]
    pub async fn record_movement_as_of(
        &self,
        command: RecordMovement,
        today: NaiveDate,
    ) -> Result<movement::Model, ServiceError> {
        let movement_type = command.movement_type;

        let result = self
            .db_pool
            .transaction::<_, movement::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    if lock_tank_rows(txn, Some(&command.serial)).await? == 0 {
                        return Err(ServiceError::tank_not_found(&command.serial));
                    }

                    let mut query = Tank::find_by_id(command.serial.clone());
                    if db::supports_row_locks(txn) {
                        query = query.lock_exclusive();
                    }
                    let tank = query
                        .one(txn)
                        .await?
                        .ok_or_else(|| ServiceError::tank_not_found(&command.serial))?;

                    if command.movement_date > today {
                        return Err(ServiceError::ValidationError(format!(
                            "movement date {} is in the future",
                            command.movement_date
                        )));
                    }

                    let smt_number = validate_smt_number(command.smt_number.as_deref())?;
                    let project = non_blank(command.project);
                    let engineer = non_blank(command.engineer);
                    let contractor = non_blank(command.contractor);

                    match command.movement_type {
                        MovementType::Dispatch => {
                            if tank.status == TankStatus::Out {
                                return Err(ServiceError::Conflict(format!(
                                    "tank {} is already out; it cannot be dispatched again",
                                    tank.serial
                                )));
                            }
                            if project.is_none() || engineer.is_none() || contractor.is_none() {
                                return Err(ServiceError::ValidationError(
                                    "a dispatch requires project, responsible engineer and responsible contractor"
                                        .to_string(),
                                ));
                            }
                        }
                        MovementType::Receipt => {
                            if tank.status == TankStatus::In {
                                return Err(ServiceError::Conflict(format!(
                                    "tank {} is already in the warehouse; it cannot be received",
                                    tank.serial
                                )));
                            }
                        }
                    }

                    let flipped = Tank::update_many()
                        .col_expr(
                            tank::Column::Status,
                            Expr::value(command.movement_type.resulting_status()),
                        )
                        .col_expr(
                            tank::Column::LastMovementDate,
                            Expr::value(Some(command.movement_date)),
                        )
                        .filter(tank::Column::Serial.eq(tank.serial.as_str()))
                        .filter(tank::Column::Status.eq(tank.status))
                        .exec(txn)
                        .await?;

                    if flipped.rows_affected != 1 {
                        return Err(ServiceError::Conflict(format!(
                            "tank {} was modified concurrently; reload and retry",
                            tank.serial
                        )));
                    }

                    let now = Utc::now();
                    let inserted = movement::ActiveModel {
                        id: NotSet,
                        serial: Set(tank.serial),
                        movement_type: Set(command.movement_type),
                        movement_date: Set(command.movement_date),
                        project: Set(project),
                        responsible_engineer: Set(engineer),
                        responsible_contractor: Set(contractor),
                        smt_number: Set(Some(smt_number)),
                        created_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(txn)
                    .await?;

                    Ok(inserted)
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            });

        match &result {
            Ok(recorded) => {
                counter!("tank_ledger.movements.recorded", 1, "type" => movement_type.to_string());
                info!(
                    movement_id = recorded.id,
                    movement_date = %recorded.movement_date,
                    "Movement recorded"
                );
            }
            Err(err) if err.is_domain_error() => {
                counter!("tank_ledger.movements.rejected", 1, "type" => movement_type.to_string());
                warn!(error = %err, "Movement rejected");
            }
            Err(_) => {}
        }

        result
    }
}
