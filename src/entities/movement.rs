use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::tank::TankStatus;
use crate::errors::ServiceError;

/// Direction of a movement.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MovementType {
    /// Tank leaves the warehouse.
    #[sea_orm(string_value = "dispatch")]
    Dispatch,
    /// Tank comes back to the warehouse.
    #[sea_orm(string_value = "receipt")]
    Receipt,
}

impl MovementType {
    /// Status a tank ends up in after a movement of this type.
    pub fn resulting_status(self) -> TankStatus {
        match self {
            MovementType::Dispatch => TankStatus::Out,
            MovementType::Receipt => TankStatus::In,
        }
    }
}

impl FromStr for MovementType {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dispatch" => Ok(MovementType::Dispatch),
            "receipt" => Ok(MovementType::Receipt),
            _ => Err(ServiceError::ValidationError(format!(
                "invalid movement type '{}'",
                s
            ))),
        }
    }
}

/// The `movements` table: append-only audit trail of dispatches and receipts.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "movements")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub serial: String,
    pub movement_type: MovementType,
    pub movement_date: NaiveDate,
    pub project: Option<String>,
    pub responsible_engineer: Option<String>,
    pub responsible_contractor: Option<String>,
    /// Always present on rows written by this crate; older databases may hold nulls.
    pub smt_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tank::Entity",
        from = "Column::Serial",
        to = "super::tank::Column::Serial"
    )]
    Tank,
}

impl Related<super::tank::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tank.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_dispatch(&self) -> bool {
        self.movement_type == MovementType::Dispatch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn parses_movement_types_case_insensitively() {
        assert_eq!(
            "dispatch".parse::<MovementType>().unwrap(),
            MovementType::Dispatch
        );
        assert_eq!(
            " Receipt ".parse::<MovementType>().unwrap(),
            MovementType::Receipt
        );
    }

    #[test]
    fn rejects_unknown_movement_type() {
        assert_matches!(
            "transfer".parse::<MovementType>(),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn display_matches_stored_value() {
        assert_eq!(MovementType::Dispatch.to_string(), "dispatch");
        assert_eq!(TankStatus::Out.to_string(), "out");
    }
}
