use chrono::NaiveDate;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Where a tank currently is.
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
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TankStatus {
    /// At the warehouse.
    #[sea_orm(string_value = "in")]
    In,
    /// Dispatched to a project.
    #[sea_orm(string_value = "out")]
    Out,
}

impl Default for TankStatus {
    fn default() -> Self {
        TankStatus::In
    }
}

/// The `tanks` table.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tanks")]
pub struct Model {
    /// Tank serial, unique across the fleet.
    #[sea_orm(primary_key, auto_increment = false)]
    pub serial: String,
    pub status: TankStatus,
    /// Date of the most recent dispatch or receipt; `None` until the first one.
    pub last_movement_date: Option<NaiveDate>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::movement::Entity")]
    Movement,
}

impl Related<super::movement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Movement.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_out(&self) -> bool {
        self.status == TankStatus::Out
    }
}
