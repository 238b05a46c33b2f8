#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Local, NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, EntityTrait, NotSet, Set};
use serde_json::Value;
use tempfile::TempDir;
use tank_ledger::{
    config::AppConfig,
    db::{self, DbConfig, DbPool},
    entities::{movement, tank, MovementType, Tank, TankStatus},
    services::{movements::RecordMovement, LedgerServices},
    AppState,
};
use tower::ServiceExt;

/// Application state over a fresh SQLite database.
pub struct TestApp {
    pub db: Arc<DbPool>,
    pub services: LedgerServices,
    pub state: AppState,
    storage: Option<TempDir>,
}

impl TestApp {
    pub async fn new() -> Self {
        let pool = db::establish_connection_with_config(&DbConfig::in_memory_sqlite())
            .await
            .expect("failed to open in-memory database");
        db::init_db(&pool).await.expect("failed to run migrations");

        Self::from_pool(pool)
    }

    /// Database file in a temp dir behind the default multi-connection pool,
    /// so transactions really run side by side.
    pub async fn file_backed() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("tanks.db").display());
        let pool = db::establish_connection(&url)
            .await
            .expect("failed to open database file");
        db::init_db(&pool).await.expect("failed to run migrations");

        let mut app = Self::from_pool(pool);
        app.storage = Some(dir);
        app
    }

    /// Wraps an already prepared pool without running migrations.
    pub fn from_pool(pool: DbPool) -> Self {
        let cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );

        let db = Arc::new(pool);
        let state = AppState::new(db.clone(), cfg);
        let services = state.services.clone();

        Self {
            db,
            services,
            state,
            storage: None,
        }
    }

    pub fn router(&self) -> Router {
        tank_ledger::app_router(self.state.clone())
    }

    pub async fn seed(&self, serials: &[&str]) -> u64 {
        let serials: Vec<String> = serials.iter().map(|s| s.to_string()).collect();
        self.services
            .tanks
            .seed_tanks(&serials)
            .await
            .expect("seeding failed")
    }

    pub async fn tank(&self, serial: &str) -> tank::Model {
        self.services
            .tanks
            .get_tank(serial)
            .await
            .expect("tank lookup failed")
    }

    pub async fn movement_count(&self, serial: &str) -> usize {
        self.services
            .tanks
            .list_movements(Some(serial))
            .await
            .expect("movement listing failed")
            .len()
    }

    /// Records a complete dispatch dated `date`.
    pub async fn dispatch(
        &self,
        serial: &str,
        date: NaiveDate,
        engineer: &str,
        smt: &str,
    ) -> movement::Model {
        self.services
            .movements
            .record_movement(RecordMovement::dispatch(
                serial, date, "Atlas", engineer, "ACME", smt,
            ))
            .await
            .expect("dispatch failed")
    }

    pub async fn receipt(&self, serial: &str, date: NaiveDate, smt: &str) -> movement::Model {
        self.services
            .movements
            .record_movement(RecordMovement::receipt(serial, date, smt))
            .await
            .expect("receipt failed")
    }

    /// Writes a movement row directly, skipping every check, the way rows
    /// written by older releases or by hand look.
    pub async fn insert_raw_movement(
        &self,
        serial: &str,
        movement_type: MovementType,
        date: NaiveDate,
        engineer: Option<&str>,
    ) -> movement::Model {
        let now = Utc::now();
        movement::ActiveModel {
            id: NotSet,
            serial: Set(serial.to_string()),
            movement_type: Set(movement_type),
            movement_date: Set(date),
            project: Set(None),
            responsible_engineer: Set(engineer.map(str::to_string)),
            responsible_contractor: Set(None),
            smt_number: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db.as_ref())
        .await
        .expect("raw movement insert failed")
    }

    /// Overwrites a tank's stored state without touching its history.
    pub async fn force_tank_state(
        &self,
        serial: &str,
        status: TankStatus,
        last_movement_date: Option<NaiveDate>,
    ) {
        let existing = Tank::find_by_id(serial.to_string())
            .one(self.db.as_ref())
            .await
            .expect("tank lookup failed")
            .expect("tank exists");
        let mut active: tank::ActiveModel = existing.into();
        active.status = Set(status);
        active.last_movement_date = Set(last_movement_date);
        active
            .update(self.db.as_ref())
            .await
            .expect("tank update failed");
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };

        let response = self
            .router()
            .oneshot(request)
            .await
            .expect("router call failed");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("response is JSON")
        };

        (status, value)
    }
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn days_ago(days: i64) -> NaiveDate {
    today() - Duration::days(days)
}
