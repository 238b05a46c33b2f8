// Tank registry and movement ledger
pub mod movements;
pub mod tanks;

// Reporting and maintenance
pub mod reconciliation;
pub mod reports;

use crate::db::DbPool;
use std::sync::Arc;

use movements::MovementService;
use reconciliation::ReconciliationService;
use reports::ReportService;
use tanks::TankService;

/// Services sharing one connection pool, as used by the HTTP handlers and the CLI.
#[derive(Clone)]
pub struct LedgerServices {
    pub tanks: Arc<TankService>,
    pub movements: Arc<MovementService>,
    pub reports: Arc<ReportService>,
    pub reconciliation: Arc<ReconciliationService>,
}

impl LedgerServices {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self {
            tanks: Arc::new(TankService::new(db_pool.clone())),
            movements: Arc::new(MovementService::new(db_pool.clone())),
            reports: Arc::new(ReportService::new(db_pool.clone())),
            reconciliation: Arc::new(ReconciliationService::new(db_pool)),
        }
    }
}
