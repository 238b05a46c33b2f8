pub mod health;
pub mod maintenance;
pub mod movements;
pub mod reports;
pub mod tanks;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;
