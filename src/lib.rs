pub mod audit;
pub mod config;
pub mod error;
pub mod providers;
pub mod proxy;
pub mod server;
pub mod translate;
pub mod upstream;

pub use audit::{AuditLogger, AuditRecord, AuditStore, JsonlAuditStore};
pub use config::BridgeConfig;
pub use error::{BridgeError, Result};
pub use server::{build_router, AppState};
