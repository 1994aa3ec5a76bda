pub mod connection;
pub mod database;
pub mod duckdb_engine;
pub mod engine;
pub mod registry;
pub mod sqlite_engine;

pub use connection::{GatewayConnection, Params, RawResultSet};
pub use database::Database;
pub use engine::{engine_for, Engine, Isolation};
pub use registry::{build_registry, DbRegistry, PendingTask};
