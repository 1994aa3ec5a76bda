pub mod config;
pub mod error;
pub mod request;
pub mod sql_safety;

pub use config::{
    AuthSection, ByCredentialsEntry, DatabaseConfig, DatabaseSection, EngineKind,
    ScheduledTaskConfig, StoredStatementConfig,
};
pub use error::{GatewayError, GatewayResult};
pub use request::{Credentials, Request, RequestItem, Response, ResultFormat, ResultItem, TopLevelError};
