use sqlgate_core::{DatabaseConfig, EngineKind, GatewayError, GatewayResult, RequestItem};

/// Isolation level the pipeline asks the driver for when it opens a
/// transaction. SQLite and DuckDB both accept this as an advisory hint;
/// neither driver distinguishes finer levels than read-committed today, but
/// the type exists so a future engine can.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Isolation {
    ReadCommitted,
    EngineDefault,
}

/// Per-engine quirks the transaction pipeline defers to rather than special
/// casing inline: version string, default isolation, config normalization,
/// a pre-flight compatibility check over a whole request, and JSON
/// post-processing of a single result cell.
pub trait Engine: Send + Sync {
    fn kind(&self) -> EngineKind;

    fn get_version(&self) -> GatewayResult<String>;

    fn default_isolation(&self) -> Isolation;

    /// Whether this engine supports running a read-only transaction the
    /// normal way, or must execute directly on the connection instead.
    fn supports_readonly_transaction(&self) -> bool {
        true
    }

    /// Fills in defaults, expands `~`, derives `Id`, builds the connection
    /// string tail, and rejects combinations the engine cannot honor.
    /// Mutates `cfg` in place.
    fn check_config(&self, cfg: &mut DatabaseConfig) -> GatewayResult<()>;

    /// Pre-flight check over an entire incoming transaction, run before any
    /// item is dispatched. DuckDB uses this to reject `noFail` outright.
    fn check_request(&self, items: &[RequestItem]) -> GatewayResult<()> {
        let _ = items;
        Ok(())
    }

    /// Converts a single driver-produced JSON cell into the shape clients
    /// should see (e.g. DuckDB's map-typed cells into string-keyed objects).
    fn sanitize_response_field(&self, value: serde_json::Value) -> serde_json::Value {
        value
    }
}

pub fn engine_for(kind: EngineKind) -> Box<dyn Engine> {
    match kind {
        EngineKind::Sqlite => Box::new(crate::sqlite_engine::SqliteEngine),
        EngineKind::Duckdb => Box::new(crate::duckdb_engine::DuckdbEngine),
    }
}

/// `ToCreate` = `InMemory ∨ (path does not exist)`.
pub fn to_create(cfg: &DatabaseConfig) -> bool {
    cfg.database.in_memory
        || match &cfg.database.path {
            Some(path) => !std::path::Path::new(path).exists(),
            None => true,
        }
}

pub fn expand_home(path: &str) -> GatewayResult<String> {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| GatewayError::Config("could not resolve home directory".into()))?;
        Ok(home.join(rest).to_string_lossy().into_owned())
    } else {
        Ok(path.to_string())
    }
}

pub fn derive_id_from_path(path: &str) -> Option<String> {
    std::path::Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
}
