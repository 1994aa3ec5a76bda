use serde::Deserialize;

use crate::error::{GatewayError, GatewayResult};

/// Engine kind as declared in config, before normalization.
///
/// `serde(rename_all = "UPPERCASE")` accepts the canonical form; normalization
/// additionally upper-cases whatever the user wrote, so `sqlite` and `SqLiTe`
/// both resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EngineKind {
    Sqlite,
    Duckdb,
}

impl EngineKind {
    pub fn parse(raw: &str) -> GatewayResult<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "SQLITE" => Ok(Self::Sqlite),
            "DUCKDB" => Ok(Self::Duckdb),
            other => Err(GatewayError::Config(format!("invalid database type: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DatabaseSection {
    #[serde(rename = "type")]
    pub r#type: Option<String>,
    pub in_memory: bool,
    pub path: Option<String>,
    pub id: Option<String>,
    #[serde(rename = "disableWALMode")]
    pub disable_wal_mode: bool,
    pub read_only: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ByCredentialsEntry {
    pub user: String,
    pub password: Option<String>,
    pub hashed_password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AuthSection {
    pub mode: Option<String>,
    pub custom_error_code: Option<u16>,
    pub by_query: Option<String>,
    pub by_credentials: Option<Vec<ByCredentialsEntry>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScheduledTaskConfig {
    pub schedule: Option<String>,
    pub at_startup: bool,
    pub do_vacuum: bool,
    pub do_backup: bool,
    pub backup_template: Option<String>,
    pub num_files: Option<u32>,
    pub statements: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoredStatementConfig {
    pub id: String,
    pub sql: String,
}

/// One `--db` YAML document, before engine normalization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DatabaseConfig {
    pub database: DatabaseSection,
    pub auth: Option<AuthSection>,
    pub cors_origin: Option<String>,
    pub use_only_stored_statements: bool,
    /// Legacy single-task form, deprecated in favor of `scheduled_tasks`.
    pub maintenance: Option<ScheduledTaskConfig>,
    pub scheduled_tasks: Vec<ScheduledTaskConfig>,
    pub stored_statements: Vec<StoredStatementConfig>,
    pub init_statements: Vec<String>,

    /// Populated by `quick-db` / `--db` path resolution; not a YAML key.
    #[serde(skip)]
    pub source_path: Option<String>,
}

impl DatabaseConfig {
    /// Builds the config a `--quick-db <path>` flag implies: a read-write,
    /// on-disk SQLite database with no auth, no stored statements, and no
    /// scheduled tasks.
    pub fn quick(path: impl Into<String>) -> Self {
        Self {
            database: DatabaseSection {
                path: Some(path.into()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Merges the legacy `maintenance` key into `scheduled_tasks`, logging a
    /// deprecation warning. Fatal if both are present at once.
    pub fn merge_legacy_maintenance(&mut self) -> GatewayResult<()> {
        if let Some(task) = self.maintenance.take() {
            if !self.scheduled_tasks.is_empty() {
                return Err(GatewayError::Config(
                    "cannot specify both `maintenance` and `scheduledTasks`".into(),
                ));
            }
            log::warn!("`maintenance` is deprecated; use `scheduledTasks` instead");
            self.scheduled_tasks.push(task);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_kind_parse_is_case_insensitive() {
        assert_eq!(EngineKind::parse("sqlite").unwrap(), EngineKind::Sqlite);
        assert_eq!(EngineKind::parse("DuckDB").unwrap(), EngineKind::Duckdb);
        assert!(EngineKind::parse("postgres").is_err());
    }

    #[test]
    fn legacy_maintenance_merges_into_scheduled_tasks() {
        let mut cfg = DatabaseConfig {
            maintenance: Some(ScheduledTaskConfig {
                do_vacuum: true,
                at_startup: true,
                ..Default::default()
            }),
            ..Default::default()
        };
        cfg.merge_legacy_maintenance().unwrap();
        assert!(cfg.maintenance.is_none());
        assert_eq!(cfg.scheduled_tasks.len(), 1);
        assert!(cfg.scheduled_tasks[0].do_vacuum);
    }

    #[test]
    fn legacy_maintenance_conflicts_with_scheduled_tasks() {
        let mut cfg = DatabaseConfig {
            maintenance: Some(ScheduledTaskConfig::default()),
            scheduled_tasks: vec![ScheduledTaskConfig::default()],
            ..Default::default()
        };
        assert!(cfg.merge_legacy_maintenance().is_err());
    }

    #[test]
    fn disable_wal_mode_key_uses_exact_casing() {
        let yaml = "database:\n  type: SQLITE\n  path: /tmp/x.db\n  disableWALMode: true\n";
        let cfg: DatabaseConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(cfg.database.disable_wal_mode);
    }
}
