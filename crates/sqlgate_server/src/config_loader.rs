use sqlgate_core::{DatabaseConfig, GatewayError, GatewayResult};

use crate::cli::Cli;

/// Loads every `--db` YAML document, or synthesizes the equivalent config
/// for `--quick-db` in code rather than reading a file.
pub fn load_configs(cli: &Cli) -> GatewayResult<Vec<DatabaseConfig>> {
    if let Some(path) = &cli.quick_db {
        return Ok(vec![DatabaseConfig::quick(path.clone())]);
    }

    cli.db
        .iter()
        .map(|path| {
            let contents = std::fs::read_to_string(path).map_err(|e| {
                GatewayError::Config(format!("reading config {path}: {e}"))
            })?;
            let mut cfg: DatabaseConfig = serde_yaml::from_str(&contents)
                .map_err(|e| GatewayError::Config(format!("parsing config {path}: {e}")))?;
            cfg.source_path = Some(path.clone());
            Ok(cfg)
        })
        .collect()
}
