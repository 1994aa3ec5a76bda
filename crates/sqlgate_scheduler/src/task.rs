use std::sync::Arc;

use chrono::Utc;
use sqlgate_engine::Database;

use crate::backup;

/// Runs one task's callback body under the owning database's mutex:
/// `VACUUM`, then a timestamped backup with rotation, then any arbitrary
/// statements, in that order. Every step logs its own failure and keeps
/// going rather than aborting the remaining steps or poisoning later
/// ticks/tasks.
pub async fn run_task_body(
    database: &Arc<Database>,
    config: &sqlgate_core::ScheduledTaskConfig,
) {
    let conn = database.conn.lock().await;

    if config.do_vacuum {
        if let Err(e) = conn.execute_raw("VACUUM") {
            log::error!("database '{}': VACUUM failed: {e}", database.id);
        } else {
            log::info!("database '{}': VACUUM complete", database.id);
        }
    }

    if config.do_backup {
        if let Some(template) = &config.backup_template {
            run_backup(database, &conn, template, config.num_files.unwrap_or(1));
        } else {
            log::error!(
                "database '{}': doBackup is set but backupTemplate is missing",
                database.id
            );
        }
    }

    for statement in &config.statements {
        if let Err(e) = conn.execute_raw(statement) {
            log::error!(
                "database '{}': scheduled statement failed: {e}",
                database.id
            );
        }
    }
}

fn run_backup(
    database: &Arc<Database>,
    conn: &sqlgate_engine::GatewayConnection,
    template: &str,
    num_files: u32,
) {
    let (dir, prefix, suffix) = match backup::split_template(template) {
        Ok(parts) => parts,
        Err(e) => {
            log::error!("database '{}': invalid backup template: {e}", database.id);
            return;
        }
    };

    let timestamp = Utc::now().format("%y%m%d-%H%M").to_string();
    let destination = backup::backup_path(&dir, &prefix, &suffix, &timestamp);

    if let Err(e) = conn.vacuum_into(&destination.to_string_lossy()) {
        log::error!("database '{}': backup failed: {e}", database.id);
        return;
    }
    log::info!("database '{}': backup written to {}", database.id, destination.display());

    if let Err(e) = backup::rotate(&dir, &prefix, &suffix, num_files) {
        log::error!("database '{}': backup rotation failed: {e}", database.id);
    }
}
