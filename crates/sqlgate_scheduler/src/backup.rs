use std::path::Path;

use sqlgate_core::{GatewayError, GatewayResult};

/// Splits a `backupTemplate` like `/backups/mydb-%s.sqlite` into its
/// directory and the literal prefix/suffix around the single `%s`.
///
/// Validated at config time: exactly one `%s` in the filename portion, no
/// `%` in the directory, and the directory must already exist.
pub fn split_template(template: &str) -> GatewayResult<(std::path::PathBuf, String, String)> {
    let path = Path::new(template);
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let filename = path
        .file_name()
        .and_then(|f| f.to_str())
        .ok_or_else(|| GatewayError::Config(format!("invalid backupTemplate: {template}")))?;

    if dir.to_string_lossy().contains('%') {
        return Err(GatewayError::Config(
            "backupTemplate directory must not contain '%'".into(),
        ));
    }

    let occurrences = filename.matches("%s").count();
    if occurrences != 1 {
        return Err(GatewayError::Config(
            "backupTemplate filename must contain exactly one %s".into(),
        ));
    }

    if !dir.is_dir() {
        return Err(GatewayError::Config(format!(
            "backupTemplate directory does not exist: {}",
            dir.display()
        )));
    }

    let mut parts = filename.splitn(2, "%s");
    let prefix = parts.next().unwrap_or_default().to_string();
    let suffix = parts.next().unwrap_or_default().to_string();
    Ok((dir.to_path_buf(), prefix, suffix))
}

pub fn backup_path(dir: &Path, prefix: &str, suffix: &str, timestamp: &str) -> std::path::PathBuf {
    dir.join(format!("{prefix}{timestamp}{suffix}"))
}

/// Deletes every backup file in `dir` matching `prefix`/`suffix` except the
/// newest `num_files`, relying on the timestamp format (`YYMMDD-hhmm`)
/// being lexicographically sortable.
pub fn rotate(dir: &Path, prefix: &str, suffix: &str, num_files: u32) -> GatewayResult<()> {
    let mut matches: Vec<String> = std::fs::read_dir(dir)
        .map_err(|e| GatewayError::Execution(format!("reading backup directory: {e}")))?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.starts_with(prefix) && name.ends_with(suffix))
        .filter(|name| name.len() >= prefix.len() + suffix.len())
        .collect();

    matches.sort();

    let keep_from = matches.len().saturating_sub(num_files as usize);
    for name in &matches[..keep_from] {
        let path = dir.join(name);
        if let Err(e) = std::fs::remove_file(&path) {
            log::warn!("failed to prune backup {}: {e}", path.display());
        } else {
            log::info!("pruned old backup {}", path.display());
        }
    }

    Ok(())
}
