mod backup;
mod task;

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sqlgate_core::{GatewayError, GatewayResult};
use sqlgate_engine::PendingTask;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

pub use task::run_task_body;

/// The one process-wide cron scheduler. Holds a join handle per registered
/// cron entry; stopping it lets any currently-running tick finish but
/// schedules no further ones, mirroring the graceful-shutdown contract.
pub struct Scheduler {
    stop: Arc<AtomicBool>,
    wake: Arc<Notify>,
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    /// Validates every pending task, runs the `atStartup` ones synchronously
    /// (before any cron tick can fire), then starts a cron loop per
    /// `schedule` entry. Cron itself is only started if at least one
    /// schedule-bearing task exists.
    pub async fn start(pending: Vec<PendingTask>) -> GatewayResult<Self> {
        let mut scheduled = Vec::new();

        for task in &pending {
            if task.config.schedule.is_none() && !task.config.at_startup {
                return Err(GatewayError::Config(format!(
                    "scheduled task on database '{}' must set schedule or atStartup",
                    task.database.id
                )));
            }

            if let Some(expr) = &task.config.schedule {
                let parsed = cron::Schedule::from_str(&with_seconds_field(expr)).map_err(|e| {
                    GatewayError::Config(format!("invalid cron expression '{expr}': {e}"))
                })?;
                log::info!(
                    "database '{}': registered schedule '{}'",
                    task.database.id,
                    expr
                );
                scheduled.push((task.database.clone(), task.config.clone(), parsed));
            }
        }

        for task in &pending {
            if task.config.at_startup {
                log::info!("database '{}': running startup task", task.database.id);
                task::run_task_body(&task.database, &task.config).await;
            }
        }

        let stop = Arc::new(AtomicBool::new(false));
        let wake = Arc::new(Notify::new());
        let mut handles = Vec::new();

        for (database, config, schedule) in scheduled {
            let stop = stop.clone();
            let wake = wake.clone();
            handles.push(tokio::spawn(async move {
                loop {
                    if stop.load(Ordering::SeqCst) {
                        break;
                    }

                    let Some(next) = schedule.upcoming(chrono::Utc).next() else {
                        break;
                    };
                    let until = (next - chrono::Utc::now())
                        .to_std()
                        .unwrap_or(std::time::Duration::ZERO);

                    tokio::select! {
                        _ = tokio::time::sleep(until) => {}
                        _ = wake.notified() => { break; }
                    }

                    if stop.load(Ordering::SeqCst) {
                        break;
                    }

                    task::run_task_body(&database, &config).await;
                }
            }));
        }

        Ok(Self { stop, wake, handles })
    }

    /// Stops accepting new ticks and waits for any in-flight one to finish.
    pub async fn stop(self) {
        self.stop.store(true, Ordering::SeqCst);
        self.wake.notify_waiters();
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

/// `cron` expects a 6-field (with-seconds) expression; the spec's schedules
/// are the conventional 5-field form, so a `0` seconds field is prepended.
fn with_seconds_field(expr: &str) -> String {
    format!("0 {expr}")
}
