//! Periodic removal of old completed tasks.
//!
//! Every tick the sweeper asks the store for completed tasks created before
//! `now - retention`, appends each one as a JSON line to the audit log and then
//! hard-deletes it. The first failure inside a batch stops that batch; whatever
//! is left is picked up on the next tick.

use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::config::Config;
use crate::models::Task;
use crate::store::TaskStore;

/// Outcome of a single sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Stale tasks returned by the store.
    pub found: usize,
    /// Ids logged and hard-deleted, in order.
    pub purged: Vec<i64>,
    /// True when a failure cut the batch short or the tick was skipped.
    pub aborted: bool,
}

#[derive(Clone)]
pub struct RetentionSweeper {
    store: Arc<dyn TaskStore>,
    audit_log: PathBuf,
    retention: chrono::Duration,
    interval: Duration,
}

impl RetentionSweeper {
    pub fn new(
        store: Arc<dyn TaskStore>,
        audit_log: impl Into<PathBuf>,
        retention: chrono::Duration,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            audit_log: audit_log.into(),
            retention,
            interval,
        }
    }

    pub fn from_config(store: Arc<dyn TaskStore>, config: &Config) -> Self {
        Self::new(
            store,
            config.audit_log_path.clone(),
            config.retention(),
            config.sweep_interval,
        )
    }

    /// Sweeps once per interval until `shutdown` flips to `true` or its sender
    /// is dropped. The first sweep happens one full interval after start.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        log::info!(
            "retention sweeper started: every {:?}, retention {} days, audit log {}",
            self.interval,
            self.retention.num_days(),
            self.audit_log.display()
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.sweep_once().await;
                    if report.found > 0 {
                        log::info!(
                            "sweep purged {} of {} stale tasks{}",
                            report.purged.len(),
                            report.found,
                            if report.aborted { " (aborted)" } else { "" }
                        );
                    } else {
                        log::debug!("sweep found no stale tasks");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        log::info!("retention sweeper stopped");
    }

    /// Runs one sweep. Never panics and never returns an error; failures are
    /// logged and reflected in the report.
    pub async fn sweep_once(&self) -> SweepReport {
        let mut report = SweepReport::default();
        let Some(cutoff) = Utc::now().checked_sub_signed(self.retention) else {
            log::warn!(
                "skipping sweep, retention of {} days is out of range",
                self.retention.num_days()
            );
            report.aborted = true;
            return report;
        };

        let stale = match self.store.stale_completed_tasks(cutoff).await {
            Ok(tasks) => tasks,
            Err(e) => {
                log::warn!("skipping sweep, could not fetch stale tasks: {}", e);
                report.aborted = true;
                return report;
            }
        };
        report.found = stale.len();
        if stale.is_empty() {
            return report;
        }

        let mut log_file = match self.open_audit_log().await {
            Ok(file) => file,
            Err(e) => {
                log::warn!(
                    "skipping sweep, could not open audit log {}: {}",
                    self.audit_log.display(),
                    e
                );
                report.aborted = true;
                return report;
            }
        };

        for task in &stale {
            log::info!("Deleting old finished task ID: {}", task.id);
            if let Err(reason) = self.retire(&mut log_file, task).await {
                log::error!("aborting sweep at task {}: {}", task.id, reason);
                report.aborted = true;
                break;
            }
            report.purged.push(task.id);
        }

        if let Err(e) = log_file.flush().await {
            log::error!("failed to flush audit log: {}", e);
        }
        report
    }

    async fn open_audit_log(&self) -> std::io::Result<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.audit_log)
            .await
    }

    /// Logs then hard-deletes one task. The delete is skipped unless the audit
    /// line has been flushed to the file.
    async fn retire(&self, log_file: &mut File, task: &Task) -> Result<(), String> {
        let mut line =
            serde_json::to_vec(task).map_err(|e| format!("serialize failed: {}", e))?;
        line.push(b'\n');
        log_file
            .write_all(&line)
            .await
            .map_err(|e| format!("audit log write failed: {}", e))?;
        // tokio hands writes to a blocking thread; errors only surface on flush.
        log_file
            .flush()
            .await
            .map_err(|e| format!("audit log flush failed: {}", e))?;
        self.store
            .purge_task(task.id)
            .await
            .map_err(|e| format!("delete failed: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewTask, TaskPatch};
    use crate::store::{MemoryStore, StoreError};
    use async_trait::async_trait;
    use chrono::DateTime;
    use pretty_assertions::assert_eq;

    fn seed(store: &MemoryStore, completed: bool, age_days: i64) -> Task {
        let created_at = Utc::now() - chrono::Duration::days(age_days);
        store
            .seed_task(Task {
                id: 0,
                title: format!("aged {} days", age_days),
                description: String::new(),
                completed,
                created_at,
                updated_at: created_at,
                user_id: 1,
            })
            .unwrap()
    }

    fn sweeper(store: Arc<dyn TaskStore>, dir: &tempfile::TempDir) -> RetentionSweeper {
        RetentionSweeper::new(
            store,
            dir.path().join("audit.log"),
            chrono::Duration::days(7),
            Duration::from_secs(300),
        )
    }

    fn audit_lines(dir: &tempfile::TempDir) -> Vec<serde_json::Value> {
        match std::fs::read_to_string(dir.path().join("audit.log")) {
            Ok(contents) => contents
                .lines()
                .map(|line| serde_json::from_str(line).unwrap())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Delegates to a `MemoryStore` but refuses to purge one id.
    struct FailingPurge {
        inner: MemoryStore,
        fail_on: i64,
    }

    #[async_trait]
    impl TaskStore for FailingPurge {
        async fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
            self.inner.list_tasks().await
        }
        async fn list_tasks_for_user(&self, user_id: i64) -> Result<Vec<Task>, StoreError> {
            self.inner.list_tasks_for_user(user_id).await
        }
        async fn create_task(&self, task: NewTask) -> Result<Task, StoreError> {
            self.inner.create_task(task).await
        }
        async fn get_task(&self, id: i64) -> Result<Task, StoreError> {
            self.inner.get_task(id).await
        }
        async fn update_task(&self, id: i64, patch: TaskPatch) -> Result<Task, StoreError> {
            self.inner.update_task(id, patch).await
        }
        async fn delete_task(&self, id: i64) -> Result<(), StoreError> {
            self.inner.delete_task(id).await
        }
        async fn stale_completed_tasks(
            &self,
            cutoff: DateTime<Utc>,
        ) -> Result<Vec<Task>, StoreError> {
            self.inner.stale_completed_tasks(cutoff).await
        }
        async fn purge_task(&self, id: i64) -> Result<(), StoreError> {
            if id == self.fail_on {
                return Err(StoreError::Backend("connection reset".into()));
            }
            self.inner.purge_task(id).await
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_old_completed_task_is_logged_and_purged() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let old = seed(&store, true, 10);

        let report = sweeper(store.clone(), &dir).sweep_once().await;

        assert_eq!(report.purged, vec![old.id]);
        assert!(!report.aborted);
        assert!(!store.has_task_row(old.id).unwrap());
        let lines = audit_lines(&dir);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["id"], old.id);
        assert_eq!(lines[0]["completed"], true);
    }

    #[tokio::test]
    async fn test_recent_or_open_tasks_survive() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let recent = seed(&store, true, 3);
        let open = seed(&store, false, 30);

        let report = sweeper(store.clone(), &dir).sweep_once().await;

        assert_eq!(report, SweepReport::default());
        assert!(store.has_task_row(recent.id).unwrap());
        assert!(store.has_task_row(open.id).unwrap());
        assert!(!dir.path().join("audit.log").exists());
    }

    #[tokio::test]
    async fn test_soft_deleted_stale_task_is_purged() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let old = seed(&store, true, 12);
        store.delete_task(old.id).await.unwrap();

        let report = sweeper(store.clone(), &dir).sweep_once().await;

        assert_eq!(report.purged, vec![old.id]);
        assert_eq!(store.task_row_count().unwrap(), 0);
    }

    #[test_log::test(tokio::test)]
    async fn test_mid_batch_failure_aborts_rest_of_batch() {
        let dir = tempfile::tempdir().unwrap();
        let inner = MemoryStore::new();
        let first = seed(&inner, true, 20);
        let second = seed(&inner, true, 15);
        let third = seed(&inner, true, 10);
        let store = Arc::new(FailingPurge {
            inner,
            fail_on: second.id,
        });

        let report = sweeper(store.clone(), &dir).sweep_once().await;

        assert_eq!(report.found, 3);
        assert_eq!(report.purged, vec![first.id]);
        assert!(report.aborted);
        assert!(!store.inner.has_task_row(first.id).unwrap());
        assert!(store.inner.has_task_row(second.id).unwrap());
        assert!(store.inner.has_task_row(third.id).unwrap());

        // The failed task was logged before its delete was attempted.
        let ids: Vec<i64> = audit_lines(&dir)
            .iter()
            .map(|line| line["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn test_unwritable_audit_log_skips_sweep() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let old = seed(&store, true, 10);
        let sweeper = RetentionSweeper::new(
            store.clone(),
            dir.path().join("missing").join("audit.log"),
            chrono::Duration::days(7),
            Duration::from_secs(300),
        );

        let report = sweeper.sweep_once().await;

        assert!(report.aborted);
        assert!(report.purged.is_empty());
        assert!(store.has_task_row(old.id).unwrap());
    }

    #[cfg(target_os = "linux")]
    #[test_log::test(tokio::test)]
    async fn test_failed_audit_write_keeps_task() {
        let store = Arc::new(MemoryStore::new());
        let old = seed(&store, true, 10);
        // Every write to /dev/full fails with ENOSPC.
        let sweeper = RetentionSweeper::new(
            store.clone(),
            "/dev/full",
            chrono::Duration::days(7),
            Duration::from_secs(300),
        );

        let report = sweeper.sweep_once().await;

        assert_eq!(report.found, 1);
        assert!(report.purged.is_empty());
        assert!(report.aborted);
        assert!(store.has_task_row(old.id).unwrap());
    }

    #[tokio::test]
    async fn test_out_of_range_retention_skips_sweep() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let old = seed(&store, true, 10);
        let sweeper = RetentionSweeper::new(
            store.clone(),
            dir.path().join("audit.log"),
            chrono::Duration::days(100_000_000),
            Duration::from_secs(300),
        );

        let report = sweeper.sweep_once().await;

        assert!(report.aborted);
        assert_eq!(report.found, 0);
        assert!(store.has_task_row(old.id).unwrap());
    }

    #[tokio::test]
    async fn test_audit_log_is_appended_across_sweeps() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let sweeper = sweeper(store.clone(), &dir);

        seed(&store, true, 9);
        sweeper.sweep_once().await;
        seed(&store, true, 8);
        sweeper.sweep_once().await;

        assert_eq!(audit_lines(&dir).len(), 2);
    }

    #[tokio::test]
    async fn test_run_sweeps_on_tick_and_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let old = seed(&store, true, 10);
        let sweeper = RetentionSweeper::new(
            store.clone(),
            dir.path().join("audit.log"),
            chrono::Duration::days(7),
            Duration::from_millis(50),
        );
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(sweeper.run(rx));

        let mut purged = false;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            if !store.has_task_row(old.id).unwrap() {
                purged = true;
                break;
            }
        }
        assert!(purged, "sweeper never purged the stale task");

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("sweeper did not stop after shutdown")
            .unwrap();
    }

    #[tokio::test]
    async fn test_run_stops_when_sender_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(sweeper(store, &dir).run(rx));

        drop(tx);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("sweeper did not stop after sender dropped")
            .unwrap();
    }
}
