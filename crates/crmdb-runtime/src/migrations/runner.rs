//! Migration runner with exclusive locking.
//!
//! Only one runner migrates a store at a time: every run holds the store
//! lock from the history check until the last step commits.

use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crmdb_core::error::Result;
use crmdb_core::migration::{AppliedMigration, Direction, Migration, MigrationSet};

use super::store::MigrationStore;

/// What a single run did.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub direction: Direction,
    /// Applied head before the run.
    pub from: Option<String>,
    /// Applied head after the run.
    pub to: Option<String>,
    pub steps: Vec<StepReport>,
}

/// One executed migration step.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub version: String,
    pub name: String,
    pub elapsed_ms: u64,
}

/// Applied and pending migrations of a store.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationStatus {
    pub current: Option<String>,
    pub applied: Vec<AppliedMigration>,
    pub pending: Vec<PendingMigration>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingMigration {
    pub version: String,
    pub name: String,
}

enum Plan<'a> {
    Apply(Option<&'a str>),
    Revert(Option<&'a str>),
    Rollback(usize),
}

/// Applies and reverts a [`MigrationSet`] against a store.
pub struct MigrationRunner<S> {
    store: S,
}

impl<S: MigrationStore> MigrationRunner<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Apply pending migrations up to `target` (inclusive), or all of them.
    pub async fn apply(&self, set: &MigrationSet, target: Option<&str>) -> Result<RunReport> {
        self.run(set, Plan::Apply(target)).await
    }

    /// Revert applied migrations newer than `target`, or all of them.
    pub async fn revert(&self, set: &MigrationSet, target: Option<&str>) -> Result<RunReport> {
        self.run(set, Plan::Revert(target)).await
    }

    /// Revert the last `count` applied migrations.
    pub async fn rollback(&self, set: &MigrationSet, count: usize) -> Result<RunReport> {
        self.run(set, Plan::Rollback(count)).await
    }

    /// Applied and pending migrations. Fails when the recorded history does
    /// not match the set.
    pub async fn status(&self, set: &MigrationSet) -> Result<MigrationStatus> {
        self.store.ensure_history().await?;
        let applied = self.store.applied().await?;
        let current = set.check_history(&applied)?;

        let pending = set
            .pending_after(current.as_deref())?
            .into_iter()
            .map(|m| PendingMigration {
                version: m.version.clone(),
                name: m.name.clone(),
            })
            .collect();

        Ok(MigrationStatus {
            current,
            applied,
            pending,
        })
    }

    async fn run(&self, set: &MigrationSet, plan: Plan<'_>) -> Result<RunReport> {
        self.store.lock().await?;

        let result = self.run_locked(set, plan).await;

        // Always release lock, even on error
        if let Err(e) = self.store.unlock().await {
            warn!("Failed to release migration lock: {}", e);
        }

        result
    }

    async fn run_locked(&self, set: &MigrationSet, plan: Plan<'_>) -> Result<RunReport> {
        self.store.ensure_history().await?;

        let applied = self.store.applied().await?;
        let head = set.check_history(&applied)?;
        debug!(head = ?head, applied = applied.len(), "Read migration history");

        let current = head.as_deref();
        let (direction, path) = match plan {
            Plan::Apply(target) => (Direction::Up, set.apply_path(current, target)?),
            Plan::Revert(target) => (Direction::Down, set.revert_path(current, target)?),
            Plan::Rollback(count) => {
                let mut path = set.revert_path(current, None)?;
                path.truncate(count);
                (Direction::Down, path)
            }
        };

        let mut report = RunReport {
            direction,
            from: head.clone(),
            to: head.clone(),
            steps: Vec::with_capacity(path.len()),
        };

        if path.is_empty() {
            info!(version = ?head, "No migrations to run");
            return Ok(report);
        }

        for migration in path {
            let step = self.run_step(migration, direction).await?;
            report.to = match direction {
                Direction::Up => Some(migration.version.clone()),
                Direction::Down => set.previous(&migration.version)?.map(|m| m.version.clone()),
            };
            report.steps.push(step);
        }

        Ok(report)
    }

    async fn run_step(&self, migration: &Migration, direction: Direction) -> Result<StepReport> {
        let id = migration.id();
        info!(migration = %id, %direction, "Running migration");

        let started = Instant::now();
        if let Err(e) = self.store.run_step(migration, direction).await {
            warn!(migration = %id, %direction, "Migration failed: {}", e);
            return Err(e);
        }
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match direction {
            Direction::Up => info!(migration = %id, elapsed_ms, "Migration applied"),
            Direction::Down => info!(migration = %id, elapsed_ms, "Migration reverted"),
        }

        Ok(StepReport {
            version: migration.version.clone(),
            name: migration.name.clone(),
            elapsed_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Utc;
    use crmdb_core::error::CrmError;
    use crmdb_core::migration::{DataRows, Operation};
    use crmdb_core::schema::{ColumnDef, SqlValue, TableDef};
    use tokio_test::{assert_err, assert_ok};

    use crate::migrations::InMemoryStore;

    fn create_table(version: &str, name: &str, table: &str) -> Migration {
        Migration::reversible(
            version,
            name,
            vec![Operation::CreateTable(
                TableDef::new(table)
                    .column(ColumnDef::id("Id"))
                    .column(ColumnDef::string("Code", 32))
                    .primary_key(&["Id"]),
            )],
        )
    }

    fn sample_set() -> MigrationSet {
        MigrationSet::new(vec![
            create_table("20240101000000", "AddA", "A"),
            create_table("20240102000000", "AddB", "B"),
            Migration::reversible(
                "20240103000000",
                "SeedA",
                vec![Operation::InsertData(
                    DataRows::new("A", &["Code"], &["Code"]).row(vec![SqlValue::from("first")]),
                )],
            ),
        ])
        .unwrap()
    }

    fn runner() -> MigrationRunner<InMemoryStore> {
        MigrationRunner::new(InMemoryStore::new())
    }

    #[tokio::test]
    async fn test_apply_all() {
        let runner = runner();
        let set = sample_set();

        let report = runner.apply(&set, None).await.unwrap();
        assert_eq!(report.from, None);
        assert_eq!(report.to.as_deref(), Some("20240103000000"));
        assert_eq!(report.steps.len(), 3);

        let snapshot = runner.store().snapshot().await;
        assert!(snapshot.contains_table("A"));
        assert_eq!(snapshot.row_count("A"), 1);
    }

    #[tokio::test]
    async fn test_apply_is_idempotent() {
        let runner = runner();
        let set = sample_set();

        runner.apply(&set, None).await.unwrap();
        let again = runner.apply(&set, None).await.unwrap();

        assert!(again.steps.is_empty());
        assert_eq!(again.from, again.to);
        assert_eq!(runner.store().snapshot().await.row_count("A"), 1);
        assert_eq!(runner.store().applied().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_apply_to_target_then_rest() {
        let runner = runner();
        let set = sample_set();

        let first = runner.apply(&set, Some("20240101000000")).await.unwrap();
        assert_eq!(first.to.as_deref(), Some("20240101000000"));
        assert!(!runner.store().snapshot().await.contains_table("B"));

        let rest = runner.apply(&set, None).await.unwrap();
        assert_eq!(rest.from.as_deref(), Some("20240101000000"));
        assert_eq!(rest.steps.len(), 2);
    }

    #[tokio::test]
    async fn test_revert_to_target() {
        let runner = runner();
        let set = sample_set();
        runner.apply(&set, None).await.unwrap();

        let report = runner.revert(&set, Some("20240101000000")).await.unwrap();
        assert_eq!(report.direction, Direction::Down);
        assert_eq!(report.to.as_deref(), Some("20240101000000"));
        let versions: Vec<_> = report.steps.iter().map(|s| s.version.as_str()).collect();
        assert_eq!(versions, vec!["20240103000000", "20240102000000"]);

        let snapshot = runner.store().snapshot().await;
        assert!(snapshot.contains_table("A"));
        assert_eq!(snapshot.row_count("A"), 0);
        assert!(!snapshot.contains_table("B"));
    }

    #[tokio::test]
    async fn test_revert_all_restores_empty_schema() {
        let runner = runner();
        let set = sample_set();
        runner.apply(&set, None).await.unwrap();

        let report = runner.revert(&set, None).await.unwrap();
        assert_eq!(report.to, None);
        assert_eq!(
            runner.store().snapshot().await,
            crmdb_core::schema::SchemaSnapshot::new()
        );
        assert!(runner.store().applied().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rollback_count() {
        let runner = runner();
        let set = sample_set();
        runner.apply(&set, None).await.unwrap();

        let report = runner.rollback(&set, 1).await.unwrap();
        assert_eq!(report.steps.len(), 1);
        assert_eq!(report.to.as_deref(), Some("20240102000000"));

        let report = runner.rollback(&set, 10).await.unwrap();
        assert_eq!(report.steps.len(), 2);
        assert_eq!(report.to, None);
    }

    #[tokio::test]
    async fn test_status() {
        let runner = runner();
        let set = sample_set();
        runner.apply(&set, Some("20240102000000")).await.unwrap();

        let status = runner.status(&set).await.unwrap();
        assert_eq!(status.current.as_deref(), Some("20240102000000"));
        assert_eq!(status.applied.len(), 2);
        assert_eq!(status.pending.len(), 1);
        assert_eq!(status.pending[0].name, "SeedA");
    }

    #[tokio::test]
    async fn test_failing_step_stops_run_and_keeps_prior_steps() {
        let runner = runner();
        let broken = Migration::reversible(
            "20240102000000",
            "AddAAgain",
            vec![Operation::CreateTable(
                TableDef::new("A")
                    .column(ColumnDef::id("Id"))
                    .primary_key(&["Id"]),
            )],
        );
        let set = MigrationSet::new(vec![
            create_table("20240101000000", "AddA", "A"),
            broken,
            create_table("20240103000000", "AddC", "C"),
        ])
        .unwrap();

        let result = runner.apply(&set, None).await;
        assert!(matches!(result, Err(CrmError::SchemaConflict(_))));

        let applied = runner.store().applied().await.unwrap();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].version, "20240101000000");
        assert!(!runner.store().snapshot().await.contains_table("C"));

        // The lock was released: another run can start
        assert_err!(runner.apply(&set, None).await);
        assert_ok!(runner.revert(&set, None).await);
    }

    #[tokio::test]
    async fn test_unknown_history_is_rejected() {
        let runner = runner();
        let set = sample_set();
        runner
            .store()
            .record(AppliedMigration {
                version: "20991231235959".into(),
                name: "FromTheFuture".into(),
                checksum: String::new(),
                applied_at: Utc::now(),
                execution_time_ms: 0,
            })
            .await;

        let result = runner.apply(&set, None).await;
        assert!(matches!(result, Err(CrmError::UnknownVersion(_))));
        assert!(!runner.store().snapshot().await.contains_table("A"));
    }

    #[tokio::test]
    async fn test_out_of_order_history_is_rejected() {
        let runner = runner();
        let set = sample_set();
        let b = set.get("20240102000000").unwrap();
        runner
            .store()
            .record(AppliedMigration {
                version: b.version.clone(),
                name: b.name.clone(),
                checksum: b.checksum(),
                applied_at: Utc::now(),
                execution_time_ms: 0,
            })
            .await;

        let result = runner.apply(&set, None).await;
        assert!(matches!(result, Err(CrmError::OutOfOrder { .. })));
    }

    #[tokio::test]
    async fn test_checksum_drift_is_rejected() {
        let runner = runner();
        let set = sample_set();
        runner.apply(&set, Some("20240101000000")).await.unwrap();

        let changed = MigrationSet::new(vec![
            create_table("20240101000000", "AddA", "Renamed"),
            create_table("20240102000000", "AddB", "B"),
        ])
        .unwrap();
        let result = runner.apply(&changed, None).await;
        assert!(matches!(result, Err(CrmError::ChecksumMismatch { .. })));
        assert!(!runner.store().snapshot().await.contains_table("B"));
    }

    #[tokio::test]
    async fn test_unavailable_store_surfaces_error() {
        let runner = runner();
        runner.store().set_available(false);
        let result = runner.status(&sample_set()).await;
        assert!(matches!(result, Err(CrmError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn test_concurrent_runners_apply_once() {
        let store = Arc::new(InMemoryStore::new());
        let set = sample_set();
        let first = MigrationRunner::new(Arc::clone(&store));
        let second = MigrationRunner::new(Arc::clone(&store));

        let (a, b) = tokio::join!(first.apply(&set, None), second.apply(&set, None));
        let steps = a.unwrap().steps.len() + b.unwrap().steps.len();

        assert_eq!(steps, 3);
        assert_eq!(store.applied().await.unwrap().len(), 3);
        assert_eq!(store.snapshot().await.row_count("A"), 1);
    }
}
