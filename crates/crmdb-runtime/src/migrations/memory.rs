use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use chrono::Utc;
use tokio::sync::{Mutex, Semaphore};

use crmdb_core::error::{CrmError, Result};
use crmdb_core::migration::{AppliedMigration, Direction, Migration};
use crmdb_core::schema::SchemaSnapshot;

use super::store::{MigrationStore, StoreFuture};

#[derive(Default)]
struct MemoryState {
    snapshot: SchemaSnapshot,
    history: Vec<AppliedMigration>,
}

/// Store backed by an in-memory [`SchemaSnapshot`].
///
/// Applies the same conflict and constraint checks a real database would,
/// and commits each step atomically. Used by tests and dry runs.
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
    lock: Semaphore,
    available: AtomicBool,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            lock: Semaphore::new(1),
            available: AtomicBool::new(true),
        }
    }

    /// Current schema.
    pub async fn snapshot(&self) -> SchemaSnapshot {
        self.state.lock().await.snapshot.clone()
    }

    /// Simulate losing (or regaining) the connection to the store.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Record a history entry without touching the schema.
    pub async fn record(&self, entry: AppliedMigration) {
        let mut state = self.state.lock().await;
        state.history.push(entry);
        state.history.sort_by(|a, b| a.version.cmp(&b.version));
    }

    fn check_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CrmError::StoreUnavailable(
                "in-memory store is marked unavailable".to_string(),
            ))
        }
    }
}

impl MigrationStore for InMemoryStore {
    fn lock(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.check_available()?;
            let permit = self
                .lock
                .acquire()
                .await
                .map_err(|_| CrmError::InvalidState("migration lock closed".to_string()))?;
            permit.forget();
            Ok(())
        })
    }

    fn unlock(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            if self.lock.available_permits() == 0 {
                self.lock.add_permits(1);
            }
            Ok(())
        })
    }

    fn ensure_history(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move { self.check_available() })
    }

    fn applied(&self) -> StoreFuture<'_, Vec<AppliedMigration>> {
        Box::pin(async move {
            self.check_available()?;
            Ok(self.state.lock().await.history.clone())
        })
    }

    fn run_step<'a>(
        &'a self,
        migration: &'a Migration,
        direction: Direction,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.check_available()?;
            let started = Instant::now();
            let mut state = self.state.lock().await;

            let mut snapshot = state.snapshot.clone();
            snapshot
                .apply_all(migration.operations(direction))
                .map_err(|e| e.in_migration(&migration.id()))?;

            let recorded = state
                .history
                .iter()
                .position(|h| h.version == migration.version);

            match (direction, recorded) {
                (Direction::Up, None) => {
                    state.history.push(AppliedMigration {
                        version: migration.version.clone(),
                        name: migration.name.clone(),
                        checksum: migration.checksum(),
                        applied_at: Utc::now(),
                        execution_time_ms: started.elapsed().as_millis() as i64,
                    });
                    state.history.sort_by(|a, b| a.version.cmp(&b.version));
                }
                (Direction::Down, Some(index)) => {
                    state.history.remove(index);
                }
                (Direction::Up, Some(_)) => {
                    return Err(CrmError::InvalidState(format!(
                        "migration {} is already recorded",
                        migration.id()
                    )));
                }
                (Direction::Down, None) => {
                    return Err(CrmError::InvalidState(format!(
                        "migration {} is not recorded",
                        migration.id()
                    )));
                }
            }

            state.snapshot = snapshot;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crmdb_core::migration::Operation;
    use crmdb_core::schema::{ColumnDef, TableDef};

    fn create_notes() -> Migration {
        Migration::reversible(
            "20240401120000",
            "AddNotes",
            vec![Operation::CreateTable(
                TableDef::new("Notes")
                    .column(ColumnDef::id("Id"))
                    .primary_key(&["Id"]),
            )],
        )
    }

    #[tokio::test]
    async fn test_run_step_up_and_down() {
        let store = InMemoryStore::new();
        let migration = create_notes();

        store.run_step(&migration, Direction::Up).await.unwrap();
        assert!(store.snapshot().await.contains_table("Notes"));
        let applied = store.applied().await.unwrap();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].checksum, migration.checksum());

        store.run_step(&migration, Direction::Down).await.unwrap();
        assert!(!store.snapshot().await.contains_table("Notes"));
        assert!(store.applied().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_step_leaves_store_unchanged() {
        let store = InMemoryStore::new();
        let migration = create_notes();
        store.run_step(&migration, Direction::Up).await.unwrap();
        let before = store.snapshot().await;

        let conflicting = Migration::reversible(
            "20240402120000",
            "AddNotesAgain",
            vec![
                Operation::AddColumn {
                    table: "Notes".into(),
                    column: ColumnDef::text("Body").nullable(),
                },
                Operation::CreateTable(
                    TableDef::new("Notes")
                        .column(ColumnDef::id("Id"))
                        .primary_key(&["Id"]),
                ),
            ],
        );
        let result = store.run_step(&conflicting, Direction::Up).await;
        assert!(matches!(result, Err(CrmError::SchemaConflict(_))));
        assert_eq!(store.snapshot().await, before);
        assert_eq!(store.applied().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_up_twice_is_rejected() {
        let store = InMemoryStore::new();
        let migration = create_notes();
        store.run_step(&migration, Direction::Up).await.unwrap();
        // Same version, different table: history check fires before commit
        let mut again = create_notes();
        again.up = vec![Operation::CreateTable(
            TableDef::new("Other")
                .column(ColumnDef::id("Id"))
                .primary_key(&["Id"]),
        )];
        assert!(matches!(
            store.run_step(&again, Direction::Up).await,
            Err(CrmError::InvalidState(_))
        ));
        assert!(!store.snapshot().await.contains_table("Other"));
    }

    #[tokio::test]
    async fn test_unavailable_store() {
        let store = InMemoryStore::new();
        store.set_available(false);
        assert!(matches!(
            store.applied().await,
            Err(CrmError::StoreUnavailable(_))
        ));
        assert!(matches!(
            store.lock().await,
            Err(CrmError::StoreUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_lock_is_exclusive() {
        let store = InMemoryStore::new();
        store.lock().await.unwrap();

        let second = tokio::time::timeout(std::time::Duration::from_millis(50), store.lock()).await;
        assert!(second.is_err(), "second lock should wait");

        store.unlock().await.unwrap();
        store.lock().await.unwrap();
        store.unlock().await.unwrap();
        // Unlocking twice is harmless
        store.unlock().await.unwrap();
        assert_eq!(store.lock.available_permits(), 1);
    }
}
