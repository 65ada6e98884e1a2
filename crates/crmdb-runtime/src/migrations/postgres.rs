use std::sync::Arc;
use std::time::Instant;

use sqlx::pool::PoolConnection;
use sqlx::{Connection, PgPool, Postgres, Row};
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

use crmdb_core::config::CrmConfig;
use crmdb_core::error::CrmError;
use crmdb_core::migration::{create_history_table_sql, AppliedMigration, Direction, Migration};
use crmdb_core::sql::quote_ident;

use super::store::{MigrationStore, StoreFuture};
use crate::db::{map_db_error, Database};

/// Connection pinned while the advisory lock is held.
struct LockedSession {
    conn: PoolConnection<Postgres>,
    _permit: OwnedSemaphorePermit,
}

/// PostgreSQL-backed migration store.
///
/// The advisory lock is session-scoped, so the store pins one pooled
/// connection while the lock is held and runs every step on it. Callers
/// sharing one store queue on an in-process gate before taking the
/// advisory lock.
pub struct PgMigrationStore {
    pool: PgPool,
    history_table: String,
    lock_id: i64,
    statement_timeout_secs: u64,
    gate: Arc<Semaphore>,
    session: Mutex<Option<LockedSession>>,
}

impl PgMigrationStore {
    pub fn new(pool: PgPool, history_table: impl Into<String>, lock_id: i64) -> Self {
        Self {
            pool,
            history_table: history_table.into(),
            lock_id,
            statement_timeout_secs: 0,
            gate: Arc::new(Semaphore::new(1)),
            session: Mutex::new(None),
        }
    }

    /// Store for the configured history table, lock and statement timeout.
    pub fn from_config(db: &Database, config: &CrmConfig) -> Self {
        Self::new(
            db.primary().clone(),
            config.migrations.history_table.clone(),
            config.migrations.lock_id,
        )
        .with_statement_timeout(config.database.statement_timeout_secs)
    }

    /// Per-statement timeout inside step transactions. Zero disables it.
    pub fn with_statement_timeout(mut self, secs: u64) -> Self {
        self.statement_timeout_secs = secs;
        self
    }
}

impl MigrationStore for PgMigrationStore {
    fn lock(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let permit = self
                .gate
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| CrmError::InvalidState("migration lock closed".to_string()))?;

            let mut conn = self.pool.acquire().await.map_err(map_db_error)?;
            debug!(lock_id = self.lock_id, "Acquiring migration lock...");
            sqlx::query("SELECT pg_advisory_lock($1)")
                .bind(self.lock_id)
                .execute(&mut *conn)
                .await
                .map_err(map_db_error)?;
            debug!("Migration lock acquired");

            *self.session.lock().await = Some(LockedSession {
                conn,
                _permit: permit,
            });
            Ok(())
        })
    }

    fn unlock(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let Some(mut session) = self.session.lock().await.take() else {
                return Ok(());
            };

            let released = sqlx::query("SELECT pg_advisory_unlock($1)")
                .bind(self.lock_id)
                .execute(&mut *session.conn)
                .await;

            if let Err(e) = released {
                // A pooled session would keep the advisory lock; end it instead
                if let Err(close) = session.conn.close().await {
                    warn!("Failed to close migration session: {}", close);
                }
                return Err(map_db_error(e));
            }
            debug!("Migration lock released");
            Ok(())
        })
    }

    fn ensure_history(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query(&create_history_table_sql(&self.history_table))
                .execute(&self.pool)
                .await
                .map_err(map_db_error)?;
            Ok(())
        })
    }

    fn applied(&self) -> StoreFuture<'_, Vec<AppliedMigration>> {
        Box::pin(async move {
            let sql = format!(
                "SELECT version, name, checksum, applied_at, execution_time_ms \
                 FROM {} ORDER BY version ASC",
                quote_ident(&self.history_table)
            );
            let rows = sqlx::query(&sql)
                .fetch_all(&self.pool)
                .await
                .map_err(map_db_error)?;

            Ok(rows
                .iter()
                .map(|row| AppliedMigration {
                    version: row.get("version"),
                    name: row.get("name"),
                    checksum: row.get("checksum"),
                    applied_at: row.get("applied_at"),
                    execution_time_ms: row.get("execution_time_ms"),
                })
                .collect())
        })
    }

    fn run_step<'a>(
        &'a self,
        migration: &'a Migration,
        direction: Direction,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut session = self.session.lock().await;
            let conn = session.as_mut().map(|s| &mut s.conn).ok_or_else(|| {
                CrmError::InvalidState("migration lock must be held to run a step".to_string())
            })?;

            let id = migration.id();
            let started = Instant::now();
            let mut tx = conn.begin().await.map_err(map_db_error)?;

            if self.statement_timeout_secs > 0 {
                sqlx::query(&format!(
                    "SET LOCAL statement_timeout = '{}s'",
                    self.statement_timeout_secs
                ))
                .execute(&mut *tx)
                .await
                .map_err(map_db_error)?;
            }

            for statement in migration.statements(direction) {
                debug!(migration = %id, "{}", statement);
                sqlx::query(&statement)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| map_db_error(e).in_migration(&id))?;
            }

            let table = quote_ident(&self.history_table);
            match direction {
                Direction::Up => {
                    sqlx::query(&format!(
                        "INSERT INTO {} (version, name, checksum, execution_time_ms) \
                         VALUES ($1, $2, $3, $4)",
                        table
                    ))
                    .bind(&migration.version)
                    .bind(&migration.name)
                    .bind(migration.checksum())
                    .bind(started.elapsed().as_millis() as i64)
                    .execute(&mut *tx)
                    .await
                    .map_err(map_db_error)?;
                }
                Direction::Down => {
                    let deleted = sqlx::query(&format!("DELETE FROM {} WHERE version = $1", table))
                        .bind(&migration.version)
                        .execute(&mut *tx)
                        .await
                        .map_err(map_db_error)?;
                    if deleted.rows_affected() != 1 {
                        return Err(CrmError::InvalidState(format!(
                            "migration {} is not recorded",
                            id
                        )));
                    }
                }
            }

            tx.commit().await.map_err(map_db_error)?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crmdb_core::config::DEFAULT_LOCK_ID;
    use crmdb_core::testing::TestDatabase;

    use std::sync::Arc;

    use crmdb_core::migration::{MigrationSet, Operation};
    use crmdb_core::schema::{ColumnDef, TableDef};

    use crate::catalog::{crm_migrations, ADMIN_EMAIL};
    use crate::migrations::MigrationRunner;

    fn widgets() -> TableDef {
        TableDef::new("Widgets")
            .column(ColumnDef::id("Id"))
            .primary_key(&["Id"])
    }

    async fn table_exists(pool: &PgPool, table: &str) -> bool {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_name = $1)",
        )
        .bind(table)
        .fetch_one(pool)
        .await
        .unwrap();
        exists
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_apply_and_revert_catalog() {
        let base = TestDatabase::from_env().await.unwrap();
        let db = base.isolated("pg_apply_and_revert").await.unwrap();
        let set = crm_migrations().unwrap();

        let store = PgMigrationStore::new(db.pool().clone(), "crm_migrations_history", DEFAULT_LOCK_ID)
            .with_statement_timeout(30);
        let runner = MigrationRunner::new(store);

        let report = runner.apply(&set, None).await.unwrap();
        assert_eq!(report.steps.len(), set.len());
        assert!(table_exists(db.pool(), "Accounts").await);
        assert!(table_exists(db.pool(), "ServiceRequests").await);

        // Second run applies nothing and does not duplicate the seeded admin
        let again = runner.apply(&set, None).await.unwrap();
        assert!(again.steps.is_empty());
        let (admins,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM \"Users\" WHERE \"Email\" = $1")
            .bind(ADMIN_EMAIL)
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(admins, 1);

        let reverted = runner.revert(&set, None).await.unwrap();
        assert_eq!(reverted.to, None);
        assert!(!table_exists(db.pool(), "Accounts").await);
        assert!(!table_exists(db.pool(), "Users").await);

        db.cleanup().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_conflicting_step_rolls_back() {
        let base = TestDatabase::from_env().await.unwrap();
        let db = base.isolated("pg_conflict").await.unwrap();
        db.execute("CREATE TABLE \"Departments\" (\"Id\" INTEGER PRIMARY KEY)")
            .await
            .unwrap();

        let set = crm_migrations().unwrap();
        let store = PgMigrationStore::new(db.pool().clone(), "crm_migrations_history", DEFAULT_LOCK_ID);
        let runner = MigrationRunner::new(store);

        let result = runner.apply(&set, None).await;
        assert!(matches!(result, Err(CrmError::SchemaConflict(_))));
        assert!(!table_exists(db.pool(), "Users").await);
        assert!(runner.store().applied().await.unwrap().is_empty());

        db.cleanup().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_shared_store_serializes_runners() {
        let base = TestDatabase::from_env().await.unwrap();
        let db = base.isolated("pg_shared_store").await.unwrap();
        let set = crm_migrations().unwrap();

        let store = Arc::new(PgMigrationStore::new(
            db.pool().clone(),
            "crm_migrations_history",
            DEFAULT_LOCK_ID,
        ));
        let first = MigrationRunner::new(store.clone());
        let second = MigrationRunner::new(store.clone());

        let (a, b) = tokio::join!(first.apply(&set, None), second.apply(&set, None));
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(a.steps.len() + b.steps.len(), set.len());
        assert!(a.steps.is_empty() || b.steps.is_empty());
        assert_eq!(store.applied().await.unwrap().len(), set.len());

        db.cleanup().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_failing_down_keeps_schema_and_history() {
        let base = TestDatabase::from_env().await.unwrap();
        let db = base.isolated("pg_failing_down").await.unwrap();

        let migration = Migration::new(
            "20240101000000",
            "AddWidgets",
            vec![Operation::CreateTable(widgets())],
            vec![
                Operation::DropTable(widgets()),
                Operation::Sql {
                    forward: "SELECT 1 / 0".into(),
                    backward: String::new(),
                },
            ],
        );
        let set = MigrationSet::new(vec![migration]).unwrap();
        let store = PgMigrationStore::new(db.pool().clone(), "crm_migrations_history", DEFAULT_LOCK_ID);
        let runner = MigrationRunner::new(store);

        runner.apply(&set, None).await.unwrap();
        assert!(runner.revert(&set, None).await.is_err());

        assert!(table_exists(db.pool(), "Widgets").await);
        let applied = runner.store().applied().await.unwrap();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].version, "20240101000000");

        db.cleanup().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_down_without_history_row_rolls_back() {
        let base = TestDatabase::from_env().await.unwrap();
        let db = base.isolated("pg_down_unrecorded").await.unwrap();

        let migration = Migration::reversible(
            "20240101000000",
            "AddWidgets",
            vec![Operation::CreateTable(widgets())],
        );
        let store = PgMigrationStore::new(db.pool().clone(), "crm_migrations_history", DEFAULT_LOCK_ID);

        store.ensure_history().await.unwrap();
        store.lock().await.unwrap();
        store.run_step(&migration, Direction::Up).await.unwrap();
        db.execute("DELETE FROM crm_migrations_history").await.unwrap();

        let result = store.run_step(&migration, Direction::Down).await;
        store.unlock().await.unwrap();

        assert!(matches!(result, Err(CrmError::InvalidState(_))));
        assert!(table_exists(db.pool(), "Widgets").await);

        db.cleanup().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_unlock_without_lock_is_noop() {
        let base = TestDatabase::from_env().await.unwrap();
        let db = base.isolated("pg_unlock_noop").await.unwrap();
        let store = PgMigrationStore::new(db.pool().clone(), "crm_migrations_history", DEFAULT_LOCK_ID);

        store.unlock().await.unwrap();
        store.lock().await.unwrap();
        store.unlock().await.unwrap();
        // The gate is free again
        store.lock().await.unwrap();
        store.unlock().await.unwrap();

        db.cleanup().await.unwrap();
    }
}
