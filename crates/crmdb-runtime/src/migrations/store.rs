use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crmdb_core::error::Result;
use crmdb_core::migration::{AppliedMigration, Direction, Migration};

/// Boxed future returned by [`MigrationStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Backing store a migration runner mutates.
///
/// A store owns both the schema and the version-history table. The runner
/// holds the store lock for the whole run, so implementations may assume
/// a single writer between `lock` and `unlock`.
pub trait MigrationStore: Send + Sync {
    /// Take the exclusive migration lock, waiting until it is free.
    fn lock(&self) -> StoreFuture<'_, ()>;

    /// Release the migration lock. Releasing a lock that is not held is a no-op.
    fn unlock(&self) -> StoreFuture<'_, ()>;

    /// Create the version-history table if it does not exist yet.
    fn ensure_history(&self) -> StoreFuture<'_, ()>;

    /// Recorded migrations, ordered by version.
    fn applied(&self) -> StoreFuture<'_, Vec<AppliedMigration>>;

    /// Run one migration in one direction.
    ///
    /// The schema change and the history update commit together or not at
    /// all: on error the store is left exactly as it was.
    fn run_step<'a>(&'a self, migration: &'a Migration, direction: Direction)
        -> StoreFuture<'a, ()>;
}

impl<T: MigrationStore + ?Sized> MigrationStore for Arc<T> {
    fn lock(&self) -> StoreFuture<'_, ()> {
        (**self).lock()
    }

    fn unlock(&self) -> StoreFuture<'_, ()> {
        (**self).unlock()
    }

    fn ensure_history(&self) -> StoreFuture<'_, ()> {
        (**self).ensure_history()
    }

    fn applied(&self) -> StoreFuture<'_, Vec<AppliedMigration>> {
        (**self).applied()
    }

    fn run_step<'a>(
        &'a self,
        migration: &'a Migration,
        direction: Direction,
    ) -> StoreFuture<'a, ()> {
        (**self).run_step(migration, direction)
    }
}
