mod loader;
mod memory;
mod postgres;
mod runner;
mod store;

pub use loader::{load_migrations_from_dir, scaffold_migration};
pub use memory::InMemoryStore;
pub use postgres::PgMigrationStore;
pub use runner::{MigrationRunner, MigrationStatus, PendingMigration, RunReport, StepReport};
pub use store::{MigrationStore, StoreFuture};

use std::path::Path;

use crmdb_core::config::MigrationsConfig;
use crmdb_core::error::Result;
use crmdb_core::migration::MigrationSet;

use crate::catalog::crm_migration_list;

/// The migration set a configuration describes: the built-in catalog
/// (unless disabled) plus the SQL pairs in the migrations directory,
/// resolved against `base_dir`.
pub fn load_migration_set(config: &MigrationsConfig, base_dir: &Path) -> Result<MigrationSet> {
    let mut migrations = if config.include_catalog {
        crm_migration_list()
    } else {
        Vec::new()
    };

    migrations.extend(load_migrations_from_dir(&base_dir.join(&config.directory))?);
    MigrationSet::new(migrations)
}
