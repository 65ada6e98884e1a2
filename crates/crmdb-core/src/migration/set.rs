use std::collections::HashSet;

use tracing::debug;

use super::history::{delete_history_sql, insert_history_sql, AppliedMigration};
use super::step::{Direction, Migration};
use crate::error::{CrmError, Result};
use crate::schema::{SchemaDiff, SchemaSnapshot};
use crate::sql::PostgresDialect;

/// An ordered, validated collection of migrations.
///
/// Versions are unique and sorted ascending. The position of a migration in
/// the set is its position in the schema history.
#[derive(Debug, Clone, Default)]
pub struct MigrationSet {
    migrations: Vec<Migration>,
}

impl MigrationSet {
    /// Validate and order the given migrations.
    pub fn new(mut migrations: Vec<Migration>) -> Result<Self> {
        for migration in &migrations {
            migration.validate()?;
        }

        migrations.sort_by(|a, b| a.version.cmp(&b.version));
        for pair in migrations.windows(2) {
            if pair[0].version == pair[1].version {
                return Err(CrmError::DuplicateVersion(pair[0].version.clone()));
            }
        }

        Ok(Self { migrations })
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Migration> {
        self.migrations.iter()
    }

    pub fn get(&self, version: &str) -> Option<&Migration> {
        self.position(version).map(|i| &self.migrations[i])
    }

    /// The newest migration.
    pub fn latest(&self) -> Option<&Migration> {
        self.migrations.last()
    }

    fn position(&self, version: &str) -> Option<usize> {
        self.migrations
            .binary_search_by(|m| m.version.as_str().cmp(version))
            .ok()
    }

    fn applied_position(&self, current: &str) -> Result<usize> {
        self.position(current)
            .ok_or_else(|| CrmError::UnknownVersion(current.to_string()))
    }

    fn target_position(&self, target: &str) -> Result<usize> {
        self.position(target).ok_or_else(|| {
            CrmError::InvalidArgument(format!("unknown target migration '{}'", target))
        })
    }

    /// Every migration newer than `current`, oldest first.
    pub fn pending_after(&self, current: Option<&str>) -> Result<Vec<&Migration>> {
        self.apply_path(current, None)
    }

    /// Migrations to apply, oldest first, to move from `current` up to
    /// `target` (inclusive). `None` as target means the latest migration.
    pub fn apply_path(&self, current: Option<&str>, target: Option<&str>) -> Result<Vec<&Migration>> {
        let start = match current {
            Some(version) => self.applied_position(version)? + 1,
            None => 0,
        };
        let end = match target {
            Some(version) => self.target_position(version)? + 1,
            None => self.migrations.len(),
        };

        if end < start {
            return Err(CrmError::InvalidArgument(format!(
                "target {} is older than the applied head {}; revert instead",
                target.unwrap_or_default(),
                current.unwrap_or_default()
            )));
        }

        Ok(self.migrations[start..end].iter().collect())
    }

    /// Migrations to revert, newest first, to move from `current` back down
    /// to `target`. The target itself stays applied; `None` reverts
    /// everything.
    pub fn revert_path(&self, current: Option<&str>, target: Option<&str>) -> Result<Vec<&Migration>> {
        let Some(current) = current else {
            if let Some(target) = target {
                return Err(CrmError::InvalidArgument(format!(
                    "target {} is not applied",
                    target
                )));
            }
            return Ok(Vec::new());
        };

        let head = self.applied_position(current)?;
        let stop = match target {
            Some(version) => {
                let index = self.target_position(version)?;
                if index > head {
                    return Err(CrmError::InvalidArgument(format!(
                        "target {} is newer than the applied head {}; apply instead",
                        version, current
                    )));
                }
                index + 1
            }
            None => 0,
        };

        Ok(self.migrations[stop..=head].iter().rev().collect())
    }

    /// The newest migration applied before `current`, i.e. the version the
    /// history returns to when `current` is reverted.
    pub fn previous(&self, current: &str) -> Result<Option<&Migration>> {
        let index = self.applied_position(current)?;
        Ok(index.checked_sub(1).map(|i| &self.migrations[i]))
    }

    /// Check recorded history against the set and return the applied head.
    ///
    /// Every recorded version must be known with an unchanged checksum, and
    /// no known migration may be missing below the head.
    pub fn check_history(&self, applied: &[AppliedMigration]) -> Result<Option<String>> {
        let mut recorded = HashSet::new();
        for entry in applied {
            let migration = self
                .get(&entry.version)
                .ok_or_else(|| CrmError::UnknownVersion(entry.version.clone()))?;
            let current = migration.checksum();
            if entry.checksum != current {
                return Err(CrmError::ChecksumMismatch {
                    version: entry.version.clone(),
                    recorded: entry.checksum.clone(),
                    current,
                });
            }
            recorded.insert(entry.version.as_str());
        }

        let Some(head) = applied.iter().map(|e| e.version.as_str()).max() else {
            return Ok(None);
        };

        if let Some(gap) = self
            .migrations
            .iter()
            .take_while(|m| m.version.as_str() < head)
            .find(|m| !recorded.contains(m.version.as_str()))
        {
            return Err(CrmError::OutOfOrder {
                pending: gap.version.clone(),
                head: head.to_string(),
            });
        }

        Ok(Some(head.to_string()))
    }

    /// The schema after applying every migration up to `version` inclusive.
    pub fn snapshot_at(&self, version: Option<&str>) -> Result<SchemaSnapshot> {
        let mut snapshot = SchemaSnapshot::new();
        for migration in self.apply_path(None, version)? {
            snapshot
                .apply_all(&migration.up)
                .map_err(|e| e.in_migration(&migration.id()))?;
        }
        Ok(snapshot)
    }

    /// Replay the whole history in memory, checking that every migration
    /// applies cleanly and that its Down restores the prior schema exactly.
    ///
    /// Returns the schema at the latest migration.
    pub fn verify(&self) -> Result<SchemaSnapshot> {
        let mut snapshot = SchemaSnapshot::new();

        for migration in &self.migrations {
            let before = snapshot.clone();
            snapshot
                .apply_all(&migration.up)
                .map_err(|e| e.in_migration(&migration.id()))?;

            let mut reverted = snapshot.clone();
            if let Err(e) = reverted.apply_all(&migration.down) {
                return Err(CrmError::Irreversible {
                    version: migration.version.clone(),
                    detail: e.to_string(),
                });
            }

            if reverted != before {
                let diff = SchemaDiff::between(&before, &reverted);
                return Err(CrmError::Irreversible {
                    version: migration.version.clone(),
                    detail: diff.summary(),
                });
            }

            debug!(migration = %migration.id(), "Migration verified reversible");
        }

        Ok(snapshot)
    }

    /// A SQL script moving the schema from `current` to `target`.
    ///
    /// Up scripts cover `apply_path(current, target)`, down scripts cover
    /// `revert_path(current, target)`. Each migration is wrapped in its own
    /// transaction; with a history table the script also maintains it.
    pub fn script(
        &self,
        current: Option<&str>,
        target: Option<&str>,
        direction: Direction,
        history_table: Option<&str>,
    ) -> Result<String> {
        let path = match direction {
            Direction::Up => self.apply_path(current, target)?,
            Direction::Down => self.revert_path(current, target)?,
        };

        let dialect = PostgresDialect;
        let mut sections = Vec::with_capacity(path.len());
        for migration in path {
            let mut section = format!("-- {} ({})\nBEGIN;\n\n", migration.id(), direction);
            section.push_str(&dialect.render_script(migration.operations(direction)));

            if let Some(table) = history_table {
                let history = match direction {
                    Direction::Up => insert_history_sql(table, migration),
                    Direction::Down => delete_history_sql(table, &migration.version),
                };
                section.push_str(&format!("\n\n{};", history));
            }

            section.push_str("\n\nCOMMIT;\n");
            sections.push(section);
        }

        Ok(sections.join("\n"))
    }
}
