use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crmdb_core::error::{CrmError, Result};
use crmdb_core::migration::{Migration, Operation};

const UP_SUFFIX: &str = ".up.sql";
const DOWN_SUFFIX: &str = ".down.sql";

#[derive(Default)]
struct SqlPair {
    up: Option<String>,
    down: Option<String>,
}

/// Load hand-written migrations from a directory.
///
/// Each migration is a pair of files:
/// - `20240401120000_add_notes.up.sql`
/// - `20240401120000_add_notes.down.sql`
///
/// A missing directory yields no migrations. Files that are not `.up.sql`
/// or `.down.sql` are ignored.
pub fn load_migrations_from_dir(dir: &Path) -> Result<Vec<Migration>> {
    if !dir.exists() {
        debug!("Migrations directory does not exist: {:?}", dir);
        return Ok(Vec::new());
    }

    let mut pairs: BTreeMap<String, SqlPair> = BTreeMap::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(file_name) = path.file_name().and_then(|s| s.to_str()) else {
            continue;
        };

        if let Some(stem) = file_name.strip_suffix(UP_SUFFIX) {
            pairs.entry(stem.to_string()).or_default().up = Some(std::fs::read_to_string(&path)?);
        } else if let Some(stem) = file_name.strip_suffix(DOWN_SUFFIX) {
            pairs.entry(stem.to_string()).or_default().down =
                Some(std::fs::read_to_string(&path)?);
        } else if file_name.ends_with(".sql") {
            warn!(
                "Ignoring {:?}: migration files must end in {} or {}",
                path, UP_SUFFIX, DOWN_SUFFIX
            );
        }
    }

    let mut migrations = Vec::with_capacity(pairs.len());
    for (stem, pair) in pairs {
        let (version, name) = stem.split_once('_').ok_or_else(|| {
            CrmError::Config(format!(
                "migration file '{}' must be named <version>_<name>",
                stem
            ))
        })?;

        let (Some(up), Some(down)) = (pair.up, pair.down) else {
            return Err(CrmError::Config(format!(
                "migration '{}' needs both {} and {} files",
                stem, UP_SUFFIX, DOWN_SUFFIX
            )));
        };

        migrations.push(Migration::reversible(
            version,
            name,
            vec![Operation::Sql {
                forward: up,
                backward: down,
            }],
        ));
    }

    debug!("Loaded {} SQL migrations", migrations.len());
    Ok(migrations)
}

/// Write an empty `.up.sql` / `.down.sql` pair for a new migration.
///
/// Returns the paths of the two files.
pub fn scaffold_migration(
    dir: &Path,
    name: &str,
    now: DateTime<Utc>,
) -> Result<(PathBuf, PathBuf)> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(CrmError::InvalidArgument(format!(
            "migration name '{}' must be a non-empty identifier",
            name
        )));
    }

    std::fs::create_dir_all(dir)?;

    let stem = format!("{}_{}", now.format("%Y%m%d%H%M%S"), name);
    let up = dir.join(format!("{}{}", stem, UP_SUFFIX));
    let down = dir.join(format!("{}{}", stem, DOWN_SUFFIX));
    if up.exists() || down.exists() {
        return Err(CrmError::InvalidArgument(format!(
            "migration {} already exists",
            stem
        )));
    }

    let created = now.format("%Y-%m-%d %H:%M:%S UTC");
    std::fs::write(
        &up,
        format!("-- Migration: {}\n-- Created at: {}\n\n", name, created),
    )?;
    std::fs::write(
        &down,
        format!(
            "-- Migration: {} (revert)\n-- Created at: {}\n\n",
            name, created
        ),
    )?;

    Ok((up, down))
}
