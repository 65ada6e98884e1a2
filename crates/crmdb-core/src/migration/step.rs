use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::operation::Operation;
use crate::error::{CrmError, Result};
use crate::schema::{ColumnDef, ReferentialAction};
use crate::sql::PostgresDialect;

/// Direction a migration is run in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// A versioned, reversible schema-change step.
#[derive(Debug, Clone)]
pub struct Migration {
    /// Timestamp version, `YYYYMMDDHHMMSS`.
    pub version: String,
    /// Name, e.g. `AddAccountEntity`.
    pub name: String,
    /// Forward operations.
    pub up: Vec<Operation>,
    /// Backward operations.
    pub down: Vec<Operation>,
}

impl Migration {
    /// Migration with explicit Up and Down operations.
    pub fn new(
        version: impl Into<String>,
        name: impl Into<String>,
        up: Vec<Operation>,
        down: Vec<Operation>,
    ) -> Self {
        Self {
            version: version.into(),
            name: name.into(),
            up,
            down,
        }
    }

    /// Migration whose Down is derived as the exact inverse of `up`.
    pub fn reversible(
        version: impl Into<String>,
        name: impl Into<String>,
        up: Vec<Operation>,
    ) -> Self {
        let down = Operation::invert_all(&up);
        Self {
            version: version.into(),
            name: name.into(),
            up,
            down,
        }
    }

    /// Replace the derived Down with explicit operations.
    pub fn with_down(mut self, down: Vec<Operation>) -> Self {
        self.down = down;
        self
    }

    /// `<version>_<name>`
    pub fn id(&self) -> String {
        format!("{}_{}", self.version, self.name)
    }

    pub fn operations(&self, direction: Direction) -> &[Operation] {
        match direction {
            Direction::Up => &self.up,
            Direction::Down => &self.down,
        }
    }

    /// PostgreSQL statements for one direction.
    pub fn statements(&self, direction: Direction) -> Vec<String> {
        PostgresDialect.render_all(self.operations(direction))
    }

    /// SHA-256 (hex) of the rendered Up script.
    pub fn checksum(&self) -> String {
        let script = PostgresDialect.render_script(&self.up);
        let digest = Sha256::digest(script.as_bytes());
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Check the version format, the name and the carried data rows.
    pub fn validate(&self) -> Result<()> {
        parse_version(&self.version)?;

        if self.name.is_empty()
            || !self
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(CrmError::InvalidArgument(format!(
                "migration name '{}' must be a non-empty identifier",
                self.name
            )));
        }
        if self.up.is_empty() {
            return Err(CrmError::Validation(format!(
                "migration {} has no operations",
                self.id()
            )));
        }

        for op in self.up.iter().chain(self.down.iter()) {
            match op {
                Operation::InsertData(rows) | Operation::DeleteData(rows) => {
                    rows.validate().map_err(|e| e.in_migration(&self.id()))?;
                }
                Operation::CreateTable(table) => {
                    for fk in &table.foreign_keys {
                        let not_null = fk
                            .columns
                            .iter()
                            .filter_map(|c| table.get_column(c))
                            .find(|c| !c.nullable);
                        if let (ReferentialAction::SetNull, Some(column)) = (fk.on_delete, not_null)
                        {
                            return Err(self.set_null_error(&fk.name, &table.name, &column.name));
                        }
                    }
                }
                // Columns declared earlier in this step are checked here; others by the snapshot
                Operation::AddForeignKey { table, foreign_key }
                    if foreign_key.on_delete == ReferentialAction::SetNull =>
                {
                    let not_null = foreign_key
                        .columns
                        .iter()
                        .filter_map(|c| self.declared_column(table, c))
                        .find(|c| !c.nullable);
                    if let Some(column) = not_null {
                        return Err(self.set_null_error(&foreign_key.name, table, &column.name));
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Definition of `table.column` if this migration's Up creates it.
    fn declared_column(&self, table: &str, column: &str) -> Option<&ColumnDef> {
        self.up.iter().find_map(|op| match op {
            Operation::CreateTable(t) if t.name == table => t.get_column(column),
            Operation::AddColumn { table: t, column: c } if t == table && c.name == column => {
                Some(c)
            }
            _ => None,
        })
    }

    fn set_null_error(&self, foreign_key: &str, table: &str, column: &str) -> CrmError {
        CrmError::Validation(format!(
            "{}: {} uses SET NULL on NOT NULL column {}.{}",
            self.id(),
            foreign_key,
            table,
            column
        ))
    }
}

/// Parse a `YYYYMMDDHHMMSS` version.
pub fn parse_version(version: &str) -> Result<NaiveDateTime> {
    if version.len() != 14 || !version.chars().all(|c| c.is_ascii_digit()) {
        return Err(CrmError::InvalidArgument(format!(
            "migration version '{}' must be a 14-digit timestamp (YYYYMMDDHHMMSS)",
            version
        )));
    }
    NaiveDateTime::parse_from_str(version, "%Y%m%d%H%M%S").map_err(|e| {
        CrmError::InvalidArgument(format!(
            "migration version '{}' is not a valid timestamp: {}",
            version, e
        ))
    })
}
