use super::snapshot::{SchemaSnapshot, TableState};

/// Represents the difference between two schema snapshots.
#[derive(Debug, Clone)]
pub struct SchemaDiff {
    /// Changes that turn the first snapshot into the second.
    pub entries: Vec<DiffEntry>,
}

impl SchemaDiff {
    /// Create an empty diff.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Compare two snapshots.
    pub fn between(before: &SchemaSnapshot, after: &SchemaSnapshot) -> Self {
        let mut entries = Vec::new();

        for (name, after_table) in after.tables() {
            match before.table(name) {
                None => entries.push(DiffEntry::new(
                    DiffAction::CreateTable,
                    name,
                    format!("Create table {}", name),
                )),
                Some(before_table) => {
                    Self::compare_tables(name, before_table, after_table, &mut entries)
                }
            }
        }

        for (name, _) in before.tables() {
            if !after.contains_table(name) {
                entries.push(DiffEntry::new(
                    DiffAction::DropTable,
                    name,
                    format!("Drop table {}", name),
                ));
            }
        }

        Self { entries }
    }

    fn compare_tables(
        table: &str,
        before: &TableState,
        after: &TableState,
        entries: &mut Vec<DiffEntry>,
    ) {
        for (name, column) in &after.columns {
            match before.columns.get(name) {
                None => entries.push(DiffEntry::new(
                    DiffAction::AddColumn,
                    table,
                    format!("Add column {}", name),
                )),
                Some(old) if old != column => entries.push(DiffEntry::new(
                    DiffAction::AlterColumn,
                    table,
                    format!(
                        "Change column {} from {} to {}",
                        name,
                        old.to_sql_column(),
                        column.to_sql_column()
                    ),
                )),
                Some(_) => {}
            }
        }
        for name in before.columns.keys() {
            if !after.columns.contains_key(name) {
                entries.push(DiffEntry::new(
                    DiffAction::DropColumn,
                    table,
                    format!("Drop column {}", name),
                ));
            }
        }

        if before.primary_key != after.primary_key {
            entries.push(DiffEntry::new(
                DiffAction::AlterPrimaryKey,
                table,
                format!(
                    "Change primary key from ({}) to ({})",
                    before.primary_key.join(", "),
                    after.primary_key.join(", ")
                ),
            ));
        }

        for (name, index) in &after.indexes {
            match before.indexes.get(name) {
                None => entries.push(DiffEntry::new(
                    DiffAction::AddIndex,
                    table,
                    format!("Add index {}", name),
                )),
                Some(old) if old != index => entries.push(DiffEntry::new(
                    DiffAction::AlterIndex,
                    table,
                    format!("Change index {}", name),
                )),
                Some(_) => {}
            }
        }
        for name in before.indexes.keys() {
            if !after.indexes.contains_key(name) {
                entries.push(DiffEntry::new(
                    DiffAction::DropIndex,
                    table,
                    format!("Drop index {}", name),
                ));
            }
        }

        for (name, fk) in &after.foreign_keys {
            match before.foreign_keys.get(name) {
                None => entries.push(DiffEntry::new(
                    DiffAction::AddForeignKey,
                    table,
                    format!("Add foreign key {}", name),
                )),
                Some(old) if old != fk => entries.push(DiffEntry::new(
                    DiffAction::AlterForeignKey,
                    table,
                    format!("Change foreign key {}", name),
                )),
                Some(_) => {}
            }
        }
        for name in before.foreign_keys.keys() {
            if !after.foreign_keys.contains_key(name) {
                entries.push(DiffEntry::new(
                    DiffAction::DropForeignKey,
                    table,
                    format!("Drop foreign key {}", name),
                ));
            }
        }

        if before.rows != after.rows {
            entries.push(DiffEntry::new(
                DiffAction::ChangeRows,
                table,
                format!(
                    "Rows changed ({} before, {} after)",
                    before.rows.len(),
                    after.rows.len()
                ),
            ));
        }
    }

    /// Check if there are any changes.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One line listing every change.
    pub fn summary(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("{}: {}", e.table_name, e.details))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl Default for SchemaDiff {
    fn default() -> Self {
        Self::new()
    }
}

/// A single diff entry.
#[derive(Debug, Clone)]
pub struct DiffEntry {
    /// Type of change.
    pub action: DiffAction,
    /// Affected table name.
    pub table_name: String,
    /// Human-readable description.
    pub details: String,
}

impl DiffEntry {
    fn new(action: DiffAction, table: &str, details: String) -> Self {
        Self {
            action,
            table_name: table.to_string(),
            details,
        }
    }
}

/// Type of schema change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffAction {
    CreateTable,
    DropTable,
    AddColumn,
    DropColumn,
    AlterColumn,
    AlterPrimaryKey,
    AddIndex,
    DropIndex,
    AlterIndex,
    AddForeignKey,
    DropForeignKey,
    AlterForeignKey,
    ChangeRows,
}
