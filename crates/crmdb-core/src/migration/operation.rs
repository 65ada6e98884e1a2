use serde::{Deserialize, Serialize};

use crate::error::{CrmError, Result};
use crate::schema::{ColumnDef, ForeignKeyDef, IndexDef, Row, SqlValue, TableDef};

/// A single schema or data change.
///
/// Operations that remove something carry its full definition, so every
/// operation has an exact inverse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    CreateTable(TableDef),
    DropTable(TableDef),
    AddColumn {
        table: String,
        column: ColumnDef,
    },
    DropColumn {
        table: String,
        column: ColumnDef,
    },
    RenameColumn {
        table: String,
        from: String,
        to: String,
    },
    AlterColumn {
        table: String,
        from: ColumnDef,
        to: ColumnDef,
    },
    CreateIndex(IndexDef),
    DropIndex(IndexDef),
    AddForeignKey {
        table: String,
        foreign_key: ForeignKeyDef,
    },
    DropForeignKey {
        table: String,
        foreign_key: ForeignKeyDef,
    },
    InsertData(DataRows),
    DeleteData(DataRows),
    /// Raw SQL the schema model cannot see into.
    Sql { forward: String, backward: String },
}

impl Operation {
    /// The operation that undoes this one.
    pub fn inverse(&self) -> Operation {
        match self {
            Operation::CreateTable(table) => Operation::DropTable(table.clone()),
            Operation::DropTable(table) => Operation::CreateTable(table.clone()),
            Operation::AddColumn { table, column } => Operation::DropColumn {
                table: table.clone(),
                column: column.clone(),
            },
            Operation::DropColumn { table, column } => Operation::AddColumn {
                table: table.clone(),
                column: column.clone(),
            },
            Operation::RenameColumn { table, from, to } => Operation::RenameColumn {
                table: table.clone(),
                from: to.clone(),
                to: from.clone(),
            },
            Operation::AlterColumn { table, from, to } => Operation::AlterColumn {
                table: table.clone(),
                from: to.clone(),
                to: from.clone(),
            },
            Operation::CreateIndex(index) => Operation::DropIndex(index.clone()),
            Operation::DropIndex(index) => Operation::CreateIndex(index.clone()),
            Operation::AddForeignKey { table, foreign_key } => Operation::DropForeignKey {
                table: table.clone(),
                foreign_key: foreign_key.clone(),
            },
            Operation::DropForeignKey { table, foreign_key } => Operation::AddForeignKey {
                table: table.clone(),
                foreign_key: foreign_key.clone(),
            },
            Operation::InsertData(rows) => Operation::DeleteData(rows.clone()),
            Operation::DeleteData(rows) => Operation::InsertData(rows.clone()),
            Operation::Sql { forward, backward } => Operation::Sql {
                forward: backward.clone(),
                backward: forward.clone(),
            },
        }
    }

    /// Inverse of a whole step: each operation inverted, in reverse order.
    pub fn invert_all(ops: &[Operation]) -> Vec<Operation> {
        ops.iter().rev().map(Operation::inverse).collect()
    }
}

/// Rows inserted by a seeding step, or removed by its inverse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataRows {
    pub table: String,
    /// Columns identifying a row when it is deleted again.
    pub key_columns: Vec<String>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
}

impl DataRows {
    pub fn new(table: &str, key_columns: &[&str], columns: &[&str]) -> Self {
        Self {
            table: table.to_string(),
            key_columns: key_columns.iter().map(|c| c.to_string()).collect(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn row(mut self, values: Vec<SqlValue>) -> Self {
        self.rows.push(values);
        self
    }

    /// Every row has one value per column and every key column is listed.
    pub fn validate(&self) -> Result<()> {
        if self.key_columns.is_empty() {
            return Err(CrmError::Validation(format!(
                "data rows for {} need at least one key column",
                self.table
            )));
        }
        if let Some(key) = self.key_columns.iter().find(|k| !self.columns.contains(k)) {
            return Err(CrmError::Validation(format!(
                "key column {} is not among the data columns of {}",
                key, self.table
            )));
        }
        if let Some(row) = self.rows.iter().find(|r| r.len() != self.columns.len()) {
            return Err(CrmError::Validation(format!(
                "row for {} has {} values, expected {}",
                self.table,
                row.len(),
                self.columns.len()
            )));
        }
        Ok(())
    }

    /// Column/value pairs of one row.
    pub fn named_row(&self, row: &[SqlValue]) -> Row {
        self.columns
            .iter()
            .cloned()
            .zip(row.iter().cloned())
            .collect()
    }

    /// Key column/value pairs of one row.
    pub fn key_of(&self, row: &[SqlValue]) -> Row {
        self.columns
            .iter()
            .zip(row.iter())
            .filter(|(c, _)| self.key_columns.contains(c))
            .map(|(c, v)| (c.clone(), v.clone()))
            .collect()
    }
}
