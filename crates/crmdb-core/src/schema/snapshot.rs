//! In-memory model of a database schema.
//!
//! A [`SchemaSnapshot`] is what a store looks like after a sequence of
//! [`Operation`]s: tables, columns, indexes, foreign keys and seeded rows.
//! Applying an operation performs the same existence, dependency and
//! constraint checks a relational store would, so a migration history can
//! be replayed and its Down steps checked without a database.

use std::collections::{BTreeMap, VecDeque};

use serde::Serialize;

use super::column::ColumnDef;
use super::table::{ForeignKeyDef, IndexDef, ReferentialAction, TableDef};
use super::types::SqlValue;
use crate::error::{CrmError, Result};
use crate::migration::{DataRows, Operation};

/// A row keyed by column name.
pub type Row = BTreeMap<String, SqlValue>;

/// State of one table.
#[derive(Debug, Clone, Serialize)]
pub struct TableState {
    pub columns: BTreeMap<String, ColumnDef>,
    pub primary_key: Vec<String>,
    pub foreign_keys: BTreeMap<String, ForeignKeyDef>,
    pub indexes: BTreeMap<String, IndexDef>,
    pub rows: Vec<Row>,
    /// Last value each identity column handed out. Explicit values do not
    /// move it, matching an identity sequence.
    #[serde(skip)]
    sequences: BTreeMap<String, i64>,
}

// Sequence positions are not compared: deleting a generated row does not
// rewind its sequence, yet the schema and data are restored.
impl PartialEq for TableState {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns
            && self.primary_key == other.primary_key
            && self.foreign_keys == other.foreign_keys
            && self.indexes == other.indexes
            && self.rows == other.rows
    }
}

impl Eq for TableState {}

impl TableState {
    fn from_def(def: &TableDef) -> Self {
        Self {
            columns: def
                .columns
                .iter()
                .map(|c| (c.name.clone(), c.clone()))
                .collect(),
            primary_key: def.primary_key.clone(),
            foreign_keys: BTreeMap::new(),
            indexes: BTreeMap::new(),
            rows: Vec::new(),
            sequences: BTreeMap::new(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.get(name)
    }

    fn matches_definition(&self, def: &TableDef) -> bool {
        let columns: BTreeMap<String, ColumnDef> = def
            .columns
            .iter()
            .map(|c| (c.name.clone(), c.clone()))
            .collect();
        let foreign_keys: BTreeMap<String, ForeignKeyDef> = def
            .foreign_keys
            .iter()
            .map(|fk| (fk.name.clone(), fk.clone()))
            .collect();

        self.columns == columns
            && self.primary_key == def.primary_key
            && self.foreign_keys == foreign_keys
    }

    /// Whether `columns` is covered by the primary key or a unique index.
    fn has_unique_key(&self, columns: &[String]) -> bool {
        self.primary_key == columns
            || self
                .indexes
                .values()
                .any(|i| i.unique && i.columns == columns)
    }

    /// Name of the constraint or index that uses `column`, if any.
    fn column_usage(&self, column: &str) -> Option<String> {
        let column = column.to_string();
        if self.primary_key.contains(&column) {
            return Some("the primary key".to_string());
        }
        if let Some(index) = self.indexes.values().find(|i| i.columns.contains(&column)) {
            return Some(format!("index {}", index.name));
        }
        self.foreign_keys
            .values()
            .find(|fk| fk.columns.contains(&column))
            .map(|fk| format!("foreign key {}", fk.name))
    }

    fn next_identity(&self, column: &str) -> i64 {
        self.sequences.get(column).copied().unwrap_or(0) + 1
    }
}

/// In-memory schema model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaSnapshot {
    tables: BTreeMap<String, TableState>,
}

impl SchemaSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, name: &str) -> Option<&TableState> {
        self.tables.get(name)
    }

    pub fn contains_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn tables(&self) -> impl Iterator<Item = (&str, &TableState)> {
        self.tables.iter().map(|(name, state)| (name.as_str(), state))
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables.get(table).map(|t| t.rows.len()).unwrap_or(0)
    }

    /// Apply one operation. On error the snapshot is unchanged.
    pub fn apply(&mut self, op: &Operation) -> Result<()> {
        self.apply_all(std::slice::from_ref(op))
    }

    /// Apply a sequence of operations atomically: either all of them take
    /// effect or the snapshot is left as it was.
    pub fn apply_all(&mut self, ops: &[Operation]) -> Result<()> {
        let mut next = self.clone();
        for op in ops {
            next.apply_one(op)?;
        }
        *self = next;
        Ok(())
    }

    fn apply_one(&mut self, op: &Operation) -> Result<()> {
        match op {
            Operation::CreateTable(def) => self.create_table(def),
            Operation::DropTable(def) => self.drop_table(def),
            Operation::AddColumn { table, column } => self.add_column(table, column),
            Operation::DropColumn { table, column } => self.drop_column(table, column),
            Operation::RenameColumn { table, from, to } => self.rename_column(table, from, to),
            Operation::AlterColumn { table, from, to } => self.alter_column(table, from, to),
            Operation::CreateIndex(index) => self.create_index(index),
            Operation::DropIndex(index) => self.drop_index(index),
            Operation::AddForeignKey { table, foreign_key } => {
                self.check_foreign_key(table, foreign_key)?;
                self.table_mut(table)?
                    .foreign_keys
                    .insert(foreign_key.name.clone(), foreign_key.clone());
                Ok(())
            }
            Operation::DropForeignKey { table, foreign_key } => {
                self.drop_foreign_key(table, foreign_key)
            }
            Operation::InsertData(data) => self.insert_data(data),
            Operation::DeleteData(data) => self.delete_data(data),
            Operation::Sql { .. } => Ok(()),
        }
    }

    fn existing_table(&self, name: &str) -> Result<&TableState> {
        self.tables
            .get(name)
            .ok_or_else(|| CrmError::SchemaConflict(format!("table {} does not exist", name)))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut TableState> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| CrmError::SchemaConflict(format!("table {} does not exist", name)))
    }

    /// Foreign keys (with their owning table) that reference `table`.
    fn referencing_foreign_keys(&self, table: &str) -> Vec<(String, ForeignKeyDef)> {
        self.tables
            .iter()
            .flat_map(|(owner, state)| {
                state
                    .foreign_keys
                    .values()
                    .filter(|fk| fk.references_table == table)
                    .map(move |fk| (owner.clone(), fk.clone()))
            })
            .collect()
    }

    fn index_owner(&self, index_name: &str) -> Option<&str> {
        self.tables
            .iter()
            .find(|(_, state)| state.indexes.contains_key(index_name))
            .map(|(name, _)| name.as_str())
    }

    fn create_table(&mut self, def: &TableDef) -> Result<()> {
        if self.tables.contains_key(&def.name) {
            return Err(CrmError::SchemaConflict(format!(
                "table {} already exists",
                def.name
            )));
        }
        if def.columns.is_empty() {
            return Err(CrmError::Validation(format!(
                "table {} has no columns",
                def.name
            )));
        }
        for (i, column) in def.columns.iter().enumerate() {
            if def.columns[..i].iter().any(|c| c.name == column.name) {
                return Err(CrmError::Validation(format!(
                    "column {} is declared twice in table {}",
                    column.name, def.name
                )));
            }
            check_identity(&def.name, column)?;
        }
        if let Some(missing) = def
            .primary_key
            .iter()
            .find(|pk| def.get_column(pk).is_none())
        {
            return Err(CrmError::Validation(format!(
                "primary key column {} is not a column of {}",
                missing, def.name
            )));
        }

        // Foreign keys are checked after the table exists so a table can reference itself.
        self.tables
            .insert(def.name.clone(), TableState::from_def(def));
        for fk in &def.foreign_keys {
            self.check_foreign_key(&def.name, fk)?;
            self.table_mut(&def.name)?
                .foreign_keys
                .insert(fk.name.clone(), fk.clone());
        }
        Ok(())
    }

    fn drop_table(&mut self, def: &TableDef) -> Result<()> {
        let state = self.existing_table(&def.name)?;
        if !state.matches_definition(def) {
            return Err(CrmError::SchemaConflict(format!(
                "table {} does not match the definition being dropped",
                def.name
            )));
        }
        if let Some((owner, fk)) = self
            .referencing_foreign_keys(&def.name)
            .into_iter()
            .find(|(owner, _)| owner != &def.name)
        {
            return Err(CrmError::SchemaConflict(format!(
                "table {} is still referenced by {} on {}",
                def.name, fk.name, owner
            )));
        }
        self.tables.remove(&def.name);
        Ok(())
    }

    fn add_column(&mut self, table: &str, column: &ColumnDef) -> Result<()> {
        check_identity(table, column)?;
        let state = self.table_mut(table)?;
        if state.columns.contains_key(&column.name) {
            return Err(CrmError::SchemaConflict(format!(
                "column {}.{} already exists",
                table, column.name
            )));
        }
        if !column.is_optional_on_insert() && !state.rows.is_empty() {
            return Err(CrmError::ConstraintViolation(format!(
                "column {}.{} is NOT NULL without a default but the table has {} row(s)",
                table,
                column.name,
                state.rows.len()
            )));
        }

        for (i, row) in state.rows.iter_mut().enumerate() {
            let value = if column.identity {
                SqlValue::Int(i as i64 + 1)
            } else {
                column.default_row_value()
            };
            row.insert(column.name.clone(), value);
        }
        if column.identity {
            state
                .sequences
                .insert(column.name.clone(), state.rows.len() as i64);
        }
        state.columns.insert(column.name.clone(), column.clone());
        Ok(())
    }

    fn drop_column(&mut self, table: &str, column: &ColumnDef) -> Result<()> {
        let state = self.existing_table(table)?;
        match state.column(&column.name) {
            None => {
                return Err(CrmError::SchemaConflict(format!(
                    "column {}.{} does not exist",
                    table, column.name
                )))
            }
            Some(current) if current != column => {
                return Err(CrmError::SchemaConflict(format!(
                    "column {}.{} does not match the definition being dropped",
                    table, column.name
                )))
            }
            Some(_) => {}
        }
        if let Some(usage) = state.column_usage(&column.name) {
            return Err(CrmError::SchemaConflict(format!(
                "column {}.{} is still used by {}",
                table, column.name, usage
            )));
        }
        if let Some((owner, fk)) = self
            .referencing_foreign_keys(table)
            .into_iter()
            .find(|(_, fk)| fk.references_columns.contains(&column.name))
        {
            return Err(CrmError::SchemaConflict(format!(
                "column {}.{} is still referenced by {} on {}",
                table, column.name, fk.name, owner
            )));
        }

        let state = self.table_mut(table)?;
        state.columns.remove(&column.name);
        state.sequences.remove(&column.name);
        for row in &mut state.rows {
            row.remove(&column.name);
        }
        Ok(())
    }

    fn rename_column(&mut self, table: &str, from: &str, to: &str) -> Result<()> {
        let state = self.table_mut(table)?;
        if state.columns.contains_key(to) {
            return Err(CrmError::SchemaConflict(format!(
                "column {}.{} already exists",
                table, to
            )));
        }
        let mut column = state.columns.remove(from).ok_or_else(|| {
            CrmError::SchemaConflict(format!("column {}.{} does not exist", table, from))
        })?;
        column.name = to.to_string();
        state.columns.insert(to.to_string(), column);
        if let Some(last) = state.sequences.remove(from) {
            state.sequences.insert(to.to_string(), last);
        }

        rename_in(&mut state.primary_key, from, to);
        for index in state.indexes.values_mut() {
            rename_in(&mut index.columns, from, to);
        }
        for fk in state.foreign_keys.values_mut() {
            rename_in(&mut fk.columns, from, to);
        }
        for row in &mut state.rows {
            if let Some(value) = row.remove(from) {
                row.insert(to.to_string(), value);
            }
        }

        for other in self.tables.values_mut() {
            for fk in other.foreign_keys.values_mut() {
                if fk.references_table == table {
                    rename_in(&mut fk.references_columns, from, to);
                }
            }
        }
        Ok(())
    }

    fn alter_column(&mut self, table: &str, from: &ColumnDef, to: &ColumnDef) -> Result<()> {
        if from.name != to.name {
            return Err(CrmError::Validation(format!(
                "altering {}.{} cannot change its name; rename the column instead",
                table, from.name
            )));
        }
        check_identity(table, to)?;
        let state = self.table_mut(table)?;
        match state.columns.get(&from.name) {
            None => {
                return Err(CrmError::SchemaConflict(format!(
                    "column {}.{} does not exist",
                    table, from.name
                )))
            }
            Some(current) if current != from => {
                return Err(CrmError::SchemaConflict(format!(
                    "column {}.{} does not match the definition being altered",
                    table, from.name
                )))
            }
            Some(_) => {}
        }
        if !to.nullable
            && state
                .rows
                .iter()
                .any(|r| r.get(&to.name).map(SqlValue::is_null).unwrap_or(true))
        {
            return Err(CrmError::ConstraintViolation(format!(
                "column {}.{} contains NULL values",
                table, to.name
            )));
        }
        if !to.identity {
            state.sequences.remove(&to.name);
        }
        state.columns.insert(to.name.clone(), to.clone());
        Ok(())
    }

    fn create_index(&mut self, index: &IndexDef) -> Result<()> {
        if index.columns.is_empty() {
            return Err(CrmError::Validation(format!(
                "index {} has no columns",
                index.name
            )));
        }
        if let Some(owner) = self.index_owner(&index.name) {
            return Err(CrmError::SchemaConflict(format!(
                "index {} already exists on {}",
                index.name, owner
            )));
        }
        let state = self.existing_table(&index.table)?;
        if let Some(missing) = index.columns.iter().find(|c| state.column(c).is_none()) {
            return Err(CrmError::SchemaConflict(format!(
                "column {}.{} does not exist",
                index.table, missing
            )));
        }
        if index.unique {
            if let Some(dup) = first_duplicate(&state.rows, &index.columns) {
                return Err(CrmError::ConstraintViolation(format!(
                    "could not create unique index {}: duplicate key {}",
                    index.name, dup
                )));
            }
        }

        self.table_mut(&index.table)?
            .indexes
            .insert(index.name.clone(), index.clone());
        Ok(())
    }

    fn drop_index(&mut self, index: &IndexDef) -> Result<()> {
        let state = self.existing_table(&index.table)?;
        match state.indexes.get(&index.name) {
            None => {
                return Err(CrmError::SchemaConflict(format!(
                    "index {} does not exist",
                    index.name
                )))
            }
            Some(current) if current != index => {
                return Err(CrmError::SchemaConflict(format!(
                    "index {} does not match the definition being dropped",
                    index.name
                )))
            }
            Some(_) => {}
        }
        if index.unique && state.primary_key != index.columns {
            if let Some((owner, fk)) = self
                .referencing_foreign_keys(&index.table)
                .into_iter()
                .find(|(_, fk)| fk.references_columns == index.columns)
            {
                return Err(CrmError::SchemaConflict(format!(
                    "index {} is required by {} on {}",
                    index.name, fk.name, owner
                )));
            }
        }

        self.table_mut(&index.table)?.indexes.remove(&index.name);
        Ok(())
    }

    fn check_foreign_key(&self, table: &str, fk: &ForeignKeyDef) -> Result<()> {
        let owner = self.existing_table(table)?;
        if fk.columns.is_empty() || fk.columns.len() != fk.references_columns.len() {
            return Err(CrmError::Validation(format!(
                "foreign key {} must pair each column with a referenced column",
                fk.name
            )));
        }
        if owner.foreign_keys.contains_key(&fk.name) {
            return Err(CrmError::SchemaConflict(format!(
                "foreign key {} already exists on {}",
                fk.name, table
            )));
        }
        for column in &fk.columns {
            let def = owner.column(column).ok_or_else(|| {
                CrmError::SchemaConflict(format!("column {}.{} does not exist", table, column))
            })?;
            if fk.on_delete == ReferentialAction::SetNull && !def.nullable {
                return Err(CrmError::Validation(format!(
                    "foreign key {} uses ON DELETE SET NULL but {}.{} is NOT NULL",
                    fk.name, table, column
                )));
            }
        }

        let target = self.tables.get(&fk.references_table).ok_or_else(|| {
            CrmError::SchemaConflict(format!(
                "foreign key {} references missing table {}",
                fk.name, fk.references_table
            ))
        })?;
        if let Some(missing) = fk
            .references_columns
            .iter()
            .find(|c| target.column(c).is_none())
        {
            return Err(CrmError::SchemaConflict(format!(
                "foreign key {} references missing column {}.{}",
                fk.name, fk.references_table, missing
            )));
        }
        if !target.has_unique_key(&fk.references_columns) {
            return Err(CrmError::SchemaConflict(format!(
                "foreign key {}: no unique constraint on {} ({})",
                fk.name,
                fk.references_table,
                fk.references_columns.join(", ")
            )));
        }

        if let Some(row) = owner.rows.iter().find(|r| !self.parent_exists(fk, r)) {
            return Err(CrmError::ConstraintViolation(format!(
                "foreign key {} is violated by existing row {}",
                fk.name,
                describe_row(row, &fk.columns)
            )));
        }
        Ok(())
    }

    /// MATCH SIMPLE: a row with any NULL referencing column is exempt.
    fn parent_exists(&self, fk: &ForeignKeyDef, row: &Row) -> bool {
        let Some(criteria) = child_to_parent_criteria(fk, row) else {
            return true;
        };
        self.tables
            .get(&fk.references_table)
            .map(|t| t.rows.iter().any(|r| row_matches(r, &criteria)))
            .unwrap_or(false)
    }

    fn drop_foreign_key(&mut self, table: &str, fk: &ForeignKeyDef) -> Result<()> {
        let state = self.table_mut(table)?;
        match state.foreign_keys.get(&fk.name) {
            None => Err(CrmError::SchemaConflict(format!(
                "foreign key {} does not exist on {}",
                fk.name, table
            ))),
            Some(current) if current != fk => Err(CrmError::SchemaConflict(format!(
                "foreign key {} does not match the definition being dropped",
                fk.name
            ))),
            Some(_) => {
                state.foreign_keys.remove(&fk.name);
                Ok(())
            }
        }
    }

    fn insert_data(&mut self, data: &DataRows) -> Result<()> {
        data.validate()?;
        for values in &data.rows {
            let provided = data.named_row(values);
            let row = self.complete_row(&data.table, &provided)?;
            self.check_new_row(&data.table, &row)?;

            let state = self.table_mut(&data.table)?;
            let generated: Vec<(String, i64)> = state
                .columns
                .values()
                .filter(|c| c.identity && !provided.contains_key(&c.name))
                .filter_map(|c| match row.get(&c.name) {
                    Some(SqlValue::Int(v)) => Some((c.name.clone(), *v)),
                    _ => None,
                })
                .collect();
            state.sequences.extend(generated);
            state.rows.push(row);
        }
        Ok(())
    }

    /// Fill in omitted columns from identity and defaults.
    fn complete_row(&self, table: &str, provided: &Row) -> Result<Row> {
        let state = self.existing_table(table)?;
        if let Some(unknown) = provided.keys().find(|c| state.column(c).is_none()) {
            return Err(CrmError::SchemaConflict(format!(
                "column {}.{} does not exist",
                table, unknown
            )));
        }

        let mut row = Row::new();
        for column in state.columns.values() {
            let value = match provided.get(&column.name) {
                Some(value) => value.clone(),
                None if column.identity => SqlValue::Int(state.next_identity(&column.name)),
                None => column.default_row_value(),
            };
            if value.is_null() && !column.nullable {
                return Err(CrmError::ConstraintViolation(format!(
                    "null value in column {}.{} violates not-null constraint",
                    table, column.name
                )));
            }
            row.insert(column.name.clone(), value);
        }
        Ok(row)
    }

    fn check_new_row(&self, table: &str, row: &Row) -> Result<()> {
        let state = self.existing_table(table)?;

        let mut unique_keys: Vec<(&str, &[String])> = Vec::new();
        if !state.primary_key.is_empty() {
            unique_keys.push(("primary key", state.primary_key.as_slice()));
        }
        for index in state.indexes.values().filter(|i| i.unique) {
            unique_keys.push((index.name.as_str(), index.columns.as_slice()));
        }
        for (name, columns) in unique_keys {
            let Some(criteria) = key_criteria(row, columns) else {
                continue;
            };
            if state.rows.iter().any(|r| row_matches(r, &criteria)) {
                return Err(CrmError::ConstraintViolation(format!(
                    "duplicate key {} violates {} of {}",
                    describe_row(row, columns),
                    name,
                    table
                )));
            }
        }

        if let Some(fk) = state
            .foreign_keys
            .values()
            .find(|fk| !self.parent_exists(fk, row))
        {
            return Err(CrmError::ConstraintViolation(format!(
                "insert into {} violates foreign key {}: key {} is not present in {}",
                table,
                fk.name,
                describe_row(row, &fk.columns),
                fk.references_table
            )));
        }
        Ok(())
    }

    fn delete_data(&mut self, data: &DataRows) -> Result<()> {
        data.validate()?;
        for values in &data.rows {
            let key = data.key_of(values);
            let state = self.existing_table(&data.table)?;
            if !state.rows.iter().any(|r| row_matches(r, &key)) {
                return Err(CrmError::SchemaConflict(format!(
                    "row {} does not exist in {}",
                    describe_row(&key, &data.key_columns),
                    data.table
                )));
            }
            self.delete_cascading(&data.table, key)?;
        }
        Ok(())
    }

    /// Delete matching rows and apply each referencing foreign key's delete rule.
    fn delete_cascading(&mut self, table: &str, criteria: Row) -> Result<()> {
        let mut queue = VecDeque::from([(table.to_string(), criteria)]);

        while let Some((current, criteria)) = queue.pop_front() {
            let removed: Vec<Row> = {
                let state = self.table_mut(&current)?;
                let (removed, kept): (Vec<Row>, Vec<Row>) = std::mem::take(&mut state.rows)
                    .into_iter()
                    .partition(|r| row_matches(r, &criteria));
                state.rows = kept;
                removed
            };
            if removed.is_empty() {
                continue;
            }

            let referencing = self.referencing_foreign_keys(&current);
            for parent in &removed {
                for (owner, fk) in &referencing {
                    let Some(child_criteria) = parent_to_child_criteria(fk, parent) else {
                        continue;
                    };
                    match fk.on_delete {
                        ReferentialAction::Cascade => {
                            queue.push_back((owner.clone(), child_criteria));
                        }
                        ReferentialAction::SetNull => {
                            let state = self.table_mut(owner)?;
                            for row in state
                                .rows
                                .iter_mut()
                                .filter(|r| row_matches(r, &child_criteria))
                            {
                                for column in &fk.columns {
                                    row.insert(column.clone(), SqlValue::Null);
                                }
                            }
                        }
                        ReferentialAction::Restrict | ReferentialAction::NoAction => {
                            let state = self.existing_table(owner)?;
                            if state.rows.iter().any(|r| row_matches(r, &child_criteria)) {
                                return Err(CrmError::ConstraintViolation(format!(
                                    "delete from {} violates foreign key {} on {}",
                                    current, fk.name, owner
                                )));
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

fn check_identity(table: &str, column: &ColumnDef) -> Result<()> {
    if column.identity && !column.sql_type.supports_identity() {
        return Err(CrmError::Validation(format!(
            "identity column {}.{} must be an integer type",
            table, column.name
        )));
    }
    Ok(())
}

fn rename_in(columns: &mut [String], from: &str, to: &str) {
    for column in columns.iter_mut().filter(|c| c.as_str() == from) {
        *column = to.to_string();
    }
}

fn row_matches(row: &Row, criteria: &Row) -> bool {
    criteria.iter().all(|(k, v)| row.get(k) == Some(v))
}

/// Key values of `row` for `columns`, or None when any of them is NULL.
fn key_criteria(row: &Row, columns: &[String]) -> Option<Row> {
    columns
        .iter()
        .map(|c| match row.get(c) {
            Some(v) if !v.is_null() => Some((c.clone(), v.clone())),
            _ => None,
        })
        .collect()
}

fn child_to_parent_criteria(fk: &ForeignKeyDef, child: &Row) -> Option<Row> {
    fk.columns
        .iter()
        .zip(&fk.references_columns)
        .map(|(c, rc)| match child.get(c) {
            Some(v) if !v.is_null() => Some((rc.clone(), v.clone())),
            _ => None,
        })
        .collect()
}

fn parent_to_child_criteria(fk: &ForeignKeyDef, parent: &Row) -> Option<Row> {
    fk.references_columns
        .iter()
        .zip(&fk.columns)
        .map(|(rc, c)| match parent.get(rc) {
            Some(v) if !v.is_null() => Some((c.clone(), v.clone())),
            _ => None,
        })
        .collect()
}

fn first_duplicate(rows: &[Row], columns: &[String]) -> Option<String> {
    let mut seen: Vec<Row> = Vec::new();
    for row in rows {
        let Some(key) = key_criteria(row, columns) else {
            continue;
        };
        if seen.contains(&key) {
            return Some(describe_row(row, columns));
        }
        seen.push(key);
    }
    None
}

fn describe_row(row: &Row, columns: &[String]) -> String {
    let parts: Vec<String> = columns
        .iter()
        .map(|c| {
            let value = row.get(c).cloned().unwrap_or(SqlValue::Null);
            format!("{}={}", c, value.to_sql_literal())
        })
        .collect();
    format!("({})", parts.join(", "))
}
