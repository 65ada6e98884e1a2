use serde::{Deserialize, Serialize};

use super::column::ColumnDef;
use crate::sql::{quote_ident, quote_ident_list};

/// Action taken on referencing rows when a referenced row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferentialAction {
    Cascade,
    SetNull,
    Restrict,
    NoAction,
}

impl ReferentialAction {
    pub fn to_sql(self) -> &'static str {
        match self {
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::NoAction => "NO ACTION",
        }
    }
}

/// A foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyDef {
    /// Constraint name, unique within the owning table.
    pub name: String,
    /// Referencing columns.
    pub columns: Vec<String>,
    /// Referenced table.
    pub references_table: String,
    /// Referenced columns.
    pub references_columns: Vec<String>,
    /// Delete behavior.
    pub on_delete: ReferentialAction,
}

impl ForeignKeyDef {
    /// Single-column foreign key to `references_table.Id`, named
    /// `FK_<table>_<references_table>_<column>`.
    pub fn new(
        table: &str,
        column: &str,
        references_table: &str,
        on_delete: ReferentialAction,
    ) -> Self {
        Self {
            name: format!("FK_{}_{}_{}", table, references_table, column),
            columns: vec![column.to_string()],
            references_table: references_table.to_string(),
            references_columns: vec!["Id".to_string()],
            on_delete,
        }
    }

    /// Constraint clause as used inside CREATE TABLE and ALTER TABLE.
    pub fn to_sql_constraint(&self) -> String {
        format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {}",
            quote_ident(&self.name),
            quote_ident_list(&self.columns),
            quote_ident(&self.references_table),
            quote_ident_list(&self.references_columns),
            self.on_delete.to_sql()
        )
    }
}

/// An index, possibly composite and/or unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDef {
    /// Index name, unique across the schema.
    pub name: String,
    /// Indexed table.
    pub table: String,
    /// Indexed columns in order.
    pub columns: Vec<String>,
    /// Unique index.
    pub unique: bool,
}

impl IndexDef {
    /// Non-unique index named `IX_<table>_<col1>_<col2>...`.
    pub fn new(table: &str, columns: &[&str]) -> Self {
        Self {
            name: format!("IX_{}_{}", table, columns.join("_")),
            table: table.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn to_create_index_sql(&self) -> String {
        format!(
            "CREATE {}INDEX {} ON {} ({})",
            if self.unique { "UNIQUE " } else { "" },
            quote_ident(&self.name),
            quote_ident(&self.table),
            quote_ident_list(&self.columns)
        )
    }
}

/// Definition of a table as created by a migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDef {
    /// Table name.
    pub name: String,
    /// Columns in declaration order.
    pub columns: Vec<ColumnDef>,
    /// Primary key columns.
    pub primary_key: Vec<String>,
    /// Foreign keys declared with the table.
    pub foreign_keys: Vec<ForeignKeyDef>,
}

impl TableDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    pub fn columns(mut self, columns: impl IntoIterator<Item = ColumnDef>) -> Self {
        self.columns.extend(columns);
        self
    }

    pub fn primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Add a single-column foreign key to `references_table.Id`.
    pub fn foreign_key(
        mut self,
        column: &str,
        references_table: &str,
        on_delete: ReferentialAction,
    ) -> Self {
        let fk = ForeignKeyDef::new(&self.name, column, references_table, on_delete);
        self.foreign_keys.push(fk);
        self
    }

    pub fn get_column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Name of the primary key constraint.
    pub fn primary_key_name(&self) -> String {
        format!("PK_{}", self.name)
    }

    /// Generate CREATE TABLE SQL.
    pub fn to_create_table_sql(&self) -> String {
        let mut parts: Vec<String> = self.columns.iter().map(|c| c.to_sql_column()).collect();

        if !self.primary_key.is_empty() {
            parts.push(format!(
                "CONSTRAINT {} PRIMARY KEY ({})",
                quote_ident(&self.primary_key_name()),
                quote_ident_list(&self.primary_key)
            ));
        }

        for fk in &self.foreign_keys {
            parts.push(fk.to_sql_constraint());
        }

        format!(
            "CREATE TABLE {} (\n    {}\n)",
            quote_ident(&self.name),
            parts.join(",\n    ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn departments() -> TableDef {
        TableDef::new("Departments")
            .column(ColumnDef::id("Id"))
            .column(ColumnDef::string("Name", 128))
            .column(ColumnDef::integer("ParentDepartmentId").nullable())
            .primary_key(&["Id"])
            .foreign_key("ParentDepartmentId", "Departments", ReferentialAction::SetNull)
    }

    #[test]
    fn test_foreign_key_naming() {
        let table = departments();
        assert_eq!(table.foreign_keys.len(), 1);
        assert_eq!(
            table.foreign_keys[0].name,
            "FK_Departments_Departments_ParentDepartmentId"
        );
        assert_eq!(table.foreign_keys[0].references_columns, vec!["Id"]);
    }

    #[test]
    fn test_create_table_sql() {
        let sql = departments().to_create_table_sql();
        assert!(sql.starts_with(r#"CREATE TABLE "Departments" ("#));
        assert!(sql.contains(r#"CONSTRAINT "PK_Departments" PRIMARY KEY ("Id")"#));
        assert!(sql.contains(
            r#"FOREIGN KEY ("ParentDepartmentId") REFERENCES "Departments" ("Id") ON DELETE SET NULL"#
        ));
    }

    #[test]
    fn test_composite_unique_index_sql() {
        let index = IndexDef::new("LookupItems", &["CategoryId", "Code"]).unique();
        assert_eq!(index.name, "IX_LookupItems_CategoryId_Code");
        assert_eq!(
            index.to_create_index_sql(),
            r#"CREATE UNIQUE INDEX "IX_LookupItems_CategoryId_Code" ON "LookupItems" ("CategoryId", "Code")"#
        );
    }

    #[test]
    fn test_get_column() {
        let table = departments();
        assert!(table.get_column("Name").is_some());
        assert!(table.get_column("Missing").is_none());
    }
}
