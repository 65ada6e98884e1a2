use serde::{Deserialize, Serialize};

use super::types::{SqlType, SqlValue};
use crate::sql::quote_ident;

/// Default applied to a column when a row does not provide a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnDefault {
    /// Literal value.
    Value(SqlValue),
    /// SQL expression evaluated by the store, e.g. `CURRENT_TIMESTAMP`.
    Expression(String),
}

impl ColumnDefault {
    pub fn to_sql(&self) -> String {
        match self {
            ColumnDefault::Value(v) => v.to_sql_literal(),
            ColumnDefault::Expression(expr) => expr.clone(),
        }
    }
}

/// Definition of a table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,

    /// SQL type.
    pub sql_type: SqlType,

    /// Whether the column accepts NULL.
    pub nullable: bool,

    /// Default value.
    pub default: Option<ColumnDefault>,

    /// Values are generated by the store (`GENERATED BY DEFAULT AS IDENTITY`).
    pub identity: bool,
}

impl ColumnDef {
    /// Create a NOT NULL column without default.
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
            nullable: false,
            default: None,
            identity: false,
        }
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, SqlType::Integer)
    }

    pub fn string(name: impl Into<String>, max_len: u32) -> Self {
        Self::new(name, SqlType::Varchar(Some(max_len)))
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, SqlType::Text)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, SqlType::Boolean)
    }

    pub fn timestamp(name: impl Into<String>) -> Self {
        Self::new(name, SqlType::Timestamptz)
    }

    pub fn decimal(name: impl Into<String>, precision: u8, scale: u8) -> Self {
        Self::new(name, SqlType::Decimal(precision, scale))
    }

    /// Integer identity column.
    pub fn id(name: impl Into<String>) -> Self {
        Self::integer(name).identity()
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<SqlValue>) -> Self {
        self.default = Some(ColumnDefault::Value(value.into()));
        self
    }

    pub fn default_sql(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(ColumnDefault::Expression(expr.into()));
        self
    }

    pub fn identity(mut self) -> Self {
        self.identity = true;
        self
    }

    /// Whether an INSERT may omit this column.
    pub fn is_optional_on_insert(&self) -> bool {
        self.nullable || self.identity || self.default.is_some()
    }

    /// Value an existing row receives when this column is added.
    pub fn default_row_value(&self) -> SqlValue {
        match &self.default {
            Some(ColumnDefault::Value(v)) => v.clone(),
            Some(ColumnDefault::Expression(expr)) => SqlValue::Raw(expr.clone()),
            None => SqlValue::Null,
        }
    }

    /// Generate SQL column definition.
    pub fn to_sql_column(&self) -> String {
        let mut parts = vec![quote_ident(&self.name), self.sql_type.to_sql()];

        if self.identity {
            parts.push("GENERATED BY DEFAULT AS IDENTITY".to_string());
        }

        if !self.nullable {
            parts.push("NOT NULL".to_string());
        }

        if let Some(ref default) = self.default {
            parts.push(format!("DEFAULT {}", default.to_sql()));
        }

        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_defaults_to_not_null() {
        let column = ColumnDef::string("Email", 256);
        assert!(!column.nullable);
        assert!(!column.is_optional_on_insert());
        assert_eq!(column.to_sql_column(), r#""Email" VARCHAR(256) NOT NULL"#);
    }

    #[test]
    fn test_identity_column_sql() {
        let column = ColumnDef::id("Id");
        assert!(column.is_optional_on_insert());
        assert_eq!(
            column.to_sql_column(),
            r#""Id" INTEGER GENERATED BY DEFAULT AS IDENTITY NOT NULL"#
        );
    }

    #[test]
    fn test_default_column_sql() {
        let deleted = ColumnDef::boolean("IsDeleted").default_value(false);
        assert_eq!(
            deleted.to_sql_column(),
            r#""IsDeleted" BOOLEAN NOT NULL DEFAULT FALSE"#
        );

        let created = ColumnDef::timestamp("CreatedAt").default_sql("CURRENT_TIMESTAMP");
        assert_eq!(
            created.default_row_value(),
            SqlValue::Raw("CURRENT_TIMESTAMP".into())
        );
    }

    #[test]
    fn test_nullable_column_sql() {
        let column = ColumnDef::timestamp("UpdatedAt").nullable();
        assert_eq!(column.to_sql_column(), r#""UpdatedAt" TIMESTAMPTZ"#);
        assert_eq!(column.default_row_value(), SqlValue::Null);
    }
}
