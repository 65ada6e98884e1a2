use super::{quote_ident, quote_ident_list, split_sql_statements};
use crate::migration::{DataRows, Operation};
use crate::schema::ColumnDef;

/// Renders operations as PostgreSQL statements.
///
/// Output is deterministic: the same operations always produce the same
/// statements in the same order.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Statements for a single operation.
    pub fn render(&self, op: &Operation) -> Vec<String> {
        match op {
            Operation::CreateTable(table) => vec![table.to_create_table_sql()],
            Operation::DropTable(table) => {
                vec![format!("DROP TABLE {}", quote_ident(&table.name))]
            }
            Operation::AddColumn { table, column } => vec![format!(
                "ALTER TABLE {} ADD COLUMN {}",
                quote_ident(table),
                column.to_sql_column()
            )],
            Operation::DropColumn { table, column } => vec![format!(
                "ALTER TABLE {} DROP COLUMN {}",
                quote_ident(table),
                quote_ident(&column.name)
            )],
            Operation::RenameColumn { table, from, to } => vec![format!(
                "ALTER TABLE {} RENAME COLUMN {} TO {}",
                quote_ident(table),
                quote_ident(from),
                quote_ident(to)
            )],
            Operation::AlterColumn { table, from, to } => self.alter_column(table, from, to),
            Operation::CreateIndex(index) => vec![index.to_create_index_sql()],
            Operation::DropIndex(index) => {
                vec![format!("DROP INDEX {}", quote_ident(&index.name))]
            }
            Operation::AddForeignKey { table, foreign_key } => vec![format!(
                "ALTER TABLE {} ADD {}",
                quote_ident(table),
                foreign_key.to_sql_constraint()
            )],
            Operation::DropForeignKey { table, foreign_key } => vec![format!(
                "ALTER TABLE {} DROP CONSTRAINT {}",
                quote_ident(table),
                quote_ident(&foreign_key.name)
            )],
            Operation::InsertData(data) => self.insert(data),
            Operation::DeleteData(data) => self.delete(data),
            Operation::Sql { forward, .. } => split_sql_statements(forward),
        }
    }

    /// Statements for a sequence of operations.
    pub fn render_all(&self, ops: &[Operation]) -> Vec<String> {
        ops.iter().flat_map(|op| self.render(op)).collect()
    }

    /// A runnable script: every statement terminated by `;`.
    pub fn render_script(&self, ops: &[Operation]) -> String {
        self.render_all(ops)
            .iter()
            .map(|s| format!("{};", s))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn alter_column(&self, table: &str, from: &ColumnDef, to: &ColumnDef) -> Vec<String> {
        let prefix = format!(
            "ALTER TABLE {} ALTER COLUMN {}",
            quote_ident(table),
            quote_ident(&to.name)
        );
        let mut statements = Vec::new();

        if from.sql_type != to.sql_type {
            statements.push(format!("{} TYPE {}", prefix, to.sql_type.to_sql()));
        }
        if from.identity != to.identity {
            if to.identity {
                statements.push(format!("{} ADD GENERATED BY DEFAULT AS IDENTITY", prefix));
            } else {
                statements.push(format!("{} DROP IDENTITY", prefix));
            }
        }
        if from.nullable != to.nullable {
            if to.nullable {
                statements.push(format!("{} DROP NOT NULL", prefix));
            } else {
                statements.push(format!("{} SET NOT NULL", prefix));
            }
        }
        if from.default != to.default {
            match &to.default {
                Some(default) => {
                    statements.push(format!("{} SET DEFAULT {}", prefix, default.to_sql()))
                }
                None => statements.push(format!("{} DROP DEFAULT", prefix)),
            }
        }

        statements
    }

    fn insert(&self, data: &DataRows) -> Vec<String> {
        if data.rows.is_empty() {
            return Vec::new();
        }
        let values: Vec<String> = data
            .rows
            .iter()
            .map(|row| {
                let literals: Vec<String> = row.iter().map(|v| v.to_sql_literal()).collect();
                format!("({})", literals.join(", "))
            })
            .collect();

        vec![format!(
            "INSERT INTO {} ({}) VALUES {}",
            quote_ident(&data.table),
            quote_ident_list(&data.columns),
            values.join(", ")
        )]
    }

    fn delete(&self, data: &DataRows) -> Vec<String> {
        data.rows
            .iter()
            .map(|row| {
                let conditions: Vec<String> = data
                    .key_of(row)
                    .iter()
                    .map(|(column, value)| {
                        if value.is_null() {
                            format!("{} IS NULL", quote_ident(column))
                        } else {
                            format!("{} = {}", quote_ident(column), value.to_sql_literal())
                        }
                    })
                    .collect();
                format!(
                    "DELETE FROM {} WHERE {}",
                    quote_ident(&data.table),
                    conditions.join(" AND ")
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ForeignKeyDef, IndexDef, ReferentialAction, SqlType, SqlValue, TableDef};

    #[test]
    fn test_render_add_and_drop_column() {
        let dialect = PostgresDialect;
        let add = Operation::AddColumn {
            table: "Opportunities".into(),
            column: ColumnDef::integer("AccountId").nullable(),
        };
        assert_eq!(
            dialect.render(&add),
            vec![r#"ALTER TABLE "Opportunities" ADD COLUMN "AccountId" INTEGER"#]
        );
        assert_eq!(
            dialect.render(&add.inverse()),
            vec![r#"ALTER TABLE "Opportunities" DROP COLUMN "AccountId""#]
        );
    }

    #[test]
    fn test_render_rename_column() {
        let op = Operation::RenameColumn {
            table: "Users".into(),
            from: "Username".into(),
            to: "UserName".into(),
        };
        assert_eq!(
            PostgresDialect.render(&op),
            vec![r#"ALTER TABLE "Users" RENAME COLUMN "Username" TO "UserName""#]
        );
    }

    #[test]
    fn test_render_alter_column_only_emits_changes() {
        let from = ColumnDef::string("Phone", 20).nullable();
        let to = ColumnDef::string("Phone", 32).nullable();
        let op = Operation::AlterColumn {
            table: "Contacts".into(),
            from,
            to,
        };
        assert_eq!(
            PostgresDialect.render(&op),
            vec![r#"ALTER TABLE "Contacts" ALTER COLUMN "Phone" TYPE VARCHAR(32)"#]
        );

        let from = ColumnDef::new("Rank", SqlType::Integer).nullable();
        let to = ColumnDef::new("Rank", SqlType::Integer).default_value(0);
        let stmts = PostgresDialect.render(&Operation::AlterColumn {
            table: "LookupItems".into(),
            from,
            to,
        });
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].ends_with("SET NOT NULL"));
        assert!(stmts[1].ends_with("SET DEFAULT 0"));
    }

    #[test]
    fn test_render_foreign_key_and_index() {
        let fk = ForeignKeyDef::new(
            "Opportunities",
            "AccountId",
            "Accounts",
            ReferentialAction::SetNull,
        );
        let add = Operation::AddForeignKey {
            table: "Opportunities".into(),
            foreign_key: fk,
        };
        assert_eq!(
            PostgresDialect.render(&add),
            vec![
                r#"ALTER TABLE "Opportunities" ADD CONSTRAINT "FK_Opportunities_Accounts_AccountId" FOREIGN KEY ("AccountId") REFERENCES "Accounts" ("Id") ON DELETE SET NULL"#
            ]
        );
        assert_eq!(
            PostgresDialect.render(&add.inverse()),
            vec![r#"ALTER TABLE "Opportunities" DROP CONSTRAINT "FK_Opportunities_Accounts_AccountId""#]
        );

        let index = Operation::DropIndex(IndexDef::new("Opportunities", &["AccountId"]));
        assert_eq!(
            PostgresDialect.render(&index),
            vec![r#"DROP INDEX "IX_Opportunities_AccountId""#]
        );
    }

    #[test]
    fn test_render_seed_rows() {
        let rows = DataRows::new("Users", &["Email"], &["Email", "IsActive"])
            .row(vec![SqlValue::from("admin@crm.local"), SqlValue::Bool(true)]);
        let insert = Operation::InsertData(rows);
        assert_eq!(
            PostgresDialect.render(&insert),
            vec![r#"INSERT INTO "Users" ("Email", "IsActive") VALUES ('admin@crm.local', TRUE)"#]
        );
        assert_eq!(
            PostgresDialect.render(&insert.inverse()),
            vec![r#"DELETE FROM "Users" WHERE "Email" = 'admin@crm.local'"#]
        );
    }

    #[test]
    fn test_render_script_is_deterministic() {
        let ops = vec![
            Operation::CreateTable(
                TableDef::new("Tags")
                    .column(ColumnDef::id("Id"))
                    .column(ColumnDef::string("Name", 64))
                    .primary_key(&["Id"]),
            ),
            Operation::CreateIndex(IndexDef::new("Tags", &["Name"]).unique()),
        ];
        let first = PostgresDialect.render_script(&ops);
        let second = PostgresDialect.render_script(&ops);
        assert_eq!(first, second);
        assert!(first.ends_with(r#"CREATE UNIQUE INDEX "IX_Tags_Name" ON "Tags" ("Name");"#));
    }

    #[test]
    fn test_render_raw_sql_splits_statements() {
        let op = Operation::Sql {
            forward: "UPDATE \"Users\" SET \"IsActive\" = TRUE; SELECT 1;".into(),
            backward: String::new(),
        };
        assert_eq!(PostgresDialect.render(&op).len(), 2);
        assert!(PostgresDialect.render(&op.inverse()).is_empty());
    }
}
