mod history;
mod operation;
mod set;
mod step;

pub use history::{
    create_history_table_sql, delete_history_sql, insert_history_sql, AppliedMigration,
};
pub use operation::{DataRows, Operation};
pub use set::MigrationSet;
pub use step::{parse_version, Direction, Migration};
