mod column;
mod diff;
mod snapshot;
mod table;
mod types;

pub use column::{ColumnDef, ColumnDefault};
pub use diff::{DiffAction, DiffEntry, SchemaDiff};
pub use snapshot::{Row, SchemaSnapshot, TableState};
pub use table::{ForeignKeyDef, IndexDef, ReferentialAction, TableDef};
pub use types::{SqlType, SqlValue};
