mod error;
mod pool;

pub use error::map_db_error;
pub use pool::Database;
