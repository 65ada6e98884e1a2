//! Testing utilities for crmdb.
//!
//! Store-level tests run against the in-memory store. Tests that need a real
//! PostgreSQL server use [`TestDatabase`] and are opt-in through
//! `TEST_DATABASE_URL`.

mod db;

pub use db::{IsolatedTestDb, TestDatabase};
