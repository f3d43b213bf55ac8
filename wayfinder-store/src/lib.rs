//! `RecordSearcher` backends for Wayfinder: an in-memory table map for
//! tests and demos, and a SQLite-backed searcher for real deployments.

pub mod in_memory;
pub mod sqlx_searcher;

pub use in_memory::InMemoryRecordSearcher;
pub use sqlx_searcher::SqlxRecordSearcher;
