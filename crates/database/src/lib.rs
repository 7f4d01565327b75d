//! # Meridian Database Crate
//!
//! This crate is the Persistence Adapter. It stores raw prices, the derived
//! `returns_daily` panel and the append-only `data_quality_log`.
//!
//! ## Architectural Principles
//!
//! - **Layer 2 Adapter:** This crate encapsulates all storage-specific logic behind the
//!   `MetricsStore` trait, so the pipeline never sees SQL.
//! - **Replace, Never Duplicate:** Metric rows are keyed by (date, ticker). One ticker's
//!   recompute range is replaced inside a single transaction, so a rerun over the same
//!   range leaves exactly one row per key.
//! - **Asynchronous & Pooled:** All operations are asynchronous, and the PostgreSQL
//!   implementation uses a connection pool (`PgPool`) for concurrent access.
//!
//! ## Public API
//!
//! - `connect`: The async function to establish the database connection pool.
//! - `run_migrations`: Applies the embedded schema migrations.
//! - `MetricsStore`: The storage trait the pipeline is written against.
//! - `DbRepository`: The PostgreSQL implementation.
//! - `InMemoryStore`: The in-process implementation used by tests and dry runs.
//! - `DbError`: The specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod memory;
pub mod repository;
pub mod store;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, run_migrations};
pub use error::DbError;
pub use memory::InMemoryStore;
pub use repository::DbRepository;
pub use store::MetricsStore;
