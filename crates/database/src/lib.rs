//! # Ledger Database Crate
//!
//! This crate is the ledger's durable key/value collaborator. Every top-level
//! map, index and counter group is stored under a fixed logical key as one
//! JSON snapshot.
//!
//! ## Architectural Principles
//!
//! - **Swappable Backend:** Callers depend on the `StateStore` trait only. The
//!   in-memory and PostgreSQL backends are interchangeable at startup.
//! - **Atomic Batches:** `StateStore::commit` applies a `WriteBatch` entirely or
//!   not at all. The PostgreSQL backend wraps the batch in one transaction.
//! - **Asynchronous & Pooled:** All operations are asynchronous, and the PostgreSQL
//!   backend uses a connection pool (`PgPool`).
//!
//! ## Public API
//!
//! - `StateStore`, `WriteBatch`, `StateKey`, `get_json`: the storage contract.
//! - `MemoryStore`: a process-local backend.
//! - `DbRepository`: the PostgreSQL backend over the `ledger_state` table.
//! - `connect`, `run_migrations`, `open_store`: startup helpers.
//! - `DbError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod memory;
pub mod repository;
pub mod store;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, open_store, run_migrations};
pub use error::DbError;
pub use memory::MemoryStore;
pub use repository::DbRepository;
pub use store::{get_json, StateKey, StateStore, WriteBatch};
