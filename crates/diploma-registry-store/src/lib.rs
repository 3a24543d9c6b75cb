//! # Diploma Registry Store
//!
//! Storage abstraction for the diploma registry. Provides trait-based
//! interfaces for record and role persistence with SQLite and in-memory
//! implementations.
//!
//! ## Overview
//!
//! The store module abstracts record storage behind the [`RecordStore`]
//! trait, allowing the registry to be storage-agnostic. The primary
//! implementation is [`SqliteStore`], with [`MemoryStore`] for testing.
//!
//! ## Key Types
//!
//! - [`RecordStore`] - The async trait for record operations
//! - [`RoleStore`] - The async trait for the address → role mapping
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`InsertResult`] - Result of inserting a record
//! - [`Transition`] - Result of flipping a record's validity
//!
//! ## Usage
//!
//! ```rust,no_run
//! use diploma_registry_store::{RecordStore, SqliteStore};
//! use diploma_registry_core::StudentIndex;
//!
//! async fn example() {
//!     // Open a SQLite database
//!     let store = SqliteStore::open("registry.db").unwrap();
//!
//!     // Or use an in-memory database for testing
//!     let store = SqliteStore::open_memory().unwrap();
//!
//!     let current = store
//!         .current_valid(&StudentIndex::new("201234"))
//!         .await
//!         .unwrap();
//!     assert!(current.is_none());
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Unique identifiers**: Inserting a second record with an existing
//!   identifier returns `Conflict`; the caller re-allocates and retries
//! - **Currency**: Inserting or validating a record marks every other valid
//!   record for the same student index invalid in the same transaction
//! - **Ordering**: Listings are most-recent-first by creation time, with
//!   insertion order breaking ties

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{InsertResult, RecordStore, RecordStoreExt, RoleStore, Transition};
