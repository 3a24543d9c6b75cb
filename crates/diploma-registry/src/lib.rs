//! # Diploma Registry
//!
//! Issues, supersedes and revokes diploma records, mirroring every change to
//! an optional external ledger that may be slow, unavailable or switched off.
//!
//! ## Overview
//!
//! - **Records** live in a durable local store, the source of truth.
//! - **Content** (document, verification image, metadata) goes to a
//!   content-addressed gateway. A content failure aborts the operation.
//! - **Ledger** mirroring is best-effort. A ledger failure never loses the
//!   local record; it is reported as [`LedgerSync::LocalOnly`].
//!
//! ## Key Properties
//!
//! - **Currency**: at most one valid record per student index
//! - **Uniqueness**: identifiers never repeat; allocation retries on conflict
//! - **Ledger optionality**: a record without a ledger reference is complete
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use bytes::Bytes;
//! use diploma_registry::{Gateways, Registry, RegistryConfig};
//! use diploma_registry::core::NewDiploma;
//! use diploma_registry::gateway::{MemoryContentGateway, MemoryLedger};
//! use diploma_registry::store::SqliteStore;
//!
//! async fn example() -> diploma_registry::Result<()> {
//!     let store = SqliteStore::open("registry.db")?;
//!     let gateways = Gateways::new(Arc::new(MemoryContentGateway::new()))
//!         .with_ledger(Arc::new(MemoryLedger::new()));
//!     let registry = Registry::new(store, gateways, RegistryConfig::default());
//!
//!     let input = NewDiploma::new("201234", "Ana", "Petrovic")
//!         .owner("0xAbC0000000000000000000000000000000000001")
//!         .program("Computer Science");
//!     let created = registry.create(&input, Bytes::from_static(b"%PDF-1.7")).await?;
//!
//!     let current = registry
//!         .queries()
//!         .current_valid_by_index(&input.student_index)
//!         .await?;
//!     assert_eq!(current.id, created.record.id);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `diploma_registry::core` - Records, identifiers, metadata, roles
//! - `diploma_registry::store` - Store traits, SQLite and memory backends
//! - `diploma_registry::gateway` - Content, ledger and renderer interfaces

pub mod allocator;
pub mod config;
pub mod error;
pub mod mirror;
pub mod query;
pub mod registry;
pub mod roles;

// Re-export component crates
pub use diploma_registry_core as core;
pub use diploma_registry_gateway as gateway;
pub use diploma_registry_store as store;

// Re-export main types for convenience
pub use allocator::IdentifierAllocator;
pub use config::RegistryConfig;
pub use error::{ConfigError, RegistryError, Result};
pub use mirror::{mint_request, LedgerSync, LocalOnlyReason};
pub use query::{QueryFacade, RecordView};
pub use registry::{CreateOutcome, Gateways, Registry, TransitionOutcome, Verification};
pub use roles::RoleDirectory;

// Re-export commonly used core types
pub use diploma_registry_core::{
    NewDiploma, OwnerAddress, Record, RecordId, Role, StudentIndex, Subjects,
};
