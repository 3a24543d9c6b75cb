//! # Diploma Registry Core
//!
//! Pure data types for the diploma registry: records, identifiers, the
//! subjects payload, metadata documents and roles.
//!
//! This crate contains no I/O, no storage, no networking. Everything here is
//! plain computation over owned values, shared by the store, the gateways and
//! the lifecycle coordinator.
//!
//! ## Key Types
//!
//! - [`Record`] - A single certificate entry with a lifecycle
//! - [`RecordId`] - The unique, monotonic identifier minted at creation
//! - [`StudentIndex`] - Non-unique grouping key shared across reissues
//! - [`OwnerAddress`] - Lower-cased wallet address of the record owner
//! - [`Subjects`] - Free text or structured subject grades
//! - [`NewDiploma`] - Caller input for issuing a record
//!
//! ## Metadata
//!
//! Every issued record gets a JSON metadata document referencing its stored
//! payloads. See [`metadata`] module.

pub mod error;
pub mod metadata;
pub mod record;
pub mod role;
pub mod subjects;
pub mod types;
pub mod validation;

pub use error::{CoreError, ValidationError};
pub use metadata::{MetadataAttribute, MetadataDocument};
pub use record::{ContentRefs, DiplomaDetails, LedgerRef, NewDiploma, Record};
pub use role::Role;
pub use subjects::Subjects;
pub use types::{ContentAddress, OwnerAddress, RecordId, StudentIndex};
pub use validation::{parse_credits, validate_new_diploma};
