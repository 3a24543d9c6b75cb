//! # Diploma Registry Gateway
//!
//! Interfaces to the registry's external collaborators, with in-memory
//! implementations for tests.
//!
//! ## Collaborators
//!
//! - [`ContentGateway`] - Stores opaque payloads, returns a content address.
//!   Failures here are fatal to the operation that needed the payload.
//! - [`LedgerGateway`] - Best-effort mirror of record state. Failures are
//!   always absorbed by the caller.
//! - [`VerificationRenderer`] - Turns a verification URL into image bytes.
//!
//! ## Testing
//!
//! [`MemoryContentGateway`] and [`MemoryLedger`] keep everything in memory and
//! can be switched offline or slowed down to exercise failure paths.

pub mod content;
pub mod error;
pub mod ledger;
pub mod render;

pub use content::{content_address, memory::MemoryContentGateway, memory::StoredBlob, ContentGateway};
pub use error::{ContentError, LedgerError, RenderError};
pub use ledger::{
    memory::LedgerToken, memory::MemoryLedger, AcademicRecord, DisabledLedger, Identity,
    LedgerGateway, LedgerReceipt, MintRequest, Transcript, TxReceipt,
};
pub use render::{TextRenderer, VerificationRenderer};
