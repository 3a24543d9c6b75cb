//! # Diploma Registry Testkit
//!
//! Testing utilities for the diploma registry.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: A registry wired to in-memory gateways that tests can
//!   switch offline, slow down or inspect
//! - **Generators**: Proptest strategies for indices, addresses, subjects and
//!   operation sequences
//! - **Tracing**: A test subscriber so failing tests show registry logs
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use diploma_registry_testkit::fixtures::TestFixture;
//!
//! async fn example() {
//!     let fixture = TestFixture::new();
//!     let created = fixture.issue("201234").await.unwrap();
//!     assert_eq!(created.record.id.as_str(), "1");
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use diploma_registry_testkit::generators::ops;
//!
//! proptest! {
//!     #[test]
//!     fn at_most_one_valid(ops in ops(3, 20, true)) {
//!         // replay `ops` against a fixture, then check each index
//!     }
//! }
//! ```
//!
//! Integration tests for the lifecycle, concurrency and persistence live in
//! this crate's `tests/` directory.

pub mod fixtures;
pub mod generators;

pub use fixtures::{
    bare_record, fast_timeouts, random_owner, sample_diploma, sample_pdf, TestFixture, STALL,
};
pub use generators::{ops, Op};

/// Install a fmt subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .try_init();
}
