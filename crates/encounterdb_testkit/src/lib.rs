//! # EncounterDB Testkit
//!
//! Test utilities for EncounterDB.
//!
//! This crate provides:
//! - Repository fixtures over in-memory and file stores
//! - Sample clinical documents
//! - Blob store wrappers that count or fail operations
//! - A deterministic clock for creation timestamps
//! - Property-based test generators using proptest
//! - Helpers for comparing what the repository reports across reloads
//!
//! ## Usage
//!
//! ```rust
//! use encounterdb_testkit::prelude::*;
//!
//! let mut test = TestRepository::memory();
//! let id = test
//!     .insert_clinical_record(&patient_key("30111222"), samples::encounter("Ana"))
//!     .unwrap();
//! let mut reopened = test.reopen();
//! assert!(reopened.get_record(id).unwrap().is_some());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod faults;
pub mod fixtures;
pub mod generators;
pub mod integration;

#[cfg(test)]
mod end_to_end;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::clock::*;
    pub use crate::faults::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
}

pub use clock::*;
pub use faults::*;
pub use fixtures::*;
pub use generators::*;
pub use integration::*;
