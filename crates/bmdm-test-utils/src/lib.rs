#![deny(unsafe_code)]

//! Shared test utilities for the bmdm workspace.
//!
//! Provides a throwaway, already-booted archive and tracing helpers so that
//! individual crate tests stay concise and consistent.
//!
//! Add this crate as a `[dev-dependency]` in any workspace member:
//!
//! ```toml
//! [dev-dependencies]
//! bmdm-test-utils = { workspace = true }
//! ```

pub mod archive;
pub mod tracing_setup;

pub use archive::TestArchive;
