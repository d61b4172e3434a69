#![deny(unsafe_code)]

//! Shared test utilities for the Stillcode workspace.
//!
//! Provides config builders, recording sinks, a ready-made tracker harness
//! and tracing helpers so that individual crate tests stay concise.
//!
//! Add this crate as a `[dev-dependency]` in any workspace member:
//!
//! ```toml
//! [dev-dependencies]
//! stillcode-test-utils = { workspace = true }
//! ```

pub mod config;
pub mod harness;
pub mod sinks;
pub mod tracing_setup;
