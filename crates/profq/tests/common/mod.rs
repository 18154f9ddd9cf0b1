//! Shared test utilities for profq integration tests.
//!
//! This module provides:
//! - `TestHarness` with a temporary job root and an in-memory scheduler
//! - `ConfigBuilder` for creating configurations programmatically

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
