//! # Cleanup abstractions.
//!
//! This module provides the cleanup-related types:
//! - [`Cleanup`] - trait for implementing async, cancel-aware cleanup
//! - [`CleanupFn`] - function-backed implementation
//! - [`CleanupRef`] - shared handle (`Arc<dyn Cleanup>`)
//! - [`ShutdownContext`] - cancellation token plus optional deadline

#[allow(clippy::module_inception)]
mod cleanup;
mod cleanup_fn;
mod context;

pub use cleanup::{Cleanup, CleanupRef};
pub use cleanup_fn::CleanupFn;
pub use context::ShutdownContext;
