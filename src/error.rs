//! Error types used by the registry, cleanup callbacks and the shutdown trigger.
//!
//! This module defines:
//!
//! - [`RegistryError`]: errors raised by the registry itself (duplicate unit, already disposed).
//! - [`CleanupError`]: errors reported by individual cleanup callbacks.
//! - [`ShutdownError`]: one entry of a [`MultiError`], either of the above.
//! - [`MultiError`]: ordered collection of errors gathered during one shutdown.
//!
//! The enums provide `as_label` for logs/metrics, mirroring the rest of the crate.

use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// # Errors produced by the registry.
///
/// `AlreadyRegistered` is recoverable (the caller may keep using the existing unit);
/// `ShutdownCalled` is permanent for the rest of the registry's lifetime.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// A unit with the same identity is already registered.
    #[error("duplicate cleanup unit registration attempted")]
    AlreadyRegistered,

    /// The registry has been shut down and no longer accepts changes.
    #[error("shutdown already called; registry no longer accepts registrations")]
    ShutdownCalled,
}

impl RegistryError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use gracevisor::RegistryError;
    ///
    /// assert_eq!(RegistryError::ShutdownCalled.as_label(), "registry_shutdown_called");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RegistryError::AlreadyRegistered => "registry_already_registered",
            RegistryError::ShutdownCalled => "registry_shutdown_called",
        }
    }
}

/// # Errors reported by a cleanup callback.
///
/// A failing callback never aborts the shutdown sequence; its error is recorded
/// in the [`MultiError`] returned by [`Registry::shutdown`](crate::Registry::shutdown).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CleanupError {
    /// Cleanup failed with the given message.
    #[error("cleanup failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Cleanup gave up because the shutdown context was cancelled.
    #[error("context cancelled")]
    Canceled,

    /// Cleanup gave up because the shutdown deadline was reached.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The deadline budget that was exceeded.
        timeout: Duration,
    },

    /// Cleanup panicked; the panic was caught by the registry.
    #[error("cleanup panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },
}

impl CleanupError {
    /// Shorthand for [`CleanupError::Fail`].
    ///
    /// ```
    /// use gracevisor::CleanupError;
    ///
    /// let err = CleanupError::fail("disk full");
    /// assert_eq!(err.to_string(), "cleanup failed: disk full");
    /// ```
    pub fn fail(error: impl fmt::Display) -> Self {
        CleanupError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            CleanupError::Fail { .. } => "cleanup_failed",
            CleanupError::Canceled => "cleanup_canceled",
            CleanupError::Timeout { .. } => "cleanup_timeout",
            CleanupError::Panicked { .. } => "cleanup_panicked",
        }
    }
}

/// A single error collected during shutdown.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShutdownError {
    /// Registry-level failure (e.g. shutdown already called).
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A cleanup callback reported an error.
    #[error("unit '{unit}': {source}")]
    Cleanup {
        /// Name of the failing unit.
        unit: Cow<'static, str>,
        /// The error it reported.
        #[source]
        source: CleanupError,
    },
}

impl ShutdownError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ShutdownError::Registry(e) => e.as_label(),
            ShutdownError::Cleanup { source, .. } => source.as_label(),
        }
    }
}

/// Ordered collection of errors accumulated during shutdown.
///
/// An empty collection means success.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiError {
    errors: Vec<ShutdownError>,
}

impl MultiError {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if no error was collected.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of collected errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Appends an error.
    pub fn push(&mut self, err: impl Into<ShutdownError>) {
        self.errors.push(err.into());
    }

    /// Appends every error of `other`, preserving order.
    pub fn extend(&mut self, other: MultiError) {
        self.errors.extend(other.errors);
    }

    /// Returns the first collected error, if any.
    pub fn first(&self) -> Option<&ShutdownError> {
        self.errors.first()
    }

    /// Iterates the errors in collection order.
    pub fn iter(&self) -> std::slice::Iter<'_, ShutdownError> {
        self.errors.iter()
    }

    /// Returns `true` if any entry is the given registry error.
    pub fn contains(&self, target: RegistryError) -> bool {
        self.errors
            .iter()
            .any(|e| matches!(e, ShutdownError::Registry(r) if *r == target))
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), MultiError> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    /// Collapses the collection into a single error.
    ///
    /// - empty → `None`
    /// - one entry → that entry
    /// - more → the whole collection
    pub fn into_error(mut self) -> Option<Box<dyn std::error::Error + Send + Sync>> {
        match self.errors.len() {
            0 => None,
            1 => self.errors.pop().map(|e| Box::new(e) as _),
            _ => Some(Box::new(self)),
        }
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for MultiError {}

impl From<RegistryError> for MultiError {
    fn from(err: RegistryError) -> Self {
        Self {
            errors: vec![ShutdownError::Registry(err)],
        }
    }
}

impl IntoIterator for MultiError {
    type Item = ShutdownError;
    type IntoIter = std::vec::IntoIter<ShutdownError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a MultiError {
    type Item = &'a ShutdownError;
    type IntoIter = std::slice::Iter<'a, ShutdownError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

/// Renders a caught panic payload as text.
pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cleanup(unit: &'static str, msg: &str) -> ShutdownError {
        ShutdownError::Cleanup {
            unit: unit.into(),
            source: CleanupError::fail(msg),
        }
    }

    #[test]
    fn test_empty_multi_error() {
        let me = MultiError::new();
        assert!(me.is_empty());
        assert_eq!(me.len(), 0);
        assert!(me.first().is_none());
        assert!(me.clone().into_result().is_ok());
        assert!(me.into_error().is_none());
    }

    #[test]
    fn test_single_error_unwraps_to_itself() {
        let mut me = MultiError::new();
        me.push(cleanup("db", "boom"));

        let err = me.into_error().expect("one error");
        assert_eq!(err.to_string(), "unit 'db': cleanup failed: boom");
    }

    #[test]
    fn test_many_errors_join_in_order() {
        let mut me = MultiError::new();
        me.push(cleanup("a", "first"));
        me.push(RegistryError::ShutdownCalled);

        assert_eq!(me.len(), 2);
        assert_eq!(me.first(), Some(&cleanup("a", "first")));
        assert_eq!(
            me.to_string(),
            "unit 'a': cleanup failed: first; shutdown already called; registry no longer accepts registrations"
        );
        let err = me.into_error().expect("combined error");
        assert!(err.to_string().contains("; "));
    }

    #[test]
    fn test_extend_preserves_order() {
        let mut a = MultiError::from(RegistryError::ShutdownCalled);
        let mut b = MultiError::new();
        b.push(cleanup("x", "1"));
        b.push(cleanup("y", "2"));
        a.extend(b);

        let labels: Vec<_> = a.iter().map(|e| e.as_label()).collect();
        assert_eq!(
            labels,
            vec!["registry_shutdown_called", "cleanup_failed", "cleanup_failed"]
        );
        assert!(a.contains(RegistryError::ShutdownCalled));
        assert!(!a.contains(RegistryError::AlreadyRegistered));
    }

    #[test]
    fn test_cleanup_error_source_is_exposed() {
        use std::error::Error as _;

        let err = cleanup("cache", "flush");
        let source = err.source().expect("cleanup source");
        assert_eq!(source.to_string(), "cleanup failed: flush");
    }

    #[test]
    fn test_labels() {
        assert_eq!(
            RegistryError::AlreadyRegistered.as_label(),
            "registry_already_registered"
        );
        assert_eq!(CleanupError::Canceled.as_label(), "cleanup_canceled");
        assert_eq!(
            CleanupError::Timeout {
                timeout: Duration::from_secs(1)
            }
            .as_label(),
            "cleanup_timeout"
        );
        assert_eq!(
            CleanupError::Panicked { info: "x".into() }.as_label(),
            "cleanup_panicked"
        );
    }
}
