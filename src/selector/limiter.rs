//! Result Limiter
//!
//! Bounds the size of listing results by `list_limit`.
//!
//! # Behavior
//!
//! - An explicit `limit N` must satisfy `0 <= N <= list_limit`. Valid
//!   requests return the first `N` names in lexicographic order.
//! - Without an explicit limit, `list_limit` caps the result: the first
//!   `list_limit` names in lexicographic order are returned.

use tracing::warn;

use crate::error::{EvalError, EvalResult};

/// Limit configuration injected into each evaluation
///
/// A plain value read once from the settings cell when a query starts, so
/// one evaluation always sees one consistent bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitConfig {
    /// Maximum number of series a listing may return
    pub list_limit: usize,
}

impl LimitConfig {
    /// Create a limit configuration
    pub fn new(list_limit: usize) -> Self {
        Self { list_limit }
    }

    /// Validate an explicit `limit N` clause
    ///
    /// Returns the limit as a `usize` when it is within `0..=list_limit`.
    pub fn check_explicit(&self, requested: u64) -> EvalResult<usize> {
        match usize::try_from(requested) {
            Ok(n) if n <= self.list_limit => Ok(n),
            _ => {
                warn!(
                    requested,
                    list_limit = self.list_limit,
                    "rejected explicit limit"
                );
                Err(EvalError::LimitOutOfRange {
                    requested,
                    list_limit: self.list_limit,
                })
            },
        }
    }

    /// Bound a result of `size` elements
    ///
    /// Returns how many elements (taken from the front of the sorted
    /// result) the caller may return.
    pub fn enforce(&self, size: usize, explicit: Option<u64>) -> EvalResult<usize> {
        match explicit {
            Some(requested) => Ok(self.check_explicit(requested)?.min(size)),
            None => Ok(size.min(self.list_limit)),
        }
    }
}
