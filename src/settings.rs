//! Runtime database settings
//!
//! Holds the process-wide `list_limit` value changed by
//! `alter database set list_limit N`. Readers load the committed value once
//! per query and pass it to the evaluator as a [`LimitConfig`].

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::info;

use crate::error::{EvalError, EvalResult};
use crate::selector::LimitConfig;

/// Atomically updated `list_limit` cell
#[derive(Debug)]
pub struct ListLimitSetting {
    value: AtomicUsize,

    /// Administrative maximum
    max: usize,
}

impl ListLimitSetting {
    /// Create a setting with an initial value and administrative maximum
    ///
    /// The initial value is clamped to `max`.
    pub fn new(initial: usize, max: usize) -> Self {
        Self {
            value: AtomicUsize::new(initial.min(max)),
            max,
        }
    }

    /// Current committed value
    pub fn get(&self) -> usize {
        self.value.load(Ordering::Acquire)
    }

    /// Administrative maximum
    pub fn max(&self) -> usize {
        self.max
    }

    /// Limit configuration for one evaluation
    pub fn limit_config(&self) -> LimitConfig {
        LimitConfig::new(self.get())
    }

    /// Validate and commit a new value
    pub fn set(&self, requested: u64) -> EvalResult<()> {
        let value = match usize::try_from(requested) {
            Ok(v) if v <= self.max => v,
            _ => {
                return Err(EvalError::ListLimitOutOfRange {
                    requested,
                    max: self.max,
                })
            },
        };

        let previous = self.value.swap(value, Ordering::AcqRel);
        info!(previous, list_limit = value, "list_limit updated");
        Ok(())
    }
}
