//! Series namespace: registry and snapshots
//!
//! The evaluator never reads the registry directly. It asks a
//! [`NamespaceSource`] for one [`NamespaceSnapshot`] per query and runs all
//! matching against that snapshot without further synchronization.

pub mod registry;
pub mod snapshot;

pub use registry::{RegistryStatsSnapshot, SeriesRegistry, MAX_SERIES};
pub use snapshot::NamespaceSnapshot;

use std::sync::Arc;

use crate::error::EvalResult;

/// Source of point-in-time namespace views
pub trait NamespaceSource: Send + Sync {
    /// Take a snapshot of every series currently registered
    fn snapshot(&self) -> EvalResult<NamespaceSnapshot>;
}

impl NamespaceSource for NamespaceSnapshot {
    fn snapshot(&self) -> EvalResult<NamespaceSnapshot> {
        Ok(self.clone())
    }
}

impl<T: NamespaceSource + ?Sized> NamespaceSource for Arc<T> {
    fn snapshot(&self) -> EvalResult<NamespaceSnapshot> {
        (**self).snapshot()
    }
}
