//! In-memory series registry
//!
//! Append-only registry of series names. Writers register series
//! concurrently; readers take cheap snapshots that are unaffected by later
//! registrations.
//!
//! # Example
//!
//! ```rust
//! use series_select::namespace::{NamespaceSource, SeriesRegistry};
//! use series_select::types::SeriesType;
//!
//! let registry = SeriesRegistry::new();
//! registry.get_or_register("cpu", SeriesType::Float).unwrap();
//! registry.get_or_register("mem", SeriesType::Integer).unwrap();
//!
//! let snapshot = registry.snapshot().unwrap();
//! assert_eq!(snapshot.len(), 2);
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use super::{NamespaceSnapshot, NamespaceSource};
use crate::error::{EvalError, EvalResult};
use crate::selector::SeriesBitmap;
use crate::types::{validate_series_name, SeriesEntry, SeriesId, SeriesName, SeriesType};

#[derive(Debug, Default)]
struct RegistryState {
    /// Entries in id order
    entries: Vec<Arc<SeriesEntry>>,

    /// Name to id lookup
    by_name: HashMap<SeriesName, SeriesId>,
}

/// Statistics for the registry
#[derive(Debug, Default)]
pub struct RegistryStats {
    /// Series created
    pub registrations: AtomicU64,

    /// Registrations that found an existing series
    pub existing_hits: AtomicU64,

    /// Snapshots taken
    pub snapshots: AtomicU64,
}

/// Snapshot of registry statistics (non-atomic copy)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryStatsSnapshot {
    /// Series created
    pub registrations: u64,
    /// Registrations that found an existing series
    pub existing_hits: u64,
    /// Snapshots taken
    pub snapshots: u64,
}

impl RegistryStats {
    /// Get a snapshot of statistics
    pub fn snapshot(&self) -> RegistryStatsSnapshot {
        RegistryStatsSnapshot {
            registrations: self.registrations.load(Ordering::Relaxed),
            existing_hits: self.existing_hits.load(Ordering::Relaxed),
            snapshots: self.snapshots.load(Ordering::Relaxed),
        }
    }
}

/// Largest number of series a registry can hold: every id must fit in a
/// [`SeriesBitmap`]
pub const MAX_SERIES: usize = SeriesBitmap::MAX_SERIES_ID as usize + 1;

/// Append-only registry of series
#[derive(Debug)]
pub struct SeriesRegistry {
    state: RwLock<RegistryState>,
    stats: RegistryStats,

    /// Registrations beyond this count are rejected
    max_series: usize,
}

impl Default for SeriesRegistry {
    fn default() -> Self {
        Self::with_max_series(MAX_SERIES)
    }
}

impl SeriesRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry holding at most `max_series` series
    ///
    /// The bound is clamped to [`MAX_SERIES`].
    pub fn with_max_series(max_series: usize) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            stats: RegistryStats::default(),
            max_series: max_series.min(MAX_SERIES),
        }
    }

    /// Return the series named `name`, registering it first if needed
    ///
    /// Concurrent calls with the same name resolve to a single entry. The
    /// type of an existing series is kept; `series_type` only applies to
    /// new registrations.
    pub fn get_or_register(&self, name: &str, series_type: SeriesType) -> EvalResult<Arc<SeriesEntry>> {
        if let Some(entry) = self.get(name) {
            self.stats.existing_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(entry);
        }

        validate_series_name(name)?;

        let mut state = self.state.write();

        // Another writer may have won the race between the two locks
        if let Some(&id) = state.by_name.get(name) {
            self.stats.existing_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(&state.entries[id as usize]));
        }

        if state.entries.len() >= self.max_series {
            return Err(EvalError::Namespace(format!(
                "series limit of {} reached",
                self.max_series
            )));
        }
        let id = SeriesId::try_from(state.entries.len())
            .map_err(|_| EvalError::Namespace("series id space exhausted".to_string()))?;
        let name: SeriesName = name.into();
        let entry = Arc::new(SeriesEntry::new(id, Arc::clone(&name), series_type));

        state.entries.push(Arc::clone(&entry));
        state.by_name.insert(name, id);
        drop(state);

        self.stats.registrations.fetch_add(1, Ordering::Relaxed);
        trace!(series_id = id, name = entry.name(), "registered series");

        Ok(entry)
    }

    /// Record points for a series, registering it if it does not exist yet
    pub fn insert_points(&self, name: &str, series_type: SeriesType, count: u64) -> EvalResult<()> {
        let entry = self.get_or_register(name, series_type)?;
        entry.add_points(count);
        Ok(())
    }

    /// Look up a series by name
    pub fn get(&self, name: &str) -> Option<Arc<SeriesEntry>> {
        let state = self.state.read();
        state
            .by_name
            .get(name)
            .map(|&id| Arc::clone(&state.entries[id as usize]))
    }

    /// Number of registered series
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    /// Check if no series are registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get statistics
    pub fn stats(&self) -> RegistryStatsSnapshot {
        self.stats.snapshot()
    }
}

impl NamespaceSource for SeriesRegistry {
    fn snapshot(&self) -> EvalResult<NamespaceSnapshot> {
        // Only the Arc pointers are copied while the read lock is held
        let entries = self.state.read().entries.clone();
        self.stats.snapshots.fetch_add(1, Ordering::Relaxed);
        Ok(NamespaceSnapshot::new(entries))
    }
}
