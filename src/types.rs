//! Core data types shared by the namespace and the evaluator
//!
//! # Key Types
//!
//! - **`SeriesId`**: Dense registration-order identifier, used as a bit position
//! - **`SeriesName`**: Immutable, cheaply clonable series name
//! - **`SeriesType`**: Value type a series was created with
//! - **`SeriesEntry`**: A registered series as seen through a snapshot
//!
//! # Example
//!
//! ```rust
//! use series_select::types::{validate_series_name, SeriesEntry, SeriesType};
//!
//! assert!(validate_series_name("cpu.usage").is_ok());
//! assert!(validate_series_name("").is_err());
//!
//! let entry = SeriesEntry::new(0, "cpu.usage".into(), SeriesType::Float);
//! assert_eq!(entry.name(), "cpu.usage");
//! assert_eq!(entry.length(), 0);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{EvalError, EvalResult};

/// Identifier of a series within one namespace
///
/// Assigned densely in registration order starting at 0, so a snapshot
/// holding `n` series covers exactly the ids `0..n`.
pub type SeriesId = u32;

/// Immutable series name
pub type SeriesName = Arc<str>;

/// Maximum length of a series name in bytes
pub const MAX_SERIES_NAME_LEN: usize = 65_535;

/// Value type of a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesType {
    /// 64-bit signed integers
    Integer,
    /// 64-bit floats
    Float,
    /// UTF-8 strings
    String,
}

impl fmt::Display for SeriesType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesType::Integer => write!(f, "integer"),
            SeriesType::Float => write!(f, "float"),
            SeriesType::String => write!(f, "string"),
        }
    }
}

/// A registered series
///
/// Name, id and type never change after registration. The point counter is
/// maintained by writers and read live.
#[derive(Debug)]
pub struct SeriesEntry {
    id: SeriesId,
    name: SeriesName,
    series_type: SeriesType,
    length: AtomicU64,
    created_at: i64,
}

impl SeriesEntry {
    /// Create a new entry with zero points
    pub fn new(id: SeriesId, name: SeriesName, series_type: SeriesType) -> Self {
        Self {
            id,
            name,
            series_type,
            length: AtomicU64::new(0),
            created_at: current_time_ms(),
        }
    }

    /// Series id
    pub fn id(&self) -> SeriesId {
        self.id
    }

    /// Series name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value type
    pub fn series_type(&self) -> SeriesType {
        self.series_type
    }

    /// Number of points recorded for this series
    pub fn length(&self) -> u64 {
        self.length.load(Ordering::Relaxed)
    }

    /// Record `count` additional points
    pub fn add_points(&self, count: u64) {
        self.length.fetch_add(count, Ordering::Relaxed);
    }

    /// Registration timestamp in milliseconds since the Unix epoch
    pub fn created_at(&self) -> i64 {
        self.created_at
    }
}

/// Validate a series name before registration
pub fn validate_series_name(name: &str) -> EvalResult<()> {
    if name.is_empty() {
        return Err(EvalError::InvalidSeriesName(
            "series name cannot be empty".to_string(),
        ));
    }
    if name.len() > MAX_SERIES_NAME_LEN {
        return Err(EvalError::InvalidSeriesName(format!(
            "series name is {} bytes (max: {})",
            name.len(),
            MAX_SERIES_NAME_LEN
        )));
    }
    if name.contains('\0') {
        return Err(EvalError::InvalidSeriesName(
            "series name cannot contain NUL bytes".to_string(),
        ));
    }
    Ok(())
}

/// Current wall clock time in milliseconds
pub fn current_time_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
