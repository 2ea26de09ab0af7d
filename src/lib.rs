//! Series Select - set-algebra selectors over a series namespace
//!
//! This library lists the series of a namespace that match a selector:
//! - Regex, exact-name and group terms combined with `|`, `&`, `-` and `^`
//! - Strict left-to-right evaluation over a consistent namespace snapshot
//! - Runtime `list_limit` guarding the size of listings
//! - Named groups persisted to a JSON file
//!
//! ```text
//! list series /.*/ - /a.*/ | /b.*/ limit 100
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;

/// Configuration management with TOML support
pub mod config;

/// Named, saved regular expressions usable as selector terms
pub mod groups;

/// Series registry and consistent snapshots
pub mod namespace;

/// Statement parsing and execution
pub mod query;

/// Selector parsing, matching, folding and limiting
pub mod selector;

/// Runtime database settings
pub mod settings;

// Re-export main types
pub use error::{Error, EvalError, Result};
pub use namespace::{NamespaceSnapshot, NamespaceSource, SeriesRegistry};
pub use query::{QueryEngine, QueryOutput};
pub use selector::{parse_selector, Evaluator, LimitConfig, Selector, SeriesList};
pub use types::{SeriesId, SeriesType};
