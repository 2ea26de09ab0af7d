//! Statement layer
//!
//! Parses and executes the statements built on top of the selector
//! evaluator:
//!
//! ```text
//! list series [name, type, length] [<selector>] [where <filter>] [limit <N>]
//! count series [<selector>] [where <filter>]
//! alter database set list_limit <N>
//! show list_limit
//! create group `<name>` for /<regex>/
//! drop group `<name>`
//! list groups
//! ```
//!
//! Keywords are case-sensitive. The `where` filter is described in
//! [`crate::selector::filter`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use series_select::config::ApplicationConfig;
//! use series_select::namespace::SeriesRegistry;
//! use series_select::query::{QueryEngine, QueryOutput};
//! use series_select::types::SeriesType;
//!
//! let registry = Arc::new(SeriesRegistry::new());
//! registry.get_or_register("a1", SeriesType::Float).unwrap();
//!
//! let engine = QueryEngine::new(registry, &ApplicationConfig::default()).unwrap();
//! engine.execute("alter database set list_limit 5000").unwrap();
//!
//! let err = engine.execute("list series limit 6000").unwrap_err();
//! assert_eq!(
//!     err.to_string(),
//!     "Limit must be a value between 0 and 5000 but received: 6000"
//! );
//!
//! let output = engine.execute("count series /a.*/").unwrap();
//! assert_eq!(output, QueryOutput::Count { series: 1 });
//! ```

pub mod engine;
pub mod parser;

pub use engine::QueryEngine;
pub use parser::parse_statement;

use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::selector::{PropertyFilter, RegexLiteral, Selector};

/// Column of a `list series` result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    /// Series name
    Name,
    /// Value type
    Type,
    /// Number of points
    Length,
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Column::Name => write!(f, "name"),
            Column::Type => write!(f, "type"),
            Column::Length => write!(f, "length"),
        }
    }
}

/// A parsed statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// `list series`
    ListSeries {
        /// Output columns (`name` when empty)
        columns: Vec<Column>,
        /// Selector, `None` lists every series
        selector: Option<Selector>,
        /// `where` filter
        filter: Option<PropertyFilter>,
        /// Explicit `limit N`
        limit: Option<u64>,
    },

    /// `count series`
    CountSeries {
        /// Selector, `None` counts every series
        selector: Option<Selector>,
        /// `where` filter
        filter: Option<PropertyFilter>,
    },

    /// `alter database set list_limit N`
    AlterListLimit(u64),

    /// `show list_limit`
    ShowListLimit,

    /// `create group `name` for /regex/`
    CreateGroup {
        /// Group name
        name: String,
        /// Saved regex
        expression: RegexLiteral,
    },

    /// `drop group `name``
    DropGroup(String),

    /// `list groups`
    ListGroups,
}

/// Result of executing a statement
///
/// Serializes to the shape clients expect, e.g. `{"series": [["a1"]], ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryOutput {
    /// Rows of a `list series`
    Series {
        /// Column names
        columns: Vec<String>,
        /// One row per series
        series: Vec<Vec<Value>>,
    },

    /// Result of `count series`
    Count {
        /// Number of matching series
        series: usize,
    },

    /// Result of `show list_limit`
    ListLimit {
        /// Current list limit
        list_limit: usize,
    },

    /// Rows of `list groups`
    Groups {
        /// Column names
        columns: Vec<String>,
        /// One row per group
        groups: Vec<Vec<Value>>,
    },

    /// Administrative statement succeeded
    Success {
        /// Confirmation message
        success_msg: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_output_serialization() {
        let output = QueryOutput::Series {
            columns: vec!["name".into()],
            series: vec![vec![json!("a1")]],
        };
        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({"columns": ["name"], "series": [["a1"]]})
        );

        let output = QueryOutput::Success {
            success_msg: "ok".into(),
        };
        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            json!({"success_msg": "ok"})
        );

        let output = QueryOutput::Count { series: 3 };
        assert_eq!(serde_json::to_value(&output).unwrap(), json!({"series": 3}));
    }

    #[test]
    fn test_column_display() {
        assert_eq!(Column::Name.to_string(), "name");
        assert_eq!(Column::Type.to_string(), "type");
        assert_eq!(Column::Length.to_string(), "length");
    }
}
