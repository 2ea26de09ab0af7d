//! Chained series selectors
//!
//! A selector is a flat, left-to-right pipeline of terms joined by set
//! operators:
//!
//! ```text
//! /.*/ - /a.*/ | "exact name" ^ `group`
//! ```
//!
//! Terms are matched independently against one namespace snapshot and the
//! results are folded strictly in the order written. There is no operator
//! precedence: `A - B | C` means `(A - B) | C`.
//!
//! # Pipeline
//!
//! ```text
//! text ─▶ parser ─▶ Selector ─▶ matcher (per term) ─▶ combinator ─▶ filter ─▶ limiter
//! ```
//!
//! # Example
//!
//! ```rust
//! use series_select::namespace::SeriesRegistry;
//! use series_select::selector::{Evaluator, LimitConfig};
//! use series_select::types::SeriesType;
//!
//! let registry = SeriesRegistry::new();
//! for name in ["a1", "a2", "b1"] {
//!     registry.get_or_register(name, SeriesType::Float).unwrap();
//! }
//!
//! let evaluator = Evaluator::default();
//! let limits = LimitConfig::new(1000);
//!
//! let result = evaluator.evaluate(&registry, "/a.*/ - /a1/", None, limits).unwrap();
//! assert_eq!(result.names(), vec!["a2"]);
//!
//! let result = evaluator.evaluate(&registry, "/a.*/ ^ /.*1/", None, limits).unwrap();
//! assert_eq!(result.names(), vec!["a2", "b1"]);
//! ```

pub mod bitmap;
pub mod combinator;
pub mod evaluator;
pub mod filter;
pub mod limiter;
pub mod matcher;
pub mod parser;

pub use bitmap::SeriesBitmap;
pub use evaluator::{Evaluator, EvaluatorStatsSnapshot, SeriesList};
pub use filter::{CompareOp, Condition, PropertyFilter};
pub use limiter::LimitConfig;
pub use matcher::{MatcherConfig, PatternMatcher};
pub use parser::parse_selector;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Set operator joining a term to the running result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetOp {
    /// Implicit operator of the first term
    Seed,
    /// `|`
    Union,
    /// `&`
    Intersect,
    /// `-` (running result minus the term)
    Difference,
    /// `^`
    SymmetricDifference,
}

impl SetOp {
    /// Operator symbol, `None` for `Seed`
    pub fn symbol(&self) -> Option<char> {
        match self {
            SetOp::Seed => None,
            SetOp::Union => Some('|'),
            SetOp::Intersect => Some('&'),
            SetOp::Difference => Some('-'),
            SetOp::SymmetricDifference => Some('^'),
        }
    }
}

/// Regular expression literal as written between slashes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegexLiteral {
    /// Pattern body with `\/` unescaped
    pub body: String,

    /// `i` flag
    #[serde(default)]
    pub case_insensitive: bool,
}

impl RegexLiteral {
    /// Create a case-sensitive literal
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            case_insensitive: false,
        }
    }
}

impl fmt::Display for RegexLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.body.replace('/', "\\/"))?;
        if self.case_insensitive {
            write!(f, "i")?;
        }
        Ok(())
    }
}

/// What a term matches
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermSource {
    /// `/regex/`: every name the regex matches in full
    Regex(RegexLiteral),
    /// `"name"`: that exact series, if it exists
    Name(String),
    /// `` `group` ``: the saved regex of a group
    Group(String),
}

impl fmt::Display for TermSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermSource::Regex(literal) => write!(f, "{}", literal),
            TermSource::Name(name) => write!(f, "\"{}\"", name.replace('"', "\"\"")),
            TermSource::Group(name) => write!(f, "`{}`", name),
        }
    }
}

/// One `(operator, source)` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    /// Operator applied when folding this term
    pub op: SetOp,
    /// Term source
    pub source: TermSource,
}

/// Ordered, non-empty sequence of terms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    terms: Vec<Term>,
}

impl Selector {
    /// Build a selector from its first source and the remaining terms
    pub fn new(first: TermSource, rest: impl IntoIterator<Item = (SetOp, TermSource)>) -> Self {
        let mut terms = vec![Term {
            op: SetOp::Seed,
            source: first,
        }];
        terms.extend(rest.into_iter().map(|(op, source)| {
            debug_assert!(op != SetOp::Seed, "only the first term is a seed");
            Term { op, source }
        }));
        Self { terms }
    }

    /// Selector with a single regex term
    pub fn regex(body: impl Into<String>) -> Self {
        Self::new(TermSource::Regex(RegexLiteral::new(body)), [])
    }

    /// Terms in written order; the first one is always `Seed`
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for term in &self.terms {
            match term.op.symbol() {
                Some(symbol) => write!(f, " {} {}", symbol, term.source)?,
                None => write!(f, "{}", term.source)?,
            }
        }
        Ok(())
    }
}
