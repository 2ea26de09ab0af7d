//! Property Filter
//!
//! `where` expressions over series properties, applied to the folded
//! selector result before the limiter:
//!
//! ```text
//! list series /cpu.*/ where length > 100 and (type == float or name ~ /.*idle/)
//! ```
//!
//! | property | operators                         | value              |
//! |----------|-----------------------------------|--------------------|
//! | `name`   | `==` `!=` `<` `<=` `>` `>=`       | `"string"`         |
//! | `name`   | `~` `!~`                          | `/regex/flags`     |
//! | `length` | `==` `!=` `<` `<=` `>` `>=`       | integer            |
//! | `type`   | `==` `!=`                         | `integer` `float` `string` |
//!
//! `and` binds tighter than `or`; parentheses group.

use std::cmp::Ordering;

use regex::Regex;

use super::matcher::PatternMatcher;
use super::{RegexLiteral, SeriesBitmap};
use crate::error::EvalResult;
use crate::namespace::NamespaceSnapshot;
use crate::types::{SeriesEntry, SeriesType};

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl CompareOp {
    fn holds(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
        }
    }
}

/// A single property condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// `name <op> "value"` (byte-wise comparison)
    Name {
        /// Operator
        op: CompareOp,
        /// Right-hand side
        value: String,
    },

    /// `name ~ /regex/` or `name !~ /regex/` (whole-name match)
    NameMatches {
        /// Regex
        literal: RegexLiteral,
        /// `!~`
        negate: bool,
    },

    /// `length <op> N`
    Length {
        /// Operator
        op: CompareOp,
        /// Right-hand side
        value: u64,
    },

    /// `type == t` or `type != t`
    Type {
        /// Series type
        series_type: SeriesType,
        /// `!=`
        negate: bool,
    },
}

/// Boolean expression of conditions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyFilter {
    /// Leaf condition
    Condition(Condition),
    /// Both sides hold
    And(Box<PropertyFilter>, Box<PropertyFilter>),
    /// Either side holds
    Or(Box<PropertyFilter>, Box<PropertyFilter>),
}

impl PropertyFilter {
    /// Compile regexes through the matcher (cached and size-guarded)
    pub fn compile(&self, matcher: &PatternMatcher) -> EvalResult<CompiledFilter> {
        Ok(match self {
            PropertyFilter::Condition(Condition::Name { op, value }) => CompiledFilter::Name {
                op: *op,
                value: value.clone(),
            },
            PropertyFilter::Condition(Condition::NameMatches { literal, negate }) => {
                CompiledFilter::NameMatches {
                    regex: matcher.compile_regex(literal)?,
                    negate: *negate,
                }
            },
            PropertyFilter::Condition(Condition::Length { op, value }) => CompiledFilter::Length {
                op: *op,
                value: *value,
            },
            PropertyFilter::Condition(Condition::Type {
                series_type,
                negate,
            }) => CompiledFilter::Type {
                series_type: *series_type,
                negate: *negate,
            },
            PropertyFilter::And(lhs, rhs) => CompiledFilter::And(
                Box::new(lhs.compile(matcher)?),
                Box::new(rhs.compile(matcher)?),
            ),
            PropertyFilter::Or(lhs, rhs) => CompiledFilter::Or(
                Box::new(lhs.compile(matcher)?),
                Box::new(rhs.compile(matcher)?),
            ),
        })
    }
}

/// Filter ready to run against series entries
#[derive(Debug, Clone)]
pub enum CompiledFilter {
    /// Name comparison
    Name {
        /// Operator
        op: CompareOp,
        /// Right-hand side
        value: String,
    },
    /// Anchored name regex
    NameMatches {
        /// Compiled regex
        regex: Regex,
        /// `!~`
        negate: bool,
    },
    /// Length comparison
    Length {
        /// Operator
        op: CompareOp,
        /// Right-hand side
        value: u64,
    },
    /// Type equality
    Type {
        /// Series type
        series_type: SeriesType,
        /// `!=`
        negate: bool,
    },
    /// Conjunction
    And(Box<CompiledFilter>, Box<CompiledFilter>),
    /// Disjunction
    Or(Box<CompiledFilter>, Box<CompiledFilter>),
}

impl CompiledFilter {
    /// Check one series
    pub fn matches(&self, entry: &SeriesEntry) -> bool {
        match self {
            CompiledFilter::Name { op, value } => op.holds(entry.name().cmp(value.as_str())),
            CompiledFilter::NameMatches { regex, negate } => regex.is_match(entry.name()) != *negate,
            CompiledFilter::Length { op, value } => op.holds(entry.length().cmp(value)),
            CompiledFilter::Type {
                series_type,
                negate,
            } => (entry.series_type() == *series_type) != *negate,
            CompiledFilter::And(lhs, rhs) => lhs.matches(entry) && rhs.matches(entry),
            CompiledFilter::Or(lhs, rhs) => lhs.matches(entry) || rhs.matches(entry),
        }
    }

    /// Keep the series of `bitmap` that pass the filter
    pub fn apply(&self, snapshot: &NamespaceSnapshot, bitmap: &SeriesBitmap) -> SeriesBitmap {
        SeriesBitmap::from_ids(
            bitmap
                .iter()
                .filter(|&id| snapshot.get(id).is_some_and(|entry| self.matches(entry))),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::{NamespaceSource, SeriesRegistry};

    fn cond(condition: Condition) -> PropertyFilter {
        PropertyFilter::Condition(condition)
    }

    fn registry() -> SeriesRegistry {
        let registry = SeriesRegistry::new();
        registry.insert_points("cpu.idle", SeriesType::Float, 10).unwrap();
        registry.insert_points("cpu.user", SeriesType::Float, 200).unwrap();
        registry.insert_points("log", SeriesType::String, 5).unwrap();
        registry.insert_points("count", SeriesType::Integer, 0).unwrap();
        registry
    }

    fn passing(filter: &PropertyFilter) -> Vec<String> {
        let snapshot = registry().snapshot().unwrap();
        let compiled = filter.compile(&PatternMatcher::default()).unwrap();
        let kept = compiled.apply(&snapshot, &SeriesBitmap::full(snapshot.len()));
        let mut names: Vec<String> = kept
            .iter()
            .filter_map(|id| snapshot.get(id).map(|e| e.name().to_string()))
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_compare_ops() {
        let ordering = Ordering::Less;
        assert!(CompareOp::Lt.holds(ordering));
        assert!(CompareOp::Le.holds(ordering));
        assert!(CompareOp::Ne.holds(ordering));
        assert!(!CompareOp::Eq.holds(ordering));
        assert!(!CompareOp::Ge.holds(ordering));
        assert!(CompareOp::Ge.holds(Ordering::Equal));
    }

    #[test]
    fn test_length_and_type() {
        let filter = cond(Condition::Length {
            op: CompareOp::Gt,
            value: 5,
        });
        assert_eq!(passing(&filter), vec!["cpu.idle", "cpu.user"]);

        let filter = cond(Condition::Type {
            series_type: SeriesType::Float,
            negate: true,
        });
        assert_eq!(passing(&filter), vec!["count", "log"]);
    }

    #[test]
    fn test_name_conditions() {
        let filter = cond(Condition::Name {
            op: CompareOp::Ge,
            value: "cpu.user".into(),
        });
        assert_eq!(passing(&filter), vec!["cpu.user", "log"]);

        let filter = cond(Condition::NameMatches {
            literal: RegexLiteral::new("cpu"),
            negate: false,
        });
        // Whole-name match
        assert!(passing(&filter).is_empty());

        let filter = cond(Condition::NameMatches {
            literal: RegexLiteral::new("cpu.*"),
            negate: true,
        });
        assert_eq!(passing(&filter), vec!["count", "log"]);
    }

    #[test]
    fn test_and_or() {
        let float = cond(Condition::Type {
            series_type: SeriesType::Float,
            negate: false,
        });
        let long = cond(Condition::Length {
            op: CompareOp::Ge,
            value: 100,
        });
        let short = cond(Condition::Length {
            op: CompareOp::Lt,
            value: 1,
        });

        let filter = PropertyFilter::And(Box::new(float.clone()), Box::new(long));
        assert_eq!(passing(&filter), vec!["cpu.user"]);

        let filter = PropertyFilter::Or(Box::new(float), Box::new(short));
        assert_eq!(passing(&filter), vec!["count", "cpu.idle", "cpu.user"]);
    }

    #[test]
    fn test_invalid_regex_fails_compile() {
        let filter = cond(Condition::NameMatches {
            literal: RegexLiteral::new("a)|(b"),
            negate: false,
        });
        assert!(filter.compile(&PatternMatcher::default()).is_err());
    }
}
