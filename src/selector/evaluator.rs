//! Selector evaluation: compile, snapshot, match, fold, filter, limit
//!
//! The evaluator owns no namespace state. Each call takes exactly one
//! snapshot from the supplied [`NamespaceSource`] after every term has
//! compiled, so a bad regex never costs a snapshot, and every result is a
//! subset of that one snapshot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

use super::combinator;
use super::filter::PropertyFilter;
use super::limiter::LimitConfig;
use super::matcher::PatternMatcher;
use super::parser::parse_selector;
use super::{Selector, SeriesBitmap};
use crate::error::{EvalError, EvalResult};
use crate::groups::GroupStore;
use crate::namespace::{NamespaceSnapshot, NamespaceSource};
use crate::types::SeriesEntry;

// ============================================================================
// Series List
// ============================================================================

/// Result of a listing, sorted by series name
#[derive(Debug, Clone, Default)]
pub struct SeriesList {
    entries: Vec<Arc<SeriesEntry>>,

    /// More series matched than were returned
    truncated: bool,
}

impl SeriesList {
    /// Number of series
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the list is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Series names in order
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name()).collect()
    }

    /// Check if a series is part of the result
    pub fn contains(&self, name: &str) -> bool {
        self.entries
            .binary_search_by(|e| e.name().cmp(name))
            .is_ok()
    }

    /// Iterate over entries in order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<SeriesEntry>> {
        self.entries.iter()
    }

    /// Check if the limit cut the result short
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

// ============================================================================
// Statistics
// ============================================================================

#[derive(Debug, Default)]
struct EvaluatorStats {
    queries: AtomicU64,
    terms_matched: AtomicU64,
    limit_rejections: AtomicU64,
    truncated_listings: AtomicU64,
}

/// Snapshot of evaluator statistics (non-atomic copy)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluatorStatsSnapshot {
    /// Evaluations started
    pub queries: u64,
    /// Terms matched against snapshots
    pub terms_matched: u64,
    /// Evaluations rejected by the limiter
    pub limit_rejections: u64,
    /// Listings capped at the limit
    pub truncated_listings: u64,
    /// Regexes served from the cache
    pub regex_cache_hits: u64,
    /// Regexes compiled
    pub regex_compilations: u64,
    /// Rejected or failed regexes
    pub regex_errors: u64,
}

// ============================================================================
// Evaluator
// ============================================================================

/// Evaluates selectors against a namespace
#[derive(Debug)]
pub struct Evaluator {
    matcher: PatternMatcher,
    groups: Arc<GroupStore>,
    stats: EvaluatorStats,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(PatternMatcher::default(), Arc::new(GroupStore::new()))
    }
}

impl Evaluator {
    /// Create an evaluator
    pub fn new(matcher: PatternMatcher, groups: Arc<GroupStore>) -> Self {
        Self {
            matcher,
            groups,
            stats: EvaluatorStats::default(),
        }
    }

    /// Pattern matcher
    pub fn matcher(&self) -> &PatternMatcher {
        &self.matcher
    }

    /// Group store used to resolve `` `group` `` terms
    pub fn groups(&self) -> &Arc<GroupStore> {
        &self.groups
    }

    /// Parse `selector_text` and list the matching series
    pub fn evaluate(
        &self,
        source: &dyn NamespaceSource,
        selector_text: &str,
        explicit_limit: Option<u64>,
        limits: LimitConfig,
    ) -> EvalResult<SeriesList> {
        let selector = parse_selector(selector_text)?;
        self.list(source, Some(&selector), explicit_limit, limits)
    }

    /// List the series matching `selector` (all series when `None`)
    pub fn list(
        &self,
        source: &dyn NamespaceSource,
        selector: Option<&Selector>,
        explicit_limit: Option<u64>,
        limits: LimitConfig,
    ) -> EvalResult<SeriesList> {
        self.list_where(source, selector, None, explicit_limit, limits)
    }

    /// List the series matching `selector` that pass `filter`
    ///
    /// Without an explicit limit the result is capped at `list_limit`; in
    /// both cases the returned series are the first ones by name.
    pub fn list_where(
        &self,
        source: &dyn NamespaceSource,
        selector: Option<&Selector>,
        filter: Option<&PropertyFilter>,
        explicit_limit: Option<u64>,
        limits: LimitConfig,
    ) -> EvalResult<SeriesList> {
        self.stats.queries.fetch_add(1, Ordering::Relaxed);

        // An out-of-range explicit limit fails before any matching
        if let Some(requested) = explicit_limit {
            limits
                .check_explicit(requested)
                .map_err(|e| self.reject(e))?;
        }

        let (snapshot, bitmap) = self.resolve(source, selector, filter)?;
        let matched = bitmap.cardinality();
        let keep = limits
            .enforce(matched, explicit_limit)
            .map_err(|e| self.reject(e))?;

        let mut entries: Vec<Arc<SeriesEntry>> = bitmap
            .iter()
            .filter_map(|id| snapshot.get(id).cloned())
            .collect();
        entries.sort_unstable_by(|a, b| a.name().cmp(b.name()));
        entries.truncate(keep);

        let truncated = keep < matched;
        if truncated {
            self.stats.truncated_listings.fetch_add(1, Ordering::Relaxed);
        }

        debug!(
            selector = %selector.map(ToString::to_string).unwrap_or_default(),
            snapshot = snapshot.len(),
            matched,
            returned = entries.len(),
            truncated,
            "listed series"
        );

        Ok(SeriesList { entries, truncated })
    }

    /// Count the series matching `selector` (all series when `None`)
    ///
    /// Counting is not bounded by `list_limit`.
    pub fn count(&self, source: &dyn NamespaceSource, selector: Option<&Selector>) -> EvalResult<usize> {
        self.count_where(source, selector, None)
    }

    /// Count the series matching `selector` that pass `filter`
    pub fn count_where(
        &self,
        source: &dyn NamespaceSource,
        selector: Option<&Selector>,
        filter: Option<&PropertyFilter>,
    ) -> EvalResult<usize> {
        self.stats.queries.fetch_add(1, Ordering::Relaxed);
        let (_, bitmap) = self.resolve(source, selector, filter)?;
        Ok(bitmap.cardinality())
    }

    /// Compile, snapshot, match, fold and filter
    pub fn resolve(
        &self,
        source: &dyn NamespaceSource,
        selector: Option<&Selector>,
        filter: Option<&PropertyFilter>,
    ) -> EvalResult<(NamespaceSnapshot, SeriesBitmap)> {
        let terms = selector
            .map(|s| self.matcher.compile(s, &self.groups))
            .transpose()?;
        let filter = filter.map(|f| f.compile(&self.matcher)).transpose()?;

        let snapshot = source.snapshot()?;

        let bitmap = match terms {
            None => SeriesBitmap::full(snapshot.len()),
            Some(terms) => {
                let matches = self.matcher.match_all(&terms, &snapshot);
                self.stats
                    .terms_matched
                    .fetch_add(terms.len() as u64, Ordering::Relaxed);
                combinator::fold(terms.iter().map(|t| t.op).zip(matches))
            },
        };

        let bitmap = match filter {
            Some(filter) => filter.apply(&snapshot, &bitmap),
            None => bitmap,
        };

        Ok((snapshot, bitmap))
    }

    /// Get statistics
    pub fn stats(&self) -> EvaluatorStatsSnapshot {
        let (regex_cache_hits, regex_compilations, regex_errors) = self.matcher.stats();
        EvaluatorStatsSnapshot {
            queries: self.stats.queries.load(Ordering::Relaxed),
            terms_matched: self.stats.terms_matched.load(Ordering::Relaxed),
            limit_rejections: self.stats.limit_rejections.load(Ordering::Relaxed),
            truncated_listings: self.stats.truncated_listings.load(Ordering::Relaxed),
            regex_cache_hits,
            regex_compilations,
            regex_errors,
        }
    }

    fn reject(&self, err: EvalError) -> EvalError {
        self.stats.limit_rejections.fetch_add(1, Ordering::Relaxed);
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::SeriesRegistry;
    use crate::types::SeriesType;

    fn registry(names: &[&str]) -> SeriesRegistry {
        let registry = SeriesRegistry::new();
        for name in names {
            registry.get_or_register(name, SeriesType::Float).unwrap();
        }
        registry
    }

    fn names(result: &SeriesList) -> Vec<String> {
        result.names().into_iter().map(String::from).collect()
    }

    #[test]
    fn test_scenario() {
        let registry = registry(&["a1", "a2", "b1"]);
        let evaluator = Evaluator::default();
        let limits = LimitConfig::new(1000);

        let result = evaluator.evaluate(&registry, "/a.*/ - /a1/", None, limits).unwrap();
        assert_eq!(names(&result), vec!["a2"]);

        let result = evaluator.evaluate(&registry, "/a.*/ ^ /.*1/", None, limits).unwrap();
        assert_eq!(names(&result), vec!["a2", "b1"]);
    }

    #[test]
    fn test_result_sorted_by_name() {
        let registry = registry(&["zeta", "alpha", "mid"]);
        let evaluator = Evaluator::default();
        let result = evaluator
            .evaluate(&registry, "/.*/", None, LimitConfig::new(10))
            .unwrap();
        assert_eq!(names(&result), vec!["alpha", "mid", "zeta"]);
        assert!(result.contains("mid"));
        assert!(!result.contains("nope"));
    }

    #[test]
    fn test_no_selector_lists_everything() {
        let registry = registry(&["b", "a"]);
        let evaluator = Evaluator::default();
        let result = evaluator
            .list(&registry, None, None, LimitConfig::new(10))
            .unwrap();
        assert_eq!(names(&result), vec!["a", "b"]);
        assert_eq!(evaluator.count(&registry, None).unwrap(), 2);
    }

    #[test]
    fn test_explicit_limit_returns_sorted_prefix() {
        let registry = registry(&["d", "c", "b", "a"]);
        let evaluator = Evaluator::default();
        let result = evaluator
            .evaluate(&registry, "/.*/", Some(2), LimitConfig::new(3))
            .unwrap();
        assert_eq!(names(&result), vec!["a", "b"]);
    }

    #[test]
    fn test_implicit_limit_returns_sorted_prefix() {
        let registry = registry(&["c", "a", "b"]);
        let evaluator = Evaluator::default();
        let result = evaluator
            .evaluate(&registry, "/.*/", None, LimitConfig::new(2))
            .unwrap();
        assert_eq!(names(&result), vec!["a", "b"]);
        assert!(result.is_truncated());
        assert_eq!(evaluator.stats().truncated_listings, 1);

        let result = evaluator
            .evaluate(&registry, "/.*/", None, LimitConfig::new(3))
            .unwrap();
        assert!(!result.is_truncated());

        // Counting is unaffected
        let selector = parse_selector("/.*/").unwrap();
        assert_eq!(evaluator.count(&registry, Some(&selector)).unwrap(), 3);
    }

    #[test]
    fn test_explicit_limit_out_of_range_is_rejected() {
        let registry = registry(&["a"]);
        let evaluator = Evaluator::default();
        let err = evaluator
            .evaluate(&registry, "/.*/", Some(3), LimitConfig::new(2))
            .unwrap_err();
        assert_eq!(
            err,
            EvalError::LimitOutOfRange {
                requested: 3,
                list_limit: 2
            }
        );
        assert_eq!(evaluator.stats().limit_rejections, 1);
    }

    #[test]
    fn test_filter_applies_after_fold_and_before_limit() {
        use crate::selector::filter::{CompareOp, Condition};

        let registry = SeriesRegistry::new();
        registry.insert_points("a1", SeriesType::Float, 1).unwrap();
        registry.insert_points("a2", SeriesType::Float, 50).unwrap();
        registry.insert_points("a3", SeriesType::Float, 60).unwrap();
        registry.insert_points("b1", SeriesType::Float, 99).unwrap();

        let evaluator = Evaluator::default();
        let selector = parse_selector("/a.*/").unwrap();
        let filter = PropertyFilter::Condition(Condition::Length {
            op: CompareOp::Gt,
            value: 10,
        });

        // a1 is filtered out before the limit of one is applied
        let result = evaluator
            .list_where(&registry, Some(&selector), Some(&filter), None, LimitConfig::new(1))
            .unwrap();
        assert_eq!(names(&result), vec!["a2"]);
        assert_eq!(
            evaluator
                .count_where(&registry, Some(&selector), Some(&filter))
                .unwrap(),
            2
        );
    }

    #[test]
    fn test_bad_regex_fails_before_snapshot() {
        let registry = registry(&["a"]);
        let evaluator = Evaluator::default();
        let before = registry.stats().snapshots;
        let err = evaluator
            .evaluate(&registry, "/.*/ | /[/", None, LimitConfig::new(10))
            .unwrap_err();
        assert!(matches!(err, EvalError::InvalidRegex { .. }));
        assert_eq!(registry.stats().snapshots, before);
    }

    #[test]
    fn test_stats_track_terms() {
        let registry = registry(&["a"]);
        let evaluator = Evaluator::default();
        evaluator
            .evaluate(&registry, "/a/ | /b/ & /c/", None, LimitConfig::new(10))
            .unwrap();
        let stats = evaluator.stats();
        assert_eq!(stats.queries, 1);
        assert_eq!(stats.terms_matched, 3);
        assert_eq!(stats.regex_compilations, 3);
    }
}
