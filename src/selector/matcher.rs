//! Pattern Matcher
//!
//! Compiles selector terms and matches them against a namespace snapshot.
//!
//! Regexes match whole names: `/a.*/` selects `a1` but not `ba1`. Every term
//! is matched against the full snapshot, never against the running result,
//! so terms can be matched in any order (or in parallel) before folding.
//!
//! All terms of a selector are compiled before any matching starts; an
//! invalid regex or unknown group fails the whole evaluation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use rayon::prelude::*;
use regex::{Regex, RegexBuilder};
use tracing::debug;

use super::{RegexLiteral, Selector, SeriesBitmap, SetOp, TermSource};
use crate::error::{EvalError, EvalResult};
use crate::groups::GroupStore;
use crate::namespace::NamespaceSnapshot;

/// Longest pattern echoed back in an error message
const MAX_ERROR_PATTERN_LEN: usize = 50;

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for the pattern matcher
#[derive(Debug, Clone)]
pub struct MatcherConfig {
    /// Maximum regex pattern length (ReDoS protection)
    pub max_regex_pattern_len: usize,

    /// Compiled regex size limit in bytes
    pub regex_size_limit: usize,

    /// Maximum compiled regexes kept in the cache
    pub regex_cache_entries: usize,

    /// Snapshot size from which matching runs on the rayon pool
    pub parallel_threshold: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            max_regex_pattern_len: 256,
            regex_size_limit: 1024 * 1024,
            regex_cache_entries: 1024,
            parallel_threshold: 10_000,
        }
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Statistics for the pattern matcher
#[derive(Debug, Default)]
pub struct MatcherStats {
    /// Regexes served from the cache
    pub cache_hits: AtomicU64,

    /// Regexes compiled
    pub compilations: AtomicU64,

    /// Rejected or failed regex compilations
    pub regex_errors: AtomicU64,
}

// ============================================================================
// Compiled Terms
// ============================================================================

/// Compiled form of a term source
#[derive(Debug, Clone)]
pub enum TermMatcher {
    /// Anchored regex
    Regex(Regex),
    /// Exact series name
    Name(String),
}

/// A term ready to be matched
#[derive(Debug, Clone)]
pub struct CompiledTerm {
    /// Fold operator
    pub op: SetOp,
    /// Compiled matcher
    pub matcher: TermMatcher,
}

// ============================================================================
// Pattern Matcher
// ============================================================================

/// Compiles and evaluates selector terms
#[derive(Debug)]
pub struct PatternMatcher {
    config: MatcherConfig,

    /// Compiled regex cache keyed by literal
    cache: RwLock<HashMap<RegexLiteral, Regex>>,

    stats: MatcherStats,
}

impl Default for PatternMatcher {
    fn default() -> Self {
        Self::new(MatcherConfig::default())
    }
}

impl PatternMatcher {
    /// Create a matcher with the given configuration
    pub fn new(config: MatcherConfig) -> Self {
        Self {
            config,
            cache: RwLock::new(HashMap::new()),
            stats: MatcherStats::default(),
        }
    }

    /// Matcher configuration
    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Statistics: (cache hits, compilations, regex errors)
    pub fn stats(&self) -> (u64, u64, u64) {
        (
            self.stats.cache_hits.load(Ordering::Relaxed),
            self.stats.compilations.load(Ordering::Relaxed),
            self.stats.regex_errors.load(Ordering::Relaxed),
        )
    }

    /// Compile every term of a selector
    ///
    /// Group references are resolved to their saved regex here, so a
    /// group dropped after compilation does not affect this evaluation.
    pub fn compile(&self, selector: &Selector, groups: &GroupStore) -> EvalResult<Vec<CompiledTerm>> {
        selector
            .terms()
            .iter()
            .map(|term| {
                let matcher = match &term.source {
                    TermSource::Regex(literal) => TermMatcher::Regex(self.compile_regex(literal)?),
                    TermSource::Name(name) => TermMatcher::Name(name.clone()),
                    TermSource::Group(name) => {
                        let literal = groups
                            .get(name)
                            .ok_or_else(|| EvalError::UnknownGroup(name.clone()))?;
                        TermMatcher::Regex(self.compile_regex(&literal)?)
                    },
                };
                Ok(CompiledTerm {
                    op: term.op,
                    matcher,
                })
            })
            .collect()
    }

    /// Get a compiled whole-name regex from cache or compile and cache it
    pub fn compile_regex(&self, literal: &RegexLiteral) -> EvalResult<Regex> {
        {
            let cache = self.cache.read();
            if let Some(regex) = cache.get(literal) {
                self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
                return Ok(regex.clone());
            }
        }

        if literal.body.len() > self.config.max_regex_pattern_len {
            self.stats.regex_errors.fetch_add(1, Ordering::Relaxed);
            return Err(EvalError::InvalidRegex {
                pattern: truncate_pattern(&literal.body),
                reason: format!(
                    "pattern too long: {} chars (max: {})",
                    literal.body.len(),
                    self.config.max_regex_pattern_len
                ),
            });
        }

        // The body must parse on its own: an unbalanced `)` would otherwise
        // close the anchoring group and match partial names
        self.build_regex(literal, &literal.body)?;
        let regex = self.build_regex(literal, &format!("^(?:{})$", literal.body))?;

        self.stats.compilations.fetch_add(1, Ordering::Relaxed);

        {
            let mut cache = self.cache.write();
            if cache.len() < self.config.regex_cache_entries {
                cache.insert(literal.clone(), regex.clone());
            }
        }

        Ok(regex)
    }

    fn build_regex(&self, literal: &RegexLiteral, pattern: &str) -> EvalResult<Regex> {
        RegexBuilder::new(pattern)
            .case_insensitive(literal.case_insensitive)
            .size_limit(self.config.regex_size_limit)
            .build()
            .map_err(|e| {
                self.stats.regex_errors.fetch_add(1, Ordering::Relaxed);
                EvalError::InvalidRegex {
                    pattern: truncate_pattern(&literal.body),
                    reason: e.to_string(),
                }
            })
    }

    /// Match one compiled term against the full snapshot
    pub fn match_term(&self, term: &CompiledTerm, snapshot: &NamespaceSnapshot) -> SeriesBitmap {
        match &term.matcher {
            TermMatcher::Regex(regex) => self.match_regex(regex, snapshot),
            TermMatcher::Name(name) => {
                let mut bitmap = SeriesBitmap::new();
                if let Some(entry) = snapshot.find(name) {
                    bitmap.set(entry.id());
                }
                bitmap
            },
        }
    }

    /// Match every term, in parallel for large snapshots
    ///
    /// The returned bitmaps are in term order regardless of scheduling.
    pub fn match_all(&self, terms: &[CompiledTerm], snapshot: &NamespaceSnapshot) -> Vec<SeriesBitmap> {
        if terms.len() > 1 && snapshot.len() >= self.config.parallel_threshold {
            debug!(
                terms = terms.len(),
                series = snapshot.len(),
                "matching terms in parallel"
            );
            terms
                .par_iter()
                .map(|term| self.match_term(term, snapshot))
                .collect()
        } else {
            terms
                .iter()
                .map(|term| self.match_term(term, snapshot))
                .collect()
        }
    }

    fn match_regex(&self, regex: &Regex, snapshot: &NamespaceSnapshot) -> SeriesBitmap {
        if snapshot.len() >= self.config.parallel_threshold {
            let ids: Vec<_> = snapshot
                .entries()
                .par_iter()
                .filter(|entry| regex.is_match(entry.name()))
                .map(|entry| entry.id())
                .collect();
            SeriesBitmap::from_ids(ids)
        } else {
            let mut bitmap = SeriesBitmap::with_capacity(snapshot.len());
            for entry in snapshot.iter() {
                if regex.is_match(entry.name()) {
                    bitmap.set(entry.id());
                }
            }
            bitmap
        }
    }
}

/// Truncate a pattern for error messages
fn truncate_pattern(pattern: &str) -> String {
    if pattern.chars().count() > MAX_ERROR_PATTERN_LEN {
        let truncated: String = pattern.chars().take(MAX_ERROR_PATTERN_LEN).collect();
        format!("{}...", truncated)
    } else {
        pattern.to_string()
    }
}
