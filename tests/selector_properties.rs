//! Property Tests for Selector Evaluation
//!
//! Uses property-based testing (proptest) to check the fold, the matcher
//! and the parser against simple models on random namespaces.

use std::collections::BTreeSet;

use proptest::prelude::*;
use series_select::namespace::NamespaceSnapshot;
use series_select::selector::combinator;
use series_select::selector::{parse_selector, Evaluator, LimitConfig, SeriesBitmap, SetOp};
use series_select::types::{SeriesEntry, SeriesType};

// =============================================================================
// Test Data Strategies
// =============================================================================

/// Strategy for a namespace of unique short names
fn namespace() -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set("[a-c][a-c0-9]{0,4}", 0..200)
        .prop_map(|names| names.into_iter().collect())
}

/// Strategy for simple whole-name patterns
fn pattern() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(".*".to_string()),
        "[a-c]".prop_map(|c| format!("{}.*", c)),
        "[0-9]".prop_map(|d| format!(".*{}", d)),
        "[a-c]{1,2}".prop_map(|s| format!(".*{}.*", s)),
    ]
}

fn set_op() -> impl Strategy<Value = SetOp> {
    prop_oneof![
        Just(SetOp::Union),
        Just(SetOp::Intersect),
        Just(SetOp::Difference),
        Just(SetOp::SymmetricDifference),
    ]
}

fn id_set() -> impl Strategy<Value = BTreeSet<u32>> {
    prop::collection::btree_set(0u32..300, 0..100)
}

fn snapshot(names: &[String]) -> NamespaceSnapshot {
    NamespaceSnapshot::new(
        names
            .iter()
            .enumerate()
            .map(|(id, name)| {
                std::sync::Arc::new(SeriesEntry::new(id as u32, name.as_str().into(), SeriesType::Float))
            })
            .collect(),
    )
}

fn symbol(op: SetOp) -> char {
    op.symbol().unwrap_or('|')
}

fn list(names: &[String], selector: &str) -> Vec<String> {
    let evaluator = Evaluator::default();
    evaluator
        .evaluate(&snapshot(names), selector, None, LimitConfig::new(usize::MAX))
        .unwrap()
        .names()
        .into_iter()
        .map(String::from)
        .collect()
}

// =============================================================================
// Fold
// =============================================================================

proptest! {
    /// Bitmap fold agrees with a set-based left fold
    #[test]
    fn fold_matches_set_model(
        first in id_set(),
        rest in prop::collection::vec((set_op(), id_set()), 0..6)
    ) {
        let mut model = first.clone();
        for (op, ids) in &rest {
            model = match op {
                SetOp::Union => model.union(ids).copied().collect(),
                SetOp::Intersect => model.intersection(ids).copied().collect(),
                SetOp::Difference => model.difference(ids).copied().collect(),
                SetOp::SymmetricDifference => model.symmetric_difference(ids).copied().collect(),
                SetOp::Seed => unreachable!(),
            };
        }

        let steps = std::iter::once((SetOp::Seed, SeriesBitmap::from_ids(first.iter().copied())))
            .chain(rest.iter().map(|(op, ids)| (*op, SeriesBitmap::from_ids(ids.iter().copied()))));
        let folded = combinator::fold(steps);

        prop_assert_eq!(folded.cardinality(), model.len());
        prop_assert_eq!(folded.to_series_ids(), model.into_iter().collect::<Vec<_>>());
    }
}

// =============================================================================
// Evaluation
// =============================================================================

proptest! {
    /// Every result is a subset of the namespace, sorted and unique
    #[test]
    fn results_are_sorted_subsets(
        names in namespace(),
        first in pattern(),
        rest in prop::collection::vec((set_op(), pattern()), 0..4)
    ) {
        let mut selector = format!("/{}/", first);
        for (op, p) in &rest {
            selector.push_str(&format!(" {} /{}/", symbol(*op), p));
        }

        let result = list(&names, &selector);
        prop_assert!(result.windows(2).all(|w| w[0] < w[1]));
        for name in &result {
            prop_assert!(names.contains(name));
        }
    }

    /// Union and intersection with itself are idempotent; difference and
    /// symmetric difference with itself are empty
    #[test]
    fn self_combination(names in namespace(), p in pattern()) {
        let base = list(&names, &format!("/{}/", p));
        prop_assert_eq!(list(&names, &format!("/{}/ | /{}/", p, p)), base.clone());
        prop_assert_eq!(list(&names, &format!("/{}/ & /{}/", p, p)), base);
        let diff_sel = format!("/{}/ - /{}/", p, p);
        let sym_sel = format!("/{}/ ^ /{}/", p, p);
        prop_assert!(list(&names, &diff_sel).is_empty());
        prop_assert!(list(&names, &sym_sel).is_empty());
    }

    /// A chain of only unions (or only intersections) is order independent
    #[test]
    fn uniform_chains_commute(
        names in namespace(),
        patterns in prop::collection::vec(pattern(), 2..5),
        intersect in any::<bool>()
    ) {
        let op = if intersect { " & " } else { " | " };
        let forward: Vec<String> = patterns.iter().map(|p| format!("/{}/", p)).collect();
        let backward: Vec<String> = forward.iter().rev().cloned().collect();

        prop_assert_eq!(
            list(&names, &forward.join(op)),
            list(&names, &backward.join(op))
        );
    }
}

// =============================================================================
// Parser
// =============================================================================

proptest! {
    /// The parser rejects or accepts arbitrary text without panicking
    #[test]
    fn parser_never_panics(text in "\\PC{0,64}") {
        let _ = parse_selector(&text);
    }

    /// Displayed selectors parse back to the same selector
    #[test]
    fn display_reparses(
        first in pattern(),
        rest in prop::collection::vec((set_op(), pattern()), 0..4)
    ) {
        let mut text = format!("/{}/", first);
        for (op, p) in &rest {
            text.push_str(&format!(" {} /{}/", symbol(*op), p));
        }

        let selector = parse_selector(&text).unwrap();
        prop_assert_eq!(parse_selector(&selector.to_string()).unwrap(), selector);
    }
}
