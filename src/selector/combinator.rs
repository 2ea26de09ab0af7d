//! Set Combinator
//!
//! Folds per-term match results into one result set, strictly left to
//! right in the order the terms were written:
//!
//! | operator | fold step                         |
//! |----------|-----------------------------------|
//! | seed     | `r = m1`                          |
//! | `\|`     | `r = r ∪ mi`                      |
//! | `&`      | `r = r ∩ mi`                      |
//! | `-`      | `r = r \ mi` (never `mi \ r`)     |
//! | `^`      | `r = r Δ mi`                      |
//!
//! `A - B | C` is `(A - B) | C`. Because `-` and `^` do not associate with
//! the other operators, reordering or regrouping terms changes the result.

use super::{SeriesBitmap, SetOp};

/// Apply one fold step to the running result
///
/// `Seed` replaces the running result; it only appears on the first term.
pub fn apply(op: SetOp, acc: &SeriesBitmap, matched: &SeriesBitmap) -> SeriesBitmap {
    match op {
        SetOp::Seed => matched.clone(),
        SetOp::Union => acc.or(matched),
        SetOp::Intersect => acc.and(matched),
        SetOp::Difference => acc.and_not(matched),
        SetOp::SymmetricDifference => acc.xor(matched),
    }
}

/// Fold `(operator, matched)` pairs in order
///
/// An empty input folds to the empty set.
pub fn fold<I>(steps: I) -> SeriesBitmap
where
    I: IntoIterator<Item = (SetOp, SeriesBitmap)>,
{
    let mut steps = steps.into_iter();
    let mut acc = match steps.next() {
        Some((_, first)) => first,
        None => return SeriesBitmap::new(),
    };

    for (op, matched) in steps {
        acc = apply(op, &acc, &matched);
    }
    acc
}
