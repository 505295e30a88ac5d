//! For every relevant input aggregate `p` (every value that can arise as
//! an undecomposed right-hand side during the traversal, not only the full
//! input mask), lists every decomposition `p = big ^ small` with
//! `big & small == 0`, `big >= small`, both `big` and `small` matched and
//! strictly between `0` and the overall target mask.
//!
//! `big` is the component that keeps being decomposed further by the
//! traversal; `small` is the component matched immediately against an
//! output aggregate. The two trivial aggregates, `0` and the overall
//! target mask, are excluded from being either component: the
//! "everything in one piece" interpretation is accounted for separately,
//! as the traversal's baseline, not as a decomposition.
//!
//! Entries for a given `p` are stored in the order they are discovered by
//! iterating `big` ascending, which makes `small` *descending* within each
//! bucket (`small = p - big`, and `big` only ever increases). The
//! traversal's early-break on `small <= il` depends on this monotonicity,
//! not merely on a sort choice.

use std::collections::{HashMap, HashSet};

use crate::aggregate::Mask;
use crate::matcher::ValueMatch;

/// `decompositions(p)` = the ordered list of `(big, small)` decompositions
/// of `p`.
#[derive(Debug, Clone, Default)]
pub struct PairIndex {
    pairs: HashMap<Mask, Vec<(Mask, Mask)>>,
}

impl PairIndex {
    /// The decompositions of `p`, in traversal order (empty if `p` cannot
    /// be decomposed any further, i.e. it is a leaf of the decomposition
    /// tree).
    pub fn decompositions(&self, p: Mask) -> &[(Mask, Mask)] {
        self.pairs.get(&p).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

/// Builds the pair index for the full input side, given its matched
/// aggregates and the overall target mask (the full input mask).
pub fn build_pair_index(value_match: &ValueMatch, target: Mask) -> PairIndex {
    let matched: HashSet<Mask> = value_match.matched_inputs.iter().copied().collect();
    let interior: HashSet<Mask> = matched.into_iter().filter(|&a| a != 0 && a != target).collect();

    let mut pairs: HashMap<Mask, Vec<(Mask, Mask)>> = HashMap::new();
    for big in 0..=target {
        if !interior.contains(&big) {
            continue;
        }
        let small_max = std::cmp::min(big, target - big + 1);
        for small in 0..small_max {
            if (big & small) == 0 && interior.contains(&small) {
                pairs.entry(big + small).or_insert_with(Vec::new).push((big, small));
            }
        }
    }

    PairIndex { pairs }
}
