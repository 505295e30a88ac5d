//! Depth-first enumeration of valid `(input-partition, output-partition)`
//! pairings, expressed as an explicit frame stack rather than native
//! recursion, so that the wall-clock budget check on every push is trivial
//! and traversal depth (bounded by the number of inputs anyway) never
//! touches the call stack.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use num_bigint::BigUint;
use num_traits::{One, Zero};

use crate::aggregate::{indicator, Aggregates, Mask};
use crate::matcher::ValueMatch;
use crate::pairs::PairIndex;

/// `o_r -> { o_l -> (nb_parents, nb_children) }`: for the current
/// traversal level, every compatible output partition of the parent level
/// and its accumulated counts.
type DOut = HashMap<Mask, HashMap<Mask, (BigUint, BigUint)>>;

struct Frame {
    cursor: usize,
    il: Mask,
    ir: Mask,
    d_out: DOut,
}

/// Sparse accumulator of per-aggregate-pair multiplicities, keyed
/// `(input_aggregate, output_aggregate)`.
pub type LinkAccumulator = HashMap<(Mask, Mask), BigUint>;

/// The outcome of a traversal: either it completed within budget, or it
/// was aborted (size already checked by the caller; this module only
/// aborts on timeout).
pub enum TraversalResult {
    /// Completed: total combination count and the sparse link accumulator.
    Completed { nb_combinations: BigUint, links: LinkAccumulator },
    /// Exceeded `max_duration`: abort with no combination count and no
    /// matrix. No partial results are returned.
    TimedOut,
}

/// Runs the traversal. `itgt`/`otgt` are the full input/output masks.
pub fn traverse(
    value_match: &ValueMatch,
    pair_index: &PairIndex,
    itgt: Mask,
    otgt: Mask,
    max_duration: Duration,
) -> TraversalResult {
    let mut d_links: LinkAccumulator = HashMap::new();

    let mut root_d_out: DOut = HashMap::new();
    root_d_out.insert(otgt, {
        let mut m = HashMap::new();
        m.insert(0, (BigUint::one(), BigUint::zero()));
        m
    });
    let mut stack: Vec<Frame> = vec![Frame { cursor: 0, il: 0, ir: itgt, d_out: root_d_out }];

    let start = Instant::now();
    let mut root_result: Option<BigUint> = None;

    while let Some(frame_ref) = stack.last() {
        if start.elapsed() >= max_duration {
            return TraversalResult::TimedOut;
        }

        let decomps = pair_index.decompositions(frame_ref.ir);
        let cursor = frame_ref.cursor;

        let advance = if cursor < decomps.len() {
            let (big, small) = decomps[cursor];
            if small > frame_ref.il {
                Some((big, small))
            } else {
                None
            }
        } else {
            None
        };

        match advance {
            Some((n_ir, n_il)) => {
                let frame = stack.last_mut().expect("stack non-empty");
                let n_d_out = build_child_d_out(&frame.d_out, value_match, otgt, n_ir, n_il);
                frame.cursor = cursor + 1;
                stack.push(Frame { cursor: 0, il: n_il, ir: n_ir, d_out: n_d_out });
            }
            None => {
                let popped = stack.pop().expect("stack non-empty");
                match stack.last_mut() {
                    None => {
                        let leaf = popped.d_out.get(&otgt).and_then(|m| m.get(&0));
                        root_result = Some(leaf.map(|(_, children)| children.clone()).unwrap_or_else(BigUint::zero));
                    }
                    Some(parent) => {
                        propagate(popped, parent, &mut d_links);
                    }
                }
            }
        }
    }

    let nb_combinations = root_result.unwrap_or_else(BigUint::zero);
    TraversalResult::Completed { nb_combinations, links: d_links }
}

/// Builds the child frame's `d_out` from the parent's current `d_out`,
/// decomposing one more step: peel off `n_il` (matched immediately
/// against an output aggregate) and continue decomposing `n_ir`.
fn build_child_d_out(parent_d_out: &DOut, value_match: &ValueMatch, otgt: Mask, n_ir: Mask, n_il: Mask) -> DOut {
    let mut n_d_out: DOut = HashMap::new();
    let val_il = value_match.value_of(n_il);
    let val_ir = value_match.value_of(n_ir);
    let match_out_for_ir = value_match.outs_of_value(val_ir);
    let match_out_for_il = value_match.outs_of_value(val_il);

    for (&o_r, piece_map) in parent_d_out {
        let sol = otgt ^ o_r;
        let nb_prt: BigUint = piece_map.values().map(|(p, _)| p.clone()).fold(BigUint::zero(), |a, b| a + b);

        for &n_ol in match_out_for_il {
            if sol & n_ol != 0 {
                continue;
            }
            let n_sol = sol | n_ol;
            let n_or = otgt ^ n_sol;
            if (n_sol & n_or) == 0 && match_out_for_ir.contains(&n_or) {
                n_d_out.entry(n_or).or_insert_with(HashMap::new).insert(n_ol, (nb_prt.clone(), BigUint::zero()));
            }
        }
    }

    n_d_out
}

/// Folds a completed (popped) frame's counts back into its parent: updates
/// the sparse link accumulator for the `(ir, o_r)` and `(il, o_l)` pairs,
/// and back-propagates the child combination count into every compatible
/// entry of the parent's `d_out[ol + o_r]` bucket.
fn propagate(popped: Frame, parent: &mut Frame, d_links: &mut LinkAccumulator) {
    for (o_r, l_ol) in &popped.d_out {
        let r_key = (popped.ir, *o_r);
        for (ol, (nb_prnt, nb_chld)) in l_ol {
            let l_key = (popped.il, *ol);
            let nb_occur = nb_chld + BigUint::one();

            *d_links.entry(r_key).or_insert_with(BigUint::zero) += nb_prnt;
            *d_links.entry(l_key).or_insert_with(BigUint::zero) += nb_prnt * &nb_occur;

            let p_or = ol ^ o_r;
            if let Some(p_l_ol) = parent.d_out.get_mut(&p_or) {
                for (_p_ol, (_p_nb_prt, p_nb_chld)) in p_l_ol.iter_mut() {
                    *p_nb_chld += &nb_occur;
                }
            }
        }
    }
}

/// Expands the final link accumulator (plus the trivial "everything in one
/// piece" pairing) into the dense per-txo linkability matrix, and returns
/// the final combination count.
pub fn assemble_matrix(
    ins: &Aggregates,
    outs: &Aggregates,
    itgt: Mask,
    otgt: Mask,
    nb_combinations: BigUint,
    links: &LinkAccumulator,
) -> (BigUint, Vec<Vec<BigUint>>) {
    let mut mat = vec![vec![BigUint::zero(); ins.n]; outs.n];
    add_outer(&mut mat, outs.n, ins.n, otgt, itgt, &BigUint::one());

    for (&(a, b), mult) in links {
        add_outer(&mut mat, outs.n, ins.n, b, a, mult);
    }

    (nb_combinations + BigUint::one(), mat)
}

fn add_outer(mat: &mut [Vec<BigUint>], n_outs: usize, n_ins: usize, out_agg: Mask, in_agg: Mask, mult: &BigUint) {
    if mult.is_zero() {
        return;
    }
    let out_ind = indicator(out_agg, n_outs);
    let in_ind = indicator(in_agg, n_ins);
    for (o, &ov) in out_ind.iter().enumerate() {
        if ov == 0 {
            continue;
        }
        for (i, &iv) in in_ind.iter().enumerate() {
            if iv == 0 {
                continue;
            }
            mat[o][i] += mult;
        }
    }
}
