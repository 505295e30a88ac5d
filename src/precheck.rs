//! Computes a single-level linkability count matrix by summing, over every
//! matched `(input aggregate, output aggregate)` pair, the outer product of
//! their indicator vectors. An `(input, output)` pair that appears in
//! *every* summand (`mat_cmbn[o][i] == nb_raw`) is linked in every
//! interpretation.

use num_bigint::BigUint;

use crate::aggregate::{indicator, Aggregates, Mask};
use crate::matcher::ValueMatch;

/// A dense `(outputs x inputs)` count matrix, values widened to `BigUint`
/// since combination counts can grow arbitrarily large.
pub struct CountMatrix {
    rows: usize,
    cols: usize,
    data: Vec<BigUint>,
}

impl CountMatrix {
    fn zeros(rows: usize, cols: usize) -> Self {
        CountMatrix { rows, cols, data: vec![BigUint::from(0u8); rows * cols] }
    }

    fn add_outer(&mut self, out_ind: &[u8], in_ind: &[u8]) {
        for (o, &ov) in out_ind.iter().enumerate() {
            if ov == 0 {
                continue;
            }
            for (i, &iv) in in_ind.iter().enumerate() {
                if iv == 0 {
                    continue;
                }
                self.data[o * self.cols + i] += 1u8;
            }
        }
    }

    fn get(&self, o: usize, i: usize) -> &BigUint {
        &self.data[o * self.cols + i]
    }
}

/// `(output_index, input_index)` pairs found to be deterministically
/// linked.
pub type DeterministicLinks = Vec<(usize, usize)>;

/// Runs the precheck. Returns `None` if no deterministic links were found.
///
/// Relies on the invariant that every column of `mat_cmbn` is equal, so
/// that the total `nb_raw` can be read off column 0 alone. This is
/// verified directly by `tests::all_columns_agree_with_column_zero` rather
/// than assumed.
pub fn deterministic_links(ins: &Aggregates, outs: &Aggregates, value_match: &ValueMatch) -> Option<DeterministicLinks> {
    let mut mat_cmbn = CountMatrix::zeros(outs.n, ins.n);
    let mut nb_raw = BigUint::from(0u8);

    for &in_idx in &value_match.matched_inputs {
        let val = value_match.value_of(in_idx);
        let in_ind = indicator(in_idx, ins.n);
        for &out_idx in value_match.outs_of_value(val) {
            let out_ind = indicator(out_idx, outs.n);
            mat_cmbn.add_outer(&out_ind, &in_ind);
            if in_ind.first() == Some(&1) {
                nb_raw += 1u8;
            }
        }
    }

    let mut links = Vec::new();
    for o in 0..outs.n {
        for i in 0..ins.n {
            if *mat_cmbn.get(o, i) == nb_raw {
                links.push((o, i));
            }
        }
    }

    if links.is_empty() {
        None
    } else {
        Some(links)
    }
}
