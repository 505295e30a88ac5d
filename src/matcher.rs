//! Indexes input aggregates by value and, for every value an input
//! aggregate can take, finds every output aggregate whose value is within
//! the fee-policy window.

use std::collections::{BTreeMap, HashMap};

use crate::aggregate::{Aggregates, Mask};
use crate::options::Intrafees;

/// Accepts a difference `d = v_in - v_out` under the fee policy.
///
/// Without intrafees: `0 <= d <= fees`.
/// With intrafees: `(-fees_maker <= d <= 0) || (0 <= d <= fees + fees_taker)`.
pub fn accept(d: i128, fees: u64, intrafees: &Intrafees) -> bool {
    if intrafees.has_intrafees() {
        let fees_maker = intrafees.fees_maker as i128;
        let fees_taker_total = fees as i128 + intrafees.fees_taker as i128;
        (-fees_maker..=0).contains(&d) || (0..=fees_taker_total).contains(&d)
    } else {
        (0..=fees as i128).contains(&d)
    }
}

/// The result of matching input aggregates against output aggregates by
/// value under the fee policy.
#[derive(Debug, Clone)]
pub struct ValueMatch {
    /// Matched input aggregates, in ascending order.
    pub matched_inputs: Vec<Mask>,
    /// `value_of[a]` for every matched input aggregate `a`.
    value_of: HashMap<Mask, u64>,
    /// `value -> {output aggregates of that value}`.
    outs_of_value: HashMap<u64, Vec<Mask>>,
}

impl ValueMatch {
    /// The value a matched input aggregate was found to carry.
    pub fn value_of(&self, a: Mask) -> u64 {
        self.value_of[&a]
    }

    /// The output aggregates whose value matches the given input-aggregate
    /// value, or an empty slice if none.
    pub fn outs_of_value(&self, value: u64) -> &[Mask] {
        self.outs_of_value.get(&value).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Whether an input aggregate is matched.
    pub fn is_matched(&self, a: Mask) -> bool {
        self.value_of.contains_key(&a)
    }
}

/// Builds the value match between an input side's aggregates and an output
/// side's aggregates under the given fee policy.
///
/// Iterates unique input-aggregate values ascending, then unique
/// output-aggregate values ascending, and stops advancing outputs early
/// when `!has_intrafees` and the difference has already gone negative
/// (monotonic in output value).
pub fn match_by_value(ins: &Aggregates, outs: &Aggregates, fees: u64, intrafees: &Intrafees) -> ValueMatch {
    let mut value_of: HashMap<Mask, u64> = HashMap::new();
    let mut outs_of_value: HashMap<u64, Vec<Mask>> = HashMap::new();
    let mut matched_set: BTreeMap<Mask, ()> = BTreeMap::new();

    let unique_in_values = unique_values(ins);
    let unique_out_values = unique_values(outs);

    for &in_val in &unique_in_values {
        for &out_val in &unique_out_values {
            let d = in_val as i128 - out_val as i128;

            if !intrafees.has_intrafees() && d < 0 {
                break;
            }

            if accept(d, fees, intrafees) {
                for a in 0..ins.len() as Mask {
                    if ins.value_of(a) == in_val {
                        matched_set.entry(a).or_insert(());
                        value_of.insert(a, in_val);
                    }
                }
                let entry = outs_of_value.entry(in_val).or_insert_with(Vec::new);
                for b in 0..outs.len() as Mask {
                    if outs.value_of(b) == out_val && !entry.contains(&b) {
                        entry.push(b);
                    }
                }
            }
        }
    }

    ValueMatch {
        matched_inputs: matched_set.into_keys().collect(),
        value_of,
        outs_of_value,
    }
}

fn unique_values(agg: &Aggregates) -> Vec<u64> {
    let mut vals: Vec<u64> = agg.values.clone();
    vals.sort_unstable();
    vals.dedup();
    vals
}
