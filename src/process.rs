//! Orchestrates packing, value matching, the deterministic-link precheck,
//! and the full traversal into a single entry point, applying the size and
//! time limits and handling the degenerate all-merged-away shape.

use std::collections::HashSet;
use std::convert::TryFrom;
use std::time::{Duration, Instant};

use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};

use crate::aggregate::{Aggregates, MAX_TXOS};
use crate::error::Error;
use crate::matcher::match_by_value;
use crate::options::{Intrafees, Options};
use crate::pack::{self, PackRecord, PackSide};
use crate::precheck::deterministic_links;
use crate::traversal::{assemble_matrix, traverse, TraversalResult};
use crate::txo::{check_ids_unique, prepare_side, Txo, FEES_ID};

/// Everything `process` returns: the post-pack/unpack txo lists, the
/// combination count, and the linkability matrix (if computed).
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// `None` when the engine declined (size limit) or timed out.
    pub link_matrix: Option<Vec<Vec<BigUint>>>,
    /// `0` means "did not compute"; `>= 1` means "this is the count".
    pub nb_combinations: BigUint,
    /// Post-processing input list, sorted by descending value.
    pub inputs: Vec<Txo>,
    /// Post-processing output list, sorted by descending value.
    pub outputs: Vec<Txo>,
}

/// Default maximum traversal duration.
pub const DEFAULT_MAX_DURATION: Duration = Duration::from_secs(180);

/// Computes the entropy of a combination count, `log2(nb_cmbn)`. Falls back
/// to the integer's bit length when it's too large to convert to `f64` at
/// all (beyond ~1024 bits), rather than silently producing `f64::INFINITY`.
/// Unreachable in practice given `MAX_TXOS = 12`, but `entropy` stays total
/// either way.
pub fn entropy(nb_cmbn: &BigUint) -> f64 {
    if nb_cmbn.is_zero() {
        return f64::NEG_INFINITY;
    }
    match nb_cmbn.to_f64() {
        Some(v) if v.is_finite() => v.log2(),
        _ => nb_cmbn.bits() as f64,
    }
}

/// The combinatorial transaction-linkability engine. Holds only the
/// resource limits; `process` is otherwise a pure function of its
/// arguments.
#[derive(Debug, Clone, Copy)]
pub struct LinkabilityAnalyzer {
    max_duration: Duration,
    max_txos: usize,
}

impl Default for LinkabilityAnalyzer {
    fn default() -> Self {
        LinkabilityAnalyzer { max_duration: DEFAULT_MAX_DURATION, max_txos: MAX_TXOS }
    }
}

impl LinkabilityAnalyzer {
    /// Builds an analyzer with explicit resource limits.
    pub fn new(max_duration: Duration, max_txos: usize) -> Self {
        LinkabilityAnalyzer { max_duration, max_txos }
    }

    fn within_limit(&self, ins: &[Txo], outs: &[Txo]) -> bool {
        ins.len().max(outs.len()) <= self.max_txos
    }

    /// Computes the linkability matrix, combination count, and post-
    /// processing txo lists for a transaction.
    ///
    /// `inputs`/`outputs` are `(id, value)` pairs with `value` taken as
    /// `i64` at this boundary purely so a negative caller value produces
    /// `Error::NegativeValue` instead of an unsigned wraparound.
    pub fn process(
        &self,
        inputs: Vec<(String, i64)>,
        outputs: Vec<(String, i64)>,
        fees: i64,
        linked_sets: Vec<HashSet<String>>,
        options: Options,
        intrafees: (i64, i64),
    ) -> Result<ProcessOutput, Error> {
        if fees < 0 {
            return Err(Error::NegativeFees(fees));
        }
        let (fees_maker, fees_taker) = intrafees;
        if fees_maker < 0 || fees_taker < 0 {
            return Err(Error::NegativeIntrafee { fees_maker, fees_taker });
        }
        let intrafees = Intrafees { fees_maker: fees_maker as u64, fees_taker: fees_taker as u64 };
        let has_intrafees = intrafees.has_intrafees();

        let mut raw_inputs = to_txos(inputs)?;
        let mut raw_outputs = to_txos(outputs)?;
        check_ids_unique(&raw_inputs)?;
        check_ids_unique(&raw_outputs)?;
        pack::check_linked_ids_known(&linked_sets, &raw_inputs, &raw_outputs)?;

        log::trace!("process: {} inputs, {} outputs, {} linked sets", raw_inputs.len(), raw_outputs.len(), linked_sets.len());

        let mut records: Vec<PackRecord> = Vec::new();
        let mut pack_idx = 0usize;

        if !linked_sets.is_empty() {
            if options.contains(Options::MERGE_INPUTS) {
                records.extend(pack::pack(&mut raw_inputs, &linked_sets, PackSide::Inputs, &mut pack_idx));
            }
            if options.contains(Options::MERGE_OUTPUTS) {
                records.extend(pack::pack(&mut raw_outputs, &linked_sets, PackSide::Outputs, &mut pack_idx));
            }
        }

        let fees_eff = if options.contains(Options::MERGE_FEES) && fees > 0 {
            raw_outputs.push(Txo::new(FEES_ID, fees as u64));
            0u64
        } else {
            fees as u64
        };

        // Filter zero-value txos and sort descending. Done once here and
        // again after the precheck's own packing pass, since that pass can
        // introduce new synthetic txos that need a place in the descending
        // order.
        let mut cur_inputs = prepare_side(raw_inputs);
        let mut cur_outputs = prepare_side(raw_outputs);

        let mut nb_cmbn = BigUint::zero();
        let mut link_matrix: Option<Vec<Vec<BigUint>>> = None;

        if options.contains(Options::PRECHECK) && self.within_limit(&cur_inputs, &cur_outputs) && !has_intrafees {
            log::debug!("process: running precheck");
            let ins_agg = Aggregates::build(&cur_inputs);
            let outs_agg = Aggregates::build(&cur_outputs);
            let vm = match_by_value(&ins_agg, &outs_agg, fees_eff, &Intrafees::NONE);

            if let Some(links) = deterministic_links(&ins_agg, &outs_agg, &vm) {
                let mut mat = vec![vec![BigUint::zero(); cur_inputs.len()]; cur_outputs.len()];
                let mut dtrm_sets: Vec<HashSet<String>> = Vec::new();
                for &(o, i) in &links {
                    mat[o][i] = BigUint::one();
                    let mut s = HashSet::new();
                    s.insert(cur_outputs[o].id().to_string());
                    s.insert(cur_inputs[i].id().to_string());
                    dtrm_sets.push(s);
                }
                link_matrix = Some(mat);

                // Only pack the deterministic-link groups away when the
                // traversal is about to run: it recomputes the matrix from
                // scratch over the packed shape and overwrites `link_matrix`
                // above. If the traversal doesn't run, this matrix (sized
                // to the current, unpacked `cur_inputs`/`cur_outputs`) is
                // the final answer, so packing here would leave it with the
                // wrong shape once `unpack` expands the now-packed sides
                // back out.
                if options.contains(Options::LINKABILITY) {
                    records.extend(pack::pack(&mut cur_inputs, &dtrm_sets, PackSide::Inputs, &mut pack_idx));
                    records.extend(pack::pack(&mut cur_outputs, &dtrm_sets, PackSide::Outputs, &mut pack_idx));
                }
            }
        }

        if cur_inputs.is_empty() || cur_outputs.is_empty() {
            log::debug!("process: a side is fully merged away, degenerate shape");
            nb_cmbn = BigUint::one();
            link_matrix = Some(vec![vec![BigUint::one(); cur_inputs.len()]; cur_outputs.len()]);
        } else if options.contains(Options::LINKABILITY) && self.within_limit(&cur_inputs, &cur_outputs) {
            log::debug!("process: running full traversal ({} x {})", cur_outputs.len(), cur_inputs.len());
            cur_inputs = prepare_side(cur_inputs);
            cur_outputs = prepare_side(cur_outputs);
            let ins_agg = Aggregates::build(&cur_inputs);
            let outs_agg = Aggregates::build(&cur_outputs);
            let vm = match_by_value(&ins_agg, &outs_agg, fees_eff, &intrafees);
            let itgt = ins_agg.full_mask();
            let otgt = outs_agg.full_mask();
            let pair_index = crate::pairs::build_pair_index(&vm, itgt);

            let start = Instant::now();
            match traverse(&vm, &pair_index, itgt, otgt, self.max_duration) {
                TraversalResult::Completed { nb_combinations, links } => {
                    let (nb, mat) = assemble_matrix(&ins_agg, &outs_agg, itgt, otgt, nb_combinations, &links);
                    nb_cmbn = nb;
                    link_matrix = Some(mat);
                }
                TraversalResult::TimedOut => {
                    log::warn!("process: traversal exceeded {:?} (elapsed {:?}), returning no result", self.max_duration, start.elapsed());
                    nb_cmbn = BigUint::zero();
                    link_matrix = None;
                }
            }
        } else if !options.contains(Options::LINKABILITY) {
            // linkability not requested: whatever the precheck produced
            // (or nothing) is the final answer.
        } else {
            log::warn!(
                "process: size limit exceeded ({} inputs, {} outputs, max {}), declining",
                cur_inputs.len(),
                cur_outputs.len(),
                self.max_txos
            );
            nb_cmbn = BigUint::zero();
            link_matrix = None;
        }

        link_matrix = pack::unpack(&records, &mut cur_inputs, &mut cur_outputs, link_matrix);

        Ok(ProcessOutput { link_matrix, nb_combinations: nb_cmbn, inputs: cur_inputs, outputs: cur_outputs })
    }
}

fn to_txos(raw: Vec<(String, i64)>) -> Result<Vec<Txo>, Error> {
    raw.into_iter()
        .map(|(id, value)| {
            let v = u64::try_from(value).map_err(|_| Error::NegativeValue { id: id.clone(), value })?;
            Ok(Txo::new(id, v))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(side: &[Txo]) -> Vec<String> {
        side.iter().map(|t| t.id().to_string()).collect()
    }

    fn run(ins: &[(&str, i64)], outs: &[(&str, i64)]) -> ProcessOutput {
        let analyzer = LinkabilityAnalyzer::default();
        let inputs: Vec<(String, i64)> = ins.iter().map(|&(id, v)| (id.to_string(), v)).collect();
        let outputs: Vec<(String, i64)> = outs.iter().map(|&(id, v)| (id.to_string(), v)).collect();
        analyzer
            .process(inputs, outputs, 0, vec![], Options::default(), (0, 0))
            .expect("valid transaction")
    }

    #[test]
    fn scenario_a_end_to_end() {
        let out = run(&[("a", 10), ("b", 10)], &[("A", 8), ("B", 2), ("C", 3), ("D", 7)]);
        assert_eq!(out.nb_combinations, BigUint::from(3u8));
        assert!(out.link_matrix.is_some());
        assert_eq!(ids(&out.inputs), vec!["a", "b"]);
    }

    #[test]
    fn rejects_negative_fees() {
        let analyzer = LinkabilityAnalyzer::default();
        let err = analyzer
            .process(vec![("a".into(), 5)], vec![("A".into(), 5)], -1, vec![], Options::default(), (0, 0))
            .unwrap_err();
        assert_eq!(err, Error::NegativeFees(-1));
    }

    #[test]
    fn rejects_negative_value() {
        let analyzer = LinkabilityAnalyzer::default();
        let err = analyzer
            .process(vec![("a".into(), -5)], vec![("A".into(), 5)], 0, vec![], Options::default(), (0, 0))
            .unwrap_err();
        assert_eq!(err, Error::NegativeValue { id: "a".to_string(), value: -5 });
    }

    #[test]
    fn rejects_negative_intrafees() {
        let analyzer = LinkabilityAnalyzer::default();
        let err = analyzer
            .process(vec![("a".into(), 5)], vec![("A".into(), 5)], 0, vec![], Options::default(), (-1, 0))
            .unwrap_err();
        assert_eq!(err, Error::NegativeIntrafee { fees_maker: -1, fees_taker: 0 });
    }

    #[test]
    fn degenerate_empty_output_side_after_filtering() {
        let out = run(&[("a", 5)], &[("A", 0)]);
        assert_eq!(out.nb_combinations, BigUint::one());
        let mat = out.link_matrix.expect("all-ones matrix");
        assert_eq!(mat.len(), 0);
    }

    #[test]
    fn size_limit_exceeded_declines() {
        let analyzer = LinkabilityAnalyzer::new(Duration::from_secs(60), 1);
        let inputs = vec![("a".to_string(), 5), ("b".to_string(), 5)];
        let outputs = vec![("A".to_string(), 10)];
        let out = analyzer.process(inputs, outputs, 0, vec![], Options::default(), (0, 0)).expect("no error, just declined");
        assert_eq!(out.nb_combinations, BigUint::zero());
        assert!(out.link_matrix.is_none());
    }

    #[test]
    fn packing_externally_supplied_linked_inputs_collapses_to_one_combination() {
        let analyzer = LinkabilityAnalyzer::default();
        let inputs = vec![("a".to_string(), 10), ("b".to_string(), 10)];
        let outputs = vec![("A".to_string(), 8), ("B".to_string(), 2), ("C".to_string(), 3), ("D".to_string(), 7)];
        let mut linked = HashSet::new();
        linked.insert("a".to_string());
        linked.insert("b".to_string());
        let out = analyzer
            .process(inputs, outputs, 0, vec![linked], Options::LINKABILITY | Options::PRECHECK | Options::MERGE_INPUTS, (0, 0))
            .expect("valid transaction");
        assert_eq!(out.nb_combinations, BigUint::one());
        assert_eq!(out.inputs.len(), 2);
        let mat = out.link_matrix.expect("matrix present");
        assert!(mat.iter().all(|row| row.iter().all(|c| *c == BigUint::one())));
    }

    #[test]
    fn rejects_unknown_linked_id() {
        let analyzer = LinkabilityAnalyzer::default();
        let mut linked = HashSet::new();
        linked.insert("ghost".to_string());
        let err = analyzer
            .process(vec![("a".into(), 5)], vec![("A".into(), 5)], 0, vec![linked], Options::default(), (0, 0))
            .unwrap_err();
        assert_eq!(err, Error::UnknownLinkedId("ghost".to_string()));
    }

    #[test]
    fn precheck_only_keeps_matrix_shape_when_a_deterministic_link_spans_multiple_outputs() {
        // A single input deterministically links to two outputs at once
        // (A+B == a, exactly). With `LINKABILITY` unset, the precheck must
        // not pack that group away: there is no later traversal to rebuild
        // the matrix at the packed shape, so the matrix returned has to
        // keep tracking the unpacked `outputs` list.
        let analyzer = LinkabilityAnalyzer::default();
        let out = analyzer
            .process(
                vec![("a".to_string(), 10)],
                vec![("A".to_string(), 6), ("B".to_string(), 4)],
                0,
                vec![],
                Options::PRECHECK,
                (0, 0),
            )
            .expect("valid transaction");

        assert_eq!(out.outputs.len(), 2);
        let expected_cols = out.inputs.len();
        let mat = out.link_matrix.expect("matrix present");
        assert_eq!(mat.len(), 2);
        assert!(mat.iter().all(|row| row.len() == expected_cols));
    }
}
