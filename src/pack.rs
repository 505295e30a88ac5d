//! Merges txos already known to be controlled by the same entity into a
//! single synthetic txo before the combinatorial engine ever sees them,
//! then expands the resulting matrix row/column back out afterwards.
//!
//! Packing is symmetric: `pack` takes a `Side` of either kind, and
//! `PackRecord` records which side it came from so `unpack` can expand
//! rows or columns alike.

use std::collections::HashSet;

use num_bigint::BigUint;

use crate::error::Error;
use crate::txo::{Side, Txo, PACK_INPUT_PREFIX, PACK_OUTPUT_PREFIX};

/// Which side a pack was built from, driving whether `unpack` expands a
/// column (inputs) or a row (outputs) of the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackSide {
    Inputs,
    Outputs,
}

/// A single pack: the synthetic txo that replaced a group, and the
/// original txos it stands for, in the order they were pulled out of the
/// side.
#[derive(Debug, Clone)]
pub struct PackRecord {
    pub side: PackSide,
    pub synthetic_id: String,
    pub members: Vec<Txo>,
}

/// Merges the groups of linked txo ids named in `linked_ids` into synthetic
/// txos, replacing their members in `side`. Groups that share an id are
/// merged into one. Groups with no matching member in `side` are silently
/// skipped, since a linked set may name ids that live on the other side.
///
/// `next_idx` numbers synthetic ids across repeated calls, since packing
/// can run in more than one pass over the same sides.
pub fn pack(side: &mut Side, linked_ids: &[HashSet<String>], pack_side: PackSide, next_idx: &mut usize) -> Vec<PackRecord> {
    let merged = merge_sets(linked_ids);
    let mut records = Vec::new();

    for group in &merged {
        let mut members = Vec::new();
        let mut total = 0u64;
        side.retain(|txo| {
            if group.contains(txo.id()) {
                total += txo.value();
                members.push(txo.clone());
                false
            } else {
                true
            }
        });

        if members.is_empty() {
            continue;
        }

        *next_idx += 1;
        let prefix = match pack_side {
            PackSide::Inputs => PACK_INPUT_PREFIX,
            PackSide::Outputs => PACK_OUTPUT_PREFIX,
        };
        let synthetic_id = format!("{prefix}{next_idx}");
        side.push(Txo::new(synthetic_id.clone(), total));
        records.push(PackRecord { side: pack_side, synthetic_id, members });
    }

    records
}

/// Merges a list of sets that may overlap into a list of disjoint sets,
/// each the union of every input set transitively sharing an element with
/// it.
fn merge_sets(sets: &[HashSet<String>]) -> Vec<HashSet<String>> {
    let mut merged: Vec<HashSet<String>> = Vec::new();
    for s in sets {
        let mut combined = s.clone();
        let mut i = 0;
        while i < merged.len() {
            if !merged[i].is_disjoint(&combined) {
                combined.extend(merged.remove(i));
            } else {
                i += 1;
            }
        }
        merged.push(combined);
    }
    merged
}

/// Expands a link matrix back out: for every pack record (applied in
/// reverse order, innermost pack first), duplicates the synthetic txo's
/// row/column across every member it stood for, and splices the member
/// txos back into `inputs`/`outputs` in its place.
///
/// If `matrix` is `None` (precheck found nothing, linkability wasn't run),
/// there is nothing to expand; only the txo lists are restored.
pub fn unpack(
    records: &[PackRecord],
    inputs: &mut Vec<Txo>,
    outputs: &mut Vec<Txo>,
    matrix: Option<Vec<Vec<BigUint>>>,
) -> Option<Vec<Vec<BigUint>>> {
    let mut mat = matrix;

    for record in records.iter().rev() {
        match record.side {
            PackSide::Inputs => {
                let idx = inputs.iter().position(|t| t.id() == record.synthetic_id).expect("pack record must reference a live synthetic txo");
                if let Some(m) = mat.as_mut() {
                    for row in m.iter_mut() {
                        let col = row[idx].clone();
                        let expanded: Vec<BigUint> = record.members.iter().map(|_| col.clone()).collect();
                        row.splice(idx..idx + 1, expanded);
                    }
                }
                inputs.splice(idx..idx + 1, record.members.iter().cloned());
            }
            PackSide::Outputs => {
                let idx = outputs.iter().position(|t| t.id() == record.synthetic_id).expect("pack record must reference a live synthetic txo");
                if let Some(m) = mat.as_mut() {
                    let row = m[idx].clone();
                    let expanded: Vec<Vec<BigUint>> = record.members.iter().map(|_| row.clone()).collect();
                    m.splice(idx..idx + 1, expanded);
                }
                outputs.splice(idx..idx + 1, record.members.iter().cloned());
            }
        }
    }

    mat
}

/// Rejects linked-set ids that don't correspond to any supplied input or
/// output id.
pub fn check_linked_ids_known(linked_ids: &[HashSet<String>], inputs: &[Txo], outputs: &[Txo]) -> Result<(), Error> {
    let known: HashSet<&str> = inputs.iter().map(|t| t.id()).chain(outputs.iter().map(|t| t.id())).collect();
    for group in linked_ids {
        for id in group {
            if !known.contains(id.as_str()) {
                return Err(Error::UnknownLinkedId(id.clone()));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn merges_overlapping_linked_sets() {
        let sets = vec![set(&["a", "b"]), set(&["b", "c"]), set(&["d"])];
        let merged = merge_sets(&sets);
        assert_eq!(merged.len(), 2);
        assert!(merged.iter().any(|s| *s == set(&["a", "b", "c"])));
        assert!(merged.iter().any(|s| *s == set(&["d"])));
    }

    #[test]
    fn packs_linked_inputs_into_one_synthetic_txo() {
        let mut ins = vec![Txo::new("a", 5), Txo::new("b", 3), Txo::new("c", 2)];
        let mut idx = 0;
        let records = pack(&mut ins, &[set(&["a", "b"])], PackSide::Inputs, &mut idx);
        assert_eq!(records.len(), 1);
        assert_eq!(ins.len(), 2);
        let synth = ins.iter().find(|t| t.id() == "PACK_I1").expect("synthetic txo present");
        assert_eq!(synth.value(), 8);
        assert!(ins.iter().any(|t| t.id() == "c"));
    }

    #[test]
    fn unpack_expands_packed_column_across_members() {
        let mut inputs = vec![Txo::new("PACK_I1", 8), Txo::new("c", 2)];
        let mut outputs = vec![Txo::new("X", 10)];
        let records = vec![PackRecord {
            side: PackSide::Inputs,
            synthetic_id: "PACK_I1".to_string(),
            members: vec![Txo::new("a", 5), Txo::new("b", 3)],
        }];
        let matrix = Some(vec![vec![BigUint::from(7u8), BigUint::from(2u8)]]);
        let unpacked = unpack(&records, &mut inputs, &mut outputs, matrix).expect("matrix present");
        assert_eq!(inputs.iter().map(|t| t.id().to_string()).collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(unpacked, vec![vec![BigUint::from(7u8), BigUint::from(7u8), BigUint::from(2u8)]]);
    }

    #[test]
    fn unpack_with_no_matrix_only_restores_txo_lists() {
        let mut inputs = vec![Txo::new("PACK_I1", 8)];
        let mut outputs = vec![];
        let records = vec![PackRecord {
            side: PackSide::Inputs,
            synthetic_id: "PACK_I1".to_string(),
            members: vec![Txo::new("a", 5), Txo::new("b", 3)],
        }];
        let unpacked = unpack(&records, &mut inputs, &mut outputs, None);
        assert!(unpacked.is_none());
        assert_eq!(inputs.len(), 2);
    }

    #[test]
    fn rejects_linked_ids_not_present_on_either_side() {
        let inputs = vec![Txo::new("a", 5)];
        let outputs = vec![Txo::new("X", 5)];
        let err = check_linked_ids_known(&[set(&["a", "ghost"])], &inputs, &outputs).unwrap_err();
        assert_eq!(err, Error::UnknownLinkedId("ghost".to_string()));
    }
}
