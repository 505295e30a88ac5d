//! The transaction-side data model: a `Txo` is an opaque id paired with a
//! value, and a `Side` is an ordered, deduplicated collection of them.

use crate::error::Error;

/// A single transaction input or output, abstracted away from scripts,
/// addresses and witness data: just an id and a value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Txo {
    id: String,
    value: u64,
}

impl Txo {
    /// Builds a txo. This is the only constructor; both fields are
    /// required.
    pub fn new(id: impl Into<String>, value: u64) -> Self {
        Txo { id: id.into(), value }
    }

    /// The txo's id, unique within its side.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The txo's value in satoshis.
    pub fn value(&self) -> u64 {
        self.value
    }
}

#[cfg(feature = "arbitrary-input")]
impl<'a> arbitrary::Arbitrary<'a> for Txo {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let id: String = u.arbitrary()?;
        let value: u64 = u.arbitrary()?;
        Ok(Txo::new(id, value))
    }
}

/// One side of a transaction (inputs or outputs), sorted by descending
/// value.
pub type Side = Vec<Txo>;

/// Reserved id prefixes/values the engine itself produces; caller-supplied
/// ids must not collide with these.
pub const PACK_INPUT_PREFIX: &str = "PACK_I";
pub const PACK_OUTPUT_PREFIX: &str = "PACK_O";
pub const FEES_ID: &str = "FEES";

/// Filters out zero-value txos and sorts the remainder by descending value
/// (stable sort, so txos with equal value keep their relative order).
pub fn prepare_side(mut txos: Vec<Txo>) -> Side {
    txos.retain(|t| t.value > 0);
    txos.sort_by(|a, b| b.value.cmp(&a.value));
    txos
}

/// Validates that no two txos on a side share an id, and that none collides
/// with a reserved identifier.
pub fn check_ids_unique(txos: &[Txo]) -> Result<(), Error> {
    let mut seen = std::collections::HashSet::new();
    for t in txos {
        if t.id() == FEES_ID || t.id().starts_with(PACK_INPUT_PREFIX) || t.id().starts_with(PACK_OUTPUT_PREFIX) {
            return Err(Error::DuplicateId(t.id().to_string()));
        }
        if !seen.insert(t.id()) {
            return Err(Error::DuplicateId(t.id().to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_zero_value_and_sorts_descending() {
        let txos = vec![Txo::new("a", 3), Txo::new("b", 0), Txo::new("c", 10), Txo::new("d", 5)];
        let side = prepare_side(txos);
        let values: Vec<u64> = side.iter().map(Txo::value).collect();
        assert_eq!(values, vec![10, 5, 3]);
    }

    #[test]
    fn stable_sort_keeps_relative_order_of_ties() {
        let txos = vec![Txo::new("a", 5), Txo::new("b", 5), Txo::new("c", 5)];
        let side = prepare_side(txos);
        let ids: Vec<&str> = side.iter().map(Txo::id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let txos = vec![Txo::new("a", 1), Txo::new("a", 2)];
        assert!(check_ids_unique(&txos).is_err());
    }

    #[test]
    fn rejects_reserved_ids() {
        let txos = vec![Txo::new("FEES", 1)];
        assert!(check_ids_unique(&txos).is_err());
        let txos = vec![Txo::new("PACK_I1", 1)];
        assert!(check_ids_unique(&txos).is_err());
    }
}
