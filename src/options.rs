//! Processing options and the maker/taker intrafee bounds.

use bitflags::bitflags;

bitflags! {
    /// Which stages of `process` to run.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Options: u8 {
        /// Compute the linkability matrix via the full traversal.
        const LINKABILITY   = 0b0000_0001;
        /// Precheck for deterministic links before the full traversal.
        const PRECHECK      = 0b0000_0010;
        /// Treat fees as an additional synthetic output before processing.
        const MERGE_FEES    = 0b0000_0100;
        /// Pack externally-supplied linked input sets before processing.
        const MERGE_INPUTS  = 0b0000_1000;
        /// Pack externally-supplied linked output sets before processing.
        const MERGE_OUTPUTS = 0b0001_0000;
    }
}

impl Default for Options {
    /// Runs the precheck and the full traversal, with no merging.
    fn default() -> Self {
        Options::LINKABILITY | Options::PRECHECK
    }
}

/// Maker/taker fee bounds for coinjoin-style transactions. Both bounds are
/// non-negative; `has_intrafees()` is true iff either is nonzero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Intrafees {
    /// Max fees a participant may receive from another ("maker" side).
    pub fees_maker: u64,
    /// Max fees a participant may pay to all others ("taker" side).
    pub fees_taker: u64,
}

impl Intrafees {
    /// No intrafees configured.
    pub const NONE: Intrafees = Intrafees { fees_maker: 0, fees_taker: 0 };

    /// Whether either bound is nonzero.
    pub fn has_intrafees(&self) -> bool {
        self.fees_maker != 0 || self.fees_taker != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_enable_linkability_and_precheck_only() {
        let o = Options::default();
        assert!(o.contains(Options::LINKABILITY));
        assert!(o.contains(Options::PRECHECK));
        assert!(!o.contains(Options::MERGE_FEES));
    }

    #[test]
    fn has_intrafees_is_true_iff_either_bound_nonzero() {
        assert!(!Intrafees::NONE.has_intrafees());
        assert!(Intrafees { fees_maker: 1, fees_taker: 0 }.has_intrafees());
        assert!(Intrafees { fees_maker: 0, fees_taker: 1 }.has_intrafees());
    }
}
