//! Errors the engine fails fast on. These are all invalid-input
//! conditions. A size limit being exceeded or a traversal timing out are
//! normal control flow and are never represented as `Error`.

use thiserror::Error as ThisError;

/// Invalid-input conditions `LinkabilityAnalyzer::process` rejects before
/// doing any enumeration work.
#[derive(Debug, ThisError, Clone, PartialEq, Eq)]
pub enum Error {
    /// Two txos on the same side share an id, or a caller-supplied id
    /// collides with a reserved identifier (`FEES`, `PACK_I*`, `PACK_O*`).
    #[error("duplicate or reserved txo id: {0}")]
    DuplicateId(String),

    /// A value supplied by the caller did not fit in a `u64`, i.e. was
    /// negative.
    #[error("negative value for txo {id}: {value}")]
    NegativeValue {
        /// The offending txo's id.
        id: String,
        /// The offending (negative) value.
        value: i64,
    },

    /// A linked set referenced an id that does not appear on the
    /// corresponding side.
    #[error("linked set references unknown txo id: {0}")]
    UnknownLinkedId(String),

    /// `intrafees` contained a negative `fees_maker` or `fees_taker`.
    #[error("intrafee bounds must be non-negative, got ({fees_maker}, {fees_taker})")]
    NegativeIntrafee {
        /// The supplied `fees_maker`.
        fees_maker: i64,
        /// The supplied `fees_taker`.
        fees_taker: i64,
    },

    /// `fees` was negative.
    #[error("fees must be non-negative, got {0}")]
    NegativeFees(i64),
}
