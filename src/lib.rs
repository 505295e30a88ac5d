//! # tx-linkability
//! Computes the entropy, linkability matrix, and deterministic input/output
//! links of a Bitcoin transaction modeled abstractly as input values,
//! output values, and fees (no blockchain access, script parsing, or
//! networking involved).

mod aggregate;
mod error;
mod matcher;
mod options;
mod pack;
mod pairs;
mod precheck;
mod process;
mod traversal;
mod txo;

pub use error::Error;
pub use options::{Intrafees, Options};
pub use process::{entropy, LinkabilityAnalyzer, ProcessOutput};
pub use txo::Txo;
