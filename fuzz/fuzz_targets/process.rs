#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use std::time::Duration;
use tx_linkability::{LinkabilityAnalyzer, Options, Txo};

#[derive(Arbitrary, Debug)]
struct Params {
    inputs: Vec<Txo>,
    outputs: Vec<Txo>,
    fees: i64,
    options_bits: u8,
    fees_maker: i64,
    fees_taker: i64,
}

fuzz_target!(|params: Params| {
    let analyzer = LinkabilityAnalyzer::new(Duration::from_secs(5), 12);
    let options = Options::from_bits_truncate(params.options_bits);

    let inputs: Vec<(String, i64)> = params.inputs.into_iter().map(|t| (t.id().to_string(), t.value() as i64)).collect();
    let outputs: Vec<(String, i64)> = params.outputs.into_iter().map(|t| (t.id().to_string(), t.value() as i64)).collect();

    let _ = analyzer.process(inputs, outputs, params.fees, vec![], options, (params.fees_maker, params.fees_taker));
});
