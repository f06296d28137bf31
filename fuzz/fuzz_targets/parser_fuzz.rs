//! Fuzz the full parse pipeline: split, parse, validate, print.
//!
//! Run with: cargo +nightly fuzz run parser_fuzz -- -max_total_time=60

#![no_main]

use libfuzzer_sys::fuzz_target;
use pkmodel_dsl::{parse, to_source, ModelError};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        match parse(input) {
            Ok(model) => {
                // Anything that parses must survive a print/parse cycle.
                let printed = to_source(&model);
                let reparsed = parse(&printed).expect("canonical source must parse");
                assert_eq!(reparsed, model);
            }
            Err(ModelError::Syntax(err)) => {
                assert!(err.line >= 1);
                assert!(err.column >= 1);
                assert!(!err.message.is_empty());
            }
            Err(ModelError::Validation(errors)) => {
                assert!(!errors.is_empty());
            }
        }
    }
});
