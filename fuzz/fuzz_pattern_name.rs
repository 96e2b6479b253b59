//! Fuzz target for file-name metadata extraction.
//!
//! Run with: cargo +nightly fuzz run fuzz_pattern_name
//!
//! Feeds arbitrary basenames through the pattern extractor and checks that
//! every produced record survives an index serialization cycle.

#![no_main]

use bmdm_core::{Extracted, Fingerprint, PatternExtractor, Record};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(name) = std::str::from_utf8(data) else {
        return;
    };

    let Some(fields) = PatternExtractor::parse_name(name) else {
        assert!(name.split('_').count() < 4);
        return;
    };

    let record = Record::new(Fingerprint::of(data), Extracted::Pattern(fields));
    let json = serde_json::to_vec(&record).expect("record serializes");
    let back: Record = serde_json::from_slice(&json).expect("record deserializes");
    assert_eq!(back, record);
});
