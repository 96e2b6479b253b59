//! Fuzz target for history-line and tag-argument parsing.
//!
//! Run with: cargo +nightly fuzz run fuzz_history_line
//!
//! Any line that parses as an event must render back to a line that parses
//! to the same event.

#![no_main]

use bmdm_core::{AuditEvent, TagAssignment};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(event) = s.parse::<AuditEvent>() {
        let reparsed: AuditEvent = event.to_string().parse().expect("rendered line must parse");
        assert_eq!(reparsed, event);
    }

    if let Ok(tag) = s.parse::<TagAssignment>() {
        assert!(!tag.key.is_empty());
        assert_eq!(tag.to_string(), s);
    }
});
