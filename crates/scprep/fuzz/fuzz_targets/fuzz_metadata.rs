//! Fuzz target for metadata parsing and row resolution.
//!
//! Arbitrary bytes are parsed as a metadata table and resolved into rows; any
//! outcome is acceptable except a panic.

#![no_main]

use std::path::Path;

use libfuzzer_sys::fuzz_target;
use scprep::input::Parser;
use scprep::metadata::{expand_lanes, resolve_rows};
use scprep::{Manifest, SampleIdentity};

fuzz_target!(|data: &[u8]| {
    if data.len() > 100_000 {
        return;
    }

    let Ok(table) = Parser::new().parse_bytes(data) else {
        return;
    };

    if let Ok(rows) = resolve_rows(&table, Path::new("fuzz.csv"), &SampleIdentity::default(), &[]) {
        let _ = expand_lanes(&rows);
        let _ = Manifest::build(&rows);
    }
});
