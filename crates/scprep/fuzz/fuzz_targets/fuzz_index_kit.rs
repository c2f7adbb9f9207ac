//! Fuzz target for the index kit loader.
//!
//! Kit files are loaded both as dual and as single kits, and every index name
//! found is extracted again.

#![no_main]

use std::io::Write;

use libfuzzer_sys::fuzz_target;
use scprep::index_kit::{ColumnRange, IndexKit, IndexLookup, IndexType, reverse_complement};

fuzz_target!(|data: &[u8]| {
    if data.len() > 100_000 {
        return;
    }

    let Ok(mut temp_file) = tempfile::NamedTempFile::new() else {
        return;
    };
    if temp_file.write_all(data).is_err() {
        return;
    }

    for (columns, index_type) in [
        (ColumnRange::dual(false), IndexType::Dual),
        (ColumnRange::dual(true), IndexType::Dual),
        (ColumnRange::single(), IndexType::Single),
    ] {
        if let Ok(kit) = IndexKit::load(temp_file.path(), columns, index_type) {
            let _ = kit.matches(&["SI-TT-A1"], true);
            if let Ok(sequences) = kit.extract("SI-TT-A1") {
                for seq in sequences {
                    let _ = reverse_complement(seq);
                }
            }
        }
    }
});
