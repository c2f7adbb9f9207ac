//! Sheet builders for demultiplexing and quantification tools.

mod library_sheet;
mod multi_config;
mod sample_sheet;

use std::fs;
use std::path::Path;

use crate::error::{Result, ScprepError};

pub use library_sheet::{LibrarySheet, LibrarySheetKind, LibrarySheetRow};
pub use multi_config::{
    ConfigSection, HashingTable, MULTI_LIBRARY_TYPES, MultiConfig, MultiLibrary, ReferenceKind,
    References, SectionKind,
};
pub use sample_sheet::{SampleSheet, SampleSheetRow, reverse_complement_index2};

/// Render a header and records as CSV with `\n` line endings.
pub(crate) fn render_csv<I, R>(header: &[&str], records: I) -> Result<String>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator,
    R::Item: AsRef<[u8]>,
{
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(header)?;
    for record in records {
        writer.write_record(record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ScprepError::Persistence(format!("Failed to flush CSV: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| ScprepError::Persistence(format!("CSV output is not UTF-8: {}", e)))
}

/// Write a text artifact, creating parent directories as needed.
pub(crate) fn write_text(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| ScprepError::io(parent, e))?;
        }
    }
    fs::write(path, contents).map_err(|e| ScprepError::io(path, e))
}
