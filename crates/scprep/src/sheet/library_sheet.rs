//! Per-sample library sheets for quantification.

use std::path::Path;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use super::{render_csv, write_text};
use crate::error::{Result, ScprepError};
use crate::identity::{FeatureType, LibraryId, LibraryType};
use crate::metadata::MetadataRow;

/// Which quantification tool the sheet is for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LibrarySheetKind {
    /// Gene expression, immune profiling and feature barcoding libraries;
    /// `feature_barcoding` lists the feature types of FB libraries. ATAC
    /// libraries belong on arc sheets and are rejected here.
    Count { feature_barcoding: Vec<FeatureType> },
    /// Multiome: GEX and ATAC libraries only.
    Arc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibrarySheetRow {
    pub fastqs: String,
    pub sample: String,
    pub library_type: FeatureType,
}

/// Library sheet for one sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibrarySheet {
    pub rows: Vec<LibrarySheetRow>,
}

impl LibrarySheet {
    /// Build a library sheet from the rows of one sample.
    ///
    /// Rows are de-duplicated on (sample, library, lib_type) first, so a library
    /// listed once per lane or run row appears once per feature type.
    pub fn build<'a>(
        rows: impl IntoIterator<Item = &'a MetadataRow>,
        fastq_dir: &Path,
        kind: &LibrarySheetKind,
    ) -> Result<Self> {
        let libraries: IndexSet<(&str, &LibraryId, &str)> = rows
            .into_iter()
            .map(|r| (r.sample_id.as_str(), &r.library_id, r.lib_type.as_str()))
            .collect();

        let mut out = Vec::new();
        for (sample, library_id, lib_type) in libraries {
            let feature_types = match kind {
                LibrarySheetKind::Count { feature_barcoding } => {
                    match LibraryType::resolve(lib_type, library_id)? {
                        LibraryType::Atac => {
                            return Err(ScprepError::UnmappedLibraryType {
                                lib_type: lib_type.to_string(),
                                library: library_id.to_string(),
                            });
                        }
                        t => t.feature_types(feature_barcoding, library_id)?,
                    }
                }
                LibrarySheetKind::Arc => match LibraryType::from_token(lib_type) {
                    Some(t @ (LibraryType::Gex | LibraryType::Atac)) => {
                        t.feature_types(&[], library_id)?
                    }
                    _ => continue,
                },
            };

            let fastqs = fastq_dir
                .join(library_id.as_str())
                .to_string_lossy()
                .into_owned();
            for library_type in feature_types {
                out.push(LibrarySheetRow {
                    fastqs: fastqs.clone(),
                    sample: sample.to_string(),
                    library_type,
                });
            }
        }

        Ok(LibrarySheet { rows: out })
    }

    pub fn render(&self) -> Result<String> {
        render_csv(
            &["fastqs", "sample", "library_type"],
            self.rows.iter().map(|row| {
                [
                    row.fastqs.as_str(),
                    row.sample.as_str(),
                    row.library_type.as_str(),
                ]
            }),
        )
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        write_text(path.as_ref(), &self.render()?)
    }
}
