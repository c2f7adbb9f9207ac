//! Sample/library manifest consumed by the workflow engine.
//!
//! The manifest maps each sample to its libraries, and each library to its run
//! folder, library type and any extra metadata attributes. It is written as
//! pretty JSON, which the workflow engine reads as YAML.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, ScprepError};
use crate::identity::{LibraryId, SampleId};
use crate::metadata::MetadataRow;

/// Per-library manifest entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryInfo {
    pub run: String,
    pub lib_type: String,
    /// Extra metadata attributes in table order.
    #[serde(flatten)]
    pub extra: IndexMap<String, String>,
}

impl From<&MetadataRow> for LibraryInfo {
    fn from(row: &MetadataRow) -> Self {
        Self {
            run: row.run.clone(),
            lib_type: row.lib_type.clone(),
            extra: row.extra.clone(),
        }
    }
}

/// Nested sample → library → info mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest(IndexMap<SampleId, IndexMap<LibraryId, LibraryInfo>>);

impl Manifest {
    /// Build a manifest from metadata rows, keeping first-seen order.
    ///
    /// A repeated (sample, library) pair replaces the earlier entry; a warning
    /// is emitted when the two entries disagree.
    pub fn build<'a>(rows: impl IntoIterator<Item = &'a MetadataRow>) -> Self {
        let mut samples: IndexMap<SampleId, IndexMap<LibraryId, LibraryInfo>> = IndexMap::new();

        for row in rows {
            let info = LibraryInfo::from(row);
            let libraries = samples.entry(row.sample_id.clone()).or_default();
            if let Some(previous) = libraries.insert(row.library_id.clone(), info) {
                if previous != libraries[&row.library_id] {
                    warn!(
                        sample = %row.sample_id,
                        library = %row.library_id,
                        "Conflicting manifest entries; keeping the last one"
                    );
                }
            }
        }

        Manifest(samples)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sample IDs in first-seen order.
    pub fn samples(&self) -> Vec<&SampleId> {
        self.0.keys().collect()
    }

    /// Libraries of one sample.
    pub fn sample(&self, sample: &SampleId) -> Option<&IndexMap<LibraryId, LibraryInfo>> {
        self.0.get(sample)
    }

    /// All libraries across samples, flattened.
    ///
    /// A library shared by several samples appears once, with the entry of the
    /// last sample listing it.
    pub fn libraries(&self) -> IndexMap<&LibraryId, &LibraryInfo> {
        self.0.values().flat_map(|libs| libs.iter()).collect()
    }

    pub fn library(&self, library: &LibraryId) -> Option<&LibraryInfo> {
        self.0.values().rev().find_map(|libs| libs.get(library))
    }

    /// Path to the run folder of a library.
    pub fn run_path(&self, library: &LibraryId, run_dir: impl AsRef<Path>) -> Option<PathBuf> {
        self.library(library)
            .map(|info| run_dir.as_ref().join(&info.run))
    }

    /// `--use-bases-mask=<mask>` for the library's type, or an empty string.
    pub fn bases_mask_flag(&self, library: &LibraryId, masks: &IndexMap<String, String>) -> String {
        self.library(library)
            .and_then(|info| masks.get(&info.lib_type))
            .map(|mask| format!("--use-bases-mask={}", mask))
            .unwrap_or_default()
    }

    /// Libraries of a sample whose type is one of `lib_types`.
    pub fn libraries_of_types(&self, sample: &SampleId, lib_types: &[&str]) -> Vec<&LibraryId> {
        self.0
            .get(sample)
            .map(|libs| {
                libs.iter()
                    .filter(|(_, info)| lib_types.contains(&info.lib_type.as_str()))
                    .map(|(id, _)| id)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Save the manifest as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    ScprepError::Persistence(format!(
                        "Failed to create directory '{}': {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let file = File::create(path).map_err(|e| {
            ScprepError::Persistence(format!(
                "Failed to create file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self).map_err(|e| {
            ScprepError::Persistence(format!("Failed to serialize manifest: {}", e))
        })?;
        writer.flush().map_err(|e| {
            ScprepError::Persistence(format!("Failed to write '{}': {}", path.display(), e))
        })
    }

    /// Load a manifest written by [`Manifest::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let file = File::open(path).map_err(|e| {
            ScprepError::Persistence(format!("Failed to open file '{}': {}", path.display(), e))
        })?;

        serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            ScprepError::Persistence(format!(
                "Failed to parse manifest '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
