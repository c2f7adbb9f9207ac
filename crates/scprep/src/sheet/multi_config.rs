//! Multi-library configuration documents.
//!
//! A document is a sequence of bracketed sections in a fixed order:
//!
//! ```text
//! [libraries]        always
//! [samples]          when sample hashing rows exist for the sample
//! [gene-expression]  when any library is Gene Expression
//! [vdj]              when any library is VDJ-B or VDJ-T
//! [feature]          when any library is Antibody or CRISPR Guide Capture
//! ```
//!
//! Each triggered section except `[libraries]` and `[samples]` needs a
//! reference path; a missing path is only an error once the section is
//! triggered.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use super::{render_csv, write_text};
use crate::error::{Result, ScprepError};
use crate::identity::{FeatureType, LibraryId, LibraryType, SampleId};
use crate::input::{DataTable, Parser};
use crate::metadata::{MetadataRow, SAMPLE_ID};

/// Library types passed to the multi-library pipeline.
pub const MULTI_LIBRARY_TYPES: [LibraryType; 6] = [
    LibraryType::Gex,
    LibraryType::Adt,
    LibraryType::Hto,
    LibraryType::Crispr,
    LibraryType::Bcr,
    LibraryType::Tcr,
];

const HASH_ID: &str = "hash_id";

/// Reference paths for triggered sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct References {
    pub transcriptome: Option<PathBuf>,
    pub vdj: Option<PathBuf>,
    pub features: Option<PathBuf>,
}

impl References {
    fn require(&self, kind: ReferenceKind, sample: &SampleId) -> Result<&Path> {
        let path = match kind {
            ReferenceKind::Transcriptome => self.transcriptome.as_deref(),
            ReferenceKind::Vdj => self.vdj.as_deref(),
            ReferenceKind::Features => self.features.as_deref(),
        };
        path.ok_or_else(|| ScprepError::MissingReference {
            sample: sample.to_string(),
            kind,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Transcriptome,
    Vdj,
    Features,
}

impl Display for ReferenceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReferenceKind::Transcriptome => "Transcriptome",
            ReferenceKind::Vdj => "VDJ",
            ReferenceKind::Features => "Features",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Libraries,
    Samples,
    GeneExpression,
    Vdj,
    Feature,
}

impl SectionKind {
    pub fn name(&self) -> &'static str {
        match self {
            SectionKind::Libraries => "libraries",
            SectionKind::Samples => "samples",
            SectionKind::GeneExpression => "gene-expression",
            SectionKind::Vdj => "vdj",
            SectionKind::Feature => "feature",
        }
    }
}

/// One bracketed section; `body` ends with a newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSection {
    pub kind: SectionKind,
    pub body: String,
}

impl ConfigSection {
    fn reference(kind: SectionKind, path: &Path) -> Self {
        Self {
            kind,
            body: format!("reference,{}\n", path.display()),
        }
    }

    pub fn render(&self) -> String {
        format!("[{}]\n{}", self.kind.name(), self.body)
    }
}

/// A library entry of the `[libraries]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MultiLibrary {
    pub fastq_id: String,
    pub fastqs: String,
    pub feature_type: FeatureType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct HashingRow {
    sample_id: String,
    hash_id: String,
    barcodes: String,
}

/// Sample hashing table: `sample_id`, `hash_id` and one barcode column.
///
/// The barcode column is always the last column (e.g. `cmo_ids`,
/// `hashtag_ids` or `ocm_barcode_ids`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashingTable {
    barcode_column: String,
    rows: Vec<HashingRow>,
}

impl HashingTable {
    /// Load a hashing table, auto-detecting the delimiter.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let (table, _) = Parser::new().parse_file(path)?;
        Self::from_table(&table, path)
    }

    pub fn from_table(table: &DataTable, path: &Path) -> Result<Self> {
        table.require_columns(path, &[SAMPLE_ID, HASH_ID])?;

        let barcode_column = table.headers.last().cloned().unwrap_or_default();
        if barcode_column == SAMPLE_ID || barcode_column == HASH_ID {
            return Err(ScprepError::Schema {
                path: path.to_path_buf(),
                missing: vec!["barcode ID column".to_string()],
            });
        }

        let (sample, hash) = (
            table.column_index(SAMPLE_ID).unwrap_or_default(),
            table.column_index(HASH_ID).unwrap_or_default(),
        );
        let last = table.column_count() - 1;

        let rows = (0..table.row_count())
            .map(|i| HashingRow {
                sample_id: table.get(i, sample).unwrap_or("").to_string(),
                hash_id: table.get(i, hash).unwrap_or("").to_string(),
                barcodes: table.get(i, last).unwrap_or("").to_string(),
            })
            .collect();

        Ok(Self {
            barcode_column,
            rows,
        })
    }

    /// Rows belonging to one sample.
    pub fn for_sample(&self, sample: &SampleId) -> Self {
        Self {
            barcode_column: self.barcode_column.clone(),
            rows: self
                .rows
                .iter()
                .filter(|r| r.sample_id == sample.as_str())
                .cloned()
                .collect(),
        }
    }

    pub fn barcode_column(&self) -> &str {
        &self.barcode_column
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `[samples]` body: one row per hash ID (sorted), barcodes joined by `|`.
    fn samples_section(&self) -> Result<ConfigSection> {
        let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for row in &self.rows {
            grouped
                .entry(row.hash_id.as_str())
                .or_default()
                .push(row.barcodes.as_str());
        }

        let body = render_csv(
            &[SAMPLE_ID, self.barcode_column.as_str()],
            grouped
                .into_iter()
                .map(|(hash_id, barcodes)| [hash_id.to_string(), barcodes.join("|")]),
        )?;

        Ok(ConfigSection {
            kind: SectionKind::Samples,
            body,
        })
    }
}

/// Multi-library configuration for one sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiConfig {
    pub sample: SampleId,
    pub libraries: Vec<MultiLibrary>,
    pub sections: Vec<ConfigSection>,
}

impl MultiConfig {
    /// Build the configuration document for one sample.
    ///
    /// `options` are written under `[gene-expression]` in order, skipping
    /// entries without a value.
    pub fn build<'a>(
        sample: &SampleId,
        rows: impl IntoIterator<Item = &'a MetadataRow>,
        fastq_dir: &Path,
        options: &IndexMap<String, Option<String>>,
        hashes: Option<&HashingTable>,
        references: &References,
    ) -> Result<Self> {
        let libraries = multi_libraries(rows, fastq_dir)?;

        let mut sections = vec![ConfigSection {
            kind: SectionKind::Libraries,
            body: render_csv(
                &["fastq_id", "fastqs", "feature_types"],
                libraries.iter().map(|lib| {
                    [
                        lib.fastq_id.as_str(),
                        lib.fastqs.as_str(),
                        lib.feature_type.as_str(),
                    ]
                }),
            )?,
        }];

        if let Some(hashes) = hashes.filter(|h| !h.is_empty()) {
            sections.push(hashes.samples_section()?);
        }

        let has = |pred: fn(&FeatureType) -> bool| libraries.iter().any(|l| pred(&l.feature_type));

        if has(|ft| *ft == FeatureType::GeneExpression) {
            let reference = references.require(ReferenceKind::Transcriptome, sample)?;
            let mut section = ConfigSection::reference(SectionKind::GeneExpression, reference);
            for (key, value) in options {
                if let Some(value) = value {
                    section.body.push_str(&format!("{},{}\n", key, value));
                }
            }
            sections.push(section);
        }

        if has(FeatureType::is_vdj) {
            let reference = references.require(ReferenceKind::Vdj, sample)?;
            sections.push(ConfigSection::reference(SectionKind::Vdj, reference));
        }

        if has(FeatureType::is_feature_barcode) {
            let reference = references.require(ReferenceKind::Features, sample)?;
            sections.push(ConfigSection::reference(SectionKind::Feature, reference));
        }

        Ok(Self {
            sample: sample.clone(),
            libraries,
            sections,
        })
    }

    pub fn section_kinds(&self) -> Vec<SectionKind> {
        self.sections.iter().map(|s| s.kind).collect()
    }

    /// Sections separated by a blank line.
    pub fn render(&self) -> String {
        self.sections
            .iter()
            .map(ConfigSection::render)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        write_text(path.as_ref(), &self.render())
    }
}

fn multi_libraries<'a>(
    rows: impl IntoIterator<Item = &'a MetadataRow>,
    fastq_dir: &Path,
) -> Result<Vec<MultiLibrary>> {
    let unique: IndexSet<(&str, &LibraryId, &str)> = rows
        .into_iter()
        .map(|r| (r.sample_id.as_str(), &r.library_id, r.lib_type.as_str()))
        .collect();

    let mut libraries = Vec::new();
    for (sample, library_id, lib_type) in unique {
        let Some(lib_type) = LibraryType::from_token(lib_type)
            .filter(|t| MULTI_LIBRARY_TYPES.contains(t))
        else {
            continue;
        };

        let fastqs = fastq_dir
            .join(library_id.as_str())
            .to_string_lossy()
            .into_owned();
        for feature_type in lib_type.feature_types(&[], library_id)? {
            libraries.push(MultiLibrary {
                fastq_id: sample.to_string(),
                fastqs: fastqs.clone(),
                feature_type,
            });
        }
    }
    Ok(libraries)
}
