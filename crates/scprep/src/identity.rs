//! Library and sample identity derivation.
//!
//! Identifiers are derived element-wise from parallel metadata columns:
//!
//! - a library ID is `{lib_type}-{flowcell_id}`, where the flow cell ID is the
//!   trailing `_`-delimited token of the run folder name;
//! - a sample ID is either an explicit column or two identity fields pasted
//!   together with no separator.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScprepError};

/// Unique identifier for one physical library (`{lib_type}-{flowcell_id}`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LibraryId(String);

impl LibraryId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for LibraryId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LibraryId {
    fn from(value: &str) -> Self {
        LibraryId(value.to_string())
    }
}

/// Unique identifier for one sample.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SampleId(String);

impl SampleId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SampleId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SampleId {
    fn from(value: &str) -> Self {
        SampleId(value.to_string())
    }
}

/// Vectorised string concatenation over parallel columns.
///
/// All columns must have the same length.
pub fn paste<S: AsRef<str>>(columns: &[&[S]], sep: &str) -> Result<Vec<String>> {
    let Some(first) = columns.first() else {
        return Ok(Vec::new());
    };

    for column in &columns[1..] {
        if column.len() != first.len() {
            return Err(ScprepError::LengthMismatch {
                left: first.len(),
                right: column.len(),
            });
        }
    }

    Ok((0..first.len())
        .map(|i| {
            columns
                .iter()
                .map(|column| column[i].as_ref())
                .collect::<Vec<_>>()
                .join(sep)
        })
        .collect())
}

/// Extract the flow cell ID from an Illumina run folder name.
///
/// The flow cell is the last `_`-delimited token; names without a separator
/// or with an empty trailing token are rejected.
pub fn flowcell_id(run: &str) -> Result<&str> {
    match run.rsplit_once('_') {
        Some((_, fcid)) if !fcid.is_empty() => Ok(fcid),
        _ => Err(ScprepError::MalformedRunName(run.to_string())),
    }
}

/// Derive library IDs from library types and run folder names.
pub fn derive_library_ids<S: AsRef<str>, T: AsRef<str>>(
    lib_types: &[S],
    runs: &[T],
) -> Result<Vec<LibraryId>> {
    let fcids = runs
        .iter()
        .map(|run| flowcell_id(run.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    let lib_types: Vec<&str> = lib_types.iter().map(|s| s.as_ref()).collect();

    Ok(paste(&[lib_types.as_slice(), fcids.as_slice()], "-")?
        .into_iter()
        .map(LibraryId)
        .collect())
}

/// Derive sample IDs by concatenating two identity fields with no separator.
pub fn derive_sample_ids<S: AsRef<str>, T: AsRef<str>>(
    field_a: &[S],
    field_b: &[T],
) -> Result<Vec<SampleId>> {
    let a: Vec<&str> = field_a.iter().map(|s| s.as_ref()).collect();
    let b: Vec<&str> = field_b.iter().map(|s| s.as_ref()).collect();

    Ok(paste(&[a.as_slice(), b.as_slice()], "")?.into_iter().map(SampleId).collect())
}

/// Library type tag used in metadata tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LibraryType {
    #[serde(rename = "GEX")]
    Gex,
    #[serde(rename = "ATAC")]
    Atac,
    #[serde(rename = "ADT")]
    Adt,
    #[serde(rename = "HTO")]
    Hto,
    #[serde(rename = "CRISPR")]
    Crispr,
    #[serde(rename = "BCR")]
    Bcr,
    #[serde(rename = "TCR")]
    Tcr,
    /// Feature barcoding with caller-specified feature types.
    #[serde(rename = "FB")]
    Fb,
}

impl LibraryType {
    /// Parse a metadata token (case-sensitive).
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "GEX" => Some(LibraryType::Gex),
            "ATAC" => Some(LibraryType::Atac),
            "ADT" => Some(LibraryType::Adt),
            "HTO" => Some(LibraryType::Hto),
            "CRISPR" => Some(LibraryType::Crispr),
            "BCR" => Some(LibraryType::Bcr),
            "TCR" => Some(LibraryType::Tcr),
            "FB" => Some(LibraryType::Fb),
            _ => None,
        }
    }

    /// Parse a metadata token, naming the library in the error.
    pub fn resolve(token: &str, library: &LibraryId) -> Result<Self> {
        Self::from_token(token).ok_or_else(|| ScprepError::UnknownLibraryType {
            lib_type: token.to_string(),
            library: library.to_string(),
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LibraryType::Gex => "GEX",
            LibraryType::Atac => "ATAC",
            LibraryType::Adt => "ADT",
            LibraryType::Hto => "HTO",
            LibraryType::Crispr => "CRISPR",
            LibraryType::Bcr => "BCR",
            LibraryType::Tcr => "TCR",
            LibraryType::Fb => "FB",
        }
    }

    /// Map to the feature type(s) understood by the quantification tools.
    ///
    /// `feature_barcoding` supplies the feature types of FB libraries; an FB
    /// library with no configured feature types is unmapped.
    pub fn feature_types(
        &self,
        feature_barcoding: &[FeatureType],
        library: &LibraryId,
    ) -> Result<Vec<FeatureType>> {
        let mapped = match self {
            LibraryType::Gex => vec![FeatureType::GeneExpression],
            LibraryType::Atac => vec![FeatureType::ChromatinAccessibility],
            LibraryType::Adt | LibraryType::Hto => vec![FeatureType::AntibodyCapture],
            LibraryType::Crispr => vec![FeatureType::CrisprGuideCapture],
            LibraryType::Bcr => vec![FeatureType::VdjB],
            LibraryType::Tcr => vec![FeatureType::VdjT],
            LibraryType::Fb if feature_barcoding.is_empty() => {
                return Err(ScprepError::UnmappedLibraryType {
                    lib_type: self.as_str().to_string(),
                    library: library.to_string(),
                });
            }
            LibraryType::Fb => feature_barcoding.to_vec(),
        };
        Ok(mapped)
    }
}

impl Display for LibraryType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Feature type label written into library sheets and multi configs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FeatureType {
    #[serde(rename = "Gene Expression")]
    GeneExpression,
    #[serde(rename = "Chromatin Accessibility")]
    ChromatinAccessibility,
    #[serde(rename = "Antibody Capture")]
    AntibodyCapture,
    #[serde(rename = "CRISPR Guide Capture")]
    CrisprGuideCapture,
    #[serde(rename = "VDJ-B")]
    VdjB,
    #[serde(rename = "VDJ-T")]
    VdjT,
    Custom,
}

impl FeatureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureType::GeneExpression => "Gene Expression",
            FeatureType::ChromatinAccessibility => "Chromatin Accessibility",
            FeatureType::AntibodyCapture => "Antibody Capture",
            FeatureType::CrisprGuideCapture => "CRISPR Guide Capture",
            FeatureType::VdjB => "VDJ-B",
            FeatureType::VdjT => "VDJ-T",
            FeatureType::Custom => "Custom",
        }
    }

    /// Returns true for immune profiling feature types.
    pub fn is_vdj(&self) -> bool {
        matches!(self, FeatureType::VdjB | FeatureType::VdjT)
    }

    /// Returns true for feature types that require a feature reference.
    pub fn is_feature_barcode(&self) -> bool {
        matches!(
            self,
            FeatureType::AntibodyCapture | FeatureType::CrisprGuideCapture
        )
    }
}

impl Display for FeatureType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
