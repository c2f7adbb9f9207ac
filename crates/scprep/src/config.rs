//! Generator configuration.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScprepError};
use crate::identity::{FeatureType, LibraryId};
use crate::input::ParserConfig;
use crate::manifest::Manifest;
use crate::metadata::{LANE, SAMPLE_INDEX, SampleIdentity};
use crate::sheet::References;

/// File name of the manifest inside the output directory.
pub const MANIFEST_FILE: &str = "info.json";

/// Output artifact families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Artifact {
    /// Demultiplexing sample sheet, one per library.
    SampleSheet,
    /// Count library sheet, one per sample.
    Count,
    /// Multiome library sheet, one per sample.
    Arc,
    /// Multi-library configuration, one per sample.
    Multi,
    /// Sample/library manifest.
    Manifest,
}

impl Artifact {
    /// Generation order.
    pub const ALL: [Artifact; 5] = [
        Artifact::SampleSheet,
        Artifact::Count,
        Artifact::Arc,
        Artifact::Multi,
        Artifact::Manifest,
    ];

    /// Output subdirectory (None for the manifest, written at the root).
    pub fn directory(&self) -> Option<&'static str> {
        match self {
            Artifact::SampleSheet => Some("bcl2fastq"),
            Artifact::Count => Some("cellranger"),
            Artifact::Arc => Some("cellranger_arc"),
            Artifact::Multi => Some("cellranger_multi"),
            Artifact::Manifest => None,
        }
    }
}

/// Index kit reference files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexKitConfig {
    pub dual: Vec<PathBuf>,
    pub single: Vec<PathBuf>,
    /// Use reverse-complement i5 sequences (dual kit column 3 and literal
    /// `sample_index2` values).
    pub reverse_complement: bool,
}

/// Configuration for a generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Metadata table.
    pub metadata: PathBuf,
    /// Directory receiving every artifact.
    pub output_dir: PathBuf,
    /// FASTQ root referenced by library sheets (default: `<output_dir>/fastqs`).
    #[serde(default)]
    pub fastq_dir: Option<PathBuf>,
    #[serde(default)]
    pub parser: ParserConfig,
    #[serde(default)]
    pub identity: SampleIdentity,
    #[serde(default = "default_artifacts")]
    pub artifacts: Vec<Artifact>,
    #[serde(default)]
    pub index_kits: IndexKitConfig,
    /// Feature types of FB libraries.
    #[serde(default)]
    pub feature_barcoding: Vec<FeatureType>,
    #[serde(default)]
    pub references: References,
    /// Sample hashing table for multi configs.
    #[serde(default)]
    pub hashes: Option<PathBuf>,
    /// `[gene-expression]` options, written in order; null values are skipped.
    #[serde(default = "default_multi_options")]
    pub multi_options: IndexMap<String, Option<String>>,
    /// Demultiplexing bases masks keyed by library type.
    #[serde(default)]
    pub bases_mask: IndexMap<String, String>,
}

impl GeneratorConfig {
    /// Configuration with defaults for everything but the two paths.
    pub fn new(metadata: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            metadata: metadata.into(),
            output_dir: output_dir.into(),
            fastq_dir: None,
            parser: ParserConfig::default(),
            identity: SampleIdentity::default(),
            artifacts: default_artifacts(),
            index_kits: IndexKitConfig::default(),
            feature_barcoding: Vec::new(),
            references: References::default(),
            hashes: None,
            multi_options: default_multi_options(),
            bases_mask: IndexMap::new(),
        }
    }

    /// Load and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ScprepError::io(path, e))?;
        let config: GeneratorConfig = serde_json::from_str(&content).map_err(|e| {
            ScprepError::Config(format!("Failed to parse '{}': {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_artifacts(mut self, artifacts: impl IntoIterator<Item = Artifact>) -> Self {
        self.artifacts = artifacts.into_iter().collect();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.artifacts.is_empty() {
            return Err(ScprepError::Config("No artifacts enabled".to_string()));
        }
        if let Some(delimiter) = self.parser.delimiter {
            if !delimiter.is_ascii() {
                return Err(ScprepError::Config(format!(
                    "Delimiter must be a single ASCII character, got '{}'",
                    delimiter
                )));
            }
        }
        Ok(())
    }

    pub fn is_enabled(&self, artifact: Artifact) -> bool {
        self.artifacts.contains(&artifact)
    }

    pub fn fastq_dir(&self) -> PathBuf {
        self.fastq_dir
            .clone()
            .unwrap_or_else(|| self.output_dir.join("fastqs"))
    }

    /// Metadata columns needed by the enabled artifacts, beyond `run`,
    /// `lib_type` and the sample identity columns.
    pub fn required_columns(&self) -> Vec<&'static str> {
        if self.is_enabled(Artifact::SampleSheet) {
            vec![SAMPLE_INDEX, LANE]
        } else {
            Vec::new()
        }
    }

    /// Output path of one artifact; `name` is the library or sample ID.
    pub fn artifact_path(&self, artifact: Artifact, name: &str) -> PathBuf {
        match artifact.directory() {
            Some(dir) => self.output_dir.join(dir).join(format!("{}.csv", name)),
            None => self.output_dir.join(MANIFEST_FILE),
        }
    }

    /// Bases mask flag for a library using the configured masks.
    pub fn bases_mask_flag(&self, manifest: &Manifest, library: &LibraryId) -> String {
        manifest.bases_mask_flag(library, &self.bases_mask)
    }
}

fn default_artifacts() -> Vec<Artifact> {
    vec![Artifact::SampleSheet, Artifact::Count, Artifact::Manifest]
}

fn default_multi_options() -> IndexMap<String, Option<String>> {
    IndexMap::from([("create-bam".to_string(), Some("true".to_string()))])
}
