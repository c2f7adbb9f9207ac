//! Generation engine: metadata table in, sheets and manifest out.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::config::{Artifact, GeneratorConfig};
use crate::error::{Result, ScprepError};
use crate::index_kit::IndexKitCatalog;
use crate::input::{Parser, SourceMetadata};
use crate::manifest::Manifest;
use crate::metadata::{MetadataRow, expand_lanes, group_by, resolve_rows};
use crate::sheet::{
    HashingTable, LibrarySheet, LibrarySheetKind, MultiConfig, SampleSheet,
    reverse_complement_index2,
};

/// One file written during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrittenArtifact {
    pub kind: Artifact,
    pub path: PathBuf,
}

/// Result of a generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    /// Metadata about the source table.
    pub source: SourceMetadata,
    /// Written files in generation order.
    pub artifacts: Vec<WrittenArtifact>,
    /// SHA-256 over the configuration and the metadata contents.
    pub fingerprint: String,
    pub generated_at: DateTime<Utc>,
}

impl GenerationReport {
    /// Written files of one kind.
    pub fn artifacts_of(&self, kind: Artifact) -> impl Iterator<Item = &Path> {
        self.artifacts
            .iter()
            .filter(move |a| a.kind == kind)
            .map(|a| a.path.as_path())
    }
}

/// Sheet and manifest generator.
pub struct Generator {
    config: GeneratorConfig,
    parser: Parser,
}

impl Generator {
    pub fn with_config(config: GeneratorConfig) -> Self {
        let parser = Parser::with_config(config.parser.clone());
        Self { config, parser }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Run every enabled artifact family in order.
    ///
    /// The first failure aborts the run; files written before it are kept.
    pub fn run(&self) -> Result<GenerationReport> {
        self.config.validate()?;

        let metadata = &self.config.metadata;
        info!(metadata = %metadata.display(), "Starting sheet generation");

        let (table, source) = self.parser.parse_file(metadata)?;
        let rows = resolve_rows(
            &table,
            metadata,
            &self.config.identity,
            &self.config.required_columns(),
        )?;
        debug!(rows = rows.len(), "Resolved metadata rows");

        let mut artifacts = Vec::new();
        for artifact in Artifact::ALL {
            if !self.config.is_enabled(artifact) {
                continue;
            }
            match artifact {
                Artifact::SampleSheet => self.sample_sheets(&rows, &mut artifacts)?,
                Artifact::Count => self.library_sheets(
                    &rows,
                    Artifact::Count,
                    &LibrarySheetKind::Count {
                        feature_barcoding: self.config.feature_barcoding.clone(),
                    },
                    &mut artifacts,
                )?,
                Artifact::Arc => {
                    self.library_sheets(&rows, Artifact::Arc, &LibrarySheetKind::Arc, &mut artifacts)?
                }
                Artifact::Multi => self.multi_configs(&rows, &mut artifacts)?,
                Artifact::Manifest => {
                    let path = self.config.artifact_path(Artifact::Manifest, "");
                    self.emit(Artifact::Manifest, path, &mut artifacts, |path| {
                        Manifest::build(&rows).save(path)
                    })?;
                }
            }
        }

        let fingerprint = self.fingerprint(&source)?;
        info!(
            artifacts = artifacts.len(),
            fingerprint = %fingerprint,
            "Sheet generation complete"
        );

        Ok(GenerationReport {
            source,
            artifacts,
            fingerprint,
            generated_at: Utc::now(),
        })
    }

    /// Fingerprint of the inputs that determine the outputs.
    pub fn fingerprint(&self, source: &SourceMetadata) -> Result<String> {
        let mut hasher = Sha256::new();
        hasher.update(serde_json::to_vec(&self.config)?);
        hasher.update(source.hash.as_bytes());
        Ok(format!("sha256:{:x}", hasher.finalize()))
    }

    fn sample_sheets(&self, rows: &[MetadataRow], out: &mut Vec<WrittenArtifact>) -> Result<()> {
        let kits = &self.config.index_kits;
        let catalog = IndexKitCatalog::load(&kits.dual, &kits.single, kits.reverse_complement)?;
        debug!(kits = catalog.len(), "Loaded index kit catalog");

        let mut expanded = expand_lanes(rows);
        if kits.reverse_complement {
            reverse_complement_index2(&mut expanded)?;
        }

        for (library, group) in group_by(&expanded, |r| r.library_id.clone()) {
            let group: Vec<MetadataRow> = group.into_iter().cloned().collect();
            let path = self
                .config
                .artifact_path(Artifact::SampleSheet, library.as_str());
            self.emit(Artifact::SampleSheet, path, out, |path| {
                SampleSheet::build(&group, Some(&catalog))?.write(path)
            })?;
        }
        Ok(())
    }

    fn library_sheets(
        &self,
        rows: &[MetadataRow],
        artifact: Artifact,
        kind: &LibrarySheetKind,
        out: &mut Vec<WrittenArtifact>,
    ) -> Result<()> {
        let fastq_dir = self.config.fastq_dir();

        for (sample, group) in group_by(rows, |r| r.sample_id.clone()) {
            let sheet = LibrarySheet::build(group.iter().copied(), &fastq_dir, kind)
                .map_err(|e| e.in_artifact(self.config.artifact_path(artifact, sample.as_str())))?;
            if sheet.rows.is_empty() {
                debug!(sample = %sample, ?artifact, "No matching libraries; skipping sheet");
                continue;
            }

            let path = self.config.artifact_path(artifact, sample.as_str());
            self.emit(artifact, path, out, |path| sheet.write(path))?;
        }
        Ok(())
    }

    fn multi_configs(&self, rows: &[MetadataRow], out: &mut Vec<WrittenArtifact>) -> Result<()> {
        let fastq_dir = self.config.fastq_dir();
        let hashes = self
            .config
            .hashes
            .as_ref()
            .map(|path| HashingTable::load(path))
            .transpose()?;

        for (sample, group) in group_by(rows, |r| r.sample_id.clone()) {
            let path = self.config.artifact_path(Artifact::Multi, sample.as_str());
            let sample_hashes = hashes.as_ref().map(|h| h.for_sample(&sample));
            let config = MultiConfig::build(
                &sample,
                group.iter().copied(),
                &fastq_dir,
                &self.config.multi_options,
                sample_hashes.as_ref(),
                &self.config.references,
            )
            .map_err(|e| e.in_artifact(&path))?;
            if config.libraries.is_empty() {
                debug!(sample = %sample, "No multi libraries; skipping config");
                continue;
            }

            self.emit(Artifact::Multi, path, out, |path| config.write(path))?;
        }
        Ok(())
    }

    fn emit<F>(
        &self,
        kind: Artifact,
        path: PathBuf,
        out: &mut Vec<WrittenArtifact>,
        write: F,
    ) -> Result<()>
    where
        F: FnOnce(&Path) -> Result<()>,
    {
        write(&path).map_err(|e: ScprepError| e.in_artifact(&path))?;
        info!(path = %path.display(), ?kind, "Wrote artifact");
        out.push(WrittenArtifact { kind, path });
        Ok(())
    }
}
