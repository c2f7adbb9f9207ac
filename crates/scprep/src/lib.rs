//! scprep: metadata resolution and sheet generation for single-cell sequencing.
//!
//! A single metadata table describing sequencing runs, library types, samples
//! and sample indices is turned into the per-library and per-sample input files
//! of downstream demultiplexing and quantification tools, plus a manifest that
//! drives the workflow engine.
//!
//! # Outputs
//!
//! - `bcl2fastq/<library_id>.csv`: demultiplexing sample sheet per library
//! - `cellranger/<sample_id>.csv`: count library sheet per sample
//! - `cellranger_arc/<sample_id>.csv`: multiome library sheet per sample
//! - `cellranger_multi/<sample_id>.csv`: multi-library config per sample
//! - `info.json`: sample → library manifest
//!
//! # Example
//!
//! ```no_run
//! use scprep::{Artifact, Generator, GeneratorConfig};
//!
//! let config = GeneratorConfig::new("metadata.csv", "out")
//!     .with_artifacts([Artifact::SampleSheet, Artifact::Count, Artifact::Manifest]);
//! let report = Generator::with_config(config).run()?;
//!
//! for artifact in &report.artifacts {
//!     println!("{:?}: {}", artifact.kind, artifact.path.display());
//! }
//! # Ok::<(), scprep::ScprepError>(())
//! ```
//!
//! The crate emits `tracing` events and never installs a subscriber; the host
//! application decides where they go.

pub mod config;
pub mod error;
pub mod identity;
pub mod index_kit;
pub mod input;
pub mod manifest;
pub mod metadata;
pub mod sheet;

mod generator;

pub use config::{Artifact, GeneratorConfig, IndexKitConfig};
pub use error::{Result, ScprepError};
pub use generator::{GenerationReport, Generator, WrittenArtifact};
pub use identity::{FeatureType, LibraryId, LibraryType, SampleId};
pub use input::{DataTable, SourceMetadata};
pub use manifest::{LibraryInfo, Manifest};
pub use metadata::{MetadataRow, SampleIdentity};
