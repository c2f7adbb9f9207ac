//! End-to-end tests for sheet generation.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use scprep::sheet::References;
use scprep::{
    Artifact, FeatureType, Generator, GeneratorConfig, LibraryId, Manifest, SampleId,
    SampleIdentity, ScprepError,
};

const DUAL_KIT: &str = "index_name,index(i7),index2_workflow_a(i5),index2_workflow_b(i5)\n\
                        SI-TT-A1,GTAACATGCG,AGTGTTACCT,AGGTAACACT\n\
                        SI-TT-A2,GTGGATCAAA,CAGGGTTGGC,GCCAACCCTG\n";

const SINGLE_KIT: &str = "index_name,seq1,seq2,seq3,seq4\n\
                          SI-GA-A1,GGTTTACT,CTAAACGG,TCGGCGTC,AACCGTAA\n";

/// Helper to write a file into the test directory.
fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("Failed to write test file");
    path
}

fn read(path: impl AsRef<Path>) -> String {
    fs::read_to_string(path).expect("Failed to read artifact")
}

fn config_with_kits(dir: &TempDir, metadata: &str) -> GeneratorConfig {
    let md = write_file(dir.path(), "metadata.csv", metadata);
    let mut config = GeneratorConfig::new(md, dir.path().join("out"));
    config.index_kits.dual = vec![write_file(dir.path(), "Dual_Index_Kit_TT_Set_A.csv", DUAL_KIT)];
    config.index_kits.single = vec![write_file(dir.path(), "Single_Index_Kit_N_Set_A.csv", SINGLE_KIT)];
    config
}

// =============================================================================
// Sample sheets
// =============================================================================

#[test]
fn test_single_row_end_to_end() {
    let dir = TempDir::new().unwrap();
    let config = config_with_kits(
        &dir,
        "run,lib_type,sample_id,sample_index,lane\n\
         220101_A00001_0001_AB12C3,GEX,S1,SI-TT-A1,*\n",
    );

    let report = Generator::with_config(config.clone()).run().expect("Generation failed");

    let sheet_path = config.artifact_path(Artifact::SampleSheet, "GEX-AB12C3");
    assert!(sheet_path.ends_with("bcl2fastq/GEX-AB12C3.csv"));
    assert_eq!(
        read(&sheet_path),
        "[Data]\nLane,Sample_ID,index,index2\n,S1,GTAACATGCG,AGTGTTACCT\n"
    );

    assert_eq!(
        read(config.artifact_path(Artifact::Count, "S1")),
        format!(
            "fastqs,sample,library_type\n{},S1,Gene Expression\n",
            config.fastq_dir().join("GEX-AB12C3").display()
        )
    );

    let manifest = Manifest::load(config.artifact_path(Artifact::Manifest, "")).unwrap();
    assert_eq!(manifest.samples(), vec![&SampleId::from("S1")]);
    assert_eq!(
        manifest.library(&LibraryId::from("GEX-AB12C3")).unwrap().run,
        "220101_A00001_0001_AB12C3"
    );

    assert_eq!(report.source.row_count, 1);
    assert_eq!(report.source.format, "csv");
    assert_eq!(report.artifacts.len(), 3);
}

#[test]
fn test_reverse_complement_workflow() {
    let dir = TempDir::new().unwrap();
    let mut config = config_with_kits(
        &dir,
        "run,lib_type,sample_id,sample_index,sample_index2,lane\n\
         R_AB12C3,GEX,S1,SI-TT-A2,,1\n\
         R_XY98Z7,ADT,S1,ACGTACGT,AACCGGTA,1\n",
    );
    config.index_kits.reverse_complement = true;
    config.artifacts = vec![Artifact::SampleSheet];

    Generator::with_config(config.clone()).run().unwrap();

    assert_eq!(
        read(config.artifact_path(Artifact::SampleSheet, "GEX-AB12C3")),
        "[Data]\nLane,Sample_ID,index,index2\n1,S1,GTGGATCAAA,GCCAACCCTG\n"
    );
    assert_eq!(
        read(config.artifact_path(Artifact::SampleSheet, "ADT-XY98Z7")),
        "[Data]\nLane,Sample_ID,index,index2\n1,S1,ACGTACGT,TACCGGTT\n"
    );
}

#[test]
fn test_single_index_kit_expands_rows() {
    let dir = TempDir::new().unwrap();
    let config = config_with_kits(
        &dir,
        "run,lib_type,sample_id,sample_index,lane\n\
         R_AB12C3,GEX,S1,SI-GA-A1,1 2\n",
    )
    .with_artifacts([Artifact::SampleSheet]);

    Generator::with_config(config.clone()).run().unwrap();

    let sheet = read(config.artifact_path(Artifact::SampleSheet, "GEX-AB12C3"));
    let lines: Vec<&str> = sheet.lines().collect();
    assert_eq!(lines[1], "Lane,Sample_ID,index");
    assert_eq!(lines.len(), 2 + 8);
    assert_eq!(lines[2], "1,S1,GGTTTACT");
    assert_eq!(lines[6], "2,S1,GGTTTACT");
}

#[test]
fn test_tsv_metadata_auto_detect() {
    let dir = TempDir::new().unwrap();
    let md = write_file(
        dir.path(),
        "metadata.tsv",
        "run\tlib_type\tdonor\thash\n\
         R_AB12C3\tGEX\tD1\tH1\n\
         R_AB12C3\tGEX\tD1\tH2\n",
    );
    let mut config =
        GeneratorConfig::new(md, dir.path().join("out")).with_artifacts([Artifact::Manifest]);
    config.identity = SampleIdentity::Concat("donor".into(), "hash".into());

    let report = Generator::with_config(config.clone()).run().unwrap();
    assert_eq!(report.source.format, "tsv");

    let manifest = Manifest::load(config.artifact_path(Artifact::Manifest, "")).unwrap();
    let samples: Vec<&str> = manifest.samples().iter().map(|s| s.as_str()).collect();
    assert_eq!(samples, vec!["D1H1", "D1H2"]);
}

// =============================================================================
// Library sheets and multi configs
// =============================================================================

#[test]
fn test_feature_barcoding_sheet() {
    let dir = TempDir::new().unwrap();
    let md = write_file(
        dir.path(),
        "metadata.csv",
        "run,lib_type,sample_id\nR_AB12C3,GEX,S1\nR_AB12C3,FB,S1\n",
    );
    let mut config =
        GeneratorConfig::new(md, dir.path().join("out")).with_artifacts([Artifact::Count]);
    config.fastq_dir = Some(PathBuf::from("/data/fastqs"));
    config.feature_barcoding = vec![FeatureType::AntibodyCapture, FeatureType::CrisprGuideCapture];

    Generator::with_config(config.clone()).run().unwrap();

    assert_eq!(
        read(config.artifact_path(Artifact::Count, "S1")),
        "fastqs,sample,library_type\n\
         /data/fastqs/GEX-AB12C3,S1,Gene Expression\n\
         /data/fastqs/FB-AB12C3,S1,Antibody Capture\n\
         /data/fastqs/FB-AB12C3,S1,CRISPR Guide Capture\n"
    );
}

#[test]
fn test_unknown_lib_type_fails_count_sheet() {
    let dir = TempDir::new().unwrap();
    let md = write_file(dir.path(), "metadata.csv", "run,lib_type,sample_id\nR_AB12C3,RNA,S1\n");
    let config = GeneratorConfig::new(md, dir.path().join("out")).with_artifacts([Artifact::Count]);

    let err = Generator::with_config(config).run().unwrap_err();
    match err {
        ScprepError::Artifact { source, .. } => match *source {
            ScprepError::UnknownLibraryType { lib_type, library } => {
                assert_eq!(lib_type, "RNA");
                assert_eq!(library, "RNA-AB12C3");
            }
            other => panic!("unexpected source: {other}"),
        },
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_atac_library_fails_count_sheet() {
    let dir = TempDir::new().unwrap();
    let config = config_with_kits(
        &dir,
        "run,lib_type,sample_id,sample_index,lane\n\
         R_AB12C3,GEX,S1,SI-TT-A1,*\n\
         R_XY98Z7,ATAC,S1,SI-GA-A1,*\n",
    );

    match Generator::with_config(config.clone()).run().unwrap_err() {
        ScprepError::Artifact { path, source } => {
            assert_eq!(path, config.artifact_path(Artifact::Count, "S1"));
            match *source {
                ScprepError::UnmappedLibraryType { lib_type, library } => {
                    assert_eq!(lib_type, "ATAC");
                    assert_eq!(library, "ATAC-XY98Z7");
                }
                other => panic!("unexpected source: {other}"),
            }
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!config.artifact_path(Artifact::Count, "S1").exists());
}

#[test]
fn test_atac_library_on_arc_sheet() {
    let dir = TempDir::new().unwrap();
    let md = write_file(
        dir.path(),
        "metadata.csv",
        "run,lib_type,sample_id\nR_AB12C3,GEX,S1\nR_XY98Z7,ATAC,S1\n",
    );
    let mut config = GeneratorConfig::new(md, dir.path().join("out")).with_artifacts([Artifact::Arc]);
    config.fastq_dir = Some(PathBuf::from("/fq"));

    Generator::with_config(config.clone()).run().unwrap();

    assert_eq!(
        read(config.artifact_path(Artifact::Arc, "S1")),
        "fastqs,sample,library_type\n\
         /fq/GEX-AB12C3,S1,Gene Expression\n\
         /fq/ATAC-XY98Z7,S1,Chromatin Accessibility\n"
    );
}

#[test]
fn test_multi_without_references_skips_unsupported_samples() {
    let dir = TempDir::new().unwrap();
    let md = write_file(dir.path(), "metadata.csv", "run,lib_type,sample_id\nR_AB12C3,ATAC,S1\n");
    let config = GeneratorConfig::new(md, dir.path().join("out")).with_artifacts([Artifact::Multi]);
    assert_eq!(config.references, References::default());

    let report = Generator::with_config(config.clone()).run().unwrap();

    assert_eq!(report.artifacts_of(Artifact::Multi).count(), 0);
    assert!(!config.artifact_path(Artifact::Multi, "S1").exists());
}

#[test]
fn test_multi_config_with_hashing() {
    let dir = TempDir::new().unwrap();
    let md = write_file(
        dir.path(),
        "metadata.csv",
        "run,lib_type,sample_id\n\
         R_AB12C3,GEX,POOL1\n\
         R_AB12C3,HTO,POOL1\n\
         R_XY98Z7,TCR,POOL1\n",
    );
    let hashes = write_file(
        dir.path(),
        "hashes.csv",
        "sample_id,hash_id,hashtag_ids\n\
         POOL1,D2,HT2\n\
         POOL1,D1,HT1\n",
    );
    let mut config = GeneratorConfig::new(md, dir.path().join("out")).with_artifacts([Artifact::Multi]);
    config.fastq_dir = Some(PathBuf::from("/fq"));
    config.hashes = Some(hashes);
    config.references = References {
        transcriptome: Some("/ref/GRCh38".into()),
        vdj: Some("/ref/vdj_GRCh38".into()),
        features: Some("/ref/hashtags.csv".into()),
    };

    Generator::with_config(config.clone()).run().unwrap();

    assert_eq!(
        read(config.artifact_path(Artifact::Multi, "POOL1")),
        "[libraries]\n\
         fastq_id,fastqs,feature_types\n\
         POOL1,/fq/GEX-AB12C3,Gene Expression\n\
         POOL1,/fq/HTO-AB12C3,Antibody Capture\n\
         POOL1,/fq/TCR-XY98Z7,VDJ-T\n\
         \n\
         [samples]\n\
         sample_id,hashtag_ids\n\
         D1,HT1\n\
         D2,HT2\n\
         \n\
         [gene-expression]\n\
         reference,/ref/GRCh38\n\
         create-bam,true\n\
         \n\
         [vdj]\n\
         reference,/ref/vdj_GRCh38\n\
         \n\
         [feature]\n\
         reference,/ref/hashtags.csv\n"
    );
}

// =============================================================================
// Errors and determinism
// =============================================================================

#[test]
fn test_missing_columns_reported() {
    let dir = TempDir::new().unwrap();
    let md = write_file(dir.path(), "metadata.csv", "run,lib_type,sample_id\nR_AB12C3,GEX,S1\n");
    let config = GeneratorConfig::new(&md, dir.path().join("out"));

    match Generator::with_config(config).run().unwrap_err() {
        ScprepError::Schema { path, missing } => {
            assert_eq!(path, md);
            assert_eq!(missing, vec!["sample_index", "lane"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_malformed_run_name() {
    let dir = TempDir::new().unwrap();
    let md = write_file(dir.path(), "metadata.csv", "run,lib_type,sample_id\nAB12C3,GEX,S1\n");
    let config = GeneratorConfig::new(md, dir.path().join("out")).with_artifacts([Artifact::Manifest]);

    assert!(matches!(
        Generator::with_config(config).run(),
        Err(ScprepError::MalformedRunName(run)) if run == "AB12C3"
    ));
}

#[test]
fn test_generation_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let config = config_with_kits(
        &dir,
        "run,lib_type,sample_id,sample_index,lane,chemistry\n\
         R_AB12C3,GEX,S2,SI-TT-A1,*,5p\n\
         R_AB12C3,GEX,S1,SI-TT-A2,*,5p\n\
         R_XY98Z7,ADT,S1,SI-GA-A1,1 2,5p\n",
    )
    .with_artifacts(Artifact::ALL.into_iter().filter(|a| *a != Artifact::Multi));

    let first = Generator::with_config(config.clone()).run().unwrap();
    let snapshot: Vec<(PathBuf, String)> = first
        .artifacts
        .iter()
        .map(|a| (a.path.clone(), read(&a.path)))
        .collect();

    let second = Generator::with_config(config).run().unwrap();
    assert_eq!(first.artifacts, second.artifacts);
    assert_eq!(first.fingerprint, second.fingerprint);
    for (path, contents) in snapshot {
        assert_eq!(read(&path), contents, "{} changed", path.display());
    }
}
