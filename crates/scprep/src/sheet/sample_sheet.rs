//! Sequencer sample sheets (one per library).

use std::path::Path;

use indexmap::IndexSet;
use serde::Serialize;
use tracing::debug;

use super::{render_csv, write_text};
use crate::error::Result;
use crate::index_kit::{IndexKit, IndexKitCatalog, IndexLookup, reverse_complement};
use crate::metadata::MetadataRow;

/// Section header preceding the tabular body.
pub const DATA_SECTION: &str = "[Data]";

/// One physical index row of a sample sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleSheetRow {
    pub lane: String,
    pub sample_id: String,
    pub index: String,
    pub index2: Option<String>,
}

/// Sample sheet for one library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleSheet {
    pub rows: Vec<SampleSheetRow>,
    /// Whether the `index2` column is emitted.
    pub dual: bool,
    /// Source file of the matched index kit (None = literal sequences).
    pub kit: Option<String>,
}

impl SampleSheet {
    /// Build a sample sheet from lane-expanded rows of one library.
    ///
    /// The first kit in `catalog` containing every `sample_index` of the group
    /// resolves index names to sequences. Without a match, `sample_index` (and
    /// `sample_index2`, when present) are written as literal sequences.
    pub fn build(rows: &[MetadataRow], catalog: Option<&IndexKitCatalog>) -> Result<Self> {
        let names: IndexSet<&str> = rows.iter().map(sample_index).collect();
        let names: Vec<&str> = names.into_iter().collect();
        let kit = catalog.and_then(|c| c.find_match(&names));

        let sheet = match kit {
            None => {
                debug!(names = ?names, "No index kit matched; using literal sequences");
                let dual = rows.iter().any(|r| r.sample_index2.is_some());
                SampleSheet {
                    rows: rows
                        .iter()
                        .map(|row| SampleSheetRow {
                            lane: lane(row),
                            sample_id: row.sample_id.to_string(),
                            index: sample_index(row).to_string(),
                            index2: dual.then(|| row.sample_index2.clone().unwrap_or_default()),
                        })
                        .collect(),
                    dual,
                    kit: None,
                }
            }
            Some(IndexKit::Dual(dual_kit)) => {
                debug!(kit = dual_kit.source_file(), "Matched dual index kit");
                let mut out = Vec::with_capacity(rows.len());
                for row in rows {
                    let (i7, i5) = dual_kit.pair(sample_index(row))?;
                    out.push(SampleSheetRow {
                        lane: lane(row),
                        sample_id: row.sample_id.to_string(),
                        index: i7.to_string(),
                        index2: Some(i5.to_string()),
                    });
                }
                SampleSheet {
                    rows: out,
                    dual: true,
                    kit: Some(dual_kit.source_file().to_string()),
                }
            }
            Some(IndexKit::Single(single_kit)) => {
                debug!(
                    kit = single_kit.source_file(),
                    replicates = single_kit.replicates(),
                    "Matched single index kit"
                );
                let mut out = Vec::with_capacity(rows.len() * single_kit.replicates());
                for row in rows {
                    for sequence in single_kit.extract(sample_index(row))? {
                        out.push(SampleSheetRow {
                            lane: lane(row),
                            sample_id: row.sample_id.to_string(),
                            index: sequence.to_string(),
                            index2: None,
                        });
                    }
                }
                SampleSheet {
                    rows: out,
                    dual: false,
                    kit: Some(single_kit.source_file().to_string()),
                }
            }
        };

        Ok(sheet)
    }

    /// Column names of the tabular body.
    pub fn header(&self) -> Vec<&'static str> {
        let mut header = vec!["Lane", "Sample_ID", "index"];
        if self.dual {
            header.push("index2");
        }
        header
    }

    /// Render the `[Data]` section header followed by the CSV body.
    pub fn render(&self) -> Result<String> {
        let body = render_csv(
            &self.header(),
            self.rows.iter().map(|row| {
                let mut record = vec![row.lane.as_str(), row.sample_id.as_str(), row.index.as_str()];
                if self.dual {
                    record.push(row.index2.as_deref().unwrap_or(""));
                }
                record
            }),
        )?;
        Ok(format!("{}\n{}", DATA_SECTION, body))
    }

    /// Write the rendered sheet to `path`.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        write_text(path.as_ref(), &self.render()?)
    }
}

/// Reverse complement literal i5 sequences for reverse-strand workflows.
pub fn reverse_complement_index2(rows: &mut [MetadataRow]) -> Result<()> {
    for row in rows {
        if let Some(index2) = row.sample_index2.as_mut() {
            *index2 = reverse_complement(index2)?;
        }
    }
    Ok(())
}

fn sample_index(row: &MetadataRow) -> &str {
    row.sample_index.as_deref().unwrap_or("")
}

fn lane(row: &MetadataRow) -> String {
    row.lane.clone().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{LibraryId, SampleId};
    use crate::index_kit::{DualIndexKit, SingleIndexKit};
    use crate::metadata::expand_lanes;
    use indexmap::IndexMap;

    fn row(sample: &str, index: &str, lane: &str) -> MetadataRow {
        MetadataRow {
            run: "220101_A00001_0001_AB12C3".into(),
            lib_type: "GEX".into(),
            library_id: LibraryId::from("GEX-AB12C3"),
            sample_id: SampleId::from(sample),
            sample_index: Some(index.into()),
            sample_index2: None,
            lane: Some(lane.into()),
            extra: IndexMap::new(),
        }
    }

    fn dual_catalog() -> IndexKitCatalog {
        IndexKitCatalog::new().with_kit(IndexKit::Dual(DualIndexKit::new(
            "dual.csv",
            IndexMap::from([
                ("SI-A1".to_string(), ("AAAA".to_string(), "TTTT".to_string())),
                ("SI-TT-A1".to_string(), ("GTAACATGCG".to_string(), "AGTGTTACCT".to_string())),
            ]),
        )))
    }

    fn single_catalog() -> IndexKitCatalog {
        IndexKitCatalog::new().with_kit(IndexKit::Single(SingleIndexKit::new(
            "single.csv",
            3,
            IndexMap::from([(
                "SI-GA-A1".to_string(),
                vec!["GGTTTACT".to_string(), "CTAAACGG".to_string(), "TCGGCGTC".to_string()],
            )]),
        )))
    }

    #[test]
    fn test_dual_index_kit() {
        let rows = expand_lanes(&[row("S1", "SI-A1", "*")]);
        let catalog = dual_catalog();
        let sheet = SampleSheet::build(&rows, Some(&catalog)).unwrap();

        assert!(sheet.dual);
        assert_eq!(sheet.kit.as_deref(), Some("dual.csv"));
        assert_eq!(
            sheet.rows,
            vec![SampleSheetRow {
                lane: String::new(),
                sample_id: "S1".into(),
                index: "AAAA".into(),
                index2: Some("TTTT".into()),
            }]
        );
    }

    #[test]
    fn test_single_index_expansion() {
        let rows = expand_lanes(&[row("S1", "SI-GA-A1", "1")]);
        let catalog = single_catalog();
        let sheet = SampleSheet::build(&rows, Some(&catalog)).unwrap();

        assert!(!sheet.dual);
        assert_eq!(sheet.rows.len(), 3);
        assert!(sheet.rows.iter().all(|r| r.lane == "1" && r.sample_id == "S1"));
        let indices: IndexSet<&str> = sheet.rows.iter().map(|r| r.index.as_str()).collect();
        assert_eq!(indices.len(), 3);
    }

    #[test]
    fn test_single_index_with_multiple_lanes() {
        let rows = expand_lanes(&[row("S1", "SI-GA-A1", "1 2")]);
        let catalog = single_catalog();
        let sheet = SampleSheet::build(&rows, Some(&catalog)).unwrap();

        assert_eq!(sheet.rows.len(), 6);
        assert_eq!(sheet.rows[0].lane, "1");
        assert_eq!(sheet.rows[3].lane, "2");
    }

    #[test]
    fn test_literal_fallback_when_no_kit_matches() {
        let rows = expand_lanes(&[row("S1", "ACGTACGT", "*")]);
        let catalog = dual_catalog();
        let sheet = SampleSheet::build(&rows, Some(&catalog)).unwrap();

        assert_eq!(sheet.kit, None);
        assert!(!sheet.dual);
        assert_eq!(sheet.rows[0].index, "ACGTACGT");
    }

    #[test]
    fn test_partial_match_falls_back_to_literal() {
        let rows = expand_lanes(&[row("S1", "SI-A1", "*"), row("S2", "CCCCGGGG", "*")]);
        let catalog = dual_catalog();
        let sheet = SampleSheet::build(&rows, Some(&catalog)).unwrap();

        assert_eq!(sheet.kit, None);
        assert_eq!(sheet.rows[0].index, "SI-A1");
    }

    #[test]
    fn test_literal_index2_column() {
        let mut input = row("S1", "ACGTACGT", "*");
        input.sample_index2 = Some("TTGGCCAA".into());
        let sheet = SampleSheet::build(&expand_lanes(&[input]), None).unwrap();

        assert!(sheet.dual);
        assert_eq!(sheet.rows[0].index2.as_deref(), Some("TTGGCCAA"));
    }

    #[test]
    fn test_render() {
        let rows = expand_lanes(&[row("S1", "SI-A1", "1 2")]);
        let catalog = dual_catalog();
        let sheet = SampleSheet::build(&rows, Some(&catalog)).unwrap();

        assert_eq!(
            sheet.render().unwrap(),
            "[Data]\nLane,Sample_ID,index,index2\n1,S1,AAAA,TTTT\n2,S1,AAAA,TTTT\n"
        );
    }

    #[test]
    fn test_reverse_complement_index2() {
        let mut input = row("S1", "ACGTACGT", "*");
        input.sample_index2 = Some("AACC".into());
        let mut rows = vec![input, row("S2", "TTTT", "*")];
        reverse_complement_index2(&mut rows).unwrap();

        assert_eq!(rows[0].sample_index2.as_deref(), Some("GGTT"));
        assert_eq!(rows[1].sample_index2, None);

        rows[0].sample_index2 = Some("ANNA".into());
        assert!(reverse_complement_index2(&mut rows).is_err());
    }
}
