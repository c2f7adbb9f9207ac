//! Typed metadata rows resolved from a delimited metadata table.

use std::hash::Hash;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScprepError};
use crate::identity::{LibraryId, SampleId, derive_library_ids, derive_sample_ids};
use crate::input::DataTable;

pub const RUN: &str = "run";
pub const LIB_TYPE: &str = "lib_type";
pub const SAMPLE_ID: &str = "sample_id";
pub const SAMPLE_INDEX: &str = "sample_index";
pub const SAMPLE_INDEX2: &str = "sample_index2";
pub const LANE: &str = "lane";

/// Lane value meaning "all lanes".
pub const ALL_LANES: &str = "*";

/// How sample IDs are obtained from the metadata table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleIdentity {
    /// Take the sample ID verbatim from a column.
    Column(String),
    /// Concatenate two columns with no separator (e.g. donor + hash).
    Concat(String, String),
}

impl SampleIdentity {
    /// Columns this identity reads.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            SampleIdentity::Column(name) => vec![name.as_str()],
            SampleIdentity::Concat(a, b) => vec![a.as_str(), b.as_str()],
        }
    }

    fn derive(&self, table: &DataTable, path: &Path) -> Result<Vec<SampleId>> {
        let column = |name: &str| {
            trimmed_column(table, name).ok_or_else(|| ScprepError::Schema {
                path: path.to_path_buf(),
                missing: vec![name.to_string()],
            })
        };

        match self {
            SampleIdentity::Column(name) => {
                Ok(column(name)?.into_iter().map(SampleId::from).collect())
            }
            SampleIdentity::Concat(a, b) => derive_sample_ids(&column(a)?, &column(b)?),
        }
    }
}

impl Default for SampleIdentity {
    fn default() -> Self {
        SampleIdentity::Column(SAMPLE_ID.to_string())
    }
}

/// Lane restriction for a metadata row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaneSpec {
    /// No restriction (`*` or blank).
    All,
    /// One or more explicit lane tokens.
    Lanes(Vec<String>),
}

impl LaneSpec {
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value == ALL_LANES {
            return LaneSpec::All;
        }
        LaneSpec::Lanes(value.split_whitespace().map(|s| s.to_string()).collect())
    }

    /// Lane field values, one per output row.
    pub fn fields(&self) -> Vec<String> {
        match self {
            LaneSpec::All => vec![String::new()],
            LaneSpec::Lanes(lanes) => lanes.clone(),
        }
    }
}

/// One identified row of the metadata table.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataRow {
    /// Sequencing run folder name.
    pub run: String,
    /// Library type tag, case preserved.
    pub lib_type: String,
    pub library_id: LibraryId,
    pub sample_id: SampleId,
    /// Index-kit name or literal i7 sequence.
    pub sample_index: Option<String>,
    /// Literal i5 sequence.
    pub sample_index2: Option<String>,
    /// Raw lane value.
    pub lane: Option<String>,
    /// Remaining columns in table order.
    pub extra: IndexMap<String, String>,
}

impl MetadataRow {
    /// One row per lane token; `*` becomes a single row with an empty lane.
    pub fn expand_lanes(&self) -> Vec<MetadataRow> {
        let spec = LaneSpec::parse(self.lane.as_deref().unwrap_or(ALL_LANES));
        spec.fields()
            .into_iter()
            .map(|lane| MetadataRow {
                lane: Some(lane),
                ..self.clone()
            })
            .collect()
    }
}

/// Expand every row's lane specification, keeping input order.
pub fn expand_lanes(rows: &[MetadataRow]) -> Vec<MetadataRow> {
    rows.iter().flat_map(MetadataRow::expand_lanes).collect()
}

/// Resolve a parsed table into identified rows.
///
/// `required` lists columns beyond `run`, `lib_type` and the identity columns
/// that the caller needs (e.g. `sample_index` and `lane` for sample sheets).
pub fn resolve_rows(
    table: &DataTable,
    path: &Path,
    identity: &SampleIdentity,
    required: &[&str],
) -> Result<Vec<MetadataRow>> {
    let mut columns = vec![RUN, LIB_TYPE];
    columns.extend(identity.columns());
    columns.extend(required.iter().copied());
    table.require_columns(path, &columns)?;

    let runs = trimmed_column(table, RUN).unwrap_or_default();
    let lib_types = trimmed_column(table, LIB_TYPE).unwrap_or_default();
    let library_ids = derive_library_ids(&lib_types, &runs)?;
    let sample_ids = identity.derive(table, path)?;

    let mut consumed = vec![RUN, LIB_TYPE, SAMPLE_INDEX, SAMPLE_INDEX2, LANE];
    consumed.extend(identity.columns());

    let optional = |row: usize, name: &str| {
        table
            .value(row, name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let rows = library_ids
        .into_iter()
        .zip(sample_ids)
        .enumerate()
        .map(|(i, (library_id, sample_id))| {
            let extra = table
                .headers
                .iter()
                .enumerate()
                .filter(|(_, h)| !consumed.contains(&h.as_str()))
                .map(|(col, h)| (h.clone(), table.get(i, col).unwrap_or("").to_string()))
                .collect();

            MetadataRow {
                run: runs[i].to_string(),
                lib_type: lib_types[i].to_string(),
                library_id,
                sample_id,
                sample_index: optional(i, SAMPLE_INDEX),
                // Present whenever the column exists, even when blank.
                sample_index2: table
                    .value(i, SAMPLE_INDEX2)
                    .map(|v| v.trim().to_string()),
                lane: optional(i, LANE),
                extra,
            }
        })
        .collect();

    Ok(rows)
}

/// Column values with surrounding whitespace removed.
fn trimmed_column<'a>(table: &'a DataTable, name: &str) -> Option<Vec<&'a str>> {
    table
        .column_by_name(name)
        .map(|values| values.into_iter().map(str::trim).collect())
}

/// Group rows by a key, keeping first-seen key order and input row order.
pub fn group_by<'a, K, F>(rows: &'a [MetadataRow], key: F) -> IndexMap<K, Vec<&'a MetadataRow>>
where
    K: Hash + Eq,
    F: Fn(&MetadataRow) -> K,
{
    let mut groups: IndexMap<K, Vec<&MetadataRow>> = IndexMap::new();
    for row in rows {
        groups.entry(key(row)).or_default().push(row);
    }
    groups
}
