//! Sample index kits and the catalog used to resolve index names.
//!
//! An index kit file is a delimited table whose first row is keyed by the
//! designator `index_name`. Every following row maps an index set name (e.g.
//! `SI-TT-A1`) to one or more sequences:
//!
//! - dual index kits: i7, i5 (forward strand), i5 (reverse complement);
//! - single index kits: one or more i7 sequences per index set.
//!
//! # Example
//!
//! ```no_run
//! use scprep::index_kit::{IndexKitCatalog, IndexLookup};
//!
//! let catalog = IndexKitCatalog::load(&["Dual_Index_Kit_TT_Set_A.csv".into()], &[], false)?;
//! if let Some(kit) = catalog.find_match(&["SI-TT-A1"]) {
//!     println!("{:?}", kit.extract("SI-TT-A1")?);
//! }
//! # Ok::<(), scprep::ScprepError>(())
//! ```

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScprepError};
use crate::input::Parser;

/// Name of the designator field keying the first row of a kit file.
pub const DESIGNATOR: &str = "index_name";

/// Number of sequences per index set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexType {
    Dual,
    Single,
}

/// Selection of sequence columns, as `start..end` with a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRange {
    pub start: usize,
    pub end: Option<usize>,
    pub step: usize,
}

impl ColumnRange {
    pub fn new(start: usize, end: Option<usize>, step: usize) -> Self {
        Self {
            start,
            end,
            step: step.max(1),
        }
    }

    /// i7 plus forward-strand i5 (columns 1, 2) or reverse-complement i5 (columns 1, 3).
    pub fn dual(reverse_complement: bool) -> Self {
        if reverse_complement {
            Self::new(1, Some(4), 2)
        } else {
            Self::new(1, Some(3), 1)
        }
    }

    /// Every column after the index name.
    pub fn single() -> Self {
        Self::new(1, None, 1)
    }

    /// Select fields from a row.
    pub fn select<'a>(&self, fields: &'a [String]) -> Vec<&'a str> {
        let end = self.end.unwrap_or(fields.len()).min(fields.len());
        if self.start >= end {
            return Vec::new();
        }
        fields[self.start..end]
            .iter()
            .step_by(self.step)
            .map(|s| s.as_str())
            .collect()
    }
}

/// Shared name lookup over index kits.
pub trait IndexLookup {
    /// Name of the file the kit was loaded from.
    fn source_file(&self) -> &str;

    /// Sequences for an index name, if present.
    fn sequences(&self, name: &str) -> Option<Vec<&str>>;

    fn contains(&self, name: &str) -> bool {
        self.sequences(name).is_some()
    }

    /// Check whether the kit contains all (`strict`) or any of `names`.
    fn matches(&self, names: &[&str], strict: bool) -> bool {
        if strict {
            names.iter().all(|n| self.contains(n))
        } else {
            names.iter().any(|n| self.contains(n))
        }
    }

    /// All sequences for an index name.
    fn extract(&self, name: &str) -> Result<Vec<&str>> {
        self.sequences(name)
            .ok_or_else(|| ScprepError::UnknownIndexName {
                name: name.to_string(),
                kit: self.source_file().to_string(),
            })
    }

    /// One sequence for an index name by position.
    fn extract_at(&self, name: &str, position: usize) -> Result<&str> {
        let sequences = self.extract(name)?;
        sequences.get(position).copied().ok_or_else(|| {
            ScprepError::Config(format!(
                "Index '{}' in kit '{}' has no sequence at position {}",
                name,
                self.source_file(),
                position
            ))
        })
    }
}

/// Dual index kit: exactly one (i7, i5) pair per index name.
#[derive(Debug, Clone, PartialEq)]
pub struct DualIndexKit {
    source_file: String,
    lookup: IndexMap<String, (String, String)>,
}

impl DualIndexKit {
    pub fn new(source_file: impl Into<String>, lookup: IndexMap<String, (String, String)>) -> Self {
        Self {
            source_file: source_file.into(),
            lookup,
        }
    }

    /// The (i7, i5) pair for an index name.
    pub fn pair(&self, name: &str) -> Result<(&str, &str)> {
        self.lookup
            .get(name)
            .map(|(i7, i5)| (i7.as_str(), i5.as_str()))
            .ok_or_else(|| ScprepError::UnknownIndexName {
                name: name.to_string(),
                kit: self.source_file.clone(),
            })
    }
}

impl IndexLookup for DualIndexKit {
    fn source_file(&self) -> &str {
        &self.source_file
    }

    fn sequences(&self, name: &str) -> Option<Vec<&str>> {
        self.lookup
            .get(name)
            .map(|(i7, i5)| vec![i7.as_str(), i5.as_str()])
    }
}

/// Single index kit: one or more i7 sequences per index name.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleIndexKit {
    source_file: String,
    replicates: usize,
    lookup: IndexMap<String, Vec<String>>,
}

impl SingleIndexKit {
    /// Create a kit; every entry must carry `replicates` sequences.
    pub fn new(
        source_file: impl Into<String>,
        replicates: usize,
        lookup: IndexMap<String, Vec<String>>,
    ) -> Self {
        Self {
            source_file: source_file.into(),
            replicates,
            lookup,
        }
    }

    /// Number of physical indices per index name.
    pub fn replicates(&self) -> usize {
        self.replicates
    }
}

impl IndexLookup for SingleIndexKit {
    fn source_file(&self) -> &str {
        &self.source_file
    }

    fn sequences(&self, name: &str) -> Option<Vec<&str>> {
        self.lookup
            .get(name)
            .map(|seqs| seqs.iter().map(|s| s.as_str()).collect())
    }
}

/// An index kit of either kind.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexKit {
    Dual(DualIndexKit),
    Single(SingleIndexKit),
}

impl IndexKit {
    /// Load a kit from a delimited reference file.
    pub fn load(path: impl AsRef<Path>, columns: ColumnRange, index_type: IndexType) -> Result<Self> {
        let path = path.as_ref();
        let invalid = |reason: String| ScprepError::InvalidIndexKit {
            path: path.to_path_buf(),
            reason,
        };

        let (table, _) = Parser::new().parse_file(path)?;
        if table.headers.first().map(|h| h.trim()) != Some(DESIGNATOR) {
            return Err(invalid(format!(
                "first row must be keyed by '{}'",
                DESIGNATOR
            )));
        }

        let width = columns.select(&table.headers).len();
        let expected = match index_type {
            IndexType::Dual if width != 2 => {
                return Err(invalid(format!(
                    "dual index kit needs 2 sequence columns, found {}",
                    width
                )));
            }
            IndexType::Single if width == 0 => {
                return Err(invalid("no sequence columns".to_string()));
            }
            _ => width,
        };

        let mut lookup: IndexMap<String, Vec<String>> = IndexMap::new();
        for row in &table.rows {
            let name = row[0].trim().to_string();
            let sequences: Vec<String> = columns
                .select(row)
                .into_iter()
                .map(|s| s.trim().to_string())
                .collect();

            if sequences.len() != expected || sequences.iter().any(|s| s.is_empty()) {
                return Err(invalid(format!(
                    "index '{}' has {} of {} sequences",
                    name,
                    sequences.iter().filter(|s| !s.is_empty()).count(),
                    expected
                )));
            }
            if lookup.insert(name.clone(), sequences).is_some() {
                return Err(invalid(format!("duplicate index name '{}'", name)));
            }
        }

        let source_file = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(match index_type {
            IndexType::Dual => IndexKit::Dual(DualIndexKit::new(
                source_file,
                lookup
                    .into_iter()
                    .map(|(name, mut seqs)| {
                        let i5 = seqs.pop().unwrap_or_default();
                        let i7 = seqs.pop().unwrap_or_default();
                        (name, (i7, i5))
                    })
                    .collect(),
            )),
            IndexType::Single => IndexKit::Single(SingleIndexKit::new(source_file, expected, lookup)),
        })
    }

    pub fn index_type(&self) -> IndexType {
        match self {
            IndexKit::Dual(_) => IndexType::Dual,
            IndexKit::Single(_) => IndexType::Single,
        }
    }

    fn lookup(&self) -> &dyn IndexLookup {
        match self {
            IndexKit::Dual(kit) => kit,
            IndexKit::Single(kit) => kit,
        }
    }
}

impl IndexLookup for IndexKit {
    fn source_file(&self) -> &str {
        self.lookup().source_file()
    }

    fn sequences(&self, name: &str) -> Option<Vec<&str>> {
        self.lookup().sequences(name)
    }
}

/// Ordered collection of index kits.
///
/// Kits are searched in insertion order, so the first kit that fully covers a
/// set of index names always wins.
#[derive(Debug, Clone, Default)]
pub struct IndexKitCatalog {
    kits: Vec<IndexKit>,
}

impl IndexKitCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load dual kits followed by single kits, each in the given order.
    pub fn load(dual: &[PathBuf], single: &[PathBuf], reverse_complement: bool) -> Result<Self> {
        let mut catalog = Self::new();
        for path in dual {
            catalog.push(IndexKit::load(
                path,
                ColumnRange::dual(reverse_complement),
                IndexType::Dual,
            )?);
        }
        for path in single {
            catalog.push(IndexKit::load(path, ColumnRange::single(), IndexType::Single)?);
        }
        Ok(catalog)
    }

    pub fn push(&mut self, kit: IndexKit) {
        self.kits.push(kit);
    }

    pub fn with_kit(mut self, kit: IndexKit) -> Self {
        self.push(kit);
        self
    }

    pub fn len(&self) -> usize {
        self.kits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexKit> {
        self.kits.iter()
    }

    /// First kit containing every name in `names`.
    pub fn find_match(&self, names: &[&str]) -> Option<&IndexKit> {
        self.kits.iter().find(|kit| kit.matches(names, true))
    }
}

/// Reverse complement a DNA sequence made of A, T, C and G.
pub fn reverse_complement(seq: &str) -> Result<String> {
    seq.chars()
        .rev()
        .map(|base| match base {
            'A' => Ok('T'),
            'T' => Ok('A'),
            'C' => Ok('G'),
            'G' => Ok('C'),
            other => Err(ScprepError::InvalidBase {
                sequence: seq.to_string(),
                base: other,
            }),
        })
        .collect()
}
