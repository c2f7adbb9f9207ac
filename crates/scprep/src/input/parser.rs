//! CSV/TSV parser with delimiter detection.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::source::{DataTable, SourceMetadata};
use crate::error::{Result, ScprepError};

/// Delimiters to try when auto-detecting.
const DELIMITERS: &[u8] = &[b'\t', b',', b';', b'|'];

/// Parser configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Delimiter to use (None = auto-detect).
    pub delimiter: Option<char>,
    /// Whether the file has a header row.
    pub has_header: bool,
    /// Quote character.
    pub quote: char,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            has_header: true,
            quote: '"',
        }
    }
}

/// Parses delimited tables.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    /// Create a new parser with default configuration.
    pub fn new() -> Self {
        Self {
            config: ParserConfig::default(),
        }
    }

    /// Create a parser with custom configuration.
    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Parse a file and return the data table and metadata.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<(DataTable, SourceMetadata)> {
        let path = path.as_ref();

        let mut file = File::open(path).map_err(|e| ScprepError::io(path, e))?;
        let mut contents = Vec::new();
        file.read_to_end(&mut contents)
            .map_err(|e| ScprepError::io(path, e))?;

        let mut hasher = Sha256::new();
        hasher.update(&contents);
        let hash = format!("sha256:{:x}", hasher.finalize());

        let delimiter = self.resolve_delimiter(&contents)?;
        let table = self.read_records(&contents, delimiter)?;

        let format = match delimiter {
            b'\t' => "tsv",
            b',' => "csv",
            b';' => "csv-semicolon",
            b'|' => "psv",
            _ => "delimited",
        }
        .to_string();

        let source = SourceMetadata::new(
            path.to_path_buf(),
            hash,
            contents.len() as u64,
            format,
            table.row_count(),
            table.column_count(),
        );

        Ok((table, source))
    }

    /// Parse in-memory bytes, detecting the delimiter if none is configured.
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<DataTable> {
        let delimiter = self.resolve_delimiter(bytes)?;
        self.read_records(bytes, delimiter)
    }

    fn resolve_delimiter(&self, bytes: &[u8]) -> Result<u8> {
        match self.config.delimiter {
            Some(d) if d.is_ascii() => Ok(d as u8),
            Some(d) => Err(ScprepError::InvalidDelimiter(format!(
                "'{}' is not an ASCII character",
                d
            ))),
            None => detect_delimiter(bytes),
        }
    }

    fn read_records(&self, bytes: &[u8], delimiter: u8) -> Result<DataTable> {
        if !self.config.quote.is_ascii() {
            return Err(ScprepError::Config(format!(
                "Quote character '{}' is not ASCII",
                self.config.quote
            )));
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(self.config.has_header)
            .quote(self.config.quote as u8)
            .flexible(true)
            .from_reader(bytes);

        let mut records = Vec::new();
        for result in reader.records() {
            let record = result?;
            records.push(record.iter().map(|s| s.to_string()).collect::<Vec<_>>());
        }

        let headers: Vec<String> = if self.config.has_header {
            reader.headers()?.iter().map(|s| s.to_string()).collect()
        } else {
            let width = records.first().map(|r| r.len()).unwrap_or(0);
            (0..width).map(|i| format!("column_{}", i + 1)).collect()
        };

        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(ScprepError::EmptyData("No columns found".to_string()));
        }

        let expected_cols = headers.len();
        let rows: Vec<Vec<String>> = records
            .into_iter()
            .filter(|row| !row.iter().all(|cell| cell.trim().is_empty()))
            .map(|mut row| {
                // Pad or truncate ragged rows to the header width
                row.resize(expected_cols, String::new());
                row
            })
            .collect();

        if rows.is_empty() {
            return Err(ScprepError::EmptyData("No data rows found".to_string()));
        }

        Ok(DataTable::new(headers, rows, delimiter))
    }
}

/// Detect the delimiter by analyzing the first few lines.
fn detect_delimiter(bytes: &[u8]) -> Result<u8> {
    let reader = BufReader::new(bytes);
    let lines: Vec<String> = reader
        .lines()
        .take(10)
        .filter_map(|l| l.ok())
        .filter(|l| !l.trim().is_empty())
        .collect();

    if lines.is_empty() {
        return Err(ScprepError::EmptyData("No lines to analyze".to_string()));
    }

    let mut best_delimiter = b',';
    let mut best_score = 0;

    for &delim in DELIMITERS {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| count_delimiter_in_line(line, delim))
            .collect();

        let first_count = counts[0];
        if first_count == 0 {
            continue;
        }

        let consistent = counts.iter().all(|&c| c == first_count);
        let variance: f64 = if counts.len() > 1 {
            let mean = counts.iter().sum::<usize>() as f64 / counts.len() as f64;
            counts
                .iter()
                .map(|&c| (c as f64 - mean).powi(2))
                .sum::<f64>()
                / counts.len() as f64
        } else {
            0.0
        };

        // Higher count with lower variance wins; tab breaks ties
        let score = if consistent {
            first_count * 1000 + (if delim == b'\t' { 100 } else { 0 })
        } else if variance < 1.0 {
            first_count * 100
        } else {
            first_count
        };

        if score > best_score {
            best_score = score;
            best_delimiter = delim;
        }
    }

    Ok(best_delimiter)
}

/// Count delimiter occurrences in a line, respecting quotes.
fn count_delimiter_in_line(line: &str, delimiter: u8) -> usize {
    let delim_char = delimiter as char;
    let mut count = 0;
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c == delim_char && !in_quotes => count += 1,
            _ => {}
        }
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_delimiter_csv() {
        let data = b"run,lib_type,sample_id\nR_A,GEX,S1\nR_B,ADT,S2";
        assert_eq!(detect_delimiter(data).unwrap(), b',');
    }

    #[test]
    fn test_detect_delimiter_tsv() {
        let data = b"run\tlib_type\tsample_id\nR_A\tGEX\tS1\nR_B\tADT\tS2";
        assert_eq!(detect_delimiter(data).unwrap(), b'\t');
    }

    #[test]
    fn test_detect_delimiter_ignores_quoted() {
        let data = b"name;note\nA;\"x,y,z\"\nB;\"p,q,r\"";
        assert_eq!(detect_delimiter(data).unwrap(), b';');
    }

    #[test]
    fn test_parse_csv() {
        let parser = Parser::new();
        let data = b"run,lib_type,lane\n220101_A_AB12C3,GEX,*\n220102_A_XY98Z7,ADT,1 2";
        let table = parser.parse_bytes(data).unwrap();

        assert_eq!(table.headers, vec!["run", "lib_type", "lane"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.get(0, 2), Some("*"));
        assert_eq!(table.get(1, 2), Some("1 2"));
    }

    #[test]
    fn test_parse_pads_ragged_rows() {
        let parser = Parser::new();
        let data = b"a,b,c\n1,2\n4,5,6,7";
        let table = parser.parse_bytes(data).unwrap();

        assert_eq!(table.rows[0], vec!["1", "2", ""]);
        assert_eq!(table.rows[1], vec!["4", "5", "6"]);
    }

    #[test]
    fn test_parse_skips_blank_rows() {
        let parser = Parser::new();
        let data = b"a,b\n1,2\n,\n3,4\n";
        let table = parser.parse_bytes(data).unwrap();
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_parse_header_only_is_empty() {
        let parser = Parser::new();
        let err = parser.parse_bytes(b"a,b,c\n").unwrap_err();
        assert!(matches!(err, ScprepError::EmptyData(_)));
    }

    #[test]
    fn test_explicit_delimiter() {
        let parser = Parser::with_config(ParserConfig {
            delimiter: Some('|'),
            ..ParserConfig::default()
        });
        let table = parser.parse_bytes(b"a|b\n1|2").unwrap();
        assert_eq!(table.delimiter, b'|');
        assert_eq!(table.get(0, 1), Some("2"));
    }

    #[test]
    fn test_non_ascii_delimiter_rejected() {
        let parser = Parser::with_config(ParserConfig {
            delimiter: Some('§'),
            ..ParserConfig::default()
        });
        assert!(matches!(
            parser.parse_bytes(b"a,b\n1,2"),
            Err(ScprepError::InvalidDelimiter(_))
        ));
    }
}
