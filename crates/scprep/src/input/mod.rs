//! Input parsing for delimited metadata, hashing and index tables.

mod parser;
mod source;

pub use parser::{Parser, ParserConfig};
pub use source::{DataTable, SourceMetadata};
