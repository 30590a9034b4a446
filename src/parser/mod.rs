//! Streaming parser for comma- and tab-separated text.
//!
//! - [`source`] - byte sources, encoding detection and progress
//! - [`reader`] - the record state machine
//! - [`record`] - the parsed row type

pub mod reader;
pub mod record;
pub mod source;

pub use reader::{ParseOutcome, ParseStats, RecordReader};
pub use record::Record;
pub use source::DataSource;

use serde::{Deserialize, Serialize};

/// Field separator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Delimiter {
    #[default]
    Comma,
    Tab,
    Other(char),
}

impl Delimiter {
    /// Map a document-type hint to a delimiter. Unrecognised hints mean comma.
    pub fn from_hint(hint: &str) -> Self {
        if hint == "\t" {
            return Delimiter::Tab;
        }
        match hint.trim().to_ascii_lowercase().as_str() {
            "tab" | "tsv" | "\\t" => Delimiter::Tab,
            _ => Delimiter::Comma,
        }
    }

    /// Pick a delimiter from a file extension (`.tsv`/`.tab` mean tab)
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "tsv" | "tab" => Delimiter::Tab,
            _ => Delimiter::Comma,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Delimiter::Comma => ',',
            Delimiter::Tab => '\t',
            Delimiter::Other(c) => *c,
        }
    }
}

impl From<char> for Delimiter {
    fn from(c: char) -> Self {
        match c {
            ',' => Delimiter::Comma,
            '\t' => Delimiter::Tab,
            other => Delimiter::Other(other),
        }
    }
}

/// Options controlling how records are split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserOptions {
    pub delimiter: Delimiter,
    pub quote: char,
    /// Lines starting with this character are skipped
    pub comment: Option<char>,
    /// Skip spaces at the start of each field
    pub trim_leading_whitespace: bool,
    /// Drop records whose fields are all empty
    pub skip_blank_lines: bool,
    /// WHATWG encoding label used when the file has no byte-order mark
    pub encoding: Option<String>,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            delimiter: Delimiter::Comma,
            quote: '"',
            comment: None,
            trim_leading_whitespace: true,
            skip_blank_lines: true,
            encoding: None,
        }
    }
}

impl ParserOptions {
    pub fn new(delimiter: Delimiter) -> Self {
        Self {
            delimiter,
            ..Default::default()
        }
    }

    /// Trimming is disabled when the separator itself is a space
    pub(crate) fn trims_whitespace(&self) -> bool {
        self.trim_leading_whitespace && self.delimiter.as_char() != ' '
    }
}
