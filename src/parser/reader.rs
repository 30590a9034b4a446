//! Record parser for single-character-delimited text.
//!
//! Grammar (RFC 4180 with the usual real-world relaxations):
//!
//! ```text
//! file    = record *(EOL record) [EOL]
//! record  = field *(SEP field)
//! field   = quoted / plain
//! quoted  = DQUOTE *(TEXT / SEP / EOL / 2DQUOTE) DQUOTE
//! EOL     = LF / CRLF / CR
//! ```
//!
//! Malformed quoting never aborts a parse. The affected field is closed with
//! whatever was accumulated and [`ParseStats::malformed`] is incremented.

use crate::error::ParseError;
use crate::parser::record::Record;
use crate::parser::source::DataSource;
use crate::parser::ParserOptions;
use serde::Serialize;

/// How a field was terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldEnd {
    Separator,
    EndOfLine,
    EndOfFile,
}

/// Result of a predicate-driven parse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Every record in the source was offered to the predicate
    Complete,
    /// The predicate returned false
    Stopped,
}

/// Counters collected while parsing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ParseStats {
    /// Records emitted
    pub records: usize,
    /// Fields closed by best-effort recovery from bad quoting
    pub malformed: usize,
    /// Blank and comment lines that were skipped
    pub skipped: usize,
}

/// Lazy, non-restartable reader of records.
///
/// Iterating yields `Ok(record)` until the source is exhausted. An encoding
/// failure yields one `Err` and then ends the iteration.
pub struct RecordReader {
    source: DataSource,
    options: ParserOptions,
    /// Reused buffer for the field being assembled
    field: String,
    stats: ParseStats,
    failed: bool,
}

impl RecordReader {
    pub fn new(source: DataSource, options: ParserOptions) -> Self {
        Self {
            source,
            options,
            field: String::with_capacity(256),
            stats: ParseStats::default(),
            failed: false,
        }
    }

    /// Fraction of the source consumed so far
    pub fn progress(&self) -> f64 {
        self.source.progress()
    }

    pub fn stats(&self) -> ParseStats {
        self.stats
    }

    pub fn source(&self) -> &DataSource {
        &self.source
    }

    /// Offer every record, with the progress after it, to `keep_going`.
    ///
    /// Parsing stops without error as soon as the predicate returns false;
    /// no further records are produced in that case.
    pub fn parse_with<F>(&mut self, mut keep_going: F) -> Result<ParseOutcome, ParseError>
    where
        F: FnMut(Record, f64) -> bool,
    {
        while let Some(record) = self.read_record()? {
            let progress = self.progress();
            if !keep_going(record, progress) {
                return Ok(ParseOutcome::Stopped);
            }
        }
        Ok(ParseOutcome::Complete)
    }

    /// Read the next non-skipped record, or `None` at end of input
    pub fn read_record(&mut self) -> Result<Option<Record>, ParseError> {
        loop {
            if self.source.peek()?.is_none() {
                return Ok(None);
            }

            if let Some(comment) = self.options.comment {
                if self.source.peek()? == Some(comment) {
                    self.skip_line()?;
                    self.stats.skipped += 1;
                    continue;
                }
            }

            let mut fields = Vec::new();
            loop {
                let end = self.read_field()?;
                fields.push(std::mem::take(&mut self.field));
                if end != FieldEnd::Separator {
                    break;
                }
            }

            let record = Record::new(fields);
            if self.options.skip_blank_lines && record.is_blank() {
                self.stats.skipped += 1;
                continue;
            }

            self.stats.records += 1;
            return Ok(Some(record));
        }
    }

    fn read_field(&mut self) -> Result<FieldEnd, ParseError> {
        self.field.clear();

        if self.options.trims_whitespace() {
            while self.source.peek()? == Some(' ') {
                self.source.next_char()?;
            }
        }

        if self.source.peek()? == Some(self.options.quote) {
            self.source.next_char()?;
            self.read_quoted()
        } else {
            self.read_plain()
        }
    }

    fn read_plain(&mut self) -> Result<FieldEnd, ParseError> {
        let separator = self.options.delimiter.as_char();
        let quote = self.options.quote;

        loop {
            let Some(ch) = self.source.next_char()? else {
                return Ok(FieldEnd::EndOfFile);
            };

            if ch == separator {
                return Ok(FieldEnd::Separator);
            }
            if let Some(end) = self.end_of_line(ch)? {
                return Ok(end);
            }
            if ch == quote {
                // "" inside a plain field is one quote; a lone quote is kept as-is
                if self.source.peek()? == Some(quote) {
                    self.source.next_char()?;
                } else {
                    self.malformed("stray quote in unquoted field");
                }
            }
            self.field.push(ch);
        }
    }

    fn read_quoted(&mut self) -> Result<FieldEnd, ParseError> {
        let quote = self.options.quote;

        loop {
            if quote.is_ascii() {
                self.source.take_until(quote as u8, &mut self.field)?;
            }

            let Some(ch) = self.source.next_char()? else {
                self.malformed("unterminated quoted field");
                return Ok(FieldEnd::EndOfFile);
            };

            if ch != quote {
                self.field.push(ch);
                continue;
            }

            if self.source.peek()? == Some(quote) {
                self.source.next_char()?;
                self.field.push(quote);
                continue;
            }

            return self.skip_after_quote();
        }
    }

    /// Discard anything between a closing quote and the next separator or EOL
    fn skip_after_quote(&mut self) -> Result<FieldEnd, ParseError> {
        let separator = self.options.delimiter.as_char();
        let mut dropped = false;

        loop {
            let Some(ch) = self.source.next_char()? else {
                return Ok(FieldEnd::EndOfFile);
            };
            if ch == separator {
                return Ok(FieldEnd::Separator);
            }
            if let Some(end) = self.end_of_line(ch)? {
                return Ok(end);
            }
            if !dropped && ch != ' ' {
                dropped = true;
                self.malformed("text after closing quote");
            }
        }
    }

    /// Classify `ch` as a line ending, folding CRLF into one
    fn end_of_line(&mut self, ch: char) -> Result<Option<FieldEnd>, ParseError> {
        match ch {
            '\n' => Ok(Some(FieldEnd::EndOfLine)),
            '\r' => {
                if self.source.peek()? == Some('\n') {
                    self.source.next_char()?;
                }
                Ok(Some(FieldEnd::EndOfLine))
            }
            _ => Ok(None),
        }
    }

    fn skip_line(&mut self) -> Result<(), ParseError> {
        while let Some(ch) = self.source.next_char()? {
            if self.end_of_line(ch)?.is_some() {
                break;
            }
        }
        Ok(())
    }

    fn malformed(&mut self, what: &'static str) {
        self.stats.malformed += 1;
        tracing::debug!(row = self.stats.records, what, "recovered malformed record");
    }
}

impl Iterator for RecordReader {
    type Item = Result<Record, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.read_record() {
            Ok(record) => record.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
