//! Byte sources for the record parser.
//!
//! A [`DataSource`] owns the raw bytes of a file (memory-mapped) or of an
//! in-memory buffer and decodes them to characters in fixed-size chunks.
//! Progress is measured in input bytes so that multi-byte encodings still
//! report a fraction of the file on disk.

use crate::error::{ParseError, SourceError};
use chardetng::EncodingDetector;
use encoding_rs::{Decoder, DecoderResult, Encoding, UTF_8};
use memchr::memchr;
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Input bytes handed to the decoder per refill
const CHUNK_SIZE: usize = 64 * 1024;

/// Prefix inspected when guessing the encoding of an unlabelled file
const SNIFF_LEN: usize = 4096;

enum Bytes {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Bytes {
    fn as_slice(&self) -> &[u8] {
        match self {
            Bytes::Mapped(map) => map,
            Bytes::Owned(vec) => vec,
        }
    }
}

/// Decoded character stream over a file or buffer
pub struct DataSource {
    bytes: Bytes,
    encoding: &'static Encoding,
    decoder: Decoder,
    /// Decoded text of the current chunk
    buf: String,
    /// Byte position inside `buf`
    pos: usize,
    /// Input offset where the current chunk started
    chunk_start: usize,
    /// Input bytes consumed by the decoder for the current chunk
    chunk_len: usize,
    /// Input bytes handed to the decoder so far
    offset: usize,
    finished: bool,
    /// Decoding error held back until the text decoded before it is consumed
    pending_error: Option<ParseError>,
}

impl DataSource {
    /// Open a file, detecting its encoding.
    ///
    /// A byte-order mark always wins. Otherwise `encoding_label` (any WHATWG
    /// label such as `"utf-8"`, `"windows-1252"`, `"shift_jis"`) is used.
    /// Without a label the file is UTF-8 when its first 4 KiB are, and
    /// otherwise the encoding is guessed from that prefix.
    pub fn open(path: &Path, encoding_label: Option<&str>) -> Result<Self, SourceError> {
        let unavailable = |source| SourceError::Unavailable {
            path: path.to_path_buf(),
            source,
        };

        let hint = encoding_label.map(resolve_label).transpose()?;
        let file = File::open(path).map_err(unavailable)?;
        let len = file.metadata().map_err(unavailable)?.len();

        let bytes = if len == 0 {
            // Zero-length mappings are rejected on some platforms
            Bytes::Owned(Vec::new())
        } else {
            // SAFETY: the map is read-only; the file is the user's input and is
            // not modified by this process
            Bytes::Mapped(unsafe { Mmap::map(&file) }.map_err(unavailable)?)
        };

        Ok(Self::with_bytes(bytes, hint))
    }

    /// Build a source over an owned buffer
    pub fn from_bytes(bytes: Vec<u8>, encoding_label: Option<&str>) -> Result<Self, SourceError> {
        let hint = encoding_label.map(resolve_label).transpose()?;
        Ok(Self::with_bytes(Bytes::Owned(bytes), hint))
    }

    /// Build a UTF-8 source over text that is already decoded
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(Bytes::Owned(text.into().into_bytes()), UTF_8)
    }

    fn with_bytes(bytes: Bytes, hint: Option<&'static Encoding>) -> Self {
        let data = bytes.as_slice();
        let encoding = match (Encoding::for_bom(data), hint) {
            (Some((encoding, _)), _) => encoding,
            (None, Some(encoding)) => encoding,
            (None, None) if looks_like_utf8(data) => UTF_8,
            (None, None) => {
                let guessed = detect_encoding(data);
                debug!(encoding = guessed.name(), "guessed input encoding");
                guessed
            }
        };
        Self::new(bytes, encoding)
    }

    fn new(bytes: Bytes, encoding: &'static Encoding) -> Self {
        Self {
            bytes,
            encoding,
            decoder: encoding.new_decoder_with_bom_removal(),
            buf: String::new(),
            pos: 0,
            chunk_start: 0,
            chunk_len: 0,
            offset: 0,
            finished: false,
            pending_error: None,
        }
    }

    /// Encoding used to decode the input
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Total input length in bytes
    pub fn len(&self) -> usize {
        self.bytes.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fraction of input bytes consumed, in `[0, 1]`.
    ///
    /// Within a decoded chunk the value is interpolated by decoded position,
    /// which is exact for UTF-8. It only reaches 1.0 once the final character
    /// has been consumed.
    pub fn progress(&self) -> f64 {
        let total = self.len();
        if total == 0 {
            return 1.0;
        }
        let within = if self.buf.is_empty() {
            self.chunk_len as f64
        } else {
            self.chunk_len as f64 * self.pos as f64 / self.buf.len() as f64
        };
        ((self.chunk_start as f64 + within) / total as f64).min(1.0)
    }

    /// Look at the next character without consuming it
    pub fn peek(&mut self) -> Result<Option<char>, ParseError> {
        if self.pos >= self.buf.len() && !self.refill()? {
            return Ok(None);
        }
        Ok(self.buf[self.pos..].chars().next())
    }

    /// Consume and return the next character
    pub fn next_char(&mut self) -> Result<Option<char>, ParseError> {
        let ch = self.peek()?;
        if let Some(c) = ch {
            self.pos += c.len_utf8();
        }
        Ok(ch)
    }

    /// Append everything up to (not including) the next `delim` byte to `out`.
    ///
    /// Stops positioned on `delim`, or at end of input. `delim` must be ASCII
    /// so that it always falls on a character boundary.
    pub fn take_until(&mut self, delim: u8, out: &mut String) -> Result<(), ParseError> {
        debug_assert!(delim.is_ascii());
        loop {
            if self.pos >= self.buf.len() && !self.refill()? {
                return Ok(());
            }
            let rest = &self.buf[self.pos..];
            match memchr(delim, rest.as_bytes()) {
                Some(idx) => {
                    out.push_str(&rest[..idx]);
                    self.pos += idx;
                    return Ok(());
                }
                None => {
                    out.push_str(rest);
                    self.pos = self.buf.len();
                }
            }
        }
    }

    /// Decode the next chunk into `buf`. Returns false at end of input.
    fn refill(&mut self) -> Result<bool, ParseError> {
        let total = self.len();
        loop {
            if let Some(err) = self.pending_error.take() {
                self.finished = true;
                return Err(err);
            }
            if self.finished {
                return Ok(false);
            }

            let end = (self.offset + CHUNK_SIZE).min(total);
            let last = end == total;
            let input = &self.bytes.as_slice()[self.offset..end];

            self.buf.clear();
            let needed = self
                .decoder
                .max_utf8_buffer_length_without_replacement(input.len())
                .unwrap_or(input.len() * 3 + 16);
            self.buf.reserve(needed);

            let (result, read) =
                self.decoder
                    .decode_to_string_without_replacement(input, &mut self.buf, last);

            self.chunk_start = self.offset;
            self.chunk_len = read;
            self.offset += read;
            self.pos = 0;

            if let DecoderResult::Malformed(bad, after) = result {
                self.pending_error = Some(ParseError::Encoding {
                    encoding: self.encoding.name(),
                    offset: self.offset.saturating_sub(bad as usize + after as usize),
                });
            }

            if last && self.offset >= total && matches!(result, DecoderResult::InputEmpty) {
                self.finished = true;
            }

            if !self.buf.is_empty() {
                return Ok(true);
            }
        }
    }
}

fn resolve_label(label: &str) -> Result<&'static Encoding, SourceError> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| SourceError::UnknownLabel(label.to_string()))
}

/// Statistical guess over the sniffed prefix of non-UTF-8 input
fn detect_encoding(data: &[u8]) -> &'static Encoding {
    let prefix = &data[..data.len().min(SNIFF_LEN)];
    let mut detector = EncodingDetector::new();
    detector.feed(prefix, prefix.len() == data.len());
    detector.guess(None, false)
}

/// True when the sniffed prefix is UTF-8, allowing a sequence cut at the boundary
fn looks_like_utf8(data: &[u8]) -> bool {
    let prefix = &data[..data.len().min(SNIFF_LEN)];
    match std::str::from_utf8(prefix) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none() && prefix.len() == SNIFF_LEN,
    }
}
