//! Error taxonomy for loading, parsing, storing and indexing tables.
//!
//! Malformed quoting is not an error: the parser recovers from it and only
//! counts it (see [`crate::parser::ParseStats`]).

use std::collections::TryReserveError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The source could not be opened or its encoding label is unknown.
/// Raised synchronously, before any background work starts.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("cannot open '{}': {source}", path.display())]
    Unavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unknown encoding label '{0}'")]
    UnknownLabel(String),
}

/// Unrecoverable failure in the middle of a parse.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed {encoding} input near byte {offset}")]
    Encoding {
        encoding: &'static str,
        offset: usize,
    },
}

/// Errors raised by the table store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("row {index} out of range (table has {len} rows)")]
    OutOfRange { index: usize, len: usize },
}

/// Errors surfaced by the load coordinator.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("a load is already in progress")]
    AlreadyLoading,

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("load worker panicked")]
    WorkerPanicked,
}

/// Errors raised while building or querying the search index.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("cell ({row}, {column}) does not fit a packed coordinate")]
    CoordinateOverflow { row: usize, column: usize },

    #[error("out of memory while compacting index: {0}")]
    ResourceExhausted(#[from] TryReserveError),

    #[error("index build failed; search unavailable")]
    Unavailable,
}
