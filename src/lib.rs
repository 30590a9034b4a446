//! # tabula - viewer core for large delimited-text files
//!
//! tabula loads comma- and tab-separated files on a background thread,
//! reports progress as the bytes are consumed, and then builds an in-memory
//! full-text index over every cell so a viewer can search and step through
//! matches.
//!
//! ## Architecture
//!
//! - [`parser`] - streaming record parser with encoding detection
//! - [`table`] - append-only store of parsed records
//! - [`load`] - background loading, cancellation and the [`Document`] boundary
//! - [`index`] - trigram search index and its background builder
//! - [`query`] - free-text query syntax and evaluation
//! - [`navigator`] - next/previous cursor over sorted matches
//! - [`config`] - on-disk and environment configuration
//!
//! ## Quick Start
//!
//! ```no_run
//! use tabula::{Document, ViewerConfig};
//! use std::path::Path;
//!
//! let config = ViewerConfig::default();
//! let mut doc = Document::open(Path::new("people.tsv"), "tsv", &config).unwrap();
//!
//! // A viewer would call `pump` from its event loop instead
//! doc.wait_until_indexed(&mut ());
//!
//! for hit in doc.query("smith").unwrap() {
//!     println!("row {} column {}", hit.row, hit.column);
//! }
//! doc.advance_match(true);
//! ```

pub mod config;
pub mod error;
pub mod index;
pub mod load;
pub mod logging;
pub mod navigator;
pub mod output;
pub mod parser;
pub mod query;
pub mod table;
pub mod utils;

pub use config::ViewerConfig;
pub use error::{IndexError, LoadError, ParseError, SourceError, TableError};
pub use index::{Coordinate, SearchIndex};
pub use load::{
    CancelToken, Document, DocumentObserver, IndexStatus, LoadCoordinator, LoadEvent,
    LoadObserver, LoadState,
};
pub use navigator::MatchNavigator;
pub use parser::{DataSource, Delimiter, ParserOptions, Record, RecordReader};
pub use table::Table;
