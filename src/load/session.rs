//! One open file: its load, its search index and its match cursor.
//!
//! A [`Document`] is what a viewer holds per window. The viewer calls
//! [`Document::pump`] from its event loop; once the load completes the
//! document starts indexing in the background and keeps pumping index
//! events through the same observer.

use crate::config::ViewerConfig;
use crate::error::{IndexError, LoadError};
use crate::index::{
    CompactStats, Coordinate, IndexBuilder, IndexConfig, IndexEvent, SearchIndex, SharedIndex,
    read_index,
};
use crate::load::{LoadCoordinator, LoadObserver, LoadState};
use crate::navigator::MatchNavigator;
use crate::parser::{DataSource, Delimiter, ParseStats, ParserOptions};
use crate::table::Table;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::mpsc::TryRecvError;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// Receives load and index events for a document
pub trait DocumentObserver: LoadObserver {
    fn on_index_progress(&mut self, _rows_indexed: usize, _total_rows: usize) {}

    fn on_index_ready(&mut self, _stats: &CompactStats) {}

    fn on_index_degraded(&mut self, _error: &IndexError) {}
}

impl DocumentObserver for () {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    /// Waiting for the load to complete
    Pending,
    Building {
        rows_indexed: usize,
        total_rows: usize,
    },
    Ready(CompactStats),
    /// Building failed; search is unavailable
    Degraded,
    /// Stopped by `close` or by a cancelled or failed load
    Stopped,
}

struct CachedResult {
    generation: u64,
    hits: Vec<Coordinate>,
}

pub struct Document {
    path: Option<PathBuf>,
    loader: LoadCoordinator,
    index: SharedIndex,
    index_config: IndexConfig,
    builder: Option<IndexBuilder>,
    status: IndexStatus,
    navigator: MatchNavigator,
    cache: Option<LruCache<String, CachedResult>>,
}

impl Document {
    /// Open `path` and start loading it.
    ///
    /// `delimiter_hint` is a document-type name such as `"tsv"` or `"csv"`;
    /// see [`Delimiter::from_hint`].
    pub fn open(path: &Path, delimiter_hint: &str, config: &ViewerConfig) -> Result<Self, LoadError> {
        let options = config.parser_options(Delimiter::from_hint(delimiter_hint));
        let mut doc = Self::empty(config);
        doc.loader.start_load(path, options)?;
        doc.path = Some(path.to_path_buf());
        Ok(doc)
    }

    /// Start loading from an already opened source
    pub fn from_source(
        source: DataSource,
        options: ParserOptions,
        config: &ViewerConfig,
    ) -> Result<Self, LoadError> {
        let mut doc = Self::empty(config);
        doc.loader.start_load_from(source, options)?;
        Ok(doc)
    }

    fn empty(config: &ViewerConfig) -> Self {
        Self {
            path: None,
            loader: LoadCoordinator::new(),
            index: Arc::new(RwLock::new(SearchIndex::new())),
            index_config: config.index_config(),
            builder: None,
            status: IndexStatus::Pending,
            navigator: MatchNavigator::new(),
            cache: NonZeroUsize::new(config.query_cache).map(LruCache::new),
        }
    }

    /// Deliver queued events without blocking. Starts indexing once the
    /// load has completed.
    pub fn pump<O: DocumentObserver + ?Sized>(&mut self, observer: &mut O) -> IndexStatus {
        let state = self.loader.pump(observer);
        self.after_load(state);

        loop {
            let event = match &self.builder {
                Some(builder) => builder.try_recv(),
                None => break,
            };
            match event {
                Ok(event) => self.apply_index_event(event, observer),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.builder_vanished(observer);
                    break;
                }
            }
        }
        self.status
    }

    /// Block until the load has finished and, if it completed, until the
    /// index is ready or degraded
    pub fn wait_until_indexed<O: DocumentObserver + ?Sized>(
        &mut self,
        observer: &mut O,
    ) -> IndexStatus {
        let state = self.loader.wait(observer);
        self.after_load(state);

        while matches!(self.status, IndexStatus::Building { .. }) {
            let event = match &self.builder {
                Some(builder) => builder.recv(),
                None => break,
            };
            match event {
                Ok(event) => self.apply_index_event(event, observer),
                Err(_) => self.builder_vanished(observer),
            }
        }
        self.status
    }

    /// Search the flushed cells. Results are sorted by row, then column,
    /// and become the navigator's match list.
    pub fn query(&mut self, text: &str) -> Result<Vec<Coordinate>, IndexError> {
        if self.status == IndexStatus::Degraded {
            return Err(IndexError::Unavailable);
        }

        let index = read_index(&self.index);
        let generation = index.generation();

        let cached = self
            .cache
            .as_mut()
            .and_then(|cache| cache.get(text))
            .filter(|entry| entry.generation == generation)
            .map(|entry| entry.hits.clone());

        let hits = match cached {
            Some(hits) => hits,
            None => {
                let mut hits = index.search(text);
                hits.sort_unstable();
                if let Some(cache) = self.cache.as_mut() {
                    cache.put(
                        text.to_string(),
                        CachedResult {
                            generation,
                            hits: hits.clone(),
                        },
                    );
                }
                hits
            }
        };
        drop(index);

        debug!(query = text, hits = hits.len(), "query");
        self.navigator.set_results(hits.clone());
        Ok(hits)
    }

    /// Move to the next (or previous) match, wrapping around
    pub fn advance_match(&mut self, forward: bool) -> Option<Coordinate> {
        if forward {
            self.navigator.next()
        } else {
            self.navigator.previous()
        }
    }

    pub fn navigator(&self) -> &MatchNavigator {
        &self.navigator
    }

    /// Cancel loading and indexing. Blocks until both workers have exited.
    pub fn close(&mut self) {
        self.loader.cancel();
        if let Some(mut builder) = self.builder.take() {
            builder.cancel();
        }
        if matches!(self.status, IndexStatus::Pending | IndexStatus::Building { .. }) {
            self.status = IndexStatus::Stopped;
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn load_state(&self) -> LoadState {
        self.loader.state()
    }

    pub fn index_status(&self) -> IndexStatus {
        self.status
    }

    /// Rows appended so far; safe to read while loading
    pub fn rows_loaded(&self) -> usize {
        self.loader.rows_loaded()
    }

    /// The table, once loading has stopped
    pub fn table(&self) -> Option<Arc<Table>> {
        self.loader.table()
    }

    pub fn parse_stats(&self) -> ParseStats {
        self.loader.stats()
    }

    fn after_load(&mut self, state: LoadState) {
        if self.status != IndexStatus::Pending {
            return;
        }
        match state {
            LoadState::Completed => self.start_indexing(),
            LoadState::Cancelled | LoadState::Failed => self.status = IndexStatus::Stopped,
            LoadState::Idle | LoadState::Loading => {}
        }
    }

    fn start_indexing(&mut self) {
        let Some(table) = self.loader.table() else {
            return;
        };
        let total_rows = table.row_count();
        self.builder = Some(IndexBuilder::spawn(
            table,
            Arc::clone(&self.index),
            self.index_config.clone(),
        ));
        self.status = IndexStatus::Building {
            rows_indexed: 0,
            total_rows,
        };
    }

    fn apply_index_event<O: DocumentObserver + ?Sized>(&mut self, event: IndexEvent, observer: &mut O) {
        match event {
            IndexEvent::Progress {
                rows_indexed,
                total_rows,
            } => {
                self.status = IndexStatus::Building {
                    rows_indexed,
                    total_rows,
                };
                observer.on_index_progress(rows_indexed, total_rows);
            }
            IndexEvent::Ready(stats) => {
                self.status = IndexStatus::Ready(stats);
                self.builder = None;
                observer.on_index_ready(&stats);
            }
            IndexEvent::Degraded(err) => {
                self.status = IndexStatus::Degraded;
                self.builder = None;
                observer.on_index_degraded(&err);
            }
        }
    }

    fn builder_vanished<O: DocumentObserver + ?Sized>(&mut self, observer: &mut O) {
        self.builder = None;
        if matches!(self.status, IndexStatus::Building { .. }) {
            warn!("index builder exited without a result");
            self.status = IndexStatus::Degraded;
            observer.on_index_degraded(&IndexError::Unavailable);
        }
    }
}

impl Drop for Document {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ViewerConfig {
        ViewerConfig {
            flush_rows: 2,
            ..ViewerConfig::default()
        }
    }

    fn indexed(text: &str) -> Document {
        let mut doc =
            Document::from_source(DataSource::from_text(text), ParserOptions::default(), &config())
                .unwrap();
        doc.wait_until_indexed(&mut ());
        doc
    }

    #[test]
    fn test_query_sorted_and_navigable() {
        let mut doc = indexed("apple,banana\ncherry,apple pie\n");
        assert!(matches!(doc.index_status(), IndexStatus::Ready(_)));

        let hits = doc.query("apple").unwrap();
        assert_eq!(hits, vec![Coordinate::new(0, 0), Coordinate::new(1, 1)]);
        assert_eq!(doc.navigator().current(), Some(Coordinate::new(0, 0)));
        assert_eq!(doc.advance_match(true), Some(Coordinate::new(1, 1)));
        assert_eq!(doc.advance_match(true), Some(Coordinate::new(0, 0)));
        assert_eq!(doc.advance_match(false), Some(Coordinate::new(1, 1)));
    }

    #[test]
    fn test_cached_query_matches_fresh() {
        let mut doc = indexed("a,b\nab,ba\n");
        let first = doc.query("ab").unwrap();
        let second = doc.query("ab").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_query_before_indexing_is_empty() {
        let mut doc =
            Document::from_source(DataSource::from_text("apple\n"), ParserOptions::default(), &config())
                .unwrap();
        assert!(doc.query("apple").unwrap().is_empty());
        doc.wait_until_indexed(&mut ());
        assert_eq!(doc.query("apple").unwrap(), vec![Coordinate::new(0, 0)]);
    }

    #[test]
    fn test_close_stops_everything() {
        let text = "alpha,beta,gamma\n".repeat(200_000);
        let mut doc =
            Document::from_source(DataSource::from_text(text), ParserOptions::default(), &config())
                .unwrap();
        doc.close();
        assert_eq!(doc.load_state(), LoadState::Cancelled);
        assert_eq!(doc.index_status(), IndexStatus::Stopped);
        assert_eq!(doc.pump(&mut ()), IndexStatus::Stopped);
    }

    #[test]
    fn test_degraded_search_is_unavailable() {
        let mut doc = indexed("x\n");
        doc.status = IndexStatus::Degraded;
        assert!(matches!(doc.query("x"), Err(IndexError::Unavailable)));
    }

    #[test]
    fn test_cache_disabled() {
        let config = ViewerConfig {
            query_cache: 0,
            ..ViewerConfig::default()
        };
        let mut doc =
            Document::from_source(DataSource::from_text("k\n"), ParserOptions::default(), &config)
                .unwrap();
        doc.wait_until_indexed(&mut ());
        assert_eq!(doc.query("k").unwrap(), vec![Coordinate::new(0, 0)]);
    }
}
