//! In-memory full-text index over table cells.
//!
//! Adds land in a pending segment that `search` cannot see. `flush` seals
//! the pending segment onto the list of searchable segments, and `compact`
//! merges every sealed segment into one, keeping only the newest text for
//! each cell.

use crate::error::IndexError;
use crate::index::segment::Segment;
use crate::index::types::{CellKey, CompactStats, Coordinate};
use crate::query::{QueryExecutor, parse_query};
use crate::utils::trigrams_into;
use ahash::AHashMap;
use rayon::prelude::*;
use roaring::RoaringTreemap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Index shared between a document and its background builder
pub type SharedIndex = Arc<RwLock<SearchIndex>>;

/// Take the read lock, recovering the guard if a writer panicked
pub fn read_index(index: &RwLock<SearchIndex>) -> RwLockReadGuard<'_, SearchIndex> {
    index.read().unwrap_or_else(PoisonError::into_inner)
}

/// Take the write lock, recovering the guard if a writer panicked
pub fn write_index(index: &RwLock<SearchIndex>) -> RwLockWriteGuard<'_, SearchIndex> {
    index.write().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
pub struct SearchIndex {
    pending: Segment,
    /// Sealed segments, oldest first. A key's text lives in exactly one.
    segments: Vec<Segment>,
    /// Sealed segment holding each key's current text
    owners: AHashMap<CellKey, u32>,
    /// Texts replaced by a later flush since the last compaction
    superseded: usize,
    generation: u64,
}

impl SearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index `text` under `coordinate`.
    ///
    /// Re-adding a coordinate replaces its text; re-adding identical text
    /// changes nothing. Returns whether the index changed.
    pub fn add(&mut self, coordinate: Coordinate, text: &str) -> Result<bool, IndexError> {
        let key = coordinate.pack()?;
        let lowered = text.to_lowercase();
        if self.pending.text(key).is_none() && self.sealed_text(key) == Some(lowered.as_str()) {
            return Ok(false);
        }
        Ok(self.pending.insert(key, &lowered))
    }

    /// Make every prior add visible to `search`
    pub fn flush(&mut self) -> bool {
        if self.pending.is_empty() {
            return false;
        }
        let sealed = std::mem::take(&mut self.pending);
        let slot = self.segments.len() as u32;
        for &key in sealed.texts.keys() {
            if let Some(old) = self.owners.insert(key, slot) {
                self.segments[old as usize].remove(key);
                self.superseded += 1;
            }
        }
        debug!(
            cells = sealed.len(),
            segment = slot,
            "flushed index segment"
        );
        self.segments.push(sealed);
        self.generation += 1;
        true
    }

    /// Merge all segments into one and rebuild postings from the surviving
    /// texts. Pending adds are sealed first.
    ///
    /// On `ResourceExhausted` the index is left unchanged.
    pub fn compact(&mut self) -> Result<CompactStats, IndexError> {
        self.flush();
        if self.segments.is_empty() {
            return Ok(CompactStats::default());
        }

        let live: usize = self.segments.iter().map(Segment::len).sum();
        let mut texts: AHashMap<CellKey, Box<str>> = AHashMap::new();
        texts.try_reserve(live)?;
        let mut owners: AHashMap<CellKey, u32> = AHashMap::new();
        owners.try_reserve(live)?;
        let mut entries: Vec<(CellKey, &str)> = Vec::new();
        entries.try_reserve_exact(live)?;

        let segments_merged = self.segments.len();
        for segment in self.segments.drain(..) {
            texts.extend(segment.texts);
        }
        owners.extend(texts.keys().map(|&key| (key, 0)));
        entries.extend(texts.iter().map(|(key, text)| (*key, &**text)));

        let mut postings = entries
            .par_iter()
            .fold(
                || (AHashMap::new(), Vec::new()),
                |(mut acc, mut buf), (key, text)| {
                    trigrams_into(text.as_bytes(), &mut buf);
                    for &trigram in &buf {
                        acc.entry(trigram)
                            .or_insert_with(RoaringTreemap::new)
                            .insert(*key);
                    }
                    (acc, buf)
                },
            )
            .map(|(acc, _)| acc)
            .reduce(AHashMap::new, |mut merged, part| {
                for (trigram, list) in part {
                    *merged.entry(trigram).or_insert_with(RoaringTreemap::new) |= list;
                }
                merged
            });
        postings.shrink_to_fit();

        let cells: RoaringTreemap = entries.iter().map(|(key, _)| *key).collect();
        drop(entries);
        texts.shrink_to_fit();

        let stats = CompactStats {
            segments_merged,
            cells: texts.len(),
            trigrams: postings.len(),
            superseded: std::mem::take(&mut self.superseded),
        };
        self.segments.push(Segment {
            postings,
            cells,
            texts,
        });
        self.owners = owners;
        self.generation += 1;
        debug!(?stats, "compacted index");
        Ok(stats)
    }

    /// Free-text search over flushed content. Results are unordered.
    pub fn search(&self, query: &str) -> Vec<Coordinate> {
        let query = parse_query(query);
        QueryExecutor::new(self)
            .execute(&query)
            .iter()
            .map(Coordinate::unpack)
            .collect()
    }

    /// Counter bumped whenever searchable content changes
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Drop all content, pending and sealed
    pub fn clear(&mut self) {
        self.pending = Segment::new();
        self.segments.clear();
        self.owners.clear();
        self.superseded = 0;
        self.generation += 1;
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Distinct searchable cells
    pub fn cell_count(&self) -> u64 {
        self.owners.len() as u64
    }

    pub(crate) fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Current searchable text for `key`
    pub(crate) fn sealed_text(&self, key: CellKey) -> Option<&str> {
        let slot = *self.owners.get(&key)?;
        self.segments.get(slot as usize)?.text(key)
    }

    /// Every searchable key
    pub(crate) fn all_cells(&self) -> RoaringTreemap {
        let mut all = RoaringTreemap::new();
        for segment in &self.segments {
            all |= &segment.cells;
        }
        all
    }
}
