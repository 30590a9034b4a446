//! One batch of indexed cells: trigram postings plus the lower-cased text
//! needed to verify candidates.

use crate::index::types::{CellKey, Trigram};
use crate::utils::extract_trigrams;
use ahash::AHashMap;
use roaring::RoaringTreemap;

#[derive(Debug, Default, Clone)]
pub struct Segment {
    pub(crate) postings: AHashMap<Trigram, RoaringTreemap>,
    /// Keys whose current text lives in this segment
    pub(crate) cells: RoaringTreemap,
    pub(crate) texts: AHashMap<CellKey, Box<str>>,
}

impl Segment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `lowered` as the text of `key`. Returns false when the key
    /// already held exactly this text.
    pub fn insert(&mut self, key: CellKey, lowered: &str) -> bool {
        if self.texts.get(&key).is_some_and(|old| &**old == lowered) {
            return false;
        }
        // A replaced text leaves stale postings behind; candidates are
        // verified against `texts` and compaction rebuilds the postings.
        for trigram in extract_trigrams(lowered.as_bytes()) {
            self.postings.entry(trigram).or_default().insert(key);
        }
        self.cells.insert(key);
        self.texts.insert(key, lowered.into());
        true
    }

    /// Forget `key` after a newer segment took it over. Its postings stay
    /// until compaction.
    pub fn remove(&mut self, key: CellKey) {
        self.cells.remove(key);
        self.texts.remove(&key);
    }

    pub fn text(&self, key: CellKey) -> Option<&str> {
        self.texts.get(&key).map(|t| &**t)
    }

    /// Keys holding every trigram in `trigrams`. `trigrams` must be non-empty.
    pub fn candidates(&self, trigrams: &[Trigram]) -> RoaringTreemap {
        let mut lists = Vec::with_capacity(trigrams.len());
        for trigram in trigrams {
            match self.postings.get(trigram) {
                Some(list) => lists.push(list),
                None => return RoaringTreemap::new(),
            }
        }
        // Smallest list first keeps the intersection cheap
        lists.sort_by_key(|list| list.len());

        let mut iter = lists.into_iter();
        let mut result = match iter.next() {
            Some(first) => first.clone(),
            None => return RoaringTreemap::new(),
        };
        for list in iter {
            result &= list;
            if result.is_empty() {
                break;
            }
        }
        result
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    pub fn trigram_count(&self) -> usize {
        self.postings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_insert_is_noop() {
        let mut segment = Segment::new();
        assert!(segment.insert(1, "apple"));
        assert!(!segment.insert(1, "apple"));
        assert_eq!(segment.len(), 1);
    }

    #[test]
    fn test_candidates_intersect() {
        let mut segment = Segment::new();
        segment.insert(1, "apple pie");
        segment.insert(2, "apple");
        segment.insert(3, "pie");

        let trigrams = extract_trigrams(b"pie");
        let hits: Vec<u64> = segment.candidates(&trigrams).iter().collect();
        assert_eq!(hits, vec![1, 3]);

        let trigrams = extract_trigrams(b"apple pie");
        let hits: Vec<u64> = segment.candidates(&trigrams).iter().collect();
        assert_eq!(hits, vec![1]);
    }

    #[test]
    fn test_missing_trigram_yields_nothing() {
        let mut segment = Segment::new();
        segment.insert(1, "apple");
        assert!(segment.candidates(&extract_trigrams(b"xyz")).is_empty());
    }

    #[test]
    fn test_remove_drops_text_and_cell() {
        let mut segment = Segment::new();
        segment.insert(1, "apple");
        segment.insert(2, "apricot");
        segment.remove(1);

        assert_eq!(segment.text(1), None);
        assert_eq!(segment.len(), 1);
        assert!(!segment.cells.contains(1));
        // Postings are only rebuilt by compaction
        assert!(segment.candidates(&extract_trigrams(b"apple")).contains(1));
    }
}
