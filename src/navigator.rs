//! Cursor over the matches of the latest search.

use crate::index::Coordinate;

/// Sorted search hits with a wrapping cursor
#[derive(Debug, Clone, Default)]
pub struct MatchNavigator {
    matches: Vec<Coordinate>,
    cursor: Option<usize>,
}

impl MatchNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the match list and move the cursor to the first match.
    ///
    /// Hits are sorted by row then column and de-duplicated. The previous
    /// list is returned so its highlights can be cleared.
    pub fn set_results(&mut self, mut hits: Vec<Coordinate>) -> Vec<Coordinate> {
        hits.sort_unstable();
        hits.dedup();
        self.cursor = if hits.is_empty() { None } else { Some(0) };
        std::mem::replace(&mut self.matches, hits)
    }

    /// Advance to the following match, wrapping from the last to the first
    pub fn next(&mut self) -> Option<Coordinate> {
        let len = self.matches.len();
        let idx = match self.cursor {
            Some(i) => (i + 1) % len,
            None if len > 0 => 0,
            None => return None,
        };
        self.cursor = Some(idx);
        Some(self.matches[idx])
    }

    /// Step back to the preceding match, wrapping from the first to the last
    pub fn previous(&mut self) -> Option<Coordinate> {
        let len = self.matches.len();
        let idx = match self.cursor {
            Some(0) => len - 1,
            Some(i) => i - 1,
            None if len > 0 => len - 1,
            None => return None,
        };
        self.cursor = Some(idx);
        Some(self.matches[idx])
    }

    pub fn current(&self) -> Option<Coordinate> {
        self.cursor.map(|i| self.matches[i])
    }

    /// 1-based cursor position and match count, e.g. "3 of 10"
    pub fn position(&self) -> Option<(usize, usize)> {
        self.cursor.map(|i| (i + 1, self.matches.len()))
    }

    pub fn matches(&self) -> &[Coordinate] {
        &self.matches
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Drop all matches, returning them
    pub fn clear(&mut self) -> Vec<Coordinate> {
        self.set_results(Vec::new())
    }
}
