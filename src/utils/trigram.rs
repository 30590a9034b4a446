//! Trigram extraction over cell text.
//!
//! Cells are short, so unique trigrams come from a sort and dedup of the
//! byte windows. [`trigrams_into`] reuses the caller's buffer across cells.

use crate::index::types::{Trigram, bytes_to_trigram};

/// Unique trigrams of a cell's (already lower-cased) text, ascending
pub fn extract_trigrams(content: &[u8]) -> Vec<Trigram> {
    let mut out = Vec::new();
    trigrams_into(content, &mut out);
    out
}

/// Replace the contents of `out` with the unique trigrams of `content`
pub fn trigrams_into(content: &[u8], out: &mut Vec<Trigram>) {
    out.clear();
    if content.len() < 3 {
        return;
    }
    out.extend(
        content
            .windows(3)
            .map(|w| bytes_to_trigram(w[0], w[1], w[2])),
    );
    out.sort_unstable();
    out.dedup();
}

/// Trigrams a cell must contain to match `needle`; empty for needles under 3 bytes
pub fn query_trigrams(needle: &str) -> Vec<Trigram> {
    extract_trigrams(needle.as_bytes())
}
