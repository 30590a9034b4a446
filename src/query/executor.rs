use crate::index::SearchIndex;
use crate::query::parser::{Query, QueryNode};
use crate::utils::query_trigrams;
use roaring::RoaringTreemap;

/// Evaluates a parsed query against the searchable segments of an index.
///
/// Terms are narrowed with trigram postings per segment and every candidate
/// is verified against the text that segment holds. A replaced cell's text
/// only exists in its newest segment, so stale postings never produce a hit.
pub struct QueryExecutor<'a> {
    index: &'a SearchIndex,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(index: &'a SearchIndex) -> Self {
        Self { index }
    }

    /// Execute a query and return the matching cell keys
    pub fn execute(&self, query: &Query) -> RoaringTreemap {
        match &query.root {
            QueryNode::Empty => RoaringTreemap::new(),
            root => self.eval(root),
        }
    }

    fn eval(&self, node: &QueryNode) -> RoaringTreemap {
        match node {
            QueryNode::Term(text) | QueryNode::Phrase(text) => self.find_substring(text),
            QueryNode::Or(nodes) => {
                let mut result = RoaringTreemap::new();
                for n in nodes {
                    result |= self.eval(n);
                }
                result
            }
            QueryNode::And(nodes) => self.eval_and(nodes),
            QueryNode::Not(inner) => self.index.all_cells() - self.eval(inner),
            QueryNode::Empty => RoaringTreemap::new(),
        }
    }

    /// Intersect the positive children, then subtract the excluded ones
    fn eval_and(&self, nodes: &[QueryNode]) -> RoaringTreemap {
        let (excluded, included): (Vec<&QueryNode>, Vec<&QueryNode>) = nodes
            .iter()
            .partition(|n| matches!(n, QueryNode::Not(_)));

        let mut result: Option<RoaringTreemap> = None;
        for node in included {
            let hits = self.eval(node);
            result = Some(match result {
                Some(acc) => acc & hits,
                None => hits,
            });
            if result.as_ref().is_some_and(RoaringTreemap::is_empty) {
                return RoaringTreemap::new();
            }
        }

        let mut result = result.unwrap_or_else(|| self.index.all_cells());
        for node in excluded {
            if let QueryNode::Not(inner) = node {
                result -= self.eval(inner);
            }
        }
        result
    }

    fn find_substring(&self, needle: &str) -> RoaringTreemap {
        let needle = needle.to_lowercase();
        if needle.is_empty() {
            return RoaringTreemap::new();
        }

        let trigrams = query_trigrams(&needle);
        let mut hits = RoaringTreemap::new();
        for segment in self.index.segments() {
            let candidates = if trigrams.is_empty() {
                // Needles under 3 bytes cannot be narrowed
                segment.cells.clone()
            } else {
                segment.candidates(&trigrams)
            };
            // Keys replaced by a later segment have no text here
            hits.extend(candidates.iter().filter(|&key| {
                segment
                    .text(key)
                    .is_some_and(|text| text.contains(needle.as_str()))
            }));
        }
        hits
    }
}
