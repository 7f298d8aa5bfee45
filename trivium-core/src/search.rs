//! Search aggregator — merges the label-match and semantic-similarity
//! strategies into one ranked candidate list.
//!
//! Both branches run concurrently and each is cached under its own key, so a
//! repeated query re-issues neither. A failed branch degrades the result to
//! partial instead of failing the aggregate.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::SearchConfig;
use crate::graph::CachedGraph;
use crate::models::{AtomReference, MatchSource};
use crate::remote::ScoredAtom;

/// Ranked, deduplicated candidates. `partial` is set when a branch failed or
/// the network switched mid-flight and the result set was discarded.
#[derive(Debug, Clone)]
pub struct SearchResults {
    pub hits: Vec<AtomReference>,
    pub partial: bool,
}

impl SearchResults {
    fn empty(partial: bool) -> Self {
        Self {
            hits: Vec::new(),
            partial,
        }
    }
}

pub struct SearchAggregator {
    graph: Arc<CachedGraph>,
    config: SearchConfig,
}

impl SearchAggregator {
    pub fn new(graph: Arc<CachedGraph>, config: SearchConfig) -> Self {
        Self { graph, config }
    }

    pub async fn search(&self, query: &str, limit: usize) -> SearchResults {
        let query = query.trim();
        if query.len() < self.config.min_query_len {
            return SearchResults::empty(false);
        }

        let started_on = self.graph.network().current();
        let branch_limit = self.config.branch_limit;

        let (label, semantic) = tokio::join!(
            self.graph.search_label(query, branch_limit),
            self.graph.search_semantic(query, branch_limit),
        );

        let mut partial = false;
        let label_hits = match label {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!(error = %e, query, "Label search branch failed");
                partial = true;
                Vec::new()
            }
        };
        let semantic_hits = match semantic {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!(error = %e, query, "Semantic search branch failed");
                partial = true;
                Vec::new()
            }
        };

        // Results addressed to a network that is no longer active are stale
        // cross-network data; discard them.
        if self.graph.network().current() != started_on {
            tracing::info!(query, network = %started_on, "Discarding search results after network switch");
            return SearchResults::empty(true);
        }

        let mut hits = merge(label_hits, semantic_hits);
        hits.truncate(limit);
        SearchResults { hits, partial }
    }
}

/// Union by atom id, keeping the higher-confidence entry and marking hits
/// found by both strategies. Sorted by descending confidence; ties rank the
/// exact-label match above the semantic match. Truncation to the caller's
/// limit happens after the merge, so it sees each branch's full pool.
fn merge(label: Vec<ScoredAtom>, semantic: Vec<ScoredAtom>) -> Vec<AtomReference> {
    let mut by_id: HashMap<String, AtomReference> = HashMap::new();

    for hit in label {
        by_id.insert(
            hit.atom.id.clone(),
            AtomReference::existing(hit.atom, hit.score, MatchSource::Label),
        );
    }

    for hit in semantic {
        match by_id.get_mut(&hit.atom.id) {
            Some(existing) => {
                existing.confidence = existing.confidence.max(hit.score);
                existing.source = MatchSource::Both;
            }
            None => {
                by_id.insert(
                    hit.atom.id.clone(),
                    AtomReference::existing(hit.atom, hit.score, MatchSource::Semantic),
                );
            }
        }
    }

    let mut merged: Vec<AtomReference> = by_id.into_values().collect();
    merged.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| source_rank(a.source).cmp(&source_rank(b.source)))
            .then_with(|| a.label().cmp(b.label()))
    });
    merged
}

/// Exact-label evidence wins ties over purely semantic evidence.
fn source_rank(source: MatchSource) -> u8 {
    match source {
        MatchSource::Both => 0,
        MatchSource::Label => 1,
        MatchSource::Semantic => 2,
    }
}
