
use itertools::Itertools;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::embeddings::TextEmbedder;
use crate::index::NearestNeighbors;
use crate::records::{Record, RecordStore};
use crate::{AdvisorError, Result};

/// Over-fetch multiplier applied before filtering and deduplication.
/// If filters eat more than two thirds of the candidates the final
/// result is simply shorter than requested.
const OVERFETCH_FACTOR: usize = 3;

/// A record that survived retrieval, carrying its match distance and
/// the textual form that goes into the LLM context.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedRecord {
    pub record: Record,
    pub distance: f32,
    pub content: String,
}

/// Orchestrates embedder, vector index and record table into the
/// search operation the assistant is built around.
pub struct Retriever<E: TextEmbedder, I: NearestNeighbors> {
    embedder: E,
    index: I,
    store: RecordStore,
}

impl<E: TextEmbedder, I: NearestNeighbors> Retriever<E, I> {
    /// Build a retriever over already-loaded components, checking the
    /// row-identifier alignment between index and table up front.
    #[inline]
    pub fn new(embedder: E, index: I, store: RecordStore) -> Result<Self> {
        if index.len() != store.len() {
            return Err(AdvisorError::Dataset(format!(
                "Vector index holds {} rows but the record table holds {}; \
                 the dataset files are out of sync",
                index.len(),
                store.len()
            )));
        }
        Ok(Self {
            embedder,
            index,
            store,
        })
    }

    #[inline]
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Semantic college search with optional numeric constraints.
    ///
    /// Over-fetches `top_k * 3` nearest candidates, applies the rank and
    /// package filters as AND-combined predicates, keeps one row per
    /// (college, branch) pair (the closest match wins) and truncates to
    /// `top_k` rows in ascending distance order.
    #[inline]
    pub fn search_colleges(
        &self,
        query: &str,
        top_k: usize,
        max_rank: Option<f64>,
        min_package: Option<f64>,
    ) -> Result<Vec<RetrievedRecord>> {
        if top_k == 0 {
            return Err(AdvisorError::InvalidArgument(
                "search_colleges requires top_k > 0".to_string(),
            ));
        }

        let query_vector = self.embedder.embed(query)?;

        let k = top_k.saturating_mul(OVERFETCH_FACTOR);
        let candidates = self.index.search(&query_vector, k)?;
        if candidates.is_empty() {
            info!("Vector index returned no candidates");
            return Ok(Vec::new());
        }
        debug!("Retrieved {} candidates for top_k={}", candidates.len(), top_k);

        let distances: HashMap<usize, f32> = candidates
            .iter()
            .map(|entry| (entry.row_id, entry.distance))
            .collect();
        let row_ids: Vec<usize> = candidates.iter().map(|entry| entry.row_id).collect();

        let mut results: Vec<RetrievedRecord> = self
            .store
            .slice(&row_ids)
            .into_iter()
            .filter(|(_, record)| {
                let rank_ok = max_rank.is_none_or(|max| record.cutoff_rank <= max);
                let package_ok =
                    min_package.is_none_or(|min| record.avg_package.is_some_and(|p| p >= min));
                rank_ok && package_ok
            })
            .map(|(row_id, record)| RetrievedRecord {
                record: record.clone(),
                distance: distances.get(&row_id).copied().unwrap_or(f32::MAX),
                content: record
                    .content
                    .clone()
                    .unwrap_or_else(|| record.content_string()),
            })
            .collect();

        // Stable sort keeps original fetch order among equal distances,
        // which fixes the tie-break for the dedup below.
        results.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        // Ascending order means the first row seen for a (college, branch)
        // pair is the closest one, so unique_by implements the dedup rule.
        let results: Vec<RetrievedRecord> = results
            .into_iter()
            .unique_by(|result| (result.record.college.clone(), result.record.branch.clone()))
            .take(top_k)
            .collect();

        debug!("Returning {} results after filtering and dedup", results.len());
        Ok(results)
    }
}

/// Assemble the LLM context from retrieval results, one content line
/// per record.
#[inline]
pub fn build_context(results: &[RetrievedRecord]) -> String {
    results
        .iter()
        .map(|result| result.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
