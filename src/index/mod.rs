#[cfg(test)]
mod tests;

use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::{AdvisorError, Result};

/// A nearest-neighbor candidate: row identifier into the record table
/// plus a non-negative distance where smaller means more similar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexEntry {
    pub row_id: usize,
    pub distance: f32,
}

/// Capability exposed by any vector index backend. Results are ordered
/// ascending by distance; if the index holds fewer than `k` vectors the
/// result is simply shorter, never padded.
pub trait NearestNeighbors {
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<IndexEntry>>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn dimension(&self) -> usize;
}

#[derive(Debug, Deserialize)]
struct IndexFile {
    model: String,
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

/// Exact inner-product index over L2-normalized vectors, loaded once
/// from a prebuilt file and read-only afterwards. Row position in the
/// file is the row identifier shared with the record table.
#[derive(Debug)]
pub struct FlatIndex {
    model: String,
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    #[inline]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading vector index from {}", path.display());

        let content = fs::read_to_string(path).map_err(|e| {
            AdvisorError::Dataset(format!(
                "Failed to read vector index {}: {}",
                path.display(),
                e
            ))
        })?;

        let file: IndexFile = serde_json::from_str(&content).map_err(|e| {
            AdvisorError::Dataset(format!(
                "Failed to parse vector index {}: {}",
                path.display(),
                e
            ))
        })?;

        if let Some(row) = file.vectors.iter().position(|v| v.len() != file.dimension) {
            return Err(AdvisorError::Dataset(format!(
                "Vector index {} row {} has {} dimensions, expected {}",
                path.display(),
                row,
                file.vectors[row].len(),
                file.dimension
            )));
        }

        info!(
            "Loaded vector index with {} vectors of dimension {} (model {})",
            file.vectors.len(),
            file.dimension,
            file.model
        );

        Ok(Self {
            model: file.model,
            dimension: file.dimension,
            vectors: file.vectors,
        })
    }

    #[inline]
    pub fn from_vectors(model: &str, dimension: usize, vectors: Vec<Vec<f32>>) -> Result<Self> {
        if let Some(row) = vectors.iter().position(|v| v.len() != dimension) {
            return Err(AdvisorError::Dataset(format!(
                "Vector at row {} has {} dimensions, expected {}",
                row,
                vectors[row].len(),
                dimension
            )));
        }
        Ok(Self {
            model: model.to_string(),
            dimension,
            vectors,
        })
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Row-identifier alignment between the index and the record table is
    /// a load-time invariant, checked explicitly instead of trusted.
    #[inline]
    pub fn validate_alignment(&self, record_count: usize) -> Result<()> {
        if self.vectors.len() != record_count {
            return Err(AdvisorError::Dataset(format!(
                "Vector index holds {} rows but the record table holds {}; \
                 the dataset files are out of sync",
                self.vectors.len(),
                record_count
            )));
        }
        Ok(())
    }
}

impl NearestNeighbors for FlatIndex {
    #[inline]
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<IndexEntry>> {
        if k == 0 {
            return Err(AdvisorError::InvalidArgument(
                "search requires k > 0".to_string(),
            ));
        }
        if query.len() != self.dimension {
            return Err(AdvisorError::InvalidArgument(format!(
                "query vector has {} dimensions, index expects {}",
                query.len(),
                self.dimension
            )));
        }

        let mut entries: Vec<IndexEntry> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(row_id, vector)| {
                let dot: f32 = vector.iter().zip(query).map(|(a, b)| a * b).sum();
                // Cosine distance over normalized vectors, clamped so
                // float noise never produces a negative distance.
                IndexEntry {
                    row_id,
                    distance: (1.0 - dot).max(0.0),
                }
            })
            .collect();

        entries.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        entries.truncate(k);
        Ok(entries)
    }

    #[inline]
    fn len(&self) -> usize {
        self.vectors.len()
    }

    #[inline]
    fn dimension(&self) -> usize {
        self.dimension
    }
}
