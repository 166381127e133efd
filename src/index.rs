//! Flat, append-only vector index with exact L2 search.
//!
//! Rows are stored contiguously in insertion order. Search is a brute-force
//! scan over every row, O(rows × dims) per query, with no approximation or
//! pruning. The corpus sizes this server targets make a linear scan cheaper
//! than maintaining a graph index.
//!
//! Results are ordered by ascending Euclidean distance; rows at exactly the
//! same distance come back in insertion order (lowest row first), so repeated
//! queries over the same data always rank identically.

use std::cmp::Ordering;

use crate::error::IndexError;

/// A single search result: the row index and its L2 distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub row: usize,
    pub distance: f32,
}

/// Brute-force nearest-neighbor index over fixed-dimension `f32` vectors.
#[derive(Debug, Default, Clone)]
pub struct VectorIndex {
    dims: Option<usize>,
    data: Vec<f32>,
    rows: usize,
}

impl VectorIndex {
    /// An empty index whose dimension is taken from the first batch added.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty index with a fixed dimension.
    pub fn with_dims(dims: usize) -> Result<Self, IndexError> {
        if dims == 0 {
            return Err(IndexError::ZeroDimension);
        }
        Ok(Self {
            dims: Some(dims),
            data: Vec::new(),
            rows: 0,
        })
    }

    /// Vector dimension, or `None` if nothing has fixed it yet.
    pub fn dims(&self) -> Option<usize> {
        self.dims
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Append `vectors` as new rows, in order.
    ///
    /// The whole batch is validated before anything is written: on error the
    /// index is left exactly as it was.
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> Result<(), IndexError> {
        let first = vectors.first().ok_or(IndexError::EmptyBatch)?;
        let dims = match self.dims {
            Some(d) => d,
            None if first.is_empty() => return Err(IndexError::ZeroDimension),
            None => first.len(),
        };

        if let Some(bad) = vectors.iter().find(|v| v.len() != dims) {
            return Err(IndexError::DimensionMismatch {
                expected: dims,
                actual: bad.len(),
            });
        }

        self.dims = Some(dims);
        self.data.reserve(vectors.len() * dims);
        for v in vectors {
            self.data.extend_from_slice(v);
        }
        self.rows += vectors.len();
        Ok(())
    }

    /// Return the `k` rows nearest to `query`, nearest first.
    ///
    /// Returns `min(k, len())` results. An empty index yields an empty
    /// result rather than an error.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, IndexError> {
        let dims = match self.dims {
            Some(d) if self.rows > 0 => d,
            _ => return Ok(Vec::new()),
        };
        if query.len() != dims {
            return Err(IndexError::DimensionMismatch {
                expected: dims,
                actual: query.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(dims)
            .enumerate()
            .map(|(row, v)| (row, squared_l2(query, v)))
            .collect();

        scored.sort_by(|a, b| match a.1.total_cmp(&b.1) {
            Ordering::Equal => a.0.cmp(&b.0),
            other => other,
        });
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(row, d2)| Neighbor {
                row,
                distance: d2.sqrt(),
            })
            .collect())
    }

    /// The stored vector at `row`, if any.
    pub fn vector(&self, row: usize) -> Option<&[f32]> {
        let dims = self.dims?;
        if row >= self.rows {
            return None;
        }
        Some(&self.data[row * dims..(row + 1) * dims])
    }
}

/// Squared Euclidean distance. Callers guarantee equal lengths.
fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
