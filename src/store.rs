//! Ordered, append-only chunk text storage.
//!
//! Position `i` holds the text whose embedding is row `i` of the
//! [`VectorIndex`](crate::index::VectorIndex). The store never removes or
//! rewrites entries.

use crate::error::StoreError;

#[derive(Debug, Default, Clone)]
pub struct ChunkStore {
    chunks: Vec<String>,
}

impl ChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, chunks: Vec<String>) {
        self.chunks.extend(chunks);
    }

    pub fn get(&self, index: usize) -> Result<&str, StoreError> {
        self.chunks
            .get(index)
            .map(String::as_str)
            .ok_or(StoreError::IndexOutOfRange {
                index,
                len: self.chunks.len(),
            })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.chunks.iter().map(String::as_str)
    }
}
