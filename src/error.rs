//! Typed errors for the retrieval pipeline.
//!
//! Each layer has its own error enum so callers can tell an unavailable
//! embedding model apart from an index contract violation or a failed
//! generation call. Application glue (config loading, CLI, startup) uses
//! `anyhow` on top of these.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by the flat vector index.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IndexError {
    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("cannot add an empty batch of vectors")]
    EmptyBatch,

    #[error("vectors must have at least one dimension")]
    ZeroDimension,
}

/// Errors raised by the chunk store.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("chunk index {index} out of range (store holds {len} chunks)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Errors raised by an embedding backend.
#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("embedding model unavailable: {0}")]
    Unavailable(String),

    #[error("embedding request failed: {0}")]
    Transport(String),

    #[error("malformed embedding response: {0}")]
    MalformedResponse(String),

    #[error("embedder returned {actual} vectors for {expected} inputs")]
    CountMismatch { expected: usize, actual: usize },
}

/// Errors raised by the corpus (ingest and search).
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error(transparent)]
    Embedding(#[from] EmbedError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The index and the chunk store no longer line up. Fatal: the corpus
    /// refuses all further work until the process is restarted.
    #[error("corpus corrupted: {0}")]
    Corruption(String),
}

/// Errors raised by a text-generation backend.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("generation request failed: {0}")]
    Transport(String),

    #[error("generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed generation response: {0}")]
    MalformedResponse(String),

    #[error("generation is disabled")]
    Disabled,
}

/// Failure outcome of [`crate::answer::RetrievalOrchestrator::answer`].
#[derive(Debug, Error)]
pub enum AnswerError {
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] CorpusError),

    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),
}
