//! The indexed document set: segmenter + embedder + vector index + chunk store.
//!
//! # Concurrency
//!
//! The index and the chunk store live together in one `CorpusState`
//! behind a single `RwLock`. Ingestion embeds its chunks first, with no lock
//! held, and then takes the write lock only for the `add` + `append` pair.
//! Searches embed the query first and then take the read lock for the index
//! lookup and the chunk-text mapping. Readers run concurrently with each
//! other but never observe a half-applied ingestion.
//!
//! # Invariant
//!
//! `chunks.len() == index.len()`, and `chunks[i]` is the text whose
//! embedding is index row `i`. If this is ever found broken the corpus is
//! marked corrupted and refuses all further ingest and search calls.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::chunk::Segmenter;
use crate::embedding::{embed_query, Embedder};
use crate::error::{CorpusError, EmbedError};
use crate::index::VectorIndex;
use crate::store::ChunkStore;

/// Default number of chunks retrieved per query.
pub const DEFAULT_TOP_K: usize = 3;

/// One retrieved chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub row: usize,
    pub distance: f32,
    pub text: String,
}

/// Outcome of a successful [`Corpus::ingest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub chunks_added: usize,
    pub total_chunks: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusStats {
    /// Rows in the vector index.
    pub rows: usize,
    /// Texts in the chunk store. Always equal to `rows` on a healthy corpus.
    pub chunks: usize,
    pub dims: Option<usize>,
    pub model: String,
}

#[derive(Debug, Default)]
struct CorpusState {
    index: VectorIndex,
    chunks: ChunkStore,
    corrupted: Option<String>,
}

impl CorpusState {
    fn ensure_usable(&self) -> Result<(), CorpusError> {
        match &self.corrupted {
            Some(reason) => Err(CorpusError::Corruption(reason.clone())),
            None => Ok(()),
        }
    }
}

pub struct Corpus {
    segmenter: Segmenter,
    embedder: Arc<dyn Embedder>,
    state: RwLock<CorpusState>,
}

impl Corpus {
    /// An empty corpus.
    ///
    /// When the embedder reports its dimension the index is fixed to it, so
    /// a model that disagrees with its configuration fails on the first
    /// batch instead of silently setting the dimension.
    pub fn new(segmenter: Segmenter, embedder: Arc<dyn Embedder>) -> Self {
        let index = match embedder.dims() {
            0 => VectorIndex::new(),
            d => VectorIndex::with_dims(d).unwrap_or_default(),
        };
        Self {
            segmenter,
            embedder,
            state: RwLock::new(CorpusState {
                index,
                ..CorpusState::default()
            }),
        }
    }

    /// A corpus with every seed document ingested, in order.
    pub async fn bootstrap<S: AsRef<str>>(
        segmenter: Segmenter,
        embedder: Arc<dyn Embedder>,
        seed_documents: &[S],
    ) -> Result<Self, CorpusError> {
        let corpus = Self::new(segmenter, embedder);
        for doc in seed_documents {
            corpus.ingest(doc.as_ref()).await?;
        }
        tracing::info!(
            documents = seed_documents.len(),
            chunks = corpus.len().await,
            "corpus seeded"
        );
        Ok(corpus)
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    /// Segment, embed, and append `raw_text`.
    ///
    /// Text that segments into no chunks is a successful no-op.
    pub async fn ingest(&self, raw_text: &str) -> Result<IngestReport, CorpusError> {
        let chunks = self.segmenter.segment(raw_text);
        if chunks.is_empty() {
            let total_chunks = self.len().await;
            return Ok(IngestReport {
                chunks_added: 0,
                total_chunks,
            });
        }

        // Fail early without spending an embedding call on a dead corpus.
        self.state.read().await.ensure_usable()?;

        let vectors = self.embedder.embed(&chunks).await?;
        if vectors.len() != chunks.len() {
            return Err(EmbedError::CountMismatch {
                expected: chunks.len(),
                actual: vectors.len(),
            }
            .into());
        }

        let chunks_added = chunks.len();
        let mut state = self.state.write().await;
        state.ensure_usable()?;

        // `add` validates the whole batch before writing, so an error here
        // leaves both structures untouched.
        state.index.add(&vectors)?;
        state.chunks.append(chunks);

        if state.index.len() != state.chunks.len() {
            let reason = format!(
                "index holds {} rows but chunk store holds {} chunks",
                state.index.len(),
                state.chunks.len()
            );
            tracing::error!(%reason, "corpus alignment broken; refusing further work");
            state.corrupted = Some(reason.clone());
            return Err(CorpusError::Corruption(reason));
        }

        let total_chunks = state.chunks.len();
        tracing::info!(chunks_added, total_chunks, "ingested document");
        Ok(IngestReport {
            chunks_added,
            total_chunks,
        })
    }

    /// Retrieve the `k` chunks nearest to `query`, nearest first.
    ///
    /// An empty corpus yields an empty result without calling the embedder.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, CorpusError> {
        {
            let state = self.state.read().await;
            state.ensure_usable()?;
            if state.chunks.is_empty() || k == 0 {
                return Ok(Vec::new());
            }
        }

        let query_vector = embed_query(self.embedder.as_ref(), query).await?;

        let state = self.state.read().await;
        state.ensure_usable()?;
        let neighbors = state.index.search(&query_vector, k)?;

        let hits = neighbors
            .into_iter()
            .map(|n| -> Result<SearchHit, CorpusError> {
                Ok(SearchHit {
                    row: n.row,
                    distance: n.distance,
                    text: state.chunks.get(n.row)?.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(k, hits = hits.len(), "semantic search");
        Ok(hits)
    }

    /// Like [`search`](Self::search), returning only the chunk texts.
    pub async fn search_texts(&self, query: &str, k: usize) -> Result<Vec<String>, CorpusError> {
        Ok(self
            .search(query, k)
            .await?
            .into_iter()
            .map(|hit| hit.text)
            .collect())
    }

    /// Number of indexed chunks.
    pub async fn len(&self) -> usize {
        self.state.read().await.chunks.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Whether the corpus has been halted by an alignment failure.
    pub async fn is_corrupted(&self) -> bool {
        self.state.read().await.corrupted.is_some()
    }

    /// All chunk texts, in row order.
    pub async fn chunks(&self) -> Vec<String> {
        let state = self.state.read().await;
        state.chunks.iter().map(str::to_string).collect()
    }

    pub async fn stats(&self) -> CorpusStats {
        let state = self.state.read().await;
        CorpusStats {
            rows: state.index.len(),
            chunks: state.chunks.len(),
            dims: state.index.dims(),
            model: self.embedder.model_name().to_string(),
        }
    }

    #[cfg(test)]
    async fn push_unaligned_chunk(&self, text: &str) {
        self.state.write().await.chunks.append(vec![text.to_string()]);
    }
}
