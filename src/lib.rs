//! # Semantic Server
//!
//! A minimal retrieval-augmented generation backend.
//!
//! Uploaded text is split into overlapping chunks, embedded, and appended to
//! an in-memory flat L2 index. Queries are embedded the same way, the nearest
//! chunks are retrieved, and a prompt built from those chunks and the query
//! is sent to a text-generation model.
//!
//! ## Architecture
//!
//! ```text
//!  upload ─▶ Segmenter ─▶ Embedder ─▶ ┌──────────────────────┐
//!                                     │ Corpus               │
//!                                     │  VectorIndex (rows)  │
//!                                     │  ChunkStore  (texts) │
//!  query ──────────────▶ Embedder ─▶  └──────────┬───────────┘
//!                                                ▼
//!                                  RetrievalOrchestrator ─▶ Generator
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`chunk`] | Recursive character text segmentation |
//! | [`embedding`] | Embedding backend abstraction |
//! | [`index`] | Flat L2 vector index |
//! | [`store`] | Chunk text storage aligned with index rows |
//! | [`corpus`] | Ingestion and semantic search |
//! | [`generation`] | Text-generation backend abstraction |
//! | [`answer`] | Retrieval-augmented answer orchestration |
//! | [`seed`] | Seed documents and file-type filtering |
//! | [`server`] | HTTP server |
//! | [`error`] | Typed errors |

pub mod answer;
pub mod chunk;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod seed;
pub mod server;
pub mod store;
