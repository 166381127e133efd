//! # Semantic Server CLI (`semantic-server`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `semantic-server serve` | Seed the corpus and start the HTTP server |
//! | `semantic-server search "<query>"` | Seed, index `--file`s, print nearest chunks |
//! | `semantic-server ask "<query>"` | Seed, index `--file`s, generate an answer |
//!
//! The corpus lives in memory only: `search` and `ask` build a fresh corpus
//! from the seed set plus the given files on every run.
//!
//! ## Examples
//!
//! ```bash
//! semantic-server --config ./config/semantic.toml serve
//! semantic-server search "boiling point" --file notes.txt --k 5
//! RUST_LOG=debug semantic-server ask "What color is the sky?" --file notes.txt
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use semantic_server::answer::RetrievalOrchestrator;
use semantic_server::chunk::Segmenter;
use semantic_server::config::{self, Config};
use semantic_server::corpus::Corpus;
use semantic_server::embedding::create_embedder;
use semantic_server::generation::create_generator;
use semantic_server::seed::{is_allowed_file, load_seed_documents};
use semantic_server::server::{self, AppState};

/// Semantic Server: retrieval-augmented generation over uploaded text.
#[derive(Parser)]
#[command(name = "semantic-server", version, about)]
struct Cli {
    /// Path to configuration file (TOML). Built-in defaults are used when
    /// the file does not exist.
    #[arg(long, global = true, default_value = "./config/semantic.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed the corpus and start the HTTP server.
    Serve,

    /// Print the chunks nearest to a query.
    Search {
        /// The search query string.
        query: String,

        /// `.txt` files to index before searching.
        #[arg(long = "file")]
        files: Vec<PathBuf>,

        /// Number of chunks to return. Defaults to `[retrieval].top_k`.
        #[arg(long)]
        k: Option<usize>,
    },

    /// Answer a query with retrieved context.
    Ask {
        /// The question.
        query: String,

        /// `.txt` files to index before answering.
        #[arg(long = "file")]
        files: Vec<PathBuf>,

        /// Extra context appended to the prompt after the retrieved chunks.
        #[arg(long, default_value = "")]
        context: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            let corpus = build_corpus(&cfg, &[]).await?;
            let state = AppState::new(build_orchestrator(&cfg, corpus)?);
            server::run_server(&cfg, state).await?;
        }
        Commands::Search { query, files, k } => {
            let corpus = build_corpus(&cfg, &files).await?;
            let k = k.unwrap_or(cfg.retrieval.top_k);
            let hits = corpus.search(&query, k).await?;
            if hits.is_empty() {
                println!("No results.");
            }
            for (rank, hit) in hits.iter().enumerate() {
                println!(
                    "{}. [row {}] distance={:.4}\n   {}",
                    rank + 1,
                    hit.row,
                    hit.distance,
                    hit.text.replace('\n', "\n   ")
                );
            }
        }
        Commands::Ask {
            query,
            files,
            context,
        } => {
            let corpus = build_corpus(&cfg, &files).await?;
            let rag = build_orchestrator(&cfg, corpus)?;
            let answer = rag.answer(&query, &context).await?;
            println!("{}", answer.response);
        }
    }

    Ok(())
}

/// Create the corpus once, seeded from configuration, then index `files`.
async fn build_corpus(cfg: &Config, files: &[PathBuf]) -> Result<Arc<Corpus>> {
    let segmenter = Segmenter::new(cfg.chunking.chunk_size, cfg.chunking.chunk_overlap)?;
    let embedder = create_embedder(&cfg.embedding)?;
    let seed_docs = load_seed_documents(&cfg.seed)?;

    let corpus = Corpus::bootstrap(segmenter, embedder, &seed_docs)
        .await
        .context("Failed to seed corpus")?;

    for path in files {
        index_file(&corpus, path).await?;
    }

    Ok(Arc::new(corpus))
}

async fn index_file(corpus: &Corpus, path: &Path) -> Result<()> {
    let name = path.to_string_lossy();
    if !is_allowed_file(&name) {
        tracing::warn!(file = %name, "skipping file: invalid file type");
        return Ok(());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    corpus
        .ingest(&text)
        .await
        .with_context(|| format!("Failed to index {}", path.display()))?;
    Ok(())
}

fn build_orchestrator(cfg: &Config, corpus: Arc<Corpus>) -> Result<RetrievalOrchestrator> {
    let generator = create_generator(&cfg.generation)?;
    Ok(RetrievalOrchestrator::new(
        corpus,
        generator,
        Duration::from_secs(cfg.generation.timeout_secs),
    )
    .with_top_k(cfg.retrieval.top_k))
}
