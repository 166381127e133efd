use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Seed document indexed at startup when no other seed text is configured.
pub const DEFAULT_SEED_TEXT: &str = "This Retrieval-augmented generation (RAG) based chat bot \
answers questions from the documents uploaded to it.\n\
It uses a flat L2 vector index for retrieval and a local Ollama model for generation.";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub seed: SeedConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}
fn default_max_upload_bytes() -> usize {
    16 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    500
}
fn default_chunk_overlap() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: None,
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_embedding_timeout_secs(),
        }
    }
}

fn default_embedding_provider() -> String {
    "local".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_embedding_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_provider")]
    pub provider: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default = "default_ollama_url")]
    pub url: String,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_generation_provider(),
            model: default_generation_model(),
            url: default_ollama_url(),
            timeout_secs: default_generation_timeout_secs(),
        }
    }
}

fn default_generation_provider() -> String {
    "ollama".to_string()
}
fn default_generation_model() -> String {
    "mistral".to_string()
}
pub(crate) fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_generation_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct SeedConfig {
    #[serde(default = "default_seed_text")]
    pub text: Option<String>,
    #[serde(default)]
    pub dirs: Vec<PathBuf>,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            text: default_seed_text(),
            dirs: Vec::new(),
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }
}

fn default_seed_text() -> Option<String> {
    Some(DEFAULT_SEED_TEXT.to_string())
}
fn default_include_globs() -> Vec<String> {
    vec!["**/*.txt".to_string()]
}

impl Config {
    /// Apply the `PORT` environment override to `server.bind`.
    pub fn apply_port_override(&mut self, port: Option<&str>) -> Result<()> {
        let Some(port) = port else {
            return Ok(());
        };
        let port: u16 = port
            .trim()
            .parse()
            .with_context(|| format!("PORT is not a valid port number: '{}'", port))?;
        let host = match self.server.bind.rsplit_once(':') {
            Some((host, _)) => host.to_string(),
            None => self.server.bind.clone(),
        };
        self.server.bind = format!("{}:{}", host, port);
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            bail!("chunking.chunk_size must be > 0");
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            bail!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunking.chunk_overlap,
                self.chunking.chunk_size
            );
        }

        if self.retrieval.top_k == 0 {
            bail!("retrieval.top_k must be >= 1");
        }

        match self.embedding.provider.as_str() {
            "local" | "ollama" | "disabled" => {}
            other => bail!(
                "Unknown embedding provider: '{}'. Must be local, ollama, or disabled.",
                other
            ),
        }
        if self.embedding.provider == "ollama" && self.embedding.model.is_none() {
            bail!("embedding.model must be specified when provider is 'ollama'");
        }
        if self.embedding.dims == Some(0) {
            bail!("embedding.dims must be > 0");
        }
        if self.embedding.batch_size == 0 {
            bail!("embedding.batch_size must be > 0");
        }

        match self.generation.provider.as_str() {
            "ollama" | "disabled" => {}
            other => bail!(
                "Unknown generation provider: '{}'. Must be ollama or disabled.",
                other
            ),
        }
        if self.generation.timeout_secs == 0 {
            bail!("generation.timeout_secs must be > 0");
        }

        Ok(())
    }
}

/// Load and validate the configuration file.
///
/// A missing file is not an error: the server runs on built-in defaults.
/// The `PORT` environment variable, when set, overrides the bind port.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| "Failed to parse config file")?
    } else {
        tracing::info!(path = %path.display(), "config file not found, using defaults");
        Config::default()
    };

    config.apply_port_override(std::env::var("PORT").ok().as_deref())?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.server.bind, "127.0.0.1:5000");
        assert_eq!(cfg.chunking.chunk_size, 500);
        assert_eq!(cfg.chunking.chunk_overlap, 100);
        assert_eq!(cfg.retrieval.top_k, 3);
        assert_eq!(cfg.generation.model, "mistral");
        assert_eq!(cfg.generation.url, "http://localhost:11434");
        assert!(cfg.seed.text.is_some());
        cfg.validate().unwrap();
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let cfg: Config = toml::from_str(
            r#"
[chunking]
chunk_size = 200

[embedding]
provider = "disabled"
"#,
        )
        .unwrap();
        assert_eq!(cfg.chunking.chunk_size, 200);
        assert_eq!(cfg.chunking.chunk_overlap, 100);
        assert_eq!(cfg.embedding.provider, "disabled");
        assert_eq!(cfg.retrieval.top_k, 3);
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk() {
        let mut cfg = Config::default();
        cfg.chunking.chunk_overlap = 500;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let mut cfg = Config::default();
        cfg.embedding.provider = "openai".to_string();
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.generation.provider = "cloud".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_port_override() {
        let mut cfg = Config::default();
        cfg.apply_port_override(Some("8080")).unwrap();
        assert_eq!(cfg.server.bind, "127.0.0.1:8080");
        cfg.apply_port_override(None).unwrap();
        assert_eq!(cfg.server.bind, "127.0.0.1:8080");
        assert!(cfg.apply_port_override(Some("http")).is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let cfg = load_config(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.chunking.chunk_size, 500);
    }

    #[test]
    fn test_invalid_file_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.toml");
        std::fs::write(&path, "[chunking]\nchunk_size = 0\n").unwrap();
        assert!(load_config(&path).is_err());
    }
}
