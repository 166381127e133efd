//! Seed documents and file-type filtering.
//!
//! The corpus is seeded once at startup from the configured seed text and
//! from every matching file under `[seed].dirs`. The same `.txt` rule that
//! governs uploads decides which files are indexable.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;
use walkdir::WalkDir;

use crate::config::SeedConfig;

/// Extensions accepted for indexing (compared case-insensitively).
pub const ALLOWED_EXTENSIONS: &[&str] = &["txt"];

/// Whether a file name has an indexable extension.
pub fn is_allowed_file(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((_, ext)) => ALLOWED_EXTENSIONS
            .iter()
            .any(|allowed| ext.eq_ignore_ascii_case(allowed)),
        None => false,
    }
}

/// Collect the seed document set: the configured seed text first, then
/// seed directory files in path order.
pub fn load_seed_documents(config: &SeedConfig) -> Result<Vec<String>> {
    let mut docs = Vec::new();

    if let Some(text) = &config.text {
        if !text.trim().is_empty() {
            docs.push(text.clone());
        }
    }

    if config.dirs.is_empty() {
        return Ok(docs);
    }

    let include_set = build_globset(&config.include_globs)?;
    let exclude_set = build_globset(&config.exclude_globs)?;

    for root in &config.dirs {
        docs.extend(scan_dir(root, &include_set, &exclude_set, config.follow_symlinks)?);
    }

    Ok(docs)
}

fn scan_dir(
    root: &Path,
    include_set: &GlobSet,
    exclude_set: &GlobSet,
    follow_symlinks: bool,
) -> Result<Vec<String>> {
    if !root.exists() {
        bail!("Seed directory does not exist: {}", root.display());
    }

    let mut docs = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(follow_symlinks)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }
        if !is_allowed_file(&rel_str) {
            tracing::warn!(file = %rel_str, "skipping seed file: unsupported file type");
            continue;
        }

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read seed file: {}", path.display()))?;
        docs.push(text);
    }

    tracing::info!(dir = %root.display(), files = docs.len(), "loaded seed directory");
    Ok(docs)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("Invalid glob: {}", pattern))?);
    }
    Ok(builder.build()?)
}
