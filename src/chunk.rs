//! Recursive character text segmenter.
//!
//! Splits raw text into overlapping chunks of at most `chunk_size`
//! characters. Splitting prefers paragraph breaks (`\n\n`), then line breaks,
//! then spaces, and only falls back to single characters when a piece has no
//! coarser boundary. Consecutive chunks share up to `chunk_overlap`
//! characters so a sentence cut at a chunk edge still appears whole in one of
//! its neighbours.
//!
//! All lengths are counted in `char`s, so multi-byte text is never split
//! inside a character. Every chunk is whitespace-trimmed and chunks that are
//! empty after trimming are dropped: `segment("")` and `segment("  \n")`
//! both return no chunks, and any text shorter than `chunk_size` returns a
//! single chunk equal to the trimmed text.

use anyhow::{bail, Result};

/// Separators tried in order; `""` means "split into single characters".
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Deterministic, order-preserving text splitter.
#[derive(Debug, Clone)]
pub struct Segmenter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Segmenter {
    /// Create a segmenter.
    ///
    /// # Errors
    ///
    /// Returns an error if `chunk_size` is zero or `chunk_overlap` is not
    /// strictly smaller than `chunk_size` (the split would not make forward
    /// progress).
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            bail!("chunk_size must be > 0");
        }
        if chunk_overlap >= chunk_size {
            bail!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap,
                chunk_size
            );
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    /// Split `text` into chunks, in source order.
    pub fn segment(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        self.split_recursive(text, &SEPARATORS)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        // Pick the first separator that occurs in the text; the rest are
        // kept for pieces that are still too long.
        let mut separator = "";
        let mut remaining: &[&str] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() {
                separator = sep;
                break;
            }
            if text.contains(sep) {
                separator = sep;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                chunks.extend(self.merge(&pending));
                pending.clear();
            }
            if remaining.is_empty() {
                push_trimmed(&mut chunks, piece);
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }

        if !pending.is_empty() {
            chunks.extend(self.merge(&pending));
        }

        chunks
    }

    /// Greedily merge short pieces into chunks, carrying up to
    /// `chunk_overlap` characters from the tail of each chunk into the next.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: Vec<(&str, usize)> = Vec::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                push_trimmed(&mut chunks, &join(&window));
                while total > self.chunk_overlap
                    || (total + len > self.chunk_size && total > 0)
                {
                    let (_, first_len) = window.remove(0);
                    total -= first_len;
                }
            }
            window.push((piece, len));
            total += len;
        }

        if !window.is_empty() {
            push_trimmed(&mut chunks, &join(&window));
        }

        chunks
    }
}

impl Default for Segmenter {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 100,
        }
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn join(window: &[(&str, usize)]) -> String {
    window.iter().map(|(piece, _)| *piece).collect()
}

fn push_trimmed(chunks: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

/// Split `text` on `separator`, attaching each separator to the start of the
/// piece that follows it. Concatenating the result reproduces `text`.
/// An empty separator splits into single characters.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (pos, _) in text.match_indices(separator) {
        if pos > start {
            pieces.push(&text[start..pos]);
        }
        start = pos;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces.retain(|p| !p.is_empty());
    pieces
}
