//! Text cleaning, word chunking and tokenization.
//!
//! Turns raw extractor output into the per-file [`TokenRecord`]:
//!
//! 1. [`clean_text`] removes extraction noise (non-printable bytes, runs of
//!    repeated characters, irregular whitespace).
//! 2. [`chunk_words`] splits the cleaned text into windows of at most
//!    `max_words` words.
//! 3. [`tokenize`] extracts case-folded word tokens from every chunk.
//!
//! Chunking is total: empty input yields no chunks, input with at most
//! `max_words` words yields exactly one.

use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::models::{SourceFile, TokenRecord};

/// Tokens shorter than this are discarded.
pub const MIN_TOKEN_LEN: usize = 2;
/// Tokens longer than this are treated as noise.
pub const MAX_TOKEN_LEN: usize = 50;
/// Runs longer than this many identical characters collapse to one.
const MAX_REPEAT: usize = 10;

/// Word extraction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenizerKind {
    /// Alphabetic words only (`\b[a-zA-Z]+\b`).
    #[default]
    Alphabetic,
    /// Whitespace split after dropping everything but word characters and
    /// common punctuation.
    Simple,
}

/// Parameters for [`build_record`].
#[derive(Debug, Clone)]
pub struct ChunkOptions {
    pub max_words: usize,
    pub sample_tokens: usize,
    /// Maximum chunks kept on the record; `0` keeps all.
    pub stored_chunks: usize,
    pub tokenizer: TokenizerKind,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            max_words: 512,
            sample_tokens: 50,
            stored_chunks: 0,
            tokenizer: TokenizerKind::Alphabetic,
        }
    }
}

fn alphabetic_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[a-zA-Z]+\b").expect("static regex"))
}

fn simple_strip_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s.,!?;:\-()]").expect("static regex"))
}

/// Normalize extracted text for chunking.
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if !(' '..='~').contains(&c) {
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(c);
    }

    collapse_repeats(&out).trim().to_string()
}

/// Replace every run of more than [`MAX_REPEAT`] identical characters with a
/// single occurrence.
fn collapse_repeats(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let mut run = 1;
        while i + run < chars.len() && chars[i + run] == c {
            run += 1;
        }
        if run > MAX_REPEAT {
            out.push(c);
        } else {
            out.extend(std::iter::repeat(c).take(run));
        }
        i += run;
    }
    out
}

/// Split text into chunks of at most `max_words` whitespace-separated words.
pub fn chunk_words(text: &str, max_words: usize) -> Vec<String> {
    let max_words = max_words.max(1);
    let words: Vec<&str> = text.split_whitespace().collect();
    words
        .chunks(max_words)
        .map(|window| window.join(" "))
        .collect()
}

/// Extract case-folded tokens, preserving order.
pub fn tokenize(text: &str, kind: TokenizerKind) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let raw: Vec<String> = match kind {
        TokenizerKind::Alphabetic => {
            let lower = text.to_lowercase();
            alphabetic_re()
                .find_iter(&lower)
                .map(|m| m.as_str().to_string())
                .collect()
        }
        TokenizerKind::Simple => simple_strip_re()
            .replace_all(text, " ")
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .collect(),
    };

    raw.into_iter()
        .filter(|t| (MIN_TOKEN_LEN..=MAX_TOKEN_LEN).contains(&t.chars().count()))
        .collect()
}

/// Clean, chunk and tokenize one extracted file.
pub fn build_record(source: &SourceFile, opts: &ChunkOptions) -> TokenRecord {
    let cleaned = clean_text(&source.raw_text);
    let mut chunks = chunk_words(&cleaned, opts.max_words);
    let num_chunks = chunks.len();

    let tokens: Vec<String> = chunks
        .iter()
        .flat_map(|c| tokenize(c, opts.tokenizer))
        .collect();
    let unique: HashSet<&str> = tokens.iter().map(String::as_str).collect();
    let unique_token_count = unique.len();

    if opts.stored_chunks > 0 {
        chunks.truncate(opts.stored_chunks);
    }

    TokenRecord {
        filename: source.filename.clone(),
        category: source.category.clone(),
        file_type: source.file_type.as_extension().to_string(),
        original_size_bytes: source.size_bytes,
        text_length: cleaned.chars().count(),
        num_chunks,
        total_token_count: tokens.len(),
        unique_token_count,
        chunks,
        sample_tokens: tokens.into_iter().take(opts.sample_tokens).collect(),
    }
}
