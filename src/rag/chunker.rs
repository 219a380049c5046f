//! Text chunking for document processing.
//!
//! Three strategies split extracted pages into embedding-sized pieces:
//! - **Semantic**: split at sentence boundaries where the embedding
//!   distance between neighbors exceeds a percentile threshold
//! - **Sentence-based**: greedy sentence accumulation under a character
//!   budget
//! - **Simple**: newline-delimited accumulation up to the chunk size
//!
//! Every strategy preserves the first page's metadata as a base and adds
//! `chunk_index`, `chunk_size` and `chunking_method`; empty chunks are
//! skipped. The semantic strategy needs an embedding provider and falls
//! back to simple (with a warning) when the provider fails.

use std::str::FromStr;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::ingest::parser::ParsedPage;
use crate::llm::{EmbedKind, Provider};

/// Percentile of neighbor distances above which a semantic split happens.
const BREAKPOINT_PERCENTILE: f64 = 95.0;

// ============================================================================
// Chunking Method
// ============================================================================

/// Available chunking strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChunkingMethod {
    /// Embedding-guided splits at semantic boundaries.
    #[default]
    Semantic,
    /// Sentence accumulation under a size budget.
    SentenceBased,
    /// Delimiter-based accumulation.
    Simple,
}

impl FromStr for ChunkingMethod {
    type Err = std::convert::Infallible;

    /// Unknown method names select the simple strategy, matching the
    /// permissive request handling of the processing endpoint.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "semantic" => Self::Semantic,
            "sentence" | "sentence_based" => Self::SentenceBased,
            _ => Self::Simple,
        })
    }
}

impl std::fmt::Display for ChunkingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Semantic => "semantic",
            Self::SentenceBased => "sentence_based",
            Self::Simple => "simple",
        };
        write!(f, "{}", name)
    }
}

// ============================================================================
// Chunk Result
// ============================================================================

/// A single chunk with augmented metadata.
#[derive(Debug, Clone)]
pub struct ChunkedDocument {
    pub page_content: String,
    pub metadata: Value,
}

// ============================================================================
// Chunker
// ============================================================================

/// Splits parsed pages into chunks using the requested strategy.
pub struct Chunker {
    provider: Arc<dyn Provider>,
}

impl Chunker {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    /// Chunk the pages. `overlap_size` is accepted for wire compatibility
    /// but no strategy emits overlapping windows.
    pub async fn chunk(
        &self,
        pages: &[ParsedPage],
        method: ChunkingMethod,
        chunk_size: usize,
        _overlap_size: usize,
    ) -> Vec<ChunkedDocument> {
        if pages.is_empty() {
            return vec![];
        }

        let texts: Vec<&str> = pages.iter().map(|p| p.page_content.as_str()).collect();
        let base_metadata = base_metadata(pages);

        match method {
            ChunkingMethod::Semantic => {
                match self.chunk_semantic(&texts, &base_metadata).await {
                    Some(chunks) => chunks,
                    None => {
                        tracing::warn!("semantic chunking unavailable, falling back to simple");
                        chunk_simple(&texts, &base_metadata, chunk_size)
                    }
                }
            }
            ChunkingMethod::SentenceBased => {
                chunk_by_sentences(&texts, &base_metadata, chunk_size)
            }
            ChunkingMethod::Simple => chunk_simple(&texts, &base_metadata, chunk_size),
        }
    }

    /// Semantic strategy; `None` signals the caller to fall back.
    async fn chunk_semantic(
        &self,
        texts: &[&str],
        base_metadata: &Map<String, Value>,
    ) -> Option<Vec<ChunkedDocument>> {
        let combined = texts.join("\n\n");
        let sentences = split_sentences(&combined);

        if sentences.len() <= 1 {
            return Some(finish_chunks(
                sentences.into_iter().collect(),
                base_metadata,
                ChunkingMethod::Semantic,
            ));
        }

        let inputs: Vec<String> = sentences.clone();
        let vectors = match self.provider.embed(&inputs, EmbedKind::Document).await {
            Ok(vectors) => vectors,
            Err(_) => return None,
        };

        if vectors.len() != sentences.len() {
            return None;
        }

        // Distance between each consecutive sentence pair
        let distances: Vec<f64> = vectors
            .windows(2)
            .map(|pair| 1.0 - cosine_similarity(&pair[0], &pair[1]) as f64)
            .collect();

        let threshold = percentile(&distances, BREAKPOINT_PERCENTILE);

        let mut groups: Vec<String> = Vec::new();
        let mut current: Vec<&str> = vec![&sentences[0]];
        for (i, distance) in distances.iter().enumerate() {
            if *distance > threshold {
                groups.push(current.join(" "));
                current = Vec::new();
            }
            current.push(&sentences[i + 1]);
        }
        if !current.is_empty() {
            groups.push(current.join(" "));
        }

        Some(finish_chunks(groups, base_metadata, ChunkingMethod::Semantic))
    }
}

// ============================================================================
// Strategy implementations
// ============================================================================

/// Newline-delimited accumulation up to `chunk_size` characters.
fn chunk_simple(
    texts: &[&str],
    base_metadata: &Map<String, Value>,
    chunk_size: usize,
) -> Vec<ChunkedDocument> {
    let full_text = texts.join(" ");

    let lines: Vec<&str> = full_text
        .split('\n')
        .map(str::trim)
        .filter(|line| line.len() > 1)
        .collect();

    let mut raw_chunks = Vec::new();
    let mut current = String::new();

    for line in lines {
        current.push_str(line);
        current.push('\n');
        if current.len() >= chunk_size.max(1) {
            raw_chunks.push(current.trim().to_string());
            current.clear();
        }
    }
    if !current.trim().is_empty() {
        raw_chunks.push(current.trim().to_string());
    }

    finish_chunks(raw_chunks, base_metadata, ChunkingMethod::Simple)
}

/// Greedy sentence accumulation under `max_chunk_size` characters.
fn chunk_by_sentences(
    texts: &[&str],
    base_metadata: &Map<String, Value>,
    max_chunk_size: usize,
) -> Vec<ChunkedDocument> {
    let combined = texts.join(" ");

    let sentences = combined
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let mut raw_chunks = Vec::new();
    let mut current = String::new();

    for sentence in sentences {
        if !current.is_empty() && current.len() + sentence.len() > max_chunk_size.max(1) {
            raw_chunks.push(current.trim().to_string());
            current = sentence.to_string();
        } else if current.is_empty() {
            current = sentence.to_string();
        } else {
            current.push(' ');
            current.push_str(sentence);
        }
    }
    if !current.trim().is_empty() {
        raw_chunks.push(current.trim().to_string());
    }

    finish_chunks(raw_chunks, base_metadata, ChunkingMethod::SentenceBased)
}

// ============================================================================
// Helpers
// ============================================================================

fn base_metadata(pages: &[ParsedPage]) -> Map<String, Value> {
    pages
        .first()
        .and_then(|page| page.metadata.as_object().cloned())
        .unwrap_or_default()
}

/// Attach chunk metadata, dropping empty chunks. The base metadata is
/// preserved; `chunk_index`, `chunk_size` and `chunking_method` are
/// added on top.
fn finish_chunks(
    raw_chunks: Vec<String>,
    base_metadata: &Map<String, Value>,
    method: ChunkingMethod,
) -> Vec<ChunkedDocument> {
    raw_chunks
        .into_iter()
        .filter(|text| !text.trim().is_empty())
        .enumerate()
        .map(|(index, text)| {
            let text = text.trim().to_string();
            let mut metadata = base_metadata.clone();
            metadata.insert("chunk_index".to_string(), json!(index));
            metadata.insert("chunk_size".to_string(), json!(text.len()));
            metadata.insert("chunking_method".to_string(), json!(method.to_string()));
            ChunkedDocument {
                page_content: text,
                metadata: Value::Object(metadata),
            }
        })
        .collect()
}

/// Split into sentences at terminal punctuation, keeping the punctuation
/// with its sentence.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            let sentence = current.trim().to_string();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            current.clear();
        }
    }

    let tail = current.trim().to_string();
    if !tail.is_empty() {
        sentences.push(tail);
    }

    sentences
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}

/// Percentile over unsorted samples (nearest-rank on a sorted copy).
fn percentile(samples: &[f64], p: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = ((p / 100.0) * (sorted.len() as f64 - 1.0)).round() as usize;
    sorted[rank.min(sorted.len() - 1)]
}

// ============================================================================
// Tests
// ============================================================================
