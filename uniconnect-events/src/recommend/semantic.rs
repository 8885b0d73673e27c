//! Semantic scoring with averaged word embeddings
//!
//! Event text and each interest text are embedded as the mean of their known
//! word vectors and compared by cosine similarity. The strongest single
//! interest match counts, blended with a capped tag-overlap bonus:
//!
//! `score = 0.7 * max_similarity + min(0.05 * tag_overlap, 0.3)`
//!
//! Whenever semantic scoring cannot run (no model, no interests, event text
//! with no known words, or a numeric failure) the score is
//! `0.1 * tag_overlap` instead. Nothing here returns an error to the caller.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use super::embedding::{EmbeddingService, WordVectors};

/// Weight of the best cosine similarity
pub const SEMANTIC_WEIGHT: f64 = 0.7;
/// Bonus per shared tag when semantic scoring runs
pub const TAG_BONUS_PER_MATCH: f64 = 0.05;
/// Cap on the tag bonus
pub const TAG_BONUS_CAP: f64 = 0.3;
/// Weight per shared tag on the tag-only path (uncapped)
pub const TAG_ONLY_WEIGHT: f64 = 0.1;

/// Mean word vector of a text
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn dim(&self) -> usize {
        self.0.len()
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|value| value.is_finite())
    }
}

/// Numeric failures inside similarity math
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ComputeError {
    #[error("embedding dimensions differ: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    #[error("similarity is not a finite number")]
    NonFinite,
}

/// Lowercase and collapse whitespace runs
pub fn preprocess(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Mean vector of the tokens of `text` that the model knows
///
/// `None` when no token is known (including empty text).
pub fn embed(vectors: &WordVectors, text: &str) -> Option<Embedding> {
    let text = preprocess(text);
    let mut sum = vec![0f64; vectors.dim()];
    let mut found = 0usize;

    for token in text.split(' ') {
        if let Some(vector) = vectors.get(token) {
            for (acc, value) in sum.iter_mut().zip(vector) {
                *acc += f64::from(*value);
            }
            found += 1;
        }
    }

    if found == 0 {
        return None;
    }
    let count = found as f64;
    Some(Embedding(sum.into_iter().map(|v| (v / count) as f32).collect()))
}

/// Cosine similarity that reports numeric problems
///
/// A zero-norm input yields `Ok(0.0)`.
pub fn try_cosine(u: &Embedding, v: &Embedding) -> Result<f64, ComputeError> {
    if u.dim() != v.dim() {
        return Err(ComputeError::DimensionMismatch {
            left: u.dim(),
            right: v.dim(),
        });
    }

    let mut dot = 0f64;
    let mut norm_u = 0f64;
    let mut norm_v = 0f64;
    for (a, b) in u.0.iter().zip(&v.0) {
        let (a, b) = (f64::from(*a), f64::from(*b));
        dot += a * b;
        norm_u += a * a;
        norm_v += b * b;
    }

    if norm_u == 0.0 || norm_v == 0.0 {
        return Ok(0.0);
    }
    let similarity = dot / (norm_u.sqrt() * norm_v.sqrt());
    if similarity.is_finite() {
        Ok(similarity)
    } else {
        Err(ComputeError::NonFinite)
    }
}

/// Cosine similarity; 0.0 when either side is missing or degenerate
pub fn cosine(u: Option<&Embedding>, v: Option<&Embedding>) -> f64 {
    match (u, v) {
        (Some(u), Some(v)) => try_cosine(u, v).unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Score used whenever semantic scoring does not run
pub fn tag_only_score(tag_overlap: u32) -> f64 {
    f64::from(tag_overlap) * TAG_ONLY_WEIGHT
}

/// `0.7 * max_similarity + min(0.05 * tag_overlap, 0.3)`
pub fn blended_score(max_similarity: f64, tag_overlap: u32) -> f64 {
    SEMANTIC_WEIGHT * max_similarity + (f64::from(tag_overlap) * TAG_BONUS_PER_MATCH).min(TAG_BONUS_CAP)
}

/// Interest texts embedded once for reuse across candidates
#[derive(Debug, Clone)]
pub struct PreparedInterests {
    vectors: Arc<WordVectors>,
    embeddings: Vec<Embedding>,
}

impl PreparedInterests {
    /// Interests that had at least one known word
    pub fn embedded_count(&self) -> usize {
        self.embeddings.len()
    }
}

/// Per-event scorer backed by an [`EmbeddingService`]
pub struct SemanticScorer<'a> {
    service: &'a EmbeddingService,
}

impl<'a> SemanticScorer<'a> {
    pub fn new(service: &'a EmbeddingService) -> Self {
        Self { service }
    }

    /// Embed interest texts, or `None` if semantic scoring cannot run
    /// (model unavailable or no interest texts)
    ///
    /// Texts with no known words, or a non-finite mean vector, are skipped.
    pub fn prepare<S: AsRef<str>>(&self, interest_texts: &[S]) -> Option<PreparedInterests> {
        if interest_texts.is_empty() {
            return None;
        }
        let vectors = self.service.model()?;
        let embeddings = interest_texts
            .iter()
            .filter_map(|text| embed(&vectors, text.as_ref()))
            .filter(Embedding::is_finite)
            .collect();
        Some(PreparedInterests {
            vectors,
            embeddings,
        })
    }

    /// Score one event against raw interest texts
    pub fn score<S: AsRef<str>>(&self, event_text: &str, interest_texts: &[S], tag_overlap: u32) -> f64 {
        match self.prepare(interest_texts) {
            Some(prepared) => self.score_prepared(event_text, &prepared, tag_overlap),
            None => tag_only_score(tag_overlap),
        }
    }

    /// Score one event against pre-embedded interests
    pub fn score_prepared(&self, event_text: &str, prepared: &PreparedInterests, tag_overlap: u32) -> f64 {
        match semantic_score(event_text, prepared, tag_overlap) {
            Ok(Some(score)) => score,
            Ok(None) => tag_only_score(tag_overlap),
            Err(e) => {
                debug!(error = %e, "Semantic scoring failed, using tag-only score");
                tag_only_score(tag_overlap)
            }
        }
    }
}

/// `Ok(None)` when the event text has no known words
fn semantic_score(
    event_text: &str,
    prepared: &PreparedInterests,
    tag_overlap: u32,
) -> Result<Option<f64>, ComputeError> {
    let Some(event_embedding) = embed(&prepared.vectors, event_text) else {
        return Ok(None);
    };

    // Starts at 0.0: negative similarities never pull the score below the tag bonus
    let mut max_similarity = 0f64;
    for interest in &prepared.embeddings {
        let similarity = try_cosine(&event_embedding, interest)?;
        max_similarity = max_similarity.max(similarity);
    }

    let score = blended_score(max_similarity, tag_overlap);
    if score.is_finite() {
        Ok(Some(score))
    } else {
        Err(ComputeError::NonFinite)
    }
}
