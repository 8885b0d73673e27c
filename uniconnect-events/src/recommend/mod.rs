//! Hybrid event recommendation
//!
//! Ranks candidate events for a student by combining tag overlap (always
//! available) with word-embedding similarity (only when a model is loaded).
//!
//! - [`tag_overlap`]: shared-tag counting
//! - [`embedding`]: word vector model and its one-shot lazy loader
//! - [`semantic`]: text embedding, cosine similarity, per-event scoring
//! - [`blend`]: ranking and top-k selection

pub mod blend;
pub mod embedding;
pub mod semantic;
pub mod tag_overlap;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use blend::recommend;
pub use embedding::{EmbeddingService, ModelLoadError, ModelStatus, WordVectors};
pub use semantic::{cosine, embed, Embedding, PreparedInterests, SemanticScorer};
pub use tag_overlap::{student_tag_union, tag_overlap};

/// An event that may be recommended; never mutated by scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateEvent {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// Shared tags with the student's interests and history
    pub tag_overlap: u32,
    /// Secondary key for [`TieBreak::Popularity`]
    #[serde(default)]
    pub participants_count: u32,
    /// Secondary key for [`TieBreak::Soonest`]
    #[serde(default)]
    pub event_date: Option<NaiveDate>,
}

impl CandidateEvent {
    pub fn new(
        id: Uuid,
        title: impl Into<String>,
        description: impl Into<String>,
        tag_overlap: u32,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
            tag_overlap,
            participants_count: 0,
            event_date: None,
        }
    }

    /// Title and description joined by a single space
    pub fn text(&self) -> String {
        format!("{} {}", self.title, self.description)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredEvent {
    pub id: Uuid,
    pub score: f64,
}

/// Which scoring path produced a ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationMethod {
    /// Word-embedding similarity blended with a capped tag bonus
    Semantic,
    /// Tag overlap only (no model, or no interests to compare against)
    TagOnly,
}

/// Secondary ordering for equal scores on the tag-only path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Keep the order candidates were supplied in
    #[default]
    CandidateOrder,
    /// More participants first
    Popularity,
    /// Earlier date first; undated candidates last
    Soonest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendOptions {
    pub top_k: usize,
    #[serde(default)]
    pub tie_break: TieBreak,
}

impl Default for RecommendOptions {
    fn default() -> Self {
        Self {
            top_k: 50,
            tie_break: TieBreak::CandidateOrder,
        }
    }
}

/// Ranked output, best first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    pub items: Vec<ScoredEvent>,
    pub method: RecommendationMethod,
}

impl Recommendations {
    pub fn ids(&self) -> Vec<Uuid> {
        self.items.iter().map(|item| item.id).collect()
    }
}
