//! Event service facade
//!
//! Owns the database pool and the process-wide embedding model, and wires the
//! profile loader, recommender and join transaction together.

use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::info;
use uniconnect_common::config::{JoinConfig, ResolvedConfig};
use uniconnect_common::db::{init_database, DatabaseOptions};
use uniconnect_common::{Error, Result};
use uuid::Uuid;

use crate::db::participation::{join_event, JoinOutcome};
use crate::db::profile::{load_candidates, load_student_profile};
use crate::recommend::{recommend, EmbeddingService, RecommendOptions, Recommendations, SemanticScorer};

/// Shared state for recommendation and join requests
#[derive(Clone)]
pub struct EventService {
    pool: SqlitePool,
    embeddings: Arc<EmbeddingService>,
    join: JoinConfig,
}

impl EventService {
    pub fn new(pool: SqlitePool, embeddings: Arc<EmbeddingService>, join: JoinConfig) -> Self {
        Self {
            pool,
            embeddings,
            join,
        }
    }

    /// Open the configured database; the embedding model loads on first recommendation
    pub async fn from_config(config: &ResolvedConfig) -> Result<Self> {
        let options = DatabaseOptions {
            busy_timeout_ms: config.join.busy_timeout_ms,
            ..DatabaseOptions::default()
        };
        let pool = init_database(&config.database_path, &options).await?;
        let embeddings = Arc::new(EmbeddingService::new(config.semantic.clone()));

        info!(
            database = %config.database_path.display(),
            semantic_enabled = config.semantic.enabled,
            "Event service ready"
        );

        Ok(Self::new(pool, embeddings, config.join))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn embeddings(&self) -> &Arc<EmbeddingService> {
        &self.embeddings
    }

    /// Rank upcoming events the student has not joined
    ///
    /// Scoring (and the first-use model load) runs on the blocking pool.
    pub async fn recommend_for_student(
        &self,
        student_id: Uuid,
        options: RecommendOptions,
        today: NaiveDate,
    ) -> Result<Recommendations> {
        let profile = load_student_profile(&self.pool, student_id).await?;
        let candidates = load_candidates(&self.pool, &profile, today).await?;
        let embeddings = Arc::clone(&self.embeddings);

        let recommendations = tokio::task::spawn_blocking(move || {
            let scorer = SemanticScorer::new(&embeddings);
            recommend(
                &scorer,
                &profile.interest_tag_names,
                &profile.past_event_texts,
                &candidates,
                &options,
            )
        })
        .await
        .map_err(|e| Error::Internal(format!("Recommendation task failed: {}", e)))?;

        info!(
            student_id = %student_id,
            returned = recommendations.items.len(),
            method = ?recommendations.method,
            "Computed recommendations"
        );

        Ok(recommendations)
    }

    /// Join an event, waitlisting the student once it is full
    pub async fn join(&self, student_id: Uuid, event_id: Uuid) -> Result<JoinOutcome> {
        join_event(&self.pool, student_id, event_id, self.join.max_lock_wait_ms).await
    }
}
