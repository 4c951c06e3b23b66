// src/study/mod.rs
// Study-guide completion tracking with optimistic toggles.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

type GuideKey = (String, String);

/// Tracks which study-guide sections a user has completed.
///
/// Reads are served from an in-memory view primed from the row store;
/// `toggle_completion` applies the flip to that view first, attempts the
/// durable write, and reverts to the pre-toggle state if the write fails.
#[derive(Clone)]
pub struct StudyProgressStore {
    pool: SqlitePool,
    completed: Arc<RwLock<HashMap<GuideKey, HashSet<String>>>>,
}

impl StudyProgressStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            completed: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Flip a section's completion state. Returns the new state.
    pub async fn toggle_completion(
        &self,
        user_id: &str,
        guide_slug: &str,
        section_id: &str,
    ) -> Result<bool> {
        self.ensure_primed(user_id, guide_slug).await?;
        let key = (user_id.to_string(), guide_slug.to_string());

        // Speculative apply; the snapshot to restore is just the inverse flip.
        let now_completed = {
            let mut completed = self.completed.write().await;
            let sections = completed.entry(key.clone()).or_default();
            if sections.remove(section_id) {
                false
            } else {
                sections.insert(section_id.to_string());
                true
            }
        };

        let write = sqlx::query(
            r#"INSERT INTO study_progress (user_id, guide_slug, section_id, completed, updated_at)
               VALUES ($1, $2, $3, $4, $5)
               ON CONFLICT(user_id, guide_slug, section_id) DO UPDATE SET
                   completed = excluded.completed,
                   updated_at = excluded.updated_at"#,
        )
        .bind(user_id)
        .bind(guide_slug)
        .bind(section_id)
        .bind(now_completed)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await;

        if let Err(e) = write {
            warn!(user_id = %user_id, guide = %guide_slug, section = %section_id,
                  "progress write failed, reverting");
            let mut completed = self.completed.write().await;
            let sections = completed.entry(key).or_default();
            if now_completed {
                sections.remove(section_id);
            } else {
                sections.insert(section_id.to_string());
            }
            return Err(e).context("failed to persist study progress");
        }

        Ok(now_completed)
    }

    /// Completed section ids for one guide, sorted for stable output.
    pub async fn load_progress(&self, user_id: &str, guide_slug: &str) -> Result<Vec<String>> {
        self.ensure_primed(user_id, guide_slug).await?;

        let completed = self.completed.read().await;
        let mut sections: Vec<String> = completed
            .get(&(user_id.to_string(), guide_slug.to_string()))
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default();
        sections.sort();
        Ok(sections)
    }

    /// Load the durable state into the in-memory view on first access.
    async fn ensure_primed(&self, user_id: &str, guide_slug: &str) -> Result<()> {
        let key = (user_id.to_string(), guide_slug.to_string());
        {
            let completed = self.completed.read().await;
            if completed.contains_key(&key) {
                return Ok(());
            }
        }

        let rows: Vec<(String,)> = sqlx::query_as(
            r#"SELECT section_id FROM study_progress
               WHERE user_id = $1 AND guide_slug = $2 AND completed = 1"#,
        )
        .bind(user_id)
        .bind(guide_slug)
        .fetch_all(&self.pool)
        .await?;

        let mut completed = self.completed.write().await;
        completed
            .entry(key)
            .or_insert_with(|| rows.into_iter().map(|(s,)| s).collect());
        Ok(())
    }
}
