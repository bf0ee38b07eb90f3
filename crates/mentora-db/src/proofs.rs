//! Study-case proof repository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use mentora_core::{Error, ProofContext, ProofRepository, Result};

/// PostgreSQL implementation of [`ProofRepository`].
#[derive(Clone)]
pub struct PgProofRepository {
    pool: Pool<Postgres>,
}

impl PgProofRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProofRepository for PgProofRepository {
    async fn fetch_for_grading(
        &self,
        chapter_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ProofContext>> {
        let row = sqlx::query(
            "SELECT p.chapter_id, p.user_id, p.proof_url, p.submission_note, \
                    p.approved, p.ai_score, p.ai_feedback, \
                    ch.content AS chapter_content, ch.score AS chapter_score, ch.course_id \
             FROM study_case_proof p \
             JOIN chapter ch ON ch.id = p.chapter_id \
             WHERE p.chapter_id = $1 AND p.user_id = $2",
        )
        .bind(chapter_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(|row| ProofContext {
            chapter_id: row.get("chapter_id"),
            user_id: row.get("user_id"),
            proof_url: row.get("proof_url"),
            submission_note: row.get("submission_note"),
            approved: row.get("approved"),
            ai_score: row.get("ai_score"),
            ai_feedback: row.get("ai_feedback"),
            chapter_content: row.get("chapter_content"),
            chapter_score: row.get("chapter_score"),
            course_id: row.get("course_id"),
        }))
    }

    async fn update_verdict(
        &self,
        chapter_id: Uuid,
        user_id: Uuid,
        ai_score: i32,
        ai_feedback: &str,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE study_case_proof \
             SET ai_score = $1, ai_feedback = $2, updated_at = $3 \
             WHERE chapter_id = $4 AND user_id = $5",
        )
        .bind(ai_score)
        .bind(ai_feedback)
        .bind(Utc::now())
        .bind(chapter_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!(
                "proof for chapter {chapter_id} user {user_id}"
            )));
        }
        Ok(())
    }

    async fn reject(
        &self,
        chapter_id: Uuid,
        user_id: Uuid,
        ai_score: i32,
        ai_feedback: &str,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE study_case_proof \
             SET approved = FALSE, ai_score = $1, ai_feedback = $2, updated_at = $3 \
             WHERE chapter_id = $4 AND user_id = $5",
        )
        .bind(ai_score)
        .bind(ai_feedback)
        .bind(Utc::now())
        .bind(chapter_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!(
                "proof for chapter {chapter_id} user {user_id}"
            )));
        }
        Ok(())
    }

    async fn upsert_submission(
        &self,
        chapter_id: Uuid,
        user_id: Uuid,
        proof_url: &str,
        submission_note: &str,
    ) -> Result<()> {
        // Re-submission resets the verdict fields; the subsequent grading
        // job re-evaluates from scratch.
        sqlx::query(
            "INSERT INTO study_case_proof \
                 (chapter_id, user_id, proof_url, submission_note) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (chapter_id, user_id) DO UPDATE \
             SET proof_url = EXCLUDED.proof_url, \
                 submission_note = EXCLUDED.submission_note, \
                 approved = FALSE, \
                 ai_score = 0, \
                 ai_feedback = NULL, \
                 updated_at = now()",
        )
        .bind(chapter_id)
        .bind(user_id)
        .bind(proof_url)
        .bind(submission_note)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(())
    }
}
