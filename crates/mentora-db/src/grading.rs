//! Atomic application of an approving grading verdict.
//!
//! Approval touches four entities (proof, user, enrollment, progress) and
//! may additionally complete the course. All of it happens inside a single
//! transaction: a failure at any step rolls back every write, so points can
//! never be awarded without progress marked or vice versa.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use tracing::{info, instrument};
use uuid::Uuid;

use mentora_core::{new_certificate_id, ApprovalOutcome, Error, GradingRepository, Result};

/// PostgreSQL implementation of [`GradingRepository`].
#[derive(Clone)]
pub struct PgGradingRepository {
    pool: Pool<Postgres>,
}

impl PgGradingRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GradingRepository for PgGradingRepository {
    #[instrument(
        skip(self, ai_feedback),
        fields(subsystem = "db", component = "grading", op = "approve")
    )]
    async fn approve(
        &self,
        chapter_id: Uuid,
        user_id: Uuid,
        ai_score: i32,
        ai_feedback: &str,
    ) -> Result<ApprovalOutcome> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        // Lock the proof row for the whole transition. The re-check of
        // `approved` under the lock serializes concurrent approvals for the
        // same proof: the loser of the race sees approved = TRUE and
        // degenerates to a verdict-only update.
        let row = sqlx::query(
            "SELECT p.approved, ch.score AS chapter_score, ch.course_id \
             FROM study_case_proof p \
             JOIN chapter ch ON ch.id = p.chapter_id \
             WHERE p.chapter_id = $1 AND p.user_id = $2 \
             FOR UPDATE OF p",
        )
        .bind(chapter_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::Database)?;

        let row = row.ok_or_else(|| {
            Error::NotFound(format!("proof for chapter {chapter_id} user {user_id}"))
        })?;

        let already_approved: bool = row.get("approved");
        let points: i32 = row.get("chapter_score");
        let course_id: Uuid = row.get("course_id");

        if already_approved {
            sqlx::query(
                "UPDATE study_case_proof \
                 SET ai_score = $1, ai_feedback = $2, updated_at = $3 \
                 WHERE chapter_id = $4 AND user_id = $5",
            )
            .bind(ai_score)
            .bind(ai_feedback)
            .bind(now)
            .bind(chapter_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

            tx.commit().await.map_err(Error::Database)?;
            return Ok(ApprovalOutcome {
                points_awarded: 0,
                course_completed: false,
                certificate_id: None,
            });
        }

        // (a) approve the proof and store the verdict
        sqlx::query(
            "UPDATE study_case_proof \
             SET approved = TRUE, ai_score = $1, ai_feedback = $2, updated_at = $3 \
             WHERE chapter_id = $4 AND user_id = $5",
        )
        .bind(ai_score)
        .bind(ai_feedback)
        .bind(now)
        .bind(chapter_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        // (b) award the user
        let updated = sqlx::query(
            "UPDATE app_user SET total_score = total_score + $1 WHERE id = $2",
        )
        .bind(points)
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;
        if updated.rows_affected() == 0 {
            return Err(Error::NotFound(format!("user {user_id}")));
        }

        // (c) award the enrollment
        let updated = sqlx::query(
            "UPDATE selected_course SET user_score = user_score + $1 \
             WHERE user_id = $2 AND course_id = $3",
        )
        .bind(points)
        .bind(user_id)
        .bind(course_id)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;
        if updated.rows_affected() == 0 {
            return Err(Error::NotFound(format!(
                "enrollment for user {user_id} course {course_id}"
            )));
        }

        // (d) mark the chapter progress done
        let updated = sqlx::query(
            "UPDATE chapter_progress SET is_done = TRUE \
             WHERE user_id = $1 AND chapter_id = $2",
        )
        .bind(user_id)
        .bind(chapter_id)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;
        if updated.rows_affected() == 0 {
            return Err(Error::NotFound(format!(
                "progress for user {user_id} chapter {chapter_id}"
            )));
        }

        // (e) completion check, reading the progress row written above in
        // the same transaction
        let (total_chapters, done_chapters): (i64, i64) = sqlx::query_as(
            "SELECT \
                (SELECT COUNT(*) FROM chapter WHERE course_id = $1), \
                (SELECT COUNT(*) FROM chapter_progress cp \
                 JOIN chapter ch ON ch.id = cp.chapter_id \
                 WHERE ch.course_id = $1 AND cp.user_id = $2 AND cp.is_done)",
        )
        .bind(course_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(Error::Database)?;

        let mut course_completed = false;
        let mut certificate_id = None;

        if total_chapters > 0 && total_chapters == done_chapters {
            let existing: Option<String> = sqlx::query_scalar(
                "SELECT certificate_id FROM selected_course \
                 WHERE user_id = $1 AND course_id = $2",
            )
            .bind(user_id)
            .bind(course_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(Error::Database)?;

            let cert = existing.unwrap_or_else(new_certificate_id);
            sqlx::query(
                "UPDATE selected_course \
                 SET is_completed = TRUE, certificate_id = $1 \
                 WHERE user_id = $2 AND course_id = $3",
            )
            .bind(&cert)
            .bind(user_id)
            .bind(course_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

            course_completed = true;
            certificate_id = Some(cert);
        }

        tx.commit().await.map_err(Error::Database)?;

        info!(
            chapter_id = %chapter_id,
            user_id = %user_id,
            points_awarded = points,
            course_completed,
            "Approval transaction committed"
        );

        Ok(ApprovalOutcome {
            points_awarded: points,
            course_completed,
            certificate_id,
        })
    }
}
