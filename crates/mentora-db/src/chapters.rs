//! Chapter repository: the reads and writes the content worker touches.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use mentora_core::{ChapterContext, ChapterRepository, Error, Result, VideoLink};

/// PostgreSQL implementation of [`ChapterRepository`].
#[derive(Clone)]
pub struct PgChapterRepository {
    pool: Pool<Postgres>,
}

impl PgChapterRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChapterRepository for PgChapterRepository {
    async fn fetch_with_course(&self, chapter_id: Uuid) -> Result<Option<ChapterContext>> {
        let row = sqlx::query(
            "SELECT ch.id, ch.course_id, ch.order_index, ch.title, ch.description, \
                    ch.content, ch.is_study_case, ch.score, ch.video_url, ch.video_url_embed, \
                    co.title AS course_title, co.description AS course_description \
             FROM chapter ch \
             JOIN course co ON co.id = ch.course_id \
             WHERE ch.id = $1",
        )
        .bind(chapter_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(|row| ChapterContext {
            id: row.get("id"),
            course_id: row.get("course_id"),
            order_index: row.get("order_index"),
            title: row.get("title"),
            description: row.get("description"),
            content: row.get("content"),
            is_study_case: row.get("is_study_case"),
            score: row.get("score"),
            video_url: row.get("video_url"),
            video_url_embed: row.get("video_url_embed"),
            course_title: row.get("course_title"),
            course_description: row.get("course_description"),
        }))
    }

    async fn set_content(&self, chapter_id: Uuid, content: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE chapter SET content = $1, is_active = TRUE WHERE id = $2",
        )
        .bind(content)
        .bind(chapter_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::ChapterNotFound(chapter_id));
        }
        Ok(())
    }

    async fn set_video(&self, chapter_id: Uuid, link: &VideoLink) -> Result<()> {
        let result = sqlx::query(
            "UPDATE chapter SET video_url = $1, video_url_embed = $2 WHERE id = $3",
        )
        .bind(&link.watch_url)
        .bind(&link.embed_url)
        .bind(chapter_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::ChapterNotFound(chapter_id));
        }
        Ok(())
    }
}
