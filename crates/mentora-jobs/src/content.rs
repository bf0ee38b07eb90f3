//! Content worker: turns a chapter stub into full content plus an optional
//! linked video.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use mentora_core::{ChapterRepository, GenerationBackend, QueueName, VideoSearchBackend};

use crate::handler::{JobContext, JobHandler, JobResult};
use crate::prompts;

/// Handler for chapter content-generation jobs.
pub struct ContentHandler {
    chapters: Arc<dyn ChapterRepository>,
    generator: Arc<dyn GenerationBackend>,
    video: Arc<dyn VideoSearchBackend>,
}

impl ContentHandler {
    pub fn new(
        chapters: Arc<dyn ChapterRepository>,
        generator: Arc<dyn GenerationBackend>,
        video: Arc<dyn VideoSearchBackend>,
    ) -> Self {
        Self {
            chapters,
            generator,
            video,
        }
    }
}

#[async_trait]
impl JobHandler for ContentHandler {
    fn queue(&self) -> QueueName {
        QueueName::ChapterContent
    }

    #[instrument(
        skip(self, ctx),
        fields(subsystem = "jobs", component = "content", op = "execute", job_id = %ctx.job.id)
    )]
    async fn execute(&self, ctx: JobContext) -> JobResult {
        let start = Instant::now();
        let payload = match ctx.content_payload() {
            Ok(p) => p,
            Err(e) => return JobResult::failed(e),
        };
        let chapter_id = payload.chapter_id;

        let chapter = match self.chapters.fetch_with_course(chapter_id).await {
            Ok(Some(chapter)) => chapter,
            Ok(None) => {
                return JobResult::Failed(format!("Chapter {chapter_id} not found"));
            }
            Err(e) => return JobResult::failed(e),
        };

        // Duplicate delivery guard: content is written at most once.
        if chapter.content.is_some() {
            info!(chapter_id = %chapter_id, "Chapter already has content, skipping");
            return JobResult::Success;
        }

        let prompt = prompts::chapter_prompt(&chapter);
        let content = match self.generator.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => return JobResult::Failed(format!("Content generation failed: {e}")),
        };

        if let Err(e) = self.chapters.set_content(chapter_id, &content).await {
            return JobResult::Failed(format!("Failed to store content: {e}"));
        }

        // Study cases carry no video.
        if chapter.is_study_case {
            info!(
                chapter_id = %chapter_id,
                duration_ms = start.elapsed().as_millis() as u64,
                "Study-case chapter generated"
            );
            return JobResult::Success;
        }

        // A missing video link is non-fatal: content generation already
        // succeeded and must not be retried because of it.
        match self.video.search(&chapter.title).await {
            Ok(link) => {
                if let Err(e) = self.chapters.set_video(chapter_id, &link).await {
                    warn!(chapter_id = %chapter_id, error = %e, "Failed to store video link");
                }
            }
            Err(e) => {
                warn!(chapter_id = %chapter_id, error = %e, "Video lookup failed");
            }
        }

        info!(
            chapter_id = %chapter_id,
            duration_ms = start.elapsed().as_millis() as u64,
            "Chapter content generated"
        );
        JobResult::Success
    }
}
