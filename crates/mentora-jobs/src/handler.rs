//! Job handler trait and execution context.

use async_trait::async_trait;

use mentora_core::{Job, QueueName, Result};

use crate::payload::{ContentJobPayload, GradingJobPayload, JobPayload};

/// Context provided to job handlers for one leased job.
pub struct JobContext {
    /// The job being processed.
    pub job: Job,
}

impl JobContext {
    pub fn new(job: Job) -> Self {
        Self { job }
    }

    /// Decode the payload as a content job.
    pub fn content_payload(&self) -> Result<ContentJobPayload> {
        match JobPayload::decode(QueueName::ChapterContent, self.job.payload.as_ref())? {
            JobPayload::Content(p) => Ok(p),
            JobPayload::Grading(_) => unreachable!("decode is keyed by queue"),
        }
    }

    /// Decode the payload as a grading job.
    pub fn grading_payload(&self) -> Result<GradingJobPayload> {
        match JobPayload::decode(QueueName::Grading, self.job.payload.as_ref())? {
            JobPayload::Grading(p) => Ok(p),
            JobPayload::Content(_) => unreachable!("decode is keyed by queue"),
        }
    }
}

/// Result of job execution.
#[derive(Debug)]
pub enum JobResult {
    /// Job completed successfully.
    Success,
    /// Job failed with an error message; the queue retries it until the
    /// attempt limit, then parks it for inspection.
    Failed(String),
}

impl JobResult {
    /// Build a failure from any displayable error.
    pub fn failed(e: impl std::fmt::Display) -> Self {
        JobResult::Failed(e.to_string())
    }
}

/// Trait for job handlers.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// The queue this handler consumes.
    fn queue(&self) -> QueueName;

    /// Execute one leased job.
    async fn execute(&self, ctx: JobContext) -> JobResult;
}

/// No-op handler for tests and wiring checks.
pub struct NoOpHandler {
    queue: QueueName,
}

impl NoOpHandler {
    pub fn new(queue: QueueName) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl JobHandler for NoOpHandler {
    fn queue(&self) -> QueueName {
        self.queue
    }

    async fn execute(&self, _ctx: JobContext) -> JobResult {
        JobResult::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mentora_core::JobStatus;
    use uuid::Uuid;

    fn job_on(queue: QueueName, payload: Option<serde_json::Value>) -> Job {
        Job {
            id: Uuid::new_v4(),
            queue,
            entity_id: None,
            status: JobStatus::Running,
            payload,
            error_message: None,
            retry_count: 0,
            max_retries: 3,
            remove_on_complete: false,
            scheduled_at: None,
            created_at: Utc::now(),
            started_at: Some(Utc::now()),
            completed_at: None,
        }
    }

    #[test]
    fn context_decodes_content_payload() {
        let chapter_id = Uuid::new_v4();
        let ctx = job_on(
            QueueName::ChapterContent,
            Some(serde_json::json!({ "chapterId": chapter_id })),
        );
        let ctx = JobContext::new(ctx);
        assert_eq!(ctx.content_payload().unwrap().chapter_id, chapter_id);
    }

    #[test]
    fn context_rejects_malformed_payload() {
        let ctx = JobContext::new(job_on(QueueName::Grading, Some(serde_json::json!({}))));
        assert!(ctx.grading_payload().is_err());
    }

    #[tokio::test]
    async fn noop_handler_succeeds() {
        let handler = NoOpHandler::new(QueueName::ChapterContent);
        assert_eq!(handler.queue(), QueueName::ChapterContent);

        let ctx = JobContext::new(job_on(QueueName::ChapterContent, None));
        assert!(matches!(handler.execute(ctx).await, JobResult::Success));
    }
}
