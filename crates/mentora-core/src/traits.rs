//! Core traits for mentora abstractions.
//!
//! These traits define the interfaces that concrete implementations must
//! satisfy. Workers receive them as injected dependencies, which keeps the
//! handlers testable with in-memory doubles and avoids process-wide
//! singletons.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// JOB QUEUE
// =============================================================================

/// Durable, named, at-least-once work queue.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Store a job and return its id.
    async fn enqueue(
        &self,
        queue: QueueName,
        entity_id: Option<Uuid>,
        payload: Option<JsonValue>,
        opts: EnqueueOptions,
    ) -> Result<Uuid>;

    /// Store a job unless a pending/running job with the same
    /// `(queue, entity_id)` already exists. Returns `None` on a silent
    /// idempotent collapse.
    async fn enqueue_deduplicated(
        &self,
        queue: QueueName,
        entity_id: Uuid,
        payload: Option<JsonValue>,
        opts: EnqueueOptions,
    ) -> Result<Option<Uuid>>;

    /// Lease the next eligible job on a queue. The claimed job moves to
    /// `running` and is invisible to other leases until acknowledged.
    async fn claim_next(&self, queue: QueueName) -> Result<Option<Job>>;

    /// Acknowledge success. Purges the row when the job was enqueued with
    /// `remove_on_complete`.
    async fn complete(&self, job_id: Uuid) -> Result<()>;

    /// Acknowledge failure. Returns the job to `pending` while attempts
    /// remain, otherwise parks it as `failed` with the last error retained
    /// for inspection.
    async fn fail(&self, job_id: Uuid, error: &str) -> Result<()>;

    /// Per-state counts for operational health checks.
    async fn counts(&self, queue: QueueName) -> Result<QueueCounts>;

    /// Enumerate jobs by state for diagnostics. Never blocks processing.
    async fn list(
        &self,
        queue: QueueName,
        statuses: &[JobStatus],
        limit: i64,
    ) -> Result<Vec<Job>>;

    /// Fetch a single job regardless of state.
    async fn get(&self, job_id: Uuid) -> Result<Option<Job>>;

    /// Administrative deletion regardless of state. Returns whether a row
    /// was removed.
    async fn remove(&self, job_id: Uuid) -> Result<bool>;

    /// Delete all jobs on a queue in the given states; returns the count
    /// removed per state, in input order.
    async fn clear(&self, queue: QueueName, statuses: &[JobStatus]) -> Result<Vec<i64>>;

    /// Probe the backing connection. Fails fast with a connectivity error
    /// when the store is unreachable.
    async fn ping(&self) -> Result<()>;

    /// Release the underlying connection. Called on process shutdown
    /// signals before exit so in-flight leases are released cleanly.
    async fn close(&self);
}

// =============================================================================
// RELATIONAL STORE
// =============================================================================

/// Chapter reads and the writes owned by the content worker.
#[async_trait]
pub trait ChapterRepository: Send + Sync {
    /// Load a chapter with its parent course context.
    async fn fetch_with_course(&self, chapter_id: Uuid) -> Result<Option<ChapterContext>>;

    /// Persist generated content and activate the chapter.
    async fn set_content(&self, chapter_id: Uuid, content: &str) -> Result<()>;

    /// Persist the linked video URLs.
    async fn set_video(&self, chapter_id: Uuid, link: &VideoLink) -> Result<()>;
}

/// Study-case proof reads and the verdict writes owned by the grading
/// worker.
#[async_trait]
pub trait ProofRepository: Send + Sync {
    /// Load a proof with the chapter fields grading needs. `None` means the
    /// job is stale (proof deleted or never existed).
    async fn fetch_for_grading(
        &self,
        chapter_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ProofContext>>;

    /// Update ai_score/ai_feedback without touching the approval flag or any
    /// score fields (the idempotent short-circuit path).
    async fn update_verdict(
        &self,
        chapter_id: Uuid,
        user_id: Uuid,
        ai_score: i32,
        ai_feedback: &str,
    ) -> Result<()>;

    /// Store a rejecting verdict: ai fields plus `approved = false`, no
    /// scoring side effects.
    async fn reject(
        &self,
        chapter_id: Uuid,
        user_id: Uuid,
        ai_score: i32,
        ai_feedback: &str,
    ) -> Result<()>;

    /// Create or overwrite a submission, resetting `approved`, `ai_score`
    /// and `ai_feedback` (the re-grading trigger).
    async fn upsert_submission(
        &self,
        chapter_id: Uuid,
        user_id: Uuid,
        proof_url: &str,
        submission_note: &str,
    ) -> Result<()>;
}

/// The multi-entity atomic state transition applied when a submission is
/// approved.
#[async_trait]
pub trait GradingRepository: Send + Sync {
    /// Inside one transaction: approve the proof and store the verdict,
    /// award the chapter's points to the user and the enrollment, mark the
    /// chapter progress done, and — when every chapter of the course is now
    /// done — mark the enrollment completed with a fresh certificate id.
    ///
    /// The proof row is locked and its `approved` flag re-checked under the
    /// lock, so two concurrent approvals for the same proof cannot both
    /// award points; the second call degenerates to a verdict-only update.
    async fn approve(
        &self,
        chapter_id: Uuid,
        user_id: Uuid,
        ai_score: i32,
        ai_feedback: &str,
    ) -> Result<ApprovalOutcome>;
}

// =============================================================================
// EXTERNAL CAPABILITIES
// =============================================================================

/// Text-completion capability.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate plain text from a prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate with a JSON-constrained response.
    async fn generate_json(&self, prompt: &str) -> Result<String>;

    /// Model name being used.
    fn model_name(&self) -> &str;
}

/// Video-search capability.
#[async_trait]
pub trait VideoSearchBackend: Send + Sync {
    /// Search for a video; fails with a descriptive error on transport
    /// failure or when no results exist.
    async fn search(&self, query: &str) -> Result<VideoLink>;
}

/// Raw-content fetch capability.
#[async_trait]
pub trait RawFetchBackend: Send + Sync {
    /// Fetch a URL as text. `Ok(None)` means not-found; transport errors
    /// surface as `Err`.
    async fn fetch(&self, url: &str) -> Result<Option<String>>;
}
