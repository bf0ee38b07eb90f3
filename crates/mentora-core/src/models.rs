//! Core domain and queue models for mentora.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::defaults;

// =============================================================================
// QUEUE TYPES
// =============================================================================

/// Named work queue a job belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueName {
    /// Chapter content generation (text + optional video lookup).
    ChapterContent,
    /// Study-case submission grading.
    Grading,
}

impl QueueName {
    /// Stable string form used in the database and API.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueName::ChapterContent => "chapter_content",
            QueueName::Grading => "grading",
        }
    }

    /// Parse the database/API string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "chapter_content" => Some(QueueName::ChapterContent),
            "grading" => Some(QueueName::Grading),
            _ => None,
        }
    }

    /// Default attempt limit for jobs on this queue.
    pub fn default_max_attempts(&self) -> i32 {
        match self {
            QueueName::ChapterContent => defaults::CONTENT_MAX_ATTEMPTS,
            QueueName::Grading => defaults::GRADING_MAX_ATTEMPTS,
        }
    }

    /// Default concurrent lease count for this queue.
    pub fn default_concurrency(&self) -> usize {
        match self {
            QueueName::ChapterContent => defaults::CONTENT_CONCURRENCY,
            QueueName::Grading => defaults::GRADING_CONCURRENCY,
        }
    }
}

impl std::fmt::Display for QueueName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a job.
///
/// `pending → running → {completed | pending(retry) | failed}`. A pending
/// job with a future `scheduled_at` is reported as *delayed* in counts but
/// shares the pending state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "running" => Some(JobStatus::Running),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            "cancelled" => Some(JobStatus::Cancelled),
            _ => None,
        }
    }
}

/// A unit of deferred work with a payload, attempt counter, and lifecycle
/// state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub queue: QueueName,
    /// Dedup key: chapter id for content jobs. Enqueuing the same
    /// `(queue, entity_id)` while a job is pending/running collapses
    /// silently.
    pub entity_id: Option<Uuid>,
    pub status: JobStatus,
    pub payload: Option<JsonValue>,
    pub error_message: Option<String>,
    pub retry_count: i32,
    pub max_retries: i32,
    /// Purge the row on successful completion instead of retaining it.
    pub remove_on_complete: bool,
    /// Future-eligibility gate; pending jobs are not claimable before this.
    pub scheduled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Options accepted at enqueue time.
#[derive(Debug, Clone)]
pub struct EnqueueOptions {
    pub max_attempts: i32,
    pub remove_on_complete: bool,
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl EnqueueOptions {
    /// Queue-appropriate defaults: content jobs self-delete on completion
    /// and retry up to three times; grading jobs are retained and run once.
    pub fn for_queue(queue: QueueName) -> Self {
        Self {
            max_attempts: queue.default_max_attempts(),
            remove_on_complete: queue == QueueName::ChapterContent,
            scheduled_at: None,
        }
    }
}

/// Per-state job counts for one queue.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueCounts {
    pub waiting: i64,
    pub active: i64,
    pub completed: i64,
    pub failed: i64,
    pub delayed: i64,
}

impl QueueCounts {
    pub fn total(&self) -> i64 {
        self.waiting + self.active + self.completed + self.failed + self.delayed
    }
}

// =============================================================================
// DOMAIN TYPES
// =============================================================================

/// A chapter joined with its parent course context, as loaded by the
/// content worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterContext {
    pub id: Uuid,
    pub course_id: Uuid,
    pub order_index: i32,
    pub title: String,
    pub description: String,
    /// Written at most once, only by the content worker. Non-null means
    /// "already generated" and must short-circuit regeneration.
    pub content: Option<String>,
    pub is_study_case: bool,
    pub score: i32,
    pub video_url: Option<String>,
    pub video_url_embed: Option<String>,
    pub course_title: String,
    pub course_description: String,
}

/// A study-case proof joined with the chapter fields the grading worker
/// needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofContext {
    pub chapter_id: Uuid,
    pub user_id: Uuid,
    pub proof_url: String,
    pub submission_note: String,
    pub approved: bool,
    pub ai_score: i32,
    pub ai_feedback: Option<String>,
    pub chapter_content: Option<String>,
    pub chapter_score: i32,
    pub course_id: Uuid,
}

/// Result of a video search: public watch URL plus embeddable URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoLink {
    pub watch_url: String,
    pub embed_url: String,
}

/// The strict JSON verdict expected from the grading model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingVerdict {
    pub score: f64,
    pub feedback: String,
}

impl GradingVerdict {
    /// Whether this verdict approves the submission.
    pub fn is_approved(&self) -> bool {
        self.score >= defaults::APPROVAL_THRESHOLD as f64
    }

    /// Score as stored on the proof row.
    pub fn score_points(&self) -> i32 {
        self.score.round() as i32
    }
}

/// What the atomic approval transaction did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalOutcome {
    pub points_awarded: i32,
    pub course_completed: bool,
    /// Set when this approval completed the course (or the enrollment
    /// already carried one).
    pub certificate_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_name_round_trip() {
        for q in [QueueName::ChapterContent, QueueName::Grading] {
            assert_eq!(QueueName::parse(q.as_str()), Some(q));
        }
        assert_eq!(QueueName::parse("unknown"), None);
    }

    #[test]
    fn job_status_round_trip() {
        for s in [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::Cancelled,
        ] {
            assert_eq!(JobStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(JobStatus::parse("PENDING"), None);
    }

    #[test]
    fn enqueue_defaults_per_queue() {
        let content = EnqueueOptions::for_queue(QueueName::ChapterContent);
        assert_eq!(content.max_attempts, 3);
        assert!(content.remove_on_complete);
        assert!(content.scheduled_at.is_none());

        let grading = EnqueueOptions::for_queue(QueueName::Grading);
        assert_eq!(grading.max_attempts, 1);
        assert!(!grading.remove_on_complete);
    }

    #[test]
    fn queue_counts_total() {
        let counts = QueueCounts {
            waiting: 2,
            active: 1,
            completed: 10,
            failed: 3,
            delayed: 1,
        };
        assert_eq!(counts.total(), 17);
    }

    #[test]
    fn verdict_approval_boundary() {
        let pass = GradingVerdict {
            score: 70.0,
            feedback: "solid".into(),
        };
        assert!(pass.is_approved());

        let fail = GradingVerdict {
            score: 69.9,
            feedback: "close".into(),
        };
        assert!(!fail.is_approved());
        assert_eq!(fail.score_points(), 70); // rounding is display-only
    }

    #[test]
    fn verdict_score_points_rounds() {
        let v = GradingVerdict {
            score: 85.4,
            feedback: "good".into(),
        };
        assert_eq!(v.score_points(), 85);
    }
}
