//! Centralized default constants for the mentora system.
//!
//! **This module is the single source of truth** for all shared default
//! values. Crates reference these constants instead of defining their own
//! magic numbers.

// =============================================================================
// JOB PROCESSING
// =============================================================================

/// Maximum attempts for content-generation jobs before parking as failed.
pub const CONTENT_MAX_ATTEMPTS: i32 = 3;

/// Maximum attempts for grading jobs.
///
/// The grading verdict is applied idempotently, so a single attempt is the
/// safe default; deployments that want re-grading on transient AI failures
/// can raise this via `GRADING_MAX_ATTEMPTS`.
pub const GRADING_MAX_ATTEMPTS: i32 = 1;

/// Concurrent leases for the content-generation queue.
pub const CONTENT_CONCURRENCY: usize = 10;

/// Concurrent leases for the grading queue.
pub const GRADING_CONCURRENCY: usize = 1;

/// Worker poll interval in milliseconds when the queue is empty.
pub const JOB_POLL_INTERVAL_MS: u64 = 500;

/// Broadcast channel capacity for worker events.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// GRADING
// =============================================================================

/// Minimum AI score for a study-case submission to be approved.
pub const APPROVAL_THRESHOLD: i32 = 70;

/// Maximum characters of fetched code evidence included in a grading prompt.
pub const SNIPPET_MAX_CHARS: usize = 3000;

/// Sentinel inserted when no code evidence could be located for a submission.
pub const NO_CODE_FOUND: &str = "(no code found)";

// =============================================================================
// INFERENCE
// =============================================================================

/// Default Gemini API base URL.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default generation model.
pub const GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Timeout for generation requests in seconds.
pub const GEN_TIMEOUT_SECS: u64 = 120;

/// Default YouTube search API base URL.
pub const YOUTUBE_BASE_URL: &str = "https://www.googleapis.com/youtube/v3/search";

/// Timeout for video search and raw-fetch requests in seconds.
pub const FETCH_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3001;

/// Default page size for job listings.
pub const JOB_LIST_LIMIT: i64 = 100;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_limits_are_positive() {
        const {
            assert!(CONTENT_MAX_ATTEMPTS > 0);
            assert!(GRADING_MAX_ATTEMPTS > 0);
        }
    }

    #[test]
    fn content_queue_is_wider_than_grading() {
        const {
            assert!(CONTENT_CONCURRENCY > GRADING_CONCURRENCY);
        }
    }

    #[test]
    fn approval_threshold_in_score_range() {
        const {
            assert!(APPROVAL_THRESHOLD > 0);
            assert!(APPROVAL_THRESHOLD <= 100);
        }
    }
}
