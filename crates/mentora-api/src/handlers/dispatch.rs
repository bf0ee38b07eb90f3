//! Dispatch hooks: API-layer call sites that enqueue jobs as a side effect
//! of user actions. Callers never await job completion.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tracing::info;
use uuid::Uuid;

use mentora_core::{EnqueueOptions, JobRepository, ProofRepository, QueueName};
use mentora_jobs::{ContentJobPayload, GradingJobPayload};

use crate::{ApiError, AppState};

/// `POST /api/v1/chapters/:chapter_id/generate`
///
/// Enqueue a content-generation job for a chapter. The chapter id is the
/// dedup key: while a job for it is waiting or active, repeated calls
/// collapse to the outstanding one.
pub async fn generate_chapter(
    State(state): State<AppState>,
    Path(chapter_id): Path<Uuid>,
) -> Result<(StatusCode, Json<JsonValue>), ApiError> {
    let payload = ContentJobPayload { chapter_id };
    let job_id = state
        .db
        .jobs
        .enqueue_deduplicated(
            QueueName::ChapterContent,
            chapter_id,
            Some(payload.to_json()),
            EnqueueOptions::for_queue(QueueName::ChapterContent),
        )
        .await?;

    info!(
        chapter_id = %chapter_id,
        deduplicated = job_id.is_none(),
        "Content job dispatched"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "status": "success",
            "data": {
                "jobId": job_id,
                "deduplicated": job_id.is_none(),
            },
        })),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitProofRequest {
    pub user_id: Uuid,
    pub proof_url: String,
    #[serde(default)]
    pub submission_note: String,
}

/// `POST /api/v1/chapters/:chapter_id/proof`
///
/// Store (or overwrite) a study-case submission and enqueue a grading job
/// for it. Overwriting resets the approval flag and verdict fields, which
/// is what makes re-submission trigger re-grading.
pub async fn submit_proof(
    State(state): State<AppState>,
    Path(chapter_id): Path<Uuid>,
    Json(body): Json<SubmitProofRequest>,
) -> Result<(StatusCode, Json<JsonValue>), ApiError> {
    state
        .db
        .proofs
        .upsert_submission(
            chapter_id,
            body.user_id,
            &body.proof_url,
            &body.submission_note,
        )
        .await?;

    let payload = GradingJobPayload {
        chapter_id,
        user_id: body.user_id,
    };
    let job_id = state
        .db
        .jobs
        .enqueue(
            QueueName::Grading,
            None,
            Some(payload.to_json()),
            EnqueueOptions::for_queue(QueueName::Grading),
        )
        .await?;

    info!(
        chapter_id = %chapter_id,
        user_id = %body.user_id,
        job_id = %job_id,
        "Grading job dispatched"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "status": "success",
            "data": { "jobId": job_id },
        })),
    ))
}
