//! Queue operational endpoints: status, job listing, clearing, deletion.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use uuid::Uuid;

use mentora_core::{defaults, Error, Job, JobRepository, JobStatus, QueueName};

use crate::{ApiError, AppState};

/// Public state names exposed by the queue API, mapped onto job statuses.
/// `waiting` and `delayed` share the pending status; listed jobs carry
/// `scheduled_at` so callers can tell them apart.
fn parse_state(state: &str) -> Option<JobStatus> {
    match state {
        "waiting" | "delayed" => Some(JobStatus::Pending),
        "active" => Some(JobStatus::Running),
        "completed" => Some(JobStatus::Completed),
        "failed" => Some(JobStatus::Failed),
        _ => JobStatus::parse(state),
    }
}

fn parse_states(raw: &str) -> Result<Vec<JobStatus>, ApiError> {
    let mut statuses = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let status = parse_state(part)
            .ok_or_else(|| ApiError(Error::InvalidInput(format!("Unknown state '{part}'"))))?;
        if !statuses.contains(&status) {
            statuses.push(status);
        }
    }
    Ok(statuses)
}

fn parse_queue(raw: Option<&str>) -> Result<QueueName, ApiError> {
    match raw {
        None => Ok(QueueName::ChapterContent),
        Some(s) => QueueName::parse(s)
            .ok_or_else(|| ApiError(Error::InvalidInput(format!("Unknown queue '{s}'")))),
    }
}

fn job_json(job: &Job) -> JsonValue {
    json!({
        "id": job.id,
        "queue": job.queue.as_str(),
        "entityId": job.entity_id,
        "state": job.status.as_str(),
        "payload": job.payload,
        "attempts": job.retry_count,
        "maxAttempts": job.max_retries,
        "error": job.error_message,
        "scheduledAt": job.scheduled_at,
        "createdAt": job.created_at,
    })
}

/// `GET /api/v1/queue/status`
pub async fn queue_status(
    State(state): State<AppState>,
) -> Result<Json<JsonValue>, ApiError> {
    let mut queues = serde_json::Map::new();
    let mut grand_total = 0i64;

    for queue in [QueueName::ChapterContent, QueueName::Grading] {
        let counts = state.db.jobs.counts(queue).await?;
        grand_total += counts.total();
        queues.insert(
            queue.as_str().to_string(),
            json!({
                "waiting": counts.waiting,
                "active": counts.active,
                "completed": counts.completed,
                "failed": counts.failed,
                "delayed": counts.delayed,
                "total": counts.total(),
            }),
        );
    }

    Ok(Json(json!({
        "status": "success",
        "data": {
            "queues": queues,
            "total": grand_total,
        },
    })))
}

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    queue: Option<String>,
    state: Option<String>,
    limit: Option<i64>,
}

/// `GET /api/v1/queue/jobs?queue=&state=waiting,active,failed`
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> Result<Json<JsonValue>, ApiError> {
    let queue = parse_queue(query.queue.as_deref())?;
    let statuses = match &query.state {
        Some(raw) => parse_states(raw)?,
        None => vec![JobStatus::Pending, JobStatus::Running, JobStatus::Failed],
    };
    let limit = query.limit.unwrap_or(defaults::JOB_LIST_LIMIT);

    let jobs = state.db.jobs.list(queue, &statuses, limit).await?;

    Ok(Json(json!({
        "status": "success",
        "data": {
            "count": jobs.len(),
            "jobs": jobs.iter().map(job_json).collect::<Vec<_>>(),
        },
    })))
}

#[derive(Debug, Deserialize)]
pub struct ClearQueueRequest {
    queue: Option<String>,
    states: Option<Vec<String>>,
}

/// `POST /api/v1/queue/clear`
pub async fn clear_queue(
    State(state): State<AppState>,
    body: Option<Json<ClearQueueRequest>>,
) -> Result<Json<JsonValue>, ApiError> {
    let body = body.map(|Json(b)| b).unwrap_or(ClearQueueRequest {
        queue: None,
        states: None,
    });

    let queue = parse_queue(body.queue.as_deref())?;
    let state_names = body.states.unwrap_or_else(|| {
        ["waiting", "completed", "failed", "delayed"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    });

    let mut statuses = Vec::new();
    for name in &state_names {
        let status = parse_state(name)
            .ok_or_else(|| ApiError(Error::InvalidInput(format!("Unknown state '{name}'"))))?;
        if !statuses.contains(&status) {
            statuses.push(status);
        }
    }

    let removed = state.db.jobs.clear(queue, &statuses).await?;
    let deleted: serde_json::Map<String, JsonValue> = statuses
        .iter()
        .zip(&removed)
        .map(|(status, count)| (status.as_str().to_string(), json!(count)))
        .collect();

    let remaining = state.db.jobs.counts(queue).await?;

    Ok(Json(json!({
        "status": "success",
        "message": "Queue cleared",
        "data": {
            "deleted": deleted,
            "remaining": {
                "waiting": remaining.waiting,
                "active": remaining.active,
                "completed": remaining.completed,
                "failed": remaining.failed,
                "delayed": remaining.delayed,
            },
        },
    })))
}

/// `DELETE /api/v1/queue/job/:job_id`
pub async fn delete_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<(StatusCode, Json<JsonValue>), ApiError> {
    let removed = state.db.jobs.remove(job_id).await?;
    if !removed {
        return Err(ApiError(Error::JobNotFound(job_id)));
    }

    Ok((
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "message": format!("Job {job_id} deleted"),
            "data": { "deletedJobId": job_id },
        })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_states_map_onto_statuses() {
        assert_eq!(parse_state("waiting"), Some(JobStatus::Pending));
        assert_eq!(parse_state("delayed"), Some(JobStatus::Pending));
        assert_eq!(parse_state("active"), Some(JobStatus::Running));
        assert_eq!(parse_state("completed"), Some(JobStatus::Completed));
        assert_eq!(parse_state("failed"), Some(JobStatus::Failed));
        assert_eq!(parse_state("cancelled"), Some(JobStatus::Cancelled));
        assert_eq!(parse_state("bogus"), None);
    }

    #[test]
    fn state_lists_are_split_and_deduped() {
        let statuses = parse_states("waiting, active,failed,delayed").unwrap();
        assert_eq!(
            statuses,
            vec![JobStatus::Pending, JobStatus::Running, JobStatus::Failed]
        );
    }

    #[test]
    fn unknown_state_is_rejected() {
        assert!(parse_states("waiting,nope").is_err());
    }

    #[test]
    fn default_queue_is_chapter_content() {
        assert_eq!(parse_queue(None).unwrap(), QueueName::ChapterContent);
        assert_eq!(
            parse_queue(Some("grading")).unwrap(),
            QueueName::Grading
        );
        assert!(parse_queue(Some("bogus")).is_err());
    }
}
