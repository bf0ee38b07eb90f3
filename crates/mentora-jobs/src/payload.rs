//! Typed job payloads.
//!
//! Payloads are persisted as JSON and decoded into a tagged union at
//! dequeue time. A job whose payload fails validation is rejected to the
//! failed state instead of crashing a worker on missing fields.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use mentora_core::{Error, QueueName, Result};

/// Payload of a chapter content-generation job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContentJobPayload {
    pub chapter_id: Uuid,
}

/// Payload of a grading job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GradingJobPayload {
    pub chapter_id: Uuid,
    pub user_id: Uuid,
}

/// Tagged union of all payload shapes, keyed by the queue the job arrived
/// on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobPayload {
    Content(ContentJobPayload),
    Grading(GradingJobPayload),
}

impl JobPayload {
    /// Decode and validate the persisted payload for a queue.
    pub fn decode(queue: QueueName, payload: Option<&JsonValue>) -> Result<Self> {
        let value = payload
            .ok_or_else(|| Error::InvalidInput(format!("{queue} job has no payload")))?;

        match queue {
            QueueName::ChapterContent => serde_json::from_value(value.clone())
                .map(JobPayload::Content)
                .map_err(|e| Error::InvalidInput(format!("Invalid content payload: {e}"))),
            QueueName::Grading => serde_json::from_value(value.clone())
                .map(JobPayload::Grading)
                .map_err(|e| Error::InvalidInput(format!("Invalid grading payload: {e}"))),
        }
    }
}

impl ContentJobPayload {
    pub fn to_json(&self) -> JsonValue {
        serde_json::json!({ "chapterId": self.chapter_id })
    }
}

impl GradingJobPayload {
    pub fn to_json(&self) -> JsonValue {
        serde_json::json!({ "chapterId": self.chapter_id, "userId": self.user_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn content_payload_round_trips_camel_case() {
        let chapter_id = Uuid::new_v4();
        let payload = ContentJobPayload { chapter_id };
        let json = payload.to_json();
        assert!(json.get("chapterId").is_some());

        let decoded = JobPayload::decode(QueueName::ChapterContent, Some(&json)).unwrap();
        assert_eq!(decoded, JobPayload::Content(payload));
    }

    #[test]
    fn grading_payload_round_trips_camel_case() {
        let payload = GradingJobPayload {
            chapter_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
        };
        let decoded = JobPayload::decode(QueueName::Grading, Some(&payload.to_json())).unwrap();
        assert_eq!(decoded, JobPayload::Grading(payload));
    }

    #[test]
    fn missing_payload_is_rejected() {
        let err = JobPayload::decode(QueueName::ChapterContent, None).unwrap_err();
        assert!(err.to_string().contains("no payload"));
    }

    #[test]
    fn missing_fields_are_rejected() {
        let json = json!({ "chapterId": Uuid::new_v4() });
        let err = JobPayload::decode(QueueName::Grading, Some(&json)).unwrap_err();
        assert!(err.to_string().contains("Invalid grading payload"));
    }

    #[test]
    fn wrong_shape_is_rejected() {
        let json = json!({ "chapterId": "not-a-uuid" });
        assert!(JobPayload::decode(QueueName::ChapterContent, Some(&json)).is_err());

        let json = json!("just a string");
        assert!(JobPayload::decode(QueueName::ChapterContent, Some(&json)).is_err());
    }
}
