//! In-memory doubles of the repository traits for handler tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use mentora_core::{
    ApprovalOutcome, ChapterContext, ChapterRepository, Error, GradingRepository, Job, JobStatus,
    ProofContext, ProofRepository, QueueName, Result, VideoLink,
};

use crate::handler::JobContext;

/// A running job with an arbitrary payload.
pub fn running_job_with_payload(queue: QueueName, payload: Option<serde_json::Value>) -> Job {
    Job {
        id: Uuid::new_v4(),
        queue,
        entity_id: None,
        status: JobStatus::Running,
        payload,
        error_message: None,
        retry_count: 0,
        max_retries: 3,
        remove_on_complete: queue == QueueName::ChapterContent,
        scheduled_at: None,
        created_at: Utc::now(),
        started_at: Some(Utc::now()),
        completed_at: None,
    }
}

/// A leased content job for a chapter.
pub fn running_job(chapter_id: Uuid) -> JobContext {
    JobContext::new(running_job_with_payload(
        QueueName::ChapterContent,
        Some(serde_json::json!({ "chapterId": chapter_id })),
    ))
}

/// A leased grading job for a (chapter, user) pair.
pub fn grading_job(chapter_id: Uuid, user_id: Uuid) -> JobContext {
    JobContext::new(running_job_with_payload(
        QueueName::Grading,
        Some(serde_json::json!({ "chapterId": chapter_id, "userId": user_id })),
    ))
}

// ---------------------------------------------------------------------------
// Chapters
// ---------------------------------------------------------------------------

pub struct FakeChapterRepo {
    chapters: Mutex<HashMap<Uuid, ChapterContext>>,
}

impl FakeChapterRepo {
    pub fn new() -> Self {
        Self {
            chapters: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_chapter(self, title: &str, is_study_case: bool, content: Option<&str>) -> Self {
        let id = Uuid::new_v4();
        let chapter = ChapterContext {
            id,
            course_id: Uuid::new_v4(),
            order_index: 1,
            title: title.to_string(),
            description: format!("{title} in depth"),
            content: content.map(|c| c.to_string()),
            is_study_case,
            score: if is_study_case { 40 } else { 0 },
            video_url: None,
            video_url_embed: None,
            course_title: "Practical Rust".to_string(),
            course_description: "A hands-on Rust course.".to_string(),
        };
        self.chapters.lock().unwrap().insert(id, chapter);
        self
    }

    pub fn only_chapter_id(&self) -> Uuid {
        *self.chapters.lock().unwrap().keys().next().unwrap()
    }

    pub fn content_of(&self, id: Uuid) -> Option<String> {
        self.chapters
            .lock()
            .unwrap()
            .get(&id)
            .and_then(|c| c.content.clone())
    }

    pub fn video_of(&self, id: Uuid) -> Option<VideoLink> {
        self.chapters.lock().unwrap().get(&id).and_then(|c| {
            Some(VideoLink {
                watch_url: c.video_url.clone()?,
                embed_url: c.video_url_embed.clone()?,
            })
        })
    }
}

#[async_trait]
impl ChapterRepository for FakeChapterRepo {
    async fn fetch_with_course(&self, chapter_id: Uuid) -> Result<Option<ChapterContext>> {
        Ok(self.chapters.lock().unwrap().get(&chapter_id).cloned())
    }

    async fn set_content(&self, chapter_id: Uuid, content: &str) -> Result<()> {
        let mut chapters = self.chapters.lock().unwrap();
        let chapter = chapters
            .get_mut(&chapter_id)
            .ok_or(Error::ChapterNotFound(chapter_id))?;
        chapter.content = Some(content.to_string());
        Ok(())
    }

    async fn set_video(&self, chapter_id: Uuid, link: &VideoLink) -> Result<()> {
        let mut chapters = self.chapters.lock().unwrap();
        let chapter = chapters
            .get_mut(&chapter_id)
            .ok_or(Error::ChapterNotFound(chapter_id))?;
        chapter.video_url = Some(link.watch_url.clone());
        chapter.video_url_embed = Some(link.embed_url.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Proofs
// ---------------------------------------------------------------------------

type VerdictWrite = (Uuid, Uuid, i32, String);

pub struct FakeProofRepo {
    proofs: Mutex<HashMap<(Uuid, Uuid), ProofContext>>,
    verdict_updates: Mutex<Vec<VerdictWrite>>,
    rejections: Mutex<Vec<VerdictWrite>>,
}

impl FakeProofRepo {
    pub fn new() -> Self {
        Self {
            proofs: Mutex::new(HashMap::new()),
            verdict_updates: Mutex::new(Vec::new()),
            rejections: Mutex::new(Vec::new()),
        }
    }

    pub fn with_proof(self, approved: bool, ai_score: i32) -> Self {
        self.with_proof_url(approved, ai_score, "https://github.com/learner/demo")
    }

    pub fn with_proof_url(self, approved: bool, ai_score: i32, url: &str) -> Self {
        let chapter_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let proof = ProofContext {
            chapter_id,
            user_id,
            proof_url: url.to_string(),
            submission_note: "Implements the brief.".to_string(),
            approved,
            ai_score,
            ai_feedback: None,
            chapter_content: Some("Build a replicated log.".to_string()),
            chapter_score: 40,
            course_id: Uuid::new_v4(),
        };
        self.proofs.lock().unwrap().insert((chapter_id, user_id), proof);
        self
    }

    pub fn only_key(&self) -> (Uuid, Uuid) {
        *self.proofs.lock().unwrap().keys().next().unwrap()
    }

    pub fn verdict_updates(&self) -> Vec<VerdictWrite> {
        self.verdict_updates.lock().unwrap().clone()
    }

    pub fn rejections(&self) -> Vec<VerdictWrite> {
        self.rejections.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProofRepository for FakeProofRepo {
    async fn fetch_for_grading(
        &self,
        chapter_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ProofContext>> {
        Ok(self
            .proofs
            .lock()
            .unwrap()
            .get(&(chapter_id, user_id))
            .cloned())
    }

    async fn update_verdict(
        &self,
        chapter_id: Uuid,
        user_id: Uuid,
        ai_score: i32,
        ai_feedback: &str,
    ) -> Result<()> {
        let mut proofs = self.proofs.lock().unwrap();
        let proof = proofs
            .get_mut(&(chapter_id, user_id))
            .ok_or_else(|| Error::NotFound("proof".into()))?;
        proof.ai_score = ai_score;
        proof.ai_feedback = Some(ai_feedback.to_string());
        self.verdict_updates.lock().unwrap().push((
            chapter_id,
            user_id,
            ai_score,
            ai_feedback.to_string(),
        ));
        Ok(())
    }

    async fn reject(
        &self,
        chapter_id: Uuid,
        user_id: Uuid,
        ai_score: i32,
        ai_feedback: &str,
    ) -> Result<()> {
        let mut proofs = self.proofs.lock().unwrap();
        let proof = proofs
            .get_mut(&(chapter_id, user_id))
            .ok_or_else(|| Error::NotFound("proof".into()))?;
        proof.approved = false;
        proof.ai_score = ai_score;
        proof.ai_feedback = Some(ai_feedback.to_string());
        self.rejections.lock().unwrap().push((
            chapter_id,
            user_id,
            ai_score,
            ai_feedback.to_string(),
        ));
        Ok(())
    }

    async fn upsert_submission(
        &self,
        chapter_id: Uuid,
        user_id: Uuid,
        proof_url: &str,
        submission_note: &str,
    ) -> Result<()> {
        let mut proofs = self.proofs.lock().unwrap();
        let proof = proofs
            .entry((chapter_id, user_id))
            .or_insert_with(|| ProofContext {
                chapter_id,
                user_id,
                proof_url: String::new(),
                submission_note: String::new(),
                approved: false,
                ai_score: 0,
                ai_feedback: None,
                chapter_content: None,
                chapter_score: 0,
                course_id: Uuid::new_v4(),
            });
        proof.proof_url = proof_url.to_string();
        proof.submission_note = submission_note.to_string();
        proof.approved = false;
        proof.ai_score = 0;
        proof.ai_feedback = None;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Grading transaction
// ---------------------------------------------------------------------------

pub struct FakeGradingRepo {
    approvals: Mutex<Vec<VerdictWrite>>,
    fail: bool,
}

impl FakeGradingRepo {
    pub fn new() -> Self {
        Self {
            approvals: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// Simulate the transaction aborting (everything rolled back).
    pub fn failing() -> Self {
        Self {
            approvals: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn approvals(&self) -> Vec<VerdictWrite> {
        self.approvals.lock().unwrap().clone()
    }
}

#[async_trait]
impl GradingRepository for FakeGradingRepo {
    async fn approve(
        &self,
        chapter_id: Uuid,
        user_id: Uuid,
        ai_score: i32,
        ai_feedback: &str,
    ) -> Result<ApprovalOutcome> {
        if self.fail {
            return Err(Error::Internal("transaction aborted".into()));
        }
        self.approvals.lock().unwrap().push((
            chapter_id,
            user_id,
            ai_score,
            ai_feedback.to_string(),
        ));
        Ok(ApprovalOutcome {
            points_awarded: 40,
            course_completed: false,
            certificate_id: None,
        })
    }
}
