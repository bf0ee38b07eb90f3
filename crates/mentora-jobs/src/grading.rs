//! Grading worker: evaluates a study-case submission with an AI verdict and
//! applies the score/progress/completion consequences.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use mentora_core::{
    GenerationBackend, GradingRepository, ProofRepository, QueueName, RawFetchBackend,
};
use mentora_inference::CodeEvidenceFetcher;

use crate::handler::{JobContext, JobHandler, JobResult};
use crate::prompts;
use crate::verdict::parse_verdict;

/// Handler for grading jobs.
pub struct GradingHandler {
    proofs: Arc<dyn ProofRepository>,
    grading: Arc<dyn GradingRepository>,
    generator: Arc<dyn GenerationBackend>,
    evidence: CodeEvidenceFetcher,
}

impl GradingHandler {
    pub fn new(
        proofs: Arc<dyn ProofRepository>,
        grading: Arc<dyn GradingRepository>,
        generator: Arc<dyn GenerationBackend>,
        fetcher: Arc<dyn RawFetchBackend>,
    ) -> Self {
        Self {
            proofs,
            grading,
            generator,
            evidence: CodeEvidenceFetcher::new(fetcher),
        }
    }
}

#[async_trait]
impl JobHandler for GradingHandler {
    fn queue(&self) -> QueueName {
        QueueName::Grading
    }

    #[instrument(
        skip(self, ctx),
        fields(subsystem = "jobs", component = "grading", op = "execute", job_id = %ctx.job.id)
    )]
    async fn execute(&self, ctx: JobContext) -> JobResult {
        let start = Instant::now();
        let payload = match ctx.grading_payload() {
            Ok(p) => p,
            Err(e) => return JobResult::failed(e),
        };
        let (chapter_id, user_id) = (payload.chapter_id, payload.user_id);

        let proof = match self.proofs.fetch_for_grading(chapter_id, user_id).await {
            Ok(Some(proof)) => proof,
            Ok(None) => {
                // Stale job: the proof was deleted (or never written).
                // Nothing to grade, nothing to retry.
                info!(
                    chapter_id = %chapter_id,
                    user_id = %user_id,
                    "Proof not found, dropping stale grading job"
                );
                return JobResult::Success;
            }
            Err(e) => return JobResult::failed(e),
        };

        // Evidence gathering never fails the job; at worst the snippet is
        // empty or the sentinel.
        let snippet = self.evidence.snippet(&proof.proof_url).await;

        let prompt = prompts::grading_prompt(
            proof.chapter_content.as_deref().unwrap_or(""),
            &proof.proof_url,
            &proof.submission_note,
            &snippet,
        );

        let raw = match self.generator.generate_json(&prompt).await {
            Ok(raw) => raw,
            Err(e) => return JobResult::Failed(format!("Grading generation failed: {e}")),
        };

        let verdict = match parse_verdict(&raw) {
            Ok(v) => v,
            Err(e) => return JobResult::failed(e),
        };

        let is_approved = verdict.is_approved();
        let ai_score = verdict.score_points();

        // Idempotent short-circuit: when the approval decision is unchanged
        // only the verdict fields move — points were already granted (or
        // never were), and must not move again.
        if is_approved == proof.approved {
            if let Err(e) = self
                .proofs
                .update_verdict(chapter_id, user_id, ai_score, &verdict.feedback)
                .await
            {
                return JobResult::failed(e);
            }
            info!(
                chapter_id = %chapter_id,
                user_id = %user_id,
                ai_score,
                approved = is_approved,
                "Verdict updated, approval state unchanged"
            );
            return JobResult::Success;
        }

        if is_approved {
            match self
                .grading
                .approve(chapter_id, user_id, ai_score, &verdict.feedback)
                .await
            {
                Ok(outcome) => {
                    info!(
                        chapter_id = %chapter_id,
                        user_id = %user_id,
                        ai_score,
                        points_awarded = outcome.points_awarded,
                        course_completed = outcome.course_completed,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Submission approved"
                    );
                    if let Some(certificate_id) = outcome.certificate_id {
                        info!(
                            user_id = %user_id,
                            certificate_id = %certificate_id,
                            "Course completed, certificate issued"
                        );
                    }
                    JobResult::Success
                }
                // The transaction rolled back in full; retrying is safe.
                Err(e) => JobResult::Failed(format!("Approval transaction failed: {e}")),
            }
        } else {
            match self
                .proofs
                .reject(chapter_id, user_id, ai_score, &verdict.feedback)
                .await
            {
                Ok(()) => {
                    info!(
                        chapter_id = %chapter_id,
                        user_id = %user_id,
                        ai_score,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Submission rejected"
                    );
                    JobResult::Success
                }
                Err(e) => JobResult::failed(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{grading_job, FakeGradingRepo, FakeProofRepo};
    use mentora_core::defaults;
    use mentora_inference::mock::{MockGenerationBackend, MockRawFetcher};
    use uuid::Uuid;

    struct Setup {
        handler: GradingHandler,
        proofs: Arc<FakeProofRepo>,
        grading: Arc<FakeGradingRepo>,
        generator: Arc<MockGenerationBackend>,
    }

    fn setup(proofs: FakeProofRepo, generator: MockGenerationBackend) -> Setup {
        setup_with_fetcher(proofs, generator, MockRawFetcher::new())
    }

    fn setup_with_fetcher(
        proofs: FakeProofRepo,
        generator: MockGenerationBackend,
        fetcher: MockRawFetcher,
    ) -> Setup {
        let proofs = Arc::new(proofs);
        let grading = Arc::new(FakeGradingRepo::new());
        let generator = Arc::new(generator);
        let handler = GradingHandler::new(
            proofs.clone(),
            grading.clone(),
            generator.clone(),
            Arc::new(fetcher),
        );
        Setup {
            handler,
            proofs,
            grading,
            generator,
        }
    }

    fn verdict_json(score: f64, feedback: &str) -> String {
        format!(r#"{{ "score": {score}, "feedback": "{feedback}" }}"#)
    }

    #[tokio::test]
    async fn passing_verdict_on_unapproved_proof_triggers_approval() {
        let proofs = FakeProofRepo::new().with_proof(false, 0);
        let (chapter_id, user_id) = proofs.only_key();
        let s = setup(
            proofs,
            MockGenerationBackend::new().with_response(&verdict_json(85.0, "Well done.")),
        );

        let result = s.handler.execute(grading_job(chapter_id, user_id)).await;
        assert!(matches!(result, JobResult::Success));

        let approvals = s.grading.approvals();
        assert_eq!(approvals.len(), 1);
        assert_eq!(approvals[0], (chapter_id, user_id, 85, "Well done.".to_string()));
        assert!(s.proofs.verdict_updates().is_empty());
        assert!(s.proofs.rejections().is_empty());
    }

    #[tokio::test]
    async fn passing_verdict_on_approved_proof_updates_fields_only() {
        let proofs = FakeProofRepo::new().with_proof(true, 85);
        let (chapter_id, user_id) = proofs.only_key();
        let s = setup(
            proofs,
            MockGenerationBackend::new().with_response(&verdict_json(92.0, "Even better.")),
        );

        let result = s.handler.execute(grading_job(chapter_id, user_id)).await;
        assert!(matches!(result, JobResult::Success));

        assert!(
            s.grading.approvals().is_empty(),
            "no double award on re-evaluation of a decided submission"
        );
        let updates = s.proofs.verdict_updates();
        assert_eq!(updates, vec![(chapter_id, user_id, 92, "Even better.".to_string())]);
    }

    #[tokio::test]
    async fn failing_verdict_on_unapproved_proof_rejects() {
        let proofs = FakeProofRepo::new().with_proof(false, 0);
        let (chapter_id, user_id) = proofs.only_key();
        let s = setup(
            proofs,
            MockGenerationBackend::new()
                .with_response(&verdict_json(40.0, "Does not address the brief.")),
        );

        let result = s.handler.execute(grading_job(chapter_id, user_id)).await;
        assert!(matches!(result, JobResult::Success));

        assert!(s.grading.approvals().is_empty());
        let rejections = s.proofs.rejections();
        assert_eq!(
            rejections,
            vec![(chapter_id, user_id, 40, "Does not address the brief.".to_string())]
        );
    }

    #[tokio::test]
    async fn failing_verdict_on_approved_proof_revokes_nothing_but_updates() {
        // approved == true, verdict says reject: decision changed, so the
        // proof is rejected; points revocation is not part of grading.
        let proofs = FakeProofRepo::new().with_proof(true, 85);
        let (chapter_id, user_id) = proofs.only_key();
        let s = setup(
            proofs,
            MockGenerationBackend::new().with_response(&verdict_json(30.0, "Regressed.")),
        );

        let result = s.handler.execute(grading_job(chapter_id, user_id)).await;
        assert!(matches!(result, JobResult::Success));
        assert!(s.grading.approvals().is_empty());
        assert_eq!(s.proofs.rejections().len(), 1);
    }

    #[tokio::test]
    async fn stale_job_terminates_successfully_without_ai_calls() {
        let s = setup(FakeProofRepo::new(), MockGenerationBackend::new());

        let result = s
            .handler
            .execute(grading_job(Uuid::new_v4(), Uuid::new_v4()))
            .await;
        assert!(
            matches!(result, JobResult::Success),
            "stale grading jobs terminate without error and without retry"
        );
        assert_eq!(s.generator.call_count(), 0);
    }

    #[tokio::test]
    async fn malformed_verdict_fails_the_job() {
        let proofs = FakeProofRepo::new().with_proof(false, 0);
        let (chapter_id, user_id) = proofs.only_key();
        let s = setup(
            proofs,
            MockGenerationBackend::new().with_response("the submission deserves an 85"),
        );

        let result = s.handler.execute(grading_job(chapter_id, user_id)).await;
        match result {
            JobResult::Failed(msg) => assert!(msg.contains("Verdict decode failed")),
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(s.grading.approvals().is_empty());
        assert!(s.proofs.verdict_updates().is_empty());
    }

    #[tokio::test]
    async fn generation_failure_fails_the_job() {
        let proofs = FakeProofRepo::new().with_proof(false, 0);
        let (chapter_id, user_id) = proofs.only_key();
        let s = setup(
            proofs,
            MockGenerationBackend::new().with_failure("quota exhausted"),
        );

        let result = s.handler.execute(grading_job(chapter_id, user_id)).await;
        assert!(matches!(result, JobResult::Failed(_)));
    }

    #[tokio::test]
    async fn approval_transaction_failure_fails_the_job() {
        let proofs = FakeProofRepo::new().with_proof(false, 0);
        let (chapter_id, user_id) = proofs.only_key();
        let proofs = Arc::new(proofs);
        let grading = Arc::new(FakeGradingRepo::failing());
        let generator = Arc::new(
            MockGenerationBackend::new().with_response(&verdict_json(85.0, "Well done.")),
        );
        let handler = GradingHandler::new(
            proofs,
            grading,
            generator,
            Arc::new(MockRawFetcher::new()),
        );

        let result = handler.execute(grading_job(chapter_id, user_id)).await;
        match result {
            JobResult::Failed(msg) => assert!(msg.contains("Approval transaction failed")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn github_evidence_lands_in_the_prompt() {
        let proofs = FakeProofRepo::new()
            .with_proof_url(false, 0, "https://github.com/learner/demo/blob/main/src/main.rs");
        let (chapter_id, user_id) = proofs.only_key();
        let fetcher = MockRawFetcher::new().with_content(
            "https://raw.githubusercontent.com/learner/demo/main/src/main.rs",
            "fn main() { println!(\"raft\"); }",
        );
        let s = setup_with_fetcher(
            proofs,
            MockGenerationBackend::new().with_response(&verdict_json(85.0, "ok")),
            fetcher,
        );

        let result = s.handler.execute(grading_job(chapter_id, user_id)).await;
        assert!(matches!(result, JobResult::Success));

        let prompts = s.generator.calls();
        let prompt = prompts.lock().unwrap()[0].clone();
        assert!(prompt.contains("fn main() { println!(\"raft\"); }"));
    }

    #[tokio::test]
    async fn evidence_fetch_errors_degrade_to_sentinel() {
        let proofs =
            FakeProofRepo::new().with_proof_url(false, 0, "https://github.com/learner/ghost");
        let (chapter_id, user_id) = proofs.only_key();
        let s = setup_with_fetcher(
            proofs,
            MockGenerationBackend::new().with_response(&verdict_json(75.0, "ok")),
            MockRawFetcher::new(),
        );

        let result = s.handler.execute(grading_job(chapter_id, user_id)).await;
        assert!(matches!(result, JobResult::Success));

        let prompts = s.generator.calls();
        let prompt = prompts.lock().unwrap()[0].clone();
        assert!(prompt.contains(defaults::NO_CODE_FOUND));
    }
}
