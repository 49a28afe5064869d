//! Wizard orchestration. Sequences the state machine, the generative client
//! and the persistence gateway around the await points; the machine's busy
//! flag is the mutual exclusion for a session, so each remote call happens
//! outside the session lock.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::types::KitScore;
use crate::generation::ContentGenerator;
use crate::kits::gateway::{KitGateway, NewCompetency, NewKit, NewQuestion};
use crate::wizard::machine::{
    Competency, CompetencyEdit, JobDraft, Question, QuestionEdit, WizardSession, WizardStage,
};

/// Questions requested per competency on the first generation pass.
pub const DEFAULT_QUESTIONS_PER_COMPETENCY: u32 = 2;
/// Questions requested per competency by "generate more".
pub const MORE_QUESTIONS_PER_COMPETENCY: u32 = 1;

/// Read-only view of a session returned by every wizard endpoint.
#[derive(Debug, Serialize)]
pub struct WizardSnapshot {
    pub session_id: Uuid,
    pub profile_id: Uuid,
    pub stage: WizardStage,
    pub loading: bool,
    pub progress: Option<u8>,
    pub status: Option<&'static str>,
    pub job: Option<JobDraft>,
    pub competencies: Vec<Competency>,
    pub questions: Vec<Question>,
    pub score: Option<KitScore>,
    pub saved_job_id: Option<Uuid>,
}

impl WizardSnapshot {
    fn of(session: &WizardSession) -> Self {
        WizardSnapshot {
            session_id: session.id,
            profile_id: session.profile_id,
            stage: session.stage(),
            loading: session.is_busy(),
            progress: session.progress(),
            status: session.status_text(),
            job: session.draft().cloned(),
            competencies: session.competencies().to_vec(),
            questions: session.questions().to_vec(),
            score: session.score().cloned(),
            saved_job_id: session.saved_job_id(),
        }
    }
}

pub struct WizardService {
    sessions: RwLock<HashMap<Uuid, WizardSession>>,
    generator: Arc<dyn ContentGenerator>,
    kits: Arc<dyn KitGateway>,
}

impl WizardService {
    pub fn new(generator: Arc<dyn ContentGenerator>, kits: Arc<dyn KitGateway>) -> Self {
        WizardService {
            sessions: RwLock::new(HashMap::new()),
            generator,
            kits,
        }
    }

    pub async fn create_session(&self, profile_id: Uuid) -> WizardSnapshot {
        let session = WizardSession::new(profile_id);
        let snapshot = WizardSnapshot::of(&session);
        self.sessions.write().await.insert(session.id, session);
        snapshot
    }

    pub async fn snapshot(&self, session_id: Uuid) -> Result<WizardSnapshot, AppError> {
        let sessions = self.sessions.read().await;
        let session = sessions
            .get(&session_id)
            .ok_or_else(|| session_not_found(session_id))?;
        Ok(WizardSnapshot::of(session))
    }

    /// Stage 1: submit title + description, extract competencies.
    pub async fn submit_job(
        &self,
        session_id: Uuid,
        title: String,
        description: String,
    ) -> Result<WizardSnapshot, AppError> {
        {
            let mut sessions = self.sessions.write().await;
            let session = sessions
                .get_mut(&session_id)
                .ok_or_else(|| session_not_found(session_id))?;
            session.begin_extract(&title, &description)?;
        }

        let result = self
            .generator
            .extract_competencies(&title, &description)
            .await;

        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| session_not_found(session_id))?;
        match result {
            Ok(drafts) => {
                info!(
                    "Session {session_id}: extracted {} competencies",
                    drafts.len()
                );
                session.complete_extract(drafts);
                Ok(WizardSnapshot::of(session))
            }
            Err(e) => {
                session.abort_transition();
                Err(AppError::Generation(e))
            }
        }
    }

    /// Stage 2 self-loop: ask the model for additional competencies.
    pub async fn suggest_competencies(
        &self,
        session_id: Uuid,
    ) -> Result<WizardSnapshot, AppError> {
        let draft = {
            let mut sessions = self.sessions.write().await;
            let session = sessions
                .get_mut(&session_id)
                .ok_or_else(|| session_not_found(session_id))?;
            session.begin_suggest()?
        };

        let result = self
            .generator
            .extract_competencies(&draft.title, &draft.description)
            .await;

        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| session_not_found(session_id))?;
        match result {
            Ok(drafts) => {
                session.append_competencies(drafts);
                Ok(WizardSnapshot::of(session))
            }
            Err(e) => {
                session.abort_transition();
                Err(AppError::Generation(e))
            }
        }
    }

    /// Stage 2 local edit.
    pub async fn edit_competencies(
        &self,
        session_id: Uuid,
        edits: Vec<CompetencyEdit>,
    ) -> Result<WizardSnapshot, AppError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| session_not_found(session_id))?;
        session.set_competencies(edits)?;
        Ok(WizardSnapshot::of(session))
    }

    /// Stage 2 → 3: confirm the competency list, generate questions.
    pub async fn confirm_competencies(
        &self,
        session_id: Uuid,
    ) -> Result<WizardSnapshot, AppError> {
        let (title, drafts) = {
            let mut sessions = self.sessions.write().await;
            let session = sessions
                .get_mut(&session_id)
                .ok_or_else(|| session_not_found(session_id))?;
            session.begin_questions()?
        };

        let result = self
            .generator
            .generate_questions(&title, &drafts, DEFAULT_QUESTIONS_PER_COMPETENCY)
            .await;

        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| session_not_found(session_id))?;
        match result {
            Ok(questions) => {
                info!("Session {session_id}: generated {} questions", questions.len());
                session.complete_questions(questions);
                Ok(WizardSnapshot::of(session))
            }
            Err(e) => {
                session.abort_transition();
                Err(AppError::Generation(e))
            }
        }
    }

    /// Stage 3 local edit.
    pub async fn edit_questions(
        &self,
        session_id: Uuid,
        edits: Vec<QuestionEdit>,
    ) -> Result<WizardSnapshot, AppError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| session_not_found(session_id))?;
        session.set_questions(edits)?;
        Ok(WizardSnapshot::of(session))
    }

    /// Stage 3 self-loop: one additional question per competency, appended.
    pub async fn generate_more(&self, session_id: Uuid) -> Result<WizardSnapshot, AppError> {
        let (title, drafts) = {
            let mut sessions = self.sessions.write().await;
            let session = sessions
                .get_mut(&session_id)
                .ok_or_else(|| session_not_found(session_id))?;
            session.begin_more()?
        };

        let result = self
            .generator
            .generate_questions(&title, &drafts, MORE_QUESTIONS_PER_COMPETENCY)
            .await;

        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| session_not_found(session_id))?;
        match result {
            Ok(questions) => {
                session.complete_more(questions);
                Ok(WizardSnapshot::of(session))
            }
            Err(e) => {
                session.abort_transition();
                Err(AppError::Generation(e))
            }
        }
    }

    /// Stage 3 → 4: score the kit (best-effort), then save everything in one
    /// gateway transaction. Any save failure leaves the session in
    /// QuestionReview for a retry.
    pub async fn finalize(&self, session_id: Uuid) -> Result<WizardSnapshot, AppError> {
        let (profile_id, inputs) = {
            let mut sessions = self.sessions.write().await;
            let session = sessions
                .get_mut(&session_id)
                .ok_or_else(|| session_not_found(session_id))?;
            let inputs = session.begin_finalize()?;
            (session.profile_id, inputs)
        };

        if inputs.dropped > 0 {
            warn!(
                "Session {session_id}: dropping {} question(s) with no matching competency",
                inputs.dropped
            );
        }

        // Advisory only — any failure degrades to the zero-score object.
        // Scoring sees the full reviewed set, persistence only the
        // resolvable subset.
        let score = match self
            .generator
            .score_kit(&inputs.draft.title, &inputs.draft.description, &inputs.summaries)
            .await
        {
            Ok(score) => score,
            Err(e) => {
                warn!("Session {session_id}: kit scoring failed ({e}), using fallback");
                KitScore::fallback()
            }
        };

        let kit_competencies: Vec<NewCompetency> = inputs
            .competencies
            .iter()
            .map(|c| NewCompetency {
                key: c.key,
                name: c.name.clone(),
                description: c.description.clone(),
            })
            .collect();
        let kit_questions: Vec<NewQuestion> = inputs
            .questions
            .iter()
            .filter_map(|q| {
                q.competency_key.map(|competency_key| NewQuestion {
                    competency_key,
                    text: q.text.clone(),
                    category: q.category,
                    explanation: q.explanation.clone(),
                    rubric_good: q.rubric_good.clone(),
                    rubric_bad: q.rubric_bad.clone(),
                })
            })
            .collect();

        let save_result = async {
            let org_id = self.kits.organization_for(profile_id).await?;
            self.kits
                .save_kit(
                    org_id,
                    NewKit {
                        profile_id,
                        title: inputs.draft.title.clone(),
                        description: inputs.draft.description.clone(),
                        score: score.clone(),
                        competencies: kit_competencies,
                        questions: kit_questions,
                    },
                )
                .await
        }
        .await;

        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| session_not_found(session_id))?;
        match save_result {
            Ok(saved) => {
                info!(
                    "Session {session_id}: kit saved as job {} ({} questions)",
                    saved.job_id, saved.questions_saved
                );
                session.complete_finalize(score, saved.job_id, &saved.competency_ids);
                Ok(WizardSnapshot::of(session))
            }
            Err(e) => {
                session.abort_transition();
                Err(e)
            }
        }
    }

    pub async fn back(&self, session_id: Uuid) -> Result<WizardSnapshot, AppError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| session_not_found(session_id))?;
        session.back()?;
        Ok(WizardSnapshot::of(session))
    }

    pub async fn reset(&self, session_id: Uuid) -> Result<WizardSnapshot, AppError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| session_not_found(session_id))?;
        session.reset()?;
        Ok(WizardSnapshot::of(session))
    }
}

fn session_not_found(session_id: Uuid) -> AppError {
    AppError::NotFound(format!("Wizard session {session_id} not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::mock::MockGenerator;
    use crate::generation::types::{CompetencyDraft, QuestionCategory, QuestionDraft};
    use crate::kits::gateway::MemoryKitGateway;
    use crate::llm_client::GenerationError;

    fn api_design() -> CompetencyDraft {
        CompetencyDraft {
            name: "API Design".to_string(),
            description: "REST design, versioning, compatibility.".to_string(),
        }
    }

    fn question(competency: &str, text: &str) -> QuestionDraft {
        QuestionDraft {
            competency_name: competency.to_string(),
            text: text.to_string(),
            category: QuestionCategory::Competency,
            explanation: "Separates design taste from rote knowledge.".to_string(),
            rubric_good: "Talks about consumers and evolution.".to_string(),
            rubric_bad: "Only mentions tools.".to_string(),
        }
    }

    fn upstream_error() -> GenerationError {
        GenerationError::Api {
            status: 401,
            message: "Incorrect API key provided".to_string(),
        }
    }

    struct Harness {
        service: WizardService,
        generator: Arc<MockGenerator>,
        kits: Arc<MemoryKitGateway>,
        profile_id: Uuid,
    }

    fn harness() -> Harness {
        let profile_id = Uuid::new_v4();
        let generator = Arc::new(MockGenerator::new());
        let kits = Arc::new(MemoryKitGateway::new().with_member(profile_id, Uuid::new_v4()));
        let service = WizardService::new(generator.clone(), kits.clone());
        Harness {
            service,
            generator,
            kits,
            profile_id,
        }
    }

    async fn drive_to_question_review(h: &Harness) -> Uuid {
        let session = h.service.create_session(h.profile_id).await;
        h.generator.push_competencies(Ok(vec![api_design()]));
        h.service
            .submit_job(
                session.session_id,
                "Backend Engineer".to_string(),
                "Designs and builds APIs.".to_string(),
            )
            .await
            .unwrap();
        h.generator.push_questions(Ok(vec![
            question("API Design", "How do you version a public API?"),
            question("API Design", "Describe a backward-incompatible change you shipped."),
        ]));
        h.service
            .confirm_competencies(session.session_id)
            .await
            .unwrap();
        session.session_id
    }

    #[tokio::test]
    async fn test_end_to_end_one_competency_two_questions() {
        let h = harness();
        let session_id = drive_to_question_review(&h).await;

        h.generator.push_score(Ok(KitScore {
            score: 88,
            explanation: "Relevant and varied.".to_string(),
        }));
        let snapshot = h.service.finalize(session_id).await.unwrap();

        assert_eq!(snapshot.stage, WizardStage::KitPreview);
        assert_eq!(snapshot.score.as_ref().unwrap().score, 88);
        assert!(snapshot.saved_job_id.is_some());
        assert!(snapshot.competencies[0].id.is_some());

        let saved = h.kits.saved();
        assert_eq!(saved.len(), 1);
        let (_, kit, summary) = &saved[0];
        assert_eq!(kit.competencies.len(), 1);
        assert_eq!(kit.questions.len(), 2);
        assert_eq!(summary.questions_saved, 2);
        assert_eq!(
            h.generator.calls(),
            vec!["extract_competencies", "generate_questions", "score_kit"]
        );
    }

    #[tokio::test]
    async fn test_empty_title_makes_no_network_call() {
        let h = harness();
        let session = h.service.create_session(h.profile_id).await;

        let err = h
            .service
            .submit_job(session.session_id, "".to_string(), "desc".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(h.generator.calls().is_empty());
    }

    #[tokio::test]
    async fn test_extraction_failure_surfaces_and_stays_at_job_input() {
        let h = harness();
        let session = h.service.create_session(h.profile_id).await;

        h.generator.push_competencies(Err(upstream_error()));
        let err = h
            .service
            .submit_job(
                session.session_id,
                "Backend Engineer".to_string(),
                "desc".to_string(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Generation(_)));
        assert!(err.to_string().contains("Incorrect API key"));

        let snapshot = h.service.snapshot(session.session_id).await.unwrap();
        assert_eq!(snapshot.stage, WizardStage::JobInput);
        assert!(!snapshot.loading);
    }

    #[tokio::test]
    async fn test_generate_more_appends_one_per_competency() {
        let h = harness();
        let session_id = drive_to_question_review(&h).await;

        h.generator
            .push_questions(Ok(vec![question("API Design", "A third question.")]));
        let snapshot = h.service.generate_more(session_id).await.unwrap();

        assert_eq!(snapshot.questions.len(), 3);
        assert_eq!(snapshot.questions[2].text, "A third question.");
        assert_eq!(snapshot.stage, WizardStage::QuestionReview);
    }

    #[tokio::test]
    async fn test_score_failure_does_not_block_finalize() {
        let h = harness();
        let session_id = drive_to_question_review(&h).await;

        h.generator.push_score(Err(upstream_error()));
        let snapshot = h.service.finalize(session_id).await.unwrap();

        assert_eq!(snapshot.stage, WizardStage::KitPreview);
        let score = snapshot.score.unwrap();
        assert_eq!(score.score, 0);
        assert_eq!(score.explanation, "Failed to generate score.");
        assert_eq!(h.kits.saved().len(), 1);
    }

    #[tokio::test]
    async fn test_save_failure_leaves_question_review_for_retry() {
        let h = harness();
        let session_id = drive_to_question_review(&h).await;

        h.generator.push_score(Ok(KitScore {
            score: 70,
            explanation: "Fine.".to_string(),
        }));
        h.kits.fail_next_save();
        let err = h.service.finalize(session_id).await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));

        let snapshot = h.service.snapshot(session_id).await.unwrap();
        assert_eq!(snapshot.stage, WizardStage::QuestionReview);
        assert!(!snapshot.loading);
        assert!(snapshot.saved_job_id.is_none());

        // Retry succeeds once the backend recovers
        h.generator.push_score(Ok(KitScore {
            score: 70,
            explanation: "Fine.".to_string(),
        }));
        let snapshot = h.service.finalize(session_id).await.unwrap();
        assert_eq!(snapshot.stage, WizardStage::KitPreview);
    }

    #[tokio::test]
    async fn test_profile_without_organization_cannot_finalize() {
        let profile_id = Uuid::new_v4();
        let generator = Arc::new(MockGenerator::new());
        let kits = Arc::new(MemoryKitGateway::new()); // no membership
        let service = WizardService::new(generator.clone(), kits.clone());
        let h = Harness {
            service,
            generator,
            kits,
            profile_id,
        };
        let session_id = drive_to_question_review(&h).await;

        h.generator.push_score(Ok(KitScore {
            score: 50,
            explanation: "".to_string(),
        }));
        let err = h.service.finalize(session_id).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let snapshot = h.service.snapshot(session_id).await.unwrap();
        assert_eq!(snapshot.stage, WizardStage::QuestionReview);
    }

    #[tokio::test]
    async fn test_unmatched_questions_dropped_from_persistence() {
        let h = harness();
        let session = h.service.create_session(h.profile_id).await;
        h.generator.push_competencies(Ok(vec![api_design()]));
        h.service
            .submit_job(
                session.session_id,
                "Backend Engineer".to_string(),
                "desc".to_string(),
            )
            .await
            .unwrap();
        h.generator.push_questions(Ok(vec![
            question("API Design", "Matched question"),
            question("Some Other Name", "Orphan question"),
        ]));
        h.service
            .confirm_competencies(session.session_id)
            .await
            .unwrap();

        h.generator.push_score(Ok(KitScore {
            score: 60,
            explanation: "".to_string(),
        }));
        h.service.finalize(session.session_id).await.unwrap();

        let saved = h.kits.saved();
        let (_, kit, summary) = &saved[0];
        assert_eq!(kit.competencies.len(), 1);
        assert_eq!(kit.questions.len(), 1);
        assert_eq!(kit.questions[0].text, "Matched question");
        assert_eq!(summary.questions_saved, 1);
    }

    #[tokio::test]
    async fn test_reset_returns_to_job_input_and_clears_entities() {
        let h = harness();
        let session_id = drive_to_question_review(&h).await;

        let snapshot = h.service.reset(session_id).await.unwrap();
        assert_eq!(snapshot.stage, WizardStage::JobInput);
        assert!(snapshot.job.is_none());
        assert!(snapshot.competencies.is_empty());
        assert!(snapshot.questions.is_empty());
    }

    #[tokio::test]
    async fn test_suggest_competencies_appends() {
        let h = harness();
        let session = h.service.create_session(h.profile_id).await;
        h.generator.push_competencies(Ok(vec![api_design()]));
        h.service
            .submit_job(
                session.session_id,
                "Backend Engineer".to_string(),
                "desc".to_string(),
            )
            .await
            .unwrap();

        h.generator.push_competencies(Ok(vec![CompetencyDraft {
            name: "Observability".to_string(),
            description: "Metrics, logs, traces.".to_string(),
        }]));
        let snapshot = h
            .service
            .suggest_competencies(session.session_id)
            .await
            .unwrap();
        assert_eq!(snapshot.competencies.len(), 2);
        assert_eq!(snapshot.competencies[1].name, "Observability");
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let h = harness();
        let err = h.service.snapshot(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
