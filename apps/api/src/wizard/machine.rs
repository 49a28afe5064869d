//! The wizard state machine. Pure state and transition rules — no network,
//! no database. The service layer (`wizard::service`) sequences the remote
//! calls around `begin_*` / `complete_*` pairs; everything here is
//! synchronous and unit-testable.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::types::{
    CompetencyDraft, KitScore, QuestionCategory, QuestionDraft, QuestionSummary,
};

/// The four pipeline stages. Forward order is fixed; no stage is skippable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStage {
    JobInput,
    CompetencyReview,
    QuestionReview,
    KitPreview,
}

/// Job title and description captured at stage 1. Immutable once the
/// pipeline advances, until reset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobDraft {
    pub title: String,
    pub description: String,
}

/// An editable competency. `key` is minted client-side at creation time and
/// is the stable join key for question grouping and for the save; `id` is
/// absent until the kit is persisted.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Competency {
    pub key: Uuid,
    pub id: Option<Uuid>,
    pub name: String,
    pub description: String,
}

impl Competency {
    fn from_draft(draft: CompetencyDraft) -> Self {
        Competency {
            key: Uuid::new_v4(),
            id: None,
            name: draft.name,
            description: draft.description,
        }
    }

    pub fn as_draft(&self) -> CompetencyDraft {
        CompetencyDraft {
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }
}

/// An editable question. `competency_key` is resolved from the model's
/// `competencyName` tag when the question enters the wizard; a question
/// whose name matches no competency keeps no key and is dropped (with a
/// count) at save time.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Question {
    pub competency_key: Option<Uuid>,
    pub competency_name: String,
    pub text: String,
    pub category: QuestionCategory,
    pub explanation: String,
    pub rubric_good: String,
    pub rubric_bad: String,
}

/// Payload shape for replacing the competency list in stage 2. Entries that
/// carry a known `key` keep it; entries without one are newly added and get
/// a fresh key.
#[derive(Debug, Clone, Deserialize)]
pub struct CompetencyEdit {
    pub key: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Payload shape for replacing the question list in stage 3.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionEdit {
    #[serde(default)]
    pub competency_name: String,
    pub text: String,
    #[serde(default)]
    pub category: QuestionCategory,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub rubric_good: String,
    #[serde(default)]
    pub rubric_bad: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum WizardError {
    #[error("A generation or save operation is already in progress for this session")]
    Busy,

    #[error("Operation not valid in the {0:?} stage")]
    WrongStage(WizardStage),

    #[error("Job title must not be empty")]
    EmptyTitle,

    #[error("Job description must not be empty")]
    EmptyDescription,

    #[error("Competency name must not be empty")]
    EmptyCompetencyName,

    #[error("At least one competency is required")]
    NoCompetencies,

    #[error("At least one question is required")]
    NoQuestions,
}

impl From<WizardError> for AppError {
    fn from(err: WizardError) -> Self {
        match err {
            WizardError::Busy | WizardError::WrongStage(_) => AppError::Conflict(err.to_string()),
            _ => AppError::Validation(err.to_string()),
        }
    }
}

/// Everything the finalize transition's remote calls consume, captured
/// atomically when the transition begins.
#[derive(Debug, Clone)]
pub struct FinalizeInputs {
    pub draft: JobDraft,
    pub competencies: Vec<Competency>,
    /// Questions whose competency key resolved, in review order.
    pub questions: Vec<Question>,
    /// The full reviewed set projected for scoring.
    pub summaries: Vec<QuestionSummary>,
    pub dropped: usize,
}

/// An in-flight transition: the loading flag plus the UI-facing status line.
#[derive(Debug, Clone)]
struct InFlight {
    since: Instant,
    status: &'static str,
}

/// Simulated progress climbs one point per tick of this many milliseconds,
/// capped below 100 until the real call resolves.
const PROGRESS_TICK_MS: u128 = 250;
const PROGRESS_CAP: u8 = 90;

/// One wizard session: the four-stage pipeline state plus all in-progress
/// editable entities. Owned exclusively by one caller for its lifetime.
#[derive(Debug)]
pub struct WizardSession {
    pub id: Uuid,
    pub profile_id: Uuid,
    stage: WizardStage,
    draft: Option<JobDraft>,
    competencies: Vec<Competency>,
    questions: Vec<Question>,
    score: Option<KitScore>,
    saved_job_id: Option<Uuid>,
    busy: Option<InFlight>,
}

impl WizardSession {
    pub fn new(profile_id: Uuid) -> Self {
        WizardSession {
            id: Uuid::new_v4(),
            profile_id,
            stage: WizardStage::JobInput,
            draft: None,
            competencies: Vec::new(),
            questions: Vec::new(),
            score: None,
            saved_job_id: None,
            busy: None,
        }
    }

    pub fn stage(&self) -> WizardStage {
        self.stage
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_some()
    }

    pub fn status_text(&self) -> Option<&'static str> {
        self.busy.as_ref().map(|b| b.status)
    }

    /// Advisory progress for the in-flight transition. Derived from elapsed
    /// time and capped at 90 — it reaches 100 only by the transition
    /// completing, never while the underlying call is still pending.
    pub fn progress(&self) -> Option<u8> {
        self.busy.as_ref().map(|b| {
            let ticks = b.since.elapsed().as_millis() / PROGRESS_TICK_MS;
            (ticks.min(PROGRESS_CAP as u128)) as u8
        })
    }

    pub fn draft(&self) -> Option<&JobDraft> {
        self.draft.as_ref()
    }

    pub fn competencies(&self) -> &[Competency] {
        &self.competencies
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn score(&self) -> Option<&KitScore> {
        self.score.as_ref()
    }

    pub fn saved_job_id(&self) -> Option<Uuid> {
        self.saved_job_id
    }

    fn ensure_idle(&self) -> Result<(), WizardError> {
        if self.busy.is_some() {
            return Err(WizardError::Busy);
        }
        Ok(())
    }

    fn ensure_stage(&self, stage: WizardStage) -> Result<(), WizardError> {
        if self.stage != stage {
            return Err(WizardError::WrongStage(self.stage));
        }
        Ok(())
    }

    fn mark_busy(&mut self, status: &'static str) {
        self.busy = Some(InFlight {
            since: Instant::now(),
            status,
        });
    }

    /// Clears the in-flight marker after a failed remote call, leaving stage
    /// and entities exactly as they were before the transition started.
    pub fn abort_transition(&mut self) {
        self.busy = None;
    }

    // ── JobInput → CompetencyReview ─────────────────────────────────────

    /// Validates the stage-1 submission and marks extraction in flight.
    /// Rejections here happen before any network call.
    pub fn begin_extract(&mut self, title: &str, description: &str) -> Result<(), WizardError> {
        self.ensure_idle()?;
        self.ensure_stage(WizardStage::JobInput)?;
        if title.trim().is_empty() {
            return Err(WizardError::EmptyTitle);
        }
        if description.trim().is_empty() {
            return Err(WizardError::EmptyDescription);
        }
        self.draft = Some(JobDraft {
            title: title.to_string(),
            description: description.to_string(),
        });
        self.mark_busy("Analyzing job description...");
        Ok(())
    }

    /// Commits extraction results and advances to competency review. An
    /// empty extraction still advances — the user adds competencies by hand.
    pub fn complete_extract(&mut self, drafts: Vec<CompetencyDraft>) {
        self.competencies = drafts.into_iter().map(Competency::from_draft).collect();
        self.questions.clear();
        self.stage = WizardStage::CompetencyReview;
        self.busy = None;
    }

    // ── Stage 2 local edits ─────────────────────────────────────────────

    /// Replaces the competency list. Known keys are preserved so questions
    /// generated earlier keep grouping; new entries are minted fresh keys.
    pub fn set_competencies(&mut self, edits: Vec<CompetencyEdit>) -> Result<(), WizardError> {
        self.ensure_idle()?;
        self.ensure_stage(WizardStage::CompetencyReview)?;
        if edits.iter().any(|e| e.name.trim().is_empty()) {
            return Err(WizardError::EmptyCompetencyName);
        }

        let competencies: Vec<Competency> = edits
            .into_iter()
            .map(|edit| {
                let kept = edit
                    .key
                    .and_then(|key| self.competencies.iter().find(|c| c.key == key));
                match kept {
                    Some(existing) => Competency {
                        key: existing.key,
                        id: existing.id,
                        name: edit.name,
                        description: edit.description,
                    },
                    None => Competency {
                        key: Uuid::new_v4(),
                        id: None,
                        name: edit.name,
                        description: edit.description,
                    },
                }
            })
            .collect();
        self.competencies = competencies;
        Ok(())
    }

    /// Appends model-suggested competencies to the current list.
    pub fn append_competencies(&mut self, drafts: Vec<CompetencyDraft>) {
        self.competencies
            .extend(drafts.into_iter().map(Competency::from_draft));
        self.busy = None;
    }

    /// Marks the suggest-more call in flight without leaving stage 2.
    /// Returns the job draft the extraction call needs.
    pub fn begin_suggest(&mut self) -> Result<JobDraft, WizardError> {
        self.ensure_idle()?;
        self.ensure_stage(WizardStage::CompetencyReview)?;
        let draft = self.draft.clone().ok_or(WizardError::EmptyDescription)?;
        self.mark_busy("Suggesting more competencies...");
        Ok(draft)
    }

    // ── CompetencyReview → QuestionReview ───────────────────────────────

    /// Returns the title and competency list the generation call needs.
    pub fn begin_questions(&mut self) -> Result<(String, Vec<CompetencyDraft>), WizardError> {
        self.ensure_idle()?;
        self.ensure_stage(WizardStage::CompetencyReview)?;
        if self.competencies.is_empty() {
            return Err(WizardError::NoCompetencies);
        }
        let draft = self.draft.clone().ok_or(WizardError::EmptyDescription)?;
        let competencies = self.competencies.iter().map(|c| c.as_draft()).collect();
        self.mark_busy("Generating interview questions...");
        Ok((draft.title, competencies))
    }

    pub fn complete_questions(&mut self, drafts: Vec<QuestionDraft>) {
        let questions: Vec<Question> = drafts.into_iter().map(|d| self.resolve(d)).collect();
        self.questions = questions;
        self.stage = WizardStage::QuestionReview;
        self.busy = None;
    }

    // ── Stage 3 local edits and the generate-more self-loop ─────────────

    pub fn set_questions(&mut self, edits: Vec<QuestionEdit>) -> Result<(), WizardError> {
        self.ensure_idle()?;
        self.ensure_stage(WizardStage::QuestionReview)?;
        let questions: Vec<Question> = edits
            .into_iter()
            .map(|edit| {
                let competency_key = self.key_for_name(&edit.competency_name);
                Question {
                    competency_key,
                    competency_name: edit.competency_name,
                    text: edit.text,
                    category: edit.category,
                    explanation: edit.explanation,
                    rubric_good: edit.rubric_good,
                    rubric_bad: edit.rubric_bad,
                }
            })
            .collect();
        self.questions = questions;
        Ok(())
    }

    /// Returns the title and competency list the generation call needs.
    pub fn begin_more(&mut self) -> Result<(String, Vec<CompetencyDraft>), WizardError> {
        self.ensure_idle()?;
        self.ensure_stage(WizardStage::QuestionReview)?;
        let draft = self.draft.clone().ok_or(WizardError::EmptyDescription)?;
        let competencies = self.competencies.iter().map(|c| c.as_draft()).collect();
        self.mark_busy("Generating more questions...");
        Ok((draft.title, competencies))
    }

    /// Appends newly generated questions; prior entries are untouched.
    pub fn complete_more(&mut self, drafts: Vec<QuestionDraft>) {
        let appended: Vec<Question> = drafts.into_iter().map(|d| self.resolve(d)).collect();
        self.questions.extend(appended);
        self.busy = None;
    }

    // ── QuestionReview → KitPreview ─────────────────────────────────────

    /// Validates the finalize preconditions and returns everything the
    /// scoring call and the save need: the job draft, the competency list,
    /// the persistable questions, the scoring projection of the full
    /// reviewed set, and the count of questions dropped for lacking a
    /// competency key.
    pub fn begin_finalize(&mut self) -> Result<FinalizeInputs, WizardError> {
        self.ensure_idle()?;
        self.ensure_stage(WizardStage::QuestionReview)?;
        if self.questions.is_empty() {
            return Err(WizardError::NoQuestions);
        }
        let draft = self.draft.clone().ok_or(WizardError::EmptyDescription)?;
        let (kept, dropped) = self.persistable_questions();
        let inputs = FinalizeInputs {
            draft,
            competencies: self.competencies.clone(),
            questions: kept.into_iter().cloned().collect(),
            summaries: self
                .questions
                .iter()
                .map(|q| QuestionSummary {
                    text: q.text.clone(),
                    category: q.category,
                })
                .collect(),
            dropped,
        };
        self.mark_busy("Scoring and saving your kit...");
        Ok(inputs)
    }

    /// Commits the finalize result: advisory score, the persisted job id,
    /// and the authoritative competency row ids keyed by client key.
    pub fn complete_finalize(
        &mut self,
        score: KitScore,
        job_id: Uuid,
        competency_ids: &[(Uuid, Uuid)],
    ) {
        for (key, row_id) in competency_ids {
            if let Some(competency) = self.competencies.iter_mut().find(|c| c.key == *key) {
                competency.id = Some(*row_id);
            }
        }
        self.score = Some(score);
        self.saved_job_id = Some(job_id);
        self.stage = WizardStage::KitPreview;
        self.busy = None;
    }

    /// Questions eligible for persistence, in list order, plus the count of
    /// questions dropped because their competency name resolved to nothing.
    pub fn persistable_questions(&self) -> (Vec<&Question>, usize) {
        let (kept, dropped): (Vec<&Question>, Vec<&Question>) = self
            .questions
            .iter()
            .partition(|q| q.competency_key.is_some());
        (kept, dropped.len())
    }

    // ── Backward and reset transitions ──────────────────────────────────

    /// Steps back to the immediately preceding review stage.
    pub fn back(&mut self) -> Result<(), WizardError> {
        self.ensure_idle()?;
        match self.stage {
            WizardStage::CompetencyReview => {
                self.stage = WizardStage::JobInput;
                Ok(())
            }
            WizardStage::QuestionReview => {
                self.stage = WizardStage::CompetencyReview;
                Ok(())
            }
            stage => Err(WizardError::WrongStage(stage)),
        }
    }

    /// Clears all in-memory entities and returns to job input. `KitPreview`
    /// is terminal for a session's kit; a new kit starts here.
    pub fn reset(&mut self) -> Result<(), WizardError> {
        self.ensure_idle()?;
        self.stage = WizardStage::JobInput;
        self.draft = None;
        self.competencies.clear();
        self.questions.clear();
        self.score = None;
        self.saved_job_id = None;
        Ok(())
    }

    // ── Join-key resolution ─────────────────────────────────────────────

    fn key_for_name(&self, name: &str) -> Option<Uuid> {
        self.competencies
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.key)
    }

    /// Resolves a generated question's competency name to its stable key.
    /// Case-sensitive exact match; no match leaves the key empty.
    fn resolve(&self, draft: QuestionDraft) -> Question {
        let competency_key = self.key_for_name(&draft.competency_name);
        Question {
            competency_key,
            competency_name: draft.competency_name,
            text: draft.text,
            category: draft.category,
            explanation: draft.explanation,
            rubric_good: draft.rubric_good,
            rubric_bad: draft.rubric_bad,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn competency_draft(name: &str) -> CompetencyDraft {
        CompetencyDraft {
            name: name.to_string(),
            description: format!("{name} description"),
        }
    }

    fn question_draft(competency: &str, text: &str) -> QuestionDraft {
        QuestionDraft {
            competency_name: competency.to_string(),
            text: text.to_string(),
            category: QuestionCategory::Behavioral,
            explanation: "Probes real experience".to_string(),
            rubric_good: "Specific examples".to_string(),
            rubric_bad: "Vague generalities".to_string(),
        }
    }

    fn session_at_question_review() -> WizardSession {
        let mut session = WizardSession::new(Uuid::new_v4());
        session.begin_extract("Backend Engineer", "Builds APIs").unwrap();
        session.complete_extract(vec![competency_draft("API Design")]);
        session.begin_questions().unwrap();
        session.complete_questions(vec![
            question_draft("API Design", "How do you version an API?"),
            question_draft("API Design", "Walk through a breaking change."),
        ]);
        session
    }

    #[test]
    fn test_new_session_starts_at_job_input() {
        let session = WizardSession::new(Uuid::new_v4());
        assert_eq!(session.stage(), WizardStage::JobInput);
        assert!(!session.is_busy());
        assert!(session.draft().is_none());
        assert!(session.progress().is_none());
    }

    #[test]
    fn test_empty_title_rejected_before_any_call() {
        let mut session = WizardSession::new(Uuid::new_v4());
        assert_eq!(
            session.begin_extract("  ", "A description"),
            Err(WizardError::EmptyTitle)
        );
        assert_eq!(session.stage(), WizardStage::JobInput);
        assert!(!session.is_busy());
    }

    #[test]
    fn test_empty_description_rejected_before_any_call() {
        let mut session = WizardSession::new(Uuid::new_v4());
        assert_eq!(
            session.begin_extract("Backend Engineer", "\n\t "),
            Err(WizardError::EmptyDescription)
        );
        assert!(!session.is_busy());
    }

    #[test]
    fn test_extract_flow_advances_to_competency_review() {
        let mut session = WizardSession::new(Uuid::new_v4());
        session
            .begin_extract("Backend Engineer", "Builds APIs")
            .unwrap();
        assert!(session.is_busy());
        assert_eq!(session.status_text(), Some("Analyzing job description..."));

        session.complete_extract(vec![competency_draft("API Design")]);
        assert_eq!(session.stage(), WizardStage::CompetencyReview);
        assert!(!session.is_busy());
        assert_eq!(session.competencies().len(), 1);
        assert!(session.competencies()[0].id.is_none());
    }

    #[test]
    fn test_second_transition_rejected_while_busy() {
        let mut session = WizardSession::new(Uuid::new_v4());
        session.begin_extract("Engineer", "Description").unwrap();
        assert_eq!(
            session.begin_extract("Engineer", "Description"),
            Err(WizardError::Busy)
        );
        // Reset and edits are also locked out while a call is in flight
        assert_eq!(session.reset(), Err(WizardError::Busy));
        assert_eq!(session.back(), Err(WizardError::Busy));
    }

    #[test]
    fn test_abort_leaves_pre_transition_state() {
        let mut session = WizardSession::new(Uuid::new_v4());
        session.begin_extract("Engineer", "Description").unwrap();
        session.abort_transition();
        assert_eq!(session.stage(), WizardStage::JobInput);
        assert!(!session.is_busy());
        // Retry is possible immediately
        assert!(session.begin_extract("Engineer", "Description").is_ok());
    }

    #[test]
    fn test_progress_is_capped_below_100_while_busy() {
        let mut session = WizardSession::new(Uuid::new_v4());
        session.begin_extract("Engineer", "Description").unwrap();
        let progress = session.progress().unwrap();
        assert!(progress <= 90);
    }

    #[test]
    fn test_questions_require_nonempty_competencies() {
        let mut session = WizardSession::new(Uuid::new_v4());
        session.begin_extract("Engineer", "Description").unwrap();
        session.complete_extract(vec![]);
        assert_eq!(session.begin_questions(), Err(WizardError::NoCompetencies));
    }

    #[test]
    fn test_question_resolution_assigns_stable_keys() {
        let session = session_at_question_review();
        let key = session.competencies()[0].key;
        assert!(session.questions().iter().all(|q| q.competency_key == Some(key)));
    }

    #[test]
    fn test_unmatched_competency_name_leaves_no_key() {
        let mut session = WizardSession::new(Uuid::new_v4());
        session.begin_extract("Engineer", "Description").unwrap();
        session.complete_extract(vec![competency_draft("API Design")]);
        session.begin_questions().unwrap();
        session.complete_questions(vec![
            question_draft("API Design", "Matched"),
            question_draft("api design", "Case mismatch"),
            question_draft("Leadership", "Unknown name"),
        ]);

        let (kept, dropped) = session.persistable_questions();
        assert_eq!(kept.len(), 1);
        assert_eq!(dropped, 2);
        assert_eq!(kept[0].text, "Matched");
    }

    #[test]
    fn test_generate_more_appends_without_mutating_prior() {
        let mut session = session_at_question_review();
        let before: Vec<String> = session.questions().iter().map(|q| q.text.clone()).collect();

        session.begin_more().unwrap();
        session.complete_more(vec![question_draft("API Design", "One more question")]);

        assert_eq!(session.questions().len(), before.len() + 1);
        for (question, original) in session.questions().iter().zip(&before) {
            assert_eq!(&question.text, original);
        }
        assert_eq!(session.stage(), WizardStage::QuestionReview);
    }

    #[test]
    fn test_finalize_requires_nonempty_questions() {
        let mut session = session_at_question_review();
        session.set_questions(vec![]).unwrap();
        assert!(matches!(
            session.begin_finalize(),
            Err(WizardError::NoQuestions)
        ));
    }

    #[test]
    fn test_finalize_commits_score_ids_and_terminal_stage() {
        let mut session = session_at_question_review();
        let key = session.competencies()[0].key;
        let job_id = Uuid::new_v4();
        let row_id = Uuid::new_v4();

        session.begin_finalize().unwrap();
        session.complete_finalize(
            KitScore {
                score: 82,
                explanation: "Good coverage.".to_string(),
            },
            job_id,
            &[(key, row_id)],
        );

        assert_eq!(session.stage(), WizardStage::KitPreview);
        assert_eq!(session.saved_job_id(), Some(job_id));
        assert_eq!(session.competencies()[0].id, Some(row_id));
        assert_eq!(session.score().unwrap().score, 82);
        // KitPreview is terminal: no forward or backward transition
        assert!(matches!(session.begin_finalize(), Err(WizardError::WrongStage(_))));
        assert!(matches!(session.back(), Err(WizardError::WrongStage(_))));
    }

    #[test]
    fn test_reset_clears_everything_from_any_stage() {
        let mut session = session_at_question_review();
        session.reset().unwrap();
        assert_eq!(session.stage(), WizardStage::JobInput);
        assert!(session.draft().is_none());
        assert!(session.competencies().is_empty());
        assert!(session.questions().is_empty());
        assert!(session.score().is_none());
        assert!(session.saved_job_id().is_none());
    }

    #[test]
    fn test_back_steps_to_immediate_predecessor_only() {
        let mut session = session_at_question_review();
        session.back().unwrap();
        assert_eq!(session.stage(), WizardStage::CompetencyReview);
        session.back().unwrap();
        assert_eq!(session.stage(), WizardStage::JobInput);
        assert!(matches!(session.back(), Err(WizardError::WrongStage(_))));
    }

    #[test]
    fn test_set_competencies_preserves_known_keys() {
        let mut session = WizardSession::new(Uuid::new_v4());
        session.begin_extract("Engineer", "Description").unwrap();
        session.complete_extract(vec![competency_draft("API Design")]);
        let key = session.competencies()[0].key;

        session
            .set_competencies(vec![
                CompetencyEdit {
                    key: Some(key),
                    name: "API Design".to_string(),
                    description: "Edited".to_string(),
                },
                CompetencyEdit {
                    key: None,
                    name: "Leadership".to_string(),
                    description: String::new(),
                },
            ])
            .unwrap();

        assert_eq!(session.competencies().len(), 2);
        assert_eq!(session.competencies()[0].key, key);
        assert_eq!(session.competencies()[0].description, "Edited");
        assert_ne!(session.competencies()[1].key, key);
    }

    #[test]
    fn test_set_competencies_rejects_empty_name() {
        let mut session = WizardSession::new(Uuid::new_v4());
        session.begin_extract("Engineer", "Description").unwrap();
        session.complete_extract(vec![]);
        assert_eq!(
            session.set_competencies(vec![CompetencyEdit {
                key: None,
                name: "  ".to_string(),
                description: String::new(),
            }]),
            Err(WizardError::EmptyCompetencyName)
        );
    }

    #[test]
    fn test_edit_questions_reresolves_keys() {
        let mut session = session_at_question_review();
        let key = session.competencies()[0].key;

        session
            .set_questions(vec![
                QuestionEdit {
                    competency_name: "API Design".to_string(),
                    text: "Edited question".to_string(),
                    category: QuestionCategory::Situational,
                    explanation: String::new(),
                    rubric_good: String::new(),
                    rubric_bad: String::new(),
                },
                QuestionEdit {
                    competency_name: "Nonexistent".to_string(),
                    text: "Orphan".to_string(),
                    category: QuestionCategory::Competency,
                    explanation: String::new(),
                    rubric_good: String::new(),
                    rubric_bad: String::new(),
                },
            ])
            .unwrap();

        assert_eq!(session.questions()[0].competency_key, Some(key));
        assert_eq!(session.questions()[1].competency_key, None);
    }

    #[test]
    fn test_wrong_stage_operations_are_rejected() {
        let mut session = WizardSession::new(Uuid::new_v4());
        assert!(matches!(
            session.begin_questions(),
            Err(WizardError::WrongStage(WizardStage::JobInput))
        ));
        assert!(matches!(
            session.begin_finalize(),
            Err(WizardError::WrongStage(WizardStage::JobInput))
        ));
        assert!(matches!(
            session.set_questions(vec![]),
            Err(WizardError::WrongStage(WizardStage::JobInput))
        ));
    }

    #[test]
    fn test_resubmitting_job_replaces_competencies_and_questions() {
        let mut session = session_at_question_review();
        session.back().unwrap();
        session.back().unwrap();

        session.begin_extract("Data Engineer", "Pipelines").unwrap();
        session.complete_extract(vec![competency_draft("SQL")]);

        assert_eq!(session.competencies().len(), 1);
        assert_eq!(session.competencies()[0].name, "SQL");
        assert!(session.questions().is_empty());
    }
}
