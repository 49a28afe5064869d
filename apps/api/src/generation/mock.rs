//! Scripted generator for tests. Each operation pops the next queued reply;
//! every invocation is recorded so tests can assert which remote calls a
//! flow did (or did not) make.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::generation::types::{CompetencyDraft, KitScore, QuestionDraft, QuestionSummary};
use crate::generation::ContentGenerator;
use crate::llm_client::GenerationError;

#[derive(Default)]
pub struct MockGenerator {
    competencies: Mutex<VecDeque<Result<Vec<CompetencyDraft>, GenerationError>>>,
    questions: Mutex<VecDeque<Result<Vec<QuestionDraft>, GenerationError>>>,
    scores: Mutex<VecDeque<Result<KitScore, GenerationError>>>,
    calls: Mutex<Vec<&'static str>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_competencies(&self, reply: Result<Vec<CompetencyDraft>, GenerationError>) {
        self.competencies.lock().unwrap().push_back(reply);
    }

    pub fn push_questions(&self, reply: Result<Vec<QuestionDraft>, GenerationError>) {
        self.questions.lock().unwrap().push_back(reply);
    }

    pub fn push_score(&self, reply: Result<KitScore, GenerationError>) {
        self.scores.lock().unwrap().push_back(reply);
    }

    /// Operation names in invocation order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn exhausted(operation: &str) -> GenerationError {
        GenerationError::Api {
            status: 500,
            message: format!("MockGenerator has no scripted reply for {operation}"),
        }
    }
}

#[async_trait]
impl ContentGenerator for MockGenerator {
    async fn extract_competencies(
        &self,
        _title: &str,
        _description: &str,
    ) -> Result<Vec<CompetencyDraft>, GenerationError> {
        self.calls.lock().unwrap().push("extract_competencies");
        self.competencies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Self::exhausted("extract_competencies")))
    }

    async fn generate_questions(
        &self,
        _title: &str,
        competencies: &[CompetencyDraft],
        _count: u32,
    ) -> Result<Vec<QuestionDraft>, GenerationError> {
        self.calls.lock().unwrap().push("generate_questions");
        if competencies.is_empty() {
            return Ok(Vec::new());
        }
        self.questions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Self::exhausted("generate_questions")))
    }

    async fn score_kit(
        &self,
        _title: &str,
        _description: &str,
        _questions: &[QuestionSummary],
    ) -> Result<KitScore, GenerationError> {
        self.calls.lock().unwrap().push("score_kit");
        self.scores
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Self::exhausted("score_kit")))
    }
}
