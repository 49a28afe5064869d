// Generative Content Client: competency extraction, question generation,
// kit scoring. All model calls go through llm_client — no direct completion
// API calls here.

pub mod mock;
pub mod parse;
pub mod prompts;
pub mod types;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::llm_client::prompts::JSON_SYSTEM;
use crate::llm_client::{ChatClient, GenerationError};
use crate::generation::parse::parse_items;
use crate::generation::prompts::{
    bounded_prefix, COMPETENCIES_PROMPT_TEMPLATE, DESCRIPTION_PREFIX_CHARS,
    QUESTIONS_PROMPT_TEMPLATE, SCORE_DESCRIPTION_PREFIX_CHARS, SCORE_PROMPT_TEMPLATE,
};
use crate::generation::types::{CompetencyDraft, KitScore, QuestionDraft, QuestionSummary};

/// The three-operation contract against the remote generative model.
///
/// Carried in `AppState` as `Arc<dyn ContentGenerator>` so the wizard can be
/// driven by a scripted mock in tests (see `mock::MockGenerator`).
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Extracts 3-5 key competencies from a job title and description.
    /// Unexpected-but-well-formed JSON shapes degrade to an empty list.
    async fn extract_competencies(
        &self,
        title: &str,
        description: &str,
    ) -> Result<Vec<CompetencyDraft>, GenerationError>;

    /// Generates `count` interview questions per competency, each tagged
    /// with the name of the competency it belongs to.
    async fn generate_questions(
        &self,
        title: &str,
        competencies: &[CompetencyDraft],
        count: u32,
    ) -> Result<Vec<QuestionDraft>, GenerationError>;

    /// Rates the finished kit 0-100. Parse failures yield the zero-score
    /// fallback object instead of an error; only transport/HTTP failures
    /// surface, and the caller treats even those as non-blocking.
    async fn score_kit(
        &self,
        title: &str,
        description: &str,
        questions: &[QuestionSummary],
    ) -> Result<KitScore, GenerationError>;
}

/// Production generator backed by the chat-completion endpoint.
pub struct OpenAiGenerator {
    chat: ChatClient,
}

impl OpenAiGenerator {
    pub fn new(chat: ChatClient) -> Self {
        Self { chat }
    }
}

#[async_trait]
impl ContentGenerator for OpenAiGenerator {
    async fn extract_competencies(
        &self,
        title: &str,
        description: &str,
    ) -> Result<Vec<CompetencyDraft>, GenerationError> {
        let prompt = COMPETENCIES_PROMPT_TEMPLATE
            .replace("{job_title}", title)
            .replace(
                "{job_description}",
                &bounded_prefix(description, DESCRIPTION_PREFIX_CHARS),
            );

        let content = self.chat.complete(JSON_SYSTEM, &prompt).await?;
        let competencies: Vec<CompetencyDraft> = parse_items(&content, "competencies");
        debug!("Extracted {} competencies", competencies.len());
        Ok(competencies)
    }

    async fn generate_questions(
        &self,
        title: &str,
        competencies: &[CompetencyDraft],
        count: u32,
    ) -> Result<Vec<QuestionDraft>, GenerationError> {
        if competencies.is_empty() {
            return Ok(Vec::new());
        }

        let competencies_json =
            serde_json::to_string(competencies).unwrap_or_else(|_| "[]".to_string());
        let prompt = QUESTIONS_PROMPT_TEMPLATE
            .replace("{job_title}", title)
            .replace("{count}", &count.to_string())
            .replace("{competencies_json}", &competencies_json);

        let content = self.chat.complete(JSON_SYSTEM, &prompt).await?;
        let questions: Vec<QuestionDraft> = parse_items(&content, "questions");
        debug!(
            "Generated {} questions for {} competencies",
            questions.len(),
            competencies.len()
        );
        Ok(questions)
    }

    async fn score_kit(
        &self,
        title: &str,
        description: &str,
        questions: &[QuestionSummary],
    ) -> Result<KitScore, GenerationError> {
        let questions_json = serde_json::to_string(questions).unwrap_or_else(|_| "[]".to_string());
        let prompt = SCORE_PROMPT_TEMPLATE
            .replace("{job_title}", title)
            .replace(
                "{job_description}",
                &bounded_prefix(description, SCORE_DESCRIPTION_PREFIX_CHARS),
            )
            .replace("{questions_json}", &questions_json);

        let content = self.chat.complete(JSON_SYSTEM, &prompt).await?;
        match KitScore::parse(&content) {
            Some(score) => Ok(score),
            None => {
                warn!("Unparseable kit score response, returning fallback");
                Ok(KitScore::fallback())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_zero_competencies_returns_empty_without_a_call() {
        let generator = OpenAiGenerator::new(ChatClient::new("test-key".to_string()));
        let questions = generator
            .generate_questions("Backend Engineer", &[], 2)
            .await
            .unwrap();
        assert!(questions.is_empty());
    }
}
