use serde::{Deserialize, Deserializer, Serialize};

/// A competency as the model returns it: name plus a short description.
/// Also the shape sent back into question generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompetencyDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Interview question categories. The generation prompt asks for Behavioral
/// and Competency; the other two arrive from manual edits and older kits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum QuestionCategory {
    #[default]
    Competency,
    Behavioral,
    Situational,
    Deceiving,
}

impl QuestionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionCategory::Competency => "Competency",
            QuestionCategory::Behavioral => "Behavioral",
            QuestionCategory::Situational => "Situational",
            QuestionCategory::Deceiving => "Deceiving",
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label {
            "Behavioral" => QuestionCategory::Behavioral,
            "Situational" => QuestionCategory::Situational,
            "Deceiving" => QuestionCategory::Deceiving,
            _ => QuestionCategory::Competency,
        }
    }
}

// Unknown category labels from the model degrade to Competency instead of
// failing the whole batch.
impl<'de> Deserialize<'de> for QuestionCategory {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let label = String::deserialize(deserializer).unwrap_or_default();
        Ok(QuestionCategory::from_label(&label))
    }
}

/// An interview question as the model returns it, tagged with the name of
/// the competency it was generated for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionDraft {
    #[serde(rename = "competencyName", default)]
    pub competency_name: String,
    #[serde(default)]
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

/// The `{text, category}` projection sent into kit scoring. Rubrics and
/// explanations are deliberately excluded from the scoring prompt.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionSummary {
    pub text: String,
    pub category: QuestionCategory,
}

/// Advisory kit quality score. Never blocks finalization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KitScore {
    pub score: u8,
    pub explanation: String,
}

impl KitScore {
    /// The object returned whenever scoring cannot produce a real result.
    pub fn fallback() -> Self {
        KitScore {
            score: 0,
            explanation: "Failed to generate score.".to_string(),
        }
    }

    /// Parses a scoring response body. Accepts integer or float scores and
    /// clamps into 0-100. Returns None for anything unparseable.
    pub fn parse(content: &str) -> Option<Self> {
        #[derive(Deserialize)]
        struct RawScore {
            score: serde_json::Number,
            #[serde(default)]
            explanation: String,
        }

        let raw: RawScore = serde_json::from_str(content).ok()?;
        let score = raw.score.as_f64()?.round().clamp(0.0, 100.0) as u8;
        Some(KitScore {
            score,
            explanation: raw.explanation,
        })
    }
}
