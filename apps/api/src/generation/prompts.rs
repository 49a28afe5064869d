// All model prompt constants for the generation module.

/// Job descriptions are cut to this prefix before competency extraction to
/// respect request-size limits.
pub const DESCRIPTION_PREFIX_CHARS: usize = 3000;

/// Scoring sees a shorter description prefix than extraction does.
pub const SCORE_DESCRIPTION_PREFIX_CHARS: usize = 1000;

/// Returns at most `max_chars` characters of `text`, cut on a character
/// boundary.
pub fn bounded_prefix(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Competency extraction prompt. Replace `{job_title}` and
/// `{job_description}` before sending.
pub const COMPETENCIES_PROMPT_TEMPLATE: &str = r#"You are an expert HR consultant. Analyze the following job description and extract 3-5 key competencies required for the role.

Job Title: {job_title}
Job Description:
{job_description} -- truncated if too long

Return a JSON array of objects with "name" and "description" keys.
Example:
[
  { "name": "Strategic Planning", "description": "Ability to set long-term goals..." },
  { "name": "Python Proficiency", "description": "Strong experience with Python..." }
]"#;

/// Question generation prompt. Replace `{job_title}`, `{count}` and
/// `{competencies_json}` before sending.
pub const QUESTIONS_PROMPT_TEMPLATE: &str = r#"You are an expert HR consultant. Generate interview questions for the following competencies for the role of {job_title}.

Competencies:
{competencies_json}

For EACH competency, generate {count} questions.
Mix of "Behavioral" and "Competency" types.

Return a JSON array of objects with the following structure:
{
  "competencyName": "Name of competency",
  "text": "The question text",
  "category": "Behavioral" or "Competency",
  "explanation": "Why this question is good",
  "rubric_good": "Indicators of a good answer",
  "rubric_bad": "Red flags"
}"#;

/// Kit scoring prompt. Replace `{job_title}`, `{job_description}` and
/// `{questions_json}` before sending.
pub const SCORE_PROMPT_TEMPLATE: &str = r#"You are an expert HR consultant. Evaluate the quality of the following interview kit for the role of {job_title}.

Job Description:
{job_description}...

Generated Questions:
{questions_json}

Rate the quality of this interview kit on a scale of 0 to 100 based on:
1. Relevance to the job description.
2. Variety of question types (Behavioral, Competency, etc.).
3. Depth and clarity of questions.

Return a JSON object with:
{
  "score": number (0-100),
  "explanation": "A brief explanation of the score (max 2 sentences)."
}"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_prefix_short_text_unchanged() {
        assert_eq!(bounded_prefix("short", 3000), "short");
    }

    #[test]
    fn test_bounded_prefix_cuts_long_text() {
        let long = "x".repeat(5000);
        assert_eq!(bounded_prefix(&long, 3000).chars().count(), 3000);
    }

    #[test]
    fn test_bounded_prefix_is_char_safe() {
        // 'é' is two bytes; counting chars must not split it
        let text = "é".repeat(10);
        let prefix = bounded_prefix(&text, 4);
        assert_eq!(prefix, "éééé");
    }

    #[test]
    fn test_templates_keep_their_placeholders() {
        assert!(COMPETENCIES_PROMPT_TEMPLATE.contains("{job_title}"));
        assert!(COMPETENCIES_PROMPT_TEMPLATE.contains("{job_description}"));
        assert!(QUESTIONS_PROMPT_TEMPLATE.contains("{count}"));
        assert!(QUESTIONS_PROMPT_TEMPLATE.contains("{competencies_json}"));
        assert!(SCORE_PROMPT_TEMPLATE.contains("{questions_json}"));
    }
}
