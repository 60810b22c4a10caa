//! Quiz answers to story prompt.
//!
//! The quiz itself is configured on the client; the server only sees the
//! ordered answers and flattens them into the prompt the model receives.

use serde::Deserialize;

use crate::error::CoreError;

/// Maximum prompt length in characters.
pub const MAX_PROMPT_LENGTH: usize = 4_000;

/// One answered quiz step.
#[derive(Debug, Clone, Deserialize)]
pub struct QuizAnswer {
    /// Step identifier, e.g. `"Tone"` or `"Character"`.
    pub question: String,
    pub answer: String,
}

/// Flatten answers into `"{question}: {answer}"` pairs joined by `". "`.
///
/// Blank answers are skipped. The result is validated with
/// [`validate_prompt`].
///
/// ```
/// use curico_core::quiz::{assemble_prompt, QuizAnswer};
///
/// let answers = vec![
///     QuizAnswer { question: "Tone".into(), answer: "Adventurous".into() },
///     QuizAnswer { question: "Character".into(), answer: "Luna".into() },
/// ];
/// assert_eq!(
///     assemble_prompt(&answers).unwrap(),
///     "Tone: Adventurous. Character: Luna"
/// );
/// ```
pub fn assemble_prompt(answers: &[QuizAnswer]) -> Result<String, CoreError> {
    let prompt = answers
        .iter()
        .filter(|a| !a.answer.trim().is_empty())
        .map(|a| format!("{}: {}", a.question.trim(), a.answer.trim()))
        .collect::<Vec<_>>()
        .join(". ");

    validate_prompt(&prompt)?;
    Ok(prompt)
}

/// Validate a story prompt: must be non-blank and within length limit.
pub fn validate_prompt(prompt: &str) -> Result<(), CoreError> {
    if prompt.trim().is_empty() {
        return Err(CoreError::Validation("Prompt must not be empty".to_string()));
    }
    let len = prompt.chars().count();
    if len > MAX_PROMPT_LENGTH {
        return Err(CoreError::Validation(format!(
            "Prompt exceeds maximum length of {MAX_PROMPT_LENGTH} characters (got {len})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_validation(err: &CoreError) -> bool {
        matches!(err, CoreError::Validation(_))
    }

    fn answer(q: &str, a: &str) -> QuizAnswer {
        QuizAnswer {
            question: q.to_string(),
            answer: a.to_string(),
        }
    }

    #[test]
    fn joins_answers_in_order() {
        let prompt = assemble_prompt(&[
            answer("Tone", "Adventurous"),
            answer("Character", "Luna"),
            answer("Setting", "A floating island"),
        ])
        .unwrap();
        assert_eq!(
            prompt,
            "Tone: Adventurous. Character: Luna. Setting: A floating island"
        );
    }

    #[test]
    fn blank_answers_are_skipped() {
        let prompt =
            assemble_prompt(&[answer("Tone", "  "), answer("Character", " Luna ")]).unwrap();
        assert_eq!(prompt, "Character: Luna");
    }

    #[test]
    fn all_blank_answers_are_rejected() {
        let err = assemble_prompt(&[answer("Tone", "")]).unwrap_err();
        assert!(is_validation(&err));
        let err = assemble_prompt(&[]).unwrap_err();
        assert!(is_validation(&err));
    }

    #[test]
    fn overlong_prompt_is_rejected() {
        let long = "x".repeat(MAX_PROMPT_LENGTH + 1);
        assert!(is_validation(&validate_prompt(&long).unwrap_err()));
        assert!(validate_prompt(&"x".repeat(MAX_PROMPT_LENGTH)).is_ok());
    }
}
