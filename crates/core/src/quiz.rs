use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::model::OptionId;

/// How long the "incorrect" flash stays visible after a failed check.
pub const QUIZ_FLASH_MS: i64 = 2_000;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizContentError {
    #[error("quiz has no options")]
    NoOptions,

    #[error("option {id} has empty display text")]
    EmptyOptionText { id: OptionId },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizCheckError {
    /// Checking before any selection. Surfaced as an inline validation
    /// message, never as an unwinding failure.
    #[error("select an answer before checking")]
    NoSelection,

    /// The selected id is not part of this quiz. A defect in the caller.
    #[error("selected option {0} is not part of this quiz")]
    UnknownOption(OptionId),
}

//
// ─── QUIZ CONTENT ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizOption {
    pub id: OptionId,
    pub text: String,
}

/// A question plus its options as delivered by the question resource.
///
/// Data contract: **the first option is the correct one**. The platform
/// shuffles options at render time; the engine never does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizContent {
    question: String,
    options: Vec<QuizOption>,
}

impl QuizContent {
    /// # Errors
    ///
    /// Returns `QuizContentError::NoOptions` for an empty option list and
    /// `QuizContentError::EmptyOptionText` for an option with blank text.
    pub fn new(
        question: impl Into<String>,
        options: Vec<QuizOption>,
    ) -> Result<Self, QuizContentError> {
        if options.is_empty() {
            return Err(QuizContentError::NoOptions);
        }
        if let Some(bad) = options.iter().find(|o| o.text.trim().is_empty()) {
            return Err(QuizContentError::EmptyOptionText { id: bad.id.clone() });
        }
        Ok(Self {
            question: question.into(),
            options,
        })
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn options(&self) -> &[QuizOption] {
        &self.options
    }

    /// The canonical correct option (first by contract).
    #[must_use]
    pub fn canonical(&self) -> &QuizOption {
        &self.options[0]
    }

    #[must_use]
    pub fn option(&self, id: &OptionId) -> Option<&QuizOption> {
        self.options.iter().find(|o| &o.id == id)
    }
}

//
// ─── QUIZ STATE ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizVerdict {
    Correct,
    Incorrect,
}

/// Per-block-instance quiz state. Created when a quiz block mounts,
/// discarded when the sequencer advances past it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuizState {
    selected: Option<OptionId>,
    completed: bool,
    correct: bool,
    flash_until: Option<DateTime<Utc>>,
}

impl QuizState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the learner's choice. Does not mark the quiz completed.
    pub fn select(&mut self, option: OptionId) {
        self.selected = Some(option);
    }

    #[must_use]
    pub fn selected(&self) -> Option<&OptionId> {
        self.selected.as_ref()
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.correct
    }

    /// Deadline of the transient "incorrect" flash, while one is active.
    #[must_use]
    pub fn flash_until(&self) -> Option<DateTime<Utc>> {
        self.flash_until
    }

    /// Evaluates the current selection against `content`.
    ///
    /// Correctness is **text equality with the canonical first option**, not
    /// option identity. Two options sharing display text are therefore both
    /// "correct" - a quirk of the authored content format that the engine
    /// preserves for compatibility.
    ///
    /// On an incorrect answer the selection is retained and a flash window
    /// opens for [`QUIZ_FLASH_MS`]; the learner may check again.
    ///
    /// # Errors
    ///
    /// Returns `QuizCheckError::NoSelection` when nothing is selected; no
    /// state is mutated in that case. `QuizCheckError::UnknownOption` means
    /// the selection does not belong to this quiz, which is a caller defect.
    pub fn check(
        &mut self,
        content: &QuizContent,
        now: DateTime<Utc>,
    ) -> Result<QuizVerdict, QuizCheckError> {
        let Some(selected) = self.selected.as_ref() else {
            return Err(QuizCheckError::NoSelection);
        };
        let chosen = content
            .option(selected)
            .ok_or_else(|| QuizCheckError::UnknownOption(selected.clone()))?;

        if chosen.text == content.canonical().text {
            self.completed = true;
            self.correct = true;
            self.flash_until = None;
            Ok(QuizVerdict::Correct)
        } else {
            self.correct = false;
            self.flash_until = Some(now + Duration::milliseconds(QUIZ_FLASH_MS));
            Ok(QuizVerdict::Incorrect)
        }
    }

    /// Clears an expired incorrect flash. Returns true if one was cleared.
    pub fn clear_stale_feedback(&mut self, now: DateTime<Utc>) -> bool {
        match self.flash_until {
            Some(deadline) if now >= deadline => {
                self.flash_until = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn option(id: &str, text: &str) -> QuizOption {
        QuizOption {
            id: OptionId::new(id),
            text: text.to_string(),
        }
    }

    fn content() -> QuizContent {
        QuizContent::new(
            "Which of these is an asset?",
            vec![
                option("a", "Rental property"),
                option("b", "Car loan"),
                option("c", "Credit card debt"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn check_before_select_fails_without_mutation() {
        let mut state = QuizState::new();
        let err = state.check(&content(), fixed_now()).unwrap_err();
        assert_eq!(err, QuizCheckError::NoSelection);
        assert!(!state.is_completed());
        assert!(!state.is_correct());
    }

    #[test]
    fn correct_selection_completes() {
        let mut state = QuizState::new();
        state.select(OptionId::new("a"));
        let verdict = state.check(&content(), fixed_now()).unwrap();
        assert_eq!(verdict, QuizVerdict::Correct);
        assert!(state.is_completed());
        assert!(state.is_correct());
        assert!(state.flash_until().is_none());
    }

    #[test]
    fn incorrect_selection_keeps_choice_and_opens_flash() {
        let now = fixed_now();
        let mut state = QuizState::new();
        state.select(OptionId::new("b"));
        let verdict = state.check(&content(), now).unwrap();
        assert_eq!(verdict, QuizVerdict::Incorrect);
        assert!(!state.is_completed());
        assert_eq!(state.selected(), Some(&OptionId::new("b")));
        assert_eq!(
            state.flash_until(),
            Some(now + Duration::milliseconds(QUIZ_FLASH_MS))
        );

        // Retry on the same state is allowed.
        state.select(OptionId::new("a"));
        assert_eq!(state.check(&content(), now).unwrap(), QuizVerdict::Correct);
    }

    #[test]
    fn flash_clears_only_after_the_window() {
        let now = fixed_now();
        let mut state = QuizState::new();
        state.select(OptionId::new("c"));
        state.check(&content(), now).unwrap();

        assert!(!state.clear_stale_feedback(now + Duration::milliseconds(QUIZ_FLASH_MS - 1)));
        assert!(state.flash_until().is_some());
        assert!(state.clear_stale_feedback(now + Duration::milliseconds(QUIZ_FLASH_MS)));
        assert!(state.flash_until().is_none());
    }

    #[test]
    fn duplicate_text_options_share_one_verdict() {
        // The documented hazard of the text-equality policy: either
        // duplicate-text option evaluates the same way.
        let quiz = QuizContent::new(
            "Pick one",
            vec![
                option("a", "Asset"),
                option("b", "Asset"),
                option("c", "Liability"),
            ],
        )
        .unwrap();

        let mut first = QuizState::new();
        first.select(OptionId::new("a"));
        let mut second = QuizState::new();
        second.select(OptionId::new("b"));

        assert_eq!(first.check(&quiz, fixed_now()).unwrap(), QuizVerdict::Correct);
        assert_eq!(second.check(&quiz, fixed_now()).unwrap(), QuizVerdict::Correct);
    }

    #[test]
    fn unknown_selection_is_a_defect() {
        let mut state = QuizState::new();
        state.select(OptionId::new("zz"));
        let err = state.check(&content(), fixed_now()).unwrap_err();
        assert_eq!(err, QuizCheckError::UnknownOption(OptionId::new("zz")));
    }

    #[test]
    fn empty_option_list_is_rejected() {
        let err = QuizContent::new("Q", Vec::new()).unwrap_err();
        assert_eq!(err, QuizContentError::NoOptions);
    }
}
