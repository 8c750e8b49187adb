//! Shared error types for the services crate.

use thiserror::Error;

use lesson_core::dragdrop::PlaceError;
use lesson_core::model::SectionStateError;
use lesson_core::quiz::QuizCheckError;
use platform_api::ApiError;

use crate::sequencer::SequencerError;

/// Errors emitted by `LessonPlayer`.
///
/// Learner-recoverable conditions (no selection yet, nothing placed) are
/// not errors; they come back as [`crate::Activation::Rejected`] inline
/// messages. `Remote` is the only class the host should offer a retry for;
/// the rest are defects.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PlayerError {
    #[error(transparent)]
    Sequencer(#[from] SequencerError),

    #[error("current block has no quiz to answer")]
    NoQuizHere,

    #[error("current block has no drag and drop exercise")]
    NoExerciseHere,

    /// Invariant-class quiz failure (`UnknownOption`); `NoSelection` never
    /// reaches this type.
    #[error(transparent)]
    Quiz(QuizCheckError),

    #[error(transparent)]
    Placement(#[from] PlaceError),

    #[error(transparent)]
    SectionState(#[from] SectionStateError),

    /// Remote call failed; section state and cursor are unchanged and the
    /// learner may retry the triggering action.
    #[error(transparent)]
    Remote(#[from] ApiError),
}
