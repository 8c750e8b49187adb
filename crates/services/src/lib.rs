#![forbid(unsafe_code)]

pub mod coordinator;
pub mod error;
pub mod player;
pub mod sequencer;

pub use lesson_core::Clock;

pub use coordinator::{CompletionOutcome, CompletionTicket, SectionUnlockCoordinator};
pub use error::PlayerError;
pub use player::{Activation, LessonPlayer};
pub use sequencer::{
    AssessmentPhase, BlockAssessment, BlockSequencer, ControlLabel, QuizSlot, SequencerError,
};
