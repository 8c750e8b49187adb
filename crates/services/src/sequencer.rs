use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

use lesson_core::dragdrop::{DragDropParseError, DragDropState};
use lesson_core::model::{ContentBlock, ContentItem, CoursePath, QuizId, Section};
use lesson_core::progress::Cursor;
use lesson_core::quiz::{QuizContent, QuizState};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SequencerError {
    #[error("course has no sections")]
    EmptyCourse,

    #[error("section at index {index} has no blocks")]
    EmptySection { index: usize },

    #[error("no section at index {index}")]
    UnknownSection { index: usize },

    #[error("already at the last block of the section")]
    AtSectionEnd,
}

//
// ─── ASSESSMENT SLOT ───────────────────────────────────────────────────────────
//

/// Lifecycle of the current block's assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssessmentPhase {
    NotAssessed,
    AwaitingInput,
    Checking,
    Completed,
}

/// Quiz assessment mounted for the current block. Content is fetched on
/// demand from the question resource and cached here only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSlot {
    pub quiz_id: QuizId,
    pub content: Option<QuizContent>,
    pub state: QuizState,
}

/// Assessment state for the current block. Created when the block is
/// revealed, discarded when the sequencer advances past it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockAssessment {
    /// Plain content; nothing gates.
    None,
    Quiz(QuizSlot),
    DragDrop(DragDropState),
    /// The authored drag-drop encoding failed to parse. The host renders an
    /// error card; the block does not gate, so a broken exercise cannot
    /// dead-end the lesson.
    Broken(DragDropParseError),
}

impl BlockAssessment {
    fn mount(block: &ContentBlock) -> Self {
        match block.assessment() {
            None => Self::None,
            Some(ContentItem::Quiz { quiz_id }) => Self::Quiz(QuizSlot {
                quiz_id: *quiz_id,
                content: None,
                state: QuizState::new(),
            }),
            Some(ContentItem::DragDrop {
                title,
                instructions,
                categories,
                items,
            }) => match DragDropState::parse(title.clone(), instructions.clone(), categories, items)
            {
                Ok(state) => Self::DragDrop(state),
                Err(err) => Self::Broken(err),
            },
            // `assessment()` only yields quiz/drag-drop items.
            Some(_) => Self::None,
        }
    }

    #[must_use]
    pub fn phase(&self) -> AssessmentPhase {
        match self {
            Self::None | Self::Broken(_) => AssessmentPhase::Completed,
            Self::Quiz(slot) => {
                if slot.state.is_completed() {
                    AssessmentPhase::Completed
                } else if slot.state.flash_until().is_some() {
                    AssessmentPhase::Checking
                } else if slot.state.selected().is_some() {
                    AssessmentPhase::AwaitingInput
                } else {
                    AssessmentPhase::NotAssessed
                }
            }
            Self::DragDrop(state) => {
                if state.is_completed() {
                    AssessmentPhase::Completed
                } else if state.revert_at().is_some() {
                    AssessmentPhase::Checking
                } else if state.items().iter().any(|i| i.current_category().is_some()) {
                    AssessmentPhase::AwaitingInput
                } else {
                    AssessmentPhase::NotAssessed
                }
            }
        }
    }

    /// Whether this slot allows the learner to move on.
    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        match self {
            Self::None | Self::Broken(_) => true,
            Self::Quiz(slot) => slot.state.is_completed() && slot.state.is_correct(),
            Self::DragDrop(state) => state.is_completed(),
        }
    }

    /// Clears any expired transient feedback (quiz flash, drag-drop shake
    /// and revert). Returns true if something changed.
    pub fn poll(&mut self, now: DateTime<Utc>) -> bool {
        match self {
            Self::Quiz(slot) => slot.state.clear_stale_feedback(now),
            Self::DragDrop(state) => state.settle(now),
            Self::None | Self::Broken(_) => false,
        }
    }
}

//
// ─── CONTROL LABEL ─────────────────────────────────────────────────────────────
//

/// Text shown on the single forward-progress control. The exact strings are
/// a behavioral compatibility requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlLabel {
    SelectAnswer,
    CheckAnswer,
    CheckAnswers,
    Continue,
    Finish,
}

impl fmt::Display for ControlLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::SelectAnswer => "Select Answer",
            Self::CheckAnswer => "Check Answer",
            Self::CheckAnswers => "Check Answers",
            Self::Continue => "Continue",
            Self::Finish => "Finish",
        };
        write!(f, "{text}")
    }
}

//
// ─── BLOCK SEQUENCER ───────────────────────────────────────────────────────────
//

/// Owns the cursor and the current block's assessment slot.
///
/// Reveal policy: blocks `0..=cursor.block` of the current section are
/// revealed; later blocks are not materialized at all, so a learner cannot
/// peek ahead. Assessment state exists only for the frontier block.
#[derive(Debug)]
pub struct BlockSequencer {
    path: CoursePath,
    cursor: Cursor,
    slot: BlockAssessment,
}

impl BlockSequencer {
    /// Positions the cursor at the first unlocked, uncompleted section
    /// (falling back to section 0) and mounts its first block.
    ///
    /// # Errors
    ///
    /// Returns `SequencerError::EmptyCourse` for a course without sections
    /// and `SequencerError::EmptySection` if any section has no blocks.
    pub fn new(path: CoursePath) -> Result<Self, SequencerError> {
        if path.is_empty() {
            return Err(SequencerError::EmptyCourse);
        }
        for (index, section) in path.sections().iter().enumerate() {
            if section.blocks().is_empty() {
                return Err(SequencerError::EmptySection { index });
            }
        }

        let start = path
            .sections()
            .iter()
            .position(|s| s.is_unlocked() && !s.is_completed())
            .unwrap_or(0);

        let cursor = Cursor::start_of(start);
        let slot = BlockAssessment::mount(&path.sections()[start].blocks()[0]);
        Ok(Self { path, cursor, slot })
    }

    #[must_use]
    pub fn path(&self) -> &CoursePath {
        &self.path
    }

    pub(crate) fn path_mut(&mut self) -> &mut CoursePath {
        &mut self.path
    }

    #[must_use]
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    #[must_use]
    pub fn current_section(&self) -> &Section {
        &self.path.sections()[self.cursor.section]
    }

    #[must_use]
    pub fn current_block(&self) -> &ContentBlock {
        &self.current_section().blocks()[self.cursor.block]
    }

    /// Blocks revealed so far in the current section, oldest first.
    #[must_use]
    pub fn revealed_blocks(&self) -> &[ContentBlock] {
        &self.current_section().blocks()[..=self.cursor.block]
    }

    #[must_use]
    pub fn slot(&self) -> &BlockAssessment {
        &self.slot
    }

    pub(crate) fn slot_mut(&mut self) -> &mut BlockAssessment {
        &mut self.slot
    }

    #[must_use]
    pub fn is_last_block(&self) -> bool {
        self.cursor.block + 1 == self.current_section().block_count()
    }

    #[must_use]
    pub fn is_last_section(&self) -> bool {
        self.cursor.section + 1 == self.path.len()
    }

    /// True when the current block has no gating assessment or its
    /// assessment is completed with a positive outcome.
    #[must_use]
    pub fn can_advance(&self) -> bool {
        self.slot.is_satisfied()
    }

    #[must_use]
    pub fn control_label(&self) -> ControlLabel {
        let terminal = if self.is_last_block() && self.is_last_section() {
            ControlLabel::Finish
        } else {
            ControlLabel::Continue
        };
        match &self.slot {
            BlockAssessment::None | BlockAssessment::Broken(_) => terminal,
            BlockAssessment::Quiz(slot) => {
                if self.slot.is_satisfied() {
                    terminal
                } else if slot.state.selected().is_none() {
                    ControlLabel::SelectAnswer
                } else {
                    ControlLabel::CheckAnswer
                }
            }
            BlockAssessment::DragDrop(_) => {
                if self.slot.is_satisfied() {
                    terminal
                } else {
                    ControlLabel::CheckAnswers
                }
            }
        }
    }

    /// Reveals the next block of the current section and mounts a fresh
    /// assessment slot for it. The old slot is discarded.
    ///
    /// # Errors
    ///
    /// Returns `SequencerError::AtSectionEnd` on the last block; section
    /// boundaries are the unlock coordinator's job.
    pub(crate) fn step_forward(&mut self) -> Result<(), SequencerError> {
        if self.is_last_block() {
            return Err(SequencerError::AtSectionEnd);
        }
        self.cursor.block += 1;
        self.slot = BlockAssessment::mount(self.current_block());
        Ok(())
    }

    /// Moves to the first block of `index` after a section completes.
    ///
    /// # Errors
    ///
    /// Returns `SequencerError::UnknownSection` for an out-of-range index.
    pub(crate) fn enter_section(&mut self, index: usize) -> Result<(), SequencerError> {
        if index >= self.path.len() {
            return Err(SequencerError::UnknownSection { index });
        }
        self.cursor = Cursor::start_of(index);
        self.slot = BlockAssessment::mount(self.current_block());
        Ok(())
    }
}
