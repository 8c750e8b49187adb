use thiserror::Error;

use crate::model::content::ContentBlock;
use crate::model::ids::{CourseId, SectionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SectionStateError {
    #[error("no section at index {index}")]
    UnknownSection { index: usize },

    #[error("section at index {index} is locked and cannot be completed")]
    CompleteWhileLocked { index: usize },
}

//
// ─── SECTION ───────────────────────────────────────────────────────────────────
//

/// An ordered group of blocks; the unit of locking and completion.
///
/// Sections are created locked. The unlock/complete flags have exactly one
/// writer: [`CoursePath::apply`]. Both the initial backend snapshot and the
/// unlock coordinator feed it, so "unlocked at load" and "unlocked via
/// completion" share one representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    id: SectionId,
    title: String,
    order: u32,
    unlocked: bool,
    completed: bool,
    blocks: Vec<ContentBlock>,
}

impl Section {
    #[must_use]
    pub fn new(
        id: SectionId,
        title: impl Into<String>,
        order: u32,
        blocks: Vec<ContentBlock>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            order,
            unlocked: false,
            completed: false,
            blocks,
        }
    }

    #[must_use]
    pub fn id(&self) -> SectionId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn order(&self) -> u32 {
        self.order
    }

    /// Once true, never reverts within a session.
    #[must_use]
    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    /// Implies `is_unlocked()`.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn blocks(&self) -> &[ContentBlock] {
        &self.blocks
    }

    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }
}

//
// ─── COURSE PATH + REDUCER ─────────────────────────────────────────────────────
//

/// State transition applied to a course path's section flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionEvent {
    /// Section becomes available. Idempotent.
    Unlock { index: usize },
    /// Section is confirmed complete by the backend. Idempotent; requires
    /// the section to already be unlocked.
    Complete { index: usize },
}

/// Ordered list of sections for one course; read-only after load except
/// through [`CoursePath::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoursePath {
    course_id: CourseId,
    sections: Vec<Section>,
}

impl CoursePath {
    #[must_use]
    pub fn new(course_id: CourseId, sections: Vec<Section>) -> Self {
        Self {
            course_id,
            sections,
        }
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    #[must_use]
    pub fn section(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Applies a section state transition. Sole writer of the
    /// unlocked/completed flags.
    ///
    /// # Errors
    ///
    /// Returns `SectionStateError::UnknownSection` for an out-of-range index
    /// and `SectionStateError::CompleteWhileLocked` when completing a locked
    /// section. Both are programming defects in the caller, not learner
    /// errors.
    pub fn apply(&mut self, event: SectionEvent) -> Result<(), SectionStateError> {
        match event {
            SectionEvent::Unlock { index } => {
                let section = self
                    .sections
                    .get_mut(index)
                    .ok_or(SectionStateError::UnknownSection { index })?;
                section.unlocked = true;
                Ok(())
            }
            SectionEvent::Complete { index } => {
                let section = self
                    .sections
                    .get_mut(index)
                    .ok_or(SectionStateError::UnknownSection { index })?;
                if !section.unlocked {
                    debug_assert!(false, "completing a locked section at index {index}");
                    return Err(SectionStateError::CompleteWhileLocked { index });
                }
                section.completed = true;
                Ok(())
            }
        }
    }
}
