use lesson_core::model::{CoursePath, Section, SectionEvent, SectionId, SectionStateError};
use platform_api::{CompletionAck, StreakSignal};

/// Proof that a completion request was admitted. At most one ticket exists
/// per outstanding request; it must be returned through `settle_success` or
/// `settle_failure`.
#[derive(Debug)]
pub struct CompletionTicket {
    section_id: SectionId,
    index: usize,
}

impl CompletionTicket {
    #[must_use]
    pub fn section_id(&self) -> SectionId {
        self.section_id
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Result of a successfully settled section completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The completed section had a successor, now unlocked.
    NextSectionUnlocked {
        next_index: usize,
        streak: Option<StreakSignal>,
    },
    /// The completed section was the last one.
    CourseCompleted { streak: Option<StreakSignal> },
}

/// Coordinates the "complete section and unlock next" workflow.
///
/// An explicit in-flight guard serializes completion requests: a second
/// `advance()` while one is outstanding (a double click, say) gets no
/// ticket and sends nothing, instead of issuing a duplicate completion
/// request. The guard is engine state, not UI disabling.
#[derive(Debug, Default)]
pub struct SectionUnlockCoordinator {
    in_flight: Option<SectionId>,
}

impl SectionUnlockCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Admits a completion request for the section. Returns `None` while
    /// another request is outstanding, and for a section the path already
    /// marks completed, so a settled section is never re-sent.
    #[must_use]
    pub fn try_begin(
        &mut self,
        path: &CoursePath,
        section_id: SectionId,
        index: usize,
    ) -> Option<CompletionTicket> {
        if self.in_flight.is_some() {
            log::info!("collapsing duplicate completion request for section {section_id}");
            return None;
        }
        if path.section(index).is_some_and(Section::is_completed) {
            log::info!("section {section_id} is already completed; nothing to send");
            return None;
        }
        self.in_flight = Some(section_id);
        Some(CompletionTicket { section_id, index })
    }

    /// Applies a successful completion acknowledgment: the section is marked
    /// completed and its successor (if any) unlocked, both through the
    /// course path reducer.
    ///
    /// # Errors
    ///
    /// Propagates `SectionStateError` from the reducer; with a valid ticket
    /// this indicates a defect.
    pub fn settle_success(
        &mut self,
        path: &mut CoursePath,
        ticket: CompletionTicket,
        ack: CompletionAck,
    ) -> Result<CompletionOutcome, SectionStateError> {
        self.in_flight = None;
        path.apply(SectionEvent::Complete {
            index: ticket.index,
        })?;

        let next_index = ticket.index + 1;
        if next_index < path.len() {
            path.apply(SectionEvent::Unlock { index: next_index })?;
            Ok(CompletionOutcome::NextSectionUnlocked {
                next_index,
                streak: ack.streak,
            })
        } else {
            Ok(CompletionOutcome::CourseCompleted { streak: ack.streak })
        }
    }

    /// Releases the guard after a failed remote call. Section flags and the
    /// cursor stay untouched; the learner may retry.
    pub fn settle_failure(&mut self, ticket: CompletionTicket) {
        log::warn!(
            "section completion failed for {}; awaiting learner retry",
            ticket.section_id
        );
        self.in_flight = None;
    }
}
