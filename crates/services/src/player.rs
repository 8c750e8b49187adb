use std::sync::Arc;

use lesson_core::Clock;
use lesson_core::dragdrop::CheckReport;
use lesson_core::model::{ContentBlock, CoursePath, DragItemId, OptionId};
use lesson_core::progress::{BlockProgress, Cursor, block_progress};
use lesson_core::quiz::{QuizCheckError, QuizVerdict};
use platform_api::{CompletionApi, QuizSource, SectionCompletionRequest, StreakSignal};

use crate::coordinator::{CompletionOutcome, SectionUnlockCoordinator};
use crate::error::PlayerError;
use crate::sequencer::{BlockAssessment, BlockSequencer, ControlLabel};

/// What happened when the learner pressed the forward-progress control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// A local validation stopped the action; show the message inline.
    /// Nothing was mutated.
    Rejected { message: String },
    /// The current quiz was checked.
    QuizChecked(QuizVerdict),
    /// The current drag-drop exercise was checked.
    ExerciseChecked(CheckReport),
    /// Moved to the next block within the section, or into the next section
    /// when revisiting already-completed content.
    Advanced,
    /// The section was completed remotely and the next one unlocked; the
    /// cursor now sits on its first block.
    SectionCompleted {
        next_index: usize,
        streak: Option<StreakSignal>,
    },
    /// The last section of the course was completed.
    CourseCompleted { streak: Option<StreakSignal> },
    /// The press did nothing: a completion request is already outstanding,
    /// or the course is already finished.
    Ignored,
}

/// Orchestrates one learner's walk through a course.
///
/// Single-threaded and event-driven: every operation is synchronous except
/// the remote calls (section completion, quiz fetch). The host drives it
/// from UI callbacks and renders from the view accessors.
pub struct LessonPlayer {
    sequencer: BlockSequencer,
    coordinator: SectionUnlockCoordinator,
    api: Arc<dyn CompletionApi>,
    quizzes: Arc<dyn QuizSource>,
    clock: Clock,
}

impl LessonPlayer {
    /// Opens a course: positions the sequencer and fetches quiz content for
    /// the first block if it needs any.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::Sequencer` for an unplayable course and
    /// `PlayerError::Remote` if the initial quiz fetch fails.
    pub async fn open(
        path: CoursePath,
        api: Arc<dyn CompletionApi>,
        quizzes: Arc<dyn QuizSource>,
        clock: Clock,
    ) -> Result<Self, PlayerError> {
        let sequencer = BlockSequencer::new(path)?;
        let mut player = Self {
            sequencer,
            coordinator: SectionUnlockCoordinator::new(),
            api,
            quizzes,
            clock,
        };
        player.ensure_quiz_loaded().await?;
        Ok(player)
    }

    //
    // ─── VIEWS ─────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn course(&self) -> &CoursePath {
        self.sequencer.path()
    }

    #[must_use]
    pub fn cursor(&self) -> Cursor {
        self.sequencer.cursor()
    }

    #[must_use]
    pub fn revealed_blocks(&self) -> &[ContentBlock] {
        self.sequencer.revealed_blocks()
    }

    #[must_use]
    pub fn assessment(&self) -> &BlockAssessment {
        self.sequencer.slot()
    }

    #[must_use]
    pub fn control_label(&self) -> ControlLabel {
        self.sequencer.control_label()
    }

    #[must_use]
    pub fn can_advance(&self) -> bool {
        self.sequencer.can_advance()
    }

    #[must_use]
    pub fn progress(&self) -> BlockProgress {
        block_progress(self.sequencer.path(), self.sequencer.cursor())
    }

    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    //
    // ─── LEARNER INPUT ─────────────────────────────────────────────────────
    //

    /// Records a quiz option choice on the current block.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::NoQuizHere` if the current block has no quiz.
    pub fn select_option(&mut self, option: OptionId) -> Result<(), PlayerError> {
        match self.sequencer.slot_mut() {
            BlockAssessment::Quiz(slot) => {
                slot.state.select(option);
                Ok(())
            }
            _ => Err(PlayerError::NoQuizHere),
        }
    }

    /// Moves a drag item into a category, or back to unassigned.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::NoExerciseHere` if the current block has no
    /// drag-drop exercise, and propagates placement defects.
    pub fn place_item(
        &mut self,
        item: DragItemId,
        category: Option<&str>,
    ) -> Result<(), PlayerError> {
        match self.sequencer.slot_mut() {
            BlockAssessment::DragDrop(state) => {
                state.place(item, category)?;
                Ok(())
            }
            _ => Err(PlayerError::NoExerciseHere),
        }
    }

    /// Clears expired transient feedback (incorrect flash, shake revert)
    /// according to the player's clock. Returns true if anything changed.
    /// The host calls this after the feedback delay elapses, or on a tick.
    pub fn poll_feedback(&mut self) -> bool {
        let now = self.clock.now();
        self.sequencer.slot_mut().poll(now)
    }

    //
    // ─── THE FORWARD-PROGRESS CONTROL ──────────────────────────────────────
    //

    /// The single forward-progress action bound to the footer control.
    ///
    /// With an unsatisfied assessment on the current block this checks it;
    /// otherwise it advances: within a section by revealing the next block,
    /// on the last block by completing the section remotely. A press while
    /// a completion request is outstanding returns `Activation::Ignored`
    /// without issuing a second request.
    ///
    /// On a successful section completion the completed flag, the unlock of
    /// the next section, and the cursor move all happen before this returns;
    /// no intermediate state is observable.
    ///
    /// # Errors
    ///
    /// `PlayerError::Remote` when the completion call or a quiz fetch fails.
    /// A failed completion leaves section flags and the cursor untouched. A
    /// failed quiz fetch can land after the next block was already revealed;
    /// that block's slot then stays unloaded and activating again retries
    /// the fetch.
    pub async fn activate(&mut self) -> Result<Activation, PlayerError> {
        self.poll_feedback();
        self.ensure_quiz_loaded().await?;
        let now = self.clock.now();

        match self.sequencer.slot_mut() {
            BlockAssessment::Quiz(slot) if !slot.state.is_completed() => {
                let Some(content) = slot.content.clone() else {
                    // Fetch above either filled this in or errored.
                    return Err(PlayerError::NoQuizHere);
                };
                match slot.state.check(&content, now) {
                    Ok(verdict) => Ok(Activation::QuizChecked(verdict)),
                    Err(QuizCheckError::NoSelection) => Ok(Activation::Rejected {
                        message: QuizCheckError::NoSelection.to_string(),
                    }),
                    Err(err) => Err(PlayerError::Quiz(err)),
                }
            }
            BlockAssessment::DragDrop(state) if !state.is_completed() => {
                if !state.all_placed() && state.items().iter().all(|i| i.current_category().is_none())
                {
                    return Ok(Activation::Rejected {
                        message: "place the items before checking".to_string(),
                    });
                }
                Ok(Activation::ExerciseChecked(state.check(now)))
            }
            _ => self.advance().await,
        }
    }

    async fn advance(&mut self) -> Result<Activation, PlayerError> {
        if !self.sequencer.can_advance() {
            return Ok(Activation::Rejected {
                message: "finish the exercise before continuing".to_string(),
            });
        }

        if !self.sequencer.is_last_block() {
            self.sequencer.step_forward()?;
            self.ensure_quiz_loaded().await?;
            return Ok(Activation::Advanced);
        }

        // Last block: hand off to the unlock coordinator.
        let section = self.sequencer.current_section();
        let index = self.sequencer.cursor().section;

        // Revisiting a section the backend already marked completed: move on
        // locally, there is nothing to send.
        if section.is_completed() {
            let next_index = index + 1;
            if next_index < self.sequencer.path().len() {
                self.sequencer.enter_section(next_index)?;
                self.ensure_quiz_loaded().await?;
                return Ok(Activation::Advanced);
            }
            return Ok(Activation::Ignored);
        }

        let request = SectionCompletionRequest {
            section_id: section.id(),
            course_id: self.sequencer.path().course_id(),
            current_order: section.order(),
        };
        let Some(ticket) = self
            .coordinator
            .try_begin(self.sequencer.path(), section.id(), index)
        else {
            return Ok(Activation::Ignored);
        };

        match self.api.complete_section(request).await {
            Ok(ack) => {
                let outcome =
                    self.coordinator
                        .settle_success(self.sequencer.path_mut(), ticket, ack)?;
                match outcome {
                    CompletionOutcome::NextSectionUnlocked { next_index, streak } => {
                        self.sequencer.enter_section(next_index)?;
                        self.ensure_quiz_loaded().await?;
                        Ok(Activation::SectionCompleted { next_index, streak })
                    }
                    CompletionOutcome::CourseCompleted { streak } => {
                        Ok(Activation::CourseCompleted { streak })
                    }
                }
            }
            Err(err) => {
                self.coordinator.settle_failure(ticket);
                Err(PlayerError::Remote(err))
            }
        }
    }

    /// Fetches the current block's quiz content if it is still missing.
    async fn ensure_quiz_loaded(&mut self) -> Result<(), PlayerError> {
        let quiz_id = match self.sequencer.slot() {
            BlockAssessment::Quiz(slot) if slot.content.is_none() => slot.quiz_id,
            _ => return Ok(()),
        };
        let content = self.quizzes.fetch_quiz(quiz_id).await?;
        if let BlockAssessment::Quiz(slot) = self.sequencer.slot_mut() {
            slot.content = Some(content);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use lesson_core::dragdrop::SHAKE_MS;
    use lesson_core::model::{
        BlockId, ContentItem, CourseId, CoursePath, QuizId, Section, SectionEvent, SectionId,
    };
    use lesson_core::quiz::{QUIZ_FLASH_MS, QuizContent, QuizOption};
    use lesson_core::time::fixed_clock;
    use platform_api::InMemoryBackend;

    fn text_block(title: &str, order: u32) -> ContentBlock {
        ContentBlock::new(
            BlockId::random(),
            title,
            order,
            vec![ContentItem::Text {
                body: "body".to_string(),
            }],
        )
    }

    fn quiz_content() -> QuizContent {
        QuizContent::new(
            "Which is an asset?",
            vec![
                QuizOption {
                    id: OptionId::new("a"),
                    text: "Rental property".to_string(),
                },
                QuizOption {
                    id: OptionId::new("b"),
                    text: "Car loan".to_string(),
                },
            ],
        )
        .unwrap()
    }

    /// Two sections: [text, quiz] then [text, drag-drop].
    fn course(backend: &InMemoryBackend) -> CoursePath {
        let quiz_id = QuizId::random();
        backend.insert_quiz(quiz_id, quiz_content());

        let drag = ContentItem::DragDrop {
            title: "Sort".to_string(),
            instructions: "Drag each".to_string(),
            categories: "Asset\nLiability".to_string(),
            items: "Rental property → Asset\nCar loan → Liability".to_string(),
        };

        let sections = vec![
            Section::new(
                SectionId::random(),
                "Basics",
                0,
                vec![
                    text_block("Welcome", 0),
                    ContentBlock::new(
                        BlockId::random(),
                        "Quick check",
                        1,
                        vec![ContentItem::Quiz { quiz_id }],
                    ),
                ],
            ),
            Section::new(
                SectionId::random(),
                "Sorting",
                1,
                vec![
                    text_block("Theory", 0),
                    ContentBlock::new(BlockId::random(), "Practice", 1, vec![drag]),
                ],
            ),
        ];
        let mut path = CoursePath::new(CourseId::random(), sections);
        path.apply(SectionEvent::Unlock { index: 0 }).unwrap();
        path
    }

    async fn open_player(backend: &InMemoryBackend) -> LessonPlayer {
        let path = course(backend);
        LessonPlayer::open(
            path,
            Arc::new(backend.clone()),
            Arc::new(backend.clone()),
            fixed_clock(),
        )
        .await
        .unwrap()
    }

    fn drag_item_id(player: &LessonPlayer, text: &str) -> DragItemId {
        let BlockAssessment::DragDrop(state) = player.assessment() else {
            panic!("expected drag-drop slot");
        };
        state
            .items()
            .iter()
            .find(|i| i.text() == text)
            .unwrap()
            .id()
    }

    #[tokio::test]
    async fn advancing_a_plain_block_reveals_the_next() {
        let backend = InMemoryBackend::new();
        let mut player = open_player(&backend).await;

        assert_eq!(player.progress(), BlockProgress { completed: 0, total: 4 });
        let activation = player.activate().await.unwrap();
        assert_eq!(activation, Activation::Advanced);
        assert_eq!(player.cursor(), Cursor { section: 0, block: 1 });
        assert_eq!(player.revealed_blocks().len(), 2);
        assert_eq!(player.progress(), BlockProgress { completed: 1, total: 4 });
    }

    #[tokio::test]
    async fn quiz_gates_until_answered_correctly() {
        let backend = InMemoryBackend::new();
        let mut player = open_player(&backend).await;
        player.activate().await.unwrap();

        // Checking with nothing selected: inline rejection, no mutation.
        let rejected = player.activate().await.unwrap();
        assert!(matches!(rejected, Activation::Rejected { .. }));
        assert!(!player.can_advance());
        assert_eq!(player.control_label(), ControlLabel::SelectAnswer);

        // Wrong answer: incorrect verdict, flash, retry possible.
        player.select_option(OptionId::new("b")).unwrap();
        assert_eq!(player.control_label(), ControlLabel::CheckAnswer);
        let checked = player.activate().await.unwrap();
        assert_eq!(checked, Activation::QuizChecked(QuizVerdict::Incorrect));
        assert!(!player.can_advance());

        // Flash clears after its window.
        player
            .clock_mut()
            .advance(Duration::milliseconds(QUIZ_FLASH_MS));
        assert!(player.poll_feedback());

        player.select_option(OptionId::new("a")).unwrap();
        let checked = player.activate().await.unwrap();
        assert_eq!(checked, Activation::QuizChecked(QuizVerdict::Correct));
        assert!(player.can_advance());
        assert_eq!(player.control_label(), ControlLabel::Continue);
    }

    #[tokio::test]
    async fn section_completion_is_atomic_from_the_callers_view() {
        let backend = InMemoryBackend::new();
        let mut player = open_player(&backend).await;
        player.activate().await.unwrap();
        player.select_option(OptionId::new("a")).unwrap();
        player.activate().await.unwrap();

        let activation = player.activate().await.unwrap();
        assert_eq!(
            activation,
            Activation::SectionCompleted {
                next_index: 1,
                streak: None,
            }
        );

        // Everything moved together: flags, unlock, cursor.
        assert!(player.course().section(0).unwrap().is_completed());
        assert!(player.course().section(1).unwrap().is_unlocked());
        assert_eq!(player.cursor(), Cursor { section: 1, block: 0 });
        assert_eq!(backend.completion_count(), 1);
        assert_eq!(player.progress(), BlockProgress { completed: 2, total: 4 });
    }

    #[tokio::test]
    async fn failed_completion_leaves_state_for_retry() {
        let backend = InMemoryBackend::new();
        let mut player = open_player(&backend).await;
        player.activate().await.unwrap();
        player.select_option(OptionId::new("a")).unwrap();
        player.activate().await.unwrap();

        backend.fail_next_completion();
        let err = player.activate().await.unwrap_err();
        assert!(matches!(err, PlayerError::Remote(_)));

        // Nothing moved; the same action retries and succeeds.
        assert!(!player.course().section(0).unwrap().is_completed());
        assert_eq!(player.cursor(), Cursor { section: 0, block: 1 });
        assert_eq!(backend.completion_count(), 0);

        let activation = player.activate().await.unwrap();
        assert!(matches!(activation, Activation::SectionCompleted { .. }));
        assert_eq!(backend.completion_count(), 1);
    }

    #[tokio::test]
    async fn drag_drop_failure_reverts_after_shake_then_passes() {
        let backend = InMemoryBackend::new();
        let mut player = open_player(&backend).await;
        // Finish section 0.
        player.activate().await.unwrap();
        player.select_option(OptionId::new("a")).unwrap();
        player.activate().await.unwrap();
        player.activate().await.unwrap();
        // Reveal the drag-drop block.
        player.activate().await.unwrap();
        assert_eq!(player.control_label(), ControlLabel::CheckAnswers);

        let rental = drag_item_id(&player, "Rental property");
        let loan = drag_item_id(&player, "Car loan");

        // Swap them: both wrong.
        player.place_item(rental, Some("Liability")).unwrap();
        player.place_item(loan, Some("Asset")).unwrap();
        let Activation::ExerciseChecked(report) = player.activate().await.unwrap() else {
            panic!("expected a check");
        };
        assert!(!report.completed);
        assert_eq!(report.incorrect.len(), 2);

        player.clock_mut().advance(Duration::milliseconds(SHAKE_MS));
        assert!(player.poll_feedback());
        let BlockAssessment::DragDrop(state) = player.assessment() else {
            panic!("expected drag-drop slot");
        };
        assert!(!state.all_placed());

        // Correct placement completes the block and the course.
        player.place_item(rental, Some("Asset")).unwrap();
        player.place_item(loan, Some("Liability")).unwrap();
        let Activation::ExerciseChecked(report) = player.activate().await.unwrap() else {
            panic!("expected a check");
        };
        assert!(report.completed);
        assert_eq!(player.control_label(), ControlLabel::Finish);

        let activation = player.activate().await.unwrap();
        assert_eq!(activation, Activation::CourseCompleted { streak: None });
        assert!(player.course().section(1).unwrap().is_completed());
        assert_eq!(backend.completion_count(), 2);

        // Further presses on the finished course send nothing.
        assert_eq!(player.activate().await.unwrap(), Activation::Ignored);
        assert_eq!(backend.completion_count(), 2);
    }

    #[tokio::test]
    async fn streak_signal_is_passed_through() {
        let backend = InMemoryBackend::new();
        backend.set_streak(Some(StreakSignal {
            increased: true,
            current: 7,
        }));
        let mut player = open_player(&backend).await;
        player.activate().await.unwrap();
        player.select_option(OptionId::new("a")).unwrap();
        player.activate().await.unwrap();

        let Activation::SectionCompleted { streak, .. } = player.activate().await.unwrap() else {
            panic!("expected section completion");
        };
        assert_eq!(
            streak,
            Some(StreakSignal {
                increased: true,
                current: 7,
            })
        );
    }

    #[tokio::test]
    async fn revisiting_completed_sections_sends_no_completion_requests() {
        let backend = InMemoryBackend::new();
        let mut path = course(&backend);
        for index in 0..2 {
            path.apply(SectionEvent::Unlock { index }).unwrap();
            path.apply(SectionEvent::Complete { index }).unwrap();
        }

        let mut player = LessonPlayer::open(
            path,
            Arc::new(backend.clone()),
            Arc::new(backend.clone()),
            fixed_clock(),
        )
        .await
        .unwrap();
        assert_eq!(player.cursor(), Cursor { section: 0, block: 0 });

        // Re-walk section 0; the quiz mounts fresh and gates again.
        player.activate().await.unwrap();
        player.select_option(OptionId::new("a")).unwrap();
        player.activate().await.unwrap();

        // Crossing the section boundary is local; nothing goes to the API.
        assert_eq!(player.activate().await.unwrap(), Activation::Advanced);
        assert_eq!(player.cursor(), Cursor { section: 1, block: 0 });
        assert_eq!(backend.completion_count(), 0);
    }

    #[tokio::test]
    async fn selecting_on_a_plain_block_is_a_defect() {
        let backend = InMemoryBackend::new();
        let mut player = open_player(&backend).await;
        let err = player.select_option(OptionId::new("a")).unwrap_err();
        assert!(matches!(err, PlayerError::NoQuizHere));
    }

    #[tokio::test]
    async fn quiz_fetch_failure_is_retryable() {
        // Quiz id never seeded: the fetch 404s when the block mounts.
        let backend = InMemoryBackend::new();
        let quiz_id = QuizId::random();
        let sections = vec![Section::new(
            SectionId::random(),
            "Only",
            0,
            vec![
                text_block("Intro", 0),
                ContentBlock::new(
                    BlockId::random(),
                    "Quiz",
                    1,
                    vec![ContentItem::Quiz { quiz_id }],
                ),
            ],
        )];
        let mut path = CoursePath::new(CourseId::random(), sections);
        path.apply(SectionEvent::Unlock { index: 0 }).unwrap();

        let mut player = LessonPlayer::open(
            path,
            Arc::new(backend.clone()),
            Arc::new(backend.clone()),
            fixed_clock(),
        )
        .await
        .unwrap();

        let err = player.activate().await.unwrap_err();
        assert!(matches!(err, PlayerError::Remote(_)));
        // The quiz block was revealed but its slot stayed unloaded.
        assert_eq!(player.cursor(), Cursor { section: 0, block: 1 });
        assert_eq!(player.control_label(), ControlLabel::SelectAnswer);

        // Seeding the quiz lets the next activation refetch and proceed.
        backend.insert_quiz(quiz_id, quiz_content());
        player.activate().await.unwrap();
        player.select_option(OptionId::new("a")).unwrap();
        assert_eq!(
            player.activate().await.unwrap(),
            Activation::QuizChecked(QuizVerdict::Correct)
        );
    }
}
