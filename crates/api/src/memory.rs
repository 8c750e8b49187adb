use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use lesson_core::model::QuizId;
use lesson_core::quiz::QuizContent;

use crate::client::{
    ApiError, CompletionAck, CompletionApi, QuizSource, SectionCompletionRequest, StreakSignal,
};

/// In-memory backend double for engine tests and the offline demo.
///
/// Records every completion request it receives and can be told to fail the
/// next completion call to exercise the retry path.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    quizzes: Arc<Mutex<HashMap<QuizId, QuizContent>>>,
    completions: Arc<Mutex<Vec<SectionCompletionRequest>>>,
    fail_next: Arc<Mutex<bool>>,
    streak: Arc<Mutex<Option<StreakSignal>>>,
}

impl InMemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_quiz(&self, id: QuizId, content: QuizContent) {
        if let Ok(mut guard) = self.quizzes.lock() {
            guard.insert(id, content);
        }
    }

    /// Makes the next `complete_section` call fail with a 500.
    pub fn fail_next_completion(&self) {
        if let Ok(mut guard) = self.fail_next.lock() {
            *guard = true;
        }
    }

    /// Streak to attach to subsequent completion acknowledgments.
    pub fn set_streak(&self, streak: Option<StreakSignal>) {
        if let Ok(mut guard) = self.streak.lock() {
            *guard = streak;
        }
    }

    /// Every completion request received so far, in order.
    #[must_use]
    pub fn completions(&self) -> Vec<SectionCompletionRequest> {
        self.completions
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn completion_count(&self) -> usize {
        self.completions.lock().map(|guard| guard.len()).unwrap_or(0)
    }
}

#[async_trait]
impl CompletionApi for InMemoryBackend {
    async fn complete_section(
        &self,
        request: SectionCompletionRequest,
    ) -> Result<CompletionAck, ApiError> {
        let should_fail = {
            let mut guard = self
                .fail_next
                .lock()
                .map_err(|e| ApiError::Connection(e.to_string()))?;
            std::mem::take(&mut *guard)
        };
        if should_fail {
            return Err(ApiError::Status(500));
        }

        self.completions
            .lock()
            .map_err(|e| ApiError::Connection(e.to_string()))?
            .push(request);

        let streak = *self
            .streak
            .lock()
            .map_err(|e| ApiError::Connection(e.to_string()))?;
        Ok(CompletionAck { streak })
    }
}

#[async_trait]
impl QuizSource for InMemoryBackend {
    async fn fetch_quiz(&self, quiz: QuizId) -> Result<QuizContent, ApiError> {
        let guard = self
            .quizzes
            .lock()
            .map_err(|e| ApiError::Connection(e.to_string()))?;
        guard.get(&quiz).cloned().ok_or(ApiError::NotFound)
    }
}
