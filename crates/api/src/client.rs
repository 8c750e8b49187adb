//! Trait contracts for the course platform's remote boundary.
//!
//! The engine only ever talks to the backend through these seams, so tests
//! swap in [`crate::InMemoryBackend`] and the binary wires up
//! [`crate::HttpBackend`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use lesson_core::model::{CourseId, QuizId, SectionId};
use lesson_core::quiz::{QuizContent, QuizContentError};

/// Errors surfaced by backend adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("resource not found")]
    NotFound,

    #[error("request failed with status {0}")]
    Status(u16),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error(transparent)]
    InvalidQuiz(#[from] QuizContentError),
}

/// Payload of the "complete section and unlock next" call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionCompletionRequest {
    pub section_id: SectionId,
    pub course_id: CourseId,
    pub current_order: u32,
}

/// Incidental streak signal returned with a completion acknowledgment.
/// Celebratory only; never consulted for gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakSignal {
    pub increased: bool,
    pub current: u32,
}

/// Backend acknowledgment of a section completion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionAck {
    #[serde(default)]
    pub streak: Option<StreakSignal>,
}

/// Persistence boundary: mark a section complete and unlock the next one.
#[async_trait]
pub trait CompletionApi: Send + Sync {
    /// # Errors
    ///
    /// Returns `ApiError` on transport or backend failure. The caller treats
    /// every failure as recoverable and retryable by learner action.
    async fn complete_section(
        &self,
        request: SectionCompletionRequest,
    ) -> Result<CompletionAck, ApiError>;
}

/// On-demand retrieval of a quiz block's question resource.
#[async_trait]
pub trait QuizSource: Send + Sync {
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for an unknown quiz id, or transport
    /// and decode failures.
    async fn fetch_quiz(&self, quiz: QuizId) -> Result<QuizContent, ApiError>;
}
