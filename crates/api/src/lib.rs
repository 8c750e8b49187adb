#![forbid(unsafe_code)]

pub mod client;
pub mod http;
pub mod memory;
pub mod snapshot;

pub use client::{
    ApiError, CompletionAck, CompletionApi, QuizSource, SectionCompletionRequest, StreakSignal,
};
pub use http::HttpBackend;
pub use memory::InMemoryBackend;
pub use snapshot::{CourseSnapshot, SnapshotError};
