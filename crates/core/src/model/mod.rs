mod content;
mod ids;
mod section;

pub use content::{ContentBlock, ContentItem};
pub use ids::{BlockId, CourseId, DragItemId, OptionId, ParseIdError, QuizId, SectionId};
pub use section::{CoursePath, Section, SectionEvent, SectionStateError};
