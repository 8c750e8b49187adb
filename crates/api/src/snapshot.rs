//! Decoding of the course snapshot the host loads at startup.
//!
//! The snapshot carries server-known `unlocked`/`completed` flags. Mapping
//! routes them through the course path reducer so that load-time unlocks and
//! completion-time unlocks end up in the same representation.

use serde::Deserialize;
use thiserror::Error;

use lesson_core::model::{
    BlockId, ContentBlock, ContentItem, CourseId, CoursePath, Section, SectionEvent, SectionId,
    SectionStateError,
};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SnapshotError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("snapshot marks section {index} completed but not unlocked")]
    CompletedWhileLocked { index: usize },

    #[error(transparent)]
    SectionState(#[from] SectionStateError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockRecord {
    pub id: BlockId,
    pub title: String,
    pub order: u32,
    pub items: Vec<ContentItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SectionRecord {
    pub id: SectionId,
    pub title: String,
    pub order: u32,
    #[serde(default)]
    pub unlocked: bool,
    #[serde(default)]
    pub completed: bool,
    pub blocks: Vec<BlockRecord>,
}

/// Wire shape of one course's sections and block lists.
#[derive(Debug, Clone, Deserialize)]
pub struct CourseSnapshot {
    pub course_id: CourseId,
    pub sections: Vec<SectionRecord>,
}

impl CourseSnapshot {
    /// # Errors
    ///
    /// Returns `SnapshotError::Json` for malformed JSON.
    pub fn from_json(raw: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Converts the snapshot into a domain course path.
    ///
    /// Sections and blocks are sorted by their `order` field; flags are
    /// applied through the reducer.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError::CompletedWhileLocked` when the backend
    /// reports an impossible flag combination.
    pub fn into_course_path(mut self) -> Result<CoursePath, SnapshotError> {
        self.sections.sort_by_key(|s| s.order);

        let mut flags = Vec::with_capacity(self.sections.len());
        let mut sections = Vec::with_capacity(self.sections.len());
        for record in self.sections {
            flags.push((record.unlocked, record.completed));

            let mut blocks = record.blocks;
            blocks.sort_by_key(|b| b.order);
            let blocks = blocks
                .into_iter()
                .map(|b| ContentBlock::new(b.id, b.title, b.order, b.items))
                .collect();
            sections.push(Section::new(record.id, record.title, record.order, blocks));
        }

        let mut path = CoursePath::new(self.course_id, sections);
        for (index, (unlocked, completed)) in flags.into_iter().enumerate() {
            if completed && !unlocked {
                return Err(SnapshotError::CompletedWhileLocked { index });
            }
            if unlocked {
                path.apply(SectionEvent::Unlock { index })?;
            }
            if completed {
                path.apply(SectionEvent::Complete { index })?;
            }
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> String {
        let section_a = SectionId::random();
        let section_b = SectionId::random();
        format!(
            r#"{{
                "course_id": "{course}",
                "sections": [
                    {{
                        "id": "{b}", "title": "Two", "order": 1,
                        "blocks": [
                            {{ "id": "{blk2}", "title": "B1", "order": 0,
                               "items": [ {{ "type": "text", "body": "later" }} ] }}
                        ]
                    }},
                    {{
                        "id": "{a}", "title": "One", "order": 0,
                        "unlocked": true, "completed": true,
                        "blocks": [
                            {{ "id": "{blk1}", "title": "A1", "order": 0,
                               "items": [ {{ "type": "text", "body": "hello" }} ] }}
                        ]
                    }}
                ]
            }}"#,
            course = CourseId::random(),
            a = section_a,
            b = section_b,
            blk1 = BlockId::random(),
            blk2 = BlockId::random(),
        )
    }

    #[test]
    fn decodes_and_sorts_by_order() {
        let path = CourseSnapshot::from_json(&sample())
            .unwrap()
            .into_course_path()
            .unwrap();

        assert_eq!(path.len(), 2);
        assert_eq!(path.section(0).unwrap().title(), "One");
        assert!(path.section(0).unwrap().is_completed());
        assert!(path.section(0).unwrap().is_unlocked());
        assert!(!path.section(1).unwrap().is_unlocked());
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        let err = CourseSnapshot::from_json("{ not json").unwrap_err();
        assert!(matches!(err, SnapshotError::Json(_)));
    }

    #[test]
    fn completed_but_locked_snapshot_is_rejected() {
        let raw = format!(
            r#"{{ "course_id": "{course}", "sections": [
                {{ "id": "{s}", "title": "One", "order": 0, "completed": true, "blocks": [] }}
            ]}}"#,
            course = CourseId::random(),
            s = SectionId::random(),
        );
        let err = CourseSnapshot::from_json(&raw)
            .unwrap()
            .into_course_path()
            .unwrap_err();
        assert!(matches!(err, SnapshotError::CompletedWhileLocked { index: 0 }));
    }
}
