use crate::model::CoursePath;

/// Transient (section index, block index) pointer tracking the learner's
/// position. Owned and mutated by the block sequencer; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub section: usize,
    pub block: usize,
}

impl Cursor {
    #[must_use]
    pub fn start_of(section: usize) -> Self {
        Self { section, block: 0 }
    }
}

/// Aggregated block counts for a progress indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockProgress {
    pub completed: usize,
    pub total: usize,
}

/// Derives `(completed, total)` block counts from the cursor position.
///
/// Blocks in sections before the cursor count as completed; blocks in the
/// current section count up to (not including) the cursor's block; later
/// sections contribute nothing. Pure function, recomputed on every change.
#[must_use]
pub fn block_progress(path: &CoursePath, cursor: Cursor) -> BlockProgress {
    let mut completed = 0;
    let mut total = 0;
    for (index, section) in path.sections().iter().enumerate() {
        let blocks = section.block_count();
        total += blocks;
        if index < cursor.section {
            completed += blocks;
        } else if index == cursor.section {
            completed += cursor.block.min(blocks);
        }
    }
    BlockProgress { completed, total }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockId, ContentBlock, CourseId, CoursePath, Section, SectionId};

    fn path_with_blocks(counts: &[usize]) -> CoursePath {
        let sections = counts
            .iter()
            .enumerate()
            .map(|(i, count)| {
                let blocks = (0..*count)
                    .map(|b| {
                        ContentBlock::new(
                            BlockId::random(),
                            format!("Block {b}"),
                            u32::try_from(b).unwrap(),
                            Vec::new(),
                        )
                    })
                    .collect();
                Section::new(
                    SectionId::random(),
                    format!("Section {i}"),
                    u32::try_from(i).unwrap(),
                    blocks,
                )
            })
            .collect();
        CoursePath::new(CourseId::random(), sections)
    }

    #[test]
    fn counts_prior_sections_and_current_prefix() {
        let path = path_with_blocks(&[3, 3, 4]);
        let progress = block_progress(&path, Cursor { section: 2, block: 1 });
        assert_eq!(progress.completed, 7);
        assert_eq!(progress.total, 10);
    }

    #[test]
    fn start_of_course_is_zero() {
        let path = path_with_blocks(&[2, 2]);
        let progress = block_progress(&path, Cursor::start_of(0));
        assert_eq!(progress.completed, 0);
        assert_eq!(progress.total, 4);
    }

    #[test]
    fn later_sections_never_count() {
        let path = path_with_blocks(&[2, 5]);
        let progress = block_progress(&path, Cursor { section: 0, block: 1 });
        assert_eq!(progress.completed, 1);
    }

    #[test]
    fn cursor_block_is_clamped_to_section_size() {
        let path = path_with_blocks(&[2]);
        let progress = block_progress(&path, Cursor { section: 0, block: 9 });
        assert_eq!(progress.completed, 2);
    }
}
