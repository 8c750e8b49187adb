use chrono::{DateTime, Duration, Utc};
use std::fmt;
use thiserror::Error;

use crate::model::DragItemId;

/// How long incorrectly placed items shake before reverting to unassigned.
pub const SHAKE_MS: i64 = 1_500;

//
// ─── PARSE ERRORS ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LineIssueKind {
    #[error("missing `→` separator")]
    MissingArrow,

    #[error("empty item text")]
    EmptyText,

    #[error("empty category")]
    EmptyCategory,

    #[error("category `{0}` is not declared")]
    UnknownCategory(String),
}

/// One malformed item line, identified by its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIssue {
    pub line: usize,
    pub text: String,
    pub kind: LineIssueKind,
}

impl fmt::Display for LineIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: `{}`: {}", self.line, self.text, self.kind)
    }
}

/// Failure to parse the authored drag-drop encoding. The exercise must not
/// partially render; the host shows an error card instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DragDropParseError {
    #[error("no categories declared")]
    NoCategories,

    #[error("no items declared")]
    NoItems,

    #[error("{} malformed item line(s)", .0.len())]
    MalformedItems(Vec<LineIssue>),
}

//
// ─── PLACEMENT ERRORS ──────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PlaceError {
    /// The item id does not belong to this exercise. A caller defect.
    #[error("unknown drag item {0}")]
    UnknownItem(DragItemId),

    /// The category is not one of the declared categories. A caller defect.
    #[error("category `{category}` is not declared for this exercise")]
    UnknownCategory { category: String },

    #[error("exercise already completed")]
    AlreadyCompleted,
}

//
// ─── CATEGORIES & ITEMS ────────────────────────────────────────────────────────
//

/// A declared category. `label` is the authored text; `name` is the label
/// with one trailing parenthetical stripped, used for matching item lines
/// (e.g. "Asset (things you own)" matches items targeting "Asset").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    label: String,
    name: String,
}

impl Category {
    fn from_label(label: &str) -> Self {
        let label = label.trim().to_string();
        let name = strip_trailing_parenthetical(&label);
        Self { label, name }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

fn strip_trailing_parenthetical(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.ends_with(')') {
        if let Some(open) = trimmed.rfind('(') {
            let head = trimmed[..open].trim_end();
            if !head.is_empty() {
                return head.to_string();
            }
        }
    }
    trimmed.to_string()
}

/// One draggable item. `current_category` and `is_correct` stay `None`
/// until the learner places and checks it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragItem {
    id: DragItemId,
    text: String,
    correct_category: String,
    current_category: Option<String>,
    is_correct: Option<bool>,
}

impl DragItem {
    #[must_use]
    pub fn id(&self) -> DragItemId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Canonical name of the category this item belongs in.
    #[must_use]
    pub fn correct_category(&self) -> &str {
        &self.correct_category
    }

    #[must_use]
    pub fn current_category(&self) -> Option<&str> {
        self.current_category.as_deref()
    }

    /// Verdict from the most recent check, if this item was placed then.
    #[must_use]
    pub fn is_correct(&self) -> Option<bool> {
        self.is_correct
    }
}

//
// ─── CHECK REPORT ──────────────────────────────────────────────────────────────
//

/// Outcome of one atomic check over the whole exercise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    /// True iff every item is placed and correct.
    pub completed: bool,
    /// Items that were placed in the wrong category; they shake and then
    /// revert to unassigned.
    pub incorrect: Vec<DragItemId>,
}

//
// ─── DRAG-DROP STATE ───────────────────────────────────────────────────────────
//

/// Placement and validation state for one mounted drag-drop exercise.
///
/// Invariant: every item is either unassigned or assigned to exactly one
/// declared category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragDropState {
    title: String,
    instructions: String,
    categories: Vec<Category>,
    items: Vec<DragItem>,
    completed: bool,
    revert_at: Option<DateTime<Utc>>,
}

impl DragDropState {
    /// Parses the authored encoding: newline-delimited category names and
    /// newline-delimited `"text → category"` item lines (`"->"` accepted).
    ///
    /// # Errors
    ///
    /// Returns `DragDropParseError::MalformedItems` listing **every**
    /// offending line (missing arrow, empty side, undeclared category), or
    /// `NoCategories`/`NoItems` for empty blobs. Nothing partially renders
    /// on failure.
    pub fn parse(
        title: impl Into<String>,
        instructions: impl Into<String>,
        categories: &str,
        items: &str,
    ) -> Result<Self, DragDropParseError> {
        let categories: Vec<Category> = categories
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(Category::from_label)
            .collect();
        if categories.is_empty() {
            return Err(DragDropParseError::NoCategories);
        }

        let mut parsed = Vec::new();
        let mut issues = Vec::new();
        for (index, raw) in items.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let issue = |kind| LineIssue {
                line: index + 1,
                text: line.to_string(),
                kind,
            };

            let Some((text, category)) = split_item_line(line) else {
                issues.push(issue(LineIssueKind::MissingArrow));
                continue;
            };
            if text.is_empty() {
                issues.push(issue(LineIssueKind::EmptyText));
                continue;
            }
            let category = strip_trailing_parenthetical(category);
            if category.is_empty() {
                issues.push(issue(LineIssueKind::EmptyCategory));
                continue;
            }
            if !categories.iter().any(|c| c.name() == category) {
                issues.push(issue(LineIssueKind::UnknownCategory(category)));
                continue;
            }

            parsed.push(DragItem {
                id: DragItemId::new(parsed.len() as u64),
                text: text.to_string(),
                correct_category: category,
                current_category: None,
                is_correct: None,
            });
        }

        if !issues.is_empty() {
            return Err(DragDropParseError::MalformedItems(issues));
        }
        if parsed.is_empty() {
            return Err(DragDropParseError::NoItems);
        }

        Ok(Self {
            title: title.into(),
            instructions: instructions.into(),
            categories,
            items: parsed,
            completed: false,
            revert_at: None,
        })
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    #[must_use]
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    #[must_use]
    pub fn items(&self) -> &[DragItem] {
        &self.items
    }

    #[must_use]
    pub fn item(&self, id: DragItemId) -> Option<&DragItem> {
        self.items.iter().find(|item| item.id == id)
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Deadline after which incorrectly placed items revert, while a failed
    /// check is shaking.
    #[must_use]
    pub fn revert_at(&self) -> Option<DateTime<Utc>> {
        self.revert_at
    }

    /// True iff every item currently has a category.
    #[must_use]
    pub fn all_placed(&self) -> bool {
        self.items.iter().all(|item| item.current_category.is_some())
    }

    /// Assigns `item` to a declared category, or back to unassigned with
    /// `None`. Reassignment before a check is always allowed; correctness
    /// is not evaluated here.
    ///
    /// # Errors
    ///
    /// `UnknownCategory` and `UnknownItem` are caller defects and fail
    /// loudly in development. `AlreadyCompleted` rejects movement after the
    /// exercise has been passed.
    pub fn place(&mut self, id: DragItemId, category: Option<&str>) -> Result<(), PlaceError> {
        if self.completed {
            return Err(PlaceError::AlreadyCompleted);
        }
        if let Some(name) = category {
            if !self.categories.iter().any(|c| c.name() == name) {
                debug_assert!(false, "placing into undeclared category `{name}`");
                return Err(PlaceError::UnknownCategory {
                    category: name.to_string(),
                });
            }
        }
        let item = self
            .items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or(PlaceError::UnknownItem(id))?;
        item.current_category = category.map(str::to_string);
        item.is_correct = None;
        Ok(())
    }

    /// Validates all current placements as one atomic operation.
    ///
    /// Placed items get a per-item verdict; unplaced items keep `None`.
    /// Overall completion requires every item placed and correct. On any
    /// wrong placement the wrong items shake until `now +` [`SHAKE_MS`];
    /// [`DragDropState::settle`] then reverts them while correct placements
    /// stay where they are.
    pub fn check(&mut self, now: DateTime<Utc>) -> CheckReport {
        let mut incorrect = Vec::new();
        for item in &mut self.items {
            match item.current_category.as_deref() {
                Some(current) => {
                    let ok = current == item.correct_category;
                    item.is_correct = Some(ok);
                    if !ok {
                        incorrect.push(item.id);
                    }
                }
                None => item.is_correct = None,
            }
        }

        let completed = incorrect.is_empty() && self.all_placed();
        if completed {
            self.completed = true;
            self.revert_at = None;
        } else if !incorrect.is_empty() {
            self.revert_at = Some(now + Duration::milliseconds(SHAKE_MS));
        }

        CheckReport {
            completed,
            incorrect,
        }
    }

    /// Applies the delayed reset of a failed check once the shake window
    /// has passed: wrong items return to unassigned, correct placements are
    /// kept. Returns true if a revert ran.
    pub fn settle(&mut self, now: DateTime<Utc>) -> bool {
        match self.revert_at {
            Some(deadline) if now >= deadline => {
                for item in &mut self.items {
                    if item.is_correct == Some(false) {
                        item.current_category = None;
                        item.is_correct = None;
                    }
                }
                self.revert_at = None;
                true
            }
            _ => false,
        }
    }

    /// Explicit full reset: everything back to unassigned.
    pub fn reset(&mut self) {
        for item in &mut self.items {
            item.current_category = None;
            item.is_correct = None;
        }
        self.completed = false;
        self.revert_at = None;
    }
}

fn split_item_line(line: &str) -> Option<(&str, &str)> {
    let (text, category) = line
        .split_once('→')
        .or_else(|| line.split_once("->"))?;
    Some((text.trim(), category.trim()))
}
