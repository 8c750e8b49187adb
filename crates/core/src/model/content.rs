use serde::{Deserialize, Serialize};

use crate::model::ids::{BlockId, QuizId};

//
// ─── CONTENT ITEMS ─────────────────────────────────────────────────────────────
//

/// One typed piece of material inside a block.
///
/// Closed sum type: the sequencer matches exhaustively, so a new kind cannot
/// silently slip past the gating logic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    Text {
        body: String,
    },
    Image {
        url: String,
        #[serde(default)]
        caption: Option<String>,
    },
    Math {
        tex: String,
    },
    /// Raw JSON payload, parsed defensively by the chart renderer.
    Chart {
        payload: String,
    },
    /// Raw JSON payload, parsed defensively by the table renderer.
    Table {
        payload: String,
    },
    Animation {
        url: String,
    },
    /// Reference to a remote question resource.
    Quiz {
        quiz_id: QuizId,
    },
    /// Authored encoding of a categorization exercise. `categories` and
    /// `items` are the newline-delimited blobs; they are parsed when the
    /// block mounts, not here.
    DragDrop {
        title: String,
        instructions: String,
        categories: String,
        items: String,
    },
}

impl ContentItem {
    /// Whether this item gates forward progress.
    #[must_use]
    pub fn is_assessment(&self) -> bool {
        matches!(self, Self::Quiz { .. } | Self::DragDrop { .. })
    }
}

//
// ─── CONTENT BLOCK ─────────────────────────────────────────────────────────────
//

/// An ordered, titled group of content items; the unit of reveal.
///
/// Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentBlock {
    id: BlockId,
    title: String,
    order: u32,
    items: Vec<ContentItem>,
}

impl ContentBlock {
    #[must_use]
    pub fn new(id: BlockId, title: impl Into<String>, order: u32, items: Vec<ContentItem>) -> Self {
        Self {
            id,
            title: title.into(),
            order,
            items,
        }
    }

    #[must_use]
    pub fn id(&self) -> BlockId {
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

    #[must_use]
    pub fn items(&self) -> &[ContentItem] {
        &self.items
    }

    /// The item that gates this block, if any.
    ///
    /// Authored content carries at most one assessment per block; if several
    /// appear, the first one gates and the rest render ungated.
    #[must_use]
    pub fn assessment(&self) -> Option<&ContentItem> {
        self.items.iter().find(|item| item.is_assessment())
    }
}
