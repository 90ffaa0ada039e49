use doccore::{Document, MarkType};
use serde::Serialize;

use crate::emphasis::EmphasisState;
use crate::geometry::PopoverPlacement;
use crate::history::HistoryState;
use crate::registry::MarkEntry;
use crate::status_manager::MessageType;

/// A bookmark or comment under the current selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveAnnotation {
    pub mark_type: MarkType,
    pub id: String,
}

/// Notifications pushed from a session to its host.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Update(Document),
    EmphasisStateChange(EmphasisState),
    HistoryStateChange(HistoryState),
    BookmarksChanged(Vec<MarkEntry>),
    CommentsChanged(Vec<MarkEntry>),
    SelectedContentChange(String),
    CurrentSection(Option<String>),
    BookmarkCreated { id: String, text: String },
    CommentCreated { id: String, text: String },
    ActiveAnnotations(Vec<ActiveAnnotation>),
    /// `None` closes the popover.
    Popover(Option<PopoverPlacement>),
    ScrollTo { top: f64 },
    Focus,
    Notice { level: MessageType, message: String },
}
