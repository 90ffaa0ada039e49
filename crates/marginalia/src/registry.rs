//! Bookmark and comment bookkeeping. Annotations are found by walking the
//! tree, so ids stay the only stable handle across structural edits.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use doccore::{Document, Mark, MarkType, Node};
use serde::Serialize;

use crate::config::AnnotationConfig;
use crate::editor::Selection;
use crate::events::SessionEvent;
use crate::history::HistoryCategory;
use crate::session::EditorSession;

/// One annotated run: split annotations yield one entry per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkEntry {
    pub id: String,
    pub content: String,
}

pub fn list_marks(doc: &Document, mark_type: MarkType) -> Vec<MarkEntry> {
    let mut entries = Vec::new();
    doc.descendants(|node, _, _| {
        if let Node::Text { text, marks } = node {
            for mark in marks.iter().filter(|mark| mark.mark_type() == mark_type) {
                if let Some(id) = mark.annotation_id() {
                    entries.push(MarkEntry {
                        id: id.to_string(),
                        content: text.clone(),
                    });
                }
            }
        }
        true
    });
    entries
}

/// Logical extent of an annotation: from the first start to the last end
/// of every run carrying `id`.
pub fn mark_extent(doc: &Document, mark_type: MarkType, id: &str) -> Option<(usize, usize)> {
    let mut extent: Option<(usize, usize)> = None;
    doc.descendants(|node, pos, _| {
        if let Node::Text { marks, .. } = node {
            let carries = marks
                .iter()
                .any(|mark| mark.mark_type() == mark_type && mark.annotation_id() == Some(id));
            if carries {
                let end = pos + node.node_size();
                extent = Some(match extent {
                    Some((start, stop)) => (start.min(pos), stop.max(end)),
                    None => (pos, end),
                });
            }
        }
        true
    });
    extent
}

/// Color an annotation mark gets while its highlighting is on or off.
pub fn annotation_color(config: &AnnotationConfig, mark_type: MarkType) -> &str {
    match mark_type {
        MarkType::Bookmark if config.bookmarks_highlighted => &config.bookmark_color,
        MarkType::Comment if config.comments_highlighted => &config.comment_color,
        _ => &config.neutral_color,
    }
}

/// Rewrites the color of every bookmark and comment mark in the document.
pub fn recolor(doc: &mut Document, config: &AnnotationConfig) {
    let size = doc.content_size();
    doc.map_runs(0, size, |run| {
        for mark in run.marks.iter_mut() {
            let color = annotation_color(config, mark.mark_type()).to_string();
            if let Some(attrs) = mark.annotation_attrs_mut() {
                attrs.color = color;
            }
        }
    });
}

/// A deferred selection change; a newer request replaces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingScroll {
    pub from: usize,
    pub to: usize,
    pub due: Instant,
}

impl EditorSession {
    pub fn list_marks(&self, mark_type: MarkType) -> Vec<MarkEntry> {
        self.document()
            .map(|doc| list_marks(doc, mark_type))
            .unwrap_or_default()
    }

    /// Strips the given annotations everywhere in one transaction.
    pub fn delete_marks(&mut self, ids: &[String], mark_type: MarkType) -> bool {
        if ids.is_empty() {
            return false;
        }
        let ids: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let label = format!("Delete {}s", mark_type.name());
        self.commit(HistoryCategory::CustomStyle, &label, |doc, _| {
            let size = doc.content_size();
            doc.remove_marks_where(0, size, |mark: &Mark| {
                mark.mark_type() == mark_type && mark.annotation_id().is_some_and(|id| ids.contains(id))
            });
        })
    }

    /// Scrolls the annotation into view, then selects its extent once the
    /// settle delay has passed (see [`EditorSession::tick`]).
    pub fn scroll_to_mark(&mut self, id: &str, mark_type: MarkType) -> bool {
        let Some(doc) = self.document() else {
            log::warn!("Ignoring scroll to {}: no active editor engine", mark_type.name());
            return false;
        };
        let Some((from, to)) = mark_extent(doc, mark_type, id) else {
            log::debug!("No {} with id {} to scroll to", mark_type.name(), id);
            return false;
        };

        match self.scroll_offset(from) {
            Some(top) => self.emit(SessionEvent::ScrollTo { top }),
            None => log::debug!("No view geometry; skipping scroll to {}", id),
        }

        let settle = Duration::from_millis(self.config.editor.scroll_settle_ms);
        if self.pending_scroll.is_some() {
            log::debug!("Replacing pending scroll with {} {}", mark_type.name(), id);
        }
        self.pending_scroll = Some(PendingScroll {
            from,
            to,
            due: Instant::now() + settle,
        });
        true
    }

    fn scroll_offset(&self, pos: usize) -> Option<f64> {
        let geometry = self.geometry.as_ref()?;
        let coords = geometry.coords_at_pos(pos)?;
        let container = geometry.scroll_container()?;
        let top = coords.top - container.rect.top + container.scroll_top - self.config.editor.scroll_margin;
        Some(top.max(0.0))
    }

    pub fn has_pending_scroll(&self) -> bool {
        self.pending_scroll.is_some()
    }

    pub fn tick(&mut self) -> bool {
        self.tick_at(Instant::now())
    }

    /// Applies the pending scroll selection if it is due at `now`.
    pub fn tick_at(&mut self, now: Instant) -> bool {
        let Some(pending) = self.pending_scroll else {
            return false;
        };
        if now < pending.due {
            return false;
        }
        self.pending_scroll = None;
        let Some(engine) = self.engine_for("scroll selection") else {
            return false;
        };
        engine.set_selection(Selection::new(pending.from, pending.to));
        self.on_selection_change();
        self.emit(SessionEvent::Focus);
        true
    }

    /// Waits for the pending scroll, if any, and applies it.
    pub async fn settle(&mut self) -> bool {
        let Some(pending) = self.pending_scroll else {
            return false;
        };
        tokio::time::sleep_until(tokio::time::Instant::from_std(pending.due)).await;
        self.tick_at(pending.due)
    }

    /// Recolors annotations after a highlighting change. Folded into the
    /// current undo step and kept out of the action log.
    pub fn recolor_annotations(&mut self) -> bool {
        let annotations = self.config.annotations.clone();
        let Some(engine) = self.engine_for("recolor annotations") else {
            return false;
        };
        let changed = engine.apply_silently(|doc, _| recolor(doc, &annotations));
        if changed {
            if let Some(doc) = self.document() {
                self.emit(SessionEvent::Update(doc.clone()));
            }
            self.publish_mark_lists();
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::editor::Editor;
    use crate::geometry::GridGeometry;

    // "one " [c1] + "two" [bold] + " three" [c1] + next paragraph "four" [c1, b1]
    fn annotated() -> Document {
        Document::new(vec![
            Node::paragraph(vec![
                Node::styled_text("one ", vec![Mark::comment("c1", "#bfdbfe")]),
                Node::styled_text("two", vec![Mark::Bold]),
                Node::styled_text(" three", vec![Mark::comment("c1", "#bfdbfe")]),
            ]),
            Node::paragraph(vec![Node::styled_text(
                "four",
                vec![Mark::bookmark("b1", "#fde68a"), Mark::comment("c1", "#bfdbfe")],
            )]),
        ])
    }

    fn mounted(doc: Document) -> EditorSession {
        let (session, _receiver) = EditorSession::mount(Some(Editor::new(doc)), Config::default()).unwrap();
        session
    }

    #[test]
    fn test_list_marks_one_entry_per_run() {
        let doc = annotated();
        let comments = list_marks(&doc, MarkType::Comment);
        assert_eq!(comments.len(), 3);
        assert!(comments.iter().all(|entry| entry.id == "c1"));
        assert_eq!(comments[1].content, " three");

        let bookmarks = list_marks(&doc, MarkType::Bookmark);
        assert_eq!(
            bookmarks,
            vec![MarkEntry {
                id: "b1".to_string(),
                content: "four".to_string(),
            }]
        );
    }

    #[test]
    fn test_extent_spans_every_fragment() {
        let doc = annotated();
        // runs at 1..5, 8..14 and 16..20
        assert_eq!(mark_extent(&doc, MarkType::Comment, "c1"), Some((1, 20)));
        assert_eq!(mark_extent(&doc, MarkType::Bookmark, "b1"), Some((16, 20)));
        assert_eq!(mark_extent(&doc, MarkType::Bookmark, "missing"), None);
    }

    #[test]
    fn test_delete_marks_strips_only_listed_ids() {
        let mut session = mounted(annotated());
        assert!(session.delete_marks(&["c1".to_string()], MarkType::Comment));
        assert!(session.list_marks(MarkType::Comment).is_empty());
        assert_eq!(session.list_marks(MarkType::Bookmark).len(), 1);
        assert!(!session.delete_marks(&["c1".to_string()], MarkType::Comment));
    }

    #[test]
    fn test_scroll_selects_extent_after_settle() {
        let mut session = mounted(annotated());
        session.attach_geometry(Box::new(GridGeometry::new(10, 8.0, 20.0)));

        assert!(!session.scroll_to_mark("nope", MarkType::Comment));
        assert!(!session.has_pending_scroll());

        assert!(session.scroll_to_mark("c1", MarkType::Comment));
        assert!(!session.tick_at(Instant::now()));
        assert_eq!(session.selection(), Some(Selection::caret(1)));

        assert!(session.tick_at(Instant::now() + Duration::from_secs(5)));
        assert_eq!(session.selection(), Some(Selection::new(1, 20)));
        assert!(!session.has_pending_scroll());
    }

    #[test]
    fn test_scroll_offset_accounts_for_container_and_margin() {
        let (mut session, mut receiver) =
            EditorSession::mount(Some(Editor::new(annotated())), Config::default()).unwrap();
        let mut geometry = GridGeometry::new(10, 8.0, 20.0);
        geometry.scroll_top = 100.0;
        session.attach_geometry(Box::new(geometry));
        while receiver.try_recv().is_ok() {}

        // b1 starts at 16: second grid row, 20px down; margin is 48px.
        assert!(session.scroll_to_mark("b1", MarkType::Bookmark));
        assert_eq!(receiver.try_recv().ok(), Some(SessionEvent::ScrollTo { top: 72.0 }));

        // Offsets above the container top clamp to zero.
        session.attach_geometry(Box::new(GridGeometry::new(10, 8.0, 20.0)));
        assert!(session.scroll_to_mark("c1", MarkType::Comment));
        assert_eq!(receiver.try_recv().ok(), Some(SessionEvent::ScrollTo { top: 0.0 }));
    }

    #[test]
    fn test_newer_scroll_replaces_pending() {
        let mut session = mounted(annotated());
        session.scroll_to_mark("c1", MarkType::Comment);
        session.scroll_to_mark("b1", MarkType::Bookmark);
        assert!(session.tick_at(Instant::now() + Duration::from_secs(5)));
        assert_eq!(session.selection(), Some(Selection::new(16, 20)));
        assert!(!session.tick_at(Instant::now() + Duration::from_secs(10)));
    }

    #[tokio::test]
    async fn test_settle_waits_for_pending_scroll() {
        let mut session = mounted(annotated());
        session.config.editor.scroll_settle_ms = 10;
        session.scroll_to_mark("b1", MarkType::Bookmark);
        assert!(session.settle().await);
        assert_eq!(session.selection(), Some(Selection::new(16, 20)));
        assert!(!session.settle().await);
    }

    #[test]
    fn test_recolor_follows_highlight_toggle() {
        let mut doc = annotated();
        let mut config = AnnotationConfig::default();
        config.comments_highlighted = false;
        recolor(&mut doc, &config);
        let spans = doc.text_spans(0, doc.content_size());
        for span in spans {
            for mark in span.marks {
                match mark {
                    Mark::Comment { attrs } => assert_eq!(attrs.color, config.neutral_color),
                    Mark::Bookmark { attrs } => assert_eq!(attrs.color, config.bookmark_color),
                    _ => {}
                }
            }
        }
    }
}
