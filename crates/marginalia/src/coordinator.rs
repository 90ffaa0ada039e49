use doccore::{Document, Mark, Node};

use crate::config::AnnotationConfig;
use crate::editor::Selection;
use crate::emphasis::{self, EmphasisState};
use crate::events::{ActiveAnnotation, SessionEvent};
use crate::geometry::{place_popover, PopoverPlacement};
use crate::session::EditorSession;

/// Type of the last section divider before `pos`.
pub fn current_section(doc: &Document, pos: usize) -> Option<String> {
    let mut section = None;
    doc.nodes_between(0, pos, |node, start, _| {
        if let Node::SectionDivider { attrs } = node {
            if start < pos {
                section = Some(attrs.section_type.clone());
            }
        }
        true
    });
    section
}

/// Bookmarks and comments under the selection, limited to the kinds whose
/// highlighting is enabled.
pub fn active_annotations(doc: &Document, selection: Selection, config: &AnnotationConfig) -> Vec<ActiveAnnotation> {
    let marks: Vec<Mark> = if selection.is_empty() {
        doc.marks_at(selection.head)
    } else {
        doc.text_spans(selection.from(), selection.to())
            .into_iter()
            .flat_map(|span| span.marks.iter().cloned())
            .collect()
    };

    let mut active: Vec<ActiveAnnotation> = Vec::new();
    for mark in &marks {
        let shown = match mark {
            Mark::Bookmark { .. } => config.bookmarks_highlighted,
            Mark::Comment { .. } => config.comments_highlighted,
            _ => false,
        };
        let Some(id) = mark.annotation_id().filter(|_| shown) else {
            continue;
        };
        let entry = ActiveAnnotation {
            mark_type: mark.mark_type(),
            id: id.to_string(),
        };
        if !active.contains(&entry) {
            active.push(entry);
        }
    }
    active
}

impl EditorSession {
    pub fn emphasis_state(&self) -> Option<EmphasisState> {
        let engine = self.engine.as_ref()?;
        Some(emphasis::resolve(
            engine.document(),
            engine.selection(),
            &self.config,
            self.show_non_printing,
        ))
    }

    /// Re-derives everything that depends on the selection and emits what
    /// changed.
    pub fn on_selection_change(&mut self) {
        let Some(engine) = self.engine.as_ref() else {
            return;
        };
        let doc = engine.document();
        let selection = engine.selection();

        let section = current_section(doc, selection.from());
        let active = active_annotations(doc, selection, &self.config.annotations);
        let state = emphasis::resolve(doc, selection, &self.config, self.show_non_printing);
        let selected_text = doc.text_between(selection.from(), selection.to(), "\n");

        if section != self.current_section {
            self.current_section = section.clone();
            self.emit(SessionEvent::CurrentSection(section));
        }
        if active != self.last_active {
            self.last_active = active.clone();
            self.emit(SessionEvent::ActiveAnnotations(active));
        }
        if self.last_emphasis.as_ref() != Some(&state) {
            self.last_emphasis = Some(state.clone());
            self.emit(SessionEvent::EmphasisStateChange(state));
        }
        if selected_text != self.last_selected_text {
            self.last_selected_text = selected_text.clone();
            self.emit(SessionEvent::SelectedContentChange(selected_text));
        }
        if selection.is_empty() && self.popover_open {
            self.popover_open = false;
            self.emit(SessionEvent::Popover(None));
        }
    }

    /// Called when the user finishes a selection gesture; places and opens
    /// the contextual popover for a non-empty selection.
    pub fn selection_end(&mut self) -> Option<PopoverPlacement> {
        let selection = self.selection()?;
        if selection.is_empty() {
            return None;
        }
        let Some(geometry) = self.geometry.as_ref() else {
            log::debug!("No view geometry; popover not placed");
            return None;
        };
        let start = geometry.coords_at_pos(selection.from())?;
        let end = geometry.coords_at_pos(selection.to())?;
        let placement = place_popover(start, end, geometry.surface_rect(), self.config.editor.popover_offset);

        self.popover_open = true;
        self.emit(SessionEvent::Popover(Some(placement)));
        Some(placement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::editor::Editor;
    use crate::geometry::{GridGeometry, PopoverAnchor};
    use tokio::sync::mpsc::UnboundedReceiver;

    // <p>Intro</p><hr notes><p>[b1]Body[/b1] [c1]text[/c1]</p>
    fn sectioned() -> Document {
        Document::new(vec![
            Node::paragraph(vec![Node::text("Intro")]),
            Node::section_divider("notes"),
            Node::paragraph(vec![
                Node::styled_text("Body", vec![Mark::bookmark("b1", "#fde68a")]),
                Node::text(" "),
                Node::styled_text("text", vec![Mark::comment("c1", "#bfdbfe")]),
            ]),
        ])
    }

    fn drain(receiver: &mut UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_current_section_tracks_last_divider() {
        let doc = sectioned();
        // intro 0..7, divider at 7, body paragraph 8..19
        assert_eq!(current_section(&doc, 3), None);
        assert_eq!(current_section(&doc, 10), Some("notes".to_string()));
    }

    #[test]
    fn test_active_annotations_respect_toggles() {
        let doc = sectioned();
        let selection = Selection::new(9, 18);
        let mut config = AnnotationConfig::default();
        let active = active_annotations(&doc, selection, &config);
        assert_eq!(active.len(), 2);

        config.bookmarks_highlighted = false;
        let active = active_annotations(&doc, selection, &config);
        assert_eq!(
            active,
            vec![ActiveAnnotation {
                mark_type: doccore::MarkType::Comment,
                id: "c1".to_string(),
            }]
        );
    }

    #[test]
    fn test_selection_change_emits_section_and_text() {
        let (mut session, mut receiver) =
            EditorSession::mount(Some(Editor::new(sectioned())), Config::default()).unwrap();
        drain(&mut receiver);

        session.set_selection(9, 13);
        let events = drain(&mut receiver);
        assert!(events.contains(&SessionEvent::CurrentSection(Some("notes".to_string()))));
        assert!(events.contains(&SessionEvent::SelectedContentChange("Body".to_string())));
    }

    #[test]
    fn test_popover_opens_and_closes() {
        let (mut session, mut receiver) =
            EditorSession::mount(Some(Editor::new(sectioned())), Config::default()).unwrap();
        assert!(session.selection_end().is_none());

        session.attach_geometry(Box::new(GridGeometry::new(100, 10.0, 20.0)));
        session.set_selection(1, 6);
        let placement = session.selection_end().unwrap();
        assert_eq!(placement.anchor, PopoverAnchor::Left(35.0));
        drain(&mut receiver);

        session.set_selection(3, 3);
        assert!(drain(&mut receiver).contains(&SessionEvent::Popover(None)));
    }
}
