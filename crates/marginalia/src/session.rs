//! The explicit session object hosts hold: owns the engine, the action log
//! and the event channel, and exposes the command surface (see
//! `commands.rs`, `registry.rs` and `coordinator.rs` for the rest of the
//! `impl EditorSession` blocks).

use anyhow::Result;
use doccore::{Document, MarkType};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::config::Config;
use crate::editor::{Editor, Selection};
use crate::emphasis::EmphasisState;
use crate::events::{ActiveAnnotation, SessionEvent};
use crate::geometry::ViewGeometry;
use crate::history::{HistoryCategory, HistoryState, HistoryTracker};
use crate::registry::{list_marks, MarkEntry, PendingScroll};
use crate::status_manager::{MessageType, StatusManager, StatusMessage};

pub struct EditorSession {
    pub(crate) engine: Option<Editor>,
    pub(crate) history: HistoryTracker,
    pub(crate) config: Config,
    events: UnboundedSender<SessionEvent>,
    pub(crate) geometry: Option<Box<dyn ViewGeometry + Send>>,
    pub(crate) pending_scroll: Option<PendingScroll>,
    pub(crate) show_non_printing: bool,
    pub(crate) popover_open: bool,
    pub(crate) last_emphasis: Option<EmphasisState>,
    pub(crate) current_section: Option<String>,
    pub(crate) last_selected_text: String,
    pub(crate) last_active: Vec<ActiveAnnotation>,
    last_bookmarks: Vec<MarkEntry>,
    last_comments: Vec<MarkEntry>,
    pub status: StatusManager,
}

impl EditorSession {
    /// Attaches a session to an engine. A missing engine is a fatal
    /// initialization error.
    pub fn mount(engine: Option<Editor>, config: Config) -> Result<(Self, UnboundedReceiver<SessionEvent>)> {
        let mut engine =
            engine.ok_or_else(|| anyhow::anyhow!("Cannot mount editor session: no document engine"))?;
        engine.set_history_limit(config.editor.history_limit);

        let (events, receiver) = mpsc::unbounded_channel();
        let mut session = Self {
            engine: Some(engine),
            history: HistoryTracker::new(config.editor.max_history_actions),
            config,
            events,
            geometry: None,
            pending_scroll: None,
            show_non_printing: false,
            popover_open: false,
            last_emphasis: None,
            current_section: None,
            last_selected_text: String::new(),
            last_active: Vec::new(),
            last_bookmarks: Vec::new(),
            last_comments: Vec::new(),
            status: StatusManager::new(),
        };
        session.publish_mark_lists();
        session.on_selection_change();
        log::info!("Editor session mounted");
        Ok((session, receiver))
    }

    /// Detaches and returns the engine. Later commands become no-ops.
    pub fn unmount(&mut self) -> Option<Editor> {
        self.pending_scroll = None;
        let engine = self.engine.take();
        if engine.is_some() {
            log::info!("Editor session unmounted");
        }
        engine
    }

    pub fn is_mounted(&self) -> bool {
        self.engine.is_some()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn history(&self) -> &HistoryTracker {
        &self.history
    }

    pub fn document(&self) -> Option<&Document> {
        self.engine.as_ref().map(Editor::document)
    }

    pub fn selection(&self) -> Option<Selection> {
        self.engine.as_ref().map(Editor::selection)
    }

    pub fn is_modified(&self) -> bool {
        self.engine.as_ref().is_some_and(Editor::is_modified)
    }

    pub fn mark_saved(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.mark_saved();
        }
    }

    pub fn attach_geometry(&mut self, geometry: Box<dyn ViewGeometry + Send>) {
        self.geometry = Some(geometry);
    }

    pub fn history_state(&self) -> HistoryState {
        HistoryState {
            can_undo: self.engine.as_ref().is_some_and(Editor::can_undo),
            can_redo: self.engine.as_ref().is_some_and(Editor::can_redo),
            action_count: self.history.len(),
            last_label: self.history.last().map(|action| action.label.clone()),
        }
    }

    /// Posts a user-facing notice and forwards it to the host.
    pub fn notify(&mut self, level: MessageType, message: &str) {
        self.status.post(StatusMessage::new(message.to_string(), level));
        self.emit(SessionEvent::Notice {
            level,
            message: message.to_string(),
        });
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            log::debug!("Session event dropped: receiver closed");
        }
    }

    /// Engine access for a command; logs and yields `None` once unmounted.
    pub(crate) fn engine_for(&mut self, operation: &str) -> Option<&mut Editor> {
        if self.engine.is_none() {
            log::warn!("Ignoring '{}': no active editor engine", operation);
        }
        self.engine.as_mut()
    }

    /// Runs one edit as a transaction. Real changes are logged under
    /// `category`/`label` and announced; returns whether anything changed.
    pub(crate) fn commit<F>(&mut self, category: HistoryCategory, label: &str, f: F) -> bool
    where
        F: FnOnce(&mut Document, &mut Selection),
    {
        let Some(engine) = self.engine_for(label) else {
            return false;
        };
        let changed = engine.apply(f);
        if changed {
            self.after_change(Some((category, label)));
        } else {
            log::debug!("'{}' left the document unchanged", label);
            self.on_selection_change();
        }
        changed
    }

    /// Post-edit bookkeeping: action log, update and history events, mark
    /// lists, then selection-derived state.
    pub(crate) fn after_change(&mut self, tracked: Option<(HistoryCategory, &str)>) {
        let Some(engine) = self.engine.as_ref() else {
            return;
        };
        let document = engine.document().clone();
        if let Some((category, label)) = tracked {
            self.history.track(category, label, document.clone());
        }
        self.emit(SessionEvent::Update(document));
        self.emit(SessionEvent::HistoryStateChange(self.history_state()));
        self.publish_mark_lists();
        self.on_selection_change();
    }

    /// Emits bookmark/comment lists when they differ from the last ones sent.
    pub(crate) fn publish_mark_lists(&mut self) {
        let Some(document) = self.document() else {
            return;
        };
        let bookmarks = list_marks(document, MarkType::Bookmark);
        let comments = list_marks(document, MarkType::Comment);
        if bookmarks != self.last_bookmarks {
            self.last_bookmarks = bookmarks.clone();
            self.emit(SessionEvent::BookmarksChanged(bookmarks));
        }
        if comments != self.last_comments {
            self.last_comments = comments.clone();
            self.emit(SessionEvent::CommentsChanged(comments));
        }
    }

    pub fn undo(&mut self, action_id: Option<&str>) -> bool {
        let Some(id) = action_id else {
            let Some(engine) = self.engine_for("undo") else {
                return false;
            };
            if !engine.can_undo() {
                return false;
            }
            engine.undo();
            self.after_change(None);
            return true;
        };

        if self.engine.is_none() {
            log::warn!("Ignoring 'undo to action': no active editor engine");
            return false;
        }
        let Some(target) = self.history.truncate_after(id) else {
            log::warn!("No history action with id {}", id);
            return false;
        };
        let snapshot = target.content_snapshot;
        if let Some(engine) = self.engine.as_mut() {
            engine.apply(move |doc, sel| {
                *doc = snapshot;
                *sel = Selection::caret(1);
            });
            engine.discard_redo();
        }
        log::info!("Restored document to action '{}'", target.label);
        self.after_change(None);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(engine) = self.engine_for("redo") else {
            return false;
        };
        if !engine.redo() {
            return false;
        }
        self.after_change(None);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doccore::Node;

    fn hello_world() -> Editor {
        Editor::new(Document::new(vec![Node::paragraph(vec![Node::text("Hello World")])]))
    }

    fn drain(receiver: &mut UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_mount_without_engine_fails() {
        let result = EditorSession::mount(None, Config::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_mount_emits_initial_state() {
        let (session, mut receiver) = EditorSession::mount(Some(hello_world()), Config::default()).unwrap();
        assert!(session.is_mounted());
        let events = drain(&mut receiver);
        assert!(events
            .iter()
            .any(|event| matches!(event, SessionEvent::EmphasisStateChange(_))));
    }

    #[test]
    fn test_unmounted_session_ignores_commands() {
        let (mut session, _receiver) = EditorSession::mount(Some(hello_world()), Config::default()).unwrap();
        assert!(session.unmount().is_some());
        assert!(!session.set_bold(true));
        assert!(!session.undo(None));
        assert!(session.document().is_none());
    }

    #[test]
    fn test_commit_tracks_and_announces() {
        let (mut session, mut receiver) = EditorSession::mount(Some(hello_world()), Config::default()).unwrap();
        drain(&mut receiver);

        session.set_selection(1, 12);
        assert!(session.set_bold(true));
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.history().last().unwrap().category, HistoryCategory::CharacterStyle);

        let events = drain(&mut receiver);
        assert!(events.iter().any(|event| matches!(event, SessionEvent::Update(_))));
        assert!(events.iter().any(|event| matches!(
            event,
            SessionEvent::HistoryStateChange(HistoryState { can_undo: true, .. })
        )));

        // Re-applying bold changes nothing and logs nothing.
        assert!(!session.set_bold(true));
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn test_undo_to_action_restores_snapshot_and_truncates() {
        let (mut session, _receiver) = EditorSession::mount(Some(hello_world()), Config::default()).unwrap();
        session.set_selection(1, 6);
        session.set_bold(true);
        let target = session.history().last().unwrap().clone();
        session.set_italic(true);
        session.set_underline(true);
        assert_eq!(session.history().len(), 3);

        assert!(session.undo(Some(&target.id)));
        assert_eq!(session.document().unwrap(), &target.content_snapshot);
        assert_eq!(session.history().len(), 1);
        assert!(!session.redo());
    }

    #[test]
    fn test_undo_to_action_after_native_undo_drops_redo() {
        let (mut session, _receiver) = EditorSession::mount(Some(hello_world()), Config::default()).unwrap();
        session.set_selection(1, 6);
        session.set_bold(true);
        let target = session.history().last().unwrap().clone();
        session.set_italic(true);

        assert!(session.undo(None));
        assert_eq!(session.document().unwrap(), &target.content_snapshot);
        assert!(session.history_state().can_redo);

        assert!(session.undo(Some(&target.id)));
        assert_eq!(session.history().len(), 1);
        assert!(!session.history_state().can_redo);
        assert!(!session.redo());
        assert_eq!(session.document().unwrap(), &target.content_snapshot);
    }

    #[test]
    fn test_native_undo_and_redo() {
        let (mut session, _receiver) = EditorSession::mount(Some(hello_world()), Config::default()).unwrap();
        session.set_selection(1, 6);
        session.set_bold(true);
        assert!(session.undo(None));
        assert!(session.document().unwrap().marks_at(3).is_empty());
        assert!(session.redo());
        assert!(!session.document().unwrap().marks_at(3).is_empty());
        assert!(!session.redo());
    }
}
