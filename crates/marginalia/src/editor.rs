use doccore::Document;

/// Anchor/head pair over document positions. `from()..to()` is the
/// half-open range; equal ends denote a caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    pub fn caret(pos: usize) -> Self {
        Self::new(pos, pos)
    }

    pub fn from(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn to(&self) -> usize {
        self.anchor.max(self.head)
    }

    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }

    pub fn clamped(self, size: usize) -> Self {
        Self::new(self.anchor.min(size), self.head.min(size))
    }
}

#[derive(Clone)]
struct EditorState {
    document: Document,
    selection: Selection,
}

const DEFAULT_HISTORY_LIMIT: usize = 100;

/// The editing engine: owns the document and selection and keeps a bounded
/// snapshot history for native undo/redo.
#[derive(Clone)]
pub struct Editor {
    document: Document,
    selection: Selection,
    modified: bool,
    version: u64,
    // Undo/Redo support
    history: Vec<EditorState>,
    history_index: usize,
    history_limit: usize,
}

impl Editor {
    pub fn new(document: Document) -> Self {
        let selection = Selection::caret(1).clamped(document.content_size());
        let initial_state = EditorState {
            document: document.clone(),
            selection,
        };
        Self {
            document,
            selection,
            modified: false,
            version: 0,
            history: vec![initial_state],
            history_index: 0,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    pub fn set_history_limit(&mut self, limit: usize) {
        self.history_limit = limit.max(1);
        while self.history.len() > self.history_limit {
            self.history.remove(0);
            self.history_index = self.history_index.saturating_sub(1);
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn mark_saved(&mut self) {
        self.modified = false;
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection.clamped(self.document.content_size());
    }

    /// Replaces the document and starts a fresh history.
    pub fn set_content(&mut self, document: Document) {
        self.document = document;
        self.selection = Selection::caret(1).clamped(self.document.content_size());
        self.history = vec![EditorState {
            document: self.document.clone(),
            selection: self.selection,
        }];
        self.history_index = 0;
        self.modified = false;
        self.version += 1;
    }

    /// Runs `f` as one transaction. Returns whether the document changed;
    /// only changes are recorded in the history.
    pub fn apply<F>(&mut self, f: F) -> bool
    where
        F: FnOnce(&mut Document, &mut Selection),
    {
        let before = self.document.clone();
        f(&mut self.document, &mut self.selection);
        self.selection = self.selection.clamped(self.document.content_size());
        if self.document == before {
            return false;
        }
        self.version += 1;
        self.modified = true;
        self.save_state();
        true
    }

    /// Like [`Editor::apply`] but folds the result into the current history
    /// entry instead of creating a new undo step.
    pub fn apply_silently<F>(&mut self, f: F) -> bool
    where
        F: FnOnce(&mut Document, &mut Selection),
    {
        let before = self.document.clone();
        f(&mut self.document, &mut self.selection);
        self.selection = self.selection.clamped(self.document.content_size());
        if self.document == before {
            return false;
        }
        self.version += 1;
        if let Some(state) = self.history.get_mut(self.history_index) {
            state.document = self.document.clone();
            state.selection = self.selection;
        }
        true
    }

    fn save_state(&mut self) {
        let current_state = EditorState {
            document: self.document.clone(),
            selection: self.selection,
        };

        // Don't save if the document hasn't changed from current history state
        if let Some(last_state) = self.history.get(self.history_index) {
            if last_state.document == current_state.document {
                return;
            }
        }

        // Remove any states after current index (if we're not at the end)
        self.history.truncate(self.history_index + 1);

        self.history.push(current_state);
        self.history_index += 1;

        if self.history.len() > self.history_limit {
            self.history.remove(0);
            self.history_index -= 1;
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history_index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.history_index + 1 < self.history.len()
    }

    pub fn undo(&mut self) -> bool {
        if !self.can_undo() {
            return false;
        }
        self.history_index -= 1;
        self.restore_current();
        true
    }

    pub fn redo(&mut self) -> bool {
        if !self.can_redo() {
            return false;
        }
        self.history_index += 1;
        self.restore_current();
        true
    }

    /// Drops every state after the current one.
    pub fn discard_redo(&mut self) {
        self.history.truncate(self.history_index + 1);
    }

    fn restore_current(&mut self) {
        let state = &self.history[self.history_index];
        self.document = state.document.clone();
        self.selection = state.selection;
        self.modified = true;
        self.version += 1;
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(Document::empty())
    }
}
