use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

mod memory;

pub use memory::MemoryClipboard;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClipboardFormat {
    PlainText,
    Html,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardItem {
    pub format: ClipboardFormat,
    pub data: String,
}

impl ClipboardItem {
    pub fn plain_text(data: impl Into<String>) -> Self {
        Self {
            format: ClipboardFormat::PlainText,
            data: data.into(),
        }
    }

    pub fn html(data: impl Into<String>) -> Self {
        Self {
            format: ClipboardFormat::Html,
            data: data.into(),
        }
    }
}

/// System clipboard access. Multi-format calls may be unsupported by a
/// host, so the text-only calls are separate.
#[async_trait]
pub trait ClipboardBackend: Send + Sync {
    async fn write(&self, items: Vec<ClipboardItem>) -> Result<()>;
    async fn write_text(&self, text: &str) -> Result<()>;
    async fn read(&self) -> Result<Vec<ClipboardItem>>;
    async fn read_text(&self) -> Result<String>;
}

pub const COPY_FALLBACK_NOTICE: &str = "Clipboard unavailable: use Ctrl+C to copy";
pub const PASTE_FALLBACK_NOTICE: &str = "Clipboard unavailable: use Ctrl+V to paste";

/// Copy, cut and paste between an editor session and a clipboard backend.
/// Each operation degrades from rich content to plain text to a notice.
pub struct ClipboardPipeline {
    backend: Arc<dyn ClipboardBackend>,
}

impl ClipboardPipeline {
    pub fn new(backend: Arc<dyn ClipboardBackend>) -> Self {
        Self { backend }
    }

    /// Writes the selection as plain text and HTML. Returns whether
    /// anything reached the clipboard.
    pub async fn copy(&self, session: &mut marginalia::EditorSession) -> bool {
        let Some(selection) = session.selection() else {
            log::warn!("Ignoring copy: no active editor engine");
            return false;
        };
        if selection.is_empty() {
            return false;
        }
        let text = session.selected_text();
        let html = session.selected_html();

        let items = vec![ClipboardItem::plain_text(text.clone()), ClipboardItem::html(html)];
        match self.backend.write(items).await {
            Ok(()) => return true,
            Err(e) => log::debug!("Rich clipboard write failed, trying plain text: {}", e),
        }
        match self.backend.write_text(&text).await {
            Ok(()) => true,
            Err(e) => {
                log::debug!("Plain-text clipboard write failed: {}", e);
                session.notify(marginalia::MessageType::Warning, COPY_FALLBACK_NOTICE);
                false
            }
        }
    }

    /// Copies, then deletes the selection once the write went through.
    pub async fn cut(&self, session: &mut marginalia::EditorSession) -> bool {
        if !self.copy(session).await {
            return false;
        }
        session.delete_selection()
    }

    /// Inserts clipboard content over the selection, preferring HTML.
    pub async fn paste(&self, session: &mut marginalia::EditorSession) -> bool {
        match self.backend.read().await {
            Ok(items) => {
                let html = items
                    .iter()
                    .find(|item| item.format == ClipboardFormat::Html && !item.data.is_empty());
                if let Some(item) = html {
                    return session.insert_html(&item.data);
                }
                let text = items
                    .iter()
                    .find(|item| item.format == ClipboardFormat::PlainText && !item.data.is_empty());
                if let Some(item) = text {
                    return session.insert_text(&item.data);
                }
                log::debug!("Clipboard holds no usable format, trying plain text");
            }
            Err(e) => log::debug!("Rich clipboard read failed, trying plain text: {}", e),
        }

        match self.backend.read_text().await {
            Ok(text) if !text.is_empty() => session.insert_text(&text),
            Ok(_) => {
                session.notify(marginalia::MessageType::Warning, PASTE_FALLBACK_NOTICE);
                false
            }
            Err(e) => {
                log::debug!("Plain-text clipboard read failed: {}", e);
                session.notify(marginalia::MessageType::Warning, PASTE_FALLBACK_NOTICE);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doccore::{Document, Node};
    use marginalia::{Config, Editor, EditorSession, SessionEvent};

    fn session() -> EditorSession {
        let doc = Document::new(vec![Node::paragraph(vec![Node::text("Hello World")])]);
        let (session, _receiver) = EditorSession::mount(Some(Editor::new(doc)), Config::default()).unwrap();
        session
    }

    fn text_of(session: &EditorSession) -> String {
        session.document().unwrap().plain_text()
    }

    #[tokio::test]
    async fn test_copy_writes_both_formats() {
        let clipboard = Arc::new(MemoryClipboard::new());
        let pipeline = ClipboardPipeline::new(clipboard.clone());
        let mut session = session();

        assert!(!pipeline.copy(&mut session).await);

        session.set_selection(1, 6);
        assert!(pipeline.copy(&mut session).await);
        assert_eq!(clipboard.get(ClipboardFormat::PlainText), Some("Hello".to_string()));
        assert!(clipboard
            .get(ClipboardFormat::Html)
            .is_some_and(|html| html.contains("Hello")));
    }

    #[tokio::test]
    async fn test_copy_falls_back_to_plain_text() {
        let clipboard = Arc::new(MemoryClipboard::new());
        clipboard.fail_rich_writes(true);
        let pipeline = ClipboardPipeline::new(clipboard.clone());
        let mut session = session();

        session.set_selection(7, 12);
        assert!(pipeline.copy(&mut session).await);
        assert_eq!(clipboard.get(ClipboardFormat::PlainText), Some("World".to_string()));
        assert_eq!(clipboard.get(ClipboardFormat::Html), None);
    }

    #[tokio::test]
    async fn test_cut_deletes_only_after_write() {
        let clipboard = Arc::new(MemoryClipboard::new());
        let pipeline = ClipboardPipeline::new(clipboard.clone());
        let mut session = session();

        session.set_selection(1, 7);
        assert!(pipeline.cut(&mut session).await);
        assert_eq!(text_of(&session), "World");
        assert_eq!(clipboard.get(ClipboardFormat::PlainText), Some("Hello ".to_string()));

        clipboard.fail_rich_writes(true);
        clipboard.fail_text_writes(true);
        session.select_all();
        assert!(!pipeline.cut(&mut session).await);
        assert_eq!(text_of(&session), "World");
        assert!(session.status.has_message());
    }

    #[tokio::test]
    async fn test_paste_prefers_html() {
        let clipboard = Arc::new(MemoryClipboard::new());
        clipboard.set(ClipboardFormat::PlainText, "plain");
        clipboard.set(ClipboardFormat::Html, "<p><strong>rich</strong></p>");
        let pipeline = ClipboardPipeline::new(clipboard);
        let mut session = session();

        session.set_selection(12, 12);
        assert!(pipeline.paste(&mut session).await);
        assert_eq!(text_of(&session), "Hello Worldrich");
        assert!(session.get_html().unwrap().contains("<strong>rich</strong>"));
    }

    #[tokio::test]
    async fn test_paste_falls_back_to_text_then_notice() {
        let clipboard = Arc::new(MemoryClipboard::new());
        clipboard.set(ClipboardFormat::PlainText, "!");
        clipboard.fail_rich_reads(true);
        let pipeline = ClipboardPipeline::new(clipboard.clone());
        let (mut session, mut receiver) = EditorSession::mount(
            Some(Editor::new(Document::new(vec![Node::paragraph(vec![Node::text("Hi")])]))),
            Config::default(),
        )
        .unwrap();

        session.set_selection(3, 3);
        assert!(pipeline.paste(&mut session).await);
        assert_eq!(text_of(&session), "Hi!");

        clipboard.clear();
        assert!(!pipeline.paste(&mut session).await);
        let mut notices = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            if let SessionEvent::Notice { message, .. } = event {
                notices.push(message);
            }
        }
        assert_eq!(notices, vec![PASTE_FALLBACK_NOTICE.to_string()]);
    }
}
