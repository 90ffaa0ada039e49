use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{ClipboardBackend, ClipboardFormat, ClipboardItem};

/// In-process clipboard. Each call kind can be made to fail, which lets
/// callers exercise every fallback tier.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    entries: DashMap<ClipboardFormat, String>,
    fail_rich_writes: AtomicBool,
    fail_text_writes: AtomicBool,
    fail_rich_reads: AtomicBool,
    fail_text_reads: AtomicBool,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, format: ClipboardFormat) -> Option<String> {
        self.entries.get(&format).map(|entry| entry.value().clone())
    }

    pub fn set(&self, format: ClipboardFormat, data: &str) {
        self.entries.insert(format, data.to_string());
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn fail_rich_writes(&self, fail: bool) {
        self.fail_rich_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_text_writes(&self, fail: bool) {
        self.fail_text_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_rich_reads(&self, fail: bool) {
        self.fail_rich_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_text_reads(&self, fail: bool) {
        self.fail_text_reads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ClipboardBackend for MemoryClipboard {
    async fn write(&self, items: Vec<ClipboardItem>) -> Result<()> {
        if self.fail_rich_writes.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("Multi-format clipboard write not permitted"));
        }
        self.entries.clear();
        for item in items {
            self.entries.insert(item.format, item.data);
        }
        Ok(())
    }

    async fn write_text(&self, text: &str) -> Result<()> {
        if self.fail_text_writes.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("Clipboard write not permitted"));
        }
        self.entries.clear();
        self.entries.insert(ClipboardFormat::PlainText, text.to_string());
        Ok(())
    }

    async fn read(&self) -> Result<Vec<ClipboardItem>> {
        if self.fail_rich_reads.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("Multi-format clipboard read not permitted"));
        }
        let mut items: Vec<ClipboardItem> = self
            .entries
            .iter()
            .map(|entry| ClipboardItem {
                format: *entry.key(),
                data: entry.value().clone(),
            })
            .collect();
        items.sort_by_key(|item| item.format == ClipboardFormat::PlainText);
        Ok(items)
    }

    async fn read_text(&self) -> Result<String> {
        if self.fail_text_reads.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("Clipboard read not permitted"));
        }
        Ok(self.get(ClipboardFormat::PlainText).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_replaces_previous_contents() {
        let clipboard = MemoryClipboard::new();
        clipboard
            .write(vec![ClipboardItem::plain_text("a"), ClipboardItem::html("<p>a</p>")])
            .await
            .unwrap();
        clipboard.write_text("b").await.unwrap();
        assert_eq!(clipboard.read().await.unwrap(), vec![ClipboardItem::plain_text("b")]);
        assert_eq!(clipboard.read_text().await.unwrap(), "b");
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let clipboard = MemoryClipboard::new();
        clipboard.fail_text_reads(true);
        clipboard.fail_rich_writes(true);
        assert!(clipboard.read_text().await.is_err());
        assert!(clipboard.write(Vec::new()).await.is_err());
        assert!(clipboard.write_text("ok").await.is_ok());
    }
}
