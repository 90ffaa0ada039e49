//! Named document drafts stored as JSON files.

use anyhow::Result;
use chrono::{DateTime, Utc};
use doccore::Document;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;
use tokio::fs::try_exists;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftData {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub document: Document,
}

pub struct DraftStore {
    draft_dir: PathBuf,
}

impl DraftStore {
    pub fn new() -> Result<Self> {
        let draft_dir = Self::get_draft_dir()?;
        Ok(Self { draft_dir })
    }

    pub fn with_dir(draft_dir: PathBuf) -> Self {
        Self { draft_dir }
    }

    pub fn dir(&self) -> &std::path::Path {
        &self.draft_dir
    }

    fn get_draft_dir() -> Result<PathBuf> {
        if let Ok(dir) = std::env::var("MARGINALIA_DATA_DIR") {
            return Ok(PathBuf::from(dir).join("drafts"));
        }
        let dirs = directories::ProjectDirs::from("org", "marginalia", "marginalia")
            .ok_or_else(|| anyhow::anyhow!("Could not determine project directories"))?;
        Ok(dirs.data_dir().join("drafts"))
    }

    fn draft_path(&self, name: &str) -> Result<PathBuf> {
        let invalid = name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(|c: char| c == '/' || c == '\\' || c.is_control());
        if invalid {
            return Err(anyhow::anyhow!("Invalid draft name '{}'", name));
        }
        Ok(self.draft_dir.join(format!("{}.json", name)))
    }

    /// Saves `document` under `name`, keeping the original creation time
    /// when the draft already exists.
    pub async fn save(&self, name: &str, document: &Document) -> Result<String> {
        let filepath = self.draft_path(name)?;
        fs::create_dir_all(&self.draft_dir).await?;

        let existing_created_at = if try_exists(&filepath).await? {
            match fs::read_to_string(&filepath).await {
                Ok(json) => match serde_json::from_str::<DraftData>(&json) {
                    Ok(draft) => Some(draft.created_at),
                    Err(e) => {
                        log::warn!("Failed to parse existing draft '{}': {}", name, e);
                        None
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read existing draft file '{}': {}", filepath.display(), e);
                    None
                }
            }
        } else {
            None
        };

        let now = Utc::now();
        let draft = DraftData {
            name: name.to_string(),
            created_at: existing_created_at.unwrap_or(now),
            modified_at: now,
            document: document.clone(),
        };
        let json = serde_json::to_string_pretty(&draft)?;
        fs::write(&filepath, json).await?;
        log::info!("Saved draft '{}' to {}", name, filepath.display());

        Ok(format!("Draft '{}' saved", name))
    }

    pub async fn load(&self, name: &str) -> Result<DraftData> {
        let filepath = self.draft_path(name)?;
        if !try_exists(&filepath).await? {
            return Err(anyhow::anyhow!("Draft '{}' not found", name));
        }
        let json = fs::read_to_string(&filepath).await?;
        let mut draft: DraftData = serde_json::from_str(&json)?;
        draft.document = Document::new(std::mem::take(&mut draft.document.content));
        Ok(draft)
    }

    /// All readable drafts, most recently modified first.
    pub async fn list(&self) -> Result<Vec<DraftData>> {
        if !try_exists(&self.draft_dir).await? {
            return Ok(Vec::new());
        }

        let mut drafts = Vec::new();
        let mut dir_entries = fs::read_dir(&self.draft_dir).await?;
        while let Some(entry) = dir_entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            match fs::read_to_string(&path).await {
                Ok(json) => match serde_json::from_str::<DraftData>(&json) {
                    Ok(draft) => drafts.push(draft),
                    Err(e) => log::warn!("Skipping unreadable draft {}: {}", path.display(), e),
                },
                Err(e) => log::warn!("Skipping draft {}: {}", path.display(), e),
            }
        }

        drafts.sort_by(|a, b| b.modified_at.cmp(&a.modified_at));
        Ok(drafts)
    }

    pub async fn delete(&self, name: &str) -> Result<String> {
        let filepath = self.draft_path(name)?;
        if !try_exists(&filepath).await? {
            return Err(anyhow::anyhow!("Draft '{}' not found", name));
        }
        fs::remove_file(&filepath).await?;
        Ok(format!("Draft '{}' deleted", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doccore::Node;
    use std::sync::{Mutex, OnceLock};
    use tempfile::TempDir;

    fn draft_test_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    fn sample() -> Document {
        Document::new(vec![Node::paragraph(vec![Node::text("Draft text")])])
    }

    #[tokio::test]
    async fn test_save_load_list_and_delete() {
        let dir = TempDir::new().unwrap();
        let store = DraftStore::with_dir(dir.path().join("drafts"));

        let message = store.save("chapter-1", &sample()).await.unwrap();
        assert!(message.contains("saved"));
        let first = store.load("chapter-1").await.unwrap();
        assert_eq!(first.document, sample());

        store.save("chapter-1", &Document::empty()).await.unwrap();
        let again = store.load("chapter-1").await.unwrap();
        assert_eq!(again.created_at, first.created_at);
        assert!(again.modified_at >= first.modified_at);
        assert_eq!(again.document, Document::empty());

        store.save("chapter-2", &sample()).await.unwrap();
        let names: Vec<String> = store.list().await.unwrap().into_iter().map(|d| d.name).collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"chapter-2".to_string()));

        assert!(store.delete("chapter-1").await.unwrap().contains("deleted"));
        assert!(store.load("chapter-1").await.is_err());
    }

    #[tokio::test]
    async fn test_rejects_path_like_names() {
        let dir = TempDir::new().unwrap();
        let store = DraftStore::with_dir(dir.path().to_path_buf());
        assert!(store.save("../escape", &sample()).await.is_err());
        assert!(store.load("").await.is_err());
    }

    #[tokio::test]
    async fn test_missing_dir_lists_nothing() {
        let dir = TempDir::new().unwrap();
        let store = DraftStore::with_dir(dir.path().join("absent"));
        assert!(store.list().await.unwrap().is_empty());
        assert!(store.delete("nope").await.unwrap_err().to_string().contains("not found"));
    }

    #[test]
    fn test_data_dir_env_override() {
        let _guard = draft_test_lock().lock().unwrap();
        let dir = TempDir::new().unwrap();
        let previous = std::env::var("MARGINALIA_DATA_DIR").ok();
        std::env::set_var("MARGINALIA_DATA_DIR", dir.path());

        let store = DraftStore::new().unwrap();
        assert_eq!(store.dir(), dir.path().join("drafts"));

        match previous {
            Some(value) => std::env::set_var("MARGINALIA_DATA_DIR", value),
            None => std::env::remove_var("MARGINALIA_DATA_DIR"),
        }
    }
}
