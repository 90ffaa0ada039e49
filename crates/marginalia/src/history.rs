//! Labeled action log layered over the engine's native undo.

use chrono::{DateTime, Utc};
use doccore::Document;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HistoryCategory {
    HeadingStyle,
    ParagraphStyle,
    CharacterStyle,
    CustomStyle,
    Content,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryAction {
    pub id: String,
    pub category: HistoryCategory,
    pub label: String,
    pub content_snapshot: Document,
    pub timestamp: DateTime<Utc>,
}

/// Summary pushed to the host after every change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryState {
    pub can_undo: bool,
    pub can_redo: bool,
    pub action_count: usize,
    pub last_label: Option<String>,
}

pub struct HistoryTracker {
    actions: Vec<HistoryAction>,
    limit: usize,
}

impl HistoryTracker {
    pub fn new(limit: usize) -> Self {
        Self {
            actions: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Appends an action holding a full copy of `snapshot`. The oldest
    /// entries fall off once the log is full.
    pub fn track(&mut self, category: HistoryCategory, label: &str, snapshot: Document) -> &HistoryAction {
        self.actions.push(HistoryAction {
            id: Uuid::new_v4().to_string(),
            category,
            label: label.to_string(),
            content_snapshot: snapshot,
            timestamp: Utc::now(),
        });
        if self.actions.len() > self.limit {
            let overflow = self.actions.len() - self.limit;
            self.actions.drain(..overflow);
        }
        log::debug!("Tracked {:?} action '{}'", category, label);
        &self.actions[self.actions.len() - 1]
    }

    pub fn actions(&self) -> &[HistoryAction] {
        &self.actions
    }

    pub fn find(&self, id: &str) -> Option<&HistoryAction> {
        self.actions.iter().find(|action| action.id == id)
    }

    pub fn last(&self) -> Option<&HistoryAction> {
        self.actions.last()
    }

    /// Drops every action recorded after `id` and returns the target.
    pub fn truncate_after(&mut self, id: &str) -> Option<HistoryAction> {
        let index = self.actions.iter().position(|action| action.id == id)?;
        self.actions.truncate(index + 1);
        Some(self.actions[index].clone())
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doccore::Node;

    fn doc(text: &str) -> Document {
        Document::new(vec![Node::paragraph(vec![Node::text(text)])])
    }

    #[test]
    fn test_track_and_truncate() {
        let mut tracker = HistoryTracker::new(10);
        let first = tracker.track(HistoryCategory::CharacterStyle, "Bold", doc("a")).id.clone();
        tracker.track(HistoryCategory::Content, "Insert text", doc("ab"));
        tracker.track(HistoryCategory::HeadingStyle, "Heading 1", doc("abc"));

        let target = tracker.truncate_after(&first).unwrap();
        assert_eq!(target.content_snapshot, doc("a"));
        assert_eq!(tracker.len(), 1);
        assert!(tracker.truncate_after("missing").is_none());
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut tracker = HistoryTracker::new(2);
        tracker.track(HistoryCategory::Content, "one", doc("1"));
        tracker.track(HistoryCategory::Content, "two", doc("2"));
        tracker.track(HistoryCategory::Content, "three", doc("3"));
        let labels: Vec<&str> = tracker.actions().iter().map(|a| a.label.as_str()).collect();
        assert_eq!(labels, vec!["two", "three"]);
    }

    #[test]
    fn test_action_serializes_camel_case() {
        let mut tracker = HistoryTracker::new(5);
        let action = tracker.track(HistoryCategory::ParagraphStyle, "Align center", doc("x"));
        let json = serde_json::to_value(action).unwrap();
        assert_eq!(json["category"], "paragraphStyle");
        assert_eq!(json["contentSnapshot"]["type"], "doc");
        assert!(json["timestamp"].is_string());
    }
}
