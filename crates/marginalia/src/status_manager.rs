use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Info,
    Success,
    Warning,
    Error,
}

impl MessageType {
    fn default_duration(self) -> Duration {
        match self {
            MessageType::Info => Duration::from_secs(3),
            MessageType::Success => Duration::from_secs(2),
            MessageType::Warning => Duration::from_secs(5),
            MessageType::Error => Duration::from_secs(7),
        }
    }
}

/// A user-facing notice, e.g. the clipboard's final fallback prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusMessage {
    pub content: String,
    pub message_type: MessageType,
    pub created_at: Instant,
    pub auto_clear_duration: Option<Duration>,
}

impl StatusMessage {
    pub fn new(content: String, message_type: MessageType) -> Self {
        Self {
            content,
            message_type,
            created_at: Instant::now(),
            auto_clear_duration: Some(message_type.default_duration()),
        }
    }

    pub fn permanent(content: String, message_type: MessageType) -> Self {
        Self {
            auto_clear_duration: None,
            ..Self::new(content, message_type)
        }
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.auto_clear_duration
            .is_some_and(|duration| now.duration_since(self.created_at) > duration)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }
}

const RECENT_LIMIT: usize = 20;

/// Current notice plus a short backlog of recent ones.
#[derive(Debug, Clone, Default)]
pub struct StatusManager {
    current_message: Option<StatusMessage>,
    recent: VecDeque<StatusMessage>,
}

impl StatusManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&mut self, message: StatusMessage) {
        if let Some(previous) = self.current_message.replace(message) {
            self.recent.push_front(previous);
            self.recent.truncate(RECENT_LIMIT);
        }
    }

    pub fn set_info(&mut self, message: String) {
        self.post(StatusMessage::new(message, MessageType::Info));
    }

    pub fn set_warning(&mut self, message: String) {
        self.post(StatusMessage::new(message, MessageType::Warning));
    }

    pub fn set_error(&mut self, message: String) {
        self.post(StatusMessage::new(message, MessageType::Error));
    }

    pub fn clear(&mut self) {
        self.current_message = None;
    }

    /// Drops the current notice once it has expired.
    pub fn update(&mut self) {
        self.update_at(Instant::now());
    }

    pub fn update_at(&mut self, now: Instant) {
        if self
            .current_message
            .as_ref()
            .is_some_and(|message| message.is_expired_at(now))
        {
            if let Some(expired) = self.current_message.take() {
                self.recent.push_front(expired);
                self.recent.truncate(RECENT_LIMIT);
            }
        }
    }

    pub fn current(&self) -> Option<&StatusMessage> {
        self.current_message.as_ref()
    }

    pub fn recent(&self) -> impl Iterator<Item = &StatusMessage> {
        self.recent.iter()
    }

    pub fn has_message(&self) -> bool {
        self.current_message.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_types() {
        let mut manager = StatusManager::new();
        assert!(!manager.has_message());

        manager.set_info("Info message".to_string());
        assert_eq!(manager.current().unwrap().message_type, MessageType::Info);

        manager.set_warning("Use Ctrl+V to paste".to_string());
        let message = manager.current().unwrap();
        assert_eq!(message.message_type, MessageType::Warning);
        assert_eq!(message.content, "Use Ctrl+V to paste");
        assert_eq!(manager.recent().count(), 1);
    }

    #[test]
    fn test_update_expired_message() {
        let mut manager = StatusManager::new();
        manager.set_error("Failed".to_string());
        manager.update();
        assert!(manager.has_message());

        manager.update_at(Instant::now() + Duration::from_secs(60));
        assert!(!manager.has_message());
        assert_eq!(manager.recent().next().unwrap().content, "Failed");
    }

    #[test]
    fn test_permanent_message() {
        let message = StatusMessage::permanent("Pinned".to_string(), MessageType::Info);
        assert!(!message.is_expired_at(Instant::now() + Duration::from_secs(3600)));
    }

    #[test]
    fn test_clear() {
        let mut manager = StatusManager::new();
        manager.set_info("Test message".to_string());
        manager.clear();
        assert!(!manager.has_message());
    }
}
