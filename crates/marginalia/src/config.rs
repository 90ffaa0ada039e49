use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs::try_exists;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub styles: StyleConfig,
    #[serde(default)]
    pub annotations: AnnotationConfig,
    #[serde(default)]
    pub editor: EditorConfig,
}

/// Font attributes a block style implies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StylePreset {
    pub font_family: String,
    pub font_size: f32,
    pub font_weight: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleConfig {
    pub body: StylePreset,
    /// Presets for heading levels 1 through 6.
    pub headings: Vec<StylePreset>,
    pub default_text_color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationConfig {
    pub bookmarks_highlighted: bool,
    pub comments_highlighted: bool,
    pub bookmark_color: String,
    pub comment_color: String,
    /// Color applied to annotations while highlighting is off.
    pub neutral_color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorConfig {
    pub history_limit: usize,
    pub max_history_actions: usize,
    pub scroll_settle_ms: u64,
    pub scroll_margin: f64,
    pub popover_offset: f64,
    pub character_spacing_step: f32,
    pub max_indent: u8,
}

const HEADING_SIZES: [f32; 6] = [18.0, 16.0, 14.0, 12.0, 10.0, 10.0];

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            body: StylePreset {
                font_family: String::from("Times New Roman"),
                font_size: 12.0,
                font_weight: 400,
            },
            headings: HEADING_SIZES
                .iter()
                .map(|size| StylePreset {
                    font_family: String::from("Times New Roman"),
                    font_size: *size,
                    font_weight: 700,
                })
                .collect(),
            default_text_color: String::from("#000000"),
        }
    }
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            bookmarks_highlighted: true,
            comments_highlighted: true,
            bookmark_color: String::from("#fde68a"),
            comment_color: String::from("#bfdbfe"),
            neutral_color: String::from("transparent"),
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: 100,
            max_history_actions: 200,
            scroll_settle_ms: 300,
            scroll_margin: 48.0,
            popover_offset: 40.0,
            character_spacing_step: 0.5,
            max_indent: 8,
        }
    }
}

impl StyleConfig {
    /// Preset for a heading level; levels past the configured list reuse the last one.
    pub fn heading(&self, level: u8) -> &StylePreset {
        let index = usize::from(level.clamp(1, 6)) - 1;
        self.headings
            .get(index)
            .or_else(|| self.headings.last())
            .unwrap_or(&self.body)
    }
}

impl Config {
    pub async fn load() -> Result<Self> {
        if let Some(config_path) = Self::config_path() {
            if try_exists(&config_path).await? {
                match tokio::fs::read_to_string(&config_path).await {
                    Ok(content) => {
                        if content.trim().is_empty() {
                            log::warn!("Config file is empty, creating new one");
                            let default_config = Self::default();
                            let _ = default_config.save().await;
                            return Ok(default_config);
                        }

                        match serde_json::from_str::<Self>(&content) {
                            Ok(mut config) => {
                                config.validate()?;
                                log::info!(
                                    "Successfully loaded config from: {}",
                                    config_path.display()
                                );
                                return Ok(config);
                            }
                            Err(json_err) => {
                                log::error!("Failed to parse config file: {}", json_err);

                                let backup_path = config_path.with_extension("bak");
                                if let Err(e) = tokio::fs::copy(&config_path, &backup_path).await {
                                    log::warn!("Failed to backup broken config: {}", e);
                                } else {
                                    log::info!(
                                        "Backed up broken config to: {}",
                                        backup_path.display()
                                    );
                                }

                                let default_config = Self::default();
                                let _ = default_config.save().await;
                                return Ok(default_config);
                            }
                        }
                    }
                    Err(io_err) => {
                        log::error!("Failed to read config file: {}", io_err);
                    }
                }
            } else {
                log::info!("Config file does not exist, creating default");
            }
        }

        let default_config = Self::default();
        let _ = default_config.save().await;
        Ok(default_config)
    }

    pub async fn save(&self) -> Result<()> {
        if let Some(config_path) = Self::config_path() {
            let mut config_to_save = self.clone();
            config_to_save.validate()?;

            if let Some(parent) = config_path.parent() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    anyhow::anyhow!(
                        "Failed to create config directory: {} - {}",
                        parent.display(),
                        e
                    )
                })?;
                log::debug!("Config directory exists or was created: {}", parent.display());
            }

            let content = serde_json::to_string_pretty(&config_to_save)
                .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
            tokio::fs::write(&config_path, content).await.map_err(|e| {
                anyhow::anyhow!(
                    "Failed to write config file: {} - {}",
                    config_path.display(),
                    e
                )
            })?;
            log::info!("Successfully saved config to: {}", config_path.display());
        }
        Ok(())
    }

    /// Validate configuration values and fix invalid ones
    pub fn validate(&mut self) -> Result<()> {
        let mut has_issues = false;
        let defaults = Self::default();

        if self.editor.history_limit == 0 || self.editor.history_limit > 1000 {
            log::warn!(
                "Invalid history limit: {}, using default",
                self.editor.history_limit
            );
            self.editor.history_limit = defaults.editor.history_limit;
            has_issues = true;
        }

        if self.editor.max_history_actions == 0 || self.editor.max_history_actions > 10_000 {
            log::warn!(
                "Invalid action log limit: {}, using default",
                self.editor.max_history_actions
            );
            self.editor.max_history_actions = defaults.editor.max_history_actions;
            has_issues = true;
        }

        if !(self.editor.character_spacing_step > 0.0 && self.editor.character_spacing_step <= 10.0) {
            log::warn!(
                "Invalid character spacing step: {}, using default",
                self.editor.character_spacing_step
            );
            self.editor.character_spacing_step = defaults.editor.character_spacing_step;
            has_issues = true;
        }

        if self.editor.max_indent == 0 || self.editor.max_indent > 20 {
            log::warn!("Invalid max indent: {}, using default", self.editor.max_indent);
            self.editor.max_indent = defaults.editor.max_indent;
            has_issues = true;
        }

        if self.styles.headings.len() != 6 {
            log::warn!(
                "Expected 6 heading presets, found {}; filling from defaults",
                self.styles.headings.len()
            );
            self.styles.headings.truncate(6);
            let missing = defaults.styles.headings[self.styles.headings.len()..].to_vec();
            self.styles.headings.extend(missing);
            has_issues = true;
        }

        let presets = std::iter::once(&mut self.styles.body).chain(self.styles.headings.iter_mut());
        for preset in presets {
            if !(4.0..=144.0).contains(&preset.font_size) {
                log::warn!("Invalid preset font size: {}, using 12", preset.font_size);
                preset.font_size = 12.0;
                has_issues = true;
            }
            if preset.font_family.trim().is_empty() {
                log::warn!("Empty preset font family, using default");
                preset.font_family = defaults.styles.body.font_family.clone();
                has_issues = true;
            }
        }

        if self.styles.default_text_color.is_empty() {
            log::warn!("Empty default text color, using default");
            self.styles.default_text_color = defaults.styles.default_text_color;
            has_issues = true;
        }

        if has_issues {
            log::info!("Configuration validation completed with corrections");
        }

        Ok(())
    }

    fn config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("MARGINALIA_CONFIG_PATH") {
            return Some(PathBuf::from(path));
        }

        if let Ok(dir) = std::env::var("MARGINALIA_CONFIG_DIR") {
            return Some(PathBuf::from(dir).join("config.json"));
        }

        ProjectDirs::from("org", "marginalia", "marginalia")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};
    use tempfile::TempDir;

    fn config_test_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    fn set_config_path(path: &std::path::Path) -> Option<String> {
        let previous = std::env::var("MARGINALIA_CONFIG_PATH").ok();
        std::env::set_var("MARGINALIA_CONFIG_PATH", path);
        previous
    }

    fn restore_config_env(previous: Option<String>) {
        match previous {
            Some(value) => std::env::set_var("MARGINALIA_CONFIG_PATH", value),
            None => std::env::remove_var("MARGINALIA_CONFIG_PATH"),
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.styles.body.font_size, 12.0);
        assert_eq!(config.styles.headings.len(), 6);
        assert_eq!(config.styles.heading(1).font_size, 18.0);
        assert_eq!(config.styles.heading(5).font_size, 10.0);
        assert!(config.annotations.bookmarks_highlighted);
        assert_eq!(config.annotations.neutral_color, "transparent");
        assert_eq!(config.editor.history_limit, 100);
        assert_eq!(config.editor.character_spacing_step, 0.5);
    }

    #[test]
    fn test_validate_corrects_values() {
        let mut config = Config::default();
        config.editor.history_limit = 0;
        config.editor.max_indent = 99;
        config.styles.headings.truncate(2);
        config.styles.body.font_size = 1.0;

        config.validate().unwrap();

        assert_eq!(config.editor.history_limit, 100);
        assert_eq!(config.editor.max_indent, 8);
        assert_eq!(config.styles.headings.len(), 6);
        assert_eq!(config.styles.heading(6).font_size, 10.0);
        assert_eq!(config.styles.body.font_size, 12.0);
    }

    #[test]
    fn test_partial_config_uses_section_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"editor":{"history_limit":5,"max_history_actions":9,"scroll_settle_ms":0,"scroll_margin":0.0,"popover_offset":0.0,"character_spacing_step":1.0,"max_indent":3}}"#)
                .unwrap();
        assert_eq!(config.editor.history_limit, 5);
        assert_eq!(config.styles.headings.len(), 6);
        assert!(config.annotations.comments_highlighted);
    }

    #[tokio::test]
    async fn test_config_load_and_backup_corrupt_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let previous = {
            let _guard = config_test_lock().lock().unwrap();
            set_config_path(&path)
        };

        let config = Config::load().await;
        assert!(config.is_ok());
        assert!(try_exists(path.with_extension("bak")).await.unwrap());

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(written.contains("\"styles\""));

        restore_config_env(previous);
    }
}
