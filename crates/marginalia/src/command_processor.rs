use anyhow::Result;
use doccore::{Alignment, ListKind, MarkType};

use crate::case::CaseType;
use crate::commands::ListStyleRequest;
use crate::drafts::DraftStore;
use crate::session::EditorSession;

/// Line-oriented front end to the session's command surface.
pub struct CommandProcessor;

impl Default for CommandProcessor {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_toggle(arg: Option<&str>) -> Result<bool> {
    match arg {
        None | Some("on") | Some("true") => Ok(true),
        Some("off") | Some("false") => Ok(false),
        Some(other) => Err(anyhow::anyhow!("Expected 'on' or 'off', got '{}'", other)),
    }
}

fn parse_number<T: std::str::FromStr>(arg: Option<&str>, what: &str) -> Result<T> {
    let arg = arg.ok_or_else(|| anyhow::anyhow!("Argument required: {}", what))?;
    arg.parse()
        .map_err(|_| anyhow::anyhow!("Invalid {}: '{}'", what, arg))
}

/// `off` clears an optional value; anything else is parsed.
fn parse_optional<T: std::str::FromStr>(arg: Option<&str>, what: &str) -> Result<Option<T>> {
    match arg {
        Some("off") => Ok(None),
        other => parse_number(other, what).map(Some),
    }
}

fn parse_alignment(arg: Option<&str>) -> Result<Alignment> {
    match arg {
        Some("left") => Ok(Alignment::Left),
        Some("center") => Ok(Alignment::Center),
        Some("right") => Ok(Alignment::Right),
        Some("justify") => Ok(Alignment::Justify),
        other => Err(anyhow::anyhow!("Unknown alignment: {}", other.unwrap_or(""))),
    }
}

fn outcome(changed: bool, message: &str) -> String {
    if changed {
        message.to_string()
    } else {
        "No change".to_string()
    }
}

impl CommandProcessor {
    pub fn new() -> Self {
        Self
    }

    pub async fn execute_command(
        &self,
        command: &str,
        session: &mut EditorSession,
        drafts: &DraftStore,
        should_quit: &mut bool,
    ) -> Result<String> {
        let cmd = command.trim();
        if cmd.is_empty() {
            return Ok(String::new());
        }

        // Commands taking free text keep everything after the first space.
        let raw = command.trim_start().trim_end_matches(['\r', '\n']);
        if let Some(text) = raw.strip_prefix("insert ") {
            return Ok(outcome(session.insert_text(&text.replace("\\n", "\n")), "Inserted"));
        }
        if let Some(html) = cmd.strip_prefix("insert-html ") {
            return Ok(outcome(session.insert_html(html), "Inserted"));
        }
        if let Some(family) = cmd.strip_prefix("font ") {
            let family = family.trim();
            let family = (family != "off").then_some(family);
            return Ok(outcome(session.set_font_family(family), "Font family set"));
        }

        let parts: Vec<&str> = cmd.split_whitespace().collect();
        let arg = parts.get(1).copied();

        match parts[0] {
            "select" => {
                let anchor = parse_number(arg, "anchor")?;
                let head = parse_number(parts.get(2).copied(), "head")?;
                session.set_selection(anchor, head);
                Ok(format!("Selected {}..{}", anchor, head))
            }
            "select-all" => {
                session.select_all();
                Ok("Selected all".to_string())
            }
            "bold" => Ok(outcome(session.set_bold(parse_toggle(arg)?), "Bold")),
            "italic" => Ok(outcome(session.set_italic(parse_toggle(arg)?), "Italic")),
            "underline" => Ok(outcome(session.set_underline(parse_toggle(arg)?), "Underline")),
            "strike" => Ok(outcome(session.set_strike(parse_toggle(arg)?), "Strikethrough")),
            "sup" => Ok(outcome(session.set_superscript(parse_toggle(arg)?), "Superscript")),
            "sub" => Ok(outcome(session.set_subscript(parse_toggle(arg)?), "Subscript")),
            "ligatures" => Ok(outcome(session.set_ligature(parse_toggle(arg)?), "Ligatures")),
            "heading" => {
                let level: u8 = parse_number(arg, "heading level")?;
                Ok(outcome(session.set_heading(level), &format!("Heading {}", level)))
            }
            "body" => Ok(outcome(session.set_body(), "Body")),
            "code" => Ok(outcome(session.set_code_block(parse_toggle(arg)?), "Code block")),
            "size" => Ok(outcome(session.set_font_size(parse_optional(arg, "font size")?), "Font size set")),
            "color" => {
                let color = arg.filter(|value| !matches!(*value, "off" | "none"));
                Ok(outcome(session.set_text_color(color), "Text color set"))
            }
            "highlight" => {
                let color = arg.filter(|value| !matches!(*value, "off" | "none"));
                Ok(outcome(session.set_highlight_color(color), "Highlight set"))
            }
            "spacing" => {
                let before = parse_optional(arg, "space before")?;
                let after = parse_optional(parts.get(2).copied(), "space after")?;
                Ok(outcome(session.set_spacing(before, after), "Paragraph spacing set"))
            }
            "line" => Ok(outcome(session.set_line_spacing(parse_optional(arg, "line spacing")?), "Line spacing set")),
            "letter" => match arg {
                Some("+") => Ok(outcome(session.increment_character_spacing(), "Character spacing increased")),
                Some("-") => Ok(outcome(session.decrement_character_spacing(), "Character spacing decreased")),
                other => Ok(outcome(
                    session.set_character_spacing(parse_optional(other, "character spacing")?),
                    "Character spacing set",
                )),
            },
            "align" => Ok(outcome(session.set_text_alignment(parse_alignment(arg)?), "Aligned")),
            "indent" => Ok(outcome(session.indent(), "Indented")),
            "outdent" => Ok(outcome(session.outdent(), "Outdented")),
            "quote" => Ok(outcome(session.set_blockquote(parse_toggle(arg)?), "Blockquote")),
            "case" => {
                let case: CaseType = arg
                    .ok_or_else(|| anyhow::anyhow!("Argument required: case type"))?
                    .parse()?;
                Ok(outcome(session.set_case(case), "Case changed"))
            }
            "list" => {
                let kind = match arg {
                    Some("bullet") => Some(ListKind::Bullet),
                    Some("order") | Some("numbered") => Some(ListKind::Order),
                    Some("off") | Some("none") => None,
                    other => return Err(anyhow::anyhow!("Unknown list type: {}", other.unwrap_or(""))),
                };
                let request = ListStyleRequest {
                    kind,
                    style: parts.get(2).map(|style| style.to_string()),
                };
                Ok(outcome(session.set_list_style(request), "List updated"))
            }
            "numbering" => {
                let start = parse_number(arg, "start number")?;
                Ok(outcome(session.set_list_numbering(start), "Numbering restarted"))
            }
            "continue-numbering" => Ok(outcome(session.continue_previous_numbering(), "Numbering continued")),
            "link" => {
                let href = arg.ok_or_else(|| anyhow::anyhow!("Argument required: href"))?;
                Ok(outcome(session.set_link(href), "Link set"))
            }
            "unlink" => Ok(outcome(session.unset_link(), "Link removed")),
            "clear-format" => Ok(outcome(session.unset_all_marks(), "Formatting cleared")),
            "bookmark" | "comment" => {
                let mark_type = if parts[0] == "bookmark" {
                    MarkType::Bookmark
                } else {
                    MarkType::Comment
                };
                let default_color = match mark_type {
                    MarkType::Bookmark => session.config().annotations.bookmark_color.clone(),
                    _ => session.config().annotations.comment_color.clone(),
                };
                let color = arg.map(str::to_string).unwrap_or(default_color);
                let id = match mark_type {
                    MarkType::Bookmark => session.add_bookmark(&color),
                    _ => session.add_comment(&color),
                };
                id.map(|id| format!("Added {} {}", parts[0], id))
                    .ok_or_else(|| anyhow::anyhow!("Select some text first"))
            }
            "unbookmark" => Ok(outcome(session.unset_bookmark(), "Bookmark removed from selection")),
            "uncomment" => Ok(outcome(session.unset_comment(), "Comment removed from selection")),
            "bookmarks" | "comments" => {
                let mark_type = if parts[0] == "bookmarks" {
                    MarkType::Bookmark
                } else {
                    MarkType::Comment
                };
                let entries = session.list_marks(mark_type);
                if entries.is_empty() {
                    return Ok(format!("No {}", parts[0]));
                }
                let lines: Vec<String> = entries
                    .iter()
                    .map(|entry| format!("{}  {}", entry.id, entry.content))
                    .collect();
                Ok(lines.join("\n"))
            }
            "delete-bookmark" | "delete-comment" => {
                let ids: Vec<String> = parts[1..].iter().map(|id| id.to_string()).collect();
                if ids.is_empty() {
                    return Err(anyhow::anyhow!("Argument required: id"));
                }
                let changed = if parts[0] == "delete-bookmark" {
                    session.delete_bookmarks(&ids)
                } else {
                    session.delete_comments(&ids)
                };
                Ok(outcome(changed, "Deleted"))
            }
            "goto-bookmark" | "goto-comment" => {
                let id = arg.ok_or_else(|| anyhow::anyhow!("Argument required: id"))?;
                let found = if parts[0] == "goto-bookmark" {
                    session.scroll_to_bookmark(id)
                } else {
                    session.scroll_to_comment(id)
                };
                if found {
                    Ok(format!("Scrolling to {}", id))
                } else {
                    Err(anyhow::anyhow!("No annotation with id {}", id))
                }
            }
            "delete" => Ok(outcome(session.delete_selection(), "Deleted")),
            "undo" => Ok(outcome(session.undo(arg), "Undone")),
            "redo" => Ok(outcome(session.redo(), "Redone")),
            "history" => {
                let actions = session.history().actions();
                if actions.is_empty() {
                    return Ok("No history".to_string());
                }
                let lines: Vec<String> = actions
                    .iter()
                    .map(|action| {
                        format!(
                            "{}  {:?}  {}  {}",
                            action.id,
                            action.category,
                            action.label,
                            action.timestamp.format("%H:%M:%S")
                        )
                    })
                    .collect();
                Ok(lines.join("\n"))
            }
            "state" => {
                let state = session
                    .emphasis_state()
                    .ok_or_else(|| anyhow::anyhow!("No active editor engine"))?;
                Ok(serde_json::to_string_pretty(&state)?)
            }
            "text" => Ok(session.selected_text()),
            "html" => session
                .get_html()
                .ok_or_else(|| anyhow::anyhow!("No active editor engine")),
            "json" => {
                let value = session
                    .get_json()
                    .ok_or_else(|| anyhow::anyhow!("No active editor engine"))?;
                Ok(serde_json::to_string_pretty(&value)?)
            }
            "nonprinting" => {
                session.set_show_non_printing_characters(parse_toggle(arg)?);
                Ok("Non-printing characters toggled".to_string())
            }
            "save" => {
                let name = arg.ok_or_else(|| anyhow::anyhow!("Argument required: draft name"))?;
                let document = session
                    .document()
                    .ok_or_else(|| anyhow::anyhow!("No active editor engine"))?
                    .clone();
                let message = drafts.save(name, &document).await?;
                session.mark_saved();
                Ok(message)
            }
            "load" => {
                let name = arg.ok_or_else(|| anyhow::anyhow!("Argument required: draft name"))?;
                let draft = drafts.load(name).await?;
                session.set_document(draft.document);
                Ok(format!("Draft '{}' loaded", name))
            }
            "drafts" => {
                let list = drafts.list().await?;
                if list.is_empty() {
                    return Ok("No drafts".to_string());
                }
                let lines: Vec<String> = list
                    .iter()
                    .map(|draft| format!("{}  {}", draft.name, draft.modified_at.format("%Y-%m-%d %H:%M")))
                    .collect();
                Ok(lines.join("\n"))
            }
            "quit" | "q" => {
                if session.is_modified() {
                    Ok("Unsaved changes (use quit! to override)".to_string())
                } else {
                    *should_quit = true;
                    Ok("Quitting".to_string())
                }
            }
            "quit!" | "q!" => {
                *should_quit = true;
                Ok("Force quitting".to_string())
            }
            "insert" | "insert-html" | "font" => Err(anyhow::anyhow!("Argument required: {}", parts[0])),
            other => Err(anyhow::anyhow!("Unknown command: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::editor::Editor;
    use doccore::{Document, Node};
    use tempfile::TempDir;

    fn setup() -> (EditorSession, DraftStore, TempDir) {
        let doc = Document::new(vec![Node::paragraph(vec![Node::text("Hello World")])]);
        let (session, _receiver) = EditorSession::mount(Some(Editor::new(doc)), Config::default()).unwrap();
        let dir = TempDir::new().unwrap();
        let drafts = DraftStore::with_dir(dir.path().join("drafts"));
        (session, drafts, dir)
    }

    #[tokio::test]
    async fn test_formatting_commands() {
        let processor = CommandProcessor::new();
        let (mut session, drafts, _dir) = setup();
        let mut should_quit = false;

        processor
            .execute_command("select 1 6", &mut session, &drafts, &mut should_quit)
            .await
            .unwrap();
        let result = processor
            .execute_command("bold on", &mut session, &drafts, &mut should_quit)
            .await
            .unwrap();
        assert_eq!(result, "Bold");
        assert!(session.emphasis_state().unwrap().bold);

        let html = processor
            .execute_command("html", &mut session, &drafts, &mut should_quit)
            .await
            .unwrap();
        assert!(html.contains("<strong>Hello</strong>"));

        let result = processor
            .execute_command("bold on", &mut session, &drafts, &mut should_quit)
            .await
            .unwrap();
        assert_eq!(result, "No change");
    }

    #[tokio::test]
    async fn test_bookmark_commands() {
        let processor = CommandProcessor::new();
        let (mut session, drafts, _dir) = setup();
        let mut should_quit = false;

        let error = processor
            .execute_command("bookmark", &mut session, &drafts, &mut should_quit)
            .await
            .unwrap_err();
        assert!(error.to_string().contains("Select"));

        session.set_selection(7, 12);
        processor
            .execute_command("bookmark #ffff00", &mut session, &drafts, &mut should_quit)
            .await
            .unwrap();
        let listing = processor
            .execute_command("bookmarks", &mut session, &drafts, &mut should_quit)
            .await
            .unwrap();
        assert!(listing.ends_with("World"));

        let id = session.list_marks(MarkType::Bookmark)[0].id.clone();
        processor
            .execute_command(&format!("delete-bookmark {}", id), &mut session, &drafts, &mut should_quit)
            .await
            .unwrap();
        assert!(session.list_marks(MarkType::Bookmark).is_empty());
    }

    #[tokio::test]
    async fn test_draft_and_quit_commands() {
        let processor = CommandProcessor::new();
        let (mut session, drafts, _dir) = setup();
        let mut should_quit = false;

        processor
            .execute_command("insert Draft: ", &mut session, &drafts, &mut should_quit)
            .await
            .unwrap();
        processor
            .execute_command("quit", &mut session, &drafts, &mut should_quit)
            .await
            .unwrap();
        assert!(!should_quit);

        processor
            .execute_command("save intro", &mut session, &drafts, &mut should_quit)
            .await
            .unwrap();
        assert!(!session.is_modified());

        processor
            .execute_command("select-all", &mut session, &drafts, &mut should_quit)
            .await
            .unwrap();
        processor
            .execute_command("delete", &mut session, &drafts, &mut should_quit)
            .await
            .unwrap();
        processor
            .execute_command("load intro", &mut session, &drafts, &mut should_quit)
            .await
            .unwrap();
        assert_eq!(session.document().unwrap().plain_text(), "Draft: Hello World");

        processor
            .execute_command("quit!", &mut session, &drafts, &mut should_quit)
            .await
            .unwrap();
        assert!(should_quit);
    }

    #[tokio::test]
    async fn test_unknown_and_invalid_commands() {
        let processor = CommandProcessor::new();
        let (mut session, drafts, _dir) = setup();
        let mut should_quit = false;

        assert!(processor
            .execute_command("frobnicate", &mut session, &drafts, &mut should_quit)
            .await
            .is_err());
        assert!(processor
            .execute_command("bold maybe", &mut session, &drafts, &mut should_quit)
            .await
            .is_err());
        assert!(processor
            .execute_command("case shouting", &mut session, &drafts, &mut should_quit)
            .await
            .is_err());
        assert_eq!(
            processor
                .execute_command("   ", &mut session, &drafts, &mut should_quit)
                .await
                .unwrap(),
            ""
        );
    }
}
