//! The imperative command surface. Every mutating command runs as one
//! transaction and returns whether the document changed.

use doccore::mark::{text_style_of, FontVariant};
use doccore::{
    from_html, inner_html, to_html, Alignment, BlockAttrs, Document, ListAttrs, ListKind, Located, Mark,
    MarkType, Node, TextStyleAttrs,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::case::{self, CaseType};
use crate::config::{AnnotationConfig, StylePreset};
use crate::editor::Selection;
use crate::events::SessionEvent;
use crate::history::HistoryCategory;
use crate::session::EditorSession;

/// `kind: None` removes whichever list encloses the selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListStyleRequest {
    pub kind: Option<ListKind>,
    pub style: Option<String>,
}

/// Runs a structure-only edit, carrying the selection across it as text
/// points.
fn preserving_selection<F>(doc: &mut Document, selection: &mut Selection, edit: F)
where
    F: FnOnce(&mut Document),
{
    let anchor = doc.text_point(selection.anchor);
    let head = doc.text_point(selection.head);
    edit(doc);
    if let (Some(anchor), Some(head)) = (anchor, head) {
        *selection = Selection::new(doc.pos_of_text_point(anchor), doc.pos_of_text_point(head));
    }
}

/// Innermost ancestor of the textblock at `pos` matching `predicate`.
fn enclosing(doc: &Document, pos: usize, predicate: fn(&Node) -> bool) -> Option<Located> {
    let probe = doc.textblock_near(pos).map_or(pos, |block| block.content_start());
    doc.ancestors_at(probe)
        .into_iter()
        .rev()
        .find(|located| doc.node_at(&located.path).is_some_and(predicate))
}

fn is_blockquote(node: &Node) -> bool {
    matches!(node, Node::Blockquote { .. })
}

fn is_ordered_list(node: &Node) -> bool {
    matches!(node, Node::OrderedList { .. })
}

/// Sibling blocks covering the range, widened so lists are wrapped whole.
fn block_range(doc: &Document, from: usize, to: usize) -> Option<(Vec<usize>, usize, usize)> {
    let (mut parent, mut start, mut end) = doc.sibling_range(from, to)?;
    while doc.node_at(&parent).is_some_and(|node| node.is_list() || matches!(node, Node::ListItem { .. })) {
        let index = parent.pop()?;
        start = index;
        end = index;
    }
    Some((parent, start, end))
}

fn restyled_block(node: Node, level: Option<u8>, preset: &StylePreset) -> Node {
    let mut attrs = node.block_attrs().cloned().unwrap_or_default();
    attrs.font_family = Some(preset.font_family.clone());
    attrs.font_size = Some(preset.font_size);
    attrs.font_weight = Some(preset.font_weight);
    let content = node.into_content();
    match level {
        Some(level) => Node::Heading { level, attrs, content },
        None => Node::Paragraph { attrs, content },
    }
}

fn code_block_of(node: Node) -> Node {
    if matches!(node, Node::CodeBlock { .. }) {
        return node;
    }
    let text = node.text_content();
    let content = if text.is_empty() {
        Vec::new()
    } else {
        vec![Node::text(text)]
    };
    Node::CodeBlock { content }
}

fn paragraph_of(node: Node) -> Node {
    match node {
        Node::CodeBlock { content } => Node::paragraph(content),
        other => other,
    }
}

fn rounded_spacing(value: f32) -> Option<f32> {
    let rounded = (value * 100.0).round() / 100.0;
    (rounded.abs() > f32::EPSILON).then_some(rounded)
}

fn apply_list_style(doc: &mut Document, from: usize, to: usize, request: ListStyleRequest) {
    let active = enclosing(doc, from, Node::is_list);
    match (request.kind, active) {
        (None, Some(list)) => {
            doc.replace_node(&list.path, |node| {
                node.into_content().into_iter().flat_map(Node::into_content).collect()
            });
        }
        (None, None) => {}
        (Some(kind), Some(list)) => {
            doc.replace_node(&list.path, |node| {
                let attrs = ListAttrs {
                    list_style: request.style,
                    ..node.list_attrs().cloned().unwrap_or_default()
                };
                vec![Node::list(kind, attrs, node.into_content())]
            });
        }
        (Some(kind), None) => {
            if let Some((parent, start, end)) = block_range(doc, from, to) {
                let attrs = ListAttrs {
                    list_style: request.style,
                    ..ListAttrs::default()
                };
                doc.wrap_children(&parent, start, end, |children| {
                    let items = children.into_iter().map(|child| Node::list_item(vec![child])).collect();
                    Node::list(kind, attrs, items)
                });
            }
        }
    }
}

impl EditorSession {
    // Block style

    pub fn set_heading(&mut self, level: u8) -> bool {
        let level = level.clamp(1, 6);
        let preset = self.config.styles.heading(level).clone();
        self.set_block_style(Some(level), preset, HistoryCategory::HeadingStyle, &format!("Heading {}", level))
    }

    pub fn set_body(&mut self) -> bool {
        let preset = self.config.styles.body.clone();
        self.set_block_style(None, preset, HistoryCategory::ParagraphStyle, "Body")
    }

    /// Retypes the block at the anchor side of the selection, dropping its
    /// inline text styles in favor of the preset.
    fn set_block_style(&mut self, level: Option<u8>, preset: StylePreset, category: HistoryCategory, label: &str) -> bool {
        self.commit(category, label, move |doc, selection| {
            let anchor = selection.anchor;
            preserving_selection(doc, selection, |doc| {
                let Some(block) = doc.textblock_near(anchor) else {
                    return;
                };
                let size = doc.node_at(&block.path).map_or(0, Node::content_size);
                doc.remove_mark(block.content_start(), block.content_start() + size, MarkType::TextStyle);
                doc.replace_node(&block.path, |node| vec![restyled_block(node, level, &preset)]);
            });
        })
    }

    pub fn set_code_block(&mut self, enabled: bool) -> bool {
        let label = if enabled { "Code block" } else { "Remove code block" };
        self.commit(HistoryCategory::ParagraphStyle, label, move |doc, selection| {
            let (from, to) = (selection.from(), selection.to());
            preserving_selection(doc, selection, |doc| {
                for block in doc.textblocks_between(from, to) {
                    doc.replace_node(&block.path, |node| {
                        vec![if enabled { code_block_of(node) } else { paragraph_of(node) }]
                    });
                }
            });
        })
    }

    // Character style

    fn toggle_mark(&mut self, mark: Mark, enabled: bool, label: &str) -> bool {
        self.commit(HistoryCategory::CharacterStyle, label, |doc, selection| {
            let (from, to) = (selection.from(), selection.to());
            if enabled {
                doc.add_mark(from, to, &mark);
            } else {
                doc.remove_mark(from, to, mark.mark_type());
            }
        })
    }

    fn edit_text_style<F>(&mut self, label: &str, f: F) -> bool
    where
        F: FnMut(&mut TextStyleAttrs),
    {
        self.commit(HistoryCategory::CharacterStyle, label, move |doc, selection| {
            doc.update_text_style(selection.from(), selection.to(), f);
        })
    }

    pub fn set_bold(&mut self, enabled: bool) -> bool {
        self.toggle_mark(Mark::Bold, enabled, "Bold")
    }

    pub fn set_italic(&mut self, enabled: bool) -> bool {
        self.toggle_mark(Mark::Italic, enabled, "Italic")
    }

    pub fn set_underline(&mut self, enabled: bool) -> bool {
        self.toggle_mark(Mark::Underline, enabled, "Underline")
    }

    pub fn set_strike(&mut self, enabled: bool) -> bool {
        self.toggle_mark(Mark::Strike, enabled, "Strikethrough")
    }

    pub fn set_superscript(&mut self, enabled: bool) -> bool {
        self.set_script(Mark::Superscript, MarkType::Subscript, enabled, "Superscript")
    }

    pub fn set_subscript(&mut self, enabled: bool) -> bool {
        self.set_script(Mark::Subscript, MarkType::Superscript, enabled, "Subscript")
    }

    fn set_script(&mut self, mark: Mark, opposite: MarkType, enabled: bool, label: &str) -> bool {
        self.commit(HistoryCategory::CharacterStyle, label, |doc, selection| {
            let (from, to) = (selection.from(), selection.to());
            if enabled {
                doc.remove_mark(from, to, opposite);
                doc.add_mark(from, to, &mark);
            } else {
                doc.remove_mark(from, to, mark.mark_type());
            }
        })
    }

    pub fn set_font_family(&mut self, family: Option<&str>) -> bool {
        let family = family.map(str::to_string);
        self.edit_text_style("Font family", move |attrs| attrs.font_family = family.clone())
    }

    pub fn set_font_size(&mut self, size: Option<f32>) -> bool {
        self.edit_text_style("Font size", move |attrs| attrs.font_size = size)
    }

    pub fn set_text_color(&mut self, color: Option<&str>) -> bool {
        let color = color.map(str::to_string);
        self.edit_text_style("Text color", move |attrs| attrs.color = color.clone())
    }

    pub fn set_highlight_color(&mut self, color: Option<&str>) -> bool {
        match color {
            Some(color) => self.toggle_mark(Mark::highlight(color), true, "Highlight"),
            None => self.toggle_mark(Mark::highlight(""), false, "Remove highlight"),
        }
    }

    pub fn set_ligature(&mut self, enabled: bool) -> bool {
        self.edit_text_style("Ligatures", move |attrs| {
            attrs.ligatures = if enabled { None } else { Some(false) };
        })
    }

    pub fn set_character_spacing(&mut self, spacing: Option<f32>) -> bool {
        self.edit_text_style("Character spacing", move |attrs| {
            attrs.letter_spacing = spacing.and_then(rounded_spacing);
        })
    }

    pub fn increment_character_spacing(&mut self) -> bool {
        let step = self.config.editor.character_spacing_step;
        self.adjust_character_spacing(step)
    }

    pub fn decrement_character_spacing(&mut self) -> bool {
        let step = self.config.editor.character_spacing_step;
        self.adjust_character_spacing(-step)
    }

    fn adjust_character_spacing(&mut self, delta: f32) -> bool {
        self.edit_text_style("Character spacing", move |attrs| {
            attrs.letter_spacing = rounded_spacing(attrs.letter_spacing.unwrap_or(0.0) + delta);
        })
    }

    /// Removes formatting marks; bookmarks and comments stay.
    pub fn unset_all_marks(&mut self) -> bool {
        self.commit(HistoryCategory::CharacterStyle, "Clear formatting", |doc, selection| {
            doc.remove_marks_where(selection.from(), selection.to(), |mark| {
                !mark.mark_type().is_annotation()
            });
        })
    }

    // Paragraph style

    fn edit_blocks<F>(&mut self, label: &str, mut f: F) -> bool
    where
        F: FnMut(&mut BlockAttrs),
    {
        self.commit(HistoryCategory::ParagraphStyle, label, move |doc, selection| {
            doc.update_textblocks(selection.from(), selection.to(), |node| {
                if let Some(attrs) = node.block_attrs_mut() {
                    f(attrs);
                }
            });
        })
    }

    pub fn set_text_alignment(&mut self, alignment: Alignment) -> bool {
        self.edit_blocks("Alignment", move |attrs| attrs.text_align = Some(alignment))
    }

    pub fn set_line_spacing(&mut self, line_height: Option<f32>) -> bool {
        self.edit_blocks("Line spacing", move |attrs| attrs.line_height = line_height)
    }

    pub fn set_spacing(&mut self, before: Option<f32>, after: Option<f32>) -> bool {
        self.edit_blocks("Paragraph spacing", move |attrs| {
            attrs.space_before = before;
            attrs.space_after = after;
        })
    }

    pub fn indent(&mut self) -> bool {
        let max = self.config.editor.max_indent;
        self.edit_blocks("Indent", move |attrs| attrs.indent = attrs.indent.saturating_add(1).min(max))
    }

    pub fn outdent(&mut self) -> bool {
        self.edit_blocks("Outdent", |attrs| attrs.indent = attrs.indent.saturating_sub(1))
    }

    pub fn set_blockquote(&mut self, enabled: bool) -> bool {
        let label = if enabled { "Blockquote" } else { "Remove blockquote" };
        self.commit(HistoryCategory::ParagraphStyle, label, move |doc, selection| {
            let (from, to) = (selection.from(), selection.to());
            preserving_selection(doc, selection, |doc| {
                let quote = enclosing(doc, from, is_blockquote);
                match (enabled, quote) {
                    (true, None) => {
                        if let Some((parent, start, end)) = block_range(doc, from, to) {
                            doc.wrap_children(&parent, start, end, Node::blockquote);
                        }
                    }
                    (false, Some(quote)) => {
                        doc.replace_node(&quote.path, Node::into_content);
                    }
                    _ => {}
                }
            });
        })
    }

    // Lists

    pub fn set_list_style(&mut self, request: ListStyleRequest) -> bool {
        let label = match request.kind {
            Some(ListKind::Bullet) => "Bulleted list",
            Some(ListKind::Order) => "Numbered list",
            None => "Remove list",
        };
        self.commit(HistoryCategory::ParagraphStyle, label, move |doc, selection| {
            let (from, to) = (selection.from(), selection.to());
            preserving_selection(doc, selection, |doc| apply_list_style(doc, from, to, request));
        })
    }

    /// Restarts the enclosing numbered list at `start`.
    pub fn set_list_numbering(&mut self, start: u32) -> bool {
        self.commit(HistoryCategory::ParagraphStyle, "Restart numbering", move |doc, selection| {
            let Some(list) = enclosing(doc, selection.from(), is_ordered_list) else {
                return;
            };
            if let Some(attrs) = doc.node_at_mut(&list.path).and_then(Node::list_attrs_mut) {
                attrs.start = start.max(1);
            }
        })
    }

    pub fn continue_previous_numbering(&mut self) -> bool {
        self.commit(HistoryCategory::ParagraphStyle, "Continue numbering", |doc, selection| {
            let Some(list) = enclosing(doc, selection.from(), is_ordered_list) else {
                return;
            };
            let Some(previous) = doc.previous_ordered_list_end(list.pos) else {
                log::debug!("No earlier numbered list to continue from");
                return;
            };
            if let Some(attrs) = doc.node_at_mut(&list.path).and_then(Node::list_attrs_mut) {
                attrs.start = previous.saturating_add(1);
            }
        })
    }

    // Case

    /// Rewrites the selected text in place, keeping marks. Small caps also
    /// toggles the font variant, driven by the first selected run.
    pub fn set_case(&mut self, case: CaseType) -> bool {
        self.commit(HistoryCategory::CharacterStyle, "Change case", move |doc, selection| {
            let original = *selection;
            let (from, to) = (original.from(), original.to());
            let mut first = true;
            let mut delta: isize = 0;
            doc.map_runs(from, to, |run| {
                let transformed = case::transform(case, run.text.as_str(), run.before, first);
                delta += transformed.chars().count() as isize - run.text.chars().count() as isize;
                *run.text = transformed;
                first = false;
            });
            let to = to.saturating_add_signed(delta);

            if case == CaseType::SmallCaps {
                let already = doc
                    .text_spans(from, to)
                    .first()
                    .and_then(|span| text_style_of(span.marks))
                    .and_then(|attrs| attrs.font_variant)
                    == Some(FontVariant::SmallCaps);
                doc.update_text_style(from, to, |attrs| {
                    attrs.font_variant = (!already).then_some(FontVariant::SmallCaps);
                });
            }

            *selection = if original.anchor <= original.head {
                Selection::new(from, to)
            } else {
                Selection::new(to, from)
            };
        })
    }

    // Links

    pub fn set_link(&mut self, href: &str) -> bool {
        let href = href.trim();
        if href.is_empty() {
            return self.unset_link();
        }
        self.toggle_mark(Mark::link(href), true, "Link")
    }

    pub fn unset_link(&mut self) -> bool {
        self.toggle_mark(Mark::link(""), false, "Remove link")
    }

    // Bookmarks and comments

    pub fn add_bookmark(&mut self, color: &str) -> Option<String> {
        self.add_annotation(MarkType::Bookmark, color)
    }

    pub fn add_comment(&mut self, color: &str) -> Option<String> {
        self.add_annotation(MarkType::Comment, color)
    }

    /// Marks the selection with a fresh annotation id, replacing any
    /// highlight. Returns the id once the mark is applied.
    fn add_annotation(&mut self, mark_type: MarkType, color: &str) -> Option<String> {
        let selection = self.engine_for(mark_type.name())?.selection();
        if selection.is_empty() {
            log::debug!("Not adding {}: selection is empty", mark_type.name());
            return None;
        }
        let (from, to) = (selection.from(), selection.to());

        let annotations = &self.config.annotations;
        let highlighted = match mark_type {
            MarkType::Bookmark => annotations.bookmarks_highlighted,
            _ => annotations.comments_highlighted,
        };
        let color = if highlighted {
            color.to_string()
        } else {
            annotations.neutral_color.clone()
        };

        let id = Uuid::new_v4().to_string();
        let mark = Mark::annotation(mark_type, id.clone(), color)?;
        let text = self.document()?.text_between(from, to, "\n");

        let label = format!("Add {}", mark_type.name());
        let changed = self.commit(HistoryCategory::CustomStyle, &label, move |doc, _| {
            doc.remove_mark(from, to, MarkType::Highlight);
            doc.add_mark(from, to, &mark);
        });
        if !changed {
            return None;
        }

        let event = match mark_type {
            MarkType::Bookmark => SessionEvent::BookmarkCreated { id: id.clone(), text },
            _ => SessionEvent::CommentCreated { id: id.clone(), text },
        };
        self.emit(event);
        log::debug!("Added {} {}", mark_type.name(), id);
        Some(id)
    }

    pub fn unset_bookmark(&mut self) -> bool {
        self.unset_annotation(MarkType::Bookmark)
    }

    pub fn unset_comment(&mut self) -> bool {
        self.unset_annotation(MarkType::Comment)
    }

    /// Removes annotations of `mark_type` from the selection only.
    fn unset_annotation(&mut self, mark_type: MarkType) -> bool {
        let label = format!("Remove {}", mark_type.name());
        self.commit(HistoryCategory::CustomStyle, &label, |doc, selection| {
            doc.remove_mark(selection.from(), selection.to(), mark_type);
        })
    }

    pub fn delete_bookmarks(&mut self, ids: &[String]) -> bool {
        self.delete_marks(ids, MarkType::Bookmark)
    }

    pub fn delete_comments(&mut self, ids: &[String]) -> bool {
        self.delete_marks(ids, MarkType::Comment)
    }

    pub fn scroll_to_bookmark(&mut self, id: &str) -> bool {
        self.scroll_to_mark(id, MarkType::Bookmark)
    }

    pub fn scroll_to_comment(&mut self, id: &str) -> bool {
        self.scroll_to_mark(id, MarkType::Comment)
    }

    // Content

    /// Replaces the selection with `text`; line breaks start new paragraphs.
    pub fn insert_text(&mut self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        let text = text.replace("\r\n", "\n");
        self.commit(HistoryCategory::Content, "Insert text", move |doc, selection| {
            let pos = doc.delete_range(selection.from(), selection.to());
            let end = if text.contains('\n') {
                let paragraphs = text
                    .split('\n')
                    .map(|line| {
                        Node::paragraph(if line.is_empty() {
                            Vec::new()
                        } else {
                            vec![Node::text(line)]
                        })
                    })
                    .collect();
                doc.insert_fragment(pos, paragraphs)
            } else {
                let marks = doc.marks_at(pos);
                doc.insert_text(pos, &text, marks)
            };
            *selection = Selection::caret(end);
        })
    }

    pub fn insert_html(&mut self, html: &str) -> bool {
        self.insert_content(from_html(html))
    }

    pub fn insert_content(&mut self, nodes: Vec<Node>) -> bool {
        if nodes.is_empty() {
            return false;
        }
        self.commit(HistoryCategory::Content, "Insert content", move |doc, selection| {
            let pos = doc.delete_range(selection.from(), selection.to());
            let end = doc.insert_fragment(pos, nodes);
            *selection = Selection::caret(end);
        })
    }

    pub fn delete_selection(&mut self) -> bool {
        self.commit(HistoryCategory::Content, "Delete", |doc, selection| {
            let caret = doc.delete_range(selection.from(), selection.to());
            *selection = Selection::caret(caret);
        })
    }

    pub fn set_json(&mut self, json: &str) -> anyhow::Result<bool> {
        let document = Document::from_json(json)?;
        Ok(self.set_document(document))
    }

    /// Replaces the whole document as one undoable step.
    pub fn set_document(&mut self, document: Document) -> bool {
        self.commit(HistoryCategory::Content, "Set content", move |doc, selection| {
            *doc = document;
            *selection = Selection::caret(1);
        })
    }

    pub fn get_json(&self) -> Option<serde_json::Value> {
        self.document().map(Document::to_value)
    }

    pub fn get_html(&self) -> Option<String> {
        self.document().map(|doc| to_html(&doc.content))
    }

    // Selection

    fn selected_fragment(&self) -> Vec<Node> {
        match (self.document(), self.selection()) {
            (Some(doc), Some(selection)) => doc.slice(selection.from(), selection.to()),
            _ => Vec::new(),
        }
    }

    pub fn selected_text(&self) -> String {
        match (self.document(), self.selection()) {
            (Some(doc), Some(selection)) => doc.text_between(selection.from(), selection.to(), "\n"),
            _ => String::new(),
        }
    }

    pub fn selected_content_json(&self) -> serde_json::Value {
        serde_json::to_value(self.selected_fragment()).unwrap_or_default()
    }

    pub fn selected_content_string(&self) -> String {
        serde_json::to_string(&self.selected_fragment()).unwrap_or_default()
    }

    /// Inline HTML when the selection stays inside one block, block HTML
    /// otherwise.
    pub fn selected_inner_html(&self) -> String {
        match self.selected_fragment().as_slice() {
            [block] if block.is_textblock() => inner_html(block),
            fragment => to_html(fragment),
        }
    }

    pub fn selected_html(&self) -> String {
        to_html(&self.selected_fragment())
    }

    pub fn set_selection(&mut self, anchor: usize, head: usize) {
        let Some(engine) = self.engine_for("set selection") else {
            return;
        };
        engine.set_selection(Selection::new(anchor, head));
        self.on_selection_change();
    }

    pub fn select_all(&mut self) {
        let size = self.document().map_or(0, Document::content_size);
        self.set_selection(0, size);
    }

    // Settings

    pub fn set_show_non_printing_characters(&mut self, show: bool) {
        self.show_non_printing = show;
        self.on_selection_change();
    }

    /// Applies new bookmark/comment highlighting settings and recolors
    /// existing annotations to match.
    pub fn set_annotation_highlighting(&mut self, annotations: AnnotationConfig) -> bool {
        if annotations == self.config.annotations {
            return false;
        }
        self.config.annotations = annotations;
        let changed = self.recolor_annotations();
        self.on_selection_change();
        changed
    }
}
