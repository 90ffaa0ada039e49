//! Parses (sanitized) HTML into document nodes.
//!
//! The importer is a small tag-stream builder rather than a full DOM parser:
//! ammonia has already normalized the markup, so a regex tokenizer over its
//! output is sufficient.

use std::collections::HashMap;

use html_escape::decode_html_entities;
use lazy_static::lazy_static;
use regex::Regex;

use crate::mark::{add_to_set, FontVariant, Mark, TextStyleAttrs};
use crate::node::{Alignment, BlockAttrs, ListAttrs, ListKind, Node};
use crate::sanitize::sanitize_html;
use crate::transform::normalize_inline;

lazy_static! {
    static ref TOKEN: Regex = Regex::new(r"(?s)<(/?)([a-zA-Z][a-zA-Z0-9]*)([^>]*)>|([^<]+)")
        .expect("Invalid TOKEN regex pattern");
    static ref ATTRIBUTE: Regex =
        Regex::new(r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)\s*=\s*"([^"]*)""#)
            .expect("Invalid ATTRIBUTE regex pattern");
}

/// Sanitizes `html` and converts it into a fragment of nodes.
pub fn from_html(html: &str) -> Vec<Node> {
    let clean = sanitize_html(html);
    let mut builder = FragmentBuilder::default();
    for token in TOKEN.captures_iter(&clean) {
        if let Some(text) = token.get(4) {
            builder.text(&decode_html_entities(text.as_str()));
            continue;
        }
        let closing = token.get(1).is_some_and(|m| !m.as_str().is_empty());
        let tag = token
            .get(2)
            .map(|m| m.as_str().to_ascii_lowercase())
            .unwrap_or_default();
        if closing {
            builder.close(&tag);
        } else {
            let attrs = parse_attributes(token.get(3).map_or("", |m| m.as_str()));
            builder.open(&tag, &attrs);
        }
    }
    let nodes = builder.finish();
    log::debug!("Imported {} top-level nodes from {} bytes of HTML", nodes.len(), html.len());
    nodes
}

fn parse_attributes(raw: &str) -> HashMap<String, String> {
    ATTRIBUTE
        .captures_iter(raw)
        .map(|cap| {
            (
                cap[1].to_ascii_lowercase(),
                decode_html_entities(&cap[2]).into_owned(),
            )
        })
        .collect()
}

/// Splits an inline `style` attribute into lowercase property/value pairs.
pub fn parse_style(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim().to_string();
            (!name.is_empty() && !value.is_empty()).then_some((name, value))
        })
        .collect()
}

/// Parses a CSS length into points. Bare numbers are taken as points.
fn parse_points(value: &str) -> Option<f32> {
    let value = value.trim();
    if let Some(px) = value.strip_suffix("px") {
        return px.trim().parse::<f32>().ok().map(|px| px * 0.75);
    }
    value
        .strip_suffix("pt")
        .unwrap_or(value)
        .trim()
        .parse()
        .ok()
}

fn block_attrs_from(attrs: &HashMap<String, String>) -> BlockAttrs {
    let mut block = BlockAttrs::default();
    if let Some(style) = attrs.get("style") {
        for (name, value) in parse_style(style) {
            match name.as_str() {
                "text-align" => {
                    block.text_align = match value.as_str() {
                        "left" => Some(Alignment::Left),
                        "center" => Some(Alignment::Center),
                        "right" => Some(Alignment::Right),
                        "justify" => Some(Alignment::Justify),
                        _ => None,
                    }
                }
                "line-height" => block.line_height = value.parse().ok(),
                "margin-top" => block.space_before = parse_points(&value),
                "margin-bottom" => block.space_after = parse_points(&value),
                "font-family" => block.font_family = Some(unquote(&value)),
                "font-size" => block.font_size = parse_points(&value),
                "font-weight" => block.font_weight = value.parse().ok(),
                "color" => block.color = Some(value),
                _ => {}
            }
        }
    }
    if let Some(indent) = attrs.get("data-indent") {
        block.indent = indent.parse().unwrap_or(0);
    }
    block
}

fn text_style_from(style: &str) -> TextStyleAttrs {
    let mut attrs = TextStyleAttrs::default();
    for (name, value) in parse_style(style) {
        match name.as_str() {
            "color" => attrs.color = Some(value),
            "font-family" => attrs.font_family = Some(unquote(&value)),
            "font-size" => attrs.font_size = parse_points(&value),
            "font-variant" if value == "small-caps" => attrs.font_variant = Some(FontVariant::SmallCaps),
            "letter-spacing" => attrs.letter_spacing = parse_points(&value),
            "font-variant-ligatures" => attrs.ligatures = Some(value != "none"),
            _ => {}
        }
    }
    attrs
}

fn unquote(value: &str) -> String {
    value.trim_matches(|c| c == '"' || c == '\'').to_string()
}

/// Marks an inline element contributes to the text inside it.
fn marks_for(tag: &str, attrs: &HashMap<String, String>) -> Vec<Mark> {
    let mut marks = Vec::new();
    match tag {
        "strong" | "b" => marks.push(Mark::Bold),
        "em" | "i" => marks.push(Mark::Italic),
        "u" => marks.push(Mark::Underline),
        "s" | "strike" | "del" => marks.push(Mark::Strike),
        "sup" => marks.push(Mark::Superscript),
        "sub" => marks.push(Mark::Subscript),
        "a" => {
            if let Some(href) = attrs.get("href") {
                marks.push(Mark::link(href.as_str()));
            }
        }
        "mark" => {
            let color = attrs.get("data-color").cloned().or_else(|| {
                attrs.get("style").and_then(|style| {
                    parse_style(style)
                        .into_iter()
                        .find(|(name, _)| name == "background-color")
                        .map(|(_, value)| value)
                })
            });
            marks.push(Mark::highlight(color.unwrap_or_else(|| "yellow".to_string())));
        }
        _ => {}
    }

    let color = attrs.get("data-color").cloned().unwrap_or_default();
    if let Some(id) = attrs.get("data-bookmark-id") {
        marks.push(Mark::bookmark(id.as_str(), color.as_str()));
    }
    if let Some(id) = attrs.get("data-comment-id") {
        marks.push(Mark::comment(id.as_str(), color.as_str()));
    }
    if tag == "span" {
        if let Some(style) = attrs.get("style") {
            let text_style = text_style_from(style);
            if !text_style.is_empty() {
                marks.push(Mark::text_style(text_style));
            }
        }
    }
    marks
}

struct OpenNode {
    tag: String,
    node: Node,
    implicit: bool,
}

#[derive(Default)]
struct FragmentBuilder {
    root: Vec<Node>,
    stack: Vec<OpenNode>,
    marks: Vec<(String, Vec<Mark>)>,
}

impl FragmentBuilder {
    fn open(&mut self, tag: &str, attrs: &HashMap<String, String>) {
        match tag {
            "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "pre" => {
                self.close_textblocks();
                let block_attrs = block_attrs_from(attrs);
                let node = match tag {
                    "p" => Node::Paragraph {
                        attrs: block_attrs,
                        content: Vec::new(),
                    },
                    "pre" => Node::CodeBlock {
                        content: Vec::new(),
                    },
                    heading => Node::Heading {
                        level: heading[1..].parse().unwrap_or(1),
                        attrs: block_attrs,
                        content: Vec::new(),
                    },
                };
                self.push(tag, node, false);
            }
            "ul" | "ol" => {
                self.close_textblocks();
                let kind = if tag == "ul" {
                    ListKind::Bullet
                } else {
                    ListKind::Order
                };
                let list_attrs = ListAttrs {
                    list_style: attrs.get("data-list-style").cloned(),
                    start: attrs
                        .get("start")
                        .and_then(|start| start.parse().ok())
                        .unwrap_or(1),
                };
                self.push(tag, Node::list(kind, list_attrs, Vec::new()), false);
            }
            "li" => {
                self.close_textblocks();
                if !self.top().is_some_and(Node::is_list) {
                    self.push("ul", Node::list(ListKind::Bullet, ListAttrs::default(), Vec::new()), true);
                }
                self.push(tag, Node::list_item(Vec::new()), false);
            }
            "blockquote" => {
                self.close_textblocks();
                self.push(tag, Node::blockquote(Vec::new()), false);
            }
            "hr" => {
                self.close_textblocks();
                let section_type = attrs
                    .get("data-section-type")
                    .cloned()
                    .unwrap_or_else(|| "default".to_string());
                self.append(Node::section_divider(section_type));
            }
            "br" => {
                self.ensure_textblock();
                self.append(Node::HardBreak);
            }
            "div" | "section" | "article" | "body" | "html" => self.close_textblocks(),
            _ => {
                if !is_void(tag) {
                    self.marks.push((tag.to_string(), marks_for(tag, attrs)));
                }
            }
        }
    }

    fn close(&mut self, tag: &str) {
        match tag {
            "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "pre" | "ul" | "ol" | "li"
            | "blockquote" => self.close_up_to(tag),
            "div" | "section" | "article" | "body" | "html" => self.close_textblocks(),
            _ => {
                if let Some(index) = self.marks.iter().rposition(|(open, _)| open == tag) {
                    self.marks.remove(index);
                }
            }
        }
    }

    fn text(&mut self, text: &str) {
        let in_code = matches!(self.top(), Some(Node::CodeBlock { .. }));
        let in_textblock = self.top().is_some_and(Node::is_textblock);
        if !in_textblock && text.trim().is_empty() {
            return;
        }
        self.ensure_textblock();
        if in_code {
            self.append(Node::text(text));
            return;
        }
        let text = text.replace("\r\n", " ").replace(['\n', '\r'], " ");
        let mut marks = Vec::new();
        for (_, element_marks) in &self.marks {
            for mark in element_marks {
                add_to_set(&mut marks, mark.clone());
            }
        }
        self.append(Node::styled_text(text, marks));
    }

    fn top(&self) -> Option<&Node> {
        self.stack.last().map(|open| &open.node)
    }

    fn push(&mut self, tag: &str, node: Node, implicit: bool) {
        self.stack.push(OpenNode {
            tag: tag.to_string(),
            node,
            implicit,
        });
    }

    fn append(&mut self, node: Node) {
        match self.stack.last_mut().and_then(|open| open.node.content_mut()) {
            Some(content) => content.push(node),
            None => self.root.push(node),
        }
    }

    fn ensure_textblock(&mut self) {
        if self.top().is_some_and(Node::is_textblock) {
            return;
        }
        if self.top().is_some_and(Node::is_list) {
            self.push("li", Node::list_item(Vec::new()), true);
        }
        self.push("p", Node::paragraph(Vec::new()), true);
    }

    fn pop(&mut self) {
        if let Some(open) = self.stack.pop() {
            let mut node = open.node;
            if node.is_textblock() {
                if let Some(content) = node.content_mut() {
                    let inline = std::mem::take(content);
                    *content = normalize_inline(inline);
                }
            }
            self.append(node);
        }
    }

    /// Closes open textblocks (and the implicit list items holding them).
    fn close_textblocks(&mut self) {
        while let Some(open) = self.stack.last() {
            let implicit_item = open.implicit && open.tag == "li";
            if open.node.is_textblock() || implicit_item {
                self.pop();
            } else {
                break;
            }
        }
    }

    fn close_up_to(&mut self, tag: &str) {
        let Some(index) = self.stack.iter().rposition(|open| open.tag == tag && !open.implicit) else {
            return;
        };
        while self.stack.len() > index {
            self.pop();
        }
    }

    fn finish(mut self) -> Vec<Node> {
        while !self.stack.is_empty() {
            self.pop();
        }
        self.root
    }
}

fn is_void(tag: &str) -> bool {
    matches!(tag, "img" | "input" | "meta" | "link" | "col" | "area" | "wbr")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mark::MarkType;

    #[test]
    fn test_inline_marks_stack() {
        let nodes = from_html("<p>plain <strong>bold <em>both</em></strong></p>");
        assert_eq!(nodes.len(), 1);
        let content = nodes[0].content();
        assert_eq!(content[0], Node::text("plain "));
        assert_eq!(content[1], Node::styled_text("bold ", vec![Mark::Bold]));
        assert_eq!(content[2], Node::styled_text("both", vec![Mark::Bold, Mark::Italic]));
    }

    #[test]
    fn test_stray_inline_content_is_wrapped() {
        let nodes = from_html("just <b>text</b>");
        assert_eq!(nodes.len(), 1);
        assert!(matches!(nodes[0], Node::Paragraph { .. }));
        assert_eq!(nodes[0].text_content(), "just text");
    }

    #[test]
    fn test_whitespace_is_preserved() {
        let nodes = from_html("<p>a  b   c</p>");
        assert_eq!(nodes[0].text_content(), "a  b   c");
    }

    #[test]
    fn test_annotation_spans_become_marks() {
        let nodes = from_html(r##"<p><span data-bookmark-id="b1" data-color="#abc">x</span></p>"##);
        let marks = nodes[0].content()[0].marks();
        assert_eq!(marks, &[Mark::bookmark("b1", "#abc")]);
        assert!(marks.iter().all(|m| m.mark_type() == MarkType::Bookmark));
    }

    #[test]
    fn test_lists_and_dividers() {
        let nodes = from_html(
            r#"<ol start="3"><li><p>one</p></li><li>two</li></ol><hr data-section-type="notes">"#,
        );
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].list_attrs().map(|attrs| attrs.start), Some(3));
        assert_eq!(nodes[0].content().len(), 2);
        assert_eq!(nodes[0].content()[1].text_content(), "two");
        assert_eq!(nodes[1], Node::section_divider("notes"));
    }

    #[test]
    fn test_parse_style_and_points() {
        let style = parse_style("font-size: 16px; color: red;");
        assert_eq!(style[0], ("font-size".to_string(), "16px".to_string()));
        assert_eq!(parse_points("16px"), Some(12.0));
        assert_eq!(parse_points("10.5pt"), Some(10.5));
    }
}
