use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::mark::{FontVariant, Mark, TextStyleAttrs};
use crate::node::{Alignment, BlockAttrs, Node};

/// Serializes a sequence of nodes to HTML.
pub fn to_html(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(&mut out, node);
    }
    out
}

/// HTML of a textblock's inline content, without the block element itself.
pub fn inner_html(block: &Node) -> String {
    let mut out = String::new();
    for child in block.content() {
        write_node(&mut out, child);
    }
    out
}

fn write_node(out: &mut String, node: &Node) {
    match node {
        Node::Paragraph { attrs, content } => {
            out.push_str("<p");
            write_block_attrs(out, attrs);
            out.push('>');
            content.iter().for_each(|child| write_node(out, child));
            out.push_str("</p>");
        }
        Node::Heading {
            level,
            attrs,
            content,
        } => {
            let level = (*level).clamp(1, 6);
            out.push_str(&format!("<h{level}"));
            write_block_attrs(out, attrs);
            out.push('>');
            content.iter().for_each(|child| write_node(out, child));
            out.push_str(&format!("</h{level}>"));
        }
        Node::CodeBlock { content } => {
            out.push_str("<pre><code>");
            for child in content {
                match child {
                    Node::Text { text, .. } => out.push_str(&encode_text(text)),
                    Node::HardBreak => out.push('\n'),
                    _ => {}
                }
            }
            out.push_str("</code></pre>");
        }
        Node::BulletList { attrs, content } | Node::OrderedList { attrs, content } => {
            let tag = if matches!(node, Node::BulletList { .. }) {
                "ul"
            } else {
                "ol"
            };
            out.push('<');
            out.push_str(tag);
            if tag == "ol" && attrs.start != 1 {
                out.push_str(&format!(" start=\"{}\"", attrs.start));
            }
            if let Some(style) = &attrs.list_style {
                push_attr(out, "data-list-style", style);
            }
            out.push('>');
            content.iter().for_each(|child| write_node(out, child));
            out.push_str(&format!("</{tag}>"));
        }
        Node::ListItem { content } => {
            out.push_str("<li>");
            content.iter().for_each(|child| write_node(out, child));
            out.push_str("</li>");
        }
        Node::Blockquote { content } => {
            out.push_str("<blockquote>");
            content.iter().for_each(|child| write_node(out, child));
            out.push_str("</blockquote>");
        }
        Node::SectionDivider { attrs } => {
            out.push_str("<hr");
            push_attr(out, "data-section-type", &attrs.section_type);
            out.push('>');
        }
        Node::HardBreak => out.push_str("<br>"),
        Node::Text { text, marks } => {
            for mark in marks {
                open_mark(out, mark);
            }
            out.push_str(&encode_text(text));
            for mark in marks.iter().rev() {
                out.push_str(close_tag(mark));
            }
        }
    }
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&encode_double_quoted_attribute(value));
    out.push('"');
}

fn write_block_attrs(out: &mut String, attrs: &BlockAttrs) {
    let mut style = Vec::new();
    if let Some(align) = attrs.text_align {
        let value = match align {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Justify => "justify",
        };
        style.push(format!("text-align: {value}"));
    }
    if let Some(line_height) = attrs.line_height {
        style.push(format!("line-height: {line_height}"));
    }
    if let Some(before) = attrs.space_before {
        style.push(format!("margin-top: {before}pt"));
    }
    if let Some(after) = attrs.space_after {
        style.push(format!("margin-bottom: {after}pt"));
    }
    if let Some(family) = &attrs.font_family {
        style.push(format!("font-family: {family}"));
    }
    if let Some(size) = attrs.font_size {
        style.push(format!("font-size: {size}pt"));
    }
    if let Some(weight) = attrs.font_weight {
        style.push(format!("font-weight: {weight}"));
    }
    if let Some(color) = &attrs.color {
        style.push(format!("color: {color}"));
    }
    if !style.is_empty() {
        push_attr(out, "style", &style.join("; "));
    }
    if attrs.indent > 0 {
        out.push_str(&format!(" data-indent=\"{}\"", attrs.indent));
    }
}

fn text_style_css(attrs: &TextStyleAttrs) -> String {
    let mut style = Vec::new();
    if let Some(color) = &attrs.color {
        style.push(format!("color: {color}"));
    }
    if let Some(family) = &attrs.font_family {
        style.push(format!("font-family: {family}"));
    }
    if let Some(size) = attrs.font_size {
        style.push(format!("font-size: {size}pt"));
    }
    if let Some(variant) = attrs.font_variant {
        let value = match variant {
            FontVariant::Normal => "normal",
            FontVariant::SmallCaps => "small-caps",
        };
        style.push(format!("font-variant: {value}"));
    }
    if let Some(spacing) = attrs.letter_spacing {
        style.push(format!("letter-spacing: {spacing}pt"));
    }
    if let Some(ligatures) = attrs.ligatures {
        let value = if ligatures { "normal" } else { "none" };
        style.push(format!("font-variant-ligatures: {value}"));
    }
    style.join("; ")
}

fn open_mark(out: &mut String, mark: &Mark) {
    match mark {
        Mark::TextStyle { attrs } => {
            out.push_str("<span");
            push_attr(out, "style", &text_style_css(attrs));
            out.push('>');
        }
        Mark::Bold => out.push_str("<strong>"),
        Mark::Italic => out.push_str("<em>"),
        Mark::Underline => out.push_str("<u>"),
        Mark::Strike => out.push_str("<s>"),
        Mark::Superscript => out.push_str("<sup>"),
        Mark::Subscript => out.push_str("<sub>"),
        Mark::Highlight { attrs } => {
            out.push_str("<mark");
            push_attr(out, "data-color", &attrs.color);
            push_attr(out, "style", &format!("background-color: {}", attrs.color));
            out.push('>');
        }
        Mark::Link { attrs } => {
            out.push_str("<a");
            push_attr(out, "href", &attrs.href);
            out.push('>');
        }
        Mark::Bookmark { attrs } => {
            out.push_str("<span");
            push_attr(out, "data-bookmark-id", &attrs.id);
            push_attr(out, "data-color", &attrs.color);
            out.push('>');
        }
        Mark::Comment { attrs } => {
            out.push_str("<span");
            push_attr(out, "data-comment-id", &attrs.id);
            push_attr(out, "data-color", &attrs.color);
            out.push('>');
        }
    }
}

fn close_tag(mark: &Mark) -> &'static str {
    match mark {
        Mark::TextStyle { .. } | Mark::Bookmark { .. } | Mark::Comment { .. } => "</span>",
        Mark::Bold => "</strong>",
        Mark::Italic => "</em>",
        Mark::Underline => "</u>",
        Mark::Strike => "</s>",
        Mark::Superscript => "</sup>",
        Mark::Subscript => "</sub>",
        Mark::Highlight { .. } => "</mark>",
        Mark::Link { .. } => "</a>",
    }
}
