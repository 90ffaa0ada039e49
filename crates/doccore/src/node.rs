use serde::{Deserialize, Serialize};

use crate::mark::Mark;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

/// Formatting attributes shared by paragraphs and headings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockAttrs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_align: Option<Alignment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_before: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_after: Option<f32>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub indent: u8,
}

fn is_zero(value: &u8) -> bool {
    *value == 0
}

fn default_start() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAttrs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_style: Option<String>,
    #[serde(default = "default_start")]
    pub start: u32,
}

impl Default for ListAttrs {
    fn default() -> Self {
        Self {
            list_style: None,
            start: default_start(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionAttrs {
    pub section_type: String,
}

/// The two list families a block can be converted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ListKind {
    Bullet,
    Order,
}

/// A node of the document tree. Text runs are leaves carrying marks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Node {
    Paragraph {
        #[serde(default)]
        attrs: BlockAttrs,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        content: Vec<Node>,
    },
    Heading {
        level: u8,
        #[serde(default)]
        attrs: BlockAttrs,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        content: Vec<Node>,
    },
    CodeBlock {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        content: Vec<Node>,
    },
    BulletList {
        #[serde(default)]
        attrs: ListAttrs,
        #[serde(default)]
        content: Vec<Node>,
    },
    OrderedList {
        #[serde(default)]
        attrs: ListAttrs,
        #[serde(default)]
        content: Vec<Node>,
    },
    ListItem {
        #[serde(default)]
        content: Vec<Node>,
    },
    Blockquote {
        #[serde(default)]
        content: Vec<Node>,
    },
    SectionDivider {
        attrs: SectionAttrs,
    },
    HardBreak,
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        marks: Vec<Mark>,
    },
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text {
            text: text.into(),
            marks: Vec::new(),
        }
    }

    pub fn styled_text(text: impl Into<String>, mut marks: Vec<Mark>) -> Self {
        crate::mark::sort_marks(&mut marks);
        Node::Text {
            text: text.into(),
            marks,
        }
    }

    pub fn paragraph(content: Vec<Node>) -> Self {
        Node::Paragraph {
            attrs: BlockAttrs::default(),
            content,
        }
    }

    pub fn heading(level: u8, content: Vec<Node>) -> Self {
        Node::Heading {
            level,
            attrs: BlockAttrs::default(),
            content,
        }
    }

    pub fn list_item(content: Vec<Node>) -> Self {
        Node::ListItem { content }
    }

    pub fn list(kind: ListKind, attrs: ListAttrs, items: Vec<Node>) -> Self {
        match kind {
            ListKind::Bullet => Node::BulletList {
                attrs,
                content: items,
            },
            ListKind::Order => Node::OrderedList {
                attrs,
                content: items,
            },
        }
    }

    pub fn blockquote(content: Vec<Node>) -> Self {
        Node::Blockquote { content }
    }

    pub fn section_divider(section_type: impl Into<String>) -> Self {
        Node::SectionDivider {
            attrs: SectionAttrs {
                section_type: section_type.into(),
            },
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Node::Paragraph { .. } => "paragraph",
            Node::Heading { .. } => "heading",
            Node::CodeBlock { .. } => "codeBlock",
            Node::BulletList { .. } => "bulletList",
            Node::OrderedList { .. } => "orderedList",
            Node::ListItem { .. } => "listItem",
            Node::Blockquote { .. } => "blockquote",
            Node::SectionDivider { .. } => "sectionDivider",
            Node::HardBreak => "hardBreak",
            Node::Text { .. } => "text",
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text { .. })
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, Node::Text { .. } | Node::HardBreak)
    }

    /// Leaves occupy positions but have no content of their own.
    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            Node::Text { .. } | Node::HardBreak | Node::SectionDivider { .. }
        )
    }

    /// Blocks whose children are inline content.
    pub fn is_textblock(&self) -> bool {
        matches!(
            self,
            Node::Paragraph { .. } | Node::Heading { .. } | Node::CodeBlock { .. }
        )
    }

    pub fn is_list(&self) -> bool {
        self.list_kind().is_some()
    }

    pub fn list_kind(&self) -> Option<ListKind> {
        match self {
            Node::BulletList { .. } => Some(ListKind::Bullet),
            Node::OrderedList { .. } => Some(ListKind::Order),
            _ => None,
        }
    }

    pub fn list_attrs(&self) -> Option<&ListAttrs> {
        match self {
            Node::BulletList { attrs, .. } | Node::OrderedList { attrs, .. } => Some(attrs),
            _ => None,
        }
    }

    pub fn list_attrs_mut(&mut self) -> Option<&mut ListAttrs> {
        match self {
            Node::BulletList { attrs, .. } | Node::OrderedList { attrs, .. } => Some(attrs),
            _ => None,
        }
    }

    pub fn block_attrs(&self) -> Option<&BlockAttrs> {
        match self {
            Node::Paragraph { attrs, .. } | Node::Heading { attrs, .. } => Some(attrs),
            _ => None,
        }
    }

    pub fn block_attrs_mut(&mut self) -> Option<&mut BlockAttrs> {
        match self {
            Node::Paragraph { attrs, .. } | Node::Heading { attrs, .. } => Some(attrs),
            _ => None,
        }
    }

    pub fn heading_level(&self) -> Option<u8> {
        match self {
            Node::Heading { level, .. } => Some(*level),
            _ => None,
        }
    }

    pub fn content(&self) -> &[Node] {
        match self {
            Node::Paragraph { content, .. }
            | Node::Heading { content, .. }
            | Node::CodeBlock { content }
            | Node::BulletList { content, .. }
            | Node::OrderedList { content, .. }
            | Node::ListItem { content }
            | Node::Blockquote { content } => content,
            Node::SectionDivider { .. } | Node::HardBreak | Node::Text { .. } => &[],
        }
    }

    pub fn content_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Paragraph { content, .. }
            | Node::Heading { content, .. }
            | Node::CodeBlock { content }
            | Node::BulletList { content, .. }
            | Node::OrderedList { content, .. }
            | Node::ListItem { content }
            | Node::Blockquote { content } => Some(content),
            Node::SectionDivider { .. } | Node::HardBreak | Node::Text { .. } => None,
        }
    }

    pub fn into_content(self) -> Vec<Node> {
        match self {
            Node::Paragraph { content, .. }
            | Node::Heading { content, .. }
            | Node::CodeBlock { content }
            | Node::BulletList { content, .. }
            | Node::OrderedList { content, .. }
            | Node::ListItem { content }
            | Node::Blockquote { content } => content,
            Node::SectionDivider { .. } | Node::HardBreak | Node::Text { .. } => Vec::new(),
        }
    }

    /// Text and marks of a text run.
    pub fn as_text(&self) -> Option<(&str, &[Mark])> {
        match self {
            Node::Text { text, marks } => Some((text, marks)),
            _ => None,
        }
    }

    pub fn marks(&self) -> &[Mark] {
        match self {
            Node::Text { marks, .. } => marks,
            _ => &[],
        }
    }

    /// Number of positions the node occupies in its parent.
    pub fn node_size(&self) -> usize {
        match self {
            Node::Text { text, .. } => text.chars().count(),
            Node::HardBreak | Node::SectionDivider { .. } => 1,
            _ => self.content_size() + 2,
        }
    }

    pub fn content_size(&self) -> usize {
        self.content().iter().map(Node::node_size).sum()
    }

    /// Concatenated text of all descendant runs; hard breaks become newlines.
    pub fn text_content(&self) -> String {
        match self {
            Node::Text { text, .. } => text.clone(),
            Node::HardBreak => "\n".to_string(),
            _ => self.content().iter().map(Node::text_content).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_sizes() {
        let paragraph = Node::paragraph(vec![Node::text("Héllo"), Node::HardBreak]);
        assert_eq!(paragraph.content_size(), 6);
        assert_eq!(paragraph.node_size(), 8);

        let list = Node::list(
            ListKind::Bullet,
            ListAttrs::default(),
            vec![Node::list_item(vec![paragraph.clone()])],
        );
        assert_eq!(list.node_size(), 12);
        assert_eq!(Node::section_divider("notes").node_size(), 1);
    }

    #[test]
    fn test_node_json_shape() {
        let heading = Node::heading(2, vec![Node::text("Intro")]);
        let json = serde_json::to_value(&heading).unwrap();
        assert_eq!(json["type"], "heading");
        assert_eq!(json["level"], 2);
        assert_eq!(json["content"][0]["text"], "Intro");

        let parsed: Node = serde_json::from_str(
            r#"{"type":"orderedList","content":[{"type":"listItem","content":[{"type":"paragraph"}]}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.list_attrs().map(|attrs| attrs.start), Some(1));
        assert_eq!(parsed.list_kind(), Some(ListKind::Order));
    }
}
