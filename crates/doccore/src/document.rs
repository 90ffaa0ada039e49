//! Document root, position addressing and read-only traversal.
//!
//! Positions follow the tree-token scheme: each character occupies one
//! position, every non-leaf node adds an opening and a closing token, and
//! leaf nodes (`hardBreak`, `sectionDivider`) occupy one position. Valid
//! document positions are `0..=content_size()`.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::mark::Mark;
use crate::node::Node;

/// Root of the tree. Serialized as `{"type":"doc","content":[...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "doc")]
pub struct Document {
    #[serde(default)]
    pub content: Vec<Node>,
}

/// A node located by its index path from the root and its start position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    pub path: Vec<usize>,
    pub pos: usize,
}

impl Located {
    /// First position inside the node's content.
    pub fn content_start(&self) -> usize {
        self.pos + 1
    }
}

/// A text run clipped to a queried range.
#[derive(Debug, Clone)]
pub struct TextSpan<'a> {
    pub start: usize,
    pub end: usize,
    pub text: &'a str,
    pub marks: &'a [Mark],
    pub block: &'a Node,
    pub block_pos: usize,
}

/// A position expressed as an offset inside the n-th textblock.
///
/// Structure-only edits (wrapping, unwrapping, retyping blocks) keep text
/// points valid even though absolute positions shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextPoint {
    pub block: usize,
    pub offset: usize,
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

impl Document {
    pub fn new(content: Vec<Node>) -> Self {
        let mut doc = Self { content };
        doc.ensure_not_empty();
        doc
    }

    /// A document holding one empty paragraph.
    pub fn empty() -> Self {
        Self {
            content: vec![Node::paragraph(Vec::new())],
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let doc: Self = serde_json::from_str(json)?;
        Ok(Self::new(doc.content))
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let doc: Self = serde_json::from_value(value)?;
        Ok(Self::new(doc.content))
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    pub fn content_size(&self) -> usize {
        self.content.iter().map(Node::node_size).sum()
    }

    pub(crate) fn ensure_not_empty(&mut self) {
        if self.content.is_empty() {
            self.content.push(Node::paragraph(Vec::new()));
        }
    }

    /// Calls `f` for every node overlapping `from..to` with its absolute
    /// position and index path. Returning `false` skips the node's children.
    pub fn nodes_between<'a, F>(&'a self, from: usize, to: usize, mut f: F)
    where
        F: FnMut(&'a Node, usize, &[usize]) -> bool,
    {
        let mut path = Vec::new();
        walk_between(&self.content, from, to, 0, &mut path, &mut f);
    }

    pub fn descendants<'a, F>(&'a self, f: F)
    where
        F: FnMut(&'a Node, usize, &[usize]) -> bool,
    {
        self.nodes_between(0, self.content_size(), f);
    }

    pub fn node_at(&self, path: &[usize]) -> Option<&Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.content.get(*first)?;
        for index in rest {
            node = node.content().get(*index)?;
        }
        Some(node)
    }

    pub fn node_at_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.content.get_mut(*first)?;
        for index in rest {
            node = node.content_mut()?.get_mut(*index)?;
        }
        Some(node)
    }

    /// Children of the node at `parent` (the root's content for an empty path).
    pub fn children_at(&self, parent: &[usize]) -> Option<&[Node]> {
        if parent.is_empty() {
            return Some(&self.content);
        }
        self.node_at(parent).map(Node::content)
    }

    pub fn children_at_mut(&mut self, parent: &[usize]) -> Option<&mut Vec<Node>> {
        if parent.is_empty() {
            return Some(&mut self.content);
        }
        self.node_at_mut(parent)?.content_mut()
    }

    /// Start position of the node at `path`.
    pub fn pos_of_path(&self, path: &[usize]) -> Option<usize> {
        let mut nodes: &[Node] = &self.content;
        let mut pos = 0;
        for (depth, index) in path.iter().enumerate() {
            if *index >= nodes.len() {
                return None;
            }
            pos += nodes[..*index].iter().map(Node::node_size).sum::<usize>();
            if depth + 1 < path.len() {
                pos += 1;
                nodes = nodes[*index].content();
            }
        }
        Some(pos)
    }

    /// Non-leaf nodes whose content contains `pos`, outermost first.
    pub fn ancestors_at(&self, pos: usize) -> Vec<Located> {
        let mut result = Vec::new();
        let mut path = Vec::new();
        let mut nodes: &[Node] = &self.content;
        let mut base = 0;

        loop {
            let mut offset = base;
            let mut found = None;
            for (index, child) in nodes.iter().enumerate() {
                if offset > pos {
                    break;
                }
                let end = offset + child.node_size();
                if !child.is_leaf() && offset < pos && pos < end {
                    found = Some((index, offset));
                    break;
                }
                offset = end;
            }

            let Some((index, start)) = found else {
                break;
            };
            path.push(index);
            result.push(Located {
                path: path.clone(),
                pos: start,
            });
            nodes = nodes[index].content();
            base = start + 1;
        }

        result
    }

    /// The textblock whose content contains `pos`.
    pub fn textblock_at(&self, pos: usize) -> Option<Located> {
        self.ancestors_at(pos)
            .into_iter()
            .rev()
            .find(|located| self.node_at(&located.path).is_some_and(Node::is_textblock))
    }

    /// The textblock at `pos`, or the closest one after it, or the last one.
    pub fn textblock_near(&self, pos: usize) -> Option<Located> {
        if let Some(block) = self.textblock_at(pos) {
            return Some(block);
        }
        let blocks = self.textblocks();
        blocks
            .iter()
            .find(|block| block.pos >= pos)
            .or_else(|| blocks.last())
            .cloned()
    }

    /// Every textblock in document order.
    pub fn textblocks(&self) -> Vec<Located> {
        let mut blocks = Vec::new();
        self.descendants(|node, pos, path| {
            if node.is_textblock() {
                blocks.push(Located {
                    path: path.to_vec(),
                    pos,
                });
                return false;
            }
            true
        });
        blocks
    }

    /// Textblocks touched by the range; a caret yields the block around it.
    pub fn textblocks_between(&self, from: usize, to: usize) -> Vec<Located> {
        if from >= to {
            return self.textblock_near(from).into_iter().collect();
        }
        let mut blocks = Vec::new();
        self.nodes_between(from, to, |node, pos, path| {
            if node.is_textblock() {
                blocks.push(Located {
                    path: path.to_vec(),
                    pos,
                });
                return false;
            }
            true
        });
        blocks
    }

    /// Text runs overlapping `from..to`, clipped to the range.
    pub fn text_spans(&self, from: usize, to: usize) -> Vec<TextSpan<'_>> {
        let mut spans = Vec::new();
        let mut current_block: Option<(&Node, usize)> = None;
        self.nodes_between(from, to, |node, pos, _| {
            match node {
                Node::Text { text, marks } => {
                    let len = text.chars().count();
                    let start = from.max(pos);
                    let end = to.min(pos + len);
                    if start < end {
                        if let Some((block, block_pos)) = current_block {
                            spans.push(TextSpan {
                                start,
                                end,
                                text: char_slice(text, start - pos, end - pos),
                                marks,
                                block,
                                block_pos,
                            });
                        }
                    }
                }
                block if block.is_textblock() => current_block = Some((block, pos)),
                _ => {}
            }
            true
        });
        spans
    }

    /// Plain text of the range; `block_separator` goes between textblocks.
    pub fn text_between(&self, from: usize, to: usize, block_separator: &str) -> String {
        let mut out = String::new();
        let mut separated = true;
        self.nodes_between(from, to, |node, pos, _| {
            match node {
                Node::Text { text, .. } => {
                    let len = text.chars().count();
                    let start = from.max(pos) - pos;
                    let end = to.min(pos + len) - pos;
                    if start < end {
                        out.push_str(char_slice(text, start, end));
                        separated = false;
                    }
                }
                Node::HardBreak => {
                    out.push('\n');
                    separated = false;
                }
                block if block.is_textblock() && !separated => {
                    out.push_str(block_separator);
                    separated = true;
                }
                _ => {}
            }
            true
        });
        out
    }

    pub fn plain_text(&self) -> String {
        self.text_between(0, self.content_size(), "\n")
    }

    /// Marks a caret at `pos` would inherit: those of the run before it, or
    /// of the first run when the caret sits at the start of its block.
    pub fn marks_at(&self, pos: usize) -> Vec<Mark> {
        let Some(block) = self.textblock_at(pos) else {
            return Vec::new();
        };
        let Some(node) = self.node_at(&block.path) else {
            return Vec::new();
        };
        let offset = pos - block.content_start();
        let children = node.content();
        if offset == 0 {
            return children.first().map(|child| child.marks().to_vec()).unwrap_or_default();
        }
        let mut start = 0;
        for child in children {
            let end = start + child.node_size();
            if start < offset && offset <= end {
                return child.marks().to_vec();
            }
            start = end;
        }
        Vec::new()
    }

    pub fn text_point(&self, pos: usize) -> Option<TextPoint> {
        let blocks = self.textblocks();
        for (ordinal, located) in blocks.iter().enumerate() {
            let size = self.node_at(&located.path).map_or(0, Node::content_size);
            let start = located.content_start();
            if pos < start {
                return Some(TextPoint {
                    block: ordinal,
                    offset: 0,
                });
            }
            if pos <= start + size {
                return Some(TextPoint {
                    block: ordinal,
                    offset: pos - start,
                });
            }
        }
        let last = blocks.len().checked_sub(1)?;
        let size = self.node_at(&blocks[last].path).map_or(0, Node::content_size);
        Some(TextPoint {
            block: last,
            offset: size,
        })
    }

    /// Absolute position of a text point, clamped to the document.
    pub fn pos_of_text_point(&self, point: TextPoint) -> usize {
        let blocks = self.textblocks();
        match blocks.get(point.block).or_else(|| blocks.last()) {
            Some(located) => {
                let size = self.node_at(&located.path).map_or(0, Node::content_size);
                located.content_start() + point.offset.min(size)
            }
            None => 0,
        }
    }

    /// Last number of the closest ordered list that ends at or before `pos`.
    pub fn previous_ordered_list_end(&self, pos: usize) -> Option<u32> {
        let mut found: Option<(usize, u32)> = None;
        self.descendants(|node, start, _| {
            if let Node::OrderedList { attrs, content } = node {
                let end = start + node.node_size();
                if end <= pos && found.map_or(true, |(best, _)| end > best) {
                    let count = u32::try_from(content.len()).unwrap_or(u32::MAX);
                    found = Some((end, attrs.start.saturating_add(count.saturating_sub(1))));
                }
            }
            start < pos
        });
        found.map(|(_, last)| last)
    }

    /// Structure-preserving copy of the nodes overlapping `from..to`.
    pub fn slice(&self, from: usize, to: usize) -> Vec<Node> {
        if from >= to {
            return Vec::new();
        }
        clip(&self.content, 0, from, to)
    }
}

fn walk_between<'a, F>(
    nodes: &'a [Node],
    from: usize,
    to: usize,
    base: usize,
    path: &mut Vec<usize>,
    f: &mut F,
) where
    F: FnMut(&'a Node, usize, &[usize]) -> bool,
{
    let mut pos = 0;
    for (index, child) in nodes.iter().enumerate() {
        if pos >= to {
            break;
        }
        let end = pos + child.node_size();
        if end > from {
            path.push(index);
            let descend = f(child, base + pos, path);
            let size = child.content_size();
            if descend && !child.is_leaf() && size > 0 {
                let start = pos + 1;
                walk_between(
                    child.content(),
                    from.saturating_sub(start),
                    to.saturating_sub(start).min(size),
                    base + start,
                    path,
                    f,
                );
            }
            path.pop();
        }
        pos = end;
    }
}

fn clip(nodes: &[Node], base: usize, from: usize, to: usize) -> Vec<Node> {
    let mut out = Vec::new();
    let mut pos = base;
    for node in nodes {
        let end = pos + node.node_size();
        if end > from && pos < to {
            match node {
                Node::Text { text, marks } => {
                    let start = from.max(pos) - pos;
                    let stop = to.min(end) - pos;
                    if start < stop {
                        out.push(Node::Text {
                            text: char_slice(text, start, stop).to_string(),
                            marks: marks.clone(),
                        });
                    }
                }
                leaf if leaf.is_leaf() => out.push(leaf.clone()),
                container => {
                    let inner = clip(container.content(), pos + 1, from, to);
                    let fully_inside = pos >= from && end <= to;
                    if !inner.is_empty() || fully_inside {
                        let mut copy = container.clone();
                        if let Some(content) = copy.content_mut() {
                            *content = inner;
                        }
                        out.push(copy);
                    }
                }
            }
        }
        pos = end;
    }
    out
}

/// Slices `text` by character offsets.
pub fn char_slice(text: &str, start: usize, end: usize) -> &str {
    let byte_at = |chars: usize| {
        text.char_indices()
            .nth(chars)
            .map_or(text.len(), |(index, _)| index)
    };
    let start_byte = byte_at(start);
    let end_byte = byte_at(end).max(start_byte);
    &text[start_byte..end_byte]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mark::Mark;
    use crate::node::{ListAttrs, ListKind};

    // <p>Hello World</p><ul><li><p>Item</p></li></ul><hr><h1>End</h1>
    fn sample() -> Document {
        Document::new(vec![
            Node::paragraph(vec![
                Node::text("Hello "),
                Node::styled_text("World", vec![Mark::Bold]),
            ]),
            Node::list(
                ListKind::Bullet,
                ListAttrs::default(),
                vec![Node::list_item(vec![Node::paragraph(vec![Node::text("Item")])])],
            ),
            Node::section_divider("notes"),
            Node::heading(1, vec![Node::text("End")]),
        ])
    }

    #[test]
    fn test_content_size_and_paths() {
        let doc = sample();
        // paragraph 13, list 10, divider 1, heading 5
        assert_eq!(doc.content_size(), 29);
        assert_eq!(doc.pos_of_path(&[1]), Some(13));
        assert_eq!(doc.pos_of_path(&[1, 0, 0]), Some(15));
        assert_eq!(doc.pos_of_path(&[3]), Some(24));
        assert_eq!(doc.node_at(&[1, 0, 0]).map(Node::text_content), Some("Item".to_string()));
    }

    #[test]
    fn test_textblock_resolution() {
        let doc = sample();
        let block = doc.textblock_at(17).unwrap();
        assert_eq!(block.path, vec![1, 0, 0]);
        assert_eq!(block.pos, 15);
        assert!(doc.textblock_at(23).is_none());
        assert_eq!(doc.textblock_near(23).unwrap().path, vec![3]);
    }

    #[test]
    fn test_text_between_uses_separator() {
        let doc = sample();
        assert_eq!(doc.text_between(1, 12, "\n"), "Hello World");
        assert_eq!(doc.text_between(7, 20, "|"), "World|Item");
        assert_eq!(doc.plain_text(), "Hello World\nItem\nEnd");
    }

    #[test]
    fn test_text_spans_clip_to_range() {
        let doc = sample();
        let spans = doc.text_spans(4, 9);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].text, "lo ");
        assert_eq!(spans[1].text, "Wo");
        assert_eq!(spans[1].marks, &[Mark::Bold]);
        assert_eq!(spans[1].block_pos, 0);
    }

    #[test]
    fn test_visited_nodes_outlive_the_walk() {
        let doc = sample();
        let mut headings: Vec<&Node> = Vec::new();
        doc.descendants(|node, _, _| {
            if node.heading_level().is_some() {
                headings.push(node);
            }
            true
        });
        assert_eq!(headings.len(), 1);
        assert_eq!(headings[0].text_content(), "End");

        let spans = doc.text_spans(16, 26);
        assert_eq!(spans[0].block.text_content(), "Item");
        assert_eq!(spans[1].block.heading_level(), Some(1));
    }

    #[test]
    fn test_marks_at_prefers_run_before_caret() {
        let doc = sample();
        assert!(doc.marks_at(7).is_empty());
        assert_eq!(doc.marks_at(8), vec![Mark::Bold]);
        assert_eq!(doc.marks_at(12), vec![Mark::Bold]);
    }

    #[test]
    fn test_text_points_round_trip() {
        let doc = sample();
        let point = doc.text_point(17).unwrap();
        assert_eq!(point, TextPoint { block: 1, offset: 1 });
        assert_eq!(doc.pos_of_text_point(point), 17);
    }

    #[test]
    fn test_slice_keeps_structure() {
        let doc = sample();
        let slice = doc.slice(7, 18);
        assert_eq!(slice.len(), 2);
        assert_eq!(slice[0].text_content(), "World");
        assert!(slice[1].is_list());
        assert_eq!(slice[1].text_content(), "It");
    }

    #[test]
    fn test_previous_ordered_list_end() {
        let item = |text: &str| Node::list_item(vec![Node::paragraph(vec![Node::text(text)])]);
        let numbered = ListAttrs {
            list_style: None,
            start: 3,
        };
        let doc = Document::new(vec![
            Node::list(ListKind::Order, numbered, vec![item("A"), item("B")]),
            Node::paragraph(vec![Node::text("x")]),
            Node::list(ListKind::Order, ListAttrs::default(), vec![item("C")]),
        ]);
        // first list spans 0..12, the paragraph 12..15
        assert_eq!(doc.previous_ordered_list_end(15), Some(4));
        assert_eq!(doc.previous_ordered_list_end(5), None);
    }

    #[test]
    fn test_char_slice_handles_multibyte() {
        assert_eq!(char_slice("Grüße", 2, 4), "üß");
        assert_eq!(char_slice("abc", 2, 10), "c");
    }
}
