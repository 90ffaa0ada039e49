//! In-place edits on a [`Document`].
//!
//! Inline edits go through [`Document::map_runs`], which splits runs at the
//! range bounds and renormalizes afterwards, so callers only ever see the
//! in-range pieces.

use crate::document::{char_slice, Document, Located};
use crate::mark::{add_to_set, Mark, MarkType, TextStyleAttrs};
use crate::node::Node;

/// The in-range part of one text run, handed to [`Document::map_runs`].
pub struct RunSlice<'a> {
    pub text: &'a mut String,
    pub marks: &'a mut Vec<Mark>,
    /// Text of the same block preceding this piece.
    pub before: &'a str,
}

impl Document {
    /// Calls `f` on every text piece inside `from..to`. A caret touches nothing.
    pub fn map_runs<F>(&mut self, from: usize, to: usize, mut f: F)
    where
        F: FnMut(RunSlice<'_>),
    {
        if from >= to {
            return;
        }
        for block in self.textblocks_between(from, to) {
            let content_start = block.content_start();
            let Some(content) = self.node_at_mut(&block.path).and_then(Node::content_mut) else {
                continue;
            };
            let old = std::mem::take(content);
            let mut rebuilt = Vec::with_capacity(old.len() + 2);
            let mut before = String::new();
            let mut offset = content_start;

            for child in old {
                let (start, end) = (offset, offset + child.node_size());
                offset = end;
                match child {
                    Node::Text { text, marks } if end > from && start < to => {
                        let a = from.max(start) - start;
                        let b = to.min(end) - start;
                        let head = char_slice(&text, 0, a).to_string();
                        let middle = char_slice(&text, a, b).to_string();
                        let tail = char_slice(&text, b, end - start).to_string();

                        if !head.is_empty() {
                            before.push_str(&head);
                            rebuilt.push(Node::Text {
                                text: head,
                                marks: marks.clone(),
                            });
                        }
                        let mut piece = middle.clone();
                        let mut piece_marks = marks.clone();
                        f(RunSlice {
                            text: &mut piece,
                            marks: &mut piece_marks,
                            before: &before,
                        });
                        before.push_str(&middle);
                        rebuilt.push(Node::Text {
                            text: piece,
                            marks: piece_marks,
                        });
                        if !tail.is_empty() {
                            before.push_str(&tail);
                            rebuilt.push(Node::Text { text: tail, marks });
                        }
                    }
                    other => {
                        match &other {
                            Node::Text { text, .. } => before.push_str(text),
                            Node::HardBreak => before.push('\n'),
                            _ => {}
                        }
                        rebuilt.push(other);
                    }
                }
            }
            *content = normalize_inline(rebuilt);
        }
    }

    pub fn add_mark(&mut self, from: usize, to: usize, mark: &Mark) {
        self.map_runs(from, to, |run| add_to_set(run.marks, mark.clone()));
    }

    pub fn remove_mark(&mut self, from: usize, to: usize, mark_type: MarkType) {
        self.map_runs(from, to, |run| {
            run.marks.retain(|mark| mark.mark_type() != mark_type)
        });
    }

    pub fn remove_marks_where<P>(&mut self, from: usize, to: usize, mut predicate: P)
    where
        P: FnMut(&Mark) -> bool,
    {
        self.map_runs(from, to, |run| run.marks.retain(|mark| !predicate(mark)));
    }

    /// Edits the `textStyle` attributes of every run in range. A style left
    /// without attributes is dropped from the run.
    pub fn update_text_style<F>(&mut self, from: usize, to: usize, mut f: F)
    where
        F: FnMut(&mut TextStyleAttrs),
    {
        self.map_runs(from, to, |run| {
            let mut attrs = crate::mark::text_style_of(run.marks)
                .cloned()
                .unwrap_or_default();
            f(&mut attrs);
            run.marks.retain(|mark| mark.mark_type() != MarkType::TextStyle);
            if !attrs.is_empty() {
                add_to_set(run.marks, Mark::text_style(attrs));
            }
        });
    }

    /// Calls `f` on each textblock touched by the range. Returns how many
    /// blocks were visited.
    pub fn update_textblocks<F>(&mut self, from: usize, to: usize, mut f: F) -> usize
    where
        F: FnMut(&mut Node),
    {
        let blocks = self.textblocks_between(from, to);
        for block in &blocks {
            if let Some(node) = self.node_at_mut(&block.path) {
                f(node);
            }
        }
        blocks.len()
    }

    /// Replaces the children `start..=end` of `parent` with `wrap(children)`.
    pub fn wrap_children<F>(&mut self, parent: &[usize], start: usize, end: usize, wrap: F) -> bool
    where
        F: FnOnce(Vec<Node>) -> Node,
    {
        let Some(children) = self.children_at_mut(parent) else {
            return false;
        };
        if start > end || end >= children.len() {
            return false;
        }
        let taken: Vec<Node> = children.drain(start..=end).collect();
        children.insert(start, wrap(taken));
        true
    }

    /// Replaces the node at `path` with the nodes `f` returns.
    pub fn replace_node<F>(&mut self, path: &[usize], f: F) -> bool
    where
        F: FnOnce(Node) -> Vec<Node>,
    {
        let Some((index, parent)) = path.split_last() else {
            return false;
        };
        let Some(children) = self.children_at_mut(parent) else {
            return false;
        };
        if *index >= children.len() {
            return false;
        }
        let node = children.remove(*index);
        for (offset, replacement) in f(node).into_iter().enumerate() {
            children.insert(index + offset, replacement);
        }
        self.ensure_not_empty();
        true
    }

    /// Common parent and inclusive child index range covering the textblocks
    /// in `from..to`.
    pub fn sibling_range(&self, from: usize, to: usize) -> Option<(Vec<usize>, usize, usize)> {
        let blocks = self.textblocks_between(from, to);
        let first = blocks.first()?;
        let last = blocks.last()?;
        let common = common_prefix(&first.path[..first.path.len() - 1], &last.path[..last.path.len() - 1]);
        let depth = common.len();
        Some((common, first.path[depth], last.path[depth]))
    }

    /// Deletes `from..to`, joining the first and last touched textblocks.
    /// Returns the caret position after the deletion.
    pub fn delete_range(&mut self, from: usize, to: usize) -> usize {
        if from >= to {
            return from;
        }
        if from == 0 && to >= self.content_size() {
            self.content = vec![Node::paragraph(Vec::new())];
            return 1;
        }
        let blocks = self.textblocks_between(from, to);
        let (Some(first), Some(last)) = (blocks.first().cloned(), blocks.last().cloned()) else {
            self.remove_contained(from, to, &[]);
            self.prune_empty_containers();
            return from.min(self.content_size());
        };

        if first.path == last.path {
            self.cut_inline(&first, from, to);
            return from;
        }

        let right = self.split_block_content(&last, to).1;
        let left_end = from.max(first.content_start());
        self.truncate_block(&first, left_end);

        let mut doomed = vec![last.path.clone()];
        doomed.extend(self.contained_paths(from, to, &first.path, &last.path));
        doomed.sort();
        doomed.dedup();
        for path in doomed.iter().rev() {
            self.remove_at(path);
        }

        if let Some(content) = self.node_at_mut(&first.path).and_then(Node::content_mut) {
            let mut joined = std::mem::take(content);
            joined.extend(right);
            *content = normalize_inline(joined);
        }
        self.prune_empty_containers();
        left_end
    }

    /// Inserts plain text with the given marks at `pos`. Returns the position
    /// after the inserted text.
    pub fn insert_text(&mut self, pos: usize, text: &str, marks: Vec<Mark>) -> usize {
        if text.is_empty() {
            return pos;
        }
        self.insert_inline(pos, vec![Node::styled_text(text, marks)])
    }

    /// Inserts a parsed fragment at `pos`. Inline content merges into the
    /// surrounding textblock; block content splits it. Returns the caret
    /// position at the end of the inserted content.
    pub fn insert_fragment(&mut self, pos: usize, mut fragment: Vec<Node>) -> usize {
        fragment.retain(|node| !matches!(node, Node::Text { text, .. } if text.is_empty()));
        if fragment.is_empty() {
            return pos;
        }
        if fragment.iter().all(Node::is_inline) {
            return self.insert_inline(pos, fragment);
        }
        if fragment.len() == 1 && fragment[0].is_textblock() {
            let inline = fragment.remove(0).into_content();
            return self.insert_inline(pos, inline);
        }

        let Some(block) = self.textblock_at(pos) else {
            return self.insert_blocks_at_boundary(pos, fragment);
        };
        let (left, right) = self.split_block_content(&block, pos);
        let Some((index, parent)) = block.path.split_last() else {
            return pos;
        };
        let (index, parent) = (*index, parent.to_vec());
        let Some(current) = self.node_at(&block.path).cloned() else {
            return pos;
        };

        let mut nodes = fragment.into_iter();
        let mut inserted: Vec<Node> = Vec::new();
        let mut head = left;
        let mut merged_first = false;
        if let Some(first) = nodes.next() {
            if first.is_textblock() {
                head.extend(first.into_content());
                merged_first = true;
            } else {
                inserted.push(first);
            }
        }
        inserted.extend(nodes);

        let tail_joins_last = inserted.last().is_some_and(Node::is_textblock);
        let right_size: usize = right.iter().map(Node::node_size).sum();
        if tail_joins_last {
            if let Some(content) = inserted.last_mut().and_then(Node::content_mut) {
                content.extend(right);
                let joined = std::mem::take(content);
                *content = normalize_inline(joined);
            }
        } else if !right.is_empty() || merged_first {
            let mut tail_block = current.clone();
            if let Some(content) = tail_block.content_mut() {
                *content = right;
            }
            inserted.push(tail_block);
        }

        let Some(children) = self.children_at_mut(&parent) else {
            return pos;
        };
        if let Some(content) = children.get_mut(index).and_then(Node::content_mut) {
            *content = normalize_inline(head);
        }
        let count = inserted.len();
        for (offset, node) in inserted.into_iter().enumerate() {
            children.insert(index + 1 + offset, node);
        }

        let mut last_path = parent;
        last_path.push(index + count);
        let last_start = self.pos_of_path(&last_path).unwrap_or(pos);
        let last = self.node_at(&last_path);
        match last {
            Some(node) if node.is_textblock() => last_start + 1 + node.content_size() - right_size,
            Some(node) => last_start + node.node_size(),
            None => pos,
        }
    }

    fn insert_inline(&mut self, pos: usize, inline: Vec<Node>) -> usize {
        let size: usize = inline.iter().map(Node::node_size).sum();
        let Some(block) = self.textblock_near(pos) else {
            self.content.push(Node::paragraph(inline));
            return self.content_size() - 1;
        };
        let block_size = self.node_at(&block.path).map_or(0, Node::content_size);
        let pos = pos.clamp(block.content_start(), block.content_start() + block_size);
        let (mut left, right) = self.split_block_content(&block, pos);
        let code = self.node_at(&block.path).is_some_and(|node| matches!(node, Node::CodeBlock { .. }));
        left.extend(inline.into_iter().map(|node| match node {
            Node::Text { text, .. } if code => Node::text(text),
            other => other,
        }));
        left.extend(right);
        if let Some(content) = self.node_at_mut(&block.path).and_then(Node::content_mut) {
            *content = normalize_inline(left);
        }
        pos + size
    }

    fn insert_blocks_at_boundary(&mut self, pos: usize, blocks: Vec<Node>) -> usize {
        let mut offset = 0;
        let mut index = self.content.len();
        for (i, child) in self.content.iter().enumerate() {
            if offset >= pos {
                index = i;
                break;
            }
            offset += child.node_size();
        }
        let start = self.content[..index].iter().map(Node::node_size).sum::<usize>();
        let size: usize = blocks.iter().map(Node::node_size).sum();
        for (i, node) in blocks.into_iter().enumerate() {
            self.content.insert(index + i, node);
        }
        start + size
    }

    /// Splits a textblock's inline content at an absolute position.
    fn split_block_content(&self, block: &Located, pos: usize) -> (Vec<Node>, Vec<Node>) {
        let content = self
            .node_at(&block.path)
            .map(|node| node.content().to_vec())
            .unwrap_or_default();
        split_inline(content, pos.saturating_sub(block.content_start()))
    }

    fn truncate_block(&mut self, block: &Located, pos: usize) {
        let left = self.split_block_content(block, pos).0;
        if let Some(content) = self.node_at_mut(&block.path).and_then(Node::content_mut) {
            *content = left;
        }
    }

    fn cut_inline(&mut self, block: &Located, from: usize, to: usize) {
        let (left, _) = self.split_block_content(block, from);
        let (_, right) = self.split_block_content(block, to);
        if let Some(content) = self.node_at_mut(&block.path).and_then(Node::content_mut) {
            let mut joined = left;
            joined.extend(right);
            *content = normalize_inline(joined);
        }
    }

    /// Top-most nodes lying entirely inside `from..to` that are neither
    /// ancestors of the joined blocks nor the blocks themselves.
    fn contained_paths(&self, from: usize, to: usize, first: &[usize], last: &[usize]) -> Vec<Vec<usize>> {
        let mut paths = Vec::new();
        self.nodes_between(from, to, |node, pos, path| {
            let end = pos + node.node_size();
            let keeps = first.starts_with(path) || last.starts_with(path);
            if !keeps && pos >= from && end <= to {
                paths.push(path.to_vec());
                return false;
            }
            true
        });
        paths
    }

    fn remove_contained(&mut self, from: usize, to: usize, keep: &[usize]) {
        let mut paths = self.contained_paths(from, to, keep, keep);
        paths.sort();
        for path in paths.iter().rev() {
            self.remove_at(path);
        }
    }

    fn remove_at(&mut self, path: &[usize]) {
        if let Some((index, parent)) = path.split_last() {
            if let Some(children) = self.children_at_mut(parent) {
                if *index < children.len() {
                    children.remove(*index);
                }
            }
        }
    }

    /// Removes list items, lists and blockquotes left without content.
    pub fn prune_empty_containers(&mut self) {
        prune(&mut self.content);
        self.ensure_not_empty();
    }
}

fn prune(nodes: &mut Vec<Node>) {
    for node in nodes.iter_mut() {
        if !node.is_textblock() {
            if let Some(content) = node.content_mut() {
                prune(content);
            }
        }
    }
    nodes.retain(|node| {
        let container = node.is_list() || matches!(node, Node::ListItem { .. } | Node::Blockquote { .. });
        !(container && node.content().is_empty())
    });
}

fn common_prefix(a: &[usize], b: &[usize]) -> Vec<usize> {
    a.iter()
        .zip(b)
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| *x)
        .collect()
}

/// Splits inline nodes at a content offset, cutting a text run if needed.
pub fn split_inline(content: Vec<Node>, offset: usize) -> (Vec<Node>, Vec<Node>) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    let mut pos = 0;
    for node in content {
        let size = node.node_size();
        if pos + size <= offset {
            left.push(node);
        } else if pos >= offset {
            right.push(node);
        } else if let Node::Text { text, marks } = node {
            let cut = offset - pos;
            left.push(Node::Text {
                text: char_slice(&text, 0, cut).to_string(),
                marks: marks.clone(),
            });
            right.push(Node::Text {
                text: char_slice(&text, cut, size).to_string(),
                marks,
            });
        } else {
            right.push(node);
        }
        pos += size;
    }
    (left, right)
}

/// Drops empty text runs and merges neighbours carrying identical marks.
pub fn normalize_inline(nodes: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    for node in nodes {
        if let Node::Text { text, marks } = &node {
            if text.is_empty() {
                continue;
            }
            if let Some(Node::Text {
                text: prev_text,
                marks: prev_marks,
            }) = out.last_mut()
            {
                if prev_marks == marks {
                    prev_text.push_str(text);
                    continue;
                }
            }
        }
        out.push(node);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{ListAttrs, ListKind};

    fn two_paragraphs() -> Document {
        // <p>Hello world</p><p>Second line</p>
        Document::new(vec![
            Node::paragraph(vec![Node::text("Hello world")]),
            Node::paragraph(vec![Node::text("Second line")]),
        ])
    }

    #[test]
    fn test_add_mark_splits_runs() {
        let mut doc = two_paragraphs();
        doc.add_mark(7, 12, &Mark::Bold);
        let content = doc.content[0].content();
        assert_eq!(content.len(), 2);
        assert_eq!(content[0].as_text(), Some(("Hello ", &[][..])));
        assert_eq!(content[1].as_text(), Some(("world", &[Mark::Bold][..])));
    }

    #[test]
    fn test_remove_mark_merges_runs_back() {
        let mut doc = two_paragraphs();
        doc.add_mark(3, 9, &Mark::Italic);
        doc.remove_mark(1, 12, MarkType::Italic);
        assert_eq!(doc.content[0].content(), &[Node::text("Hello world")]);
    }

    #[test]
    fn test_update_text_style_drops_empty_style() {
        let mut doc = two_paragraphs();
        doc.update_text_style(1, 6, |attrs| attrs.color = Some("#ff0000".to_string()));
        assert!(doc.marks_at(3).iter().any(|m| m.mark_type() == MarkType::TextStyle));
        doc.update_text_style(1, 6, |attrs| attrs.color = None);
        assert_eq!(doc.content[0].content().len(), 1);
    }

    #[test]
    fn test_map_runs_reports_preceding_text() {
        let mut doc = two_paragraphs();
        let mut seen = Vec::new();
        doc.map_runs(7, 12, |run| seen.push(run.before.to_string()));
        assert_eq!(seen, vec!["Hello ".to_string()]);
    }

    #[test]
    fn test_delete_range_joins_blocks() {
        let mut doc = two_paragraphs();
        // "Hello |world" .. "Second| line"
        let caret = doc.delete_range(7, 20);
        assert_eq!(caret, 7);
        assert_eq!(doc.content.len(), 1);
        assert_eq!(doc.content[0].text_content(), "Hello  line");
    }

    #[test]
    fn test_delete_everything_leaves_a_paragraph() {
        let mut doc = Document::new(vec![Node::list(
            ListKind::Bullet,
            ListAttrs::default(),
            vec![Node::list_item(vec![Node::paragraph(vec![Node::text("a")])])],
        )]);
        let size = doc.content_size();
        doc.delete_range(0, size);
        assert_eq!(doc.content.len(), 1);
        assert!(doc.content[0].is_textblock());
    }

    #[test]
    fn test_insert_text_inherits_given_marks() {
        let mut doc = two_paragraphs();
        let end = doc.insert_text(7, "big ", vec![Mark::Bold]);
        assert_eq!(end, 11);
        assert_eq!(doc.content[0].text_content(), "Hello big world");
        assert_eq!(doc.marks_at(10), vec![Mark::Bold]);
    }

    #[test]
    fn test_insert_block_fragment_splits_paragraph() {
        let mut doc = two_paragraphs();
        let caret = doc.insert_fragment(
            7,
            vec![
                Node::paragraph(vec![Node::text("one")]),
                Node::paragraph(vec![Node::text("two")]),
            ],
        );
        let texts: Vec<String> = doc.content.iter().map(Node::text_content).collect();
        assert_eq!(texts, vec!["Hello one", "twoworld", "Second line"]);
        // caret sits between "two" and "world"
        assert_eq!(doc.text_between(caret - 3, caret, ""), "two");
    }

    #[test]
    fn test_wrap_and_replace_children() {
        let mut doc = two_paragraphs();
        assert!(doc.wrap_children(&[], 0, 1, Node::blockquote));
        assert_eq!(doc.content.len(), 1);
        assert!(doc.replace_node(&[0], Node::into_content));
        assert_eq!(doc.content.len(), 2);
    }

    #[test]
    fn test_sibling_range_across_nesting() {
        let doc = Document::new(vec![
            Node::paragraph(vec![Node::text("a")]),
            Node::list(
                ListKind::Order,
                ListAttrs::default(),
                vec![Node::list_item(vec![Node::paragraph(vec![Node::text("b")])])],
            ),
        ]);
        assert_eq!(doc.sibling_range(1, 7), Some((vec![], 0, 1)));
        assert_eq!(doc.sibling_range(6, 6), Some((vec![1, 0], 0, 0)));
    }
}
