//! Derives one toolbar-ready formatting snapshot from an arbitrary selection.
//!
//! Multi-valued attributes collapse to an ambiguous sentinel when the
//! selection mixes values. Boolean marks have no mixed state: they read as
//! active only when every run in the selection carries them.

use doccore::mark::{find_mark, has_mark, text_style_of};
use doccore::{Alignment, Document, ListKind, Mark, MarkType, Node};
use serde::Serialize;

use crate::config::Config;
use crate::editor::Selection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HeadingLevel {
    Body,
    Heading(u8),
    /// Several heading levels, or headings mixed with body text.
    Ambiguous,
}

impl HeadingLevel {
    /// Numeric form: 0 for body text, `None` when ambiguous.
    pub fn as_number(self) -> Option<u8> {
        match self {
            HeadingLevel::Body => Some(0),
            HeadingLevel::Heading(level) => Some(level),
            HeadingLevel::Ambiguous => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListStyleState {
    pub kind: ListKind,
    pub style: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Spacing {
    pub before: Option<f32>,
    pub after: Option<f32>,
    pub line: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmphasisState {
    pub heading_level: HeadingLevel,
    /// Empty when the selection mixes families.
    pub font_family: String,
    /// `None` when the selection mixes sizes.
    pub font_size: Option<f32>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub superscript: bool,
    pub subscript: bool,
    /// Empty when the selection mixes colors.
    pub text_color: String,
    pub highlight: Option<String>,
    pub alignment: Option<Alignment>,
    pub blockquote: bool,
    pub code_block: bool,
    pub bullet_style: Option<ListStyleState>,
    pub spacing: Spacing,
    pub link: Option<String>,
    pub character_spacing: Option<f32>,
    pub show_non_printing_characters: bool,
}

/// Default point size of a heading level when no override is present.
pub fn heading_default_size(level: u8) -> f32 {
    match level {
        1 => 18.0,
        2 => 16.0,
        3 => 14.0,
        4 => 12.0,
        _ => 10.0,
    }
}

/// Collapses the collected values: one distinct value is reported as is,
/// none yields `default`, several yield `ambiguous`.
pub fn unique_value<T, I>(values: I, default: T, ambiguous: T) -> T
where
    T: PartialEq,
    I: IntoIterator<Item = T>,
{
    let mut found: Option<T> = None;
    for value in values {
        match &found {
            None => found = Some(value),
            Some(existing) if *existing == value => {}
            Some(_) => return ambiguous,
        }
    }
    found.unwrap_or(default)
}

struct BlockInfo<'a> {
    node: &'a Node,
    in_blockquote: bool,
    list: Option<ListStyleState>,
}

/// Marks and owning block of one run in the selection.
struct RunInfo<'a> {
    marks: Vec<Mark>,
    block: &'a Node,
}

fn collect_blocks<'a>(doc: &'a Document, selection: Selection) -> Vec<BlockInfo<'a>> {
    doc.textblocks_between(selection.from(), selection.to())
        .into_iter()
        .filter_map(|located| {
            let node = doc.node_at(&located.path)?;
            let ancestors: Vec<&Node> = doc
                .ancestors_at(located.content_start())
                .iter()
                .filter_map(|ancestor| doc.node_at(&ancestor.path))
                .collect();
            let in_blockquote = ancestors.iter().any(|n| matches!(n, Node::Blockquote { .. }));
            let list = ancestors.iter().rev().find_map(|n| {
                Some(ListStyleState {
                    kind: n.list_kind()?,
                    style: n.list_attrs().and_then(|attrs| attrs.list_style.clone()),
                })
            });
            Some(BlockInfo {
                node,
                in_blockquote,
                list,
            })
        })
        .collect()
}

fn collect_runs<'a>(doc: &'a Document, selection: Selection, blocks: &[BlockInfo<'a>]) -> Vec<RunInfo<'a>> {
    let caret_run = |pos: usize| {
        blocks.first().map(|block| RunInfo {
            marks: doc.marks_at(pos),
            block: block.node,
        })
    };
    if selection.is_empty() {
        return caret_run(selection.head).into_iter().collect();
    }
    let runs: Vec<RunInfo<'a>> = doc
        .text_spans(selection.from(), selection.to())
        .into_iter()
        .map(|span| RunInfo {
            marks: span.marks.to_vec(),
            block: span.block,
        })
        .collect();
    if runs.is_empty() {
        return caret_run(selection.from()).into_iter().collect();
    }
    runs
}

fn block_family(block: &Node, config: &Config) -> String {
    if let Some(family) = block.block_attrs().and_then(|attrs| attrs.font_family.clone()) {
        return family;
    }
    match block.heading_level() {
        Some(level) => config.styles.heading(level).font_family.clone(),
        None => config.styles.body.font_family.clone(),
    }
}

fn block_size(block: &Node, config: &Config) -> f32 {
    if let Some(size) = block.block_attrs().and_then(|attrs| attrs.font_size) {
        return size;
    }
    match block.heading_level() {
        Some(level) => heading_default_size(level),
        None => config.styles.body.font_size,
    }
}

/// Resolves the formatting state for `selection`.
pub fn resolve(doc: &Document, selection: Selection, config: &Config, show_non_printing: bool) -> EmphasisState {
    let blocks = collect_blocks(doc, selection);
    let runs = collect_runs(doc, selection, &blocks);

    let mut heading_levels: Vec<u8> = blocks.iter().filter_map(|b| b.node.heading_level()).collect();
    heading_levels.sort_unstable();
    heading_levels.dedup();
    let has_body = blocks.iter().any(|b| b.node.heading_level().is_none());
    let heading_level = match heading_levels.as_slice() {
        [] => HeadingLevel::Body,
        [level] if !has_body => HeadingLevel::Heading(*level),
        _ => HeadingLevel::Ambiguous,
    };

    // With any unmarked text in the selection, runs without an explicit
    // textStyle value fall back to their block. Fully marked selections read
    // family and size from textStyle marks alone.
    let has_unmarked = runs.iter().any(|run| run.marks.is_empty());
    let anchor_block = runs.first().map(|run| run.block);
    let font_family = unique_value(
        runs.iter().filter_map(|run| {
            let explicit = text_style_of(&run.marks).and_then(|attrs| attrs.font_family.clone());
            if has_unmarked {
                Some(explicit.unwrap_or_else(|| block_family(run.block, config)))
            } else {
                explicit
            }
        }),
        anchor_block.map_or_else(
            || config.styles.body.font_family.clone(),
            |block| block_family(block, config),
        ),
        String::new(),
    );
    let font_size = unique_value(
        runs.iter().filter_map(|run| {
            let explicit = text_style_of(&run.marks).and_then(|attrs| attrs.font_size);
            if has_unmarked {
                Some(Some(explicit.unwrap_or_else(|| block_size(run.block, config))))
            } else {
                explicit.map(Some)
            }
        }),
        Some(anchor_block.map_or(config.styles.body.font_size, |block| block_size(block, config))),
        None,
    );
    let text_color = unique_value(
        runs.iter().map(|run| {
            text_style_of(&run.marks)
                .and_then(|attrs| attrs.color.clone())
                .or_else(|| run.block.block_attrs().and_then(|attrs| attrs.color.clone()))
                .unwrap_or_else(|| config.styles.default_text_color.clone())
        }),
        config.styles.default_text_color.clone(),
        String::new(),
    );
    let highlight = unique_value(
        runs.iter().map(|run| match find_mark(&run.marks, MarkType::Highlight) {
            Some(Mark::Highlight { attrs }) => Some(attrs.color.clone()),
            _ => None,
        }),
        None,
        None,
    );
    let link = unique_value(
        runs.iter().map(|run| match find_mark(&run.marks, MarkType::Link) {
            Some(Mark::Link { attrs }) => Some(attrs.href.clone()),
            _ => None,
        }),
        None,
        None,
    );
    let character_spacing = unique_value(
        runs.iter().map(|run| {
            Some(
                text_style_of(&run.marks)
                    .and_then(|attrs| attrs.letter_spacing)
                    .unwrap_or(0.0),
            )
        }),
        Some(0.0),
        None,
    );

    let block_attr = |f: fn(&doccore::BlockAttrs) -> Option<f32>| {
        unique_value(
            blocks.iter().map(|b| b.node.block_attrs().and_then(f)),
            None,
            None,
        )
    };
    let spacing = Spacing {
        before: block_attr(|attrs| attrs.space_before),
        after: block_attr(|attrs| attrs.space_after),
        line: block_attr(|attrs| attrs.line_height),
    };
    let alignment = unique_value(
        blocks.iter().map(|b| {
            Some(
                b.node
                    .block_attrs()
                    .and_then(|attrs| attrs.text_align)
                    .unwrap_or_default(),
            )
        }),
        Some(Alignment::Left),
        None,
    );

    let all_runs = |mark_type: MarkType| !runs.is_empty() && runs.iter().all(|run| has_mark(&run.marks, mark_type));
    let all_blocks = |f: &dyn Fn(&BlockInfo) -> bool| !blocks.is_empty() && blocks.iter().all(f);
    let bullet_style = if blocks.iter().all(|b| b.list.is_some()) {
        unique_value(blocks.iter().map(|b| b.list.clone()), None, None)
    } else {
        None
    };

    EmphasisState {
        heading_level,
        font_family,
        font_size,
        bold: all_runs(MarkType::Bold),
        italic: all_runs(MarkType::Italic),
        underline: all_runs(MarkType::Underline),
        strikethrough: all_runs(MarkType::Strike),
        superscript: all_runs(MarkType::Superscript),
        subscript: all_runs(MarkType::Subscript),
        text_color,
        highlight,
        alignment,
        blockquote: all_blocks(&|b| b.in_blockquote),
        code_block: all_blocks(&|b| matches!(b.node, Node::CodeBlock { .. })),
        bullet_style,
        spacing,
        link,
        character_spacing,
        show_non_printing_characters: show_non_printing,
    }
}
