use serde::{Deserialize, Serialize};

/// Discriminant of a [`Mark`], ordered the way marks are stored on a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkType {
    TextStyle,
    Bold,
    Italic,
    Underline,
    Strike,
    Superscript,
    Subscript,
    Highlight,
    Link,
    Bookmark,
    Comment,
}

impl MarkType {
    /// Bookmarks and comments are identified by id and may overlap each other.
    pub fn is_annotation(self) -> bool {
        matches!(self, MarkType::Bookmark | MarkType::Comment)
    }

    pub fn name(self) -> &'static str {
        match self {
            MarkType::TextStyle => "textStyle",
            MarkType::Bold => "bold",
            MarkType::Italic => "italic",
            MarkType::Underline => "underline",
            MarkType::Strike => "strike",
            MarkType::Superscript => "superscript",
            MarkType::Subscript => "subscript",
            MarkType::Highlight => "highlight",
            MarkType::Link => "link",
            MarkType::Bookmark => "bookmark",
            MarkType::Comment => "comment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontVariant {
    Normal,
    SmallCaps,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyleAttrs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    /// Size in points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_variant: Option<FontVariant>,
    /// Extra spacing between characters, in points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub letter_spacing: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ligatures: Option<bool>,
}

impl TextStyleAttrs {
    pub fn is_empty(&self) -> bool {
        self.color.is_none()
            && self.font_family.is_none()
            && self.font_size.is_none()
            && self.font_variant.is_none()
            && self.letter_spacing.is_none()
            && self.ligatures.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightAttrs {
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkAttrs {
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationAttrs {
    pub id: String,
    pub color: String,
}

/// Inline annotation carried by a text run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Mark {
    TextStyle { attrs: TextStyleAttrs },
    Bold,
    Italic,
    Underline,
    Strike,
    Superscript,
    Subscript,
    Highlight { attrs: HighlightAttrs },
    Link { attrs: LinkAttrs },
    Bookmark { attrs: AnnotationAttrs },
    Comment { attrs: AnnotationAttrs },
}

impl Mark {
    pub fn text_style(attrs: TextStyleAttrs) -> Self {
        Mark::TextStyle { attrs }
    }

    pub fn highlight(color: impl Into<String>) -> Self {
        Mark::Highlight {
            attrs: HighlightAttrs {
                color: color.into(),
            },
        }
    }

    pub fn link(href: impl Into<String>) -> Self {
        Mark::Link {
            attrs: LinkAttrs { href: href.into() },
        }
    }

    pub fn bookmark(id: impl Into<String>, color: impl Into<String>) -> Self {
        Mark::Bookmark {
            attrs: AnnotationAttrs {
                id: id.into(),
                color: color.into(),
            },
        }
    }

    pub fn comment(id: impl Into<String>, color: impl Into<String>) -> Self {
        Mark::Comment {
            attrs: AnnotationAttrs {
                id: id.into(),
                color: color.into(),
            },
        }
    }

    /// Builds the id-bearing mark of the given annotation type.
    pub fn annotation(mark_type: MarkType, id: impl Into<String>, color: impl Into<String>) -> Option<Self> {
        match mark_type {
            MarkType::Bookmark => Some(Self::bookmark(id, color)),
            MarkType::Comment => Some(Self::comment(id, color)),
            _ => None,
        }
    }

    pub fn mark_type(&self) -> MarkType {
        match self {
            Mark::TextStyle { .. } => MarkType::TextStyle,
            Mark::Bold => MarkType::Bold,
            Mark::Italic => MarkType::Italic,
            Mark::Underline => MarkType::Underline,
            Mark::Strike => MarkType::Strike,
            Mark::Superscript => MarkType::Superscript,
            Mark::Subscript => MarkType::Subscript,
            Mark::Highlight { .. } => MarkType::Highlight,
            Mark::Link { .. } => MarkType::Link,
            Mark::Bookmark { .. } => MarkType::Bookmark,
            Mark::Comment { .. } => MarkType::Comment,
        }
    }

    pub fn annotation_attrs(&self) -> Option<&AnnotationAttrs> {
        match self {
            Mark::Bookmark { attrs } | Mark::Comment { attrs } => Some(attrs),
            _ => None,
        }
    }

    pub fn annotation_attrs_mut(&mut self) -> Option<&mut AnnotationAttrs> {
        match self {
            Mark::Bookmark { attrs } | Mark::Comment { attrs } => Some(attrs),
            _ => None,
        }
    }

    pub fn annotation_id(&self) -> Option<&str> {
        self.annotation_attrs().map(|attrs| attrs.id.as_str())
    }

    pub fn text_style_attrs(&self) -> Option<&TextStyleAttrs> {
        match self {
            Mark::TextStyle { attrs } => Some(attrs),
            _ => None,
        }
    }

    /// Whether adding `self` to a run must drop `other` first.
    pub fn excludes(&self, other: &Mark) -> bool {
        let (mine, theirs) = (self.mark_type(), other.mark_type());
        if mine.is_annotation() {
            return mine == theirs && self.annotation_id() == other.annotation_id();
        }
        mine == theirs
            || matches!(
                (mine, theirs),
                (MarkType::Superscript, MarkType::Subscript)
                    | (MarkType::Subscript, MarkType::Superscript)
            )
    }

    fn sort_key(&self) -> (MarkType, &str) {
        (self.mark_type(), self.annotation_id().unwrap_or(""))
    }
}

/// Adds `mark` to a run's mark set, replacing whatever it excludes.
pub fn add_to_set(marks: &mut Vec<Mark>, mark: Mark) {
    marks.retain(|existing| !mark.excludes(existing));
    marks.push(mark);
    sort_marks(marks);
}

pub fn sort_marks(marks: &mut [Mark]) {
    marks.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}

pub fn has_mark(marks: &[Mark], mark_type: MarkType) -> bool {
    marks.iter().any(|mark| mark.mark_type() == mark_type)
}

pub fn find_mark(marks: &[Mark], mark_type: MarkType) -> Option<&Mark> {
    marks.iter().find(|mark| mark.mark_type() == mark_type)
}

pub fn text_style_of(marks: &[Mark]) -> Option<&TextStyleAttrs> {
    marks.iter().find_map(Mark::text_style_attrs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_superscript_excludes_subscript() {
        let mut marks = vec![Mark::Bold, Mark::Subscript];
        add_to_set(&mut marks, Mark::Superscript);
        assert_eq!(marks, vec![Mark::Bold, Mark::Superscript]);
    }

    #[test]
    fn test_annotations_with_distinct_ids_coexist() {
        let mut marks = Vec::new();
        add_to_set(&mut marks, Mark::comment("b", "#fff"));
        add_to_set(&mut marks, Mark::comment("a", "#fff"));
        add_to_set(&mut marks, Mark::comment("a", "#000"));
        assert_eq!(marks.len(), 2);
        assert_eq!(marks[0], Mark::comment("a", "#000"));
        assert_eq!(marks[1].annotation_id(), Some("b"));
    }

    #[test]
    fn test_mark_json_shape() {
        let json = serde_json::to_string(&Mark::Bold).unwrap();
        assert_eq!(json, r#"{"type":"bold"}"#);

        let link: Mark =
            serde_json::from_str(r#"{"type":"link","attrs":{"href":"https://example.org"}}"#).unwrap();
        assert_eq!(link, Mark::link("https://example.org"));

        let style = Mark::text_style(TextStyleAttrs {
            font_family: Some("Garamond".to_string()),
            font_variant: Some(FontVariant::SmallCaps),
            ..Default::default()
        });
        let json = serde_json::to_string(&style).unwrap();
        assert_eq!(
            json,
            r#"{"type":"textStyle","attrs":{"fontFamily":"Garamond","fontVariant":"small-caps"}}"#
        );
    }
}
