use std::str::FromStr;

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaseType {
    AllCaps,
    TitleCase,
    StartCase,
    SmallCaps,
    Lowercase,
}

impl FromStr for CaseType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all-caps" => Ok(CaseType::AllCaps),
            "title-case" => Ok(CaseType::TitleCase),
            "start-case" => Ok(CaseType::StartCase),
            "small-caps" => Ok(CaseType::SmallCaps),
            "lowercase" => Ok(CaseType::Lowercase),
            other => Err(anyhow::anyhow!("Unknown case type: {}", other)),
        }
    }
}

fn ends_sentence(c: char) -> bool {
    matches!(c, '.' | '?' | '!')
}

/// Transforms one text piece. `before` is the block text preceding it and
/// `selection_start` is set for the first piece of the selection.
pub fn transform(case: CaseType, text: &str, before: &str, selection_start: bool) -> String {
    match case {
        CaseType::AllCaps => text.to_uppercase(),
        CaseType::Lowercase | CaseType::SmallCaps => text.to_lowercase(),
        CaseType::TitleCase => title_case(text, before),
        CaseType::StartCase => start_case(text, before, selection_start),
    }
}

fn title_case(text: &str, before: &str) -> String {
    // A piece that starts mid-word continues the previous piece's word.
    let mut continues_word = before.chars().last().is_some_and(char::is_alphanumeric);
    let mut out = String::with_capacity(text.len());
    for segment in text.split_word_bounds() {
        let is_word = segment.chars().next().is_some_and(char::is_alphanumeric);
        if is_word && !continues_word {
            let mut chars = segment.chars();
            if let Some(first) = chars.next() {
                out.extend(first.to_uppercase());
                out.push_str(&chars.as_str().to_lowercase());
            }
        } else if is_word {
            out.push_str(&segment.to_lowercase());
        } else {
            out.push_str(segment);
        }
        continues_word = false;
    }
    out
}

fn start_case(text: &str, before: &str, selection_start: bool) -> String {
    let mut capitalize_next = selection_start
        || before
            .chars()
            .rev()
            .find(|c| !c.is_whitespace())
            .map_or(true, ends_sentence);
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_alphabetic() {
            if capitalize_next {
                out.extend(c.to_uppercase());
                capitalize_next = false;
            } else {
                out.extend(c.to_lowercase());
            }
        } else {
            if ends_sentence(c) {
                capitalize_next = true;
            } else if c.is_numeric() {
                capitalize_next = false;
            }
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_caps_is_idempotent() {
        let once = transform(CaseType::AllCaps, "Straße und Weg", "", true);
        let twice = transform(CaseType::AllCaps, &once, "", true);
        assert_eq!(once, twice);
        assert_eq!(once, "STRASSE UND WEG");
    }

    #[test]
    fn test_title_case_words() {
        assert_eq!(
            transform(CaseType::TitleCase, "the eLEMENTS of style", "", true),
            "The Elements Of Style"
        );
    }

    #[test]
    fn test_title_case_continues_split_word() {
        // "hel" was in the previous run; "lo world" continues it
        assert_eq!(transform(CaseType::TitleCase, "lo world", "hel", false), "lo World");
    }

    #[test]
    fn test_start_case_sentences() {
        assert_eq!(
            transform(CaseType::StartCase, "fIRST line.  second? third!", "", true),
            "First line.  Second? Third!"
        );
        assert_eq!(transform(CaseType::StartCase, "next", "Done. ", false), "Next");
        assert_eq!(transform(CaseType::StartCase, "NEXT", "Not done ", false), "next");
    }

    #[test]
    fn test_parse_case_type() {
        assert_eq!("small-caps".parse::<CaseType>().unwrap(), CaseType::SmallCaps);
        assert!("sentence".parse::<CaseType>().is_err());
    }
}
