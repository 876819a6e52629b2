//! Decoder for array values flattened into a single text column.
//!
//! # Responsibility
//! - Detect which historical encoding a column value uses.
//! - Decode it into a clean list of strings.
//!
//! # Invariants
//! - Detection precedence: nested literal list, brace array, pipe list.
//! - `None`, blank and unrecognized input decode to an empty list; decoding
//!   never fails.
//! - Delimiters and quote characters are stripped; empty elements are dropped.

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

static LITERAL_LIST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\['(.*?)'\]").expect("literal list regex must compile"));
static LITERAL_ITEM_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"'\s*,\s*'").expect("literal item separator regex must compile"));
static BRACE_ELEMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""((?:[^"\\]|\\.)*)"|([^,]+)"#).expect("brace element regex must compile")
});
static QUANTITY_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\|\|\s*").expect("quantity separator regex must compile"));
static WHITESPACE_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex must compile"));

/// Which legacy column a value came from; controls element cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyColumn {
    /// Elements may read `name || quantity`; only the name is kept.
    Ingredients,
    /// Same element shape as ingredients.
    Hashtags,
    /// Whole elements are kept; escaped newlines and whitespace runs collapse
    /// to single spaces.
    Instructions,
}

/// Encoding detected for one column value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyArrayFormat<'a> {
    Empty,
    /// `['a', 'b']`, optionally wrapped again, e.g. `{"['a || 1', 'b']"}`.
    NestedLiteralList(&'a str),
    /// `{"a","b"}`; holds the text between the braces.
    BraceArray(&'a str),
    /// `a|b|c`
    PipeDelimited(&'a str),
    Unrecognized,
}

impl<'a> LegacyArrayFormat<'a> {
    pub fn detect(raw: &'a str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Empty;
        }
        if let (Some(start), Some(end)) = (trimmed.find("['"), trimmed.rfind("']")) {
            if start < end {
                return Self::NestedLiteralList(&trimmed[start..end + 2]);
            }
        }
        if trimmed.len() >= 2 && trimmed.starts_with('{') && trimmed.ends_with('}') {
            return Self::BraceArray(&trimmed[1..trimmed.len() - 1]);
        }
        if trimmed.contains('|') {
            return Self::PipeDelimited(trimmed);
        }
        Self::Unrecognized
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::NestedLiteralList(_) => "nested_literal_list",
            Self::BraceArray(_) => "brace_array",
            Self::PipeDelimited(_) => "pipe_delimited",
            Self::Unrecognized => "unrecognized",
        }
    }

    pub fn decode(self, column: LegacyColumn) -> Vec<String> {
        match self {
            Self::Empty | Self::Unrecognized => Vec::new(),
            Self::NestedLiteralList(body) => decode_literal_lists(body, column),
            Self::BraceArray(content) => decode_brace_elements(content, column),
            Self::PipeDelimited(body) => body
                .split('|')
                .filter_map(|item| clean_element(item, column))
                .collect(),
        }
    }
}

/// Decodes one legacy column value.
pub fn parse_legacy_array(raw: Option<&str>, column: LegacyColumn) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    let format = LegacyArrayFormat::detect(raw);
    if format == LegacyArrayFormat::Unrecognized {
        debug!(
            "event=legacy_parse module=legacy status=degraded column={:?} error_code=malformed_legacy_data chars={}",
            column,
            raw.chars().count()
        );
    }
    format.decode(column)
}

/// Decodes a value with name-list semantics (`name || qty` keeps `name`).
pub fn parse_legacy_list(raw: Option<&str>) -> Vec<String> {
    parse_legacy_array(raw, LegacyColumn::Hashtags)
}

fn decode_literal_lists(body: &str, column: LegacyColumn) -> Vec<String> {
    LITERAL_LIST_RE
        .captures_iter(body)
        .filter_map(|captures| captures.get(1))
        .flat_map(|inner| LITERAL_ITEM_SEPARATOR_RE.split(inner.as_str()))
        .filter_map(|item| {
            let unquoted = item.replace('\'', "");
            clean_element(&unquoted, column)
        })
        .collect()
}

/// Splits a brace body on commas outside double quotes. Quoted elements
/// lose their quotes and `\"` / `\\` escapes.
fn decode_brace_elements(content: &str, column: LegacyColumn) -> Vec<String> {
    BRACE_ELEMENT_RE
        .captures_iter(content)
        .filter_map(|captures| match (captures.get(1), captures.get(2)) {
            (Some(quoted), _) => clean_element(&unescape_quoted(quoted.as_str()), column),
            (None, Some(bare)) => clean_element(bare.as_str(), column),
            (None, None) => None,
        })
        .collect()
}

fn unescape_quoted(raw: &str) -> String {
    let mut unescaped = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => unescaped.extend(chars.next()),
            other => unescaped.push(other),
        }
    }
    unescaped
}

fn clean_element(item: &str, column: LegacyColumn) -> Option<String> {
    let trimmed = item.trim();
    if trimmed.is_empty() || trimmed == "||" {
        return None;
    }
    let cleaned = match column {
        LegacyColumn::Ingredients | LegacyColumn::Hashtags => QUANTITY_SEPARATOR_RE
            .split(trimmed)
            .next()
            .unwrap_or_default()
            .trim()
            .to_string(),
        LegacyColumn::Instructions => WHITESPACE_RUN_RE
            .replace_all(&trimmed.replace("\\n", " "), " ")
            .trim()
            .to_string(),
    };
    (!cleaned.is_empty()).then_some(cleaned)
}

#[cfg(test)]
mod tests {
    use super::{parse_legacy_array, parse_legacy_list, LegacyArrayFormat, LegacyColumn};

    #[test]
    fn brace_array_strips_quotes() {
        assert_eq!(parse_legacy_list(Some(r#"{"a","b","c"}"#)), vec!["a", "b", "c"]);
        assert_eq!(parse_legacy_list(Some("{onion, garlic}")), vec!["onion", "garlic"]);
    }

    #[test]
    fn quoted_brace_elements_keep_inner_commas() {
        assert_eq!(
            parse_legacy_array(Some(r#"{"salt, pepper","onion"}"#), LegacyColumn::Ingredients),
            vec!["salt, pepper", "onion"]
        );
        assert_eq!(
            parse_legacy_list(Some(r#"{"quick",vegan,"late, night"}"#)),
            vec!["quick", "vegan", "late, night"]
        );
    }

    #[test]
    fn quoted_brace_elements_are_unescaped() {
        assert_eq!(
            parse_legacy_list(Some(r#"{"say \"hi\"","b"}"#)),
            vec![r#"say "hi""#, "b"]
        );
        assert_eq!(
            parse_legacy_list(Some(r#"{"back\\slash"}"#)),
            vec![r"back\slash"]
        );
    }

    #[test]
    fn empty_and_missing_input_yield_empty_list() {
        assert!(parse_legacy_list(None).is_empty());
        assert!(parse_legacy_list(Some("")).is_empty());
        assert!(parse_legacy_list(Some("   ")).is_empty());
        assert!(parse_legacy_list(Some("{}")).is_empty());
    }

    #[test]
    fn pipe_list_splits_and_trims() {
        assert_eq!(parse_legacy_list(Some("a|b|c")), vec!["a", "b", "c"]);
        assert_eq!(parse_legacy_list(Some(" a | | b ")), vec!["a", "b"]);
    }

    #[test]
    fn nested_list_keeps_ingredient_names_only() {
        let raw = r#"{"['onion || 1 ea', 'garlic||3 cloves', '||', 'salt']"}"#;
        assert_eq!(
            parse_legacy_array(Some(raw), LegacyColumn::Ingredients),
            vec!["onion", "garlic", "salt"]
        );
    }

    #[test]
    fn nested_list_handles_several_wrapped_lists() {
        let raw = r#"{"['quick']","['vegan', 'spicy']"}"#;
        assert_eq!(parse_legacy_list(Some(raw)), vec!["quick", "vegan", "spicy"]);
    }

    #[test]
    fn instructions_keep_whole_step_and_collapse_whitespace() {
        let raw = r"['Chop the onion.\n Then   fry', 'Serve || hot']";
        assert_eq!(
            parse_legacy_array(Some(raw), LegacyColumn::Instructions),
            vec!["Chop the onion. Then fry", "Serve || hot"]
        );
    }

    #[test]
    fn nested_form_wins_over_brace_and_pipe() {
        assert!(matches!(
            LegacyArrayFormat::detect(r#"{"['a | b']"}"#),
            LegacyArrayFormat::NestedLiteralList(_)
        ));
        assert!(matches!(
            LegacyArrayFormat::detect(r#"{"a|b"}"#),
            LegacyArrayFormat::BraceArray(_)
        ));
    }

    #[test]
    fn plain_text_is_unrecognized() {
        assert_eq!(
            LegacyArrayFormat::detect("just words"),
            LegacyArrayFormat::Unrecognized
        );
        assert!(parse_legacy_list(Some("just words")).is_empty());
    }
}
