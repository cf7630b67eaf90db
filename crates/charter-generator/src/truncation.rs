use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Last lines that may legitimately end without sentence punctuation.
static STRUCTURAL_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(#+\s|\|.*\|$|```|---$|[-*+]\s|\d+\.\s)").expect("valid regex")
});

static UNCLOSED_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\]]*$").expect("valid regex"));

const SENTENCE_ENDINGS: &[char] = &['.', '!', '?', ':', ')', ']', '"', '\'', '`', '*', '_'];

/// Why a response looks cut off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TruncationReason {
    Empty,
    UnbalancedCodeFence,
    MidSentence(String),
    UnclosedBold,
    UnclosedLink,
}

impl fmt::Display for TruncationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "content is empty"),
            Self::UnbalancedCodeFence => write!(f, "unbalanced code fence"),
            Self::MidSentence(tail) => write!(f, "ends mid-sentence: '{tail}'"),
            Self::UnclosedBold => write!(f, "unclosed bold"),
            Self::UnclosedLink => write!(f, "unclosed link"),
        }
    }
}

/// Inspect a generated body for signs of truncation.
#[must_use]
pub fn detect_truncation(content: &str) -> Option<TruncationReason> {
    let content = content.trim();
    if content.is_empty() {
        return Some(TruncationReason::Empty);
    }

    if content.matches("```").count() % 2 != 0 {
        return Some(TruncationReason::UnbalancedCodeFence);
    }

    let last_line = content
        .lines()
        .map(str::trim)
        .rfind(|l| !l.is_empty())
        .unwrap_or_default();

    if last_line.matches("**").count() % 2 != 0 {
        return Some(TruncationReason::UnclosedBold);
    }
    if UNCLOSED_LINK.is_match(last_line) {
        return Some(TruncationReason::UnclosedLink);
    }

    if !STRUCTURAL_LINE.is_match(last_line) && !last_line.ends_with(SENTENCE_ENDINGS) {
        return Some(TruncationReason::MidSentence(tail(last_line, 40)));
    }

    None
}

fn tail(line: &str, chars: usize) -> String {
    let count = line.chars().count();
    line.chars().skip(count.saturating_sub(chars)).collect()
}
