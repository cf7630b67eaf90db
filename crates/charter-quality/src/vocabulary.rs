//! Phrase and word lists for content checks.

use once_cell::sync::Lazy;
use regex::Regex;

pub(crate) const FILLER_PHRASES: &[&str] = &[
    "in today's",
    "in this day and age",
    "in the modern world",
    "it is important to note",
    "it should be noted",
    "needless to say",
    "as we all know",
    "as mentioned earlier",
    "in order to",
    "for the purpose of",
    "with respect to",
    "in terms of",
    "at the end of the day",
    "going forward",
    "moving forward",
    "at this point in time",
    "in light of the fact",
    "due to the fact that",
    "plays a crucial role",
    "plays an important role",
    "plays a vital role",
    "is essential for success",
    "is key to success",
    "is critical to success",
    "will be important",
    "will be essential",
    "will be crucial",
    "cannot be overstated",
    "is of paramount importance",
    "furthermore",
    "moreover",
    "in addition",
    "additionally",
    "consequently",
    "in conclusion",
    "to summarize",
    "in summary",
    "all in all",
    "i hope this helps",
    "i'd be happy to",
    "let me know if",
    "feel free to",
    "is designed to",
    "aims to provide",
    "strives to",
    "seeks to address",
];

pub(crate) const AI_VOCABULARY: &[&str] = &[
    "delve",
    "tapestry",
    "realm",
    "vibrant",
    "bustling",
    "leverage",
    "utilize",
    "seamlessly",
    "meticulous",
    "intricate",
    "underscore",
    "embark",
    "navigate",
    "landscape",
    "foster",
    "holistic",
    "synergy",
    "paradigm",
    "multifaceted",
    "cutting-edge",
    "best-in-class",
    "state-of-the-art",
    "world-class",
    "robust",
    "scalable",
    "actionable",
    "impactful",
    "transformative",
];

pub(crate) const PLACEHOLDERS: &[&str] = &[
    "[TODO]",
    "[PLACEHOLDER]",
    "[INSERT",
    "[TBD]",
    "Lorem ipsum",
    "FIXME",
];

/// Acronyms common enough to need no glossary entry.
pub(crate) const COMMON_ACRONYMS: &[&str] = &[
    "API", "CSS", "CSV", "FAQ", "HTML", "HTTP", "HTTPS", "ID", "IT", "JSON", "PDF", "SQL", "UI",
    "URL", "US", "USA", "UX", "XML",
];

/// One alternation over [`AI_VOCABULARY`] with word boundaries.
pub(crate) static AI_WORDS: Lazy<Regex> = Lazy::new(|| {
    let alternation = AI_VOCABULARY
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).expect("valid regex")
});
