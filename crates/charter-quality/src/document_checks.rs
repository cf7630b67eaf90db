use charter_utils::documents::GeneratedDocument;

use crate::report::QualityIssue;
use crate::vocabulary::{AI_WORDS, FILLER_PHRASES, PLACEHOLDERS};

pub(crate) const MIN_WORDS: usize = 100;
pub(crate) const MAX_WORDS: usize = 10_000;
const FILLER_PER_THOUSAND: f64 = 10.0;
const AI_WORDS_PER_THOUSAND: f64 = 8.0;

/// Checks that look at one document in isolation.
pub(crate) fn check_document(doc: &GeneratedDocument) -> Vec<QualityIssue> {
    let mut issues = Vec::new();
    let docs = vec![doc.doc_type];

    if let Some(error) = &doc.error {
        issues.push(
            QualityIssue::warning(docs, format!("{} was not generated: {error}", doc.title))
                .suggest("Regenerate this document"),
        );
        return issues;
    }

    if doc.truncated {
        issues.push(
            QualityIssue::warning(docs.clone(), format!("{} appears truncated", doc.title))
                .suggest("Regenerate this document"),
        );
    }

    let words = doc.word_count;
    if words < MIN_WORDS {
        issues.push(
            QualityIssue::warning(
                docs.clone(),
                format!("{} has only {words} words (minimum {MIN_WORDS})", doc.title),
            )
            .suggest("Expand the content with more detail"),
        );
    } else if words > MAX_WORDS {
        issues.push(
            QualityIssue::warning(
                docs.clone(),
                format!("{} has {words} words (maximum {MAX_WORDS})", doc.title),
            )
            .suggest("Split the content into separate documents"),
        );
    }

    if !doc.body.trim_start().starts_with("# ") {
        issues.push(
            QualityIssue::warning(docs.clone(), format!("{} does not start with an H1 title", doc.title))
                .suggest(format!("Start the document with '# {}'", doc.title)),
        );
    }

    let empty = empty_sections(&doc.body);
    if !empty.is_empty() {
        issues.push(
            QualityIssue::warning(
                docs.clone(),
                format!("{} has empty sections: {}", doc.title, empty.join(", ")),
            )
            .suggest("Add content or remove the empty sections"),
        );
    }

    for (placeholder, line) in placeholders(&doc.body) {
        issues.push(
            QualityIssue::warning(
                docs.clone(),
                format!("{} contains placeholder '{placeholder}' on line {line}", doc.title),
            )
            .suggest("Replace the placeholder with real content"),
        );
    }

    if words > 0 {
        let lower = doc.body.to_lowercase();
        let filler: usize = FILLER_PHRASES.iter().map(|p| lower.matches(p).count()).sum();
        let density = per_thousand(filler, words);
        if density > FILLER_PER_THOUSAND {
            issues.push(
                QualityIssue::warning(
                    docs.clone(),
                    format!(
                        "{} has heavy filler phrasing ({filler} instances, {density:.1}/1000 words)",
                        doc.title
                    ),
                )
                .suggest("Cut stock phrases and formulaic transitions"),
            );
        }

        let ai_words = AI_WORDS.find_iter(&doc.body).count();
        let density = per_thousand(ai_words, words);
        if density > AI_WORDS_PER_THOUSAND {
            issues.push(
                QualityIssue::warning(
                    docs,
                    format!(
                        "{} leans on generic vocabulary ({ai_words} instances, {density:.1}/1000 words)",
                        doc.title
                    ),
                )
                .suggest("Replace generic words with specific ones"),
            );
        }
    }

    issues
}

fn per_thousand(count: usize, words: usize) -> f64 {
    count as f64 / words as f64 * 1000.0
}

fn heading_level(line: &str) -> Option<(usize, &str)> {
    let trimmed = line.trim();
    let level = trimmed.chars().take_while(|&c| c == '#').count();
    if level == 0 {
        return None;
    }
    let rest = &trimmed[level..];
    rest.starts_with(' ').then(|| (level, rest.trim()))
}

/// Headings below the title whose next non-blank line is a heading of the
/// same or a higher level, or the end of the document.
pub(crate) fn empty_sections(body: &str) -> Vec<String> {
    let items: Vec<Option<(usize, &str)>> = body
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(heading_level)
        .collect();

    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let (level, title) = (*item)?;
            if level == 1 {
                return None;
            }
            let empty = match items.get(i + 1) {
                None => true,
                Some(Some((next_level, _))) => *next_level <= level,
                Some(None) => false,
            };
            empty.then(|| title.to_string())
        })
        .collect()
}

/// `(placeholder, 1-based line)` for each placeholder hit.
fn placeholders(body: &str) -> Vec<(&'static str, usize)> {
    let mut hits = Vec::new();
    for (i, line) in body.lines().enumerate() {
        let lower = line.to_lowercase();
        for placeholder in PLACEHOLDERS {
            if lower.contains(&placeholder.to_lowercase()) {
                hits.push((*placeholder, i + 1));
            }
        }
    }
    hits
}
