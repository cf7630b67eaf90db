use charter_utils::types::PrivacyFinding;

/// Replace the spans of findings selected by `replace`.
///
/// Overlapping spans are merged into their union and replaced once, with the
/// placeholder of the widest finding in the group (higher confidence breaks
/// ties). Spans that are empty, out of range or split a character are skipped.
pub fn sanitize(text: &str, findings: &[PrivacyFinding], replace: impl Fn(usize) -> bool) -> String {
    let mut selected: Vec<&PrivacyFinding> = findings
        .iter()
        .enumerate()
        .filter(|(i, f)| {
            replace(*i)
                && f.start < f.end
                && f.end <= text.len()
                && text.is_char_boundary(f.start)
                && text.is_char_boundary(f.end)
        })
        .map(|(_, f)| f)
        .collect();
    selected.sort_by_key(|f| f.start);

    // (start, end, finding whose placeholder covers the region)
    let mut regions: Vec<(usize, usize, &PrivacyFinding)> = Vec::with_capacity(selected.len());
    for finding in selected {
        match regions.last_mut() {
            Some((_, end, lead)) if finding.start < *end => {
                *end = (*end).max(finding.end);
                if outranks(finding, *lead) {
                    *lead = finding;
                }
            }
            _ => regions.push((finding.start, finding.end, finding)),
        }
    }

    let mut out = text.to_string();
    for (start, end, lead) in regions.into_iter().rev() {
        out.replace_range(start..end, lead.replacement());
    }
    out
}

fn outranks(candidate: &PrivacyFinding, current: &PrivacyFinding) -> bool {
    let width = |f: &PrivacyFinding| f.end - f.start;
    width(candidate)
        .cmp(&width(current))
        .then(candidate.confidence.total_cmp(&current.confidence))
        .is_gt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use charter_utils::types::PrivacyCategory;
    use proptest::prelude::*;

    fn finding(text: &str, start: usize, end: usize, replacement: Option<&str>) -> PrivacyFinding {
        PrivacyFinding {
            category: PrivacyCategory::PersonallyIdentifying,
            text: text[start..end].to_string(),
            start,
            end,
            confidence: 0.9,
            suggested_replacement: replacement.map(str::to_string),
            context: String::new(),
        }
    }

    #[test]
    fn test_replaces_from_end() {
        let text = "call Jane Doe at 555-123-4567";
        let findings = vec![
            finding(text, 5, 13, None),
            finding(text, 17, 29, Some("[PHONE_NUMBER]")),
        ];
        assert_eq!(
            sanitize(text, &findings, |_| true),
            "call [PERSON] at [PHONE_NUMBER]"
        );
        assert_eq!(
            sanitize(text, &findings, |i| i == 1),
            "call Jane Doe at [PHONE_NUMBER]"
        );
    }

    #[test]
    fn test_overlapping_spans_merged() {
        let text = "Jane Doe";
        let findings = vec![finding(text, 0, 8, None), finding(text, 5, 8, None)];
        assert_eq!(sanitize(text, &findings, |_| true), "[PERSON]");
    }

    #[test]
    fn test_partial_overlap_takes_union_and_widest_placeholder() {
        let text = "at 12 Elm Street, Springfield today";
        let findings = vec![
            finding(text, 3, 16, Some("[ADDRESS]")),
            finding(text, 10, 29, Some("[LOCATION]")),
        ];
        assert_eq!(sanitize(text, &findings, |_| true), "at [LOCATION] today");
    }

    #[test]
    fn test_unselected_overlap_does_not_widen() {
        let text = "Jane Doe";
        let findings = vec![finding(text, 0, 8, None), finding(text, 5, 8, Some("[SURNAME]"))];
        assert_eq!(sanitize(text, &findings, |i| i == 1), "Jane [SURNAME]");
    }

    proptest! {
        /// **Property: sanitizing never panics on arbitrary spans**
        #[test]
        fn prop_sanitize_never_panics(text in "\\PC{0,40}", start in 0usize..50, len in 0usize..20) {
            let f = PrivacyFinding {
                category: PrivacyCategory::Location,
                text: String::new(),
                start,
                end: start + len,
                confidence: 1.0,
                suggested_replacement: None,
                context: String::new(),
            };
            let _ = sanitize(&text, &[f], |_| true);
        }

        /// **Property: no byte of a selected span survives sanitizing**
        #[test]
        fn prop_selected_spans_never_survive(
            spans in prop::collection::vec((0usize..30, 1usize..10), 1..5),
        ) {
            let text = "abcdefghijklmnopqrstuvwxyz0123456789ABCDEF";
            let findings: Vec<PrivacyFinding> = spans
                .iter()
                .map(|&(start, len)| finding(text, start, start + len, Some("#")))
                .collect();
            let out = sanitize(text, &findings, |_| true);
            for f in &findings {
                prop_assert!(!out.contains(&f.text), "{} survived in {}", f.text, out);
            }
        }
    }
}
