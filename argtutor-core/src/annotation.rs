//! Conversion between quote lists and annotated source texts.
//!
//! An annotation is the source text with quoted spans marked as markdown
//! links whose target is the referenced statement label:
//!
//! ```text
//! Peter [is lonely. So he](3) calls his sister.
//! ```

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::aar::Quote;

static QUOTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\[([^\[]+)\]\(([^ ]*)( "(.+)")?\)"#).expect("valid annotation regex")
});

/// Mark quotes in the source text.
///
/// Each quote claims its first occurrence that does not overlap an
/// earlier quote's span. Quotes that cannot be placed are skipped with a
/// warning. Markers appear in source order.
pub fn quotes_as_annotation(source_text: &str, quotes: &[Quote]) -> String {
    let mut spans: Vec<(usize, usize, &Quote)> = Vec::new();
    for quote in quotes {
        if quote.text.is_empty() {
            continue;
        }
        match find_free_span(source_text, &quote.text, &spans) {
            Some(start) => spans.push((start, start + quote.text.len(), quote)),
            None => warn!(quote = %quote.text, "ignoring quote not found in source text"),
        }
    }
    spans.sort_by_key(|(start, _, _)| *start);

    let mut annotation = String::with_capacity(source_text.len() + 8 * spans.len());
    let mut pointer = 0;
    for (start, end, quote) in spans {
        annotation.push_str(&source_text[pointer..start]);
        annotation.push_str(&format!("[{}]({})", quote.text, quote.ref_reco));
        pointer = end;
    }
    annotation.push_str(&source_text[pointer..]);
    annotation
}

fn find_free_span(source: &str, text: &str, taken: &[(usize, usize, &Quote)]) -> Option<usize> {
    source.match_indices(text).map(|(start, _)| start).find(|start| {
        let end = start + text.len();
        taken.iter().all(|(s, e, _)| end <= *s || *start >= *e)
    })
}

/// Extract quotes from an annotation; unreadable references become `-1`.
pub fn annotation_as_quotes(annotation: &str) -> Vec<Quote> {
    QUOTE_RE
        .captures_iter(annotation)
        .map(|caps| {
            let reference = caps
                .get(2)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(-1);
            Quote::new(&caps[1], reference)
        })
        .collect()
}

/// Whether every marked span occurs in the source text, in order.
pub fn is_annotation(source_text: &str, annotation: &str) -> bool {
    let mut pointer = 0;
    for caps in QUOTE_RE.captures_iter(annotation) {
        let text = &caps[1];
        match source_text[pointer..].find(text) {
            Some(offset) => pointer += offset + text.len(),
            None => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "Peter is lonely. So he calls his sister. But Pele is lonely. And he calls his sister.";

    #[test]
    fn extracts_quotes_with_escaped_brackets() {
        let annotation =
            r"Peter [is lonely. So he](3) calls his sister. But Pele [is \]lonely. And](1) he calls his sister.";
        let quotes = annotation_as_quotes(annotation);
        assert_eq!(
            quotes,
            vec![
                Quote::new("is lonely. So he", 3),
                Quote::new(r"is \]lonely. And", 1)
            ]
        );
    }

    #[test]
    fn unreadable_reference_becomes_minus_one() {
        let quotes = annotation_as_quotes("Peter [is lonely]() and [sad](x).");
        assert_eq!(quotes, vec![Quote::new("is lonely", -1), Quote::new("sad", -1)]);
    }

    #[test]
    fn title_part_is_ignored() {
        let quotes = annotation_as_quotes(r#"Peter [is lonely](2 "premise")."#);
        assert_eq!(quotes, vec![Quote::new("is lonely", 2)]);
    }

    #[test]
    fn annotation_marks_quotes_in_source() {
        let quotes = vec![Quote::new("is lonely. So he", 3), Quote::new("he calls his sister", 1)];
        let annotation = quotes_as_annotation(SOURCE, &quotes);
        assert_eq!(
            annotation,
            "Peter [is lonely. So he](3) calls his sister. But Pele is lonely. And [he calls his sister](1)."
        );
    }

    #[test]
    fn quotes_roundtrip_through_annotation() {
        let quotes = vec![
            Quote::new("Peter is lonely.", 1),
            Quote::new("he calls his sister", 2),
            Quote::new("Pele is lonely", 3),
        ];
        let annotation = quotes_as_annotation(SOURCE, &quotes);
        assert!(is_annotation(SOURCE, &annotation));
        assert_eq!(annotation_as_quotes(&annotation), quotes);
    }

    #[test]
    fn out_of_order_quotes_come_back_in_source_order() {
        let quotes = vec![Quote::new("Pele is lonely", 3), Quote::new("Peter", 1)];
        let annotation = quotes_as_annotation(SOURCE, &quotes);
        assert_eq!(
            annotation_as_quotes(&annotation),
            vec![Quote::new("Peter", 1), Quote::new("Pele is lonely", 3)]
        );
    }

    #[test]
    fn repeated_text_claims_next_occurrence() {
        let quotes = vec![Quote::new("he calls his sister", 1), Quote::new("he calls his sister", 2)];
        let annotation = quotes_as_annotation(SOURCE, &quotes);
        assert_eq!(annotation_as_quotes(&annotation), quotes);
    }

    #[test]
    fn missing_quotes_are_skipped() {
        let quotes = vec![Quote::new("not in source", 1)];
        assert_eq!(quotes_as_annotation(SOURCE, &quotes), SOURCE);
    }

    #[test]
    fn is_annotation_rejects_foreign_text() {
        assert!(!is_annotation(SOURCE, "Peter [is happy](1)."));
        assert!(is_annotation(SOURCE, SOURCE));
    }
}
