//! Text layouts of list-valued fields and the oracle input map.
//!
//! List fields are written as items separated by ` | `, each item followed
//! by its reference marker:
//!
//! ```text
//! all x.(F(x) -> G(x)) (ref: (1)) | F(a) (ref: (2))
//! F: is lonely | a: Peter
//! ```
//!
//! Items are split at reference markers rather than at `|`, so formulas
//! may use `|` for disjunction. The `read_*` functions accept learner text
//! leniently; the `parse_*` functions are strict and return `None` on any
//! malformed item, which callers treat as ill-formed.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::aar::{Aar, Field, Formalization, Quote, Substitution};
use crate::argdown::{ArgdownStatement, Argument};

/// Flat map from field name to its text layout, as consumed by the oracle.
pub type InputMap = BTreeMap<String, String>;

static REF_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(ref:\s*\((-?\d+)\)\)").expect("valid reference marker regex")
});

static SYMBOL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("valid symbol regex"));

const SEPARATOR: &str = " | ";

/// Split text into `(item, reference)` pairs; unreferenced items get `-1`.
fn read_referenced(text: &str) -> Vec<(String, i64)> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    if !REF_MARKER_RE.is_match(text) {
        return text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| (l.to_string(), -1))
            .collect();
    }

    let mut items = Vec::new();
    let mut pointer = 0;
    for caps in REF_MARKER_RE.captures_iter(text) {
        let Some(marker) = caps.get(0) else { continue };
        let item = strip_separator(&text[pointer..marker.start()]);
        let reference = caps[1].parse().unwrap_or(-1);
        items.push((item.to_string(), reference));
        pointer = marker.end();
    }
    let rest = strip_separator(&text[pointer..]);
    if !rest.is_empty() {
        items.push((rest.to_string(), -1));
    }
    items
}

fn strip_separator(item: &str) -> &str {
    item.trim().trim_start_matches('|').trim()
}

fn format_referenced<'a>(items: impl Iterator<Item = (&'a str, i64)>) -> String {
    items
        .map(|(text, reference)| {
            if reference >= 0 {
                format!("{text} (ref: ({reference}))")
            } else {
                text.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

/// Read a quote list leniently.
pub fn read_quote_list(text: &str) -> Vec<Quote> {
    read_referenced(text)
        .into_iter()
        .filter(|(t, _)| !t.is_empty())
        .map(|(t, r)| Quote::new(t, r))
        .collect()
}

/// Format a quote list.
pub fn format_quote_list(quotes: &[Quote]) -> String {
    format_referenced(quotes.iter().map(|q| (q.text.as_str(), q.ref_reco)))
}

/// Parse a quote list strictly: every item needs text and a reference.
pub fn parse_quotes(text: &str) -> Option<Vec<Quote>> {
    let items = read_referenced(text);
    if items.is_empty() || items.iter().any(|(t, r)| t.is_empty() || *r < 0) {
        return None;
    }
    Some(items.into_iter().map(|(t, r)| Quote::new(t, r)).collect())
}

/// Read a formalization list leniently.
pub fn read_formalization_list(text: &str) -> Vec<Formalization> {
    read_referenced(text)
        .into_iter()
        .filter(|(t, _)| !t.is_empty())
        .map(|(t, r)| Formalization::new(t, r))
        .collect()
}

/// Format a formalization list.
pub fn format_formalization_list(formalizations: &[Formalization]) -> String {
    format_referenced(formalizations.iter().map(|f| (f.form.as_str(), f.ref_reco)))
}

/// Parse a formalization list strictly.
pub fn parse_formalization_list(text: &str) -> Option<Vec<Formalization>> {
    let items = read_referenced(text);
    if items.is_empty() || items.iter().any(|(t, r)| t.is_empty() || *r < 0) {
        return None;
    }
    Some(
        items
            .into_iter()
            .map(|(t, r)| Formalization::new(t, r))
            .collect(),
    )
}

/// Read a substitution list leniently; items without `:` get an empty meaning.
pub fn read_substitution_list(text: &str) -> Vec<Substitution> {
    split_substitutions(text)
        .map(|item| match item.split_once(':') {
            Some((symbol, meaning)) => Substitution::new(symbol.trim(), meaning.trim()),
            None => Substitution::new(item, ""),
        })
        .filter(|s| !s.symbol.is_empty())
        .collect()
}

/// Format a substitution list.
pub fn format_substitution_list(substitutions: &[Substitution]) -> String {
    substitutions
        .iter()
        .map(|s| format!("{}: {}", s.symbol, s.meaning))
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

/// Parse keys strictly: every item is `symbol: meaning` with an identifier symbol.
pub fn parse_keys(text: &str) -> Option<Vec<Substitution>> {
    let mut keys = Vec::new();
    for item in split_substitutions(text) {
        let (symbol, meaning) = item.split_once(':')?;
        let (symbol, meaning) = (symbol.trim(), meaning.trim());
        if !SYMBOL_RE.is_match(symbol) || meaning.is_empty() {
            return None;
        }
        keys.push(Substitution::new(symbol, meaning));
    }
    (!keys.is_empty()).then_some(keys)
}

fn split_substitutions(text: &str) -> impl Iterator<Item = &str> {
    text.split(['|', '\n'])
        .map(str::trim)
        .filter(|item| !item.is_empty())
}

fn format_statements<'a>(statements: impl Iterator<Item = &'a ArgdownStatement>) -> String {
    format_referenced(statements.map(|s| (s.text.as_str(), s.label)))
}

/// Lays out an analysis record as the oracle's input map.
pub struct Layouter;

impl Layouter {
    /// Text layout of a single stored field; `None` when the field is empty.
    pub fn format_field(aar: &Aar, field: Field) -> Option<String> {
        if !aar.is_set(field) {
            return None;
        }
        let text = match field {
            Field::SourceText => aar.source_text.clone(),
            Field::Gist => aar.gist.clone().unwrap_or_default(),
            Field::Context => aar.context.clone().unwrap_or_default(),
            Field::SourceParaphrase => aar.source_paraphrase.clone().unwrap_or_default(),
            Field::ArgdownReconstruction => {
                aar.argdown_reconstruction.clone().unwrap_or_default()
            }
            Field::Conclusion | Field::Reasons | Field::Conjectures => {
                format_quote_list(aar.quotes(field))
            }
            Field::PremisesFormalized
            | Field::IntermediaryConclusionsFormalized
            | Field::ConclusionFormalized => format_formalization_list(aar.formalizations(field)),
            Field::PlchdSubstitutions => format_substitution_list(&aar.plchd_substitutions),
            Field::Premises | Field::IntermediaryConclusions => return None,
        };
        Some(text)
    }

    /// All non-empty stored fields.
    pub fn format(aar: &Aar) -> InputMap {
        Field::STORED
            .into_iter()
            .filter_map(|f| Self::format_field(aar, f).map(|t| (f.as_str().to_string(), t)))
            .collect()
    }

    /// Like [`Layouter::format`], with premises, intermediary conclusions
    /// and conclusion taken from the parsed reconstruction.
    pub fn format_expanded(aar: &Aar, argument: Option<&Argument>) -> InputMap {
        let mut map = Self::format(aar);
        let Some(argument) = argument else {
            return map;
        };
        map.insert(
            Field::Premises.as_str().to_string(),
            format_statements(argument.premises()),
        );
        let intermediary = format_statements(argument.intermediary_conclusions());
        if !intermediary.is_empty() {
            map.insert(
                Field::IntermediaryConclusions.as_str().to_string(),
                intermediary,
            );
        }
        if let Some(conclusion) = argument.final_conclusion() {
            map.insert(
                Field::Conclusion.as_str().to_string(),
                format_statements(std::iter::once(conclusion)),
            );
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argdown::parse_argdown;

    #[test]
    fn reads_formulas_with_disjunction() {
        let forms = read_formalization_list("F(a) | G(a) (ref: (1)) | -G(a) (ref: (2))");
        assert_eq!(
            forms,
            vec![
                Formalization::new("F(a) | G(a)", 1),
                Formalization::new("-G(a)", 2)
            ]
        );
    }

    #[test]
    fn reads_unreferenced_lines() {
        let quotes = read_quote_list("first line\n\nsecond line");
        assert_eq!(
            quotes,
            vec![Quote::unreferenced("first line"), Quote::unreferenced("second line")]
        );
    }

    #[test]
    fn trailing_item_without_reference_is_kept() {
        let quotes = read_quote_list("a (ref: (1)) | b");
        assert_eq!(quotes, vec![Quote::new("a", 1), Quote::unreferenced("b")]);
    }

    #[test]
    fn formalization_layout_reads_back() {
        let forms = vec![
            Formalization::new("all x.(F(x) -> G(x))", 1),
            Formalization::new("F(a)", 2),
        ];
        let text = format_formalization_list(&forms);
        assert_eq!(text, "all x.(F(x) -> G(x)) (ref: (1)) | F(a) (ref: (2))");
        assert_eq!(read_formalization_list(&text), forms);
    }

    #[test]
    fn strict_quote_parsing_requires_references() {
        assert!(parse_quotes("is lonely (ref: (1))").is_some());
        assert!(parse_quotes("is lonely").is_none());
        assert!(parse_quotes("").is_none());
    }

    #[test]
    fn strict_formalization_parsing_requires_references() {
        assert!(parse_formalization_list("F(a) (ref: (1))").is_some());
        assert!(parse_formalization_list("F(a) (ref: (1)) | G(a)").is_none());
    }

    #[test]
    fn keys_parse_and_format() {
        let keys = parse_keys("F: is lonely | a: Peter").unwrap();
        assert_eq!(
            keys,
            vec![Substitution::new("F", "is lonely"), Substitution::new("a", "Peter")]
        );
        assert_eq!(format_substitution_list(&keys), "F: is lonely | a: Peter");
    }

    #[test]
    fn malformed_keys_are_rejected() {
        assert!(parse_keys("F is lonely").is_none());
        assert!(parse_keys("1F: lonely").is_none());
        assert!(parse_keys("F:").is_none());
        assert!(parse_keys("").is_none());
    }

    #[test]
    fn lenient_keys_keep_bare_symbols() {
        let keys = read_substitution_list("F: is lonely\nG");
        assert_eq!(keys[1], Substitution::new("G", ""));
    }

    #[test]
    fn format_skips_empty_fields() {
        let mut aar = Aar::new("Peter is lonely.");
        aar.gist = Some("Peter calls.".into());
        let map = Layouter::format(&aar);
        assert_eq!(map.len(), 2);
        assert_eq!(map["source_text"], "Peter is lonely.");
        assert_eq!(map["gist"], "Peter calls.");
    }

    #[test]
    fn expanded_format_derives_statements() {
        let mut aar = Aar::new("src");
        aar.conclusion = vec![Quote::unreferenced("cue")];
        let argument = parse_argdown(
            "(1) P.\n(2) Q.\n-- from (1) (2) --\n(3) R.\n(4) S.\n-- from (3) (4) --\n(5) T.",
        )
        .unwrap();
        let map = Layouter::format_expanded(&aar, Some(&argument));
        assert_eq!(map["premises"], "P. (ref: (1)) | Q. (ref: (2)) | S. (ref: (4))");
        assert_eq!(map["intermediary_conclusions"], "R. (ref: (3))");
        assert_eq!(map["conclusion"], "T. (ref: (5))");
    }
}
