//! Parser for premise-conclusion arguments in argdown notation.
//!
//! ```text
//! (1) Peter is lonely.
//! (2) If Peter is lonely, he calls his sister.
//! -- with modus ponens from (1) (2) --
//! (3) Peter calls his sister.
//! ```
//!
//! Statements start with an integer label. An inference bar is a run of
//! dashes enclosing an optional inference annotation; the statement after a
//! bar is a conclusion that uses the labels mentioned in the annotation.
//! A plain bar of four or more dashes carries no annotation.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static INFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-{2,}(?P<info>[^-\n]*)-{2,}").expect("valid inference bar regex")
});

static LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)\((\d+)\)\s").expect("valid statement label regex"));

static USES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d+)\)").expect("valid uses regex"));

/// A labeled statement of a parsed argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgdownStatement {
    pub text: String,
    pub label: i64,
    pub is_conclusion: bool,
    /// Labels of the statements this conclusion is inferred from.
    pub uses: Vec<i64>,
    /// Inference annotation between the dashes, if any.
    pub inference_info: Option<String>,
}

/// A parsed premise-conclusion argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    pub statements: Vec<ArgdownStatement>,
}

impl Argument {
    pub fn premises(&self) -> impl Iterator<Item = &ArgdownStatement> {
        self.statements.iter().filter(|s| !s.is_conclusion)
    }

    /// Conclusions other than the final statement.
    pub fn intermediary_conclusions(&self) -> impl Iterator<Item = &ArgdownStatement> {
        let n = self.statements.len().saturating_sub(1);
        self.statements[..n].iter().filter(|s| s.is_conclusion)
    }

    pub fn final_conclusion(&self) -> Option<&ArgdownStatement> {
        self.statements.last()
    }

    pub fn conclusions(&self) -> impl Iterator<Item = &ArgdownStatement> {
        self.statements.iter().filter(|s| s.is_conclusion)
    }

    pub fn has_intermediary_conclusions(&self) -> bool {
        self.intermediary_conclusions().next().is_some()
    }

    pub fn statement(&self, label: i64) -> Option<&ArgdownStatement> {
        self.statements.iter().find(|s| s.label == label)
    }

    pub fn labels(&self) -> impl Iterator<Item = i64> + '_ {
        self.statements.iter().map(|s| s.label)
    }

    fn position(&self, label: i64) -> Option<usize> {
        self.statements.iter().position(|s| s.label == label)
    }

    /// First statement is a premise and the last one a conclusion.
    pub fn has_pc_structure(&self) -> bool {
        match (self.statements.first(), self.statements.last()) {
            (Some(first), Some(last)) => !first.is_conclusion && last.is_conclusion,
            _ => false,
        }
    }

    /// Every inference uses existing, earlier statements, and every
    /// statement except the final one is used by some inference.
    pub fn has_consistent_usage(&self) -> bool {
        let mut used = HashSet::new();
        for (idx, statement) in self.statements.iter().enumerate() {
            for label in &statement.uses {
                match self.position(*label) {
                    Some(pos) if pos < idx => {
                        used.insert(*label);
                    }
                    _ => return false,
                }
            }
        }
        let n = self.statements.len().saturating_sub(1);
        self.statements[..n].iter().all(|s| used.contains(&s.label))
    }

    /// No conclusion restates a premise.
    pub fn is_no_petitio(&self) -> bool {
        let premises: HashSet<String> = self.premises().map(|s| normalize(&s.text)).collect();
        !self.conclusions().any(|c| premises.contains(&normalize(&c.text)))
    }

    /// No premise and no conclusion occurs twice.
    pub fn is_no_redundancy(&self) -> bool {
        fn all_distinct<'a>(mut statements: impl Iterator<Item = &'a ArgdownStatement>) -> bool {
            let mut seen = HashSet::new();
            statements.all(|s| seen.insert(normalize(&s.text)))
        }
        all_distinct(self.premises()) && all_distinct(self.conclusions())
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Parse an argdown reconstruction; `None` if it is not well-formed.
pub fn parse_argdown(text: &str) -> Option<Argument> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let mut statements = Vec::new();
    let mut pointer = 0;
    let mut pending: Option<(Vec<i64>, Option<String>)> = None;

    for caps in INFERENCE_RE.captures_iter(text) {
        let bar = caps.get(0)?;
        let segment = parse_segment(&text[pointer..bar.start()])?;
        push_segment(&mut statements, segment, pending.take())?;
        // a bar needs a statement before it
        if statements.is_empty() {
            return None;
        }
        let info = caps.name("info").map(|m| m.as_str().trim()).unwrap_or("");
        let uses = USES_RE
            .captures_iter(info)
            .filter_map(|c| c[1].parse().ok())
            .collect();
        pending = Some((uses, (!info.is_empty()).then(|| info.to_string())));
        pointer = bar.end();
    }
    let segment = parse_segment(&text[pointer..])?;
    push_segment(&mut statements, segment, pending.take())?;

    if statements.is_empty() {
        return None;
    }
    let mut labels = HashSet::new();
    if !statements.iter().all(|s| labels.insert(s.label)) {
        return None;
    }
    Some(Argument { statements })
}

/// Labeled statements of one segment between inference bars.
fn parse_segment(segment: &str) -> Option<Vec<(i64, String)>> {
    let matches: Vec<_> = LABEL_RE.captures_iter(segment).collect();
    let Some(first) = matches.first().and_then(|c| c.get(0)) else {
        return segment.trim().is_empty().then(Vec::new);
    };
    if !segment[..first.start()].trim().is_empty() {
        return None;
    }

    let mut items = Vec::with_capacity(matches.len());
    for (i, caps) in matches.iter().enumerate() {
        let whole = caps.get(0)?;
        let end = matches
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(segment.len(), |m| m.start());
        let text = segment[whole.end()..end].trim();
        if text.is_empty() {
            return None;
        }
        let label = caps[1].parse().ok()?;
        items.push((label, text.to_string()));
    }
    Some(items)
}

/// Append a segment; if it follows a bar, its first statement is the conclusion.
fn push_segment(
    statements: &mut Vec<ArgdownStatement>,
    segment: Vec<(i64, String)>,
    inference: Option<(Vec<i64>, Option<String>)>,
) -> Option<()> {
    if inference.is_some() && segment.is_empty() {
        return None;
    }
    let mut inference = inference;
    for (label, text) in segment {
        let statement = match inference.take() {
            Some((uses, info)) => ArgdownStatement {
                text,
                label,
                is_conclusion: true,
                uses,
                inference_info: info,
            },
            None => ArgdownStatement {
                text,
                label,
                is_conclusion: false,
                uses: Vec::new(),
                inference_info: None,
            },
        };
        statements.push(statement);
    }
    Some(())
}
