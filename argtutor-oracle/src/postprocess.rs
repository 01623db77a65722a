//! Layout of generated argdown.
//!
//! Generated reconstructions come back on a single line. Line breaks are
//! inserted before every statement label and around every inference bar.

use std::sync::LazyLock;

use regex::Regex;

static INFERENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" -{2,}[^-\n]*-{2,} ").expect("valid inference bar regex"));

static LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" \(([0-9]*)\) ").expect("valid label regex"));

/// Put statements and inference bars of a one-line reconstruction on their own lines.
pub fn postprocess_argdown(argdown: &str) -> String {
    let mut out = String::with_capacity(argdown.len() + 16);
    let mut pointer = 0;
    for bar in INFERENCE_RE.find_iter(argdown) {
        out.push_str(&break_statements(&argdown[pointer..bar.start()]));
        out.push('\n');
        out.push_str(&argdown[bar.start() + 1..bar.end() - 1]);
        out.push('\n');
        pointer = bar.end();
    }
    out.push_str(&break_statements(&argdown[pointer..]));
    out
}

fn break_statements(propositions: &str) -> String {
    let mut out = String::with_capacity(propositions.len() + 8);
    let mut pointer = 0;
    for label in LABEL_RE.find_iter(propositions) {
        out.push_str(&propositions[pointer..label.start()]);
        out.push('\n');
        out.push_str(&propositions[label.start() + 1..label.end()]);
        pointer = label.end();
    }
    out.push_str(&propositions[pointer..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breaks_lines_at_labels_and_bars() {
        let argdown =
            "(1) premise 1 -- my inference -- (2) conclusion 2 (3) another premise ---- (4) conclusion";
        assert_eq!(
            postprocess_argdown(argdown),
            "(1) premise 1\n-- my inference --\n(2) conclusion 2\n(3) another premise\n----\n(4) conclusion"
        );
    }

    #[test]
    fn leaves_formatted_argdown_alone() {
        let argdown = "(1) P.\n----\n(2) Q.";
        assert_eq!(postprocess_argdown(argdown), argdown);
    }

    #[test]
    fn postprocessed_argdown_parses() {
        let text = postprocess_argdown(
            "(1) Peter is lonely. (2) If lonely, he calls. -- with modus ponens from (1) (2) -- (3) He calls.",
        );
        let argument = argtutor_core::parse_argdown(&text).unwrap();
        assert_eq!(argument.statements.len(), 3);
        assert_eq!(argument.statements[2].uses, vec![1, 2]);
    }
}
