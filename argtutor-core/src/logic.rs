//! First-order formulas in nltk-style syntax.
//!
//! ```text
//! all x.(F(x) -> exists y.(R(x,y) & -G(y)))
//! p | q <-> -(-p & -q)
//! ```
//!
//! Quantifiers (`all`, `exists`, `exist`) bind one or more variables and
//! scope as far to the right as possible. Binding strength, tightest first:
//! `-`, `&`, `|`, `->` (right-associative), `<->`. An argument term bound by
//! an enclosing quantifier is a variable; any other term is a constant.
//! Equality is not supported.

use std::collections::BTreeSet;
use std::fmt;

/// An argument of a predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    Var(String),
    Const(String),
}

impl Term {
    pub fn name(&self) -> &str {
        match self {
            Term::Var(n) | Term::Const(n) => n,
        }
    }
}

/// A first-order formula.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Formula {
    /// Predicate application; zero arguments is a propositional letter.
    Atom { predicate: String, args: Vec<Term> },
    Not(Box<Formula>),
    And(Box<Formula>, Box<Formula>),
    Or(Box<Formula>, Box<Formula>),
    Implies(Box<Formula>, Box<Formula>),
    Iff(Box<Formula>, Box<Formula>),
    Forall(String, Box<Formula>),
    Exists(String, Box<Formula>),
}

impl Formula {
    /// Individual constants occurring in the formula.
    pub fn constants(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_symbols(&mut out, &mut BTreeSet::new());
        out
    }

    /// Predicate symbols and constants occurring in the formula.
    pub fn symbols(&self) -> BTreeSet<String> {
        let mut constants = BTreeSet::new();
        let mut predicates = BTreeSet::new();
        self.collect_symbols(&mut constants, &mut predicates);
        constants.extend(predicates);
        constants
    }

    fn collect_symbols(&self, constants: &mut BTreeSet<String>, predicates: &mut BTreeSet<String>) {
        match self {
            Formula::Atom { predicate, args } => {
                predicates.insert(predicate.clone());
                for arg in args {
                    if let Term::Const(c) = arg {
                        constants.insert(c.clone());
                    }
                }
            }
            Formula::Not(f) | Formula::Forall(_, f) | Formula::Exists(_, f) => {
                f.collect_symbols(constants, predicates)
            }
            Formula::And(a, b)
            | Formula::Or(a, b)
            | Formula::Implies(a, b)
            | Formula::Iff(a, b) => {
                a.collect_symbols(constants, predicates);
                b.collect_symbols(constants, predicates);
            }
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::Atom { predicate, args } if args.is_empty() => write!(f, "{predicate}"),
            Formula::Atom { predicate, args } => {
                let args: Vec<_> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "{predicate}({})", args.join(","))
            }
            Formula::Not(inner) => write!(f, "-{}", Operand(inner)),
            Formula::And(a, b) => write!(f, "({} & {})", Operand(a), Operand(b)),
            Formula::Or(a, b) => write!(f, "({} | {})", Operand(a), Operand(b)),
            Formula::Implies(a, b) => write!(f, "({} -> {})", Operand(a), Operand(b)),
            Formula::Iff(a, b) => write!(f, "({} <-> {})", Operand(a), Operand(b)),
            Formula::Forall(v, body) => write!(f, "all {v}.{body}"),
            Formula::Exists(v, body) => write!(f, "exists {v}.{body}"),
        }
    }
}

/// Quantified operands are parenthesized so their scope does not swallow
/// the rest of the enclosing formula.
struct Operand<'a>(&'a Formula);

impl fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Formula::Forall(..) | Formula::Exists(..) => write!(f, "({})", self.0),
            other => write!(f, "{other}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    LParen,
    RParen,
    Comma,
    Dot,
    Not,
    And,
    Or,
    Implies,
    Iff,
}

fn tokenize(text: &str) -> Option<Vec<Token>> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '.' => {
                tokens.push(Token::Dot);
                i += 1;
            }
            '&' => {
                tokens.push(Token::And);
                i += 1;
            }
            '|' => {
                tokens.push(Token::Or);
                i += 1;
            }
            '-' if chars.get(i + 1) == Some(&'>') => {
                tokens.push(Token::Implies);
                i += 2;
            }
            '-' => {
                tokens.push(Token::Not);
                i += 1;
            }
            '<' if chars.get(i + 1) == Some(&'-') && chars.get(i + 2) == Some(&'>') => {
                tokens.push(Token::Iff);
                i += 3;
            }
            c if c.is_ascii_alphabetic() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            _ => return None,
        }
    }
    Some(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    bound: Vec<String>,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn iff(&mut self) -> Option<Formula> {
        let mut left = self.implication()?;
        while self.eat(&Token::Iff) {
            let right = self.implication()?;
            left = Formula::Iff(Box::new(left), Box::new(right));
        }
        Some(left)
    }

    fn implication(&mut self) -> Option<Formula> {
        let left = self.disjunction()?;
        if self.eat(&Token::Implies) {
            let right = self.implication()?;
            return Some(Formula::Implies(Box::new(left), Box::new(right)));
        }
        Some(left)
    }

    fn disjunction(&mut self) -> Option<Formula> {
        let mut left = self.conjunction()?;
        while self.eat(&Token::Or) {
            let right = self.conjunction()?;
            left = Formula::Or(Box::new(left), Box::new(right));
        }
        Some(left)
    }

    fn conjunction(&mut self) -> Option<Formula> {
        let mut left = self.unary()?;
        while self.eat(&Token::And) {
            let right = self.unary()?;
            left = Formula::And(Box::new(left), Box::new(right));
        }
        Some(left)
    }

    fn unary(&mut self) -> Option<Formula> {
        match self.next()? {
            Token::Not => Some(Formula::Not(Box::new(self.unary()?))),
            Token::LParen => {
                let inner = self.iff()?;
                self.eat(&Token::RParen).then_some(inner)
            }
            Token::Ident(name) if is_quantifier(&name) => self.quantified(&name),
            Token::Ident(name) => self.atom(name),
            _ => None,
        }
    }

    fn quantified(&mut self, quantifier: &str) -> Option<Formula> {
        let mut vars = Vec::new();
        while let Some(Token::Ident(v)) = self.peek().cloned() {
            if is_quantifier(&v) {
                return None;
            }
            self.pos += 1;
            vars.push(v);
        }
        if vars.is_empty() || !self.eat(&Token::Dot) {
            return None;
        }
        let depth = self.bound.len();
        self.bound.extend(vars.iter().cloned());
        // scope extends as far right as possible
        let body = self.iff();
        self.bound.truncate(depth);
        let mut formula = body?;
        for v in vars.into_iter().rev() {
            formula = if quantifier == "all" {
                Formula::Forall(v, Box::new(formula))
            } else {
                Formula::Exists(v, Box::new(formula))
            };
        }
        Some(formula)
    }

    fn atom(&mut self, predicate: String) -> Option<Formula> {
        let mut args = Vec::new();
        if self.eat(&Token::LParen) {
            loop {
                match self.next()? {
                    Token::Ident(name) if !is_quantifier(&name) => args.push(self.term(name)),
                    _ => return None,
                }
                if self.eat(&Token::RParen) {
                    break;
                }
                if !self.eat(&Token::Comma) {
                    return None;
                }
            }
        }
        Some(Formula::Atom { predicate, args })
    }

    fn term(&self, name: String) -> Term {
        if self.bound.contains(&name) {
            Term::Var(name)
        } else {
            Term::Const(name)
        }
    }
}

fn is_quantifier(name: &str) -> bool {
    matches!(name, "all" | "exists" | "exist")
}

/// Parse a formula; `None` if it is not well-formed.
pub fn parse_formula(text: &str) -> Option<Formula> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return None;
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        bound: Vec::new(),
    };
    let formula = parser.iff()?;
    (parser.pos == parser.tokens.len()).then_some(formula)
}

/// Parse each formula of a list; ill-formed entries become `None`.
pub fn parse_formalization(forms: &[crate::aar::Formalization]) -> Vec<Option<Formula>> {
    forms.iter().map(|f| parse_formula(&f.form)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(p: &str, args: &[Term]) -> Formula {
        Formula::Atom {
            predicate: p.to_string(),
            args: args.to_vec(),
        }
    }

    #[test]
    fn parses_propositional_letters() {
        let f = parse_formula("p -> q").unwrap();
        assert_eq!(
            f,
            Formula::Implies(Box::new(atom("p", &[])), Box::new(atom("q", &[])))
        );
    }

    #[test]
    fn quantifier_scope_extends_right() {
        let f = parse_formula("all x.F(x) -> G(x)").unwrap();
        let x = Term::Var("x".into());
        assert_eq!(
            f,
            Formula::Forall(
                "x".into(),
                Box::new(Formula::Implies(
                    Box::new(atom("F", &[x.clone()])),
                    Box::new(atom("G", &[x]))
                ))
            )
        );
    }

    #[test]
    fn unbound_terms_are_constants() {
        let f = parse_formula("R(a,x)").unwrap();
        assert_eq!(
            f,
            atom("R", &[Term::Const("a".into()), Term::Const("x".into())])
        );
        assert_eq!(f.constants().len(), 2);
    }

    #[test]
    fn multiple_bound_variables() {
        let f = parse_formula("exists x y.R(x,y)").unwrap();
        assert!(matches!(f, Formula::Exists(ref v, ref body)
            if v == "x" && matches!(**body, Formula::Exists(ref w, _) if w == "y")));
        assert!(f.constants().is_empty());
    }

    #[test]
    fn precedence_and_binds_tighter_than_or() {
        let f = parse_formula("p | q & r").unwrap();
        assert!(matches!(f, Formula::Or(_, ref b) if matches!(**b, Formula::And(_, _))));
        let g = parse_formula("-p & q").unwrap();
        assert!(matches!(g, Formula::And(ref a, _) if matches!(**a, Formula::Not(_))));
    }

    #[test]
    fn implication_is_right_associative() {
        let f = parse_formula("p -> q -> r").unwrap();
        assert!(matches!(f, Formula::Implies(_, ref b) if matches!(**b, Formula::Implies(_, _))));
    }

    #[test]
    fn display_reparses_to_same_formula() {
        let f = parse_formula("all x.(F(x) -> exists y.(R(x,y) & -G(y))) <-> p").unwrap();
        assert_eq!(parse_formula(&f.to_string()).unwrap(), f);
    }

    #[test]
    fn display_keeps_quantifier_scope() {
        let f = parse_formula("(all x.F(x)) & p").unwrap();
        assert!(matches!(f, Formula::And(_, _)));
        assert_eq!(parse_formula(&f.to_string()).unwrap(), f);
    }

    #[test]
    fn symbols_include_predicates_and_constants() {
        let f = parse_formula("all x.(F(x) -> G(a))").unwrap();
        let symbols: Vec<_> = f.symbols().into_iter().collect();
        assert_eq!(symbols, vec!["F", "G", "a"]);
    }

    #[test]
    fn rejects_malformed_formulas() {
        for text in ["", "F(", "F(a,)", "p &", "all .F(x)", "all x F(x)", "(p", "p q", "a = b", "F(all)"] {
            assert!(parse_formula(text).is_none(), "{text} should be rejected");
        }
    }

    #[test]
    fn formalization_list_keeps_positions() {
        let forms = vec![
            crate::aar::Formalization::new("F(a)", 1),
            crate::aar::Formalization::new("F(", 2),
        ];
        let parsed = parse_formalization(&forms);
        assert!(parsed[0].is_some());
        assert!(parsed[1].is_none());
    }
}
