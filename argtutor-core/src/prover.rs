//! Entailment checking for formalized arguments.
//!
//! [`ModelSearchProver`] decides `premises |= conclusion` by looking for a
//! finite countermodel. Without equality, a countermodel over `n` elements
//! extends to one over `n + 1` elements by duplicating an element, so it is
//! enough to search the largest domain: one element per constant plus
//! `max_fresh_individuals` anonymous ones. Quantifiers are expanded over
//! that domain and the resulting ground atoms are searched with a
//! three-valued backtracking procedure that prunes as soon as the
//! refutation target is decided.
//!
//! Every countermodel found is genuine, so a valid inference is never
//! rejected unless the problem exceeds `max_atoms`. An invalid inference
//! whose smallest countermodel needs more elements than the domain offers
//! is accepted; two fresh individuals cover the quantifier patterns of
//! typical formalizations.

use std::collections::{BTreeSet, HashMap};

use tracing::warn;

use crate::logic::{Formula, Term};

/// A first-order theorem prover.
pub trait Prover: Send + Sync {
    /// Whether the premises entail the conclusion.
    fn prove(&self, conclusion: &Formula, premises: &[Formula]) -> bool;
}

/// Bounded finite-model search.
#[derive(Debug, Clone)]
pub struct ModelSearchProver {
    max_fresh_individuals: usize,
    max_atoms: usize,
}

impl ModelSearchProver {
    pub fn new(max_fresh_individuals: usize, max_atoms: usize) -> Self {
        Self {
            max_fresh_individuals,
            max_atoms,
        }
    }
}

impl Default for ModelSearchProver {
    fn default() -> Self {
        Self::new(2, 20)
    }
}

impl Prover for ModelSearchProver {
    fn prove(&self, conclusion: &Formula, premises: &[Formula]) -> bool {
        let mut constants = conclusion.constants();
        for premise in premises {
            constants.extend(premise.constants());
        }
        let domain_size = (constants.len() + self.max_fresh_individuals).max(1);

        let mut grounder = Grounder::new(&constants);
        let mut conjuncts: Vec<Ground> = premises
            .iter()
            .map(|p| grounder.ground(p, domain_size, &mut Vec::new()))
            .collect();
        let negated = Ground::Not(Box::new(grounder.ground(
            conclusion,
            domain_size,
            &mut Vec::new(),
        )));
        conjuncts.push(negated);
        let target = Ground::And(conjuncts);

        let n_atoms = grounder.atoms.len();
        if n_atoms > self.max_atoms {
            warn!(
                atoms = n_atoms,
                max_atoms = self.max_atoms,
                "entailment problem too large, reporting not proven"
            );
            return false;
        }

        let mut assignment = vec![None; n_atoms];
        !satisfiable(&target, &mut assignment, 0)
    }
}

/// Propositional skeleton over ground atoms.
#[derive(Debug, Clone)]
enum Ground {
    Atom(usize),
    Not(Box<Ground>),
    And(Vec<Ground>),
    Or(Vec<Ground>),
}

impl Ground {
    /// Three-valued evaluation under a partial assignment.
    fn eval(&self, assignment: &[Option<bool>]) -> Option<bool> {
        match self {
            Ground::Atom(i) => assignment[*i],
            Ground::Not(inner) => inner.eval(assignment).map(|v| !v),
            Ground::And(parts) => {
                let mut undecided = false;
                for part in parts {
                    match part.eval(assignment) {
                        Some(false) => return Some(false),
                        None => undecided = true,
                        Some(true) => {}
                    }
                }
                if undecided { None } else { Some(true) }
            }
            Ground::Or(parts) => {
                let mut undecided = false;
                for part in parts {
                    match part.eval(assignment) {
                        Some(true) => return Some(true),
                        None => undecided = true,
                        Some(false) => {}
                    }
                }
                if undecided { None } else { Some(false) }
            }
        }
    }
}

fn satisfiable(target: &Ground, assignment: &mut [Option<bool>], next: usize) -> bool {
    match target.eval(assignment) {
        Some(value) => value,
        None if next >= assignment.len() => false,
        None => {
            for value in [true, false] {
                assignment[next] = Some(value);
                if satisfiable(target, assignment, next + 1) {
                    assignment[next] = None;
                    return true;
                }
            }
            assignment[next] = None;
            false
        }
    }
}

/// Expands quantifiers over a finite domain and numbers ground atoms.
struct Grounder {
    constants: HashMap<String, usize>,
    atoms: HashMap<(String, Vec<usize>), usize>,
}

impl Grounder {
    fn new(constants: &BTreeSet<String>) -> Self {
        Self {
            constants: constants
                .iter()
                .enumerate()
                .map(|(i, c)| (c.clone(), i))
                .collect(),
            atoms: HashMap::new(),
        }
    }

    fn atom(&mut self, predicate: &str, args: Vec<usize>) -> usize {
        let next = self.atoms.len();
        *self
            .atoms
            .entry((predicate.to_string(), args))
            .or_insert(next)
    }

    fn element(&self, term: &Term, env: &[(String, usize)]) -> usize {
        match term {
            Term::Var(v) => env
                .iter()
                .rev()
                .find(|(name, _)| name == v)
                .map(|(_, e)| *e)
                .unwrap_or(0),
            Term::Const(c) => self.constants.get(c).copied().unwrap_or(0),
        }
    }

    fn ground(&mut self, formula: &Formula, domain: usize, env: &mut Vec<(String, usize)>) -> Ground {
        match formula {
            Formula::Atom { predicate, args } => {
                let elements = args.iter().map(|t| self.element(t, env)).collect();
                Ground::Atom(self.atom(predicate, elements))
            }
            Formula::Not(f) => Ground::Not(Box::new(self.ground(f, domain, env))),
            Formula::And(a, b) => {
                Ground::And(vec![self.ground(a, domain, env), self.ground(b, domain, env)])
            }
            Formula::Or(a, b) => {
                Ground::Or(vec![self.ground(a, domain, env), self.ground(b, domain, env)])
            }
            Formula::Implies(a, b) => Ground::Or(vec![
                Ground::Not(Box::new(self.ground(a, domain, env))),
                self.ground(b, domain, env),
            ]),
            Formula::Iff(a, b) => {
                let ga = self.ground(a, domain, env);
                let gb = self.ground(b, domain, env);
                Ground::Or(vec![
                    Ground::And(vec![ga.clone(), gb.clone()]),
                    Ground::And(vec![Ground::Not(Box::new(ga)), Ground::Not(Box::new(gb))]),
                ])
            }
            Formula::Forall(v, body) => Ground::And(self.instances(v, body, domain, env)),
            Formula::Exists(v, body) => Ground::Or(self.instances(v, body, domain, env)),
        }
    }

    fn instances(
        &mut self,
        var: &str,
        body: &Formula,
        domain: usize,
        env: &mut Vec<(String, usize)>,
    ) -> Vec<Ground> {
        (0..domain)
            .map(|e| {
                env.push((var.to_string(), e));
                let g = self.ground(body, domain, env);
                env.pop();
                g
            })
            .collect()
    }
}
