//! Context-free grammar construction and FIRST-set computation.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

/// The end-of-input pseudo-terminal, matching `baselex.EOF` in the source
/// this module is grounded on.
pub const EOF: &str = "$";

/// A semantic value produced while reducing. Grammars that only care about
/// structural validity (does this input parse at all?) can ignore this and
/// use [`Grammar::add_production_unit`], which always produces `Value::Unit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// No payload; used by productions that exist only to be recognized.
    Unit,
    /// The text of a shifted terminal.
    Token(String),
    /// An accumulated list of terminal texts.
    List(Vec<String>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Token(t) => write!(f, "{}", t),
            Value::List(items) => write!(f, "{:?}", items),
        }
    }
}

/// A reduction action: given the semantic values of a production's body,
/// in order, produce the value for the head nonterminal.
pub type Action = Rc<dyn Fn(Vec<Value>) -> Value>;

/// One grammar rule: `head -> body`.
#[derive(Clone)]
pub struct Production {
    pub head: String,
    pub body: Vec<String>,
    pub action: Action,
}

impl fmt::Debug for Production {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} -> {}", self.head, self.body.join(" "))
    }
}

/// A context-free grammar: terminals, productions, and a start symbol.
///
/// Nonterminals are never declared explicitly; any symbol that appears as
/// the head of a production is one, and anything else is expected to have
/// been declared a terminal via [`Grammar::add_terminals`].
#[derive(Default)]
pub struct Grammar {
    pub(crate) terminals: HashSet<String>,
    pub(crate) productions: Vec<Production>,
    pub(crate) start_symbol: Option<String>,
}

impl Grammar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a batch of terminal symbols.
    pub fn add_terminals<I, S>(&mut self, terms: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.terminals.extend(terms.into_iter().map(Into::into));
    }

    /// Add a production with an explicit reduction action.
    pub fn add_production(&mut self, head: &str, body: Vec<&str>, action: Action) -> usize {
        self.productions.push(Production {
            head: head.to_string(),
            body: body.into_iter().map(str::to_string).collect(),
            action,
        });
        self.productions.len() - 1
    }

    /// Add a production whose reduction is irrelevant; useful for grammars
    /// that are only exercised for their structural properties.
    pub fn add_production_unit(&mut self, head: &str, body: Vec<&str>) -> usize {
        self.add_production(head, body, Rc::new(|_| Value::Unit))
    }

    pub fn set_start_symbol(&mut self, start: &str) {
        self.start_symbol = Some(start.to_string());
    }

    pub fn is_terminal(&self, symbol: &str) -> bool {
        self.terminals.contains(symbol) || symbol == EOF
    }

    pub fn nonterminals(&self) -> HashSet<String> {
        self.productions.iter().map(|p| p.head.clone()).collect()
    }

    pub(crate) fn productions_for(&self, head: &str) -> impl Iterator<Item = (usize, &Production)> {
        self.productions
            .iter()
            .enumerate()
            .filter(move |(_, p)| p.head == head)
    }
}

/// FIRST sets for every nonterminal, plus the set of nullable nonterminals
/// (those that can derive the empty string).
pub struct FirstSets {
    pub first: HashMap<String, HashSet<String>>,
    pub nullable: HashSet<String>,
}

impl FirstSets {
    pub fn compute(grammar: &Grammar) -> Self {
        let nonterminals = grammar.nonterminals();
        let mut first: HashMap<String, HashSet<String>> = HashMap::new();
        let mut nullable: HashSet<String> = HashSet::new();
        for nt in &nonterminals {
            first.insert(nt.clone(), HashSet::new());
        }

        loop {
            let mut changed = false;
            for production in &grammar.productions {
                if production.body.is_empty() {
                    changed |= nullable.insert(production.head.clone());
                    continue;
                }
                let mut all_nullable_so_far = true;
                for symbol in &production.body {
                    if !all_nullable_so_far {
                        break;
                    }
                    if grammar.is_terminal(symbol) {
                        let set = first.get_mut(&production.head).unwrap();
                        changed |= set.insert(symbol.clone());
                        all_nullable_so_far = false;
                    } else {
                        let symbol_first = first.get(symbol).cloned().unwrap_or_default();
                        let set = first.get_mut(&production.head).unwrap();
                        for t in symbol_first {
                            changed |= set.insert(t);
                        }
                        all_nullable_so_far = nullable.contains(symbol);
                    }
                }
                if all_nullable_so_far {
                    changed |= nullable.insert(production.head.clone());
                }
            }
            if !changed {
                break;
            }
        }

        FirstSets { first, nullable }
    }

    fn is_nullable(&self, grammar: &Grammar, symbol: &str) -> bool {
        !grammar.is_terminal(symbol) && self.nullable.contains(symbol)
    }

    /// FIRST of a symbol (terminals are their own FIRST set).
    pub fn first_of(&self, grammar: &Grammar, symbol: &str) -> HashSet<String> {
        if grammar.is_terminal(symbol) {
            let mut s = HashSet::new();
            s.insert(symbol.to_string());
            s
        } else {
            self.first.get(symbol).cloned().unwrap_or_default()
        }
    }

    /// FIRST of a symbol sequence followed by a known lookahead terminal,
    /// i.e. `FIRST(beta . lookahead)` in the dragon-book sense used by
    /// canonical LR(1) item-set closure.
    pub fn first_of_sequence(&self, grammar: &Grammar, seq: &[String], lookahead: &str) -> HashSet<String> {
        let mut result = HashSet::new();
        let mut all_nullable = true;
        for symbol in seq {
            result.extend(self.first_of(grammar, symbol));
            if !self.is_nullable(grammar, symbol) {
                all_nullable = false;
                break;
            }
        }
        if all_nullable {
            result.insert(lookahead.to_string());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nullable_and_first_for_empty_alternative() {
        let mut g = Grammar::new();
        g.add_terminals(["a"]);
        g.add_production_unit("res", vec!["aa"]);
        g.add_production_unit("aa", vec![]);
        g.add_production_unit("aa", vec!["aa", "a"]);
        g.set_start_symbol("res");

        let sets = FirstSets::compute(&g);
        assert!(sets.nullable.contains("aa"));
        assert!(sets.nullable.contains("res"));
        assert!(sets.first["aa"].contains("a"));
        assert!(sets.first["res"].contains("a"));
    }
}
