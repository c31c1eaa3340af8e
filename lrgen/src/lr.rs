//! Canonical LR(1) item-set construction and a table-driven parser.
//!
//! This is a straightforward dragon-book construction: canonical
//! collection of LR(1) item sets, ACTION/GOTO tables built from it, and a
//! shift-reduce driver loop over those tables. Shift/reduce conflicts are
//! resolved in favor of shift (the conventional yacc default); reduce/reduce
//! conflicts are unresolvable and fail parser generation.

use crate::error::{GenResult, Location, ParseResult, ParserError, ParserGenerationError};
use crate::grammar::{FirstSets, Grammar, Value, EOF};
use std::collections::{BTreeSet, HashMap};

/// `head -> body1 . body2, lookahead`
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
struct Item {
    production: usize,
    dot: usize,
    lookahead: String,
}

type ItemSet = BTreeSet<Item>;

/// The augmented grammar's synthetic start production is always index
/// `productions.len()` relative to the original grammar; we store it
/// alongside instead, to avoid mutating the caller's grammar.
struct Augmented<'g> {
    grammar: &'g Grammar,
    first: FirstSets,
    start_production: (String, Vec<String>),
}

impl<'g> Augmented<'g> {
    fn production(&self, index: usize) -> (&str, &[String]) {
        if index == self.grammar.productions.len() {
            (&self.start_production.0, &self.start_production.1)
        } else {
            let p = &self.grammar.productions[index];
            (&p.head, &p.body)
        }
    }

    fn symbol_after_dot(&self, item: &Item) -> Option<String> {
        let (_, body) = self.production(item.production);
        body.get(item.dot).cloned()
    }

    fn closure(&self, items: ItemSet) -> ItemSet {
        let mut set = items;
        loop {
            let mut additions = Vec::new();
            for item in &set {
                let Some(symbol) = self.symbol_after_dot(item) else {
                    continue;
                };
                if self.grammar.is_terminal(&symbol) {
                    continue;
                }
                let (_, body) = self.production(item.production);
                let beta = &body[item.dot + 1..];
                let lookaheads = self.first.first_of_sequence(self.grammar, beta, &item.lookahead);

                for (prod_idx, production) in self.grammar.productions_for(&symbol) {
                    for la in &lookaheads {
                        let new_item = Item {
                            production: prod_idx,
                            dot: 0,
                            lookahead: la.clone(),
                        };
                        if !set.contains(&new_item) {
                            additions.push(new_item);
                        }
                        let _ = production;
                    }
                }
            }
            if additions.is_empty() {
                break;
            }
            set.extend(additions);
        }
        set
    }

    fn goto(&self, items: &ItemSet, symbol: &str) -> ItemSet {
        let mut moved = ItemSet::new();
        for item in items {
            if self.symbol_after_dot(item).as_deref() == Some(symbol) {
                moved.insert(Item {
                    production: item.production,
                    dot: item.dot + 1,
                    lookahead: item.lookahead.clone(),
                });
            }
        }
        self.closure(moved)
    }

    fn all_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.grammar.terminals.iter().cloned().collect();
        symbols.extend(self.grammar.nonterminals());
        symbols
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Action {
    Shift(usize),
    Reduce(usize),
    Accept,
}

/// A built LR(1) parser: ACTION/GOTO tables plus enough of the grammar to
/// run reductions.
pub struct LrParser {
    action: HashMap<(usize, String), Action>,
    goto: HashMap<(usize, String), usize>,
    productions: Vec<(String, Vec<String>, crate::grammar::Action)>,
    start_state: usize,
}

/// Builds an [`LrParser`] from a [`Grammar`], or fails with a
/// [`ParserGenerationError`] if the grammar is not LR(1).
pub struct LrParserBuilder<'g> {
    grammar: &'g Grammar,
}

impl<'g> LrParserBuilder<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        LrParserBuilder { grammar }
    }

    pub fn generate_parser(&self) -> GenResult<LrParser> {
        let start = self.grammar.start_symbol.clone().ok_or_else(|| ParserGenerationError {
            message: "grammar has no start symbol".to_string(),
        })?;

        let augmented_head = format!("{}'", start);
        let aug = Augmented {
            grammar: self.grammar,
            first: FirstSets::compute(self.grammar),
            start_production: (augmented_head.clone(), vec![start.clone()]),
        };

        let start_production_index = self.grammar.productions.len();
        let start_item = Item {
            production: start_production_index,
            dot: 0,
            lookahead: EOF.to_string(),
        };
        let start_state_items = aug.closure(ItemSet::from([start_item]));

        let mut states: Vec<ItemSet> = vec![start_state_items];
        let mut transitions: HashMap<(usize, String), usize> = HashMap::new();

        let mut frontier = vec![0usize];
        while let Some(state_idx) = frontier.pop() {
            let items = states[state_idx].clone();
            for symbol in aug.all_symbols() {
                let target = aug.goto(&items, &symbol);
                if target.is_empty() {
                    continue;
                }
                let target_idx = match states.iter().position(|s| *s == target) {
                    Some(idx) => idx,
                    None => {
                        states.push(target);
                        let idx = states.len() - 1;
                        frontier.push(idx);
                        idx
                    }
                };
                transitions.insert((state_idx, symbol), target_idx);
            }
        }

        let mut action: HashMap<(usize, String), Action> = HashMap::new();
        let mut goto: HashMap<(usize, String), usize> = HashMap::new();

        for (&(state_idx, ref symbol), &target) in &transitions {
            if self.grammar.is_terminal(symbol) {
                insert_shift(&mut action, state_idx, symbol.clone(), target)?;
            } else {
                goto.insert((state_idx, symbol.clone()), target);
            }
        }

        for (state_idx, items) in states.iter().enumerate() {
            for item in items {
                let (_, body) = aug.production(item.production);
                if item.dot != body.len() {
                    continue;
                }
                if item.production == start_production_index {
                    if item.lookahead == EOF {
                        action.insert((state_idx, EOF.to_string()), Action::Accept);
                    }
                    continue;
                }
                insert_reduce(
                    &mut action,
                    self.grammar,
                    state_idx,
                    item.lookahead.clone(),
                    item.production,
                )?;
            }
        }

        let productions = self
            .grammar
            .productions
            .iter()
            .map(|p| (p.head.clone(), p.body.clone(), p.action.clone()))
            .collect();

        log::debug!(
            "built LR(1) parser: {} states, {} productions",
            states.len(),
            self.grammar.productions.len()
        );

        Ok(LrParser {
            action,
            goto,
            productions,
            start_state: 0,
        })
    }
}

fn insert_shift(
    action: &mut HashMap<(usize, String), Action>,
    state: usize,
    terminal: String,
    target: usize,
) -> GenResult<()> {
    // Shift always wins over a previously recorded reduce: this is the
    // classic shift/reduce resolution rule.
    action.insert((state, terminal), Action::Shift(target));
    Ok(())
}

fn insert_reduce(
    action: &mut HashMap<(usize, String), Action>,
    grammar: &Grammar,
    state: usize,
    terminal: String,
    production: usize,
) -> GenResult<()> {
    match action.get(&(state, terminal.clone())) {
        Some(Action::Shift(_)) | Some(Action::Accept) => {
            // Shift (or a pre-existing accept) wins; silently keep it.
        }
        Some(Action::Reduce(existing)) if *existing != production => {
            return Err(ParserGenerationError {
                message: format!(
                    "reduce/reduce conflict in state {} on lookahead '{}' between '{}' and '{}'",
                    state,
                    terminal,
                    grammar.productions[*existing].head,
                    grammar.productions[production].head
                ),
            });
        }
        _ => {
            action.insert((state, terminal), Action::Reduce(production));
        }
    }
    Ok(())
}

/// A source of tokens for [`LrParser::parse`].
pub trait TokenSource {
    fn next_token(&mut self) -> Token;
}

/// A single lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: String,
    pub text: String,
    pub location: Location,
}

impl LrParser {
    /// Drive the parser over `tokens` to completion, returning the
    /// semantic value produced by reducing the start symbol.
    pub fn parse(&self, tokens: &mut dyn TokenSource) -> ParseResult<Value> {
        let mut state_stack: Vec<usize> = vec![self.start_state];
        let mut value_stack: Vec<Value> = Vec::new();
        let mut lookahead = tokens.next_token();

        loop {
            let state = *state_stack.last().unwrap();
            match self.action.get(&(state, lookahead.kind.clone())) {
                Some(Action::Shift(target)) => {
                    value_stack.push(Value::Token(lookahead.text.clone()));
                    state_stack.push(*target);
                    lookahead = tokens.next_token();
                }
                Some(Action::Reduce(prod_idx)) => {
                    let (head, body, reducer) = &self.productions[*prod_idx];
                    let arity = body.len();
                    let args = value_stack.split_off(value_stack.len() - arity);
                    state_stack.truncate(state_stack.len() - arity);
                    let value = reducer(args);
                    let from_state = *state_stack.last().unwrap();
                    let target = *self.goto.get(&(from_state, head.clone())).ok_or_else(|| ParserError {
                        location: lookahead.location,
                        message: format!("no goto for '{}' from state {}", head, from_state),
                    })?;
                    state_stack.push(target);
                    value_stack.push(value);
                }
                Some(Action::Accept) => {
                    return Ok(value_stack.pop().unwrap_or(Value::Unit));
                }
                None => {
                    return Err(ParserError {
                        location: lookahead.location,
                        message: format!("unexpected token '{}' ({})", lookahead.text, lookahead.kind),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Grammar;
    use std::rc::Rc;

    struct TokenFeed {
        tokens: std::vec::IntoIter<(&'static str, &'static str)>,
    }

    impl TokenFeed {
        fn new(kinds: Vec<&'static str>) -> Self {
            TokenFeed {
                tokens: kinds.into_iter().map(|k| (k, k)).collect::<Vec<_>>().into_iter(),
            }
        }
    }

    impl TokenSource for TokenFeed {
        fn next_token(&mut self) -> Token {
            match self.tokens.next() {
                Some((kind, text)) => Token {
                    kind: kind.to_string(),
                    text: text.to_string(),
                    location: Location { line_number: 1 },
                },
                None => Token {
                    kind: EOF.to_string(),
                    text: EOF.to_string(),
                    location: Location { line_number: 1 },
                },
            }
        }
    }

    #[test]
    fn simple_expression_grammar_parses() {
        let mut g = Grammar::new();
        g.add_terminals(["identifier", "(", ")", "+", "*"]);
        g.add_production_unit("input", vec!["expression"]);
        g.add_production_unit("expression", vec!["term"]);
        g.add_production_unit("expression", vec!["expression", "+", "term"]);
        g.add_production_unit("term", vec!["factor"]);
        g.add_production_unit("term", vec!["term", "*", "factor"]);
        g.add_production_unit("factor", vec!["(", "expression", ")"]);
        g.add_production_unit("factor", vec!["identifier"]);
        g.set_start_symbol("input");

        let parser = LrParserBuilder::new(&g).generate_parser().unwrap();
        let mut feed = TokenFeed::new(vec!["identifier", "+", "identifier", "+", "identifier"]);
        parser.parse(&mut feed).unwrap();
    }

    #[test]
    fn reduce_reduce_conflict_is_rejected() {
        let mut g = Grammar::new();
        g.add_terminals(["id"]);
        g.add_production_unit("goal", vec!["a"]);
        g.add_production_unit("a", vec!["b"]);
        g.add_production_unit("a", vec!["c"]);
        g.add_production_unit("b", vec!["id"]);
        g.add_production_unit("c", vec!["id"]);
        g.set_start_symbol("goal");

        assert!(LrParserBuilder::new(&g).generate_parser().is_err());
    }

    #[test]
    fn shift_reduce_conflict_resolves_to_shift() {
        let mut g = Grammar::new();
        g.add_terminals(["if", "then", "else", "ass"]);
        g.add_production_unit("if_stmt", vec!["if", "then", "stmt"]);
        g.add_production_unit("if_stmt", vec!["if", "then", "stmt", "else", "stmt"]);
        g.add_production_unit("stmt", vec!["if_stmt"]);
        g.add_production_unit("stmt", vec!["ass"]);
        g.set_start_symbol("stmt");

        let parser = LrParserBuilder::new(&g).generate_parser().unwrap();
        let mut feed = TokenFeed::new(vec!["if", "then", "if", "then", "ass", "else", "ass"]);
        parser.parse(&mut feed).unwrap();
    }

    #[test]
    fn reduces_list_of_as() {
        let mut g = Grammar::new();
        g.add_terminals(["a"]);
        g.add_production("res", vec!["aa"], Rc::new(|mut v| v.remove(0)));
        g.add_production("aa", vec![], Rc::new(|_| Value::List(vec![])));
        g.add_production(
            "aa",
            vec!["aa", "a"],
            Rc::new(|mut v| {
                let tok = match v.remove(1) {
                    Value::Token(t) => t,
                    _ => unreachable!(),
                };
                let mut list = match v.remove(0) {
                    Value::List(l) => l,
                    _ => unreachable!(),
                };
                list.push(tok);
                Value::List(list)
            }),
        );
        g.set_start_symbol("res");

        let parser = LrParserBuilder::new(&g).generate_parser().unwrap();
        let mut feed = TokenFeed::new(vec!["a", "a", "a"]);
        let value = parser.parse(&mut feed).unwrap();
        assert_eq!(value, Value::List(vec!["a".into(), "a".into(), "a".into()]));
    }
}
