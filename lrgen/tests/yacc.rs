//! S6: loading `res: aa; aa: /* empty */ | aa 'a';` and parsing
//! `['a', 'a', 'a']` yields `['a', 'a', 'a']`.
//!
//! This pins the external parser-generator contract the front end relies
//! on, the way the reference implementation's own `test_yacc.py` does.

use lrgen::grammar::Value;
use lrgen::{Grammar, LrParserBuilder, Location, Token, TokenSource};
use std::rc::Rc;

struct GenTokens {
    remaining: std::vec::IntoIter<&'static str>,
}

impl GenTokens {
    fn new(symbols: Vec<&'static str>) -> Self {
        GenTokens {
            remaining: symbols.into_iter(),
        }
    }
}

impl TokenSource for GenTokens {
    fn next_token(&mut self) -> Token {
        match self.remaining.next() {
            Some(s) => Token {
                kind: s.to_string(),
                text: s.to_string(),
                location: Location { line_number: 0 },
            },
            None => Token {
                kind: lrgen::grammar::EOF.to_string(),
                text: lrgen::grammar::EOF.to_string(),
                location: Location { line_number: 0 },
            },
        }
    }
}

fn build_list_grammar() -> Grammar {
    let mut g = Grammar::new();
    g.add_terminals(["a"]);
    g.add_production("res", vec!["aa"], Rc::new(|mut v| v.remove(0)));
    g.add_production("aa", vec![], Rc::new(|_| Value::List(Vec::new())));
    g.add_production(
        "aa",
        vec!["aa", "a"],
        Rc::new(|mut v| {
            let tok = match v.remove(1) {
                Value::Token(t) => t,
                other => panic!("expected token, got {:?}", other),
            };
            let mut list = match v.remove(0) {
                Value::List(l) => l,
                other => panic!("expected list, got {:?}", other),
            };
            list.push(tok);
            Value::List(list)
        }),
    );
    g.set_start_symbol("res");
    g
}

#[test]
fn parses_repeated_a_into_a_list_of_as() {
    let grammar = build_list_grammar();
    let parser = LrParserBuilder::new(&grammar)
        .generate_parser()
        .expect("grammar is LR(1)");

    let mut tokens = GenTokens::new(vec!["a", "a", "a"]);
    let result = parser.parse(&mut tokens).expect("input parses");

    assert_eq!(
        result,
        Value::List(vec!["a".to_string(), "a".to_string(), "a".to_string()])
    );
}

#[test]
fn empty_input_parses_to_empty_list() {
    let grammar = build_list_grammar();
    let parser = LrParserBuilder::new(&grammar)
        .generate_parser()
        .expect("grammar is LR(1)");

    let mut tokens = GenTokens::new(vec![]);
    let result = parser.parse(&mut tokens).expect("empty input parses");

    assert_eq!(result, Value::List(Vec::new()));
}
