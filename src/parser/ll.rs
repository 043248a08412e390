//! Predictive LL(1) parser. Builds the M[A, a] table from FIRST/FOLLOW and
//! drives a symbol stack over the token stream, producing a trace. Table
//! overlaps are latent conflicts: the grammar has already warned, the last
//! writer wins.

use std::io::{self, Write};

use rustc_hash::FxHashMap;

use super::{ParseAction, ParseStep};
use crate::grammar::{Grammar, Symbol};
use crate::lexer::token::Token;

pub struct ParseResult {
  pub steps: Vec<ParseStep>,
  pub success: bool,
}

pub struct LL1Parser {
  grammar: Grammar,
  parse_table: FxHashMap<(Symbol, Symbol), usize>,
}

impl LL1Parser {
  /// Expects a grammar already in LL(1) shape (see `Grammar::normalize_ll1`);
  /// diagnoses remaining conflicts to stderr before building the table.
  pub fn new(grammar: Grammar) -> Self {
    if grammar.has_back_tracing(&mut io::stderr()) {
      eprintln!("warning: the grammar has back-tracing conflicts");
    }
    let mut parser = LL1Parser { grammar, parse_table: FxHashMap::default() };
    parser.compute_parse_table();
    parser
  }

  pub fn grammar(&self) -> &Grammar {
    &self.grammar
  }

  fn compute_parse_table(&mut self) {
    for prod in &self.grammar.productions {
      if !prod.is_valid() {
        continue;
      }
      let first_alpha = self.grammar.first_of_sequence(&prod.body);

      for a in &first_alpha {
        if a.is_epsilon() {
          continue;
        }
        self.parse_table.insert((prod.head.clone(), a.clone()), prod.id);
      }

      if first_alpha.iter().any(Symbol::is_epsilon) {
        if let Some(follow) = self.grammar.follow_of(&prod.head) {
          for b in follow {
            self.parse_table.insert((prod.head.clone(), b.clone()), prod.id);
          }
        }
      }
    }
  }

  pub fn print_parse_table(&self, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "LL(1) parse table with {} entries", self.parse_table.len())?;
    let mut entries: Vec<(&(Symbol, Symbol), &usize)> = self.parse_table.iter().collect();
    entries.sort_by(|a, b| {
      (a.0 .0.name(), a.0 .1.name()).cmp(&(b.0 .0.name(), b.0 .1.name()))
    });
    for ((head, lookahead), id) in entries {
      writeln!(
        out,
        "M[{}, {}] = {}",
        head.name(),
        lookahead.name(),
        self.grammar.productions[*id]
      )?;
    }
    Ok(())
  }

  /// Stack-driven predictive parse. Stops at the first error; the trace up to
  /// and including the failing step is returned.
  pub fn parse(&self, tokens: &[Token]) -> ParseResult {
    let mut stack = vec![Symbol::End, self.grammar.start_symbol().clone()];
    let mut steps: Vec<ParseStep> = Vec::with_capacity(tokens.len() * 2);
    let mut curr = 0usize;

    while let Some(top) = stack.last().cloned() {
      let Some(token) = tokens.get(curr) else {
        steps.push(ParseStep::new(top, Symbol::End, ParseAction::Error));
        eprintln!("parse error: unexpected end of input");
        return ParseResult { steps, success: false };
      };

      let Some(a) = self.grammar.terminal_for(token) else {
        steps.push(ParseStep::new(
          top,
          Symbol::Terminal(token.lexeme.clone()),
          ParseAction::Error,
        ));
        eprintln!(
          "parse error at line {}, column {}: unexpected token '{}'",
          token.loc.line, token.loc.column, token.lexeme
        );
        return ParseResult { steps, success: false };
      };
      let a = a.clone();

      if top.is_end() && a.is_end() {
        steps.push(ParseStep::new(top, a, ParseAction::Accept));
        stack.pop();
        return ParseResult { steps, success: true };
      }

      if top.is_terminal() || top.is_end() {
        if top == a {
          steps.push(ParseStep::new(top, a, ParseAction::Move));
          stack.pop();
          curr += 1;
        } else {
          steps.push(ParseStep::new(top.clone(), a.clone(), ParseAction::Error));
          eprintln!(
            "parse error at line {}, column {}: expected '{}', found '{}'",
            token.loc.line,
            token.loc.column,
            top.name(),
            a.name()
          );
          return ParseResult { steps, success: false };
        }
      } else if top.is_non_terminal() {
        if let Some(&id) = self.parse_table.get(&(top.clone(), a.clone())) {
          steps.push(ParseStep::new(top, a, ParseAction::Reduction));
          stack.pop();
          for sym in self.grammar.productions[id].body.iter().rev() {
            if !sym.is_epsilon() {
              stack.push(sym.clone());
            }
          }
        } else {
          steps.push(ParseStep::new(top.clone(), a.clone(), ParseAction::Error));
          eprintln!(
            "parse error at line {}, column {}: no production for M[{}, {}]",
            token.loc.line,
            token.loc.column,
            top.name(),
            a.name()
          );
          return ParseResult { steps, success: false };
        }
      } else {
        // explicit ε on the stack disappears without consuming input
        stack.pop();
      }
    }

    ParseResult { steps, success: false }
  }
}
