use std::fmt;
use std::io::Write;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ast::builder::{self, SemanticAction};
use crate::lexer::token::{Token, TokenCategory, TokenType};

pub mod ll1;
pub mod rules;

pub const EPS_NAME: &str = "epsilon";
pub const END_NAME: &str = "$";

/// Grammar symbol. Equality and hashing are structural over (kind, name).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Symbol {
  Terminal(String),
  NonTerminal(String),
  Epsilon,
  End,
}

/// Shorthand terminal constructor.
pub fn t(name: impl Into<String>) -> Symbol {
  Symbol::Terminal(name.into())
}

/// Shorthand non-terminal constructor.
pub fn nt(name: impl Into<String>) -> Symbol {
  Symbol::NonTerminal(name.into())
}

impl Symbol {
  pub fn name(&self) -> &str {
    match self {
      Symbol::Terminal(name) | Symbol::NonTerminal(name) => name,
      Symbol::Epsilon => EPS_NAME,
      Symbol::End => END_NAME,
    }
  }

  pub fn is_terminal(&self) -> bool {
    matches!(self, Symbol::Terminal(_))
  }

  pub fn is_non_terminal(&self) -> bool {
    matches!(self, Symbol::NonTerminal(_))
  }

  pub fn is_epsilon(&self) -> bool {
    matches!(self, Symbol::Epsilon)
  }

  pub fn is_end(&self) -> bool {
    matches!(self, Symbol::End)
  }
}

impl fmt::Display for Symbol {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// Production id marking an entry superseded during grammar rewriting; dead
/// entries are compacted away before any table is built.
pub const INVALID_ID: usize = usize::MAX;

#[derive(Clone)]
pub struct Production {
  pub id: usize,
  pub head: Symbol,
  pub body: Vec<Symbol>,
  pub action: SemanticAction,
}

impl Production {
  pub fn is_valid(&self) -> bool {
    self.id != INVALID_ID
  }
}

impl fmt::Debug for Production {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{}", self)
  }
}

impl fmt::Display for Production {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{} ->", self.head.name())?;
    for sym in &self.body {
      write!(f, " {}", sym.name())?;
    }
    Ok(())
  }
}

/// Context-free grammar with FIRST/FOLLOW sets, the token→terminal map, and
/// optional LL(1) normalization (see `ll1`).
pub struct Grammar {
  pub productions: Vec<Production>,
  production_map: FxHashMap<String, Vec<usize>>,
  terminals: FxHashSet<String>,
  non_terminals: FxHashSet<String>,
  // fixed first-appearance ordering, used by the rewriting passes
  non_terminal_order: Vec<String>,
  start_symbol: Symbol,
  token_map: FxHashMap<(TokenType, TokenCategory), Symbol>,
  first_set: FxHashMap<Symbol, FxHashSet<Symbol>>,
  follow_set: FxHashMap<Symbol, FxHashSet<Symbol>>,
}

impl Grammar {
  fn empty(start: Symbol) -> Self {
    Grammar {
      productions: vec![],
      production_map: FxHashMap::default(),
      terminals: FxHashSet::default(),
      non_terminals: FxHashSet::default(),
      non_terminal_order: vec![],
      start_symbol: start,
      token_map: FxHashMap::default(),
      first_set: FxHashMap::default(),
      follow_set: FxHashMap::default(),
    }
  }

  /// Builds a grammar from raw (head, body) pairs, mostly for tests and
  /// experiments. Semantic actions are inert.
  pub fn from_productions(
    start: &str,
    productions: Vec<(&str, Vec<Symbol>)>,
    normalize: bool,
  ) -> Self {
    let mut grammar = Grammar::empty(nt(start));
    for (head, body) in productions {
      grammar.add_production(head, body, builder::build_nothing);
    }
    if normalize {
      grammar.normalize_ll1();
    }
    grammar.recompute_sets();
    grammar
  }

  pub fn start_symbol(&self) -> &Symbol {
    &self.start_symbol
  }

  pub fn add_production(&mut self, head: &str, body: Vec<Symbol>, action: SemanticAction) {
    assert!(!body.is_empty(), "empty production body for {}: spell epsilon explicitly", head);

    self.register_non_terminal(head);
    for sym in &body {
      match sym {
        Symbol::Terminal(name) => {
          self.terminals.insert(name.clone());
        }
        Symbol::NonTerminal(name) => {
          let name = name.clone();
          self.register_non_terminal(&name);
        }
        Symbol::Epsilon | Symbol::End => {}
      }
    }

    let id = self.productions.len();
    self.production_map.entry(head.to_string()).or_default().push(id);
    self.productions.push(Production { id, head: nt(head), body, action });
  }

  fn register_non_terminal(&mut self, name: &str) {
    if self.non_terminals.insert(name.to_string()) {
      self.non_terminal_order.push(name.to_string());
    }
  }

  /// Live production ids for a head name.
  pub fn alternates(&self, head: &str) -> Vec<usize> {
    self
      .production_map
      .get(head)
      .into_iter()
      .flatten()
      .copied()
      .filter(|&id| self.productions[id].is_valid())
      .collect()
  }

  pub fn map_token(&mut self, ty: TokenType, category: TokenCategory, sym: Symbol) {
    self.token_map.insert((ty, category), sym);
  }

  /// Grammar terminal for a token; lookup ignores the lexeme.
  pub fn terminal_for(&self, token: &Token) -> Option<&Symbol> {
    self.token_map.get(&token.key())
  }

  pub(crate) fn recompute_sets(&mut self) {
    self.compute_first_set();
    self.compute_follow_set();
  }

  pub(crate) fn compute_first_set(&mut self) {
    self.first_set.clear();
    for name in &self.terminals {
      let sym = t(name.clone());
      self.first_set.entry(sym.clone()).or_default().insert(sym);
    }

    let mut changed = true;
    while changed {
      changed = false;
      for i in 0..self.productions.len() {
        if !self.productions[i].is_valid() {
          continue;
        }
        let head = self.productions[i].head.clone();
        let body = self.productions[i].body.clone();
        let first = self.first_of_sequence(&body);
        let entry = self.first_set.entry(head).or_default();
        for sym in first {
          if entry.insert(sym) {
            changed = true;
          }
        }
      }
    }
  }

  /// FIRST of a symbol sequence: terminals derivable leftmost, plus ε iff the
  /// whole sequence is nullable. This is the operation the LL(1) table
  /// builder invokes.
  pub fn first_of_sequence(&self, body: &[Symbol]) -> FxHashSet<Symbol> {
    let mut out = FxHashSet::default();
    let mut all_nullable = true;

    for sym in body {
      match sym {
        Symbol::Epsilon => continue,
        Symbol::Terminal(_) | Symbol::End => {
          out.insert(sym.clone());
          all_nullable = false;
          break;
        }
        Symbol::NonTerminal(_) => {
          let mut nullable = false;
          if let Some(first) = self.first_set.get(sym) {
            for s in first {
              if s.is_epsilon() {
                nullable = true;
              } else {
                out.insert(s.clone());
              }
            }
          }
          if !nullable {
            all_nullable = false;
            break;
          }
        }
      }
    }

    if all_nullable {
      out.insert(Symbol::Epsilon);
    }
    out
  }

  pub(crate) fn compute_follow_set(&mut self) {
    self.follow_set.clear();
    self.follow_set.entry(self.start_symbol.clone()).or_default().insert(Symbol::End);

    let mut changed = true;
    while changed {
      changed = false;
      for i in 0..self.productions.len() {
        if !self.productions[i].is_valid() {
          continue;
        }
        let head = self.productions[i].head.clone();
        let body = self.productions[i].body.clone();
        for (pos, sym) in body.iter().enumerate() {
          if !sym.is_non_terminal() {
            continue;
          }
          let beta_first = self.first_of_sequence(&body[pos + 1..]);
          let nullable_tail = beta_first.iter().any(Symbol::is_epsilon);
          {
            let entry = self.follow_set.entry(sym.clone()).or_default();
            for s in &beta_first {
              if !s.is_epsilon() && entry.insert(s.clone()) {
                changed = true;
              }
            }
          }
          if nullable_tail {
            let head_follow: Vec<Symbol> =
              self.follow_set.get(&head).map(|s| s.iter().cloned().collect()).unwrap_or_default();
            let entry = self.follow_set.entry(sym.clone()).or_default();
            for s in head_follow {
              if entry.insert(s) {
                changed = true;
              }
            }
          }
        }
      }
    }
  }

  pub fn first_of(&self, sym: &Symbol) -> Option<&FxHashSet<Symbol>> {
    self.first_set.get(sym)
  }

  pub fn follow_of(&self, sym: &Symbol) -> Option<&FxHashSet<Symbol>> {
    self.follow_set.get(sym)
  }

  fn sorted_names(set: &FxHashSet<Symbol>) -> Vec<&str> {
    let mut names: Vec<&str> = set.iter().map(Symbol::name).collect();
    names.sort_unstable();
    names
  }

  pub fn print_first_set(&self, out: &mut dyn Write) -> std::io::Result<()> {
    let mut keys: Vec<&Symbol> = self.first_set.keys().collect();
    keys.sort_unstable_by(|a, b| a.name().cmp(b.name()));
    for sym in keys {
      writeln!(out, "FIRST({}) = {{ {} }}", sym.name(), Self::sorted_names(&self.first_set[sym]).join(", "))?;
    }
    Ok(())
  }

  pub fn print_follow_set(&self, out: &mut dyn Write) -> std::io::Result<()> {
    let mut keys: Vec<&Symbol> = self.follow_set.keys().collect();
    keys.sort_unstable_by(|a, b| a.name().cmp(b.name()));
    for sym in keys {
      writeln!(out, "FOLLOW({}) = {{ {} }}", sym.name(), Self::sorted_names(&self.follow_set[sym]).join(", "))?;
    }
    Ok(())
  }
}

impl fmt::Display for Grammar {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    for prod in &self.productions {
      if prod.is_valid() {
        writeln!(f, "{}", prod)?;
      }
    }
    Ok(())
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;

  /// The classic expression grammar:
  ///   S' -> E, E -> E+T | T, T -> T*F | F, F -> (E) | i
  pub(crate) fn expr_grammar(normalize: bool) -> Grammar {
    Grammar::from_productions(
      "S'",
      vec![
        ("S'", vec![nt("E")]),
        ("E", vec![nt("E"), t("+"), nt("T")]),
        ("E", vec![nt("T")]),
        ("T", vec![nt("T"), t("*"), nt("F")]),
        ("T", vec![nt("F")]),
        ("F", vec![t("("), nt("E"), t(")")]),
        ("F", vec![t("i")]),
      ],
      normalize,
    )
  }

  fn names(set: &FxHashSet<Symbol>) -> Vec<String> {
    let mut v: Vec<String> = set.iter().map(|s| s.name().to_string()).collect();
    v.sort();
    v
  }

  #[test]
  fn first_sets_of_expression_grammar() {
    let g = expr_grammar(false);
    for sym in ["E", "T", "F"] {
      assert_eq!(names(g.first_of(&nt(sym)).unwrap()), vec!["(", "i"]);
    }
  }

  #[test]
  fn follow_sets_of_expression_grammar() {
    let g = expr_grammar(false);
    assert_eq!(names(g.follow_of(&nt("E")).unwrap()), vec!["$", ")", "+"]);
    assert_eq!(names(g.follow_of(&nt("T")).unwrap()), vec!["$", ")", "*", "+"]);
    assert_eq!(names(g.follow_of(&nt("F")).unwrap()), vec!["$", ")", "*", "+"]);
  }

  #[test]
  fn follow_of_start_contains_end_marker() {
    let g = expr_grammar(false);
    assert!(g.follow_of(&nt("S'")).unwrap().contains(&Symbol::End));
  }

  #[test]
  fn nullable_first_includes_epsilon() {
    let g = Grammar::from_productions(
      "S",
      vec![
        ("S", vec![nt("A"), t("b")]),
        ("A", vec![t("a")]),
        ("A", vec![Symbol::Epsilon]),
      ],
      false,
    );
    assert_eq!(names(g.first_of(&nt("A")).unwrap()), vec!["a", EPS_NAME]);
    // FIRST(S) sees through the nullable prefix
    assert_eq!(names(g.first_of(&nt("S")).unwrap()), vec!["a", "b"]);
    let seq_first = g.first_of_sequence(&[nt("A")]);
    assert!(seq_first.contains(&Symbol::Epsilon));
  }

  #[test]
  fn first_of_empty_sequence_is_epsilon() {
    let g = expr_grammar(false);
    let first = g.first_of_sequence(&[]);
    assert_eq!(first.len(), 1);
    assert!(first.contains(&Symbol::Epsilon));
  }

  #[test]
  #[should_panic(expected = "empty production body")]
  fn empty_body_is_rejected() {
    Grammar::from_productions("S", vec![("S", vec![])], false);
  }

  #[test]
  fn display_lists_live_productions() {
    let g = expr_grammar(false);
    let text = g.to_string();
    assert!(text.contains("E -> E + T"));
    assert!(text.contains("F -> i"));
    assert_eq!(text.lines().count(), 7);
  }

  #[test]
  fn set_printers_emit_sorted_lines() {
    let g = expr_grammar(false);
    let mut first = Vec::new();
    g.print_first_set(&mut first).unwrap();
    let first = String::from_utf8(first).unwrap();
    assert!(first.contains("FIRST(E) = { (, i }"));

    let mut follow = Vec::new();
    g.print_follow_set(&mut follow).unwrap();
    let follow = String::from_utf8(follow).unwrap();
    assert!(follow.contains("FOLLOW(T) = { $, ), *, + }"));
  }
}
