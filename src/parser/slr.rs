//! Canonical SLR(1) parser: LR(0) item sets, the GOTO graph, ACTION/GOTO
//! tables with shift-wins dangling-else resolution, and a shift-reduce driver
//! that runs the semantic actions to build the AST.

use std::io::{self, Write};

use rustc_hash::{FxHashMap, FxHashSet};

use super::{ParseAction, ParseStep};
use crate::ast::{make_semantic, Program, SemVal};
use crate::grammar::{Grammar, Symbol};
use crate::lexer::token::Token;

/// LR(0) item: a production id and a dot position. Identity is exactly this
/// pair, which also defines the canonical ordering of item sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Item {
  pub prod: usize,
  pub dot: usize,
}

impl Item {
  fn next(self) -> Item {
    Item { prod: self.prod, dot: self.dot + 1 }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlrAction {
  Shift(usize),
  Reduce(usize),
  Accept,
}

pub struct ParseResult {
  pub steps: Vec<ParseStep>,
  pub success: bool,
  pub program: Option<Box<Program>>,
}

struct ItemSet {
  id: usize,
  items: Vec<Item>,
}

pub struct SlrParser {
  grammar: Grammar,
  item_sets: Vec<ItemSet>,
  state_ids: FxHashMap<Vec<Item>, usize>,
  go_func: FxHashMap<(usize, Symbol), usize>,
  action_table: FxHashMap<(usize, Symbol), SlrAction>,
  goto_table: FxHashMap<(usize, Symbol), usize>,
}

impl SlrParser {
  pub fn new(grammar: Grammar) -> Self {
    let mut parser = SlrParser {
      grammar,
      item_sets: vec![],
      state_ids: FxHashMap::default(),
      go_func: FxHashMap::default(),
      action_table: FxHashMap::default(),
      goto_table: FxHashMap::default(),
    };
    parser.init_item_sets();
    parser.calc_action_goto_tables();
    parser
  }

  pub fn grammar(&self) -> &Grammar {
    &self.grammar
  }

  fn dot_symbol(&self, item: Item) -> Option<&Symbol> {
    self.grammar.productions[item.prod].body.get(item.dot)
  }

  fn is_complete(&self, item: Item) -> bool {
    item.dot >= self.grammar.productions[item.prod].body.len()
  }

  /// Closure over "dot before a non-terminal adds that non-terminal's
  /// productions at dot 0". ε-productions also contribute their completed
  /// item so the reduction can fire from this state.
  fn closure(&self, items: &mut FxHashSet<Item>) {
    let mut queue: Vec<Item> = items.iter().copied().collect();
    while let Some(item) = queue.pop() {
      let Some(Symbol::NonTerminal(name)) = self.dot_symbol(item).cloned() else {
        continue;
      };
      for prod in self.grammar.alternates(&name) {
        let new_item = Item { prod, dot: 0 };
        if items.insert(new_item) {
          queue.push(new_item);
        }
        if self.grammar.productions[prod].body.iter().all(Symbol::is_epsilon) {
          let complete = Item { prod, dot: self.grammar.productions[prod].body.len() };
          items.insert(complete);
        }
      }
    }
  }

  fn make_key(items: &FxHashSet<Item>) -> Vec<Item> {
    let mut key: Vec<Item> = items.iter().copied().collect();
    key.sort_unstable();
    key
  }

  fn add_state(&mut self, items: FxHashSet<Item>) -> (usize, bool) {
    let key = Self::make_key(&items);
    if let Some(&id) = self.state_ids.get(&key) {
      return (id, false);
    }
    let id = self.item_sets.len();
    self.item_sets.push(ItemSet { id, items: key.clone() });
    self.state_ids.insert(key, id);
    (id, true)
  }

  /// Symbol ordering used to explore GOTO targets deterministically.
  fn symbol_rank(sym: &Symbol) -> (u8, &str) {
    let kind = match sym {
      Symbol::Terminal(_) => 0,
      Symbol::NonTerminal(_) => 1,
      Symbol::Epsilon => 2,
      Symbol::End => 3,
    };
    (kind, sym.name())
  }

  fn init_item_sets(&mut self) {
    debug_assert_eq!(
      &self.grammar.productions[0].head,
      self.grammar.start_symbol(),
      "production 0 must be the augmented start"
    );

    let mut start_items = FxHashSet::default();
    start_items.insert(Item { prod: 0, dot: 0 });
    self.closure(&mut start_items);
    let (start_id, _) = self.add_state(start_items);

    let mut worklist = vec![start_id];
    while let Some(state) = worklist.pop() {
      let items = self.item_sets[state].items.clone();

      let mut groups: FxHashMap<Symbol, FxHashSet<Item>> = FxHashMap::default();
      for &item in &items {
        match self.dot_symbol(item) {
          Some(sym) if !sym.is_epsilon() => {
            groups.entry(sym.clone()).or_default().insert(item.next());
          }
          _ => {}
        }
      }

      let mut ordered: Vec<(Symbol, FxHashSet<Item>)> = groups.into_iter().collect();
      ordered.sort_by(|a, b| Self::symbol_rank(&a.0).cmp(&Self::symbol_rank(&b.0)));

      for (sym, mut kernel) in ordered {
        self.closure(&mut kernel);
        let (target, inserted) = self.add_state(kernel);
        self.go_func.insert((state, sym), target);
        if inserted {
          worklist.push(target);
        }
      }
    }
  }

  fn calc_action_goto_tables(&mut self) {
    for ((state, sym), &target) in &self.go_func {
      if sym.is_non_terminal() {
        self.goto_table.insert((*state, sym.clone()), target);
      }
    }

    for k in 0..self.item_sets.len() {
      let items = self.item_sets[k].items.clone();

      // shifts: A -> α · a β with GOTO(k, a) = j
      for &item in &items {
        let Some(sym) = self.dot_symbol(item) else {
          continue;
        };
        if !sym.is_terminal() {
          continue;
        }
        let sym = sym.clone();
        if let Some(&j) = self.go_func.get(&(k, sym.clone())) {
          self.action_table.insert((k, sym), SlrAction::Shift(j));
        }
      }

      // reductions and accept: A -> α ·
      for &item in &items {
        if !self.is_complete(item) {
          continue;
        }
        let prod = &self.grammar.productions[item.prod];
        if &prod.head == self.grammar.start_symbol() {
          self.action_table.insert((k, Symbol::End), SlrAction::Accept);
          continue;
        }
        let follow: Vec<Symbol> = self
          .grammar
          .follow_of(&prod.head)
          .map(|set| {
            let mut v: Vec<Symbol> = set.iter().cloned().collect();
            v.sort_by(|a, b| Self::symbol_rank(a).cmp(&Self::symbol_rank(b)));
            v
          })
          .unwrap_or_default();
        for a in follow {
          match self.action_table.get(&(k, a.clone())).copied() {
            // shift wins silently: this is the dangling-else policy
            Some(SlrAction::Shift(_)) | Some(SlrAction::Accept) => {}
            Some(SlrAction::Reduce(kept)) => {
              if kept != item.prod {
                eprintln!(
                  "warning: reduce/reduce conflict in state {} on '{}': keeping production {}, dropping {}",
                  k,
                  a.name(),
                  kept,
                  item.prod
                );
              }
            }
            None => {
              self.action_table.insert((k, a), SlrAction::Reduce(item.prod));
            }
          }
        }
      }
    }
  }

  pub fn num_states(&self) -> usize {
    self.item_sets.len()
  }

  fn item_to_string(&self, item: Item) -> String {
    let prod = &self.grammar.productions[item.prod];
    let mut out = format!("{} ->", prod.head.name());
    for (i, sym) in prod.body.iter().enumerate() {
      if i == item.dot {
        out.push_str(" ·");
      }
      out.push(' ');
      out.push_str(sym.name());
    }
    if item.dot >= prod.body.len() {
      out.push_str(" ·");
    }
    out
  }

  pub fn print_item_sets(&self, out: &mut dyn Write) -> io::Result<()> {
    for set in &self.item_sets {
      writeln!(out, "I{}:", set.id)?;
      for &item in &set.items {
        writeln!(out, "  {}", self.item_to_string(item))?;
      }
      writeln!(out)?;
    }
    Ok(())
  }

  pub fn print_go_function(&self, out: &mut dyn Write) -> io::Result<()> {
    let mut entries: Vec<(&(usize, Symbol), &usize)> = self.go_func.iter().collect();
    entries.sort_by(|a, b| (a.0 .0, Self::symbol_rank(&a.0 .1)).cmp(&(b.0 .0, Self::symbol_rank(&b.0 .1))));
    for ((state, sym), target) in entries {
      writeln!(out, "GO(I{}, {}) = I{}", state, sym.name(), target)?;
    }
    Ok(())
  }

  pub fn print_action_table(&self, out: &mut dyn Write) -> io::Result<()> {
    let mut entries: Vec<(&(usize, Symbol), &SlrAction)> = self.action_table.iter().collect();
    entries.sort_by(|a, b| (a.0 .0, Self::symbol_rank(&a.0 .1)).cmp(&(b.0 .0, Self::symbol_rank(&b.0 .1))));
    for ((state, sym), action) in entries {
      let text = match action {
        SlrAction::Shift(j) => format!("s{}", j),
        SlrAction::Reduce(p) => format!("r{}", p),
        SlrAction::Accept => "acc".to_string(),
      };
      writeln!(out, "ACTION[{}, {}] = {}", state, sym.name(), text)?;
    }
    Ok(())
  }

  pub fn print_goto_table(&self, out: &mut dyn Write) -> io::Result<()> {
    let mut entries: Vec<(&(usize, Symbol), &usize)> = self.goto_table.iter().collect();
    entries.sort_by(|a, b| (a.0 .0, Self::symbol_rank(&a.0 .1)).cmp(&(b.0 .0, Self::symbol_rank(&b.0 .1))));
    for ((state, sym), target) in entries {
      writeln!(out, "GOTO[{}, {}] = {}", state, sym.name(), target)?;
    }
    Ok(())
  }

  /// Shift-reduce driver. Emits a `(top, lookahead, action)` step per move
  /// and runs one semantic action per reduction; the Program root comes off
  /// the value stack on accept.
  pub fn parse(&self, tokens: &[Token]) -> ParseResult {
    let mut state_stack: Vec<usize> = vec![0];
    let mut value_stack: Vec<SemVal> = vec![];
    let mut symbol_stack: Vec<Symbol> = vec![];
    let mut steps: Vec<ParseStep> = Vec::with_capacity(tokens.len() * 2);
    let mut curr = 0usize;

    loop {
      debug_assert_eq!(state_stack.len(), value_stack.len() + 1);
      let state = *state_stack.last().unwrap_or(&0);
      let top = symbol_stack.last().cloned().unwrap_or(Symbol::End);

      let Some(token) = tokens.get(curr) else {
        steps.push(ParseStep::new(top, Symbol::End, ParseAction::Error));
        eprintln!("parse error: unexpected end of input");
        return ParseResult { steps, success: false, program: None };
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
        return ParseResult { steps, success: false, program: None };
      };
      let a = a.clone();

      match self.action_table.get(&(state, a.clone())) {
        Some(&SlrAction::Shift(j)) => {
          steps.push(ParseStep::new(top, a.clone(), ParseAction::Move));
          state_stack.push(j);
          symbol_stack.push(a);
          value_stack.push(make_semantic(token));
          curr += 1;
        }
        Some(&SlrAction::Reduce(pid)) => {
          let prod = &self.grammar.productions[pid];
          let count = prod.body.iter().filter(|s| !s.is_epsilon()).count();
          if state_stack.len() <= count || value_stack.len() < count {
            steps.push(ParseStep::new(top, a, ParseAction::Error));
            eprintln!("parse error: stack underflow reducing {}", prod);
            return ParseResult { steps, success: false, program: None };
          }

          let popped = value_stack.split_off(value_stack.len() - count);
          state_stack.truncate(state_stack.len() - count);
          symbol_stack.truncate(symbol_stack.len() - count);

          let value = (prod.action)(popped);

          let from = *state_stack.last().unwrap_or(&0);
          let Some(&target) = self.goto_table.get(&(from, prod.head.clone())) else {
            steps.push(ParseStep::new(top, a, ParseAction::Error));
            eprintln!("parse error: no GOTO from state {} over {}", from, prod.head.name());
            return ParseResult { steps, success: false, program: None };
          };
          steps.push(ParseStep::new(top, a, ParseAction::Reduction));
          state_stack.push(target);
          symbol_stack.push(prod.head.clone());
          value_stack.push(value);
        }
        Some(&SlrAction::Accept) => {
          steps.push(ParseStep::new(top, a, ParseAction::Accept));
          let program = match value_stack.pop() {
            Some(SemVal::Program(program)) => Some(program),
            _ => None,
          };
          return ParseResult { steps, success: true, program };
        }
        None => {
          steps.push(ParseStep::new(top, a.clone(), ParseAction::Error));
          eprintln!(
            "parse error at line {}, column {}: unexpected '{}'",
            token.loc.line, token.loc.column, token.lexeme
          );
          return ParseResult { steps, success: false, program: None };
        }
      }
    }
  }
}
