use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};

use super::nfa::{edge_label, Nfa, Symbol, ANY};

#[derive(Debug, Clone, Copy)]
pub struct Trans {
  pub sym: Symbol,
  pub to: usize,
}

#[derive(Debug, Clone, Default)]
pub struct State {
  pub edges: Vec<Trans>,
  pub token: Option<usize>,
  pub priority: usize,
}

/// Deterministic automaton built from an NFA by subset construction and
/// shrunk by Hopcroft-style partition refinement.
#[derive(Debug, Default)]
pub struct Dfa {
  states: Vec<State>,
  start: usize,
}

struct Group {
  states: Vec<usize>,
  token: Option<usize>,
  priority: usize,
  valid: bool,
}

struct Partition {
  groups: Vec<Group>,
  state_to_group: Vec<usize>,
}

impl Partition {
  fn new(n_states: usize) -> Self {
    Partition { groups: vec![], state_to_group: vec![usize::MAX; n_states] }
  }

  fn add_group(&mut self, states: Vec<usize>, token: Option<usize>, priority: usize) -> usize {
    let gid = self.groups.len();
    for &st in &states {
      self.state_to_group[st] = gid;
    }
    self.groups.push(Group { states, token, priority, valid: true });
    gid
  }

  /// Splits group `gid` against `splitter`. Returns the new group id when the
  /// group was genuinely divided.
  fn split(&mut self, gid: usize, splitter: &FxHashSet<usize>) -> Option<usize> {
    let old = &mut self.groups[gid];
    if !old.valid {
      return None;
    }
    let (inter, diff): (Vec<usize>, Vec<usize>) =
      old.states.iter().copied().partition(|st| splitter.contains(st));
    if inter.is_empty() || diff.is_empty() {
      return None;
    }
    old.states = inter;
    let token = old.token;
    let priority = old.priority;
    Some(self.add_group(diff, token, priority))
  }

  fn find(&self, state: usize) -> usize {
    self.state_to_group[state]
  }
}

impl Dfa {
  /// Subset construction. DFA states are ε-closures of NFA state sets,
  /// canonicalized by their sorted member list.
  pub fn new(nfa: &Nfa) -> Self {
    let mut dfa = Dfa::default();
    if nfa.num_states() == 0 {
      dfa.states.push(State::default());
      return dfa;
    }

    let start_set = nfa.epsilon_closure(&[nfa.start_state()]);

    let mut subset_idx: FxHashMap<Vec<usize>, usize> = FxHashMap::default();
    let mut subsets: Vec<Vec<usize>> = vec![];

    dfa.start = dfa.new_state();
    if let Some((token, priority)) = nfa.computing_accept(&start_set) {
      dfa.states[dfa.start].token = Some(token);
      dfa.states[dfa.start].priority = priority;
    }
    subset_idx.insert(start_set.clone(), dfa.start);
    subsets.push(start_set);

    let mut i = 0;
    while i < subsets.len() {
      let current = subsets[i].clone();
      let from = i;
      for sym in nfa.collect_symbols(&current) {
        let moved = nfa.move_on(&current, sym);
        if moved.is_empty() {
          continue;
        }
        let closure = nfa.epsilon_closure(&moved);
        let to = match subset_idx.get(&closure).copied() {
          Some(id) => id,
          None => {
            let id = dfa.new_state();
            if let Some((token, priority)) = nfa.computing_accept(&closure) {
              dfa.states[id].token = Some(token);
              dfa.states[id].priority = priority;
            }
            subset_idx.insert(closure.clone(), id);
            subsets.push(closure);
            id
          }
        };
        dfa.add_edge(from, to, sym);
      }
      i += 1;
    }
    dfa
  }

  fn new_state(&mut self) -> usize {
    self.states.push(State { edges: vec![], token: None, priority: usize::MAX });
    self.states.len() - 1
  }

  fn add_edge(&mut self, from: usize, to: usize, sym: Symbol) {
    for edge in &mut self.states[from].edges {
      if edge.sym == sym {
        edge.to = to;
        return;
      }
    }
    self.states[from].edges.push(Trans { sym, to });
  }

  pub fn start_state(&self) -> usize {
    self.start
  }

  pub fn num_states(&self) -> usize {
    self.states.len()
  }

  pub fn states(&self) -> &[State] {
    &self.states
  }

  /// Deterministic step. A concrete symbol falls back to an ANY edge when no
  /// literal edge fires.
  pub fn transition(&self, state: usize, sym: Symbol) -> Option<usize> {
    let mut any_target = None;
    for &Trans { sym: edge_sym, to } in &self.states[state].edges {
      if edge_sym == sym {
        return Some(to);
      }
      if sym != ANY && edge_sym == ANY {
        any_target = Some(to);
      }
    }
    any_target
  }

  fn reachable(&self) -> Vec<bool> {
    let mut seen = vec![false; self.states.len()];
    let mut stack = vec![self.start];
    seen[self.start] = true;
    while let Some(u) = stack.pop() {
      for &Trans { to, .. } in &self.states[u].edges {
        if !seen[to] {
          seen[to] = true;
          stack.push(to);
        }
      }
    }
    seen
  }

  fn collect_alphabet(&self) -> Vec<Symbol> {
    let mut alphabet = FxHashSet::default();
    for st in &self.states {
      for &Trans { sym, .. } in &st.edges {
        alphabet.insert(sym);
      }
    }
    let mut res: Vec<Symbol> = alphabet.into_iter().collect();
    res.sort_unstable();
    res
  }

  /// Reverse-edge index over reachable states, built once so refinement stays
  /// near-linear.
  fn build_reverse_edges(&self, reachable: &[bool]) -> Vec<Vec<Trans>> {
    let mut rev: Vec<Vec<Trans>> = vec![vec![]; self.states.len()];
    for (from, st) in self.states.iter().enumerate() {
      if !reachable[from] {
        continue;
      }
      for &Trans { sym, to } in &st.edges {
        if reachable[to] {
          rev[to].push(Trans { sym, to: from });
        }
      }
    }
    rev
  }

  fn find_predecessors(group: &[usize], sym: Symbol, rev: &[Vec<Trans>]) -> FxHashSet<usize> {
    let mut predecessors = FxHashSet::default();
    for &q in group {
      for &Trans { sym: edge_sym, to: from } in &rev[q] {
        if edge_sym == sym {
          predecessors.insert(from);
        }
      }
    }
    predecessors
  }

  /// Hopcroft minimization. The initial partition separates non-accepting
  /// states from accepting ones keyed by (token, priority).
  pub fn minimize(&mut self) {
    let reachable = self.reachable();
    let rev = self.build_reverse_edges(&reachable);
    let alphabet = self.collect_alphabet();

    let mut partition = Partition::new(self.states.len());
    let mut worklist: Vec<usize> = vec![];

    let plain: Vec<usize> = (0..self.states.len())
      .filter(|&i| reachable[i] && self.states[i].token.is_none())
      .collect();
    if !plain.is_empty() {
      worklist.push(partition.add_group(plain, None, usize::MAX));
    }

    let mut accept_groups: FxHashMap<(usize, usize), usize> = FxHashMap::default();
    for i in 0..self.states.len() {
      if !reachable[i] {
        continue;
      }
      if let Some(token) = self.states[i].token {
        let priority = self.states[i].priority;
        match accept_groups.get(&(token, priority)).copied() {
          Some(gid) => {
            partition.groups[gid].states.push(i);
            partition.state_to_group[i] = gid;
          }
          None => {
            let gid = partition.add_group(vec![i], Some(token), priority);
            accept_groups.insert((token, priority), gid);
            worklist.push(gid);
          }
        }
      }
    }

    let mut w = 0;
    while w < worklist.len() {
      let splitter = worklist[w];
      w += 1;
      let splitter_states = partition.groups[splitter].states.clone();
      for &sym in &alphabet {
        let predecessors = Self::find_predecessors(&splitter_states, sym, &rev);
        if predecessors.is_empty() {
          continue;
        }
        for gid in 0..partition.groups.len() {
          if let Some(new_gid) = partition.split(gid, &predecessors) {
            worklist.push(new_gid);
          }
        }
      }
    }

    let mut min = Dfa::default();
    for group in &partition.groups {
      if !group.valid {
        continue;
      }
      let id = min.new_state();
      min.states[id].token = group.token;
      min.states[id].priority = group.priority;
    }
    min.start = partition.find(self.start);

    for i in 0..self.states.len() {
      if !reachable[i] {
        continue;
      }
      let from = partition.find(i);
      for &Trans { sym, to } in &self.states[i].edges {
        if reachable[to] {
          min.add_edge(from, partition.find(to), sym);
        }
      }
    }
    *self = min;
  }
}

/// Mermaid graph of the automaton.
impl fmt::Display for Dfa {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    writeln!(f, "```mermaid")?;
    writeln!(f, "graph TD;")?;
    writeln!(f, "  start((start)) --> S{};", self.start)?;
    for (i, state) in self.states.iter().enumerate() {
      match state.token {
        Some(token) => writeln!(
          f,
          "  S{}([\"S{} (accept rule {}, priority {})\"]);",
          i, i, token, state.priority
        )?,
        None => writeln!(f, "  S{}([\"S{}\"]);", i, i)?,
      }
      for &Trans { sym, to } in &state.edges {
        writeln!(f, "  S{} -- {} --> S{};", i, edge_label(sym), to)?;
      }
    }
    writeln!(f, "```")
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::lexer::regex::Regex;

  fn run(dfa: &Dfa, input: &str) -> Option<usize> {
    let mut state = dfa.start_state();
    for b in input.bytes() {
      state = dfa.transition(state, b as Symbol)?;
    }
    dfa.states()[state].token
  }

  #[test]
  fn subset_construction_matches_pattern() {
    let nfa = Regex::new("(a|b)*abb").compile(0, 0).unwrap();
    let dfa = Dfa::new(&nfa);
    assert_eq!(run(&dfa, "abb"), Some(0));
    assert_eq!(run(&dfa, "aababb"), Some(0));
    assert_eq!(run(&dfa, "ab"), None);
  }

  #[test]
  fn minimize_preserves_language() {
    let nfa = Regex::new("(a|b)*abb").compile(0, 0).unwrap();
    let mut dfa = Dfa::new(&nfa);
    let before = dfa.num_states();
    dfa.minimize();
    assert!(dfa.num_states() <= before);
    // the textbook minimal DFA for (a|b)*abb has 4 states
    assert_eq!(dfa.num_states(), 4);
    assert_eq!(run(&dfa, "abb"), Some(0));
    assert_eq!(run(&dfa, "bbbabb"), Some(0));
    assert_eq!(run(&dfa, "abab"), None);
  }

  #[test]
  fn priority_breaks_accept_ties() {
    // "if" is both a keyword (rule 0) and an identifier shape (rule 1)
    let kw = Regex::new("if").compile(0, 0).unwrap();
    let ident = Regex::new("(i|f)(i|f)*").compile(1, 1).unwrap();
    let mut dfa = Dfa::new(&Nfa::union_many(vec![kw, ident]));
    dfa.minimize();
    assert_eq!(run(&dfa, "if"), Some(0));
    assert_eq!(run(&dfa, "ii"), Some(1));
  }

  #[test]
  fn display_emits_mermaid_graph() {
    let nfa = Regex::new("ab").compile(0, 0).unwrap();
    let mut dfa = Dfa::new(&nfa);
    dfa.minimize();
    let text = dfa.to_string();
    assert!(text.starts_with("```mermaid\n"));
    assert!(text.contains("accept rule 0, priority 0"));
    assert!(text.contains("-- 'a' --> "));
  }

  #[test]
  fn any_edge_fires_when_no_literal_matches() {
    let lit = Regex::new("a").compile(0, 0).unwrap();
    let dot = Regex::new(".").compile(1, 1).unwrap();
    let mut dfa = Dfa::new(&Nfa::union_many(vec![lit, dot]));
    dfa.minimize();
    assert_eq!(run(&dfa, "a"), Some(0));
    assert_eq!(run(&dfa, "z"), Some(1));
    assert_eq!(run(&dfa, "\n"), Some(1));
  }
}
