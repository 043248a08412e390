//! LL(1) normalization: Paull-style left-recursion elimination followed by
//! left factoring, plus the FIRST/FIRST and FIRST/FOLLOW conflict diagnosis
//! used to warn before predictive parsing.
//!
//! The prefix substitution inside left factoring assumes a well-behaved
//! grammar and runs without a termination guard.

use std::io::Write;

use rustc_hash::{FxHashMap, FxHashSet};

use super::{nt, Grammar, Symbol, INVALID_ID};
use crate::ast::builder;

/// Concatenates two body fragments, dropping explicit ε symbols. An empty
/// result is spelled as the single ε body.
fn concat_bodies(left: &[Symbol], right: &[Symbol]) -> Vec<Symbol> {
  let mut out: Vec<Symbol> =
    left.iter().chain(right.iter()).filter(|s| !s.is_epsilon()).cloned().collect();
  if out.is_empty() {
    out.push(Symbol::Epsilon);
  }
  out
}

impl Grammar {
  /// Rewrites the grammar so that no non-terminal is left-recursive and no
  /// two alternates of one non-terminal share a length-1 FIRST prefix.
  pub fn normalize_ll1(&mut self) {
    self.eliminate_left_recursion();
    self.left_refactor();
    self.recompute_sets();
  }

  /// Fresh non-terminal name derived from `base` by appending apostrophes.
  pub(crate) fn prime_name(&self, base: &str) -> String {
    let mut name = format!("{}'", base);
    while self.non_terminals.contains(&name) {
      name.push('\'');
    }
    name
  }

  fn invalidate(&mut self, id: usize) {
    self.productions[id].id = INVALID_ID;
  }

  /// Paull's algorithm over the fixed first-appearance ordering.
  fn eliminate_left_recursion(&mut self) {
    let order = self.non_terminal_order.clone();
    for i in 0..order.len() {
      let ai = order[i].clone();

      // substitute earlier non-terminals out of leading position
      for aj in order.iter().take(i) {
        let targets: Vec<usize> = self
          .alternates(&ai)
          .into_iter()
          .filter(|&id| self.productions[id].body[0] == nt(aj.clone()))
          .collect();
        for id in targets {
          let gamma = self.productions[id].body[1..].to_vec();
          let deltas: Vec<Vec<Symbol>> =
            self.alternates(aj).into_iter().map(|d| self.productions[d].body.clone()).collect();
          self.invalidate(id);
          for delta in deltas {
            self.add_production(&ai, concat_bodies(&delta, &gamma), builder::build_nothing);
          }
        }
      }

      // immediate left recursion: A -> Aα | β  becomes  A -> β A', A' -> α A' | ε
      let alts = self.alternates(&ai);
      let (recursive, rest): (Vec<usize>, Vec<usize>) =
        alts.into_iter().partition(|&id| self.productions[id].body[0] == nt(ai.clone()));
      if recursive.is_empty() {
        continue;
      }
      let primed = self.prime_name(&ai);

      for id in rest {
        let beta = self.productions[id].body.clone();
        self.invalidate(id);
        self.add_production(&ai, concat_bodies(&beta, &[nt(primed.clone())]), builder::build_nothing);
      }
      for id in recursive {
        let alpha = self.productions[id].body[1..].to_vec();
        self.invalidate(id);
        self.add_production(&primed, concat_bodies(&alpha, &[nt(primed.clone())]), builder::build_nothing);
      }
      self.add_production(&primed, vec![Symbol::Epsilon], builder::build_nothing);
    }

    self.compact();
    self.drop_unreachable();
  }

  /// Left factoring. Each sweep first inlines alternates whose leading
  /// non-terminal hides a FIRST overlap with a sibling (the prefix is not
  /// directly visible), then factors shared leading prefixes into primed
  /// non-terminals. Sweeps repeat until nothing changes.
  fn left_refactor(&mut self) {
    loop {
      self.compute_first_set();
      let mut changed = self.substitute_hidden_prefixes();
      changed |= self.factor_common_prefixes();
      if !changed {
        break;
      }
      self.compact();
    }
  }

  fn substitute_hidden_prefixes(&mut self) -> bool {
    let mut changed = false;
    let order = self.non_terminal_order.clone();
    for name in &order {
      let alts = self.alternates(name);
      if alts.len() < 2 {
        continue;
      }
      let firsts: Vec<FxHashSet<Symbol>> = alts
        .iter()
        .map(|&id| {
          let mut f = self.first_of_sequence(&self.productions[id].body);
          f.retain(|s| !s.is_epsilon());
          f
        })
        .collect();

      for (idx, &id) in alts.iter().enumerate() {
        let lead = self.productions[id].body[0].clone();
        let Symbol::NonTerminal(lead_name) = lead else {
          continue;
        };
        if lead_name == *name || self.alternates(&lead_name).is_empty() {
          continue;
        }
        let hidden_overlap = alts.iter().enumerate().any(|(other, &other_id)| {
          other != idx
            && self.productions[other_id].body[0] != self.productions[id].body[0]
            && firsts[idx].intersection(&firsts[other]).next().is_some()
        });
        if !hidden_overlap {
          continue;
        }

        let gamma = self.productions[id].body[1..].to_vec();
        let deltas: Vec<Vec<Symbol>> = self
          .alternates(&lead_name)
          .into_iter()
          .map(|d| self.productions[d].body.clone())
          .collect();
        self.invalidate(id);
        for delta in deltas {
          self.add_production(name, concat_bodies(&delta, &gamma), builder::build_nothing);
        }
        changed = true;
        // the alternate list for this head is stale now; next sweep revisits
        break;
      }
    }
    changed
  }

  fn factor_common_prefixes(&mut self) -> bool {
    let mut changed = false;
    let order = self.non_terminal_order.clone();
    for name in &order {
      let alts = self.alternates(name);
      if alts.len() < 2 {
        continue;
      }

      let mut groups: FxHashMap<Symbol, Vec<usize>> = FxHashMap::default();
      for &id in &alts {
        let lead = self.productions[id].body[0].clone();
        if !lead.is_epsilon() {
          groups.entry(lead).or_default().push(id);
        }
      }
      let mut group_list: Vec<(Symbol, Vec<usize>)> = groups.into_iter().collect();
      group_list.sort_by(|a, b| a.0.name().cmp(b.0.name()));

      for (_, group) in group_list {
        if group.len() < 2 {
          continue;
        }
        let prefix_len = {
          let bodies: Vec<&[Symbol]> = group.iter().map(|&id| &self.productions[id].body[..]).collect();
          let mut len = 1;
          'grow: loop {
            for body in &bodies {
              if body.len() <= len || bodies[0].len() <= len || body[len] != bodies[0][len] {
                break 'grow;
              }
            }
            len += 1;
          }
          len
        };

        let prefix = self.productions[group[0]].body[..prefix_len].to_vec();
        let primed = self.prime_name(name);
        for &id in &group {
          let suffix = self.productions[id].body[prefix_len..].to_vec();
          self.invalidate(id);
          self.add_production(&primed, concat_bodies(&suffix, &[]), builder::build_nothing);
        }
        self.add_production(name, concat_bodies(&prefix, &[nt(primed.clone())]), builder::build_nothing);
        changed = true;
      }
    }
    changed
  }

  /// Drops invalidated productions and renumbers the rest densely, keeping
  /// registration order. Symbol inventories are rebuilt from what survives.
  pub(crate) fn compact(&mut self) {
    let mut productions = std::mem::take(&mut self.productions);
    productions.retain(|p| p.is_valid());
    for (id, prod) in productions.iter_mut().enumerate() {
      prod.id = id;
    }

    self.production_map.clear();
    self.terminals.clear();
    let mut seen_nts = FxHashSet::default();
    for prod in &productions {
      self.production_map.entry(prod.head.name().to_string()).or_default().push(prod.id);
      seen_nts.insert(prod.head.name().to_string());
      for sym in &prod.body {
        match sym {
          Symbol::Terminal(name) => {
            self.terminals.insert(name.clone());
          }
          Symbol::NonTerminal(name) => {
            seen_nts.insert(name.clone());
          }
          _ => {}
        }
      }
    }
    self.non_terminal_order.retain(|name| seen_nts.contains(name));
    self.non_terminals = seen_nts;
    self.productions = productions;
  }

  /// Removes productions not reachable from the start symbol, then compacts.
  pub(crate) fn drop_unreachable(&mut self) {
    let mut reachable = FxHashSet::default();
    let mut stack = vec![self.start_symbol.name().to_string()];
    reachable.insert(self.start_symbol.name().to_string());
    while let Some(name) = stack.pop() {
      for id in self.alternates(&name) {
        for sym in &self.productions[id].body {
          if let Symbol::NonTerminal(next) = sym {
            if reachable.insert(next.clone()) {
              stack.push(next.clone());
            }
          }
        }
      }
    }

    for id in 0..self.productions.len() {
      if self.productions[id].is_valid() && !reachable.contains(self.productions[id].head.name()) {
        self.invalidate(id);
      }
    }
    self.compact();
  }

  /// Reports FIRST/FIRST and FIRST/FOLLOW conflicts between alternates of
  /// the same non-terminal. Returns true when any conflict exists; details go
  /// to the sink one line each.
  pub fn has_back_tracing(&self, out: &mut dyn Write) -> bool {
    let mut conflict = false;
    for name in &self.non_terminal_order {
      let alts = self.alternates(name);
      if alts.len() < 2 {
        continue;
      }
      let firsts: Vec<FxHashSet<Symbol>> =
        alts.iter().map(|&id| self.first_of_sequence(&self.productions[id].body)).collect();

      for i in 0..alts.len() {
        for j in i + 1..alts.len() {
          let mut shared: Vec<&str> = firsts[i]
            .intersection(&firsts[j])
            .filter(|s| !s.is_epsilon())
            .map(Symbol::name)
            .collect();
          if !shared.is_empty() {
            shared.sort_unstable();
            let _ = writeln!(
              out,
              "FIRST/FIRST conflict in {}: alternates {} and {} share {{ {} }}",
              name,
              self.productions[alts[i]].id,
              self.productions[alts[j]].id,
              shared.join(", ")
            );
            conflict = true;
          }
        }
      }

      for (idx, first) in firsts.iter().enumerate() {
        if !first.iter().any(Symbol::is_epsilon) {
          continue;
        }
        let Some(follow) = self.follow_of(&nt(name.clone())) else {
          continue;
        };
        for (other, other_first) in firsts.iter().enumerate() {
          if other == idx {
            continue;
          }
          let mut shared: Vec<&str> =
            follow.intersection(other_first).filter(|s| !s.is_epsilon()).map(Symbol::name).collect();
          if !shared.is_empty() {
            shared.sort_unstable();
            let _ = writeln!(
              out,
              "FIRST/FOLLOW conflict in {}: nullable alternate {} overlaps alternate {} on {{ {} }}",
              name,
              self.productions[alts[idx]].id,
              self.productions[alts[other]].id,
              shared.join(", ")
            );
            conflict = true;
          }
        }
      }
    }
    conflict
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::grammar::t;

  /// Leftmost-derivation cycle check used to assert the normalization result.
  fn has_left_recursion(g: &Grammar) -> bool {
    let heads: Vec<String> = g.non_terminal_order.clone();
    for start in &heads {
      let mut stack = vec![start.clone()];
      let mut seen = FxHashSet::default();
      while let Some(name) = stack.pop() {
        for id in g.alternates(&name) {
          if let Symbol::NonTerminal(lead) = &g.productions[id].body[0] {
            if lead == start {
              return true;
            }
            if seen.insert(lead.clone()) {
              stack.push(lead.clone());
            }
          }
        }
      }
    }
    false
  }

  fn shares_first_prefix(g: &Grammar) -> bool {
    for name in &g.non_terminal_order {
      let alts = g.alternates(name);
      let mut leads = FxHashSet::default();
      for id in alts {
        let lead = &g.productions[id].body[0];
        if !lead.is_epsilon() && !leads.insert(lead.clone()) {
          return true;
        }
      }
    }
    false
  }

  #[test]
  fn immediate_left_recursion_is_eliminated() {
    let g = crate::grammar::tests::expr_grammar(true);
    assert!(!has_left_recursion(&g));
    assert!(!shares_first_prefix(&g));
    // E' and T' were introduced
    assert!(g.non_terminals.contains("E'"));
    assert!(g.non_terminals.contains("T'"));
  }

  #[test]
  fn indirect_left_recursion_is_eliminated() {
    // R -> Sa | a,  Q -> Rb | b,  S -> Qc | c
    let g = Grammar::from_productions(
      "S",
      vec![
        ("R", vec![nt("S"), t("a")]),
        ("R", vec![t("a")]),
        ("Q", vec![nt("R"), t("b")]),
        ("Q", vec![t("b")]),
        ("S", vec![nt("Q"), t("c")]),
        ("S", vec![t("c")]),
      ],
      true,
    );
    assert!(!has_left_recursion(&g));
  }

  #[test]
  fn compaction_leaves_dense_zero_indexed_ids() {
    let g = crate::grammar::tests::expr_grammar(true);
    for (idx, prod) in g.productions.iter().enumerate() {
      assert_eq!(prod.id, idx);
    }
    assert!(g.productions.iter().all(|p| p.is_valid()));
  }

  #[test]
  fn unreachable_productions_are_dropped() {
    let g = Grammar::from_productions(
      "S",
      vec![
        ("S", vec![t("a")]),
        ("Dead", vec![t("x")]),
      ],
      true,
    );
    assert!(g.alternates("Dead").is_empty());
    assert!(!g.non_terminals.contains("Dead"));
  }

  #[test]
  fn shared_prefixes_are_factored() {
    // A -> a b c | a b d
    let g = Grammar::from_productions(
      "A",
      vec![
        ("A", vec![t("a"), t("b"), t("c")]),
        ("A", vec![t("a"), t("b"), t("d")]),
      ],
      true,
    );
    assert!(!shares_first_prefix(&g));
    let a_alts = g.alternates("A");
    assert_eq!(a_alts.len(), 1);
    // A -> a b A',  A' -> c | d
    assert_eq!(g.productions[a_alts[0]].body.len(), 3);
    assert_eq!(g.alternates("A'").len(), 2);
  }

  #[test]
  fn priming_avoids_existing_names() {
    let g = Grammar::from_productions(
      "A",
      vec![
        ("A", vec![nt("A'"), t("x")]),
        ("A", vec![t("y")]),
        ("A'", vec![t("z")]),
      ],
      false,
    );
    assert_eq!(g.prime_name("A"), "A''");
  }

  #[test]
  fn hidden_prefix_is_substituted_before_factoring() {
    // S -> B d | a e ; B -> a c: the `a` prefix hides behind B
    let g = Grammar::from_productions(
      "S",
      vec![
        ("S", vec![nt("B"), t("d")]),
        ("S", vec![t("a"), t("e")]),
        ("B", vec![t("a"), t("c")]),
      ],
      true,
    );
    assert!(!shares_first_prefix(&g));
    let mut sink = Vec::new();
    assert!(!g.has_back_tracing(&mut sink));
  }

  #[test]
  fn back_tracing_reports_first_first_conflict() {
    let g = Grammar::from_productions(
      "S",
      vec![
        ("S", vec![t("a"), t("b")]),
        ("S", vec![t("a"), t("c")]),
      ],
      false,
    );
    let mut sink = Vec::new();
    assert!(g.has_back_tracing(&mut sink));
    let text = String::from_utf8(sink).unwrap();
    assert!(text.contains("FIRST/FIRST conflict in S"));
  }

  #[test]
  fn back_tracing_reports_first_follow_conflict() {
    // A is nullable and FOLLOW(A) contains `a`, clashing with A -> a
    let g = Grammar::from_productions(
      "S",
      vec![
        ("S", vec![nt("A"), t("a")]),
        ("A", vec![t("a")]),
        ("A", vec![Symbol::Epsilon]),
      ],
      false,
    );
    let mut sink = Vec::new();
    assert!(g.has_back_tracing(&mut sink));
    let text = String::from_utf8(sink).unwrap();
    assert!(text.contains("FIRST/FOLLOW conflict in A"));
  }

  #[test]
  fn normalized_grammar_is_ll1_clean() {
    let g = crate::grammar::tests::expr_grammar(true);
    let mut sink = Vec::new();
    assert!(!g.has_back_tracing(&mut sink), "{}", String::from_utf8_lossy(&sink));
  }
}
