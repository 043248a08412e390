use std::fmt;
use std::io::{self, Write};

use crate::grammar::Symbol;

pub mod ll;
pub mod slr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseAction {
  Move,
  Reduction,
  Accept,
  Error,
}

impl fmt::Display for ParseAction {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    let text = match self {
      ParseAction::Move => "move",
      ParseAction::Reduction => "reduction",
      ParseAction::Accept => "accept",
      ParseAction::Error => "error",
    };
    f.write_str(text)
  }
}

/// One driver step: the pre-action stack top, the lookahead terminal, and
/// what the parser did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStep {
  pub top: Symbol,
  pub lookahead: Symbol,
  pub action: ParseAction,
}

impl ParseStep {
  pub fn new(top: Symbol, lookahead: Symbol, action: ParseAction) -> Self {
    ParseStep { top, lookahead, action }
  }
}

/// Trace dump, one step per line: `<index>\t<top>#<lookahead>\t<action>`.
pub fn print_parse_steps(out: &mut dyn Write, steps: &[ParseStep]) -> io::Result<()> {
  for (i, step) in steps.iter().enumerate() {
    writeln!(out, "{}\t{}#{}\t{}", i + 1, step.top.name(), step.lookahead.name(), step.action)?;
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::grammar::{nt, t};

  #[test]
  fn trace_lines_are_tab_separated_and_one_based() {
    let steps = vec![
      ParseStep::new(nt("S"), t("a"), ParseAction::Reduction),
      ParseStep::new(t("a"), t("a"), ParseAction::Move),
      ParseStep::new(Symbol::End, Symbol::End, ParseAction::Accept),
    ];
    let mut sink = Vec::new();
    print_parse_steps(&mut sink, &steps).unwrap();
    let text = String::from_utf8(sink).unwrap();
    assert_eq!(text, "1\tS#a\treduction\n2\ta#a\tmove\n3\t$#$\taccept\n");
  }
}
