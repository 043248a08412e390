//! Compile-time integer evaluation for global initializers. Division and
//! modulus by zero fold to 0; anything the evaluator cannot see through
//! (identifiers, calls, floats) makes the initializer non-constant.

use crate::ast::{BasicOp, Expr, UnaryOp};

pub trait Eval {
  fn eval(&self) -> Option<i32>;
}

impl Eval for Expr {
  fn eval(&self) -> Option<i32> {
    match self {
      Expr::IntLit(value) => Some(*value),
      Expr::FloatLit(_) => None,
      Expr::Ident(_) => None,
      Expr::Call(..) => None,
      Expr::Unary(op, operand) => {
        let value = operand.eval()?;
        Some(match op {
          UnaryOp::Positive => value,
          UnaryOp::Negative => value.wrapping_neg(),
          UnaryOp::LogicalNot => (value == 0) as i32,
        })
      }
      Expr::Binary(op, lhs, rhs) => {
        let lhs = lhs.eval()?;
        let rhs = rhs.eval()?;
        Some(match op {
          BasicOp::Add => lhs.wrapping_add(rhs),
          BasicOp::Sub => lhs.wrapping_sub(rhs),
          BasicOp::Mul => lhs.wrapping_mul(rhs),
          BasicOp::Div => {
            if rhs == 0 {
              0
            } else {
              lhs.wrapping_div(rhs)
            }
          }
          BasicOp::Mod => {
            if rhs == 0 {
              0
            } else {
              lhs.wrapping_rem(rhs)
            }
          }
          BasicOp::Lt => (lhs < rhs) as i32,
          BasicOp::Gt => (lhs > rhs) as i32,
          BasicOp::Le => (lhs <= rhs) as i32,
          BasicOp::Ge => (lhs >= rhs) as i32,
          BasicOp::Eq => (lhs == rhs) as i32,
          BasicOp::Neq => (lhs != rhs) as i32,
          BasicOp::And => (lhs != 0 && rhs != 0) as i32,
          BasicOp::Or => (lhs != 0 || rhs != 0) as i32,
        })
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn int(v: i32) -> Box<Expr> {
    Box::new(Expr::IntLit(v))
  }

  fn bin(op: BasicOp, lhs: Box<Expr>, rhs: Box<Expr>) -> Expr {
    Expr::Binary(op, lhs, rhs)
  }

  #[test]
  fn folds_arithmetic_with_precedence_shape() {
    // 1 + 2 * 3
    let expr = bin(BasicOp::Add, int(1), Box::new(bin(BasicOp::Mul, int(2), int(3))));
    assert_eq!(expr.eval(), Some(7));
  }

  #[test]
  fn division_by_zero_folds_to_zero() {
    assert_eq!(bin(BasicOp::Div, int(5), int(0)).eval(), Some(0));
    assert_eq!(bin(BasicOp::Mod, int(5), int(0)).eval(), Some(0));
  }

  #[test]
  fn logic_and_comparisons_fold_to_zero_or_one() {
    assert_eq!(bin(BasicOp::And, int(2), int(3)).eval(), Some(1));
    assert_eq!(bin(BasicOp::Or, int(0), int(0)).eval(), Some(0));
    assert_eq!(bin(BasicOp::Le, int(2), int(2)).eval(), Some(1));
    assert_eq!(Expr::Unary(UnaryOp::LogicalNot, int(7)).eval(), Some(0));
  }

  #[test]
  fn identifiers_are_not_constant() {
    let expr = bin(BasicOp::Add, int(1), Box::new(Expr::Ident("x".into())));
    assert_eq!(expr.eval(), None);
  }
}
